//! In-process simulators used to exercise the testers.
//!
//! Every simulator models its device just far enough for a conforming run to
//! come out clean, with config switches that introduce specific misbehaviour.
//! Time is measured with [`tokio::time::Instant`] so tests can run on a paused
//! clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(feature = "camera")]
mod camera;
#[cfg(feature = "camera")]
pub(crate) use camera::{CameraConfig, LevelConfig, SimCamera};

#[cfg(feature = "dome")]
mod dome;
#[cfg(feature = "dome")]
pub(crate) use dome::{DomeConfig, SimDome};

#[cfg(feature = "observing_conditions")]
mod observing_conditions;
#[cfg(feature = "observing_conditions")]
pub(crate) use observing_conditions::{ObservingConditionsConfig, SimObservingConditions};

#[cfg(feature = "switch")]
mod switch;
#[cfg(feature = "switch")]
pub(crate) use switch::{SimSwitch, SwitchConfig};

/// Connection state shared by every simulator.
#[derive(Debug, Default)]
pub(crate) struct SimCommon {
    connected: AtomicBool,
}

impl SimCommon {
    pub(crate) fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
        tracing::debug!(connected, "Simulator connection changed");
    }
}

/// Lock simulator state, ignoring poisoning from a panicked test.
pub(crate) fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Implement [`Device`](crate::api::Device) for a simulator with a `common: SimCommon` field.
///
/// Connect and Disconnect complete synchronously, so Connecting is always false.
macro_rules! sim_device {
    ($sim:ty, $name:literal) => {
        #[async_trait::async_trait]
        impl $crate::api::Device for $sim {
            fn static_name(&self) -> &str {
                $name
            }

            async fn connected(&self) -> $crate::ASCOMResult<bool> {
                Ok(self.common.connected())
            }

            async fn set_connected(&self, connected: bool) -> $crate::ASCOMResult {
                self.common.set_connected(connected);
                Ok(())
            }

            async fn connect(&self) -> $crate::ASCOMResult {
                self.common.set_connected(true);
                Ok(())
            }

            async fn disconnect(&self) -> $crate::ASCOMResult {
                self.common.set_connected(false);
                Ok(())
            }

            async fn connecting(&self) -> $crate::ASCOMResult<bool> {
                Ok(false)
            }

            async fn description(&self) -> $crate::ASCOMResult<String> {
                Ok(concat!("Simulated ", $name).to_owned())
            }

            async fn driver_info(&self) -> $crate::ASCOMResult<String> {
                Ok("In-process conformance test simulator".to_owned())
            }

            async fn driver_version(&self) -> $crate::ASCOMResult<String> {
                Ok("1.0".to_owned())
            }
        }
    };
}
use sim_device;
