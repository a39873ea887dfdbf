//! Run settings.
//!
//! Every timeout here is independent: a long run may take the sum of many of
//! them, nothing composes them into a global budget.

use eyre::WrapErr;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Settings controlling a conformance run.
///
/// Deserializes from JSON with every field optional; durations are written in
/// human-readable form (`"500ms"`, `"2m"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "snake_case", deny_unknown_fields)]
pub struct ConformSettings {
    /// Run the property checks.
    pub test_properties: bool,
    /// Run the method checks.
    pub test_methods: bool,
    /// Run the transaction-rate microbenchmarks.
    pub test_performance: bool,

    /// Response ceilings per target duration class.
    pub targets: TargetSettings,

    /// Interval between successive polls of a completion predicate.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Budget for Platform 7 `connect` / `disconnect` to finish.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// How long each transaction-rate benchmark runs.
    #[serde(with = "humantime_serde")]
    pub performance_duration: Duration,

    /// Camera specific settings.
    pub camera: CameraSettings,
    /// Dome specific settings.
    pub dome: DomeSettings,
    /// Switch specific settings.
    pub switch: SwitchSettings,
    /// Observing conditions specific settings.
    pub observing_conditions: ObservingConditionsSettings,
}

/// Ceilings for [`TargetDuration`](crate::TargetDuration) classes.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetSettings {
    /// Simple property reads.
    #[serde(with = "humantime_serde")]
    pub fast: Duration,
    /// Ordinary method calls, including the initiating call of long operations.
    #[serde(with = "humantime_serde")]
    pub standard: Duration,
    /// Calls that legitimately involve hardware round trips.
    #[serde(with = "humantime_serde")]
    pub extended: Duration,
}

/// Camera specific settings.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraSettings {
    /// Exposure length used by the exposure checks, in seconds.
    pub exposure_duration: f64,
    /// How long to wait for `ImageReady` beyond the exposure length.
    #[serde(with = "humantime_serde")]
    pub exposure_timeout: Duration,
    /// Longest binning factor to try when checking BinX/BinY writes.
    pub max_bin_to_test: i32,
    /// Pulse-guide duration in milliseconds.
    pub pulse_guide_duration_ms: i32,
}

/// Dome specific settings.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DomeSettings {
    /// Whether the checker may open and close the shutter.
    ///
    /// Disabled by default: opening a real observatory roof unattended is unsafe.
    pub allow_shutter_movement: bool,
    /// Budget for the shutter to finish opening or closing.
    #[serde(with = "humantime_serde")]
    pub shutter_timeout: Duration,
    /// Budget for an altitude or azimuth slew, park or home.
    #[serde(with = "humantime_serde")]
    pub slew_timeout: Duration,
    /// Pause after a slew reports completion before reading the position back.
    #[serde(with = "humantime_serde")]
    pub settle_time: Duration,
    /// Acceptable difference between requested and reported position, in degrees.
    pub slew_tolerance: f64,
}

/// Switch specific settings.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SwitchSettings {
    /// Delay after a read before continuing.
    #[serde(with = "humantime_serde")]
    pub read_delay: Duration,
    /// Delay after a synchronous write before reading the value back.
    #[serde(with = "humantime_serde")]
    pub write_delay: Duration,
    /// Budget for an asynchronous switch change to complete.
    #[serde(with = "humantime_serde")]
    pub async_timeout: Duration,
    /// Number of ids beyond `MaxSwitch` probed with invalid-id checks.
    pub extended_id_range: i32,
}

/// Observing conditions specific settings.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservingConditionsSettings {
    /// Retries allowed when a sensor reports it is not ready yet.
    pub max_retries: u32,
    /// Delay between those retries.
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
}

impl Default for ConformSettings {
    fn default() -> Self {
        Self {
            test_properties: true,
            test_methods: true,
            test_performance: false,
            targets: TargetSettings::default(),
            poll_interval: Duration::from_millis(500),
            connect_timeout: Duration::from_secs(30),
            performance_duration: Duration::from_secs(5),
            camera: CameraSettings::default(),
            dome: DomeSettings::default(),
            switch: SwitchSettings::default(),
            observing_conditions: ObservingConditionsSettings::default(),
        }
    }
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            fast: Duration::from_millis(100),
            standard: Duration::from_secs(1),
            extended: Duration::from_secs(10),
        }
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            exposure_duration: 2.0,
            exposure_timeout: Duration::from_secs(60),
            max_bin_to_test: 16,
            pulse_guide_duration_ms: 2000,
        }
    }
}

impl Default for DomeSettings {
    fn default() -> Self {
        Self {
            allow_shutter_movement: false,
            shutter_timeout: Duration::from_secs(240),
            slew_timeout: Duration::from_secs(240),
            settle_time: Duration::from_secs(1),
            slew_tolerance: 1.0,
        }
    }
}

impl Default for SwitchSettings {
    fn default() -> Self {
        Self {
            read_delay: Duration::from_millis(50),
            write_delay: Duration::from_millis(100),
            async_timeout: Duration::from_secs(10),
            extended_id_range: 10,
        }
    }
}

impl Default for ObservingConditionsSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl ConformSettings {
    /// Parse settings from a JSON document.
    pub fn from_json(json: &str) -> eyre::Result<Self> {
        serde_json::from_str(json).wrap_err("Couldn't parse conformance settings")
    }

    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Couldn't read settings from {}", path.display()))?;
        Self::from_json(&json)
    }
}
