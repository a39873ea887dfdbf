use super::{lock, sim_device, SimCommon};
use crate::api::dome::ShutterState;
use crate::api::Dome;
use crate::{ASCOMError, ASCOMResult};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

const SLEW_TIME: Duration = Duration::from_secs(3);
const SHUTTER_TIME: Duration = Duration::from_secs(10);
const HOME_AZIMUTH: f64 = 0.0;

#[derive(Debug, Clone)]
pub(crate) struct DomeConfig {
    pub(crate) can_find_home: bool,
    pub(crate) can_park: bool,
    pub(crate) can_set_altitude: bool,
    pub(crate) can_set_azimuth: bool,
    pub(crate) can_set_park: bool,
    pub(crate) can_set_shutter: bool,
    pub(crate) can_slave: bool,
    pub(crate) can_sync_azimuth: bool,
    /// CloseShutter works even though CanSetShutter is false.
    pub(crate) close_shutter_without_capability: bool,
    /// Added to every azimuth a slew ends at.
    pub(crate) azimuth_error: f64,
}

impl Default for DomeConfig {
    fn default() -> Self {
        Self {
            can_find_home: true,
            can_park: true,
            can_set_altitude: true,
            can_set_azimuth: true,
            can_set_park: true,
            can_set_shutter: true,
            can_slave: true,
            can_sync_azimuth: true,
            close_shutter_without_capability: false,
            azimuth_error: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rest {
    Home,
    Park,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slew {
    altitude: f64,
    azimuth: f64,
    rest: Option<Rest>,
    ends: Instant,
}

#[derive(Debug)]
struct State {
    altitude: f64,
    azimuth: f64,
    rest: Option<Rest>,
    park_azimuth: f64,
    slaved: bool,
    slew: Option<Slew>,
    shutter: ShutterState,
    shutter_moves_until: Option<Instant>,
}

impl State {
    fn update(&mut self) {
        let now = Instant::now();
        if let Some(slew) = self.slew.filter(|slew| now >= slew.ends) {
            self.slew = None;
            self.altitude = slew.altitude;
            self.azimuth = slew.azimuth;
            self.rest = slew.rest;
        }
        if self.shutter_moves_until.is_some_and(|until| now >= until) {
            self.shutter_moves_until = None;
            self.shutter = match self.shutter {
                ShutterState::Opening => ShutterState::Open,
                ShutterState::Closing => ShutterState::Closed,
                other => other,
            };
        }
    }
}

/// Simulated dome with timed slews and a slow shutter.
#[derive(Debug)]
pub(crate) struct SimDome {
    common: SimCommon,
    config: DomeConfig,
    state: Mutex<State>,
}

impl SimDome {
    pub(crate) fn new(config: DomeConfig) -> Self {
        Self {
            common: SimCommon::default(),
            config,
            state: Mutex::new(State {
                altitude: 0.0,
                azimuth: HOME_AZIMUTH,
                rest: None,
                park_azimuth: 180.0,
                slaved: false,
                slew: None,
                shutter: ShutterState::Closed,
                shutter_moves_until: None,
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        let mut state = lock(&self.state);
        state.update();
        state
    }

    fn capable(capable: bool) -> ASCOMResult {
        if capable {
            Ok(())
        } else {
            Err(ASCOMError::NOT_IMPLEMENTED)
        }
    }

    fn start_slew(&self, altitude: Option<f64>, azimuth: Option<f64>, rest: Option<Rest>) {
        let mut state = self.state();
        let slew = Slew {
            altitude: altitude.unwrap_or(state.altitude),
            azimuth: azimuth.map_or(state.azimuth, |azimuth| {
                (azimuth + self.config.azimuth_error).rem_euclid(360.0)
            }),
            rest,
            ends: Instant::now() + SLEW_TIME,
        };
        state.rest = None;
        state.slew = Some(slew);
    }

    fn move_shutter(&self, open: bool) {
        let mut state = self.state();
        let target = if open { ShutterState::Open } else { ShutterState::Closed };
        if state.shutter == target {
            return;
        }
        state.shutter = if open { ShutterState::Opening } else { ShutterState::Closing };
        state.shutter_moves_until = Some(Instant::now() + SHUTTER_TIME);
    }
}

fn check_azimuth(azimuth: f64) -> ASCOMResult {
    if (0.0..360.0).contains(&azimuth) {
        Ok(())
    } else {
        Err(ASCOMError::invalid_value(format!("Azimuth {azimuth} is outside 0 to 360")))
    }
}

sim_device!(SimDome, "Dome");

#[async_trait::async_trait]
impl Dome for SimDome {
    async fn altitude(&self) -> ASCOMResult<f64> {
        Self::capable(self.config.can_set_altitude)?;
        Ok(self.state().altitude)
    }

    async fn at_home(&self) -> ASCOMResult<bool> {
        Self::capable(self.config.can_find_home)?;
        Ok(self.state().rest == Some(Rest::Home))
    }

    async fn at_park(&self) -> ASCOMResult<bool> {
        Self::capable(self.config.can_park)?;
        Ok(self.state().rest == Some(Rest::Park))
    }

    async fn azimuth(&self) -> ASCOMResult<f64> {
        Self::capable(self.config.can_set_azimuth)?;
        Ok(self.state().azimuth)
    }

    async fn can_find_home(&self) -> ASCOMResult<bool> {
        Ok(self.config.can_find_home)
    }

    async fn can_park(&self) -> ASCOMResult<bool> {
        Ok(self.config.can_park)
    }

    async fn can_set_altitude(&self) -> ASCOMResult<bool> {
        Ok(self.config.can_set_altitude)
    }

    async fn can_set_azimuth(&self) -> ASCOMResult<bool> {
        Ok(self.config.can_set_azimuth)
    }

    async fn can_set_park(&self) -> ASCOMResult<bool> {
        Ok(self.config.can_set_park)
    }

    async fn can_set_shutter(&self) -> ASCOMResult<bool> {
        Ok(self.config.can_set_shutter)
    }

    async fn can_slave(&self) -> ASCOMResult<bool> {
        Ok(self.config.can_slave)
    }

    async fn can_sync_azimuth(&self) -> ASCOMResult<bool> {
        Ok(self.config.can_sync_azimuth)
    }

    async fn shutter_status(&self) -> ASCOMResult<ShutterState> {
        Self::capable(self.config.can_set_shutter)?;
        Ok(self.state().shutter)
    }

    async fn slaved(&self) -> ASCOMResult<bool> {
        Ok(self.state().slaved)
    }

    async fn set_slaved(&self, slaved: bool) -> ASCOMResult {
        Self::capable(self.config.can_slave)?;
        self.state().slaved = slaved;
        Ok(())
    }

    async fn slewing(&self) -> ASCOMResult<bool> {
        Ok(self.state().slew.is_some())
    }

    async fn abort_slew(&self) -> ASCOMResult {
        _ = self.state().slew.take();
        Ok(())
    }

    async fn close_shutter(&self) -> ASCOMResult {
        Self::capable(self.config.can_set_shutter || self.config.close_shutter_without_capability)?;
        self.move_shutter(false);
        Ok(())
    }

    async fn find_home(&self) -> ASCOMResult {
        Self::capable(self.config.can_find_home)?;
        self.start_slew(None, Some(HOME_AZIMUTH), Some(Rest::Home));
        Ok(())
    }

    async fn open_shutter(&self) -> ASCOMResult {
        Self::capable(self.config.can_set_shutter)?;
        self.move_shutter(true);
        Ok(())
    }

    async fn park(&self) -> ASCOMResult {
        Self::capable(self.config.can_park)?;
        let park_azimuth = self.state().park_azimuth;
        self.start_slew(None, Some(park_azimuth), Some(Rest::Park));
        Ok(())
    }

    async fn set_park(&self) -> ASCOMResult {
        Self::capable(self.config.can_set_park)?;
        let mut state = self.state();
        state.park_azimuth = state.azimuth;
        Ok(())
    }

    async fn slew_to_altitude(&self, altitude: f64) -> ASCOMResult {
        Self::capable(self.config.can_set_altitude)?;
        if !(0.0..=90.0).contains(&altitude) {
            return Err(ASCOMError::invalid_value(format!(
                "Altitude {altitude} is outside 0 to 90"
            )));
        }
        self.start_slew(Some(altitude), None, None);
        Ok(())
    }

    async fn slew_to_azimuth(&self, azimuth: f64) -> ASCOMResult {
        Self::capable(self.config.can_set_azimuth)?;
        check_azimuth(azimuth)?;
        self.start_slew(None, Some(azimuth), None);
        Ok(())
    }

    async fn sync_to_azimuth(&self, azimuth: f64) -> ASCOMResult {
        Self::capable(self.config.can_sync_azimuth)?;
        check_azimuth(azimuth)?;
        let mut state = self.state();
        state.azimuth = azimuth;
        state.rest = None;
        Ok(())
    }
}
