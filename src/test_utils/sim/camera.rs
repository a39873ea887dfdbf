use super::{lock, sim_device, SimCommon};
use crate::api::camera::CameraState;
use crate::api::{Camera, GuideDirection};
use crate::{ASCOMError, ASCOMResult};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{sleep, Instant};

const EXPOSURE_MAX: f64 = 3600.0;

/// A gain-like setting offered as a value range, a list of names, both or neither.
#[derive(Debug, Clone, Default)]
pub(crate) struct LevelConfig {
    pub(crate) range: Option<(i32, i32)>,
    pub(crate) names: Option<Vec<String>>,
}

impl LevelConfig {
    fn contains(&self, value: i32) -> ASCOMResult<bool> {
        match (self.range, &self.names) {
            (Some((min, max)), _) => Ok((min..=max).contains(&value)),
            (None, Some(names)) => {
                Ok(usize::try_from(value).is_ok_and(|index| index < names.len()))
            }
            (None, None) => Err(ASCOMError::NOT_IMPLEMENTED),
        }
    }

    fn initial(&self) -> i32 {
        self.range.map_or(0, |(min, _)| min)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CameraConfig {
    pub(crate) can_abort: bool,
    pub(crate) can_stop: bool,
    pub(crate) can_pulse_guide: bool,
    pub(crate) can_set_ccd_temperature: bool,
    pub(crate) can_asymmetric_bin: bool,
    pub(crate) x_size: i32,
    pub(crate) y_size: i32,
    pub(crate) max_bin: i32,
    pub(crate) gain: LevelConfig,
    pub(crate) offset: LevelConfig,
    pub(crate) readout_modes: Vec<String>,
    /// StartExposure returns only once the exposure is over.
    pub(crate) blocking_exposures: bool,
    pub(crate) accepts_negative_exposure: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            can_abort: true,
            can_stop: true,
            can_pulse_guide: true,
            can_set_ccd_temperature: true,
            can_asymmetric_bin: false,
            x_size: 1024,
            y_size: 768,
            max_bin: 4,
            gain: LevelConfig {
                range: Some((0, 100)),
                names: None,
            },
            offset: LevelConfig {
                range: Some((0, 50)),
                names: None,
            },
            readout_modes: vec!["Normal".to_owned(), "Fast".to_owned()],
            blocking_exposures: false,
            accepts_negative_exposure: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Exposure {
    duration: f64,
    ends: Instant,
}

#[derive(Debug)]
struct State {
    bin: (i32, i32),
    start: (i32, i32),
    num: (i32, i32),
    gain: i32,
    offset: i32,
    readout_mode: i32,
    set_ccd_temperature: f64,
    exposure: Option<Exposure>,
    last_exposure: Option<f64>,
    image_ready: bool,
    guiding_until: Option<Instant>,
}

impl State {
    /// Finish an exposure whose time is up.
    fn update(&mut self) {
        if let Some(exposure) = self.exposure.filter(|exposure| Instant::now() >= exposure.ends) {
            self.finish(exposure.duration);
        }
    }

    fn finish(&mut self, duration: f64) {
        self.exposure = None;
        self.last_exposure = Some(duration);
        self.image_ready = true;
    }
}

/// Simulated camera with timed exposures and guide pulses.
#[derive(Debug)]
pub(crate) struct SimCamera {
    common: SimCommon,
    config: CameraConfig,
    state: Mutex<State>,
}

impl SimCamera {
    pub(crate) fn new(config: CameraConfig) -> Self {
        let state = State {
            bin: (1, 1),
            start: (0, 0),
            num: (config.x_size, config.y_size),
            gain: config.gain.initial(),
            offset: config.offset.initial(),
            readout_mode: 0,
            set_ccd_temperature: -10.0,
            exposure: None,
            last_exposure: None,
            image_ready: false,
            guiding_until: None,
        };
        Self {
            common: SimCommon::default(),
            config,
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        let mut state = lock(&self.state);
        state.update();
        state
    }

    fn set_bin(
        &self,
        value: i32,
        max: i32,
        axis: impl FnOnce(&mut (i32, i32)) -> &mut i32,
    ) -> ASCOMResult {
        if !(1..=max).contains(&value) {
            return Err(ASCOMError::invalid_value(format!("Binning {value} is outside 1 to {max}")));
        }
        *axis(&mut self.state().bin) = value;
        Ok(())
    }

    fn set_level(level: &LevelConfig, value: i32, target: &mut i32) -> ASCOMResult {
        if !level.contains(value)? {
            return Err(ASCOMError::invalid_value(format!("{value} is out of range")));
        }
        *target = value;
        Ok(())
    }

    fn interrupt(&self, capable: bool, keep_image: bool) -> ASCOMResult {
        if !capable {
            return Err(ASCOMError::NOT_IMPLEMENTED);
        }
        let mut state = self.state();
        if let Some(exposure) = state.exposure.take() {
            if keep_image {
                state.finish(exposure.duration);
            }
        }
        Ok(())
    }
}

sim_device!(SimCamera, "Camera");

#[async_trait::async_trait]
impl Camera for SimCamera {
    async fn bin_x(&self) -> ASCOMResult<i32> {
        Ok(self.state().bin.0)
    }

    async fn set_bin_x(&self, bin_x: i32) -> ASCOMResult {
        self.set_bin(bin_x, self.config.max_bin, |bin| &mut bin.0)
    }

    async fn bin_y(&self) -> ASCOMResult<i32> {
        Ok(self.state().bin.1)
    }

    async fn set_bin_y(&self, bin_y: i32) -> ASCOMResult {
        self.set_bin(bin_y, self.config.max_bin, |bin| &mut bin.1)
    }

    async fn camera_state(&self) -> ASCOMResult<CameraState> {
        Ok(if self.state().exposure.is_some() {
            CameraState::Exposing
        } else {
            CameraState::Idle
        })
    }

    async fn camera_xsize(&self) -> ASCOMResult<i32> {
        Ok(self.config.x_size)
    }

    async fn camera_ysize(&self) -> ASCOMResult<i32> {
        Ok(self.config.y_size)
    }

    async fn can_abort_exposure(&self) -> ASCOMResult<bool> {
        Ok(self.config.can_abort)
    }

    async fn can_asymmetric_bin(&self) -> ASCOMResult<bool> {
        Ok(self.config.can_asymmetric_bin)
    }

    async fn can_fast_readout(&self) -> ASCOMResult<bool> {
        Ok(false)
    }

    async fn can_get_cooler_power(&self) -> ASCOMResult<bool> {
        Ok(false)
    }

    async fn can_pulse_guide(&self) -> ASCOMResult<bool> {
        Ok(self.config.can_pulse_guide)
    }

    async fn can_set_ccd_temperature(&self) -> ASCOMResult<bool> {
        Ok(self.config.can_set_ccd_temperature)
    }

    async fn can_stop_exposure(&self) -> ASCOMResult<bool> {
        Ok(self.config.can_stop)
    }

    async fn ccd_temperature(&self) -> ASCOMResult<f64> {
        Ok(self.state().set_ccd_temperature)
    }

    async fn exposure_max(&self) -> ASCOMResult<f64> {
        Ok(EXPOSURE_MAX)
    }

    async fn exposure_min(&self) -> ASCOMResult<f64> {
        Ok(0.001)
    }

    async fn exposure_resolution(&self) -> ASCOMResult<f64> {
        Ok(0.001)
    }

    async fn gain(&self) -> ASCOMResult<i32> {
        _ = self.config.gain.contains(0)?;
        Ok(self.state().gain)
    }

    async fn set_gain(&self, gain: i32) -> ASCOMResult {
        Self::set_level(&self.config.gain, gain, &mut self.state().gain)
    }

    async fn gain_max(&self) -> ASCOMResult<i32> {
        self.config.gain.range.map(|(_, max)| max).ok_or(ASCOMError::NOT_IMPLEMENTED)
    }

    async fn gain_min(&self) -> ASCOMResult<i32> {
        self.config.gain.range.map(|(min, _)| min).ok_or(ASCOMError::NOT_IMPLEMENTED)
    }

    async fn gains(&self) -> ASCOMResult<Vec<String>> {
        self.config.gain.names.clone().ok_or(ASCOMError::NOT_IMPLEMENTED)
    }

    async fn has_shutter(&self) -> ASCOMResult<bool> {
        Ok(true)
    }

    async fn image_ready(&self) -> ASCOMResult<bool> {
        Ok(self.state().image_ready)
    }

    async fn is_pulse_guiding(&self) -> ASCOMResult<bool> {
        if !self.config.can_pulse_guide {
            return Err(ASCOMError::NOT_IMPLEMENTED);
        }
        Ok(self.state().guiding_until.is_some_and(|until| Instant::now() < until))
    }

    async fn last_exposure_duration(&self) -> ASCOMResult<f64> {
        self.state().last_exposure.ok_or(ASCOMError::VALUE_NOT_SET)
    }

    async fn percent_completed(&self) -> ASCOMResult<i32> {
        let state = self.state();
        let exposure = state
            .exposure
            .ok_or_else(|| ASCOMError::invalid_operation("No exposure in progress"))?;
        let remaining = exposure.ends.saturating_duration_since(Instant::now()).as_secs_f64();
        let done = if exposure.duration > 0.0 { 1.0 - remaining / exposure.duration } else { 1.0 };
        #[allow(clippy::as_conversions, clippy::cast_possible_truncation)]
        let percent = (done.clamp(0.0, 1.0) * 100.0).round() as i32;
        Ok(percent)
    }

    async fn max_adu(&self) -> ASCOMResult<i32> {
        Ok(65535)
    }

    async fn max_bin_x(&self) -> ASCOMResult<i32> {
        Ok(self.config.max_bin)
    }

    async fn max_bin_y(&self) -> ASCOMResult<i32> {
        Ok(self.config.max_bin)
    }

    async fn num_x(&self) -> ASCOMResult<i32> {
        Ok(self.state().num.0)
    }

    async fn set_num_x(&self, num_x: i32) -> ASCOMResult {
        self.state().num.0 = num_x;
        Ok(())
    }

    async fn num_y(&self) -> ASCOMResult<i32> {
        Ok(self.state().num.1)
    }

    async fn set_num_y(&self, num_y: i32) -> ASCOMResult {
        self.state().num.1 = num_y;
        Ok(())
    }

    async fn offset(&self) -> ASCOMResult<i32> {
        _ = self.config.offset.contains(0)?;
        Ok(self.state().offset)
    }

    async fn set_offset(&self, offset: i32) -> ASCOMResult {
        Self::set_level(&self.config.offset, offset, &mut self.state().offset)
    }

    async fn offset_max(&self) -> ASCOMResult<i32> {
        self.config.offset.range.map(|(_, max)| max).ok_or(ASCOMError::NOT_IMPLEMENTED)
    }

    async fn offset_min(&self) -> ASCOMResult<i32> {
        self.config.offset.range.map(|(min, _)| min).ok_or(ASCOMError::NOT_IMPLEMENTED)
    }

    async fn offsets(&self) -> ASCOMResult<Vec<String>> {
        self.config.offset.names.clone().ok_or(ASCOMError::NOT_IMPLEMENTED)
    }

    async fn pixel_size_x(&self) -> ASCOMResult<f64> {
        Ok(3.76)
    }

    async fn pixel_size_y(&self) -> ASCOMResult<f64> {
        Ok(3.76)
    }

    async fn readout_mode(&self) -> ASCOMResult<i32> {
        Ok(self.state().readout_mode)
    }

    async fn set_readout_mode(&self, readout_mode: i32) -> ASCOMResult {
        let modes = self.config.readout_modes.len();
        if !usize::try_from(readout_mode).is_ok_and(|index| index < modes) {
            return Err(ASCOMError::invalid_value(format!("No readout mode {readout_mode}")));
        }
        self.state().readout_mode = readout_mode;
        Ok(())
    }

    async fn readout_modes(&self) -> ASCOMResult<Vec<String>> {
        Ok(self.config.readout_modes.clone())
    }

    async fn sensor_name(&self) -> ASCOMResult<String> {
        Ok("IMX455".to_owned())
    }

    async fn set_ccd_temperature(&self) -> ASCOMResult<f64> {
        if !self.config.can_set_ccd_temperature {
            return Err(ASCOMError::NOT_IMPLEMENTED);
        }
        Ok(self.state().set_ccd_temperature)
    }

    async fn set_set_ccd_temperature(&self, set_ccd_temperature: f64) -> ASCOMResult {
        if !self.config.can_set_ccd_temperature {
            return Err(ASCOMError::NOT_IMPLEMENTED);
        }
        if !(-280.0..=100.0).contains(&set_ccd_temperature) {
            return Err(ASCOMError::invalid_value(format!(
                "Setpoint {set_ccd_temperature} is out of range"
            )));
        }
        self.state().set_ccd_temperature = set_ccd_temperature;
        Ok(())
    }

    async fn start_x(&self) -> ASCOMResult<i32> {
        Ok(self.state().start.0)
    }

    async fn set_start_x(&self, start_x: i32) -> ASCOMResult {
        self.state().start.0 = start_x;
        Ok(())
    }

    async fn start_y(&self) -> ASCOMResult<i32> {
        Ok(self.state().start.1)
    }

    async fn set_start_y(&self, start_y: i32) -> ASCOMResult {
        self.state().start.1 = start_y;
        Ok(())
    }

    async fn abort_exposure(&self) -> ASCOMResult {
        self.interrupt(self.config.can_abort, false)
    }

    async fn pulse_guide(&self, direction: GuideDirection, duration: i32) -> ASCOMResult {
        if !self.config.can_pulse_guide {
            return Err(ASCOMError::NOT_IMPLEMENTED);
        }
        let Ok(millis) = u64::try_from(duration) else {
            return Err(ASCOMError::invalid_value(format!("Negative pulse duration {duration}")));
        };
        tracing::debug!(?direction, millis, "Guide pulse started");
        self.state().guiding_until = Some(Instant::now() + Duration::from_millis(millis));
        Ok(())
    }

    async fn start_exposure(&self, duration: f64, light: bool) -> ASCOMResult {
        if duration < 0.0 && !self.config.accepts_negative_exposure {
            return Err(ASCOMError::invalid_value(format!("Negative exposure duration {duration}")));
        }
        if duration > EXPOSURE_MAX {
            return Err(ASCOMError::invalid_value(format!(
                "Exposure duration {duration} exceeds {EXPOSURE_MAX}"
            )));
        }
        let length = Duration::try_from_secs_f64(duration.max(0.0)).unwrap_or_default();

        {
            let mut state = self.state();
            if state.exposure.is_some() {
                return Err(ASCOMError::invalid_operation("An exposure is already in progress"));
            }
            state.image_ready = false;
            state.exposure = Some(Exposure {
                duration,
                ends: Instant::now() + length,
            });
        }
        tracing::debug!(duration, light, "Exposure started");

        if self.config.blocking_exposures {
            sleep(length).await;
            self.state().update();
        }
        Ok(())
    }

    async fn stop_exposure(&self) -> ASCOMResult {
        self.interrupt(self.config.can_stop, true)
    }
}
