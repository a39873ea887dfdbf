use super::{lock, sim_device, SimCommon};
use crate::api::ObservingConditions;
use crate::{ASCOMError, ASCOMResult};
use std::collections::BTreeMap;
use std::sync::Mutex;

const SENSOR_NAMES: [&str; 13] = [
    "CloudCover",
    "DewPoint",
    "Humidity",
    "Pressure",
    "RainRate",
    "SkyBrightness",
    "SkyQuality",
    "SkyTemperature",
    "StarFWHM",
    "Temperature",
    "WindDirection",
    "WindGust",
    "WindSpeed",
];

#[derive(Debug, Clone)]
pub(crate) struct ObservingConditionsConfig {
    /// Implemented sensors and their readings.
    pub(crate) sensors: BTreeMap<String, f64>,
    pub(crate) average_period: f64,
    /// Reads of each sensor that fail as not ready before it starts answering.
    pub(crate) not_ready_reads: u32,
    /// SensorDescription answers for sensors that aren't implemented.
    pub(crate) describe_missing_sensors: bool,
}

impl Default for ObservingConditionsConfig {
    fn default() -> Self {
        let sensors = [
            ("DewPoint", 6.0),
            ("Humidity", 65.0),
            ("Pressure", 1013.0),
            ("SkyQuality", 21.3),
            ("Temperature", 12.5),
            ("WindSpeed", 3.0),
        ];
        Self {
            sensors: sensors.into_iter().map(|(name, value)| (name.to_owned(), value)).collect(),
            average_period: 0.0,
            not_ready_reads: 0,
            describe_missing_sensors: false,
        }
    }
}

#[derive(Debug)]
struct State {
    average_period: f64,
    reads: BTreeMap<&'static str, u32>,
}

/// Simulated weather station.
#[derive(Debug)]
pub(crate) struct SimObservingConditions {
    common: SimCommon,
    config: ObservingConditionsConfig,
    state: Mutex<State>,
}

impl SimObservingConditions {
    pub(crate) fn new(config: ObservingConditionsConfig) -> Self {
        Self {
            common: SimCommon::default(),
            state: Mutex::new(State {
                average_period: config.average_period,
                reads: BTreeMap::new(),
            }),
            config,
        }
    }

    fn reading(&self, name: &'static str) -> ASCOMResult<f64> {
        let value = *self.config.sensors.get(name).ok_or(ASCOMError::NOT_IMPLEMENTED)?;
        let mut state = lock(&self.state);
        let reads = state.reads.entry(name).or_default();
        *reads = reads.saturating_add(1);
        if *reads <= self.config.not_ready_reads {
            return Err(ASCOMError::invalid_operation(format!("{name} has no reading yet")));
        }
        Ok(value)
    }

    /// Whether `name` is a sensor this device implements, or an error for unknown names.
    fn implements(&self, name: &str) -> ASCOMResult<bool> {
        if !SENSOR_NAMES.contains(&name) {
            return Err(ASCOMError::invalid_value(format!("{name:?} is not a sensor name")));
        }
        Ok(self.config.sensors.contains_key(name))
    }
}

sim_device!(SimObservingConditions, "ObservingConditions");

#[async_trait::async_trait]
impl ObservingConditions for SimObservingConditions {
    async fn average_period(&self) -> ASCOMResult<f64> {
        Ok(lock(&self.state).average_period)
    }

    async fn set_average_period(&self, average_period: f64) -> ASCOMResult {
        if average_period < 0.0 {
            return Err(ASCOMError::invalid_value(format!(
                "Negative average period {average_period}"
            )));
        }
        lock(&self.state).average_period = average_period;
        Ok(())
    }

    async fn cloud_cover(&self) -> ASCOMResult<f64> {
        self.reading("CloudCover")
    }

    async fn dew_point(&self) -> ASCOMResult<f64> {
        self.reading("DewPoint")
    }

    async fn humidity(&self) -> ASCOMResult<f64> {
        self.reading("Humidity")
    }

    async fn pressure(&self) -> ASCOMResult<f64> {
        self.reading("Pressure")
    }

    async fn rain_rate(&self) -> ASCOMResult<f64> {
        self.reading("RainRate")
    }

    async fn sky_brightness(&self) -> ASCOMResult<f64> {
        self.reading("SkyBrightness")
    }

    async fn sky_quality(&self) -> ASCOMResult<f64> {
        self.reading("SkyQuality")
    }

    async fn sky_temperature(&self) -> ASCOMResult<f64> {
        self.reading("SkyTemperature")
    }

    async fn star_fwhm(&self) -> ASCOMResult<f64> {
        self.reading("StarFWHM")
    }

    async fn temperature(&self) -> ASCOMResult<f64> {
        self.reading("Temperature")
    }

    async fn wind_direction(&self) -> ASCOMResult<f64> {
        self.reading("WindDirection")
    }

    async fn wind_gust(&self) -> ASCOMResult<f64> {
        self.reading("WindGust")
    }

    async fn wind_speed(&self) -> ASCOMResult<f64> {
        self.reading("WindSpeed")
    }

    async fn refresh(&self) -> ASCOMResult {
        Ok(())
    }

    async fn sensor_description(&self, sensor_name: String) -> ASCOMResult<String> {
        if self.implements(&sensor_name)? || self.config.describe_missing_sensors {
            Ok(format!("Simulated {sensor_name} sensor"))
        } else {
            Err(ASCOMError::NOT_IMPLEMENTED)
        }
    }

    async fn time_since_last_update(&self, sensor_name: String) -> ASCOMResult<f64> {
        if sensor_name.is_empty() || self.implements(&sensor_name)? {
            Ok(1.0)
        } else {
            Err(ASCOMError::NOT_IMPLEMENTED)
        }
    }
}
