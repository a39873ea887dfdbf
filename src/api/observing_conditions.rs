use super::Device;
use crate::{ASCOMError, ASCOMResult};

/// ObservingConditions Specific Methods.
///
/// All sensor readings are optional; a sensor that is not fitted must return
/// `NOT_IMPLEMENTED` from its property, from `sensor_description` and from
/// `time_since_last_update` alike.
#[async_trait::async_trait]
#[allow(unused_variables)]
pub trait ObservingConditions: Device + Send + Sync {
    /// Gets the time period (hours) over which observations will be averaged.
    async fn average_period(&self) -> ASCOMResult<f64>;

    /// Sets the time period (hours) over which observations will be averaged.
    async fn set_average_period(&self, average_period: f64) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Percentage of the sky obscured by cloud.
    async fn cloud_cover(&self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Atmospheric dew point in °C.
    async fn dew_point(&self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Atmospheric relative humidity (%).
    async fn humidity(&self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Atmospheric pressure in hectoPascals at the observatory's altitude.
    async fn pressure(&self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Rain rate (mm/hour).
    async fn rain_rate(&self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Sky brightness (Lux).
    async fn sky_brightness(&self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Sky quality (magnitudes per square arc second).
    async fn sky_quality(&self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Sky temperature in °C.
    async fn sky_temperature(&self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Seeing, as star FWHM in arc seconds.
    async fn star_fwhm(&self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Ambient temperature in °C.
    async fn temperature(&self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Wind direction in degrees, 0 when there is no wind.
    async fn wind_direction(&self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Peak 3 second wind gust (m/s) over the last 2 minutes.
    async fn wind_gust(&self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Wind speed (m/s).
    async fn wind_speed(&self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Forces the driver to immediately query its attached hardware to refresh sensor values.
    async fn refresh(&self) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Gets a description of the sensor with the given property name.
    async fn sensor_description(&self, sensor_name: String) -> ASCOMResult<String> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// Gets the time in seconds since the given sensor was last updated.
    async fn time_since_last_update(&self, sensor_name: String) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    /// This method returns the version of the ASCOM device interface contract to which this device complies.
    async fn interface_version(&self) -> ASCOMResult<i32> {
        Ok(2_i32)
    }
}
