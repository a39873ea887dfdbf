use super::DeviceTester;
use crate::api::{Capabilities, Device, DeviceType, ObservingConditions};
use crate::context::{Abandon, Routines, RunContext, StepResult};
use crate::errors::ErrorKind;
use crate::exercise::{
    is_implemented, measure_rate, read_property, reader, record_read, restore, ModeProbe, ModeState,
    PropertyValue, Reader, Validator,
};
use crate::outcome::{Expect, Outcome, RequirementLevel};
use crate::retry::{is_not_ready, read_with_retry};
use crate::timing::{timed, TargetDuration};
use crate::ASCOMResult;
use std::future::Future;
use std::sync::Arc;
use tokio::time::sleep;

use RequirementLevel::{Mandatory, MustNotBeImplemented, Optional};
use TargetDuration::{Fast, Standard};

/// Read a sensor value, retrying while the device reports it isn't ready yet.
///
/// Only the first attempt is held to the Fast target; the retries that follow
/// are expected to take the configured delay.
async fn read_sensor<T, F, Fut>(ctx: &mut RunContext, name: &str, mut read: F) -> ASCOMResult<T>
where
    T: Send,
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = ASCOMResult<T>> + Send,
{
    let settings = &ctx.settings().observing_conditions;
    let (max_retries, retry_delay) = (settings.max_retries, settings.retry_delay);

    match timed(ctx, name, Fast, read()).await {
        Err(err) if is_not_ready(&err) && max_retries > 0 => {
            tracing::debug!(name, %err, "Sensor not ready");
            sleep(retry_delay).await;
            read_with_retry(read, is_not_ready, max_retries - 1, retry_delay).await
        }
        result => result,
    }
}

/// Sensor name no device can know.
const UNKNOWN_SENSOR: &str = "NotAValidSensorName";

/// One optional sensor and the range its readings must fall in.
struct Sensor {
    name: &'static str,
    read: Reader<dyn ObservingConditions>,
    validator: Validator,
}

fn sensors() -> [Sensor; 13] {
    let sensor = |name, read, min, max| Sensor {
        name,
        read,
        validator: Validator::range(min, max),
    };
    [
        sensor("CloudCover", reader!(dyn ObservingConditions, cloud_cover), 0.0, 100.0),
        sensor("DewPoint", reader!(dyn ObservingConditions, dew_point), -273.15, 100.0),
        sensor("Humidity", reader!(dyn ObservingConditions, humidity), 0.0, 100.0),
        sensor("Pressure", reader!(dyn ObservingConditions, pressure), 0.0, 1100.0),
        sensor("RainRate", reader!(dyn ObservingConditions, rain_rate), 0.0, 20000.0),
        sensor("SkyBrightness", reader!(dyn ObservingConditions, sky_brightness), 0.0, 1_000_000.0),
        sensor("SkyQuality", reader!(dyn ObservingConditions, sky_quality), -20.0, 30.0),
        sensor("SkyTemperature", reader!(dyn ObservingConditions, sky_temperature), -273.15, 100.0),
        sensor("StarFWHM", reader!(dyn ObservingConditions, star_fwhm), 0.0, 1000.0),
        sensor("Temperature", reader!(dyn ObservingConditions, temperature), -273.15, 100.0),
        sensor("WindDirection", reader!(dyn ObservingConditions, wind_direction), 0.0, 360.0),
        sensor("WindGust", reader!(dyn ObservingConditions, wind_gust), 0.0, 1000.0),
        sensor("WindSpeed", reader!(dyn ObservingConditions, wind_speed), 0.0, 1000.0),
    ]
}

/// Checks for [`ObservingConditions`] devices.
#[derive(Debug)]
pub struct ObservingConditionsTester {
    device: Arc<dyn ObservingConditions>,
    /// Sensors found to be implemented while checking properties.
    implemented: Vec<&'static str>,
}

impl ObservingConditionsTester {
    /// Tester for the given observing conditions device.
    pub fn new(device: Arc<dyn ObservingConditions>) -> Self {
        Self {
            device,
            implemented: Vec::new(),
        }
    }

    async fn check_average_period(&self, ctx: &mut RunContext) -> StepResult {
        let device = &*self.device;

        ctx.checkpoint()?;
        ctx.set_test("AveragePeriod");
        let Some(original) = read_property(
            ctx,
            "AveragePeriod",
            Mandatory,
            Fast,
            &Validator::at_least(0.0),
            device.average_period(),
        )
        .await
        else {
            return Ok(());
        };

        let result = async {
            let test = "AveragePeriod write 0";
            ctx.checkpoint()?;
            ctx.set_test(test);
            let result = timed(ctx, test, Standard, device.set_average_period(0.0)).await;
            match ctx.classify(test, Mandatory, &result, Expect::Success) {
                Outcome::Error => return Err(Abandon::Failed),
                _ if result.is_ok() => {
                    let zero = Validator::range(0.0, 0.0);
                    _ = read_property(ctx, test, Mandatory, Fast, &zero, device.average_period())
                        .await;
                }
                _ => {}
            }

            let test = "AveragePeriod write -1";
            ctx.checkpoint()?;
            ctx.set_test(test);
            let result = timed(ctx, test, Standard, device.set_average_period(-1.0)).await;
            if ctx.classify(test, Mandatory, &result, Expect::InvalidValue) == Outcome::Error {
                return Err(Abandon::Failed);
            }

            // Devices that only report instantaneous values reject every non-zero period.
            let test = "AveragePeriod write 5";
            ctx.checkpoint()?;
            ctx.set_test(test);
            match timed(ctx, test, Standard, device.set_average_period(5.0)).await {
                Ok(()) => ctx.ok(test, "Accepted an averaging period of 5 hours"),
                Err(err) if err.kind() == ErrorKind::InvalidValue => {
                    ctx.ok(
                        test,
                        "Rejected with InvalidValue, only instantaneous readings are supported",
                    );
                }
                result => {
                    if ctx.classify(test, Mandatory, &result, Expect::Success) == Outcome::Error {
                        return Err(Abandon::Failed);
                    }
                }
            }
            Ok::<_, Abandon>(())
        }
        .await;

        restore("average period", device.set_average_period(original)).await;
        result
    }

    /// Read every sensor, then check the per-sensor metadata agrees with what was found.
    async fn check_sensors(&mut self, ctx: &mut RunContext) -> StepResult {
        let device = Arc::clone(&self.device);
        self.implemented.clear();

        let mut dew_pairing = ModeProbe::new("Paired");
        for sensor in sensors() {
            ctx.checkpoint()?;
            ctx.set_test(sensor.name);
            let result = read_sensor(ctx, sensor.name, || (sensor.read)(&*device)).await;

            let implemented = is_implemented(&result);
            if matches!(sensor.name, "DewPoint" | "Humidity") {
                dew_pairing = dew_pairing.member(sensor.name, &result);
            }
            if implemented {
                self.implemented.push(sensor.name);
            }
            _ = record_read::<PropertyValue>(ctx, sensor.name, Optional, &sensor.validator, result);

            self.check_sensor_metadata(ctx, sensor.name, implemented).await?;
        }

        let test = "DewPoint and Humidity";
        match dew_pairing.state() {
            ModeState::Full => ctx.ok(test, "Both are implemented"),
            ModeState::Absent => ctx.ok(test, "Neither is implemented"),
            ModeState::Partial => ctx.issue(
                test,
                "DewPoint and Humidity must either both be implemented or both be absent",
            ),
        }
        Ok(())
    }

    /// SensorDescription and TimeSinceLastUpdate must exist exactly for implemented sensors.
    async fn check_sensor_metadata(
        &self,
        ctx: &mut RunContext,
        name: &'static str,
        implemented: bool,
    ) -> StepResult {
        let device = &*self.device;
        let requirement = if implemented { Mandatory } else { MustNotBeImplemented };

        let test = format!("SensorDescription {name}");
        ctx.checkpoint()?;
        let result = timed(ctx, &test, Fast, device.sensor_description(name.to_owned())).await;
        _ = record_read(ctx, &test, requirement, &Validator::NotEmpty, result);

        let test = format!("TimeSinceLastUpdate {name}");
        let result =
            read_sensor(ctx, &test, || device.time_since_last_update(name.to_owned())).await;
        _ = record_read(ctx, &test, requirement, &Validator::Any, result);
        Ok(())
    }

    /// The all-sensors form of TimeSinceLastUpdate and unknown sensor names.
    async fn check_sensor_names(&self, ctx: &mut RunContext) -> StepResult {
        let device = &*self.device;

        ctx.checkpoint()?;
        let test = "TimeSinceLastUpdate (latest)";
        ctx.set_test(test);
        let result = read_sensor(ctx, test, || device.time_since_last_update(String::new())).await;
        _ = record_read(ctx, test, Optional, &Validator::Any, result);

        let description = device.sensor_description(UNKNOWN_SENSOR.to_owned());
        let description = timed(ctx, "SensorDescription", Fast, description).await;
        let age = device.time_since_last_update(UNKNOWN_SENSOR.to_owned());
        let age = timed(ctx, "TimeSinceLastUpdate", Fast, age).await;

        for (test, result) in [
            (format!("SensorDescription {UNKNOWN_SENSOR}"), description.map(drop)),
            (format!("TimeSinceLastUpdate {UNKNOWN_SENSOR}"), age.map(drop)),
        ] {
            ctx.checkpoint()?;
            if ctx.classify(&test, Mandatory, &result, Expect::InvalidValue) == Outcome::Error {
                return Err(Abandon::Failed);
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DeviceTester for ObservingConditionsTester {
    fn device_type(&self) -> DeviceType {
        DeviceType::ObservingConditions
    }

    fn device(&self) -> &dyn Device {
        &*self.device
    }

    async fn interface_version(&self) -> ASCOMResult<i32> {
        self.device.interface_version().await
    }

    fn platform7_interface_version(&self) -> i32 {
        2
    }

    /// Observing conditions devices have no capability flags to read.
    async fn read_capabilities(
        &mut self,
        ctx: &mut RunContext,
        interface_version: i32,
    ) -> StepResult {
        let capabilities = Capabilities::builder(interface_version).finish();
        tracing::debug!(?capabilities, "No capability flags to read");
        ctx.checkpoint()
    }

    async fn check_properties(&mut self, ctx: &mut RunContext) -> StepResult {
        let mut routines = Routines::new();
        routines.run(self.check_average_period(ctx).await)?;
        routines.run(self.check_sensors(ctx).await)?;
        routines.run(self.check_sensor_names(ctx).await)?;
        routines.finish()
    }

    async fn check_methods(&mut self, ctx: &mut RunContext) -> StepResult {
        ctx.checkpoint()?;
        ctx.set_test("Refresh");
        let result = timed(ctx, "Refresh", Standard, self.device.refresh()).await;
        match ctx.classify("Refresh", Optional, &result, Expect::Success) {
            Outcome::Error => Err(Abandon::Failed),
            _ => Ok(()),
        }
    }

    async fn check_performance(&mut self, ctx: &mut RunContext) -> StepResult {
        let device = &*self.device;
        let duration = ctx.settings().performance_duration;

        measure_rate(ctx, "AveragePeriod", duration, || device.average_period()).await?;
        for sensor in sensors() {
            if self.implemented.contains(&sensor.name) {
                measure_rate(ctx, sensor.name, duration, || (sensor.read)(device)).await?;
            }
        }
        Ok(())
    }
}
