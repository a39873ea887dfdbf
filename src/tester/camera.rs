use super::{capability, read_capability_table, DeviceTester};
use crate::api::camera::CameraState;
use crate::api::{Camera, Capabilities, Device, DeviceType, GuideDirection};
use crate::completion::AwaitSpec;
use crate::context::{Abandon, Routines, RunContext, StepResult};
use crate::exercise::{
    check_modes, check_property_table, check_state, check_table_rates, read_property, reader,
    restore, run_operation, write_boundary, write_values, ModeProbe, PropertyCheck, PropertyValue,
    Reader, Validator,
};
use crate::outcome::{Expect, Outcome, RequirementLevel};
use crate::timing::{timed, TargetDuration};
use crate::wait::{settle_until, wait_until, PollSpec};
use crate::ASCOMResult;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;

use RequirementLevel::{Mandatory, MustBeImplemented, Optional};
use TargetDuration::Fast;

/// Acceptable relative difference between the requested and reported exposure length.
const EXPOSURE_TOLERANCE: f64 = 0.01;

/// Sensor dimensions, read once before the checks that depend on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Sensor {
    x_size: i32,
    y_size: i32,
    max_bin_x: i32,
    max_bin_y: i32,
}

impl Sensor {
    async fn read(camera: &dyn Camera) -> ASCOMResult<Self> {
        Ok(Self {
            x_size: camera.camera_xsize().await?,
            y_size: camera.camera_ysize().await?,
            max_bin_x: camera.max_bin_x().await?,
            max_bin_y: camera.max_bin_y().await?,
        })
    }
}

/// The two integer settings that come in a value mode and an index mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
enum Level {
    Gain,
    Offset,
}

impl Level {
    /// Names of the min, max and list members.
    const fn members(self) -> [&'static str; 3] {
        match self {
            Self::Gain => ["GainMin", "GainMax", "Gains"],
            Self::Offset => ["OffsetMin", "OffsetMax", "Offsets"],
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Gain => "Gain",
            Self::Offset => "Offset",
        }
    }

    async fn min(self, camera: &dyn Camera) -> ASCOMResult<i32> {
        match self {
            Self::Gain => camera.gain_min().await,
            Self::Offset => camera.offset_min().await,
        }
    }

    async fn max(self, camera: &dyn Camera) -> ASCOMResult<i32> {
        match self {
            Self::Gain => camera.gain_max().await,
            Self::Offset => camera.offset_max().await,
        }
    }

    async fn list(self, camera: &dyn Camera) -> ASCOMResult<Vec<String>> {
        match self {
            Self::Gain => camera.gains().await,
            Self::Offset => camera.offsets().await,
        }
    }

    async fn get(self, camera: &dyn Camera) -> ASCOMResult<i32> {
        match self {
            Self::Gain => camera.gain().await,
            Self::Offset => camera.offset().await,
        }
    }

    async fn set(self, camera: &dyn Camera, value: i32) -> ASCOMResult {
        match self {
            Self::Gain => camera.set_gain(value).await,
            Self::Offset => camera.set_offset(value).await,
        }
    }
}

/// Checks for [`Camera`] devices.
#[derive(Debug)]
pub struct CameraTester {
    camera: Arc<dyn Camera>,
    caps: Capabilities,
    sensor: Option<Sensor>,
    exposure_max: Option<f64>,
}

impl CameraTester {
    /// Tester for the given camera.
    pub fn new(camera: Arc<dyn Camera>) -> Self {
        Self {
            camera,
            caps: Capabilities::default(),
            sensor: None,
            exposure_max: None,
        }
    }

    fn capability_table() -> [PropertyCheck<dyn Camera>; 7] {
        [
            capability("CanAbortExposure", reader!(dyn Camera, can_abort_exposure)),
            capability("CanAsymmetricBin", reader!(dyn Camera, can_asymmetric_bin)),
            capability("CanFastReadout", reader!(dyn Camera, can_fast_readout)),
            capability("CanGetCoolerPower", reader!(dyn Camera, can_get_cooler_power)),
            capability("CanPulseGuide", reader!(dyn Camera, can_pulse_guide)),
            capability("CanSetCCDTemperature", reader!(dyn Camera, can_set_ccd_temperature)),
            capability("CanStopExposure", reader!(dyn Camera, can_stop_exposure)),
        ]
    }

    fn property_table(&self) -> Vec<PropertyCheck<dyn Camera>> {
        let caps = &self.caps;
        let row = |name: &'static str, requirement, read: Reader<dyn Camera>, validator| {
            PropertyCheck::new(name, requirement, Fast, read, validator)
        };

        let mut table = vec![
            row(
                "CameraXSize",
                Mandatory,
                reader!(dyn Camera, camera_xsize),
                Validator::at_least(1.0),
            ),
            row(
                "CameraYSize",
                Mandatory,
                reader!(dyn Camera, camera_ysize),
                Validator::at_least(1.0),
            ),
            row("MaxADU", Mandatory, reader!(dyn Camera, max_adu), Validator::at_least(1.0)),
            row("MaxBinX", Mandatory, reader!(dyn Camera, max_bin_x), Validator::at_least(1.0)),
            row("MaxBinY", Mandatory, reader!(dyn Camera, max_bin_y), Validator::at_least(1.0)),
            row(
                "PixelSizeX",
                Mandatory,
                reader!(dyn Camera, pixel_size_x),
                Validator::at_least(0.0),
            ),
            row(
                "PixelSizeY",
                Mandatory,
                reader!(dyn Camera, pixel_size_y),
                Validator::at_least(0.0),
            ),
            row(
                "ElectronsPerADU",
                Optional,
                reader!(dyn Camera, electrons_per_adu),
                Validator::at_least(0.0),
            ),
            row(
                "FullWellCapacity",
                Optional,
                reader!(dyn Camera, full_well_capacity),
                Validator::at_least(0.0),
            ),
            row("HasShutter", Mandatory, reader!(dyn Camera, has_shutter), Validator::Any),
            row("ImageReady", Mandatory, reader!(dyn Camera, image_ready), Validator::Any),
            row(
                "CameraState",
                Mandatory,
                camera_state_reader(),
                Validator::range(0.0, 5.0),
            ),
            row(
                "CCDTemperature",
                Optional,
                reader!(dyn Camera, ccd_temperature),
                Validator::range(-300.0, 100.0),
            ),
            row(
                "HeatSinkTemperature",
                Optional,
                reader!(dyn Camera, heat_sink_temperature),
                Validator::range(-50.0, 100.0),
            ),
            row("CoolerOn", Optional, reader!(dyn Camera, cooler_on), Validator::Any),
            row(
                "CoolerPower",
                RequirementLevel::from_capability(caps.has("CanGetCoolerPower")),
                reader!(dyn Camera, cooler_power),
                Validator::range(0.0, 100.0),
            ),
            row(
                "SetCCDTemperature",
                RequirementLevel::from_capability(caps.has("CanSetCCDTemperature")),
                reader!(dyn Camera, set_ccd_temperature),
                Validator::range(-280.0, 100.0),
            ),
            row(
                "IsPulseGuiding",
                RequirementLevel::from_capability(caps.has("CanPulseGuide")),
                reader!(dyn Camera, is_pulse_guiding),
                Validator::Any,
            ),
            row("BinX", Mandatory, reader!(dyn Camera, bin_x), Validator::at_least(1.0)),
            row("BinY", Mandatory, reader!(dyn Camera, bin_y), Validator::at_least(1.0)),
            row("NumX", Mandatory, reader!(dyn Camera, num_x), Validator::at_least(1.0)),
            row("NumY", Mandatory, reader!(dyn Camera, num_y), Validator::at_least(1.0)),
            row("StartX", Mandatory, reader!(dyn Camera, start_x), Validator::at_least(0.0)),
            row("StartY", Mandatory, reader!(dyn Camera, start_y), Validator::at_least(0.0)),
        ];

        if caps.supports_version(2) {
            table.extend([
                row(
                    "ExposureMin",
                    Mandatory,
                    reader!(dyn Camera, exposure_min),
                    Validator::at_least(0.0),
                ),
                row(
                    "ExposureMax",
                    Mandatory,
                    reader!(dyn Camera, exposure_max),
                    Validator::at_least(0.0),
                ),
                row(
                    "ExposureResolution",
                    Mandatory,
                    reader!(dyn Camera, exposure_resolution),
                    Validator::at_least(0.0),
                ),
                row(
                    "FastReadout",
                    RequirementLevel::from_capability(caps.has("CanFastReadout")),
                    reader!(dyn Camera, fast_readout),
                    Validator::Any,
                ),
                row(
                    "ReadoutMode",
                    Mandatory,
                    reader!(dyn Camera, readout_mode),
                    Validator::at_least(0.0),
                ),
                row(
                    "ReadoutModes",
                    Mandatory,
                    reader!(dyn Camera, readout_modes),
                    Validator::NotEmpty,
                ),
                row("SensorName", Optional, reader!(dyn Camera, sensor_name), Validator::Any),
            ]);
        }
        table
    }

    fn performance_table() -> [PropertyCheck<dyn Camera>; 4] {
        let row = |name, read: Reader<dyn Camera>| {
            PropertyCheck::new(name, Optional, Fast, read, Validator::Any)
        };
        [
            row("CameraState", camera_state_reader()),
            row("CCDTemperature", reader!(dyn Camera, ccd_temperature)),
            row("ImageReady", reader!(dyn Camera, image_ready)),
            row("BinX", reader!(dyn Camera, bin_x)),
        ]
    }

    async fn check_binning(&self, ctx: &mut RunContext, sensor: Sensor) -> StepResult {
        let camera = &*self.camera;
        let asymmetric = self.caps.has("CanAsymmetricBin");
        let max_to_test = ctx.settings().camera.max_bin_to_test;

        let legal: Vec<i32> = (1..=sensor.max_bin_x.min(max_to_test)).collect();
        let illegal = [0, sensor.max_bin_x.saturating_add(1)];
        let result = write_values(
            ctx,
            "BinX",
            Mandatory,
            &legal,
            &illegal,
            move |bin| async move {
                camera.set_bin_x(bin).await?;
                if asymmetric {
                    Ok(())
                } else {
                    camera.set_bin_y(bin).await
                }
            },
            || camera.bin_x(),
        )
        .await;

        let result = match result {
            Ok(()) if asymmetric => {
                let legal: Vec<i32> = (1..=sensor.max_bin_y.min(max_to_test)).collect();
                let illegal = [0, sensor.max_bin_y.saturating_add(1)];
                write_values(
                    ctx,
                    "BinY",
                    Mandatory,
                    &legal,
                    &illegal,
                    |bin| camera.set_bin_y(bin),
                    || camera.bin_y(),
                )
                .await
            }
            other => other,
        };

        restore("binning", async {
            camera.set_bin_x(1).await?;
            camera.set_bin_y(1).await
        })
        .await;
        result
    }

    async fn check_subframe(&self, ctx: &mut RunContext, sensor: Sensor) -> StepResult {
        let camera = &*self.camera;
        let (half_x, half_y) = (sensor.x_size / 2, sensor.y_size / 2);

        let result = async {
            write_values(
                ctx,
                "StartX",
                Mandatory,
                &[half_x, 0],
                &[],
                |x| camera.set_start_x(x),
                || camera.start_x(),
            )
            .await?;
            write_values(
                ctx,
                "StartY",
                Mandatory,
                &[half_y, 0],
                &[],
                |y| camera.set_start_y(y),
                || camera.start_y(),
            )
            .await?;
            write_values(
                ctx,
                "NumX",
                Mandatory,
                &[half_x.max(1), sensor.x_size],
                &[],
                |x| camera.set_num_x(x),
                || camera.num_x(),
            )
            .await?;
            write_values(
                ctx,
                "NumY",
                Mandatory,
                &[half_y.max(1), sensor.y_size],
                &[],
                |y| camera.set_num_y(y),
                || camera.num_y(),
            )
            .await
        }
        .await;

        restore_full_frame(camera, sensor).await;
        result
    }

    async fn check_ccd_temperature_writes(&self, ctx: &mut RunContext) -> StepResult {
        let camera = &*self.camera;
        let can_set = self.caps.has("CanSetCCDTemperature");
        let original = camera.set_ccd_temperature().await.ok();

        let result = write_values(
            ctx,
            "SetCCDTemperature",
            RequirementLevel::from_capability(can_set),
            &[0.0],
            &[-281.0, 101.0],
            |temperature| camera.set_set_ccd_temperature(temperature),
            || camera.set_ccd_temperature(),
        )
        .await;

        if let Some(original) = original.filter(|_| can_set) {
            restore("SetCCDTemperature", camera.set_set_ccd_temperature(original)).await;
        }
        result
    }

    /// Gain or Offset: exactly one mode, then boundary writes in that mode.
    async fn check_level(&self, ctx: &mut RunContext, level: Level) -> StepResult {
        let camera = &*self.camera;
        let [min_name, max_name, list_name] = level.members();

        ctx.checkpoint()?;
        ctx.set_test(level.name());
        let min = timed(ctx, min_name, Fast, level.min(camera)).await;
        let max = timed(ctx, max_name, Fast, level.max(camera)).await;
        let list = timed(ctx, list_name, Fast, level.list(camera)).await;

        let probes = [
            ModeProbe::new("Value").member(min_name, &min).member(max_name, &max),
            ModeProbe::new("Index").member(list_name, &list),
        ];
        let bounds = match check_modes(ctx, level.name(), &probes) {
            Some("Value") => min.ok().zip(max.ok()),
            Some(_) => list
                .ok()
                .and_then(|list| i32::try_from(list.len()).ok())
                .filter(|&len| len > 0)
                .map(|len| (0, len - 1)),
            None => None,
        };

        let Some((min, max)) = bounds else {
            let any = Validator::Any;
            _ = read_property(ctx, level.name(), Optional, Fast, &any, level.get(camera)).await;
            return Ok(());
        };

        let original = level.get(camera).await.ok();
        let result = write_boundary(
            ctx,
            level.name(),
            MustBeImplemented,
            min,
            max,
            |value| level.set(camera, value),
            || level.get(camera),
        )
        .await;
        if let Some(original) = original {
            restore(level.name(), level.set(camera, original)).await;
        }
        result
    }

    async fn check_readout_mode(&self, ctx: &mut RunContext) -> StepResult {
        let camera = &*self.camera;
        let Ok(modes) = camera.readout_modes().await else {
            return Ok(());
        };
        let Some(last) = i32::try_from(modes.len())
            .ok()
            .filter(|&len| len > 0)
            .map(|len| len - 1)
        else {
            return Ok(());
        };

        let original = camera.readout_mode().await.ok();
        let result = write_boundary(
            ctx,
            "ReadoutMode",
            Mandatory,
            0,
            last,
            |mode| camera.set_readout_mode(mode),
            || camera.readout_mode(),
        )
        .await;
        if let Some(original) = original {
            restore("ReadoutMode", camera.set_readout_mode(original)).await;
        }
        result
    }

    /// Take one light frame and check the camera's account of it afterwards.
    async fn check_exposure(&self, ctx: &mut RunContext) -> StepResult {
        let camera = &*self.camera;
        let settings = ctx.settings().camera;
        let duration = settings.exposure_duration;
        let poll = PollSpec::with_timeout(ctx, seconds(duration) + settings.exposure_timeout);

        let completion = run_operation(
            ctx,
            "StartExposure",
            Mandatory,
            AwaitSpec::new(poll)
                .async_capability("CanAbortExposure", self.caps.has("CanAbortExposure")),
            || camera.start_exposure(duration, true),
            || camera.image_ready(),
        )
        .await?;
        if completion.is_none() {
            return Ok(());
        }

        match timed(ctx, "LastExposureDuration", Fast, camera.last_exposure_duration()).await {
            Ok(actual) if (actual - duration).abs() <= EXPOSURE_TOLERANCE * duration.max(1.0) => {
                ctx.ok("LastExposureDuration", format!("{actual}s as requested"));
            }
            Ok(actual) => ctx.issue(
                "LastExposureDuration",
                format!("Reported {actual}s but {duration}s was requested"),
            ),
            Err(err) => {
                let result = Err::<(), _>(err);
                _ = ctx.classify("LastExposureDuration", Mandatory, &result, Expect::Success);
            }
        }

        let state = camera.camera_state();
        _ = check_state(ctx, "StartExposure", "CameraState", state, CameraState::Idle).await;
        Ok(())
    }

    /// Exposure lengths the camera must refuse.
    async fn check_illegal_exposures(&self, ctx: &mut RunContext) -> StepResult {
        let camera = &*self.camera;
        let mut durations = vec![-1.0];
        durations.extend(self.exposure_max.map(|max| max + 1.0));

        for duration in durations {
            ctx.checkpoint()?;
            let test = format!("StartExposure {duration}s");
            ctx.set_test(&test);
            let start = camera.start_exposure(duration, true);
            let result = timed(ctx, &test, TargetDuration::Standard, start).await;
            let outcome = ctx.classify(&test, Mandatory, &result, Expect::InvalidValue);
            if result.is_ok() {
                self.settle_exposure(ctx).await;
            }
            if outcome == Outcome::Error {
                return Err(Abandon::Failed);
            }
        }
        Ok(())
    }

    /// Return to idle after an exposure that shouldn't have started.
    async fn settle_exposure(&self, ctx: &RunContext) {
        let camera = &*self.camera;
        if self.caps.has("CanAbortExposure") {
            restore("exposure", camera.abort_exposure()).await;
            return;
        }
        let poll = PollSpec::with_timeout(ctx, ctx.settings().camera.exposure_timeout);
        if let Err(err) = settle_until(ctx, "Exposure", poll, || is_idle(camera)).await {
            tracing::warn!(%err, "Camera didn't return to idle");
        }
    }

    /// AbortExposure or StopExposure: idle call, then an interrupted exposure.
    async fn check_interrupt(
        &self,
        ctx: &mut RunContext,
        name: &str,
        capability: &str,
        interrupt: for<'camera> fn(&'camera dyn Camera) -> BoxFuture<'camera, ASCOMResult>,
    ) -> StepResult {
        let camera = &*self.camera;
        let capable = self.caps.has(capability);
        let call = || interrupt(camera);

        ctx.checkpoint()?;
        let test = format!("{name} (idle)");
        ctx.set_test(&test);
        let result = timed(ctx, &test, TargetDuration::Standard, call()).await;
        let requirement = RequirementLevel::from_capability(capable);
        if ctx.classify(&test, requirement, &result, Expect::Success) == Outcome::Error {
            return Err(Abandon::Failed);
        }
        if !capable {
            return Ok(());
        }

        ctx.checkpoint()?;
        ctx.set_test(name);
        let duration = ctx.settings().camera.exposure_duration;
        if let Err(err) = camera.start_exposure(duration, true).await {
            ctx.error(name, format!("Couldn't start an exposure to interrupt: {err}"));
            return Err(Abandon::Failed);
        }
        if self.caps.supports_version(2) {
            _ = read_property(
                ctx,
                "PercentCompleted",
                Optional,
                Fast,
                &Validator::range(0.0, 100.0),
                camera.percent_completed(),
            )
            .await;
        }
        let result = timed(ctx, name, TargetDuration::Standard, call()).await;
        if ctx.classify(name, MustBeImplemented, &result, Expect::Success) == Outcome::Error {
            self.settle_exposure(ctx).await;
            return Err(Abandon::Failed);
        }

        let poll = PollSpec::with_timeout(ctx, ctx.settings().camera.exposure_timeout);
        match wait_until(ctx, name, poll, || is_idle(camera)).await {
            Ok(()) => {
                ctx.checkpoint()?;
                ctx.ok(name, "Camera returned to idle");
                Ok(())
            }
            Err(err) => {
                ctx.error(name, format!("Camera didn't return to idle: {err}"));
                ctx.mark_unstable();
                Err(Abandon::Failed)
            }
        }
    }

    async fn check_pulse_guide(&self, ctx: &mut RunContext) -> StepResult {
        let camera = &*self.camera;
        let duration_ms = ctx.settings().camera.pulse_guide_duration_ms;

        if !self.caps.has("CanPulseGuide") {
            ctx.checkpoint()?;
            ctx.set_test("PulseGuide");
            let pulse = camera.pulse_guide(GuideDirection::North, duration_ms);
            let result = timed(ctx, "PulseGuide", TargetDuration::Standard, pulse).await;
            let outcome = ctx.classify(
                "PulseGuide",
                RequirementLevel::MustNotBeImplemented,
                &result,
                Expect::Success,
            );
            if outcome == Outcome::Error {
                return Err(Abandon::Failed);
            }
            return Ok(());
        }

        let pulse = Duration::from_millis(u64::try_from(duration_ms).unwrap_or_default());
        let budget = pulse + ctx.settings().targets.extended;
        let spec = AwaitSpec::new(PollSpec::with_timeout(ctx, budget));
        for direction in GuideDirection::ALL {
            let test = format!("PulseGuide {direction:?}");
            _ = run_operation(
                ctx,
                &test,
                MustBeImplemented,
                spec,
                || camera.pulse_guide(direction, duration_ms),
                || async move { camera.is_pulse_guiding().await.map(|guiding| !guiding) },
            )
            .await?;
        }
        Ok(())
    }
}

/// CameraState as its numeric value.
fn camera_state_reader() -> Reader<dyn Camera> {
    reader!(dyn Camera, camera_state, |state: CameraState| PropertyValue::Int(state.into()))
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

async fn is_idle(camera: &dyn Camera) -> ASCOMResult<bool> {
    Ok(camera.camera_state().await? == CameraState::Idle)
}

async fn restore_full_frame(camera: &dyn Camera, sensor: Sensor) {
    restore("subframe", async {
        camera.set_start_x(0).await?;
        camera.set_start_y(0).await?;
        camera.set_num_x(sensor.x_size).await?;
        camera.set_num_y(sensor.y_size).await
    })
    .await;
}

#[async_trait::async_trait]
impl DeviceTester for CameraTester {
    fn device_type(&self) -> DeviceType {
        DeviceType::Camera
    }

    fn device(&self) -> &dyn Device {
        &*self.camera
    }

    async fn interface_version(&self) -> ASCOMResult<i32> {
        self.camera.interface_version().await
    }

    fn platform7_interface_version(&self) -> i32 {
        4
    }

    async fn read_capabilities(
        &mut self,
        ctx: &mut RunContext,
        interface_version: i32,
    ) -> StepResult {
        let table = Self::capability_table();
        self.caps = read_capability_table(ctx, &*self.camera, interface_version, &table).await?;
        Ok(())
    }

    async fn pre_run_check(&mut self, ctx: &mut RunContext) -> StepResult {
        let camera = Arc::clone(&self.camera);

        self.sensor = Sensor::read(&*camera).await.ok();
        if self.caps.supports_version(2) {
            self.exposure_max = camera.exposure_max().await.ok();
        }
        tracing::debug!(
            sensor = ?self.sensor,
            exposure_max = ?self.exposure_max,
            "Camera geometry"
        );

        match camera.camera_state().await {
            Ok(CameraState::Idle) | Err(_) => {}
            Ok(state) => {
                ctx.info("PreRunCheck", format!("Camera was {state:?} at the start of the run"));
                self.settle_exposure(ctx).await;
            }
        }
        Ok(())
    }

    async fn check_properties(&mut self, ctx: &mut RunContext) -> StepResult {
        let mut routines = Routines::new();
        routines.run(check_property_table(ctx, &*self.camera, &self.property_table()).await)?;

        if let Some(sensor) = self.sensor {
            routines.run(self.check_binning(ctx, sensor).await)?;
            routines.run(self.check_subframe(ctx, sensor).await)?;
        }
        routines.run(self.check_ccd_temperature_writes(ctx).await)?;

        if self.caps.supports_version(2) {
            routines.run(self.check_level(ctx, Level::Gain).await)?;
            routines.run(self.check_readout_mode(ctx).await)?;
        }
        if self.caps.supports_version(3) {
            routines.run(self.check_level(ctx, Level::Offset).await)?;
        }
        routines.finish()
    }

    async fn check_methods(&mut self, ctx: &mut RunContext) -> StepResult {
        let mut routines = Routines::new();
        routines.run(self.check_exposure(ctx).await)?;
        routines.run(self.check_illegal_exposures(ctx).await)?;
        routines.run(
            self.check_interrupt(ctx, "AbortExposure", "CanAbortExposure", |camera| {
                camera.abort_exposure()
            })
            .await,
        )?;
        routines.run(
            self.check_interrupt(ctx, "StopExposure", "CanStopExposure", |camera| {
                camera.stop_exposure()
            })
            .await,
        )?;
        routines.run(self.check_pulse_guide(ctx).await)?;
        routines.finish()
    }

    async fn check_performance(&mut self, ctx: &mut RunContext) -> StepResult {
        check_table_rates(ctx, &*self.camera, &Self::performance_table()).await
    }

    async fn post_run_check(&mut self, ctx: &mut RunContext) -> StepResult {
        let camera = Arc::clone(&self.camera);

        if matches!(
            camera.camera_state().await,
            Ok(CameraState::Waiting | CameraState::Exposing | CameraState::Reading)
        ) {
            tracing::info!("Exposure still running after the checks");
            self.settle_exposure(ctx).await;
        }
        if let Some(sensor) = self.sensor {
            restore("binning", async {
                camera.set_bin_x(1).await?;
                camera.set_bin_y(1).await
            })
            .await;
            restore_full_frame(&*camera, sensor).await;
        }
        Ok(())
    }
}
