use super::{capability, read_capability_table, DeviceTester};
use crate::api::dome::ShutterState;
use crate::api::{Capabilities, Device, DeviceType, Dome};
use crate::completion::AwaitSpec;
use crate::context::{Abandon, Routines, RunContext, StepResult};
use crate::exercise::{
    check_property_table, check_state, check_table_rates, reader, restore, run_operation,
    PropertyCheck, PropertyValue, Reader, Validator,
};
use crate::outcome::{Expect, Outcome, RequirementLevel};
use crate::timing::{timed, TargetDuration};
use crate::wait::{settle_until, wait_while, PollSpec};
use crate::ASCOMResult;
use std::future::Future;
use std::sync::Arc;
use tokio::time::sleep;

use RequirementLevel::{Mandatory, MustBeImplemented, MustNotBeImplemented};
use TargetDuration::{Fast, Standard};

const ALTITUDE_TARGETS: [f64; 2] = [45.0, 0.0];
const ILLEGAL_ALTITUDES: [f64; 2] = [-10.0, 100.0];
const AZIMUTH_TARGETS: [f64; 4] = [90.0, 180.0, 270.0, 0.0];
const ILLEGAL_AZIMUTHS: [f64; 2] = [-10.0, 370.0];

/// Angular distance between two azimuths, accounting for wrap-around at 360°.
fn azimuth_difference(a: f64, b: f64) -> f64 {
    let difference = (a - b).rem_euclid(360.0);
    difference.min(360.0 - difference)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Altitude,
    Azimuth,
}

impl Axis {
    const fn capability(self) -> &'static str {
        match self {
            Self::Altitude => "CanSetAltitude",
            Self::Azimuth => "CanSetAzimuth",
        }
    }

    const fn method(self) -> &'static str {
        match self {
            Self::Altitude => "SlewToAltitude",
            Self::Azimuth => "SlewToAzimuth",
        }
    }

    const fn member(self) -> &'static str {
        match self {
            Self::Altitude => "Altitude",
            Self::Azimuth => "Azimuth",
        }
    }

    fn difference(self, requested: f64, actual: f64) -> f64 {
        match self {
            Self::Altitude => (requested - actual).abs(),
            Self::Azimuth => azimuth_difference(requested, actual),
        }
    }

    async fn slew(self, dome: &dyn Dome, target: f64) -> ASCOMResult {
        match self {
            Self::Altitude => dome.slew_to_altitude(target).await,
            Self::Azimuth => dome.slew_to_azimuth(target).await,
        }
    }

    async fn position(self, dome: &dyn Dome) -> ASCOMResult<f64> {
        match self {
            Self::Altitude => dome.altitude().await,
            Self::Azimuth => dome.azimuth().await,
        }
    }
}

/// Checks for [`Dome`] devices.
///
/// Shutter movement is opt-in through the dome settings.
#[derive(Debug)]
pub struct DomeTester {
    dome: Arc<dyn Dome>,
    caps: Capabilities,
}

impl DomeTester {
    /// Tester for the given dome.
    pub fn new(dome: Arc<dyn Dome>) -> Self {
        Self {
            dome,
            caps: Capabilities::default(),
        }
    }

    fn capability_table() -> [PropertyCheck<dyn Dome>; 8] {
        [
            capability("CanFindHome", reader!(dyn Dome, can_find_home)),
            capability("CanPark", reader!(dyn Dome, can_park)),
            capability("CanSetAltitude", reader!(dyn Dome, can_set_altitude)),
            capability("CanSetAzimuth", reader!(dyn Dome, can_set_azimuth)),
            capability("CanSetPark", reader!(dyn Dome, can_set_park)),
            capability("CanSetShutter", reader!(dyn Dome, can_set_shutter)),
            capability("CanSlave", reader!(dyn Dome, can_slave)),
            capability("CanSyncAzimuth", reader!(dyn Dome, can_sync_azimuth)),
        ]
    }

    fn property_table(&self) -> [PropertyCheck<dyn Dome>; 7] {
        let caps = &self.caps;
        let row = |name, requirement, read: Reader<dyn Dome>, validator| {
            PropertyCheck::new(name, requirement, Fast, read, validator)
        };
        let shutter_status: Reader<dyn Dome> =
            reader!(dyn Dome, shutter_status, |status: ShutterState| {
                PropertyValue::Int(status.into())
            });

        [
            row(
                "Altitude",
                RequirementLevel::from_capability(caps.has("CanSetAltitude")),
                reader!(dyn Dome, altitude),
                Validator::range(0.0, 90.0),
            ),
            row(
                "Azimuth",
                RequirementLevel::from_capability(caps.has("CanSetAzimuth")),
                reader!(dyn Dome, azimuth),
                Validator::range(0.0, 360.0),
            ),
            row(
                "AtHome",
                RequirementLevel::from_capability(caps.has("CanFindHome")),
                reader!(dyn Dome, at_home),
                Validator::Any,
            ),
            row(
                "AtPark",
                RequirementLevel::from_capability(caps.has("CanPark")),
                reader!(dyn Dome, at_park),
                Validator::Any,
            ),
            row(
                "ShutterStatus",
                RequirementLevel::from_capability(caps.has("CanSetShutter")),
                shutter_status,
                Validator::range(0.0, 4.0),
            ),
            row("Slaved", Mandatory, reader!(dyn Dome, slaved), Validator::Any),
            row("Slewing", Mandatory, reader!(dyn Dome, slewing), Validator::Any),
        ]
    }

    fn slew_spec(ctx: &RunContext) -> AwaitSpec {
        AwaitSpec::new(PollSpec::with_timeout(ctx, ctx.settings().dome.slew_timeout))
    }

    /// Call a member the device must not implement and classify the answer.
    async fn check_absent<Fut>(ctx: &mut RunContext, name: &str, call: Fut) -> StepResult
    where
        Fut: Future<Output = ASCOMResult> + Send,
    {
        ctx.checkpoint()?;
        ctx.set_test(name);
        let result = timed(ctx, name, Standard, call).await;
        match ctx.classify(name, MustNotBeImplemented, &result, Expect::Success) {
            Outcome::Error => Err(Abandon::Failed),
            _ => Ok(()),
        }
    }

    async fn check_slaved_write(&self, ctx: &mut RunContext) -> StepResult {
        let dome = &*self.dome;
        if !self.caps.has("CanSlave") {
            return Self::check_absent(ctx, "Slaved write", dome.set_slaved(true)).await;
        }

        for slaved in [true, false] {
            ctx.checkpoint()?;
            ctx.set_test("Slaved write");
            let result = timed(ctx, "Slaved write", Standard, dome.set_slaved(slaved)).await;
            if result.is_err() {
                let outcome =
                    ctx.classify("Slaved write", MustBeImplemented, &result, Expect::Success);
                return if outcome == Outcome::Error { Err(Abandon::Failed) } else { Ok(()) };
            }
            _ = check_state(ctx, "Slaved write", "Slaved", dome.slaved(), slaved).await;
        }
        Ok(())
    }

    /// Open or close the shutter and confirm where it ended up.
    async fn move_shutter(&self, ctx: &mut RunContext, open: bool) -> StepResult {
        let dome = &*self.dome;
        let (name, expected) = if open {
            ("OpenShutter", ShutterState::Open)
        } else {
            ("CloseShutter", ShutterState::Closed)
        };
        let spec = AwaitSpec::new(PollSpec::with_timeout(ctx, ctx.settings().dome.shutter_timeout));

        let completion = run_operation(
            ctx,
            name,
            MustBeImplemented,
            spec,
            || async move {
                if open {
                    dome.open_shutter().await
                } else {
                    dome.close_shutter().await
                }
            },
            || async move { dome.shutter_status().await.map(|status| !status.is_moving()) },
        )
        .await?;

        if completion.is_some()
            && !check_state(ctx, name, "ShutterStatus", dome.shutter_status(), expected).await
        {
            return Err(Abandon::Failed);
        }
        Ok(())
    }

    async fn check_shutter(&self, ctx: &mut RunContext) -> StepResult {
        let dome = &*self.dome;
        if !self.caps.has("CanSetShutter") {
            return Self::check_absent(ctx, "CloseShutter", dome.close_shutter()).await;
        }
        if !ctx.settings().dome.allow_shutter_movement {
            ctx.info("OpenShutter", "Skipped, shutter movement is not allowed by the settings");
            return Ok(());
        }

        let starts_open = matches!(dome.shutter_status().await, Ok(ShutterState::Open));
        for open in [!starts_open, starts_open] {
            self.move_shutter(ctx, open).await?;
        }
        Ok(())
    }

    /// Sleep for the settle time, then compare the reported position with the request.
    async fn check_position(
        &self,
        ctx: &mut RunContext,
        test: &str,
        axis: Axis,
        requested: f64,
    ) -> StepResult {
        let settings = ctx.settings().dome;
        sleep(settings.settle_time).await;

        let member = axis.member();
        match timed(ctx, member, Fast, axis.position(&*self.dome)).await {
            Ok(actual) if axis.difference(requested, actual) <= settings.slew_tolerance => {
                ctx.ok(
                    test,
                    format!(
                        "{member} {actual:.2} is within {}° of the requested {requested}",
                        settings.slew_tolerance
                    ),
                );
                Ok(())
            }
            Ok(actual) => {
                ctx.issue(
                    test,
                    format!(
                        "{member} {actual:.2} differs from the requested {requested} by more than {}°",
                        settings.slew_tolerance
                    ),
                );
                Ok(())
            }
            Err(err) => {
                ctx.error(test, format!("Couldn't read {member} after the slew: {err}"));
                Err(Abandon::Failed)
            }
        }
    }

    async fn check_slews(&self, ctx: &mut RunContext, axis: Axis) -> StepResult {
        let dome = &*self.dome;
        let (targets, illegal): (&[f64], &[f64]) = match axis {
            Axis::Altitude => (&ALTITUDE_TARGETS, &ILLEGAL_ALTITUDES),
            Axis::Azimuth => (&AZIMUTH_TARGETS, &ILLEGAL_AZIMUTHS),
        };

        if !self.caps.has(axis.capability()) {
            return Self::check_absent(ctx, axis.method(), axis.slew(dome, targets[0])).await;
        }

        let spec = Self::slew_spec(ctx);
        for &target in targets {
            let test = format!("{} {target}", axis.method());
            let completion = run_operation(
                ctx,
                &test,
                MustBeImplemented,
                spec,
                || axis.slew(dome, target),
                || async move { dome.slewing().await.map(|slewing| !slewing) },
            )
            .await?;
            if completion.is_some() {
                self.check_position(ctx, &test, axis, target).await?;
            }
        }

        for &target in illegal {
            ctx.checkpoint()?;
            let test = format!("{} {target}", axis.method());
            ctx.set_test(&test);
            let result = timed(ctx, &test, Standard, axis.slew(dome, target)).await;
            let outcome = ctx.classify(&test, MustBeImplemented, &result, Expect::InvalidValue);
            if result.is_ok() {
                self.settle_slew(ctx).await;
            }
            if outcome == Outcome::Error {
                return Err(Abandon::Failed);
            }
        }
        Ok(())
    }

    /// Wait out a slew that shouldn't have started, aborting it if it doesn't end.
    async fn settle_slew(&self, ctx: &RunContext) {
        let dome = &*self.dome;
        let poll = PollSpec::with_timeout(ctx, ctx.settings().dome.slew_timeout);
        if let Err(err) = wait_while(ctx, "Slewing", poll, || dome.slewing()).await {
            tracing::warn!(%err, "Dome didn't stop slewing");
            restore("slew", dome.abort_slew()).await;
        }
    }

    async fn check_sync(&self, ctx: &mut RunContext) -> StepResult {
        let dome = &*self.dome;
        if !self.caps.has("CanSyncAzimuth") {
            return Self::check_absent(ctx, "SyncToAzimuth", dome.sync_to_azimuth(45.0)).await;
        }

        ctx.checkpoint()?;
        ctx.set_test("SyncToAzimuth");
        let original = match dome.azimuth().await {
            Ok(azimuth) => azimuth,
            Err(err) => {
                ctx.error("SyncToAzimuth", format!("Couldn't read Azimuth before syncing: {err}"));
                return Err(Abandon::Failed);
            }
        };
        let target = (original + 45.0).rem_euclid(360.0);

        let result = timed(ctx, "SyncToAzimuth", Standard, dome.sync_to_azimuth(target)).await;
        if result.is_err() {
            let outcome =
                ctx.classify("SyncToAzimuth", MustBeImplemented, &result, Expect::Success);
            return if outcome == Outcome::Error { Err(Abandon::Failed) } else { Ok(()) };
        }
        let checked = self.check_position(ctx, "SyncToAzimuth", Axis::Azimuth, target).await;
        restore("azimuth sync", dome.sync_to_azimuth(original)).await;
        checked
    }

    async fn check_abort_slew(&self, ctx: &mut RunContext) -> StepResult {
        let dome = &*self.dome;

        ctx.checkpoint()?;
        ctx.set_test("AbortSlew");
        let result = timed(ctx, "AbortSlew", Standard, dome.abort_slew()).await;
        if ctx.classify("AbortSlew", Mandatory, &result, Expect::Success) == Outcome::Error {
            return Err(Abandon::Failed);
        }
        if result.is_err() || !self.caps.has("CanSetAzimuth") {
            return Ok(());
        }

        let azimuth = dome.azimuth().await.unwrap_or_default();
        if let Err(err) = dome.slew_to_azimuth((azimuth + 180.0).rem_euclid(360.0)).await {
            ctx.error("AbortSlew", format!("Couldn't start a slew to abort: {err}"));
            return Err(Abandon::Failed);
        }
        let result = timed(ctx, "AbortSlew", Standard, dome.abort_slew()).await;
        if ctx.classify("AbortSlew", Mandatory, &result, Expect::Success) == Outcome::Error {
            self.settle_slew(ctx).await;
            return Err(Abandon::Failed);
        }
        if !check_state(ctx, "AbortSlew", "Slewing", dome.slewing(), false).await {
            self.settle_slew(ctx).await;
        }
        Ok(())
    }

    /// FindHome or Park, followed by the AtHome / AtPark check.
    async fn check_homing(&self, ctx: &mut RunContext, park: bool) -> StepResult {
        let dome = &*self.dome;
        let (name, capability, member) = if park {
            ("Park", "CanPark", "AtPark")
        } else {
            ("FindHome", "CanFindHome", "AtHome")
        };
        let capable = self.caps.has(capability);
        let begin = || async move {
            if park {
                dome.park().await
            } else {
                dome.find_home().await
            }
        };

        if !capable {
            return Self::check_absent(ctx, name, begin()).await;
        }

        let spec = Self::slew_spec(ctx);
        let completion = run_operation(
            ctx,
            name,
            MustBeImplemented,
            spec,
            begin,
            || async move { dome.slewing().await.map(|slewing| !slewing) },
        )
        .await?;
        if completion.is_some() {
            let position = async move {
                if park {
                    dome.at_park().await
                } else {
                    dome.at_home().await
                }
            };
            _ = check_state(ctx, name, member, position, true).await;
        }
        Ok(())
    }

    /// SetPark, run while parked so the park position doesn't change.
    async fn check_set_park(&self, ctx: &mut RunContext) -> StepResult {
        let dome = &*self.dome;
        let requirement = RequirementLevel::from_capability(self.caps.has("CanSetPark"));

        ctx.checkpoint()?;
        ctx.set_test("SetPark");
        let result = timed(ctx, "SetPark", Standard, dome.set_park()).await;
        match ctx.classify("SetPark", requirement, &result, Expect::Success) {
            Outcome::Error => Err(Abandon::Failed),
            _ => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl DeviceTester for DomeTester {
    fn device_type(&self) -> DeviceType {
        DeviceType::Dome
    }

    fn device(&self) -> &dyn Device {
        &*self.dome
    }

    async fn interface_version(&self) -> ASCOMResult<i32> {
        self.dome.interface_version().await
    }

    fn platform7_interface_version(&self) -> i32 {
        3
    }

    async fn read_capabilities(
        &mut self,
        ctx: &mut RunContext,
        interface_version: i32,
    ) -> StepResult {
        let table = Self::capability_table();
        self.caps = read_capability_table(ctx, &*self.dome, interface_version, &table).await?;
        Ok(())
    }

    async fn pre_run_check(&mut self, ctx: &mut RunContext) -> StepResult {
        if self.caps.has("CanSlave") && matches!(self.dome.slaved().await, Ok(true)) {
            ctx.info("PreRunCheck", "Dome was slaved, disabling slaving for the checks");
            restore("slaving", self.dome.set_slaved(false)).await;
        }
        self.settle_slew(ctx).await;
        Ok(())
    }

    async fn check_properties(&mut self, ctx: &mut RunContext) -> StepResult {
        let mut routines = Routines::new();
        routines.run(check_property_table(ctx, &*self.dome, &self.property_table()).await)?;
        routines.run(self.check_slaved_write(ctx).await)?;
        routines.finish()
    }

    async fn check_methods(&mut self, ctx: &mut RunContext) -> StepResult {
        let mut routines = Routines::new();
        routines.run(self.check_shutter(ctx).await)?;
        routines.run(self.check_slews(ctx, Axis::Altitude).await)?;
        routines.run(self.check_slews(ctx, Axis::Azimuth).await)?;
        routines.run(self.check_sync(ctx).await)?;
        routines.run(self.check_abort_slew(ctx).await)?;
        routines.run(self.check_homing(ctx, false).await)?;
        routines.run(self.check_homing(ctx, true).await)?;
        routines.run(self.check_set_park(ctx).await)?;
        routines.finish()
    }

    async fn check_performance(&mut self, ctx: &mut RunContext) -> StepResult {
        check_table_rates(ctx, &*self.dome, &self.property_table()).await
    }

    async fn post_run_check(&mut self, ctx: &mut RunContext) -> StepResult {
        let dome = &*self.dome;

        if matches!(dome.slewing().await, Ok(true)) {
            restore("slew", dome.abort_slew()).await;
        }
        if self.caps.has("CanSetShutter") && ctx.settings().dome.allow_shutter_movement {
            restore("shutter", dome.close_shutter()).await;
            let poll = PollSpec::with_timeout(ctx, ctx.settings().dome.shutter_timeout);
            let closed = || async move {
                dome.shutter_status()
                    .await
                    .map(|status| status == ShutterState::Closed)
            };
            if let Err(err) = settle_until(ctx, "CloseShutter", poll, closed).await {
                tracing::warn!(%err, "Shutter didn't close after the checks");
            }
        }
        Ok(())
    }
}
