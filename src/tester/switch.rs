use super::DeviceTester;
use crate::api::{Capabilities, Device, DeviceType, Switch};
use crate::completion::AwaitSpec;
use crate::context::{Abandon, Routines, RunContext, StepResult};
use crate::exercise::{check_state, measure_rate, read_property, restore, run_operation, Validator};
use crate::outcome::{Expect, Outcome, RequirementLevel};
use crate::timing::{timed, TargetDuration};
use crate::wait::PollSpec;
use crate::ASCOMResult;
use std::future::Future;
use std::sync::Arc;
use tokio::time::sleep;

use RequirementLevel::{Mandatory, MustBeImplemented, MustNotBeImplemented};
use TargetDuration::{Fast, Standard};

/// Readback difference, relative to the switch range, that counts as exact.
const EXACT_TOLERANCE: f64 = 0.0001;
/// Readback difference, relative to the switch range, that is still acceptable.
const NOTED_TOLERANCE: f64 = 0.01;

/// Static description of one switch.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SwitchInfo {
    id: i32,
    can_write: bool,
    can_async: bool,
    min: f64,
    max: f64,
}

impl SwitchInfo {
    async fn read(switch: &dyn Switch, id: i32, async_supported: bool) -> ASCOMResult<Self> {
        Ok(Self {
            id,
            can_write: switch.can_write(id).await?,
            can_async: async_supported && switch.can_async(id).await?,
            min: switch.min_switch_value(id).await?,
            max: switch.max_switch_value(id).await?,
        })
    }

    fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// How closely a value read back matches the value written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readback {
    Exact,
    Close,
    Wrong,
}

impl Readback {
    /// Compare relative to the switch range, or absolutely for a zero-width range.
    fn judge(written: f64, read: f64, range: f64) -> Self {
        let difference = (read - written).abs();
        let relative = if range > 0.0 { difference / range } else { difference };
        if relative <= EXACT_TOLERANCE {
            Self::Exact
        } else if relative <= NOTED_TOLERANCE {
            Self::Close
        } else {
            Self::Wrong
        }
    }
}

/// Checks for [`Switch`] devices.
#[derive(Debug)]
pub struct SwitchTester {
    switch: Arc<dyn Switch>,
    caps: Capabilities,
    max_switch: i32,
}

impl SwitchTester {
    /// Tester for the given switch device.
    pub fn new(switch: Arc<dyn Switch>) -> Self {
        Self {
            switch,
            caps: Capabilities::default(),
            max_switch: 0,
        }
    }

    fn async_supported(&self) -> bool {
        self.caps.supports_version(3)
    }

    /// Read and sanity-check every member describing one switch.
    async fn check_switch_members(&self, ctx: &mut RunContext, id: i32) -> StepResult {
        let switch = &*self.switch;
        let read_delay = ctx.settings().switch.read_delay;
        let any = Validator::Any;
        let text = Validator::NotEmpty;
        let label = |member: &str| format!("{member} {id}");

        ctx.checkpoint()?;
        ctx.set_test(label("Switch"));
        let test = label("GetSwitchName");
        _ = read_property(ctx, &test, Mandatory, Fast, &text, switch.get_switch_name(id)).await;
        let test = label("GetSwitchDescription");
        _ = read_property(ctx, &test, Mandatory, Fast, &any, switch.get_switch_description(id))
            .await;
        let test = label("CanWrite");
        _ = read_property(ctx, &test, Mandatory, Fast, &any, switch.can_write(id)).await;
        if self.async_supported() {
            let test = label("CanAsync");
            _ = read_property(ctx, &test, Mandatory, Fast, &any, switch.can_async(id)).await;
        }
        let test = label("GetSwitch");
        _ = read_property(ctx, &test, Mandatory, Fast, &any, switch.get_switch(id)).await;

        let test = label("MinSwitchValue");
        let min =
            read_property(ctx, &test, Mandatory, Fast, &any, switch.min_switch_value(id)).await;
        let test = label("MaxSwitchValue");
        let max =
            read_property(ctx, &test, Mandatory, Fast, &any, switch.max_switch_value(id)).await;
        let test = label("SwitchStep");
        let step = read_property(ctx, &test, Mandatory, Fast, &any, switch.switch_step(id)).await;
        let Some((min, max)) = min.zip(max) else {
            return Ok(());
        };

        let range = format!("Range {id}");
        if min < max {
            ctx.ok(&range, format!("{min} to {max}"));
        } else {
            ctx.issue(&range, format!("MinSwitchValue {min} is not below MaxSwitchValue {max}"));
        }

        if let Some(step) = step {
            let test = format!("SwitchStep {id}");
            if step <= 0.0 || step > max - min {
                ctx.issue(
                    &test,
                    format!(
                        "Step {step} must be positive and no larger than the range {min} to {max}"
                    ),
                );
            } else {
                let steps = (max - min) / step;
                if (steps - steps.round()).abs() > 1e-6 {
                    ctx.info(
                        &test,
                        format!("The range {min} to {max} is not a whole number of {step} steps"),
                    );
                }
            }
        }

        _ = read_property(
            ctx,
            &format!("GetSwitchValue {id}"),
            Mandatory,
            Fast,
            &Validator::range(min, max),
            switch.get_switch_value(id),
        )
        .await;

        sleep(read_delay).await;
        Ok(())
    }

    /// Every member must reject ids outside `0..MaxSwitch`.
    async fn check_invalid_ids(&self, ctx: &mut RunContext) -> StepResult {
        let switch = &*self.switch;
        let beyond = self.max_switch.saturating_add(ctx.settings().switch.extended_id_range);

        for id in [-1, self.max_switch, beyond] {
            ctx.checkpoint()?;
            ctx.set_test(format!("Invalid switch {id}"));

            let label = |member: &str| format!("{member} {id}");
            expect_invalid(ctx, &label("GetSwitch"), switch.get_switch(id)).await?;
            expect_invalid(ctx, &label("GetSwitchValue"), switch.get_switch_value(id)).await?;
            expect_invalid(ctx, &label("GetSwitchName"), switch.get_switch_name(id)).await?;
            let description = switch.get_switch_description(id);
            expect_invalid(ctx, &label("GetSwitchDescription"), description).await?;
            expect_invalid(ctx, &label("CanWrite"), switch.can_write(id)).await?;
            expect_invalid(ctx, &label("MinSwitchValue"), switch.min_switch_value(id)).await?;
            expect_invalid(ctx, &label("MaxSwitchValue"), switch.max_switch_value(id)).await?;
            expect_invalid(ctx, &label("SwitchStep"), switch.switch_step(id)).await?;
            if self.async_supported() {
                expect_invalid(ctx, &label("CanAsync"), switch.can_async(id)).await?;
            }
        }
        Ok(())
    }

    /// Write a value and compare what comes back after the write delay.
    async fn write_value(&self, ctx: &mut RunContext, info: &SwitchInfo, value: f64) -> StepResult {
        let switch = &*self.switch;
        let test = format!("SetSwitchValue {}", info.id);

        ctx.checkpoint()?;
        ctx.set_test(&test);
        let result = timed(ctx, &test, Standard, switch.set_switch_value(info.id, value)).await;
        if result.is_err() {
            return match ctx.classify(&test, MustBeImplemented, &result, Expect::Success) {
                Outcome::Error => Err(Abandon::Failed),
                _ => Ok(()),
            };
        }

        sleep(ctx.settings().switch.write_delay).await;
        self.check_value(ctx, &test, info, value).await
    }

    async fn check_value(
        &self,
        ctx: &mut RunContext,
        test: &str,
        info: &SwitchInfo,
        written: f64,
    ) -> StepResult {
        match timed(ctx, test, Fast, self.switch.get_switch_value(info.id)).await {
            Ok(read) => {
                match Readback::judge(written, read, info.range()) {
                    Readback::Exact => ctx.ok(test, format!("{written} written and read back")),
                    Readback::Close => ctx.ok(
                        test,
                        format!(
                            "Wrote {written} and read back {read}, within 1% of the switch range"
                        ),
                    ),
                    Readback::Wrong => {
                        ctx.issue(test, format!("Wrote {written} but read back {read}"));
                    }
                }
                Ok(())
            }
            Err(err) => {
                ctx.error(test, format!("Couldn't read the value back: {err}"));
                Err(Abandon::Failed)
            }
        }
    }

    /// SetSwitch false then true, each read back through GetSwitch.
    async fn write_states(&self, ctx: &mut RunContext, id: i32) -> StepResult {
        let switch = &*self.switch;
        let test = format!("SetSwitch {id}");

        for state in [false, true] {
            ctx.checkpoint()?;
            ctx.set_test(&test);
            let result = timed(ctx, &test, Standard, switch.set_switch(id, state)).await;
            if result.is_err() {
                let outcome = ctx.classify(&test, MustBeImplemented, &result, Expect::Success);
                return if outcome == Outcome::Error { Err(Abandon::Failed) } else { Ok(()) };
            }
            sleep(ctx.settings().switch.write_delay).await;
            _ = check_state(ctx, &test, "GetSwitch", switch.get_switch(id), state).await;
        }
        Ok(())
    }

    async fn check_async(&self, ctx: &mut RunContext, info: &SwitchInfo) -> StepResult {
        let switch = &*self.switch;
        let id = info.id;

        if !info.can_async {
            check_absent(ctx, &format!("SetAsync {id}"), switch.set_async(id, false)).await?;
            let set_value = switch.set_async_value(id, info.min);
            return check_absent(ctx, &format!("SetAsyncValue {id}"), set_value).await;
        }

        let spec = AwaitSpec::new(PollSpec::with_timeout(ctx, ctx.settings().switch.async_timeout));
        let complete = || switch.state_change_complete(id);

        let test = format!("SetAsync {id}");
        for state in [false, true] {
            let start = || switch.set_async(id, state);
            if run_operation(ctx, &test, MustBeImplemented, spec, start, complete)
                .await?
                .is_some()
            {
                _ = check_state(ctx, &test, "GetSwitch", switch.get_switch(id), state).await;
            }
        }

        let test = format!("SetAsyncValue {id}");
        for value in [info.min, info.max] {
            let start = || switch.set_async_value(id, value);
            if run_operation(ctx, &test, MustBeImplemented, spec, start, complete)
                .await?
                .is_some()
            {
                self.check_value(ctx, &test, info, value).await?;
            }
        }
        Ok(())
    }

    /// Writes for one switch, restoring its original value afterwards.
    async fn check_switch_writes(&self, ctx: &mut RunContext, info: &SwitchInfo) -> StepResult {
        let switch = &*self.switch;
        let id = info.id;

        if !info.can_write {
            check_absent(ctx, &format!("SetSwitch {id}"), switch.set_switch(id, false)).await?;
            let set_value = switch.set_switch_value(id, info.min);
            check_absent(ctx, &format!("SetSwitchValue {id}"), set_value).await?;
            return self.check_async(ctx, info).await;
        }

        let original = switch.get_switch_value(id).await.ok();
        let result = async {
            self.write_states(ctx, id).await?;
            self.write_value(ctx, info, info.min).await?;
            self.write_value(ctx, info, info.max).await?;

            for value in [info.min - 1.0, info.max + 1.0] {
                ctx.checkpoint()?;
                let test = format!("SetSwitchValue {id} {value}");
                ctx.set_test(&test);
                let result = timed(ctx, &test, Standard, switch.set_switch_value(id, value)).await;
                let outcome =
                    ctx.classify(&test, MustBeImplemented, &result, Expect::InvalidValue);
                if outcome == Outcome::Error {
                    return Err(Abandon::Failed);
                }
            }

            self.check_async(ctx, info).await
        }
        .await;

        if let Some(original) = original {
            restore("switch value", switch.set_switch_value(id, original)).await;
        }
        result
    }
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

/// Classify a call made with an invalid switch id.
async fn expect_invalid<T, Fut>(ctx: &mut RunContext, name: &str, call: Fut) -> StepResult
where
    T: Send,
    Fut: Future<Output = ASCOMResult<T>> + Send,
{
    let result = timed(ctx, name, Fast, call).await;
    match ctx.classify(name, Mandatory, &result, Expect::InvalidValue) {
        Outcome::Error => Err(Abandon::Failed),
        _ => Ok(()),
    }
}

#[async_trait::async_trait]
impl DeviceTester for SwitchTester {
    fn device_type(&self) -> DeviceType {
        DeviceType::Switch
    }

    fn device(&self) -> &dyn Device {
        &*self.switch
    }

    async fn interface_version(&self) -> ASCOMResult<i32> {
        self.switch.interface_version().await
    }

    fn platform7_interface_version(&self) -> i32 {
        3
    }

    /// Switches advertise no capability flags; MaxSwitch is read here since
    /// everything else depends on it.
    async fn read_capabilities(
        &mut self,
        ctx: &mut RunContext,
        interface_version: i32,
    ) -> StepResult {
        self.caps = Capabilities::builder(interface_version).finish();

        ctx.checkpoint()?;
        self.max_switch = read_property(
            ctx,
            "MaxSwitch",
            Mandatory,
            Fast,
            &Validator::at_least(0.0),
            self.switch.max_switch(),
        )
        .await
        .map_or(0, |max_switch| max_switch.max(0));
        Ok(())
    }

    async fn check_properties(&mut self, ctx: &mut RunContext) -> StepResult {
        let mut routines = Routines::new();
        for id in 0..self.max_switch {
            routines.run(self.check_switch_members(ctx, id).await)?;
        }
        routines.run(self.check_invalid_ids(ctx).await)?;
        routines.finish()
    }

    async fn check_methods(&mut self, ctx: &mut RunContext) -> StepResult {
        let async_supported = self.async_supported();
        let mut routines = Routines::new();
        for id in 0..self.max_switch {
            let info = match SwitchInfo::read(&*self.switch, id, async_supported).await {
                Ok(info) => info,
                Err(err) => {
                    ctx.info(
                        format!("Switch {id}"),
                        format!("Write checks skipped, couldn't describe the switch: {err}"),
                    );
                    continue;
                }
            };
            routines.run(self.check_switch_writes(ctx, &info).await)?;
        }
        routines.finish()
    }

    async fn check_performance(&mut self, ctx: &mut RunContext) -> StepResult {
        if self.max_switch == 0 {
            return Ok(());
        }
        let switch = &*self.switch;
        let duration = ctx.settings().performance_duration;
        measure_rate(ctx, "GetSwitch", duration, || switch.get_switch(0)).await?;
        measure_rate(ctx, "GetSwitchValue", duration, || switch.get_switch_value(0)).await
    }
}
