/*!
Device tester state machine.

A run walks a device through a fixed sequence of steps:

InitialiseTest → CreateDevice → ReadCapabilities → PreRunCheck →
CheckProperties → CheckMethods → CheckPerformance → PostRunCheck → Dispose

Cancellation is checked between every step. A step that records an Error is
abandoned and the run carries on with the next one; only a failure to create
and connect the device is fatal. PostRunCheck and Dispose always run.
*/

mod common;

#[cfg(feature = "camera")]
mod camera;
#[cfg(feature = "camera")]
pub use camera::CameraTester;

#[cfg(feature = "dome")]
mod dome;
#[cfg(feature = "dome")]
pub use dome::DomeTester;

#[cfg(feature = "observing_conditions")]
mod observing_conditions;
#[cfg(feature = "observing_conditions")]
pub use observing_conditions::ObservingConditionsTester;

#[cfg(feature = "switch")]
mod switch;
#[cfg(feature = "switch")]
pub use switch::SwitchTester;

use crate::api::{Capabilities, Device, DeviceType, TypedDevice};
use crate::context::{Abandon, RunContext, StepResult, Summary};
use crate::exercise::{read_property, PropertyCheck, PropertyValue, Reader, Validator};
use crate::outcome::RequirementLevel;
use crate::timing::TargetDuration;
use crate::ASCOMResult;
use serde::Serialize;

/// Steps of a conformance run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, Serialize)]
pub enum Step {
    /// Announce the run.
    InitialiseTest,
    /// Read the interface version, connect and check the common members.
    CreateDevice,
    /// Read the capability flags.
    ReadCapabilities,
    /// Bring the device into a testable state.
    PreRunCheck,
    /// Read and write properties.
    CheckProperties,
    /// Invoke methods.
    CheckMethods,
    /// Measure transaction rates.
    CheckPerformance,
    /// Return the device to a quiescent state.
    PostRunCheck,
    /// Disconnect.
    Dispose,
}

/// Overall result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Every step ran.
    pub completed: bool,
    /// The run was cancelled.
    pub cancelled: bool,
    /// The device could not be created or connected.
    pub fatal: bool,
    /// A state-changing operation timed out, so the device may be mid-operation.
    pub unstable: bool,
    /// Record counts per outcome.
    pub summary: Summary,
}

/// Device-specific half of a conformance run.
///
/// [`run_tests`] drives the lifecycle; implementations supply the checks for
/// one device category.
#[async_trait::async_trait]
#[allow(unused_variables)]
pub trait DeviceTester: Send + Sync {
    /// Category of the device under test.
    fn device_type(&self) -> DeviceType;

    /// The device under test, through the members common to all categories.
    fn device(&self) -> &dyn Device;

    /// Interface version declared by the device.
    async fn interface_version(&self) -> ASCOMResult<i32>;

    /// First interface version with the Platform 7 `Connect` / `Disconnect` / `Connecting` members.
    fn platform7_interface_version(&self) -> i32;

    /// Read the capability flags and freeze them.
    async fn read_capabilities(
        &mut self,
        ctx: &mut RunContext,
        interface_version: i32,
    ) -> StepResult;

    /// Bring the device into a testable state.
    async fn pre_run_check(&mut self, ctx: &mut RunContext) -> StepResult {
        Ok(())
    }

    /// Read and write properties.
    async fn check_properties(&mut self, ctx: &mut RunContext) -> StepResult;

    /// Invoke methods.
    async fn check_methods(&mut self, ctx: &mut RunContext) -> StepResult;

    /// Measure transaction rates.
    async fn check_performance(&mut self, ctx: &mut RunContext) -> StepResult {
        Ok(())
    }

    /// Return the device to a quiescent state.
    ///
    /// Runs even after cancellation; failures must be logged, not recorded.
    async fn post_run_check(&mut self, ctx: &mut RunContext) -> StepResult {
        Ok(())
    }
}

/// Create the tester matching a device's category.
pub fn tester_for(device: TypedDevice) -> Box<dyn DeviceTester> {
    match device {
        #[cfg(feature = "camera")]
        TypedDevice::Camera(camera) => Box::new(CameraTester::new(camera)),
        #[cfg(feature = "dome")]
        TypedDevice::Dome(dome) => Box::new(DomeTester::new(dome)),
        #[cfg(feature = "observing_conditions")]
        TypedDevice::ObservingConditions(device) => {
            Box::new(ObservingConditionsTester::new(device))
        }
        #[cfg(feature = "switch")]
        TypedDevice::Switch(switch) => Box::new(SwitchTester::new(switch)),
    }
}

/// Run the full conformance sequence against a device.
pub async fn run(device: TypedDevice, ctx: &mut RunContext) -> RunReport {
    let mut tester = tester_for(device);
    run_tests(tester.as_mut(), ctx).await
}

/// Drive `tester` through every step.
#[tracing::instrument(skip_all, fields(device_type = %tester.device_type()))]
pub async fn run_tests(tester: &mut dyn DeviceTester, ctx: &mut RunContext) -> RunReport {
    let mut cancelled = false;
    let mut fatal = false;

    ctx.set_test(Step::InitialiseTest.to_string());
    tracing::info!(settings = ?ctx.settings(), "Starting conformance run");

    let created = create_device(tester, ctx).await;
    let platform7 = match created {
        Ok(interface_version) => {
            let platform7 = interface_version >= tester.platform7_interface_version();
            let settings = ctx.settings();
            let steps = [
                (Step::ReadCapabilities, true),
                (Step::PreRunCheck, true),
                (Step::CheckProperties, settings.test_properties),
                (Step::CheckMethods, settings.test_methods),
                (Step::CheckPerformance, settings.test_performance),
            ];

            for (step, enabled) in steps {
                if !enabled {
                    tracing::debug!(%step, "Step disabled in settings");
                    continue;
                }
                if ctx.checkpoint().is_err() {
                    cancelled = true;
                    break;
                }

                ctx.set_test(step.to_string());
                let result = match step {
                    Step::ReadCapabilities => {
                        tester.read_capabilities(ctx, interface_version).await
                    }
                    Step::PreRunCheck => tester.pre_run_check(ctx).await,
                    Step::CheckProperties => tester.check_properties(ctx).await,
                    Step::CheckMethods => tester.check_methods(ctx).await,
                    Step::CheckPerformance => tester.check_performance(ctx).await,
                    Step::InitialiseTest
                    | Step::CreateDevice
                    | Step::PostRunCheck
                    | Step::Dispose => Ok(()),
                };
                match result {
                    Ok(()) => {}
                    Err(Abandon::Cancelled) => {
                        cancelled = true;
                        break;
                    }
                    Err(Abandon::Failed) => {
                        tracing::warn!(%step, "Step abandoned after an unexpected error");
                    }
                }
            }

            ctx.set_test(Step::PostRunCheck.to_string());
            if tester.post_run_check(ctx).await.is_err() {
                tracing::warn!("Post run check didn't complete");
            }
            platform7
        }
        Err(abandon) => {
            cancelled = abandon == Abandon::Cancelled;
            fatal = abandon == Abandon::Failed;
            false
        }
    };

    ctx.set_test(Step::Dispose.to_string());
    common::disconnect(ctx, tester.device(), platform7).await;

    let report = RunReport {
        completed: !cancelled && !fatal,
        cancelled,
        fatal,
        unstable: ctx.is_unstable(),
        summary: ctx.summary(),
    };
    tracing::info!(?report, "Conformance run finished: {}", report.summary);
    report
}

/// CreateDevice: read the interface version, connect and check the common members.
///
/// Returns the interface version; any failure here is fatal to the run.
async fn create_device(tester: &dyn DeviceTester, ctx: &mut RunContext) -> Result<i32, Abandon> {
    ctx.set_test(Step::CreateDevice.to_string());

    let interface_version = read_property(
        ctx,
        "InterfaceVersion",
        RequirementLevel::Mandatory,
        TargetDuration::Fast,
        &Validator::at_least(1.0),
        tester.interface_version(),
    )
    .await
    .unwrap_or(1);

    let platform7 = interface_version >= tester.platform7_interface_version();
    common::connect(ctx, tester.device(), platform7).await?;
    common::check_common_properties(ctx, tester.device(), platform7).await?;

    Ok(interface_version)
}

/// A capability table row: mandatory, fast, any value.
const fn capability<D: ?Sized>(name: &'static str, read: Reader<D>) -> PropertyCheck<D> {
    PropertyCheck::new(
        name,
        RequirementLevel::Mandatory,
        TargetDuration::Fast,
        read,
        Validator::Any,
    )
}

/// Read every flag in a capability table.
///
/// Flags that can't be read are left out, which makes them count as `false`.
async fn read_capability_table<D: ?Sized + Sync>(
    ctx: &mut RunContext,
    device: &D,
    interface_version: i32,
    table: &[PropertyCheck<D>],
) -> Result<Capabilities, Abandon> {
    let mut builder = Capabilities::builder(interface_version);
    for row in table {
        ctx.checkpoint()?;
        ctx.set_test(row.name);
        if let Some(PropertyValue::Bool(value)) = read_property(
            ctx,
            row.name,
            row.requirement,
            row.target,
            &row.validator,
            (row.read)(device),
        )
        .await
        {
            _ = builder.flag(row.name, value);
        }
    }
    let capabilities = builder.finish();
    tracing::debug!(?capabilities, "Capabilities read");
    Ok(capabilities)
}
