//! Checks shared by every device category.

use crate::api::Device;
use crate::completion::AwaitSpec;
use crate::context::{Abandon, RunContext, StepResult};
use crate::exercise::{check_state, read_property, run_operation, Validator};
use crate::outcome::RequirementLevel::Mandatory;
use crate::timing::{timed, TargetDuration};
use crate::wait::{wait_while, PollSpec};

/// Connect to the device and confirm it reports being connected.
///
/// Platform 7 devices are connected through `Connect`, awaited on
/// `Connecting`; older ones by writing `Connected`.
pub(super) async fn connect(
    ctx: &mut RunContext,
    device: &dyn Device,
    platform7: bool,
) -> StepResult {
    let mut connected_via_method = false;

    if platform7 {
        let poll = PollSpec::with_timeout(ctx, ctx.settings().connect_timeout);
        connected_via_method = run_operation(
            ctx,
            "Connect",
            Mandatory,
            AwaitSpec::new(poll),
            || device.connect(),
            || async move { device.connecting().await.map(|connecting| !connecting) },
        )
        .await?
        .is_some();
    }

    if !connected_via_method {
        ctx.set_test("Connected");
        let connecting = device.set_connected(true);
        if let Err(err) = timed(ctx, "Connected", TargetDuration::Standard, connecting).await {
            ctx.error("Connected", format!("Couldn't connect to the device: {err}"));
            return Err(Abandon::Failed);
        }
    }

    if check_state(ctx, "Connected", "Connected", device.connected(), true).await {
        Ok(())
    } else {
        Err(Abandon::Failed)
    }
}

/// Whether a version string has the `n.n` form.
fn is_major_minor(version: &str) -> bool {
    version.split_once('.').is_some_and(|(major, minor)| {
        [major, minor]
            .iter()
            .all(|part| !part.is_empty() && part.bytes().all(|byte| byte.is_ascii_digit()))
    })
}

/// Read the members every device has.
pub(super) async fn check_common_properties(
    ctx: &mut RunContext,
    device: &dyn Device,
    platform7: bool,
) -> StepResult {
    let fast = TargetDuration::Fast;
    let text = &Validator::NotEmpty;

    ctx.checkpoint()?;
    _ = read_property(ctx, "Description", Mandatory, fast, text, device.description()).await;
    _ = read_property(ctx, "DriverInfo", Mandatory, fast, text, device.driver_info()).await;

    let version =
        read_property(ctx, "DriverVersion", Mandatory, fast, text, device.driver_version()).await;
    if let Some(version) = version.filter(|version| !is_major_minor(version)) {
        ctx.issue(
            "DriverVersion",
            format!("{version:?} is not in the required n.n form"),
        );
    }

    _ = read_property(ctx, "Name", Mandatory, fast, text, device.name()).await;
    _ = read_property(
        ctx,
        "SupportedActions",
        Mandatory,
        fast,
        &Validator::Any,
        device.supported_actions(),
    )
    .await;

    if platform7 {
        ctx.checkpoint()?;
        _ = check_state(ctx, "Connecting", "Connecting", device.connecting(), false).await;
    }
    Ok(())
}

/// Disconnect, logging rather than recording any failure.
pub(super) async fn disconnect(ctx: &mut RunContext, device: &dyn Device, platform7: bool) {
    if platform7 {
        if let Err(err) = device.disconnect().await {
            tracing::warn!(%err, "Disconnect failed");
            return;
        }
        let poll = PollSpec::with_timeout(ctx, ctx.settings().connect_timeout);
        if let Err(err) = wait_while(ctx, "Disconnecting", poll, || device.connecting()).await {
            tracing::warn!(%err, "Device didn't finish disconnecting");
            return;
        }
    } else if let Err(err) = device.set_connected(false).await {
        tracing::warn!(%err, "Couldn't disconnect");
        return;
    }

    match device.connected().await {
        Ok(false) => ctx.ok("Dispose", "Device disconnected"),
        Ok(true) => tracing::warn!("Device still reports being connected after disconnecting"),
        Err(err) => tracing::warn!(%err, "Couldn't read Connected after disconnecting"),
    }
}
