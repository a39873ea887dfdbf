use super::PropertyCheck;
use crate::context::{RunContext, StepResult};
use crate::ASCOMResult;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Calls per second at or below which a transaction rate is only Info.
const ACCEPTABLE_RATE: f64 = 10.0;

/// Call `call` repeatedly for `duration` and record the achieved rate.
///
/// Stops early on the first failure (recorded as Info) or on cancellation.
/// Each call is expected to take some time; a call that completes without ever
/// yielding to the timer would never let `duration` elapse under a paused clock.
pub async fn measure_rate<T, F, Fut>(
    ctx: &mut RunContext,
    name: &str,
    duration: Duration,
    mut call: F,
) -> StepResult
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = ASCOMResult<T>> + Send,
{
    ctx.checkpoint()?;
    let test = format!("Performance - {name}");
    ctx.set_test(&test);
    ctx.set_action("Measuring transaction rate");

    let start = Instant::now();
    let mut calls = 0_u32;
    while start.elapsed() < duration {
        if let Err(err) = call().await {
            ctx.info(&test, format!("Skipped, the call failed: {err}"));
            return Ok(());
        }
        calls += 1;
        ctx.checkpoint()?;
    }

    let elapsed = start.elapsed().as_secs_f64();
    if calls == 0 || elapsed <= 0.0 {
        ctx.info(&test, "Skipped, no calls completed within the measurement period");
        return Ok(());
    }
    let rate = f64::from(calls) / elapsed;
    let message = format!("Transaction rate: {rate:.1} per second");
    if rate > ACCEPTABLE_RATE {
        ctx.ok(&test, message);
    } else {
        ctx.info(&test, message);
    }
    Ok(())
}

/// Measure the transaction rate of every row in a property table.
pub async fn check_table_rates<D: ?Sized + Sync>(
    ctx: &mut RunContext,
    device: &D,
    table: &[PropertyCheck<D>],
) -> StepResult {
    let duration = ctx.settings().performance_duration;
    for row in table {
        measure_rate(ctx, row.name, duration, || (row.read)(device)).await?;
    }
    Ok(())
}
