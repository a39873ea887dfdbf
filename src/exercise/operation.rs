use crate::completion::{begin_and_await, AwaitSpec, Completion};
use crate::context::{Abandon, RunContext};
use crate::outcome::{Expect, Outcome, RequirementLevel};
use crate::timing::{timed, TargetDuration};
use crate::ASCOMResult;
use std::fmt::Debug;
use std::future::Future;

/// Start a state-changing operation and await its completion.
///
/// The start call is classified against `requirement`. Returns the completion
/// when the operation ran, `Ok(None)` when it was correctly reported as not
/// implemented, and `Err` when the routine should be abandoned: the run was
/// cancelled, the operation timed out, or an Error was recorded.
pub async fn run_operation<B, BFut, P, PFut>(
    ctx: &mut RunContext,
    name: &str,
    requirement: RequirementLevel,
    spec: AwaitSpec,
    begin: B,
    is_complete: P,
) -> Result<Option<Completion>, Abandon>
where
    B: FnOnce() -> BFut + Send,
    BFut: Future<Output = ASCOMResult> + Send,
    P: FnMut() -> PFut + Send,
    PFut: Future<Output = ASCOMResult<bool>> + Send,
{
    ctx.checkpoint()?;
    ctx.set_test(name);
    ctx.set_action("Starting operation");

    let completion = match begin_and_await(ctx, name, spec, begin, is_complete).await {
        Ok(completion) => completion,
        Err(err) => {
            return match ctx.classify(name, requirement, &Err::<(), _>(err), Expect::Success) {
                Outcome::Error => Err(Abandon::Failed),
                _ => Ok(None),
            };
        }
    };

    if requirement == RequirementLevel::MustNotBeImplemented {
        _ = ctx.classify(name, requirement, &ASCOMResult::Ok(()), Expect::Success);
    }

    match completion {
        Completion::Cancelled => Err(Abandon::Cancelled),
        Completion::TimedOut { .. } => Err(Abandon::Failed),
        Completion::Synchronous { begin } => {
            ctx.ok(
                name,
                format!("Completed synchronously in {:.1}s", begin.as_secs_f64()),
            );
            Ok(Some(completion))
        }
        Completion::Asynchronous { total, .. } => {
            ctx.ok(
                name,
                format!("Completed asynchronously in {:.1}s", total.as_secs_f64()),
            );
            Ok(Some(completion))
        }
    }
}

/// Check a post-condition: the member must read back as `expected`.
///
/// Returns whether it did.
pub async fn check_state<T, Fut>(
    ctx: &mut RunContext,
    name: &str,
    member: &str,
    read: Fut,
    expected: T,
) -> bool
where
    T: PartialEq + Debug + Send,
    Fut: Future<Output = ASCOMResult<T>> + Send,
{
    match timed(ctx, member, TargetDuration::Fast, read).await {
        Ok(actual) if actual == expected => {
            ctx.ok(name, format!("{member} is {actual:?} as expected"));
            true
        }
        Ok(actual) => {
            ctx.issue(name, format!("{member} is {actual:?}, expected {expected:?}"));
            false
        }
        Err(err) => {
            ctx.error(name, format!("Couldn't read {member}: {err}"));
            false
        }
    }
}

/// Run a cleanup call, logging and otherwise ignoring any failure.
///
/// Cleanup must never mask the result of the check that preceded it, so nothing
/// is recorded.
pub async fn restore<Fut>(what: &str, call: Fut)
where
    Fut: Future<Output = ASCOMResult> + Send,
{
    if let Err(err) = call.await {
        tracing::warn!(%err, "Couldn't restore {what}");
    }
}
