//! Telling synchronous from asynchronous completion of long operations.
//!
//! Exposures, slews, shutter moves and asynchronous switch changes are all
//! started by one call and finished when a status member flips. A driver may
//! either block inside the start call until the operation is over, or return
//! at once and let the caller poll. [`begin_and_await`] observes which of the
//! two happened, decides once, and only then commits to a wait strategy.

use crate::context::{Progress, RunContext};
use crate::timing::{measure, TargetDuration};
use crate::wait::{wait_until, PollSpec, WaitError};
use crate::ASCOMResult;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// How a long operation is awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwaitSpec {
    /// Poll interval and budget for the asynchronous branch.
    pub poll: PollSpec,
    /// A capability that, when advertised, implies the operation should run asynchronously.
    pub async_capability: Option<(&'static str, bool)>,
}

impl AwaitSpec {
    /// Await with the given poll settings and no capability cross-check.
    pub const fn new(poll: PollSpec) -> Self {
        Self {
            poll,
            async_capability: None,
        }
    }

    /// Note synchronous completion as Info when `name` is advertised as `true`.
    pub const fn async_capability(mut self, name: &'static str, advertised: bool) -> Self {
        self.async_capability = Some((name, advertised));
        self
    }
}

/// Which branch a long operation ended up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Already complete when the start call returned.
    Synchronous {
        /// Duration of the start call.
        begin: Duration,
    },
    /// Completed later, observed by polling.
    Asynchronous {
        /// Duration of the start call.
        begin: Duration,
        /// Time from the start call until completion was observed.
        total: Duration,
    },
    /// Did not complete within the budget; the device may be mid-operation.
    TimedOut {
        /// Duration of the start call.
        begin: Duration,
        /// Time spent before giving up.
        waited: Duration,
    },
    /// The run was cancelled while waiting.
    Cancelled,
}

impl Completion {
    /// Whether the operation was observed to finish.
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Synchronous { .. } | Self::Asynchronous { .. })
    }
}

/// Reports progress to the run observer while a blocking start call is in flight.
///
/// Aborted, not awaited, when dropped.
struct ProgressTicker(Option<JoinHandle<()>>);

impl ProgressTicker {
    fn spawn(ctx: &RunContext, label: &str, poll: PollSpec) -> Self {
        let Some(observer) = ctx.observer() else {
            return Self(None);
        };
        if poll.interval.is_zero() {
            return Self(None);
        }

        let label = label.to_owned();
        let start = Instant::now();

        Self(Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(start + poll.interval, poll.interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                _ = ticks.tick().await;
                let progress = Progress {
                    label: &label,
                    elapsed: start.elapsed(),
                    timeout: poll.timeout,
                };
                _ = catch_unwind(AssertUnwindSafe(|| observer.progress(progress)));
            }
        })))
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        if let Some(task) = &self.0 {
            task.abort();
        }
    }
}

/// Start a long operation and wait for it to complete.
///
/// Errors from `begin` or `is_complete` are returned for the caller to
/// classify. Records produced here:
/// - Issue: completed synchronously but `begin` exceeded the Standard target;
/// - Info: completed synchronously although the async capability is advertised;
/// - Error: timed out, in which case the run is also marked unstable.
#[tracing::instrument(level = "debug", skip_all, fields(label = %label))]
pub async fn begin_and_await<B, BFut, P, PFut>(
    ctx: &mut RunContext,
    label: &str,
    spec: AwaitSpec,
    begin: B,
    mut is_complete: P,
) -> ASCOMResult<Completion>
where
    B: FnOnce() -> BFut + Send,
    BFut: Future<Output = ASCOMResult> + Send,
    P: FnMut() -> PFut + Send,
    PFut: Future<Output = ASCOMResult<bool>> + Send,
{
    let start = Instant::now();

    let ticker = ProgressTicker::spawn(ctx, label, spec.poll);
    let (begun, begin_elapsed) = measure(begin()).await;
    drop(ticker);
    begun?;

    if is_complete().await? {
        tracing::debug!(?begin_elapsed, "Completed synchronously");

        let standard = TargetDuration::Standard.ceiling(&ctx.settings().targets);
        if begin_elapsed > standard {
            ctx.issue(
                label,
                format!(
                    "Operation completed synchronously, blocking for {:.1}s which exceeds the Standard target of {:.1}s",
                    begin_elapsed.as_secs_f64(),
                    standard.as_secs_f64()
                ),
            );
        }
        if let Some((capability, true)) = spec.async_capability {
            ctx.info(
                label,
                format!("{capability} is true but the operation completed synchronously"),
            );
        }
        return Ok(Completion::Synchronous {
            begin: begin_elapsed,
        });
    }

    tracing::debug!(?begin_elapsed, "Running asynchronously, polling for completion");

    match wait_until(ctx, label, spec.poll, is_complete).await {
        Ok(()) if ctx.is_cancelled() => Ok(Completion::Cancelled),
        Ok(()) => Ok(Completion::Asynchronous {
            begin: begin_elapsed,
            total: start.elapsed(),
        }),
        Err(WaitError::Timeout { elapsed, .. }) => {
            ctx.error(
                label,
                format!(
                    "Operation did not complete within {:.1}s. The device may have been left in an unstable state and later tests may fail as a result",
                    elapsed.as_secs_f64()
                ),
            );
            ctx.mark_unstable();
            Ok(Completion::TimedOut {
                begin: begin_elapsed,
                waited: elapsed,
            })
        }
        Err(WaitError::Device(err)) => Err(err),
    }
}
