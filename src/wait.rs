//! Bounded polling of a device predicate.
//!
//! Polling is cooperative: the caller's task evaluates the predicate, sleeps
//! for the poll interval and repeats. No poller task is spawned. Cancellation
//! ends a wait early but is not an error; callers check
//! [`RunContext::checkpoint`] afterwards. Teardown waits use
//! [`settle_until`], which runs to completion or timeout regardless.

use crate::context::RunContext;
use crate::{ASCOMError, ASCOMResult};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

/// Poll interval and overall budget of a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSpec {
    /// Delay between predicate evaluations.
    pub interval: Duration,
    /// Budget after which the wait fails.
    pub timeout: Duration,
}

impl PollSpec {
    /// A wait with the given interval and budget.
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// A wait using the run's configured poll interval.
    pub const fn with_timeout(ctx: &RunContext, timeout: Duration) -> Self {
        Self::new(ctx.settings().poll_interval, timeout)
    }
}

/// Failure of a bounded wait.
#[derive(Debug, Error)]
pub enum WaitError {
    /// The predicate did not flip within the budget.
    #[error("{label} did not complete within {timeout:?} (waited {elapsed:?})")]
    Timeout {
        /// What was being waited for.
        label: String,
        /// Time actually spent.
        elapsed: Duration,
        /// The budget.
        timeout: Duration,
    },
    /// The predicate itself failed.
    #[error(transparent)]
    Device(#[from] ASCOMError),
}

impl From<WaitError> for ASCOMError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Device(err) => err,
            timeout @ WaitError::Timeout { .. } => Self::timeout(timeout),
        }
    }
}

/// Poll `busy` until it returns `false`.
///
/// The predicate is evaluated immediately, so an already idle device returns
/// without sleeping. Returns `Ok(())` early if the run is cancelled.
pub async fn wait_while<F, Fut>(
    ctx: &RunContext,
    label: &str,
    poll: PollSpec,
    busy: F,
) -> Result<(), WaitError>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = ASCOMResult<bool>> + Send,
{
    poll_while(ctx, label, poll, &ctx.cancellation_token(), busy).await
}

async fn poll_while<F, Fut>(
    ctx: &RunContext,
    label: &str,
    poll: PollSpec,
    cancellation: &CancellationToken,
    mut busy: F,
) -> Result<(), WaitError>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = ASCOMResult<bool>> + Send,
{
    let start = Instant::now();

    loop {
        if !busy().await? {
            tracing::trace!(label, elapsed = ?start.elapsed(), "Wait finished");
            return Ok(());
        }

        if cancellation.is_cancelled() {
            tracing::debug!(label, "Wait abandoned after cancellation");
            return Ok(());
        }

        let elapsed = start.elapsed();
        if elapsed >= poll.timeout {
            tracing::debug!(label, ?elapsed, timeout = ?poll.timeout, "Wait timed out");
            return Err(WaitError::Timeout {
                label: label.to_owned(),
                elapsed,
                timeout: poll.timeout,
            });
        }

        ctx.report_progress(label, elapsed, poll.timeout);

        tokio::select! {
            () = sleep(poll.interval.min(poll.timeout - elapsed)) => {}
            () = cancellation.cancelled() => {}
        }
    }
}

/// Poll `done` until it returns `true`.
pub async fn wait_until<F, Fut>(
    ctx: &RunContext,
    label: &str,
    poll: PollSpec,
    mut done: F,
) -> Result<(), WaitError>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = ASCOMResult<bool>> + Send,
{
    wait_while(ctx, label, poll, move || {
        let done = done();
        async move { done.await.map(|done| !done) }
    })
    .await
}

/// Poll `done` until it returns `true`, ignoring cancellation.
///
/// For returning the device to rest after a run, which has to finish even
/// when the run itself was cancelled. Only the budget ends it early.
pub async fn settle_until<F, Fut>(
    ctx: &RunContext,
    label: &str,
    poll: PollSpec,
    mut done: F,
) -> Result<(), WaitError>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = ASCOMResult<bool>> + Send,
{
    let never_cancelled = CancellationToken::new();
    poll_while(ctx, label, poll, &never_cancelled, move || {
        let done = done();
        async move { done.await.map(|done| !done) }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Progress, RunObserver};
    use crate::settings::ConformSettings;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const INTERVAL: Duration = Duration::from_millis(500);

    fn ctx() -> RunContext {
        RunContext::new(ConformSettings::default())
    }

    fn paused_runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .expect("runtime")
    }

    /// Runs `wait_while` with a predicate that stays busy for `busy_polls` evaluations.
    async fn wait_busy_for(
        ctx: &RunContext,
        busy_polls: usize,
        poll: PollSpec,
    ) -> (Result<(), WaitError>, usize, Duration) {
        let mut calls = 0;
        let start = Instant::now();
        let result = wait_while(ctx, "Slewing", poll, || {
            calls += 1;
            let busy = calls <= busy_polls;
            async move { Ok(busy) }
        })
        .await;
        (result, calls, start.elapsed())
    }

    #[tokio::test(start_paused = true)]
    async fn already_idle_returns_without_sleeping() {
        let (result, calls, elapsed) =
            wait_busy_for(&ctx(), 0, PollSpec::new(INTERVAL, Duration::from_secs(10))).await;

        assert!(result.is_ok());
        assert_eq!(calls, 1);
        assert_eq!(elapsed, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn busy_for_n_polls_sleeps_n_intervals() {
        let (result, calls, elapsed) =
            wait_busy_for(&ctx(), 3, PollSpec::new(INTERVAL, Duration::from_secs(10))).await;

        assert!(result.is_ok());
        assert_eq!(calls, 4);
        assert!(elapsed >= INTERVAL * 3, "{elapsed:?}");
        assert!(elapsed < INTERVAL * 3 + Duration::from_millis(5), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn never_idle_times_out_once() {
        let timeout = Duration::from_secs(2);
        let (result, calls, elapsed) =
            wait_busy_for(&ctx(), usize::MAX, PollSpec::new(INTERVAL, timeout)).await;

        match result {
            Err(WaitError::Timeout {
                label,
                elapsed: reported,
                timeout: budget,
            }) => {
                assert_eq!(label, "Slewing");
                assert_eq!(budget, timeout);
                assert!(reported >= timeout);
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
        assert_eq!(calls, 5);
        assert!(elapsed >= timeout && elapsed <= timeout + INTERVAL, "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn predicate_errors_propagate() {
        let result = wait_until(
            &ctx(),
            "ImageReady",
            PollSpec::new(INTERVAL, Duration::from_secs(5)),
            || async { Err::<bool, _>(ASCOMError::NOT_CONNECTED) },
        )
        .await;

        assert!(matches!(
            result,
            Err(WaitError::Device(ASCOMError { code, .. }))
                if code == ASCOMError::NOT_CONNECTED.code
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_the_wait_without_error() {
        let ctx = ctx();
        let token = ctx.cancellation_token();
        let canceller = tokio::spawn(async move {
            sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        let (result, _, elapsed) =
            wait_busy_for(&ctx, usize::MAX, PollSpec::new(INTERVAL, Duration::from_secs(60)))
                .await;

        assert!(result.is_ok());
        assert!(ctx.is_cancelled());
        assert!(elapsed < Duration::from_secs(2), "{elapsed:?}");
        canceller.await.expect("canceller task");
    }

    #[tokio::test(start_paused = true)]
    async fn settling_outlasts_cancellation() {
        let ctx = ctx();
        ctx.cancellation_token().cancel();
        let mut calls = 0;
        let start = Instant::now();

        let result = settle_until(
            &ctx,
            "CloseShutter",
            PollSpec::new(INTERVAL, Duration::from_secs(10)),
            || {
                calls += 1;
                let closed = calls > 3;
                async move { Ok(closed) }
            },
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(calls, 4);
        assert!(start.elapsed() >= INTERVAL * 3, "{:?}", start.elapsed());
    }

    #[derive(Default)]
    struct TickCounter(AtomicUsize);

    impl RunObserver for TickCounter {
        fn progress(&self, progress: Progress<'_>) {
            assert_eq!(progress.label, "Slewing");
            _ = self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn every_busy_poll_reports_progress() {
        let ticks = Arc::new(TickCounter::default());
        let ctx = ctx().with_observer(Arc::clone(&ticks) as Arc<dyn RunObserver>);

        let (result, _, _) =
            wait_busy_for(&ctx, 4, PollSpec::new(INTERVAL, Duration::from_secs(10))).await;

        assert!(result.is_ok());
        assert_eq!(ticks.0.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn timeouts_convert_to_ascom_timeout_errors() {
        let err = ASCOMError::from(WaitError::Timeout {
            label: "ShutterStatus".to_owned(),
            elapsed: Duration::from_secs(3),
            timeout: Duration::from_secs(3),
        });
        assert_eq!(err.code, ASCOMError::timeout("").code);
        assert!(err.message.contains("ShutterStatus"));
    }

    proptest! {
        #[test]
        fn sleeps_match_busy_polls(busy_polls in 0_usize..20, interval_ms in 1_u64..1_000) {
            let interval = Duration::from_millis(interval_ms);
            let poll = PollSpec::new(interval, Duration::from_secs(3_600));
            let (result, calls, elapsed) =
                paused_runtime().block_on(async { wait_busy_for(&ctx(), busy_polls, poll).await });

            prop_assert!(result.is_ok());
            prop_assert_eq!(calls, busy_polls + 1);
            let busy = u32::try_from(busy_polls).expect("small");
            prop_assert!(elapsed >= interval * busy);
            prop_assert!(elapsed <= interval * busy + Duration::from_millis(u64::from(busy) + 1));
        }

        #[test]
        fn timeout_bounds_wall_time(interval_ms in 1_u64..1_000, timeout_ms in 0_u64..10_000) {
            let poll = PollSpec::new(
                Duration::from_millis(interval_ms),
                Duration::from_millis(timeout_ms),
            );
            let (result, _, elapsed) =
                paused_runtime().block_on(async { wait_busy_for(&ctx(), usize::MAX, poll).await });

            prop_assert!(
                matches!(result, Err(WaitError::Timeout { .. })),
                "expected a timeout"
            );
            prop_assert!(elapsed >= poll.timeout);
            prop_assert!(elapsed <= poll.timeout + poll.interval);
        }
    }
}
