use crate::context::RunContext;
use crate::settings::TargetSettings;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;

/// Named response-time ceiling a call is expected to meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum TargetDuration {
    /// Simple property reads.
    Fast,
    /// Ordinary method calls and the initiating call of long operations.
    Standard,
    /// Calls involving hardware round trips.
    Extended,
}

impl TargetDuration {
    /// The configured ceiling for this class.
    pub const fn ceiling(self, targets: &TargetSettings) -> Duration {
        match self {
            Self::Fast => targets.fast,
            Self::Standard => targets.standard,
            Self::Extended => targets.extended,
        }
    }
}

/// Await `operation` and return its output together with how long it took.
pub async fn measure<F: Future>(operation: F) -> (F::Output, Duration) {
    let start = Instant::now();
    let output = operation.await;
    (output, start.elapsed())
}

/// Await `operation`, recording an Issue if it exceeded the ceiling for `target`.
///
/// Purely observational: the operation's output, errors included, is returned
/// unchanged.
pub async fn timed<F: Future>(
    ctx: &mut RunContext,
    label: &str,
    target: TargetDuration,
    operation: F,
) -> F::Output {
    let span = tracing::debug_span!("call", label, %target);
    let (output, elapsed) = measure(operation).instrument(span).await;
    let ceiling = target.ceiling(&ctx.settings().targets);
    if elapsed > ceiling {
        ctx.issue(
            label,
            format!(
                "Response time {:.3}s exceeds the {target} target of {:.3}s",
                elapsed.as_secs_f64(),
                ceiling.as_secs_f64()
            ),
        );
    }
    output
}
