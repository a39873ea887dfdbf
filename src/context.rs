//! Run-scoped state shared by every exercise routine.

use crate::outcome::{classify, Classification, Expect, Outcome, RequirementLevel};
use crate::settings::ConformSettings;
use crate::ASCOMResult;
use serde::Serialize;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// One classified line item of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRecord {
    /// Member or test name, e.g. `CanAbortExposure` or `StartExposure`.
    pub test: String,
    /// Severity.
    pub outcome: Outcome,
    /// Explanation.
    pub message: String,
}

const TEST_WIDTH: usize = 35;
const OUTCOME_WIDTH: usize = 8;

impl fmt::Display for TestRecord {
    /// Fixed-width report line: test name, outcome, message.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{test:<TEST_WIDTH$} {outcome:<OUTCOME_WIDTH$} {message}",
            test = self.test,
            outcome = self.outcome.to_string(),
            message = self.message,
        )
    }
}

/// Per-outcome record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Number of `Ok` records.
    pub ok: usize,
    /// Number of `Info` records.
    pub info: usize,
    /// Number of `Issue` records.
    pub issues: usize,
    /// Number of `Error` records.
    pub errors: usize,
}

impl Summary {
    fn add(&mut self, outcome: Outcome) {
        *match outcome {
            Outcome::Ok => &mut self.ok,
            Outcome::Info => &mut self.info,
            Outcome::Issue => &mut self.issues,
            Outcome::Error => &mut self.errors,
        } += 1;
    }

    /// Count of records with the given outcome.
    pub const fn count(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Ok => self.ok,
            Outcome::Info => self.info,
            Outcome::Issue => self.issues,
            Outcome::Error => self.errors,
        }
    }

    /// The most severe outcome recorded, if any.
    pub const fn worst(&self) -> Option<Outcome> {
        if self.errors > 0 {
            Some(Outcome::Error)
        } else if self.issues > 0 {
            Some(Outcome::Issue)
        } else if self.info > 0 {
            Some(Outcome::Info)
        } else if self.ok > 0 {
            Some(Outcome::Ok)
        } else {
            None
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} OK, {} info, {} issues, {} errors",
            self.ok, self.info, self.issues, self.errors
        )
    }
}

/// Labels describing what the run is currently doing, for live display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    /// Current test, e.g. `StartExposure`.
    pub test: String,
    /// Current action within the test, e.g. `Waiting for ImageReady`.
    pub action: String,
    /// Free-form status, e.g. elapsed time.
    pub status: String,
}

/// A progress tick from a bounded wait or a long-running call.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'label> {
    /// What is being waited for.
    pub label: &'label str,
    /// Time spent so far.
    pub elapsed: Duration,
    /// The budget for the wait.
    pub timeout: Duration,
}

/// Receives notifications from a running conformance check.
///
/// Implementations must not block; panics are caught and discarded.
pub trait RunObserver: Send + Sync {
    /// A result line was recorded.
    fn record(&self, record: &TestRecord) {
        let _ = record;
    }

    /// The status labels changed.
    fn status(&self, status: &StatusLine) {
        let _ = status;
    }

    /// A wait ticked.
    fn progress(&self, progress: Progress<'_>) {
        let _ = progress;
    }
}

/// Why an exercise routine stopped before finishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abandon {
    /// The run was cancelled; not a failure.
    Cancelled,
    /// An `Error` was recorded and continuing the step would be unsafe.
    Failed,
}

/// Result of an exercise routine or a tester step.
pub type StepResult = Result<(), Abandon>;

/// Runs the routines of one step independently of each other.
///
/// A failed routine is remembered and the next one still runs; only
/// cancellation stops the step early.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Routines {
    failed: bool,
}

impl Routines {
    /// Start a step with no failed routines.
    pub const fn new() -> Self {
        Self { failed: false }
    }

    /// Take the result of one routine; `Err` only on cancellation.
    pub fn run(&mut self, result: StepResult) -> StepResult {
        match result {
            Err(Abandon::Failed) => {
                self.failed = true;
                Ok(())
            }
            other => other,
        }
    }

    /// The step result: `Failed` if any routine failed.
    pub const fn finish(self) -> StepResult {
        if self.failed {
            Err(Abandon::Failed)
        } else {
            Ok(())
        }
    }
}

macro_rules! trace_outcome {
    ($outcome:expr, $($args:tt)*) => {
        match $outcome {
            Outcome::Ok => tracing::trace!(target: "ascom_conform::record", $($args)*),
            Outcome::Info => tracing::info!(target: "ascom_conform::record", $($args)*),
            Outcome::Issue | Outcome::Error => {
                tracing::error!(target: "ascom_conform::record", $($args)*)
            }
        }
    };
}

/// State carried through a conformance run.
///
/// Owned and mutated by the orchestrating task only; observers get read-only
/// notifications.
pub struct RunContext {
    settings: ConformSettings,
    cancellation: CancellationToken,
    started: Instant,
    status: StatusLine,
    records: Vec<TestRecord>,
    summary: Summary,
    unstable: bool,
    observer: Option<Arc<dyn RunObserver>>,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("status", &self.status)
            .field("summary", &self.summary)
            .field("unstable", &self.unstable)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl RunContext {
    /// Create a context for a new run.
    pub fn new(settings: ConformSettings) -> Self {
        Self {
            settings,
            cancellation: CancellationToken::new(),
            started: Instant::now(),
            status: StatusLine::default(),
            records: Vec::new(),
            summary: Summary::default(),
            unstable: false,
            observer: None,
        }
    }

    /// Forward records, status changes and progress ticks to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Use an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Run settings.
    pub const fn settings(&self) -> &ConformSettings {
        &self.settings
    }

    /// Token that cancels this run when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// `Err(Abandon::Cancelled)` once cancellation was requested.
    pub fn checkpoint(&self) -> StepResult {
        if self.is_cancelled() {
            Err(Abandon::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Time since the run started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Current status labels.
    pub const fn status(&self) -> &StatusLine {
        &self.status
    }

    /// Start a new test; clears the action and status labels.
    pub fn set_test(&mut self, test: impl Into<String>) {
        self.status = StatusLine {
            test: test.into(),
            ..StatusLine::default()
        };
        self.notify_status();
    }

    /// Update the current action label.
    pub fn set_action(&mut self, action: impl Into<String>) {
        self.status.action = action.into();
        self.status.status.clear();
        self.notify_status();
    }

    /// Update the free-form status label.
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status.status = status.into();
        self.notify_status();
    }

    fn notify_status(&self) {
        if let Some(observer) = &self.observer {
            _ = catch_unwind(AssertUnwindSafe(|| observer.status(&self.status)));
        }
    }

    /// Report a wait tick to the observer.
    pub fn report_progress(&self, label: &str, elapsed: Duration, timeout: Duration) {
        if let Some(observer) = &self.observer {
            _ = catch_unwind(AssertUnwindSafe(|| {
                observer.progress(Progress {
                    label,
                    elapsed,
                    timeout,
                });
            }));
        }
    }

    pub(crate) fn observer(&self) -> Option<Arc<dyn RunObserver>> {
        self.observer.clone()
    }

    /// Record a result line.
    pub fn record(
        &mut self,
        test: impl Into<String>,
        outcome: Outcome,
        message: impl Into<String>,
    ) {
        let record = TestRecord {
            test: test.into(),
            outcome,
            message: message.into(),
        };
        trace_outcome!(outcome, test = %record.test, %outcome, "{}", record.message);
        self.summary.add(outcome);
        if let Some(observer) = &self.observer {
            _ = catch_unwind(AssertUnwindSafe(|| observer.record(&record)));
        }
        self.records.push(record);
    }

    /// Record an `Ok` line.
    pub fn ok(&mut self, test: impl Into<String>, message: impl Into<String>) {
        self.record(test, Outcome::Ok, message);
    }

    /// Record an `Info` line.
    pub fn info(&mut self, test: impl Into<String>, message: impl Into<String>) {
        self.record(test, Outcome::Info, message);
    }

    /// Record an `Issue` line.
    pub fn issue(&mut self, test: impl Into<String>, message: impl Into<String>) {
        self.record(test, Outcome::Issue, message);
    }

    /// Record an `Error` line.
    pub fn error(&mut self, test: impl Into<String>, message: impl Into<String>) {
        self.record(test, Outcome::Error, message);
    }

    /// Classify a call result and record it; returns the outcome.
    pub fn classify<T>(
        &mut self,
        test: impl Into<String>,
        requirement: RequirementLevel,
        result: &ASCOMResult<T>,
        expect: Expect,
    ) -> Outcome {
        let Classification { outcome, message } =
            classify(requirement, result.as_ref().err(), expect);
        self.record(test, outcome, message);
        outcome
    }

    /// All records so far.
    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    /// Per-outcome counts so far.
    pub const fn summary(&self) -> Summary {
        self.summary
    }

    /// Flag that the device may have been left mid-operation.
    pub fn mark_unstable(&mut self) {
        self.unstable = true;
    }

    /// Whether a state-changing operation timed out during this run.
    pub const fn is_unstable(&self) -> bool {
        self.unstable
    }
}
