/*!
Conformance checker for ASCOM device drivers.

A conformance run drives one device through its whole interface: it reads the
capability flags the device advertises, reads and writes every property with
legal and illegal values, invokes every method (telling synchronous completion
from asynchronous completion of long operations such as exposures, slews and
switch changes) and finally returns the device to a quiescent state. Every
observation is classified as OK, Info, Issue or Error and recorded in the
[`RunContext`].

Devices are reached through the traits in [`api`]; transports are left to the
caller, who wraps their device handle in a [`TypedDevice`](api::TypedDevice):

```no_run
# async fn check(device: ascom_conform::api::TypedDevice) -> eyre::Result<()> {
use ascom_conform::{run, ConformSettings, RunContext};

let settings = ConformSettings::load("conform.json")?;
let mut ctx = RunContext::new(settings);
let report = run(device, &mut ctx).await;

for record in ctx.records() {
    println!("{:<30} {:<6} {}", record.test, record.outcome, record.message);
}
println!("{}", report.summary);
# Ok(())
# }
```

Each device category lives behind a Cargo feature of the same name (`camera`,
`dome`, `observing_conditions`, `switch`); `all-devices` is on by default.
*/

#![warn(
    clippy::pedantic,
    clippy::nursery,
    clippy::as_conversions,
    clippy::clone_on_ref_ptr,
    clippy::default_numeric_fallback,
    clippy::format_push_string,
    clippy::if_then_some_else_none,
    clippy::map_err_ignore,
    clippy::panic_in_result_fn,
    clippy::single_char_lifetime_names,
    clippy::str_to_string,
    clippy::unwrap_used,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    meta_variable_misuse,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    noop_method_call,
    single_use_lifetimes,
    unreachable_pub,
    unused_lifetimes,
    unused_macro_rules,
    unused_qualifications,
    unused_results
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::return_self_not_must_use,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::redundant_pub_crate,
    clippy::single_match_else
)]

#[cfg(not(feature = "__anydevice"))]
compile_error!("At least one device category feature must be enabled");

pub mod api;

mod errors;

pub mod completion;
pub mod context;
pub mod exercise;
pub mod outcome;
/// Retrying reads that fail with a transient "not ready yet" error.
pub mod retry;
pub mod settings;
pub mod tester;
/// Timing device calls against their target duration class.
pub mod timing;
pub mod wait;

#[cfg(test)]
mod test_utils;

pub use completion::{AwaitSpec, Completion};
pub use context::{Abandon, Routines, RunContext, RunObserver, StepResult, Summary, TestRecord};
pub use errors::{ASCOMError, ASCOMErrorCode, ASCOMResult, ErrorKind};
pub use outcome::{Expect, Outcome, RequirementLevel};
pub use settings::ConformSettings;
pub use tester::{run, run_tests, tester_for, DeviceTester, RunReport, Step};
pub use timing::TargetDuration;
pub use wait::{PollSpec, WaitError};
