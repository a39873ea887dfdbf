use crate::context::{RunContext, StepResult};
use crate::errors::ErrorKind;
use crate::outcome::{Expect, RequirementLevel};
use crate::timing::{timed, TargetDuration};
use crate::ASCOMResult;
use futures::future::BoxFuture;
use std::future::Future;

/// A value read from a device, in a form validators and reports can handle uniformly.
#[derive(Debug, Clone, PartialEq, derive_more::From, derive_more::Display)]
pub enum PropertyValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i32),
    /// Floating point value.
    Float(f64),
    /// String value.
    #[display("{_0:?}")]
    Text(String),
    /// List of strings, e.g. readout mode names.
    #[display("{_0:?}")]
    TextList(Vec<String>),
}

impl PropertyValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(value) => Some(f64::from(value)),
            Self::Float(value) => Some(value),
            Self::Bool(_) | Self::Text(_) | Self::TextList(_) => None,
        }
    }
}

/// Content check applied to a successfully read value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Validator {
    /// Any value is acceptable.
    Any,
    /// Numeric value within an inclusive range.
    Range {
        /// Lowest acceptable value.
        min: f64,
        /// Highest acceptable value.
        max: f64,
    },
    /// Non-blank string or non-empty list.
    NotEmpty,
}

impl Validator {
    /// Inclusive numeric range.
    pub const fn range(min: f64, max: f64) -> Self {
        Self::Range { min, max }
    }

    /// Numeric value no lower than `min`.
    pub const fn at_least(min: f64) -> Self {
        Self::Range {
            min,
            max: f64::INFINITY,
        }
    }

    /// Check a value, returning a description of the problem if it is unacceptable.
    pub fn check(&self, value: &PropertyValue) -> Result<(), String> {
        match *self {
            Self::Any => Ok(()),
            Self::Range { min, max } => match value.as_f64() {
                Some(number) if (min..=max).contains(&number) => Ok(()),
                Some(_) if max.is_infinite() => {
                    Err(format!("Invalid value {value}, expected at least {min}"))
                }
                Some(_) => Err(format!(
                    "Invalid value {value}, expected a value in the range {min} to {max}"
                )),
                None => Err(format!("Invalid value {value}, expected a number")),
            },
            Self::NotEmpty => match value {
                PropertyValue::Text(text) if text.trim().is_empty() => {
                    Err("Returned an empty string".to_owned())
                }
                PropertyValue::TextList(list) if list.is_empty() => {
                    Err("Returned an empty list".to_owned())
                }
                _ => Ok(()),
            },
        }
    }
}

/// Reads one property of `D` as a [`PropertyValue`].
pub type Reader<D> = for<'device> fn(&'device D) -> BoxFuture<'device, ASCOMResult<PropertyValue>>;

/// One row of a declarative property table.
pub struct PropertyCheck<D: ?Sized> {
    /// Member name as it appears in reports.
    pub name: &'static str,
    /// How strictly the member is required.
    pub requirement: RequirementLevel,
    /// Expected response time class.
    pub target: TargetDuration,
    /// Getter.
    pub read: Reader<D>,
    /// Content check for successful reads.
    pub validator: Validator,
}

impl<D: ?Sized> PropertyCheck<D> {
    /// A table row.
    pub const fn new(
        name: &'static str,
        requirement: RequirementLevel,
        target: TargetDuration,
        read: Reader<D>,
        validator: Validator,
    ) -> Self {
        Self {
            name,
            requirement,
            target,
            read,
            validator,
        }
    }
}

impl<D: ?Sized> std::fmt::Debug for PropertyCheck<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyCheck")
            .field("name", &self.name)
            .field("requirement", &self.requirement)
            .field("target", &self.target)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

/// Record the result of an already performed read.
///
/// Returns the value when the read succeeded, whether or not it passed validation.
pub fn record_read<T>(
    ctx: &mut RunContext,
    name: &str,
    requirement: RequirementLevel,
    validator: &Validator,
    result: ASCOMResult<T>,
) -> Option<T>
where
    T: Clone + Into<PropertyValue>,
{
    match result {
        Ok(value) => {
            if requirement == RequirementLevel::MustNotBeImplemented {
                _ = ctx.classify(name, requirement, &ASCOMResult::Ok(()), Expect::Success);
                return Some(value);
            }
            let shown = value.clone().into();
            match validator.check(&shown) {
                Ok(()) => ctx.ok(name, shown.to_string()),
                Err(problem) => ctx.issue(name, problem),
            }
            Some(value)
        }
        Err(err) => {
            let outcome = ctx.classify(name, requirement, &Err::<(), _>(err), Expect::Success);
            tracing::trace!(name, %outcome, "Read failed");
            None
        }
    }
}

/// Timed read, classification and validation of a single property.
pub async fn read_property<T, Fut>(
    ctx: &mut RunContext,
    name: &str,
    requirement: RequirementLevel,
    target: TargetDuration,
    validator: &Validator,
    read: Fut,
) -> Option<T>
where
    T: Clone + Into<PropertyValue>,
    Fut: Future<Output = ASCOMResult<T>> + Send,
{
    let result = timed(ctx, name, target, read).await;
    record_read(ctx, name, requirement, validator, result)
}

/// Read every row of a property table.
///
/// A row that records an Error abandons only that row; the table carries on.
pub async fn check_property_table<D: ?Sized + Sync>(
    ctx: &mut RunContext,
    device: &D,
    table: &[PropertyCheck<D>],
) -> StepResult {
    for row in table {
        ctx.checkpoint()?;
        ctx.set_test(row.name);
        _ = read_property(
            ctx,
            row.name,
            row.requirement,
            row.target,
            &row.validator,
            (row.read)(device),
        )
        .await;
    }
    Ok(())
}

/// Whether a result shows the member exists: anything but `NotImplemented`.
pub(crate) fn is_implemented<T>(result: &ASCOMResult<T>) -> bool {
    !matches!(result, Err(err) if err.kind() == ErrorKind::NotImplemented)
}
