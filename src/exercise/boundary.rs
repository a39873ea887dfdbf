use crate::context::{Abandon, RunContext, StepResult};
use crate::outcome::{Expect, Outcome, RequirementLevel};
use crate::timing::{timed, TargetDuration};
use crate::ASCOMResult;
use std::fmt::{Debug, Display};
use std::future::Future;

/// Values [`write_boundary`] knows how to step around a legal range.
pub trait BoundaryValue: Copy + PartialOrd + Display + Debug + Send + Sync {
    /// The nearest illegal value below `min`, if one is representable.
    fn below(min: Self) -> Option<Self>;
    /// The nearest illegal value above `max`, if one is representable.
    fn above(max: Self) -> Option<Self>;
    /// A representative value between `min` and `max`.
    fn between(min: Self, max: Self) -> Self;
    /// Whether a value read back matches the value written.
    fn matches(written: Self, read: Self) -> bool;
}

impl BoundaryValue for i32 {
    fn below(min: Self) -> Option<Self> {
        min.checked_sub(1)
    }

    fn above(max: Self) -> Option<Self> {
        max.checked_add(1)
    }

    fn between(min: Self, max: Self) -> Self {
        Self::try_from((i64::from(min) + i64::from(max)) / 2).unwrap_or(min)
    }

    fn matches(written: Self, read: Self) -> bool {
        written == read
    }
}

/// Relative difference accepted between a floating point value written and read back.
const FLOAT_TOLERANCE: f64 = 1e-6;

impl BoundaryValue for f64 {
    fn below(min: Self) -> Option<Self> {
        min.is_finite().then(|| min - 1.0)
    }

    fn above(max: Self) -> Option<Self> {
        max.is_finite().then(|| max + 1.0)
    }

    fn between(min: Self, max: Self) -> Self {
        min + (max - min) / 2.0
    }

    fn matches(written: Self, read: Self) -> bool {
        (written - read).abs() <= FLOAT_TOLERANCE * written.abs().max(1.0)
    }
}

/// Write each legal and illegal value in turn, checking how the device responds.
///
/// Legal values must be accepted and read back unchanged; illegal ones must be
/// rejected with `INVALID_VALUE`. Returns `Err(Abandon::Failed)` as soon as a
/// write records an Error, since the device state is then unknown.
pub async fn write_values<T, W, WFut, R, RFut>(
    ctx: &mut RunContext,
    name: &str,
    requirement: RequirementLevel,
    legal: &[T],
    illegal: &[T],
    mut write: W,
    mut read: R,
) -> StepResult
where
    T: BoundaryValue,
    W: FnMut(T) -> WFut + Send,
    WFut: Future<Output = ASCOMResult> + Send,
    R: FnMut() -> RFut + Send,
    RFut: Future<Output = ASCOMResult<T>> + Send,
{
    for &value in illegal {
        ctx.checkpoint()?;
        let test = format!("{name} write {value}");
        ctx.set_test(&test);
        let result = timed(ctx, &test, TargetDuration::Standard, write(value)).await;
        if ctx.classify(&test, requirement, &result, Expect::InvalidValue) == Outcome::Error {
            return Err(Abandon::Failed);
        }
    }

    for &value in legal {
        ctx.checkpoint()?;
        let test = format!("{name} write {value}");
        ctx.set_test(&test);
        let result = timed(ctx, &test, TargetDuration::Standard, write(value)).await;
        if result.is_err() || requirement == RequirementLevel::MustNotBeImplemented {
            if ctx.classify(&test, requirement, &result, Expect::Success) == Outcome::Error {
                return Err(Abandon::Failed);
            }
            continue;
        }

        match timed(ctx, name, TargetDuration::Fast, read()).await {
            Ok(actual) if T::matches(value, actual) => {
                ctx.ok(&test, format!("{value} written and read back"));
            }
            Ok(actual) => ctx.issue(&test, format!("Wrote {value} but read back {actual}")),
            Err(err) => {
                ctx.error(&test, format!("Couldn't read the value back: {err}"));
                return Err(Abandon::Failed);
            }
        }
    }

    Ok(())
}

/// Write below-min, min, midpoint, max and above-max.
pub async fn write_boundary<T, W, WFut, R, RFut>(
    ctx: &mut RunContext,
    name: &str,
    requirement: RequirementLevel,
    min: T,
    max: T,
    write: W,
    read: R,
) -> StepResult
where
    T: BoundaryValue,
    W: FnMut(T) -> WFut + Send,
    WFut: Future<Output = ASCOMResult> + Send,
    R: FnMut() -> RFut + Send,
    RFut: Future<Output = ASCOMResult<T>> + Send,
{
    if min > max {
        ctx.issue(
            name,
            format!("Minimum {min} is greater than maximum {max}, skipping write tests"),
        );
        return Ok(());
    }

    let mut legal = vec![min];
    let mid = T::between(min, max);
    if mid > min && mid < max {
        legal.push(mid);
    }
    if max > min {
        legal.push(max);
    }
    let illegal: Vec<T> = [T::below(min), T::above(max)].into_iter().flatten().collect();

    write_values(ctx, name, requirement, &legal, &illegal, write, read).await
}
