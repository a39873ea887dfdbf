//! Classification of device call results.
//!
//! Every member exercised by a tester goes through [`classify`]: it decides
//! whether the driver's answer (a value, or one of the ASCOM error kinds) is
//! what the interface specification asks for at the member's
//! [`RequirementLevel`].

use crate::errors::ErrorKind;
use crate::ASCOMError;
use serde::Serialize;
use std::borrow::Cow;

/// Severity of a recorded result.
///
/// Ordered by severity, so `max()` over a set of outcomes yields the worst one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display, Serialize,
)]
pub enum Outcome {
    /// Behaviour matches the interface specification.
    #[display("OK")]
    Ok,
    /// Noteworthy but permitted behaviour.
    #[display("INFO")]
    Info,
    /// Behaviour that breaks the interface specification.
    #[display("ISSUE")]
    Issue,
    /// An unexpected failure; the current step should unwind.
    #[display("ERROR")]
    Error,
}

/// How strictly the interface specification mandates a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, Serialize)]
pub enum RequirementLevel {
    /// May be absent; `NOT_IMPLEMENTED` is fine.
    Optional,
    /// Part of every implementation of the interface.
    Mandatory,
    /// Must be present because of a capability the device advertised.
    MustBeImplemented,
    /// Must be absent because of a capability the device did not advertise.
    MustNotBeImplemented,
}

impl RequirementLevel {
    /// All levels, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Optional,
        Self::Mandatory,
        Self::MustBeImplemented,
        Self::MustNotBeImplemented,
    ];

    /// `MustBeImplemented` when the capability is advertised, `MustNotBeImplemented` otherwise.
    pub const fn from_capability(capable: bool) -> Self {
        if capable {
            Self::MustBeImplemented
        } else {
            Self::MustNotBeImplemented
        }
    }
}

/// What the caller expects the device to do with the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expect {
    /// An ordinary call that should succeed.
    Success,
    /// A boundary test with an illegal value that should be rejected with `INVALID_VALUE`.
    InvalidValue,
}

/// Result of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Severity.
    pub outcome: Outcome,
    /// Human readable explanation.
    pub message: Cow<'static, str>,
}

impl Classification {
    fn new(outcome: Outcome, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            outcome,
            message: message.into(),
        }
    }
}

/// Classify a device call result.
///
/// `error` is `None` when the call succeeded. The function is pure: the same
/// inputs always produce the same classification.
pub fn classify(
    requirement: RequirementLevel,
    error: Option<&ASCOMError>,
    expect: Expect,
) -> Classification {
    use RequirementLevel::{Mandatory, MustBeImplemented, MustNotBeImplemented, Optional};

    let Some(error) = error else {
        return match (requirement, expect) {
            (MustNotBeImplemented, _) => Classification::new(
                Outcome::Issue,
                "No exception generated when the member should not be implemented",
            ),
            (_, Expect::InvalidValue) => Classification::new(
                Outcome::Issue,
                "Illegal value accepted instead of raising an InvalidValue error",
            ),
            (_, Expect::Success) => Classification::new(Outcome::Ok, "Call succeeded"),
        };
    };

    match (error.kind(), requirement, expect) {
        (ErrorKind::NotImplemented, Optional, _) => {
            Classification::new(Outcome::Ok, "Optional member is not implemented")
        }
        (ErrorKind::NotImplemented, MustNotBeImplemented, _) => Classification::new(
            Outcome::Ok,
            "NotImplemented error generated as expected",
        ),
        (ErrorKind::NotImplemented, Mandatory | MustBeImplemented, _) => Classification::new(
            Outcome::Issue,
            format!("This member is required but returned NotImplemented: {error}"),
        ),
        (
            ErrorKind::InvalidValue,
            Optional | Mandatory | MustBeImplemented,
            Expect::InvalidValue,
        ) => {
            Classification::new(
                Outcome::Ok,
                "Illegal value correctly rejected with an InvalidValue error",
            )
        }
        (kind, _, _) => Classification::new(
            Outcome::Error,
            format!("Unexpected {kind} error: {error}"),
        ),
    }
}
