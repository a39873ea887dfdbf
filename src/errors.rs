use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

/// Alpaca representation of an ASCOM error code.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ASCOMErrorCode(u16);

/// The starting value for driver-specific error numbers.
const DRIVER_BASE: u16 = 0x500;
/// The maximum value for error numbers.
const MAX: u16 = 0xFFF;

impl ASCOMErrorCode {
    /// Generate ASCOM error code from a zero-based driver error code.
    ///
    /// Will panic if the driver error code is larger than the maximum allowed (2815).
    pub const fn new_for_driver(driver_code: u16) -> Self {
        const DRIVER_MAX: u16 = MAX - DRIVER_BASE;

        assert!(driver_code <= DRIVER_MAX, "Driver error code is too large");

        Self(driver_code + DRIVER_BASE)
    }

    /// Get the driver-specific error code.
    ///
    /// Returns `Ok` with `0`-based driver error code if this is a driver error.
    /// Returns `Err` with raw error code if not a driver error.
    pub const fn as_driver_error(self) -> Result<u16, u16> {
        if let Some(driver_code) = self.0.checked_sub(DRIVER_BASE) {
            Ok(driver_code)
        } else {
            Err(self.0)
        }
    }

    /// Get the raw error code.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Which part of the conformance error taxonomy this code belongs to.
    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::NOT_IMPLEMENTED | Self::ACTION_NOT_IMPLEMENTED => ErrorKind::NotImplemented,
            Self::INVALID_VALUE => ErrorKind::InvalidValue,
            Self::INVALID_OPERATION
            | Self::VALUE_NOT_SET
            | Self::INVALID_WHILE_PARKED
            | Self::INVALID_WHILE_SLAVED
            | Self::NOT_CONNECTED => ErrorKind::InvalidOperation,
            Self::TIMEOUT => ErrorKind::Timeout,
            _ => ErrorKind::Unexpected,
        }
    }
}

/// Error categories the outcome classifier and the retry loop reason about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, Serialize)]
pub enum ErrorKind {
    /// The member is deliberately absent.
    #[display("NotImplemented")]
    NotImplemented,
    /// An illegal input value was rejected.
    #[display("InvalidValue")]
    InvalidValue,
    /// A precondition is not met yet ("not ready", "not connected", ...).
    #[display("InvalidOperation")]
    InvalidOperation,
    /// A bounded wait exceeded its budget.
    #[display("Timeout")]
    Timeout,
    /// Anything else.
    #[display("Unexpected")]
    Unexpected,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::NotImplemented,
        Self::InvalidValue,
        Self::InvalidOperation,
        Self::Timeout,
        Self::Unexpected,
    ];
}

/// ASCOM error.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("ASCOM error {code}: {message}")]
pub struct ASCOMError {
    /// Error number.
    #[serde(rename = "ErrorNumber")]
    pub code: ASCOMErrorCode,
    /// Error message.
    #[serde(rename = "ErrorMessage")]
    pub message: Cow<'static, str>,
}

impl ASCOMError {
    /// Create a new `ASCOMError` from given error code and a message.
    pub fn new(code: ASCOMErrorCode, message: impl std::fmt::Display) -> Self {
        Self {
            code,
            message: message.to_string().into(),
        }
    }

    /// Shorthand for `self.code.kind()`.
    pub const fn kind(&self) -> ErrorKind {
        self.code.kind()
    }
}

/// Result type for ASCOM methods.
pub type ASCOMResult<T = ()> = Result<T, ASCOMError>;

macro_rules! ascom_error_codes {
    ($(#[doc = $doc:literal] $name:ident = $value:literal,)*) => {
        impl ASCOMErrorCode {
            $(
                #[doc = $doc]
                pub const $name: Self = Self($value);
            )*
        }

        impl std::fmt::Debug for ASCOMErrorCode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match *self {
                    $(
                        Self::$name => f.write_str(stringify!($name)),
                    )*
                    _ => match self.as_driver_error() {
                        Ok(driver_code) => write!(f, "DRIVER_ERROR[{driver_code}]"),
                        Err(raw_code) => write!(f, "{raw_code:#X}"),
                    },
                }
            }
        }

        impl std::fmt::Display for ASCOMErrorCode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Debug::fmt(self, f)
            }
        }

        impl ASCOMError {
            $(
                #[doc = $doc]
                pub const $name: Self = Self {
                    code: ASCOMErrorCode::$name,
                    message: Cow::Borrowed($doc),
                };
            )*
        }
    };
}

ascom_error_codes! {
    #[doc = "The requested action is not implemented in this driver"]
    ACTION_NOT_IMPLEMENTED = 0x40C,
    #[doc = "The requested operation can not be undertaken at this time"]
    INVALID_OPERATION = 0x40B,
    #[doc = "Invalid value"]
    INVALID_VALUE = 0x401,
    #[doc = "The attempted operation is invalid because the mount is currently in a Parked state"]
    INVALID_WHILE_PARKED = 0x408,
    #[doc = "The attempted operation is invalid because the mount is currently in a Slaved state"]
    INVALID_WHILE_SLAVED = 0x409,
    #[doc = "The communications channel is not connected"]
    NOT_CONNECTED = 0x407,
    #[doc = "Property or method not implemented"]
    NOT_IMPLEMENTED = 0x400,
    #[doc = "A value has not been set"]
    VALUE_NOT_SET = 0x402,
    #[doc = "The operation did not complete within its time budget"]
    TIMEOUT = 0x4FE,
    #[doc = "Unspecified error"]
    UNSPECIFIED = 0x4FF,
}

impl ASCOMError {
    /// Create a new "invalid operation" error with the specified message.
    pub fn invalid_operation(message: impl std::fmt::Display) -> Self {
        Self::new(ASCOMErrorCode::INVALID_OPERATION, message)
    }

    /// Create a new "invalid value" error with the specified message.
    pub fn invalid_value(message: impl std::fmt::Display) -> Self {
        Self::new(ASCOMErrorCode::INVALID_VALUE, message)
    }

    /// Create a new error with unspecified error code and the given message.
    pub fn unspecified(message: impl std::fmt::Display) -> Self {
        Self::new(ASCOMErrorCode::UNSPECIFIED, message)
    }

    /// Create a new timeout error with the specified message.
    pub fn timeout(message: impl std::fmt::Display) -> Self {
        Self::new(ASCOMErrorCode::TIMEOUT, message)
    }
}
