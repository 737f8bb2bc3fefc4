//! Error types for `errcanon`.
//!
//! Only startup and configuration can fail. Interning itself has no error
//! path: every per-record anomaly degrades to "not internable".

use std::fmt;

/// Name of the configuration key that switches the compact stack path off.
pub const DISABLE_KEY: &str = "disposer.debug";

/// Errors raised while validating the host layout or reading configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The probed message field does not belong to a known layout family,
    /// or carries an unexpected name.
    UnknownLayout {
        /// Name of the field found at the message position.
        field: String,
        /// Byte offset reported for that field.
        offset: u32,
    },

    /// The layout declares too few fields to locate the message field.
    MissingMessageField,

    /// The slot derived from the message offset does not hold an object
    /// array on a freshly built record.
    StackFieldNotArray {
        /// Byte offset that was read.
        offset: u32,
    },

    /// A configuration value could not be understood.
    InvalidConfig {
        /// Configuration key.
        key: String,
        /// Rejected value.
        value: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownLayout { field, offset } => write!(
                f,
                "Unknown error record layout: field `{field}` at offset {offset}. \
                 Please specify {DISABLE_KEY}=off to suppress"
            ),
            Error::MissingMessageField => write!(
                f,
                "Unknown error record layout: no message field declared. \
                 Please specify {DISABLE_KEY}=off to suppress"
            ),
            Error::StackFieldNotArray { offset } => write!(
                f,
                "Unknown error record layout: slot at offset {offset} is not an array. \
                 Please specify {DISABLE_KEY}=off to suppress"
            ),
            Error::InvalidConfig { key, value } => {
                write!(f, "Invalid value `{value}` for configuration key `{key}`")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type for `errcanon` operations.
pub type Result<T> = std::result::Result<T, Error>;
