//! Custom error types for the driver.
//!
//! This module defines the primary error type, `PlogicError`, used across the crate.
//! Using the `thiserror` crate, it provides a centralized way to distinguish the
//! failure classes a register-indirect serial protocol can produce.
//!
//! ## Error Hierarchy
//!
//! - **`Io`**: The transport could not deliver the command or receive a reply
//!   (including read timeouts). Wraps `std::io::Error`.
//! - **`Protocol`**: The card answered, but the reply did not start with the
//!   expected acknowledgment token (e.g. `:N-1` instead of `:A`).
//! - **`Decode`**: The reply was acknowledged but its payload did not match the
//!   numeric format the command promises.
//! - **`InvalidValue`**: A caller supplied, or the hardware returned, a value
//!   outside the allowed set for a property.
//! - **`UnknownProperty`** / **`ReadOnly`**: Property façade misuse.
//! - **`Config`** / **`Configuration`**: Loading or validating configuration.
//!
//! Every layer returns the first failure to its caller unchanged; nothing is
//! retried here.

use thiserror::Error;

/// Convenience alias for results using the driver error type.
pub type PlogicResult<T> = std::result::Result<T, PlogicError>;

/// Reply decoding strategy that failed, carried by [`PlogicError::Decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// Integer following the acknowledgment token.
    AfterToken,
    /// Integer following the first `=`.
    AfterEquals,
    /// Integer following the last `_`.
    AfterUnderscore,
}

impl std::fmt::Display for DecodeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DecodeStrategy::AfterToken => "after-token",
            DecodeStrategy::AfterEquals => "after-equals",
            DecodeStrategy::AfterUnderscore => "after-underscore",
        };
        f.write_str(name)
    }
}

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum PlogicError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command '{command}' expected reply starting with '{expected}', got '{reply}'")]
    Protocol {
        command: String,
        expected: String,
        reply: String,
    },

    #[error("Could not decode {strategy} value from reply '{reply}'")]
    Decode {
        strategy: DecodeStrategy,
        reply: String,
    },

    #[error("Invalid value '{value}' for property '{property}'")]
    InvalidValue { property: String, value: String },

    #[error("Unknown property '{0}'")]
    UnknownProperty(String),

    #[error("Property '{0}' is read-only")]
    ReadOnly(String),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),
}

impl PlogicError {
    /// Shorthand for an [`PlogicError::InvalidValue`] built from displayable parts.
    pub fn invalid_value(property: impl Into<String>, value: impl std::fmt::Display) -> Self {
        PlogicError::InvalidValue {
            property: property.into(),
            value: value.to_string(),
        }
    }

    /// True for failures raised by the bus itself rather than by the card's answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, PlogicError::Io(_))
    }
}

impl From<figment::Error> for PlogicError {
    fn from(value: figment::Error) -> Self {
        PlogicError::Config(Box::new(value))
    }
}
