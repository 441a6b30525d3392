//! Unified error types for the marketplace core and its HTTP surface.
//!
//! Every failure the core can produce is a variant of [`Error`]. Callers that
//! need the coarse category (for status codes or retry decisions) use
//! [`Error::kind`].

use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or out-of-range input.
    #[error("Validation failed: {message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// A money amount that is not positive and finite.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// No usable caller identity was supplied.
    #[error("Unauthenticated: {message}")]
    Unauthenticated {
        /// Human-readable reason
        message: String,
    },

    /// Caller role not permitted or caller does not own the resource.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Human-readable reason
        message: String,
    },

    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"Gig"`
        entity: &'static str,
        /// The id that was looked up
        id: String,
    },

    /// The entity is not in a status that allows the operation.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Human-readable reason
        message: String,
    },

    /// A concurrent write won, or the record already exists.
    #[error("Conflict: {message}")]
    Conflict {
        /// Human-readable reason
        message: String,
    },

    /// A chat message tried to arrange payment outside the platform.
    #[error("Message blocked: arranging payment outside the platform is not allowed")]
    MessageBlocked,

    /// The external payment gateway refused or failed a release.
    #[error("Payment gateway error: {message}")]
    PaymentGateway {
        /// Gateway-supplied reason
        message: String,
    },

    /// Storage failure.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable reason
        message: String,
    },

    /// I/O failure (binding sockets, reading files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input
    Validation,
    /// Missing or invalid credential
    Unauthenticated,
    /// Role or ownership violation
    Authz,
    /// Unknown entity
    NotFound,
    /// Status precondition failed or a concurrent transition won
    StateConflict,
    /// Payment gateway or store failure
    Upstream,
    /// Anything else
    Internal,
}

impl Error {
    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::InvalidAmount { .. } | Self::MessageBlocked => {
                ErrorKind::Validation
            }
            Self::Unauthenticated { .. } => ErrorKind::Unauthenticated,
            Self::Forbidden { .. } => ErrorKind::Authz,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidState { .. } | Self::Conflict { .. } => ErrorKind::StateConflict,
            Self::PaymentGateway { .. } | Self::Database(_) => ErrorKind::Upstream,
            Self::Config { .. } | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::InvalidState`].
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Translates a unique-constraint violation into [`Error::Conflict`],
    /// passing every other store error through unchanged.
    pub fn from_insert(err: DbErr, message: impl Into<String>) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::conflict(message),
            _ => Self::Database(err),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_folds_state_errors() {
        assert_eq!(
            Error::invalid_state("gig is not published").kind(),
            ErrorKind::StateConflict
        );
        assert_eq!(
            Error::conflict("lost the race").kind(),
            ErrorKind::StateConflict
        );
    }

    #[test]
    fn test_kind_for_blocked_message_is_validation() {
        assert_eq!(Error::MessageBlocked.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_kind_for_gateway_is_upstream() {
        let err = Error::PaymentGateway {
            message: "timeout".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(
            Error::Database(DbErr::Custom("boom".to_string())).kind(),
            ErrorKind::Upstream
        );
    }

    #[test]
    fn test_from_insert_passes_other_errors_through() {
        let err = Error::from_insert(DbErr::Custom("disk full".to_string()), "duplicate");
        assert!(matches!(err, Error::Database(_)));
    }
}
