//! Driver error types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes reported by a driver for a failed request.
///
/// Client-side codes are raised before or around the network exchange, the
/// rest are reported by the coordinator node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// No contact point could be reached.
    NoHostsAvailable,
    /// Authentication was rejected.
    BadCredentials,
    /// The client-side request queue is full.
    RequestQueueFull,
    /// The session was closed before the request completed.
    SessionClosed,
    /// The driver failed internally (task panic, lost response).
    ClientInternal,

    /// Unexpected server-side failure.
    ServerError,
    /// Protocol violation.
    Protocol,
    /// The coordinator is overloaded.
    Overloaded,
    /// Not enough replicas alive for the requested consistency.
    Unavailable,
    /// Replicas did not answer a read in time.
    ReadTimeout,
    /// Replicas did not acknowledge a write in time.
    WriteTimeout,
    /// The query text does not parse.
    Syntax,
    /// The user lacks permission.
    Unauthorized,
    /// The query is syntactically valid but semantically wrong.
    Invalid,
    /// A keyspace or table with that name already exists.
    AlreadyExists,
    /// A truncate did not complete on every replica.
    TruncateError,
}

impl ErrorCode {
    /// Whether the coordinator reported a replica timeout.
    pub fn is_server_timeout(self) -> bool {
        matches!(self, ErrorCode::ReadTimeout | ErrorCode::WriteTimeout)
    }

    /// Whether the error was produced by a server rather than the client.
    pub fn is_server_side(self) -> bool {
        !matches!(
            self,
            ErrorCode::NoHostsAvailable
                | ErrorCode::BadCredentials
                | ErrorCode::RequestQueueFull
                | ErrorCode::SessionClosed
                | ErrorCode::ClientInternal
        )
    }

    /// Stable upper-case name used in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NoHostsAvailable => "NO_HOSTS_AVAILABLE",
            ErrorCode::BadCredentials => "BAD_CREDENTIALS",
            ErrorCode::RequestQueueFull => "REQUEST_QUEUE_FULL",
            ErrorCode::SessionClosed => "SESSION_CLOSED",
            ErrorCode::ClientInternal => "CLIENT_INTERNAL",
            ErrorCode::ServerError => "SERVER_ERROR",
            ErrorCode::Protocol => "PROTOCOL_ERROR",
            ErrorCode::Overloaded => "OVERLOADED",
            ErrorCode::Unavailable => "UNAVAILABLE",
            ErrorCode::ReadTimeout => "READ_TIMEOUT",
            ErrorCode::WriteTimeout => "WRITE_TIMEOUT",
            ErrorCode::Syntax => "SYNTAX_ERROR",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Invalid => "INVALID_QUERY",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::TruncateError => "TRUNCATE_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed request as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct DriverError {
    /// Error classification.
    pub code: ErrorCode,
    /// Human-readable message from the driver or server.
    pub message: String,
}

impl DriverError {
    /// Create a new driver error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for an `INVALID_QUERY` error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Invalid, message)
    }
}

/// Errors raised while binding values into a statement or collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// Bind index past the statement's parameter count.
    #[error("index {index} out of range for statement with {arity} parameters")]
    IndexOutOfRange { index: usize, arity: usize },

    /// Collections cannot hold null elements.
    #[error("collection elements cannot be null")]
    NullElement,

    /// Collection element does not match the type of the elements before it.
    #[error("collection element type mismatch: expected {expected}, found {found}")]
    ElementType {
        expected: &'static str,
        found: &'static str,
    },
}

/// A decimal literal that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal literal '{0}'")]
pub struct InvalidDecimal(pub String);

/// A result set position that holds no row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("row {index} is missing from the result")]
pub struct MissingRow {
    /// Zero-based position in the result set.
    pub index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_timeout_codes() {
        assert!(ErrorCode::ReadTimeout.is_server_timeout());
        assert!(ErrorCode::WriteTimeout.is_server_timeout());
        assert!(!ErrorCode::Unavailable.is_server_timeout());
        assert!(!ErrorCode::Invalid.is_server_timeout());
    }

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::invalid("unconfigured table nope");
        assert_eq!(err.to_string(), "INVALID_QUERY: unconfigured table nope");
        assert!(err.code.is_server_side());
        assert!(!ErrorCode::SessionClosed.is_server_side());
    }
}
