//! Driver error classification.

use cqlmap_proto::{DriverError, ErrorCode};
use scylla::errors::{
    DbError, ExecutionError, NewSessionError, PrepareError, RequestAttemptError,
};

/// Code for an error reported by the coordinator.
pub(crate) fn db_error_code(error: &DbError) -> ErrorCode {
    match error {
        DbError::SyntaxError { .. } => ErrorCode::Syntax,
        DbError::Invalid { .. } => ErrorCode::Invalid,
        DbError::AlreadyExists { .. } => ErrorCode::AlreadyExists,
        DbError::AuthenticationError { .. } => ErrorCode::BadCredentials,
        DbError::Unauthorized { .. } => ErrorCode::Unauthorized,
        DbError::Unavailable { .. } => ErrorCode::Unavailable,
        DbError::Overloaded { .. } => ErrorCode::Overloaded,
        DbError::TruncateError { .. } => ErrorCode::TruncateError,
        DbError::ReadTimeout { .. } => ErrorCode::ReadTimeout,
        DbError::WriteTimeout { .. } => ErrorCode::WriteTimeout,
        DbError::ProtocolError { .. } => ErrorCode::Protocol,
        _ => ErrorCode::ServerError,
    }
}

fn attempt_code(error: &RequestAttemptError) -> ErrorCode {
    match error {
        RequestAttemptError::DbError(db, _) => db_error_code(db),
        _ => ErrorCode::ClientInternal,
    }
}

pub(crate) fn execution_error(error: ExecutionError) -> DriverError {
    let code = match &error {
        ExecutionError::LastAttemptError(attempt) => attempt_code(attempt),
        ExecutionError::BadQuery(_) => ErrorCode::Invalid,
        ExecutionError::EmptyPlan | ExecutionError::ConnectionPoolError(_) => {
            ErrorCode::NoHostsAvailable
        }
        _ => ErrorCode::ClientInternal,
    };
    DriverError::new(code, error.to_string())
}

/// Preparing fails almost only on statements the server rejects.
pub(crate) fn prepare_error(error: PrepareError) -> DriverError {
    let code = match &error {
        PrepareError::ConnectionPoolError(_) => ErrorCode::NoHostsAvailable,
        _ => ErrorCode::Invalid,
    };
    DriverError::new(code, error.to_string())
}

pub(crate) fn session_error(error: NewSessionError) -> DriverError {
    DriverError::new(ErrorCode::NoHostsAvailable, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_error_codes() {
        assert_eq!(db_error_code(&DbError::SyntaxError), ErrorCode::Syntax);
        assert_eq!(db_error_code(&DbError::Invalid), ErrorCode::Invalid);
        assert_eq!(db_error_code(&DbError::Overloaded), ErrorCode::Overloaded);
        assert_eq!(db_error_code(&DbError::ServerError), ErrorCode::ServerError);
    }

    #[test]
    fn test_replica_timeouts_stay_server_timeouts() {
        let read = DbError::ReadTimeout {
            consistency: scylla::statement::Consistency::Quorum,
            received: 1,
            required: 2,
            data_present: false,
        };
        assert_eq!(db_error_code(&read), ErrorCode::ReadTimeout);
        assert!(db_error_code(&read).is_server_timeout());

        let attempt = RequestAttemptError::DbError(read, "Operation timed out".into());
        let err = execution_error(ExecutionError::LastAttemptError(attempt));
        assert_eq!(err.code, ErrorCode::ReadTimeout);
    }
}
