//! Error types for the mapping layer.
//!
//! Query failures are reported as `false`/[`Outcome`](crate::Outcome) plus a
//! log line; only setup and binding mistakes surface as [`Error`].

use std::time::Duration;

use cqlmap_proto::{BindError, DriverError};
use thiserror::Error;

/// Setup and binding errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration or an unusable statement.
    #[error("configuration error: {0}")]
    Config(String),

    /// The driver refused the connection.
    #[error("connection error: {0}")]
    Connect(#[from] DriverError),

    /// The session was not established in time.
    #[error("connection not established within {0:?}")]
    ConnectTimeout(Duration),

    /// The operation needs a live session.
    #[error("not connected")]
    NotConnected,

    /// A prepared statement was called with the wrong number of arguments.
    #[error("query `{query}` takes {expected} arguments, {actual} given")]
    Arity {
        query: String,
        expected: usize,
        actual: usize,
    },

    /// An argument could not be converted or bound.
    #[error("cannot bind argument {index} of {arity} for query `{query}`: {source}")]
    Bind {
        query: String,
        index: usize,
        arity: usize,
        #[source]
        source: BindError,
    },

    /// Configuration could not be decoded.
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
}
