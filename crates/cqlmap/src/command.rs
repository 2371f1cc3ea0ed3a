//! Commands and their outcomes.

use std::fmt;
use std::time::Duration;

use cqlmap_proto::{Consistency, ErrorCode};

/// A query plus optional per-call overrides.
///
/// Unset consistency and timeout take the connection defaults; a zero
/// timeout counts as unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    query: String,
    consistency: Option<Consistency>,
    timeout: Option<Duration>,
}

impl Command {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            consistency: None,
            timeout: None,
        }
    }

    /// Override the consistency level.
    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = Some(consistency);
        self
    }

    /// Override the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn consistency(&self) -> Option<Consistency> {
        self.consistency
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The same overrides with a different query text.
    pub(crate) fn map_query(mut self, f: impl FnOnce(String) -> String) -> Self {
        self.query = f(std::mem::take(&mut self.query));
        self
    }
}

impl From<&str> for Command {
    fn from(query: &str) -> Self {
        Self::new(query)
    }
}

impl From<String> for Command {
    fn from(query: String) -> Self {
        Self::new(query)
    }
}

impl From<&String> for Command {
    fn from(query: &String) -> Self {
        Self::new(query.as_str())
    }
}

/// How a call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every row was consumed.
    Success { rows: usize },
    /// The consumer stopped after `rows` rows.
    Aborted { rows: usize },
    /// The result had no row at position `index`.
    MissingRow { index: usize },
    /// The consumer panicked on row `index`.
    ConsumerFault { index: usize },
    /// No response within the timeout. The statement may still apply.
    TimedOut,
    /// The server reported a read or write timeout.
    ServerTimeout { code: ErrorCode },
    /// Any other error reported by the driver.
    ServerError { code: ErrorCode, message: String },
    /// No session.
    NotConnected,
    /// Nothing was submitted, e.g. an empty pending fetch.
    NotSubmitted,
    /// An earlier observation was cancelled while waiting; the result is lost.
    Interrupted,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Local or server-side timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Outcome::TimedOut | Outcome::ServerTimeout { .. })
    }

    /// Rows handed to the consumer, when the query completed.
    pub fn rows(&self) -> Option<usize> {
        match self {
            Outcome::Success { rows } | Outcome::Aborted { rows } => Some(*rows),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success { rows } => write!(f, "success ({} rows)", rows),
            Outcome::Aborted { rows } => write!(f, "aborted by consumer after {} rows", rows),
            Outcome::MissingRow { index } => write!(f, "missing row {}", index),
            Outcome::ConsumerFault { index } => write!(f, "consumer fault on row {}", index),
            Outcome::TimedOut => f.write_str("local timeout"),
            Outcome::ServerTimeout { code } => write!(f, "server timeout ({})", code),
            Outcome::ServerError { code, message } => write!(f, "{}: {}", code, message),
            Outcome::NotConnected => f.write_str("not connected"),
            Outcome::NotSubmitted => f.write_str("not submitted"),
            Outcome::Interrupted => f.write_str("interrupted"),
        }
    }
}
