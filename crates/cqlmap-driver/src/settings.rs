//! Cluster settings handed to a [`Connector`](crate::Connector).

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of I/O threads.
pub const DEFAULT_IO_THREADS: usize = 1;

/// Default connections opened per host.
pub const DEFAULT_CONNECTIONS_PER_HOST: usize = 1;

/// Default bound on requests queued per I/O thread.
pub const DEFAULT_QUEUE_SIZE_IO: usize = 8192;

/// Default bound on establishing the session.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Verbosity of the driver's own log output.
///
/// Ordered from quietest to noisiest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Disabled,
    Critical,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Whether a message at `level` passes this threshold.
    pub fn allows(self, level: LogLevel) -> bool {
        level != LogLevel::Disabled && level <= self
    }
}

/// Username and password for plain-text authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Create a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything a driver needs to open a session.
#[derive(Debug, Clone)]
pub struct ClusterSettings {
    /// Hosts tried for the control connection.
    pub contact_points: Vec<String>,
    /// Optional authentication.
    pub credentials: Option<Credentials>,
    /// Local datacenter for DC-aware load balancing.
    pub local_dc: Option<String>,
    /// Driver I/O threads.
    pub io_threads: usize,
    /// Connections per host.
    pub connections_per_host: usize,
    /// Request queue bound.
    pub queue_size_io: usize,
    /// Driver log verbosity.
    pub log_level: LogLevel,
    /// Bound on session establishment.
    pub connect_timeout: Duration,
}

impl ClusterSettings {
    /// Settings for the given contact points with default tuning.
    pub fn new<I, S>(contact_points: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            contact_points: contact_points.into_iter().map(Into::into).collect(),
            credentials: None,
            local_dc: None,
            io_threads: DEFAULT_IO_THREADS,
            connections_per_host: DEFAULT_CONNECTIONS_PER_HOST,
            queue_size_io: DEFAULT_QUEUE_SIZE_IO,
            log_level: LogLevel::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set plain-text credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the local datacenter.
    pub fn with_local_dc(mut self, dc: impl Into<String>) -> Self {
        self.local_dc = Some(dc.into());
        self
    }

    /// Set the number of I/O threads.
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads;
        self
    }

    /// Set connections per host.
    pub fn with_connections_per_host(mut self, connections: usize) -> Self {
        self.connections_per_host = connections;
        self
    }

    /// Set the request queue bound.
    pub fn with_queue_size_io(mut self, size: usize) -> Self {
        self.queue_size_io = size;
        self
    }

    /// Set the driver log verbosity.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Set the session establishment bound.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
