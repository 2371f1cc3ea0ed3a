//! Connection configuration.

use std::fmt;
use std::time::Duration;

use cqlmap_driver::{
    ClusterSettings, Credentials, LogLevel, DEFAULT_CONNECTIONS_PER_HOST, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_IO_THREADS, DEFAULT_QUEUE_SIZE_IO,
};
use cqlmap_proto::Consistency;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default per-call consistency.
pub const DEFAULT_CONSISTENCY: Consistency = Consistency::LocalQuorum;

/// Default contact point.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Everything needed to open a [`Conn`](crate::Conn).
///
/// Durations are written in milliseconds when loaded from JSON. A zero
/// `timeout` means [`DEFAULT_TIMEOUT`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnConfig {
    /// Contact points.
    pub hosts: Vec<String>,

    /// Keyspace selected right after connecting.
    pub keyspace: Option<String>,

    /// Login, paired with `password`.
    pub login: Option<String>,

    /// Password, paired with `login`.
    pub password: Option<String>,

    /// Local datacenter for DC-aware routing.
    pub local_dc: Option<String>,

    /// Default per-call timeout.
    #[serde(with = "millis")]
    pub timeout: Duration,

    /// Default per-call consistency.
    pub consistency: Consistency,

    /// Driver I/O threads.
    pub io_threads: usize,

    /// Connections opened to each host.
    pub connections_per_host: usize,

    /// Requests allowed in flight per session.
    pub queue_size_io: usize,

    /// Driver log verbosity.
    pub log_level: LogLevel,

    /// How long to wait for the session.
    #[serde(with = "millis")]
    pub connect_timeout: Duration,
}

impl ConnConfig {
    /// Create a configuration for the given contact points.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            keyspace: None,
            login: None,
            password: None,
            local_dc: None,
            timeout: DEFAULT_TIMEOUT,
            consistency: DEFAULT_CONSISTENCY,
            io_threads: DEFAULT_IO_THREADS,
            connections_per_host: DEFAULT_CONNECTIONS_PER_HOST,
            queue_size_io: DEFAULT_QUEUE_SIZE_IO,
            log_level: LogLevel::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Create a configuration for a node on localhost.
    pub fn localhost() -> Self {
        Self::new([DEFAULT_HOST])
    }

    /// Load a configuration from a JSON document. Missing fields take their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the keyspace.
    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    /// Set login and password.
    pub fn with_credentials(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self.password = Some(password.into());
        self
    }

    /// Set the local datacenter.
    pub fn with_local_dc(mut self, dc: impl Into<String>) -> Self {
        self.local_dc = Some(dc.into());
        self
    }

    /// Set the default per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the default per-call consistency.
    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }

    /// Set the number of driver I/O threads.
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads;
        self
    }

    /// Set the connections per host.
    pub fn with_connections_per_host(mut self, connections: usize) -> Self {
        self.connections_per_host = connections;
        self
    }

    /// Set the request queue size.
    pub fn with_queue_size_io(mut self, size: usize) -> Self {
        self.queue_size_io = size;
        self
    }

    /// Set the driver log level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// The per-call timeout actually used.
    pub fn effective_timeout(&self) -> Duration {
        resolve_timeout(Some(self.timeout), DEFAULT_TIMEOUT)
    }

    /// Check the host list and credentials.
    pub fn validate(&self) -> Result<(), Error> {
        if self.hosts.is_empty() {
            return Err(Error::Config("host list is empty".to_string()));
        }
        if self.hosts.iter().any(|h| h.trim().is_empty()) {
            return Err(Error::Config("host list contains an empty entry".to_string()));
        }
        if self.login.is_some() != self.password.is_some() {
            return Err(Error::Config(
                "login and password must be given together".to_string(),
            ));
        }
        if self.queue_size_io == 0 {
            return Err(Error::Config("queue_size_io must be positive".to_string()));
        }
        Ok(())
    }

    /// Driver settings for this configuration.
    pub fn to_cluster_settings(&self) -> ClusterSettings {
        let mut settings = ClusterSettings::new(self.hosts.iter().cloned())
            .with_io_threads(self.io_threads)
            .with_connections_per_host(self.connections_per_host)
            .with_queue_size_io(self.queue_size_io)
            .with_log_level(self.log_level)
            .with_connect_timeout(self.connect_timeout);
        if let (Some(login), Some(password)) = (&self.login, &self.password) {
            settings = settings.with_credentials(Credentials::new(login, password));
        }
        if let Some(dc) = &self.local_dc {
            settings = settings.with_local_dc(dc);
        }
        settings
    }
}

impl Default for ConnConfig {
    fn default() -> Self {
        Self::localhost()
    }
}

impl fmt::Debug for ConnConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnConfig")
            .field("hosts", &self.hosts)
            .field("keyspace", &self.keyspace)
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("local_dc", &self.local_dc)
            .field("timeout", &self.timeout)
            .field("consistency", &self.consistency)
            .field("io_threads", &self.io_threads)
            .field("connections_per_host", &self.connections_per_host)
            .field("queue_size_io", &self.queue_size_io)
            .field("log_level", &self.log_level)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// `timeout` unless it is absent or zero.
pub(crate) fn resolve_timeout(timeout: Option<Duration>, default: Duration) -> Duration {
    match timeout {
        Some(t) if !t.is_zero() => t,
        _ => default,
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConnConfig::default();
        assert_eq!(config.hosts, vec![DEFAULT_HOST.to_string()]);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.consistency, Consistency::LocalQuorum);
        assert_eq!(config.queue_size_io, DEFAULT_QUEUE_SIZE_IO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ConnConfig::new(["10.0.0.1", "10.0.0.2"])
            .with_keyspace("ks")
            .with_credentials("cassandra", "secret")
            .with_local_dc("dc1")
            .with_timeout(Duration::from_millis(250))
            .with_consistency(Consistency::One)
            .with_queue_size_io(16);

        assert_eq!(config.keyspace.as_deref(), Some("ks"));
        assert_eq!(config.effective_timeout(), Duration::from_millis(250));

        let settings = config.to_cluster_settings();
        assert_eq!(settings.contact_points.len(), 2);
        assert_eq!(settings.local_dc.as_deref(), Some("dc1"));
        assert_eq!(settings.queue_size_io, 16);
        assert_eq!(settings.credentials.map(|c| c.username), Some("cassandra".to_string()));
    }

    #[test]
    fn test_zero_timeout_uses_default() {
        let config = ConnConfig::localhost().with_timeout(Duration::ZERO);
        assert_eq!(config.effective_timeout(), DEFAULT_TIMEOUT);
        assert_eq!(resolve_timeout(None, DEFAULT_TIMEOUT), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_validate_rejects_bad_setup() {
        assert!(matches!(
            ConnConfig::new(Vec::<String>::new()).validate(),
            Err(Error::Config(_))
        ));
        let mut half = ConnConfig::localhost();
        half.login = Some("cassandra".into());
        assert!(matches!(half.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_json() {
        let config = ConnConfig::from_json(
            r#"{"hosts": ["db1"], "keyspace": "ks", "timeout": 1500, "consistency": "ONE",
                "log_level": "debug"}"#,
        )
        .unwrap();
        assert_eq!(config.hosts, vec!["db1".to_string()]);
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.consistency, Consistency::One);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);

        assert!(matches!(ConnConfig::from_json("{"), Err(Error::Json(_))));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ConnConfig::localhost().with_credentials("cassandra", "secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
