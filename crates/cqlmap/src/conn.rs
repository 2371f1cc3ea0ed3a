//! The connection handle.
//!
//! A [`Conn`] wraps one driver session together with the default timeout and
//! consistency and the call counters. Every call returns `bool` or an
//! [`Outcome`]; failures are logged with the query text and counted, never
//! raised.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cqlmap_driver::{Connector, Session};
use cqlmap_proto::{Consistency, Statement};

use crate::command::{Command, Outcome};
use crate::config::{resolve_timeout, ConnConfig, DEFAULT_CONSISTENCY, DEFAULT_TIMEOUT};
use crate::consumer::{AppliedProbe, FetchConsumer, Fetcher};
use crate::error::Error;
use crate::executor::complete;
use crate::pending::PendingFetch;
use crate::prepared::PreparedStatement;
use crate::refid::{RefId, UuidKind};
use crate::stats::{CallCounters, CallStats, StatsSnapshot};

/// Placeholder replaced by a generated id in [`Conn::store_auto_uuid`].
pub const AUTO_UUID: &str = "AUTO_UUID";

/// Default number of emptiness probes after a failed truncate.
pub const DEFAULT_TRUNCATE_RETRIES: u32 = 5;

/// Default pause before each emptiness probe.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// How [`Conn::truncate_with`] confirms a truncate that reported failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncateOptions {
    /// Consistency for the truncate and the probes.
    pub consistency: Option<Consistency>,
    /// Number of probes; zero means [`DEFAULT_TRUNCATE_RETRIES`].
    pub retries: u32,
    /// Pause before each probe.
    pub probe_interval: Duration,
}

impl TruncateOptions {
    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = Some(consistency);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    fn effective_retries(&self) -> u32 {
        if self.retries == 0 {
            DEFAULT_TRUNCATE_RETRIES
        } else {
            self.retries
        }
    }

    fn command(&self, query: String) -> Command {
        let command = Command::new(query);
        match self.consistency {
            Some(c) => command.with_consistency(c),
            None => command,
        }
    }
}

impl Default for TruncateOptions {
    fn default() -> Self {
        Self {
            consistency: None,
            retries: DEFAULT_TRUNCATE_RETRIES,
            probe_interval: DEFAULT_PROBE_INTERVAL,
        }
    }
}

struct ConnInner {
    session: Arc<dyn Session>,
    timeout: Duration,
    consistency: Consistency,
}

impl ConnInner {
    fn statement(&self, command: &Command) -> (Statement, Duration) {
        let consistency = command.consistency().unwrap_or(self.consistency);
        let timeout = resolve_timeout(command.timeout(), self.timeout);
        (
            Statement::simple(command.query()).with_consistency(consistency),
            timeout,
        )
    }
}

/// A connection to a cluster.
///
/// Cheap to clone; clones share the session and the counters.
///
/// # Example
///
/// ```ignore
/// use cqlmap::{Conn, ConnConfig, ConFetcher};
///
/// let conn = Conn::connect(ConnConfig::localhost().with_keyspace("ks"), &connector).await?;
/// conn.store("insert into t (id, value) values (1, 'a')").await;
///
/// let mut values = ConFetcher::<String>::new();
/// values.fetch_from(&conn, "select value from t").await;
/// ```
#[derive(Clone)]
pub struct Conn {
    inner: Option<Arc<ConnInner>>,
    stats: Arc<CallStats>,
}

impl Conn {
    /// Open a session and select the configured keyspace.
    ///
    /// Failing to select the keyspace is logged but does not fail the
    /// connection.
    pub async fn connect(config: ConnConfig, connector: &dyn Connector) -> Result<Self, Error> {
        config.validate()?;
        let settings = config.to_cluster_settings();
        tracing::info!(hosts = ?config.hosts, "connecting");

        let session = match tokio::time::timeout(config.connect_timeout, connector.connect(&settings)).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                tracing::error!(error = %e, hosts = ?config.hosts, "connection failed");
                return Err(Error::Connect(e));
            }
            Err(_) => {
                tracing::error!(hosts = ?config.hosts, "connection timed out");
                return Err(Error::ConnectTimeout(config.connect_timeout));
            }
        };

        let conn = Self {
            inner: Some(Arc::new(ConnInner {
                session,
                timeout: config.effective_timeout(),
                consistency: config.consistency,
            })),
            stats: Arc::new(CallStats::new()),
        };

        if let Some(keyspace) = &config.keyspace {
            if !conn.change(format!("USE {}", keyspace)).await {
                tracing::error!(keyspace = %keyspace, "failed to select keyspace");
            }
        }
        tracing::info!(hosts = ?config.hosts, keyspace = ?config.keyspace, "connected");
        Ok(conn)
    }

    /// Connect, or log the error and exit the process.
    pub async fn connect_or_exit(config: ConnConfig, connector: &dyn Connector) -> Self {
        match Self::connect(config, connector).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(error = %e, "unable to connect, exiting");
                std::process::exit(1);
            }
        }
    }

    /// A handle without a session. Every call on it fails.
    pub fn disconnected() -> Self {
        Self {
            inner: None,
            stats: Arc::new(CallStats::new()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_some()
    }

    /// Default per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.inner.as_ref().map_or(DEFAULT_TIMEOUT, |i| i.timeout)
    }

    /// Default per-call consistency.
    pub fn consistency(&self) -> Consistency {
        self.inner.as_ref().map_or(DEFAULT_CONSISTENCY, |i| i.consistency)
    }

    pub fn stats(&self) -> &CallStats {
        &self.stats
    }

    /// Read and reset the counters.
    pub fn take_stats(&self) -> StatsSnapshot {
        self.stats.take()
    }

    /// Run a statement that returns no rows of interest.
    pub async fn store(&self, command: impl Into<Command>) -> bool {
        self.run(command.into(), None, &self.stats.stored)
            .await
            .is_success()
    }

    /// Same as [`store`](Self::store), for schema and session changes.
    pub async fn change(&self, command: impl Into<Command>) -> bool {
        self.store(command).await
    }

    /// Run a query and feed its rows to `consumer`.
    ///
    /// True if the query succeeded and the consumer accepted every row.
    pub async fn fetch(&self, command: impl Into<Command>, consumer: &mut dyn FetchConsumer) -> bool {
        let command = command.into();
        let outcome = self.run(command.clone(), Some(consumer), &self.stats.fetched).await;
        tracing::debug!(query = %command.query(), outcome = %outcome, "fetch finished");
        outcome.is_success()
    }

    /// Like [`fetch`](Self::fetch), reporting how the call ended.
    pub async fn execute(&self, command: impl Into<Command>, consumer: &mut dyn FetchConsumer) -> Outcome {
        self.run(command.into(), Some(consumer), &self.stats.fetched).await
    }

    /// Submit a fetch and return at once; `pending` takes the response and
    /// the consumer and runs them when first observed.
    ///
    /// Returns false and clears `pending` when not connected.
    pub fn fetch_async<C: FetchConsumer>(
        &self,
        command: impl Into<Command>,
        consumer: C,
        pending: &mut PendingFetch<C>,
    ) -> bool {
        let command = command.into();
        let Some(inner) = &self.inner else {
            tracing::error!(query = %command.query(), "async fetch without a connection");
            pending.clear();
            return false;
        };
        let (statement, timeout) = inner.statement(&command);
        let response = inner.session.execute(statement);
        pending.assign(
            Some(response),
            Some(consumer),
            command.query(),
            timeout,
            Arc::clone(&self.stats),
        )
    }

    /// Append `IF NOT EXISTS` and store. True only if the row was written.
    ///
    /// Counted as a fetch, since the answer is read from the `[applied]`
    /// column.
    pub async fn store_if_not_exists(&self, command: impl Into<Command>) -> bool {
        let command = command.into().map_query(|q| format!("{} IF NOT EXISTS", q.trim_end()));
        let mut probe = AppliedProbe::new();
        let outcome = self
            .run(command.clone(), Some(&mut probe), &self.stats.fetched)
            .await;
        if outcome.is_success() && probe.applied() {
            return true;
        }
        tracing::debug!(
            query = %command.query(),
            outcome = %outcome,
            "failed either due to query issue or due to record already being present"
        );
        false
    }

    /// Store after replacing the first [`AUTO_UUID`] with a fresh id of the
    /// given kind. The id is written to `id` before the statement runs; a
    /// query without the placeholder leaves `id` alone.
    pub async fn store_auto_uuid(
        &self,
        command: impl Into<Command>,
        kind: UuidKind,
        id: &mut RefId,
    ) -> bool {
        let command = command.into();
        let command = if command.query().contains(AUTO_UUID) {
            *id = RefId::generate(kind);
            let text = id.to_string();
            command.map_query(|q| q.replacen(AUTO_UUID, &text, 1))
        } else {
            command
        };
        self.store(command).await
    }

    /// Truncate `table` with the default options.
    pub async fn truncate(&self, table: &str) -> bool {
        self.truncate_with(table, &TruncateOptions::default()).await
    }

    /// Truncate `table`.
    ///
    /// Truncate often reports a timeout after it has in fact been applied.
    /// On failure the table is probed with `SELECT COUNT(*)` up to
    /// `options.retries` times, pausing before each probe; an empty table
    /// counts as success. A table that was already empty is
    /// indistinguishable from one this call emptied.
    pub async fn truncate_with(&self, table: &str, options: &TruncateOptions) -> bool {
        if self.change(options.command(format!("TRUNCATE {}", table))).await {
            self.stats.truncated.record_call();
            return true;
        }
        if !self.is_connected() {
            self.stats.truncated.record_bad();
            return false;
        }

        let probe = format!("SELECT COUNT(*) FROM {}", table);
        for attempt in 1..=options.effective_retries() {
            tokio::time::sleep(options.probe_interval).await;
            let mut count = Fetcher::<i64>::new();
            if count.fetch_from(self, options.command(probe.clone())).await && *count.value() == 0 {
                self.stats.truncated.record_call();
                tracing::debug!(table = %table, attempt, "truncate succeeded despite apparent issue");
                return true;
            }
        }

        self.stats.truncated.record_bad();
        tracing::error!(table = %table, "failed truncate on table");
        false
    }

    /// Prepare a statement with `num_args` `?` markers.
    pub fn prepare_store(
        &self,
        command: impl Into<Command>,
        num_args: usize,
    ) -> Result<PreparedStatement, Error> {
        let command = command.into();
        let Some(inner) = &self.inner else {
            tracing::error!(query = %command.query(), "prepare without a connection");
            return Err(Error::NotConnected);
        };

        let query = command.query().trim();
        if query.is_empty() {
            return Err(Error::Config("cannot prepare an empty query".to_string()));
        }
        let markers = cqlmap_lang::count_markers(query)
            .map_err(|e| Error::Config(format!("cannot prepare `{}`: {}", query, e)))?;
        if markers != num_args {
            return Err(Error::Config(format!(
                "query `{}` has {} markers but {} arguments were declared",
                query, markers, num_args
            )));
        }

        let consistency = command.consistency().unwrap_or(inner.consistency);
        let timeout = resolve_timeout(command.timeout(), inner.timeout);
        let statement = Statement::new(query, num_args).with_consistency(consistency);
        Ok(PreparedStatement::new(
            Arc::clone(&inner.session),
            Arc::clone(&self.stats),
            statement,
            timeout,
        ))
    }

    /// Close the session, waiting for requests in flight.
    pub async fn close(&self) {
        if let Some(inner) = &self.inner {
            inner.session.close().await;
            tracing::info!("connection closed");
        }
    }

    async fn run(
        &self,
        command: Command,
        consumer: Option<&mut dyn FetchConsumer>,
        counters: &CallCounters,
    ) -> Outcome {
        let Some(inner) = &self.inner else {
            tracing::error!(query = %command.query(), "query issued without a connection");
            return Outcome::NotConnected;
        };
        let (statement, timeout) = inner.statement(&command);
        let response = inner.session.execute(statement);
        complete(response, consumer, command.query(), timeout, counters).await
    }
}

impl fmt::Debug for Conn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conn")
            .field("connected", &self.is_connected())
            .field("timeout", &self.timeout())
            .field("consistency", &self.consistency())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_truncate_options() {
        let options = TruncateOptions::default();
        assert_eq!(options.retries, DEFAULT_TRUNCATE_RETRIES);
        assert_eq!(options.probe_interval, DEFAULT_PROBE_INTERVAL);
        assert_eq!(options.consistency, None);
        assert_eq!(options.with_retries(0).effective_retries(), 5);
    }

    #[test]
    fn test_truncate_options_builder() {
        let options = TruncateOptions::default()
            .with_retries(2)
            .with_probe_interval(Duration::from_millis(10))
            .with_consistency(Consistency::All);
        assert_eq!(options.effective_retries(), 2);
        assert_eq!(options.command("TRUNCATE t".into()).consistency(), Some(Consistency::All));
    }

    #[tokio::test]
    async fn test_disconnected_calls_fail() {
        let conn = Conn::disconnected();
        assert!(!conn.is_connected());
        assert!(!conn.store("insert into t (a) values (1)").await);

        let mut value = Fetcher::<i32>::new();
        assert_eq!(conn.execute("select a from t", &mut value).await, Outcome::NotConnected);

        let mut pending = PendingFetch::new();
        assert!(!conn.fetch_async("select a from t", Fetcher::<i32>::new(), &mut pending));
        assert_eq!(pending.observe().await, Outcome::NotSubmitted);

        assert!(matches!(conn.prepare_store("select ?", 1), Err(Error::NotConnected)));
        assert!(!conn.truncate("t").await);

        let stats = conn.take_stats();
        assert_eq!(stats.truncated.bad, 1);
        assert_eq!(stats.stored.total(), 0);
        assert_eq!(stats.fetched.total(), 0);
    }
}
