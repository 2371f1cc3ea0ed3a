//! An in-process cluster.
//!
//! [`MemoryCluster`] executes the CQL subset understood by `cqlmap-lang`
//! against tables held in memory. Requests run on their own tasks and can be
//! delayed or failed through [`FaultRule`]s, so client timeout and error
//! handling can be exercised without a real cluster.

mod catalog;
mod coerce;
mod engine;
mod fault;
mod key;

pub use fault::{Fault, FaultRule};

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cqlmap_proto::{DriverError, ErrorCode, Statement};
use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};

use crate::session::{drain, Connector, ExecResult, InFlight, ResponseFuture, Session};
use crate::settings::{ClusterSettings, Credentials, LogLevel};
use catalog::Catalog;
use fault::FaultPlan;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_DATACENTER: &str = "datacenter1";

/// A cluster living in this process. Cloning shares the same data.
#[derive(Debug, Clone)]
pub struct MemoryCluster {
    inner: Arc<ClusterState>,
}

#[derive(Debug)]
struct ClusterState {
    hosts: RwLock<Vec<String>>,
    credentials: RwLock<Option<Credentials>>,
    datacenter: String,
    catalog: Catalog,
    faults: FaultPlan,
    latency: Mutex<Duration>,
    executed: AtomicU64,
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCluster {
    /// An empty cluster reachable at `127.0.0.1`.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ClusterState {
                hosts: RwLock::new(vec![DEFAULT_HOST.to_string()]),
                credentials: RwLock::new(None),
                datacenter: DEFAULT_DATACENTER.to_string(),
                catalog: Catalog::default(),
                faults: FaultPlan::default(),
                latency: Mutex::new(Duration::ZERO),
                executed: AtomicU64::new(0),
            }),
        }
    }

    /// Replace the host names the cluster answers to.
    pub fn with_hosts<I, S>(self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.inner.hosts.write() = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Reject connections that do not present these credentials.
    pub fn require_credentials(self, credentials: Credentials) -> Self {
        *self.inner.credentials.write() = Some(credentials);
        self
    }

    /// Create a keyspace. Returns false if it already existed.
    pub fn create_keyspace(&self, name: &str) -> bool {
        self.inner.catalog.create_keyspace(name)
    }

    /// Run a statement outside any session, e.g. to set up a schema.
    ///
    /// Table names must be keyspace-qualified.
    pub fn execute_cql(&self, query: &str) -> ExecResult {
        let keyspace = Mutex::new(None);
        engine::execute(&self.inner.catalog, &keyspace, &Statement::simple(query))
    }

    /// Add a fault rule after the existing ones.
    pub fn inject(&self, rule: FaultRule) {
        self.inner.faults.push(rule);
    }

    pub fn clear_faults(&self) {
        self.inner.faults.clear();
    }

    /// Delay every connect and every response by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.inner.latency.lock() = latency;
    }

    /// Statements that reached the engine, across all sessions.
    pub fn statements_executed(&self) -> u64 {
        self.inner.executed.load(Ordering::Relaxed)
    }

    /// Rows stored in `keyspace.table`, or `None` if there is no such table.
    pub fn row_count(&self, table: &str) -> Option<usize> {
        self.inner.catalog.tables().get(table).map(|t| t.rows.len())
    }

    /// Open a session directly, skipping host and credential checks.
    pub fn session(&self, settings: &ClusterSettings) -> MemorySession {
        MemorySession::new(self.clone(), settings)
    }

    fn latency(&self) -> Duration {
        *self.inner.latency.lock()
    }
}

impl Connector for MemoryCluster {
    fn connect(
        &self,
        settings: &ClusterSettings,
    ) -> BoxFuture<'static, Result<Arc<dyn Session>, DriverError>> {
        let cluster = self.clone();
        let settings = settings.clone();
        Box::pin(async move {
            let latency = cluster.latency();
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let hosts = cluster.inner.hosts.read().clone();
            if !settings.contact_points.iter().any(|p| hosts.contains(p)) {
                return Err(DriverError::new(
                    ErrorCode::NoHostsAvailable,
                    format!(
                        "No hosts available for the control connection ({})",
                        settings.contact_points.join(",")
                    ),
                ));
            }

            let required = cluster.inner.credentials.read().clone();
            if let Some(required) = required {
                match &settings.credentials {
                    Some(given) if *given == required => {}
                    Some(given) => {
                        return Err(DriverError::new(
                            ErrorCode::BadCredentials,
                            format!(
                                "Provided username {} and/or password are incorrect",
                                given.username
                            ),
                        ))
                    }
                    None => {
                        return Err(DriverError::new(
                            ErrorCode::BadCredentials,
                            "Authentication is required but no credentials were provided",
                        ))
                    }
                }
            }

            if let Some(dc) = &settings.local_dc {
                if *dc != cluster.inner.datacenter {
                    tracing::warn!(local_dc = %dc, "Local datacenter not found, using every host");
                }
            }

            let session: Arc<dyn Session> = Arc::new(MemorySession::new(cluster, &settings));
            Ok(session)
        })
    }
}

/// A session on a [`MemoryCluster`].
///
/// Holds its own current keyspace. At most `queue_size_io` requests may be
/// in flight; further requests fail with `REQUEST_QUEUE_FULL`.
#[derive(Debug)]
pub struct MemorySession {
    cluster: MemoryCluster,
    keyspace: Arc<Mutex<Option<String>>>,
    in_flight: Arc<AtomicUsize>,
    queue_size: usize,
    log_level: LogLevel,
    closed: AtomicBool,
}

impl MemorySession {
    fn new(cluster: MemoryCluster, settings: &ClusterSettings) -> Self {
        Self {
            cluster,
            keyspace: Arc::new(Mutex::new(None)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            queue_size: settings.queue_size_io,
            log_level: settings.log_level,
            closed: AtomicBool::new(false),
        }
    }

    /// The keyspace selected by the last successful `USE`.
    pub fn keyspace(&self) -> Option<String> {
        self.keyspace.lock().clone()
    }

    /// Requests submitted but not yet settled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Session for MemorySession {
    fn execute(&self, statement: Statement) -> ResponseFuture {
        if self.closed.load(Ordering::Acquire) {
            return ResponseFuture::ready(Err(DriverError::new(
                ErrorCode::SessionClosed,
                "Session is closed",
            )));
        }
        let pending = self.in_flight.load(Ordering::Acquire);
        if pending >= self.queue_size {
            return ResponseFuture::ready(Err(DriverError::new(
                ErrorCode::RequestQueueFull,
                format!("Request queue is full ({} requests in flight)", pending),
            )));
        }

        let guard = InFlight::enter(self.in_flight.clone());
        let cluster = self.cluster.clone();
        let keyspace = self.keyspace.clone();
        let log_level = self.log_level;
        ResponseFuture::spawn(async move {
            let _guard = guard;
            let state = &cluster.inner;
            let fault = state.faults.take(statement.query());

            let mut delay = cluster.latency();
            if let Some(Fault::Delay(extra)) = &fault {
                delay += *extra;
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            if log_level.allows(LogLevel::Debug) {
                tracing::debug!(query = %statement.query(), fault = ?fault, "Executing statement");
            }
            if let Some(Fault::Fail(code, message)) = &fault {
                return Err(DriverError::new(*code, message.clone()));
            }

            state.executed.fetch_add(1, Ordering::Relaxed);
            let result = engine::execute(&state.catalog, &keyspace, &statement);
            if let Err(e) = &result {
                if log_level.allows(LogLevel::Debug) {
                    tracing::debug!(error = %e, query = %statement.query(), "Statement failed");
                }
            }

            match fault {
                Some(Fault::Unacknowledged(code)) => Err(DriverError::new(
                    code,
                    "Operation timed out - received only 0 responses.",
                )),
                Some(Fault::DropRow(index)) => result.map(|mut rs| {
                    rs.drop_row(index);
                    rs
                }),
                _ => result,
            }
        })
    }

    fn close(&self) -> BoxFuture<'static, ()> {
        self.closed.store(true, Ordering::Release);
        Box::pin(drain(self.in_flight.clone()))
    }
}
