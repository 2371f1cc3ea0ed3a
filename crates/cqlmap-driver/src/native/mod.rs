//! Sessions on a real cluster through the `scylla` driver.
//!
//! Enabled with the `scylla` feature. Statements without parameters run as
//! unprepared queries; statements with parameters are prepared once per query
//! text and their values converted against the parameter types the server
//! reports.
//!
//! ```ignore
//! use cqlmap_driver::{ClusterSettings, Connector, ScyllaConnector};
//!
//! let settings = ClusterSettings::new(["127.0.0.1:9042"]).with_local_dc("dc1");
//! let session = ScyllaConnector::new().connect(&settings).await?;
//! ```

mod convert;
mod error;

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use cqlmap_proto::{DriverError, ErrorCode, Statement};
use dashmap::DashMap;
use futures::future::BoxFuture;
use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session as CqlSession;
use scylla::client::session_builder::SessionBuilder;
use scylla::client::PoolSize;
use scylla::policies::load_balancing::DefaultPolicy;
use scylla::statement::prepared::PreparedStatement;
use scylla::statement::unprepared::Statement as CqlStatement;

use crate::session::{drain, Connector, ExecResult, InFlight, ResponseFuture, Session};
use crate::settings::{ClusterSettings, LogLevel};

/// Opens sessions on a Cassandra or ScyllaDB cluster.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScyllaConnector;

impl ScyllaConnector {
    pub fn new() -> Self {
        Self
    }
}

/// Translate settings into a session builder.
///
/// The driver runs on the caller's tokio runtime, so `io_threads` has no
/// counterpart. Request deadlines are left to the caller.
fn builder(settings: &ClusterSettings) -> SessionBuilder {
    let mut profile = ExecutionProfile::builder().request_timeout(None);
    if let Some(dc) = &settings.local_dc {
        profile = profile.load_balancing_policy(
            DefaultPolicy::builder()
                .prefer_datacenter(dc.clone())
                .build(),
        );
    }

    let mut builder = SessionBuilder::new()
        .known_nodes(&settings.contact_points)
        .connection_timeout(settings.connect_timeout)
        .default_execution_profile_handle(profile.build().into_handle());
    if let Some(connections) = NonZeroUsize::new(settings.connections_per_host) {
        builder = builder.pool_size(PoolSize::PerHost(connections));
    }
    if let Some(credentials) = &settings.credentials {
        builder = builder.user(&credentials.username, &credentials.password);
    }
    builder
}

impl Connector for ScyllaConnector {
    fn connect(
        &self,
        settings: &ClusterSettings,
    ) -> BoxFuture<'static, Result<Arc<dyn Session>, DriverError>> {
        let settings = settings.clone();
        Box::pin(async move {
            let cluster = builder(&settings)
                .build()
                .await
                .map_err(error::session_error)?;
            if settings.log_level.allows(LogLevel::Info) {
                tracing::info!(contact_points = ?settings.contact_points, "Driver session established");
            }
            let session: Arc<dyn Session> = Arc::new(ScyllaSession::new(cluster, &settings));
            Ok(session)
        })
    }
}

/// A session on a real cluster.
///
/// At most `queue_size_io` requests may be in flight; further requests fail
/// with `REQUEST_QUEUE_FULL`.
pub struct ScyllaSession {
    inner: Arc<Shared>,
    in_flight: Arc<AtomicUsize>,
    queue_size: usize,
    closed: AtomicBool,
}

struct Shared {
    session: CqlSession,
    prepared: DashMap<String, PreparedStatement>,
    log_level: LogLevel,
}

impl ScyllaSession {
    fn new(session: CqlSession, settings: &ClusterSettings) -> Self {
        Self {
            inner: Arc::new(Shared {
                session,
                prepared: DashMap::new(),
                log_level: settings.log_level,
            }),
            in_flight: Arc::new(AtomicUsize::new(0)),
            queue_size: settings.queue_size_io,
            closed: AtomicBool::new(false),
        }
    }

    /// The underlying driver session.
    pub fn driver(&self) -> &CqlSession {
        &self.inner.session
    }

    /// Number of distinct query texts prepared so far.
    pub fn prepared_count(&self) -> usize {
        self.inner.prepared.len()
    }
}

impl Shared {
    async fn run(&self, statement: Statement) -> ExecResult {
        let consistency = convert::consistency(statement.consistency());
        let response = if statement.arity() == 0 {
            let mut query = CqlStatement::new(statement.query());
            query.set_consistency(consistency);
            self.session.query_unpaged(query, ()).await
        } else {
            let mut prepared = self.prepare(statement.query()).await?;
            prepared.set_consistency(consistency);
            let specs = prepared.get_variable_col_specs();
            if specs.len() != statement.arity() {
                return Err(DriverError::invalid(format!(
                    "Query has {} parameters but {} values were bound",
                    specs.len(),
                    statement.arity()
                )));
            }
            let values = specs
                .iter()
                .zip(statement.values())
                .map(|(spec, value)| {
                    convert::to_cql(value.clone().unwrap_or(cqlmap_proto::Value::Null), spec.typ())
                })
                .collect::<Result<Vec<_>, _>>()?;
            self.session.execute_unpaged(&prepared, values).await
        };

        let result = response.map_err(error::execution_error).and_then(convert::result_set);
        if let Err(e) = &result {
            if self.log_level.allows(LogLevel::Debug) {
                tracing::debug!(error = %e, query = %statement.query(), "Statement failed");
            }
        }
        result
    }

    async fn prepare(&self, query: &str) -> Result<PreparedStatement, DriverError> {
        if let Some(prepared) = self.prepared.get(query) {
            return Ok(prepared.clone());
        }
        let prepared = self
            .session
            .prepare(query)
            .await
            .map_err(error::prepare_error)?;
        self.prepared.insert(query.to_string(), prepared.clone());
        Ok(prepared)
    }
}

impl Session for ScyllaSession {
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
        if statement.arity() > 0 && !statement.is_fully_bound() {
            return ResponseFuture::ready(Err(DriverError::invalid(format!(
                "Statement has {} parameters but not all were bound",
                statement.arity()
            ))));
        }

        let guard = InFlight::enter(self.in_flight.clone());
        let inner = Arc::clone(&self.inner);
        ResponseFuture::spawn(async move {
            let _guard = guard;
            inner.run(statement).await
        })
    }

    fn close(&self) -> BoxFuture<'static, ()> {
        self.closed.store(true, Ordering::Release);
        Box::pin(drain(self.in_flight.clone()))
    }
}

impl std::fmt::Debug for ScyllaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScyllaSession")
            .field("prepared", &self.inner.prepared.len())
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .field("queue_size", &self.queue_size)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}
