//! The driver seam: sessions, connectors and in-flight responses.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cqlmap_proto::{DriverError, ErrorCode, ResultSet, Statement};
use futures::future::BoxFuture;
use tokio::task::JoinHandle;

use crate::settings::ClusterSettings;

/// Outcome of one request.
pub type ExecResult = Result<ResultSet, DriverError>;

/// An open session against a cluster.
///
/// Sessions are shared read-only between tasks; every call returns
/// immediately with a [`ResponseFuture`].
pub trait Session: Send + Sync {
    /// Submit a statement.
    fn execute(&self, statement: Statement) -> ResponseFuture;

    /// Close the session. Requests submitted afterwards fail with
    /// `SESSION_CLOSED`.
    fn close(&self) -> BoxFuture<'static, ()>;
}

/// Opens sessions.
pub trait Connector: Send + Sync {
    /// Connect using the given settings.
    fn connect(
        &self,
        settings: &ClusterSettings,
    ) -> BoxFuture<'static, Result<Arc<dyn Session>, DriverError>>;
}

/// A request the driver is working on.
///
/// The work runs on its own task. Dropping the future before it settles
/// detaches that task: the request keeps running, only its result is lost.
#[derive(Debug)]
pub struct ResponseFuture {
    state: ResponseState,
}

#[derive(Debug)]
enum ResponseState {
    Pending(JoinHandle<ExecResult>),
    Settled(Option<ExecResult>),
}

impl ResponseFuture {
    /// Run `work` on the current tokio runtime.
    ///
    /// Outside a runtime the future settles immediately with a client error.
    pub fn spawn<F>(work: F) -> Self
    where
        F: Future<Output = ExecResult> + Send + 'static,
    {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => Self {
                state: ResponseState::Pending(handle.spawn(work)),
            },
            Err(_) => Self::ready(Err(DriverError::new(
                ErrorCode::ClientInternal,
                "no async runtime available to run the request",
            ))),
        }
    }

    /// A future that has already settled.
    pub fn ready(result: ExecResult) -> Self {
        Self {
            state: ResponseState::Settled(Some(result)),
        }
    }

    /// Whether waiting would return immediately.
    pub fn is_settled(&self) -> bool {
        match &self.state {
            ResponseState::Pending(handle) => handle.is_finished(),
            ResponseState::Settled(_) => true,
        }
    }

    /// Wait up to `timeout` for the request to settle.
    ///
    /// Returns `None` if it has not settled in time; the future stays usable
    /// and may be waited on again. The result is handed out once.
    pub async fn wait_timed(&mut self, timeout: Duration) -> Option<ExecResult> {
        let handle = match &mut self.state {
            ResponseState::Settled(slot) => {
                return Some(slot.take().unwrap_or_else(|| {
                    Err(DriverError::new(
                        ErrorCode::ClientInternal,
                        "response already consumed",
                    ))
                }))
            }
            ResponseState::Pending(handle) => handle,
        };

        let joined = tokio::time::timeout(timeout, handle).await.ok()?;
        self.state = ResponseState::Settled(None);
        Some(joined.unwrap_or_else(|e| {
            Err(DriverError::new(
                ErrorCode::ClientInternal,
                format!("request task failed: {}", e),
            ))
        }))
    }
}

const CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Counts a request as in flight until dropped.
pub(crate) struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    pub(crate) fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Wait until every request counted by `in_flight` has settled.
pub(crate) async fn drain(in_flight: Arc<AtomicUsize>) {
    while in_flight.load(Ordering::Acquire) > 0 {
        tokio::time::sleep(CLOSE_POLL_INTERVAL).await;
    }
}
