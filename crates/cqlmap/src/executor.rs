//! Completion of submitted requests.
//!
//! [`complete`] waits for a response, classifies it, updates the counters and
//! feeds the rows to a consumer. It owns the response future and the result
//! set, so both are released on every path.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use cqlmap_driver::ResponseFuture;
use cqlmap_proto::ResultSet;

use crate::command::Outcome;
use crate::consumer::FetchConsumer;
use crate::extract::RowView;
use crate::stats::CallCounters;

/// Wait up to `timeout` for `response` and classify the result.
///
/// A local timeout drops the response without cancelling the request.
pub(crate) async fn complete(
    mut response: ResponseFuture,
    consumer: Option<&mut dyn FetchConsumer>,
    query: &str,
    timeout: Duration,
    counters: &CallCounters,
) -> Outcome {
    let Some(result) = response.wait_timed(timeout).await else {
        counters.record_timeout();
        tracing::error!(
            query = %query,
            timeout_ms = timeout.as_millis() as u64,
            "Query had local timeout"
        );
        return Outcome::TimedOut;
    };
    drop(response);

    let rs = match result {
        Ok(rs) => rs,
        Err(e) if e.code.is_server_timeout() => {
            counters.record_timeout();
            tracing::error!(error = %e, query = %query, "Query had server side timeout");
            return Outcome::ServerTimeout { code: e.code };
        }
        Err(e) => {
            counters.record_bad();
            tracing::error!(error = %e, query = %query, "Query failed");
            return Outcome::ServerError {
                code: e.code,
                message: e.message,
            };
        }
    };
    counters.record_call();

    match consumer {
        Some(consumer) => consume_rows(&rs, consumer, query),
        None => {
            tracing::trace!(query = %query, "Query succeeded");
            Outcome::Success {
                rows: rs.row_count(),
            }
        }
    }
}

/// Feed every row to `consumer`, stopping at the first row it rejects, the
/// first missing row, or a panic.
fn consume_rows(rs: &ResultSet, consumer: &mut dyn FetchConsumer, query: &str) -> Outcome {
    let mut consumed = 0;
    for (index, row) in rs.rows().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(missing) => {
                tracing::error!(query = %query, row = missing.index, "Fetch got a null row");
                return Outcome::MissingRow {
                    index: missing.index,
                };
            }
        };

        let view = RowView::new(row, query, index);
        match panic::catch_unwind(AssertUnwindSafe(|| consumer.consume(&view))) {
            Ok(true) => consumed += 1,
            Ok(false) => {
                tracing::debug!(query = %query, row = index, "Consumer stopped the fetch");
                return Outcome::Aborted { rows: consumed };
            }
            Err(payload) => {
                tracing::error!(
                    query = %query,
                    row = index,
                    panic = %panic_message(payload.as_ref()),
                    "Consumer panicked"
                );
                return Outcome::ConsumerFault { index };
            }
        }
    }
    tracing::trace!(query = %query, rows = consumed, "Fetch returned rows");
    Outcome::Success { rows: consumed }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
