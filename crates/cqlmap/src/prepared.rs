//! Reusable statements with positional arguments.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cqlmap_driver::{ResponseFuture, Session};
use cqlmap_proto::Statement;
use parking_lot::Mutex;

use crate::codec::WireEncode;
use crate::command::Outcome;
use crate::consumer::FetchConsumer;
use crate::error::Error;
use crate::executor::complete;
use crate::stats::{CallCounters, CallStats};

/// Build an argument list for [`PreparedStatement::store`].
///
/// ```ignore
/// stmt.store(args![42, "text", Null, vec![1, 2, 3]]).await?;
/// ```
#[macro_export]
macro_rules! args {
    () => {
        &[] as &[&dyn $crate::WireEncode]
    };
    ($($arg:expr),+ $(,)?) => {
        &[$(&$arg as &dyn $crate::WireEncode),+]
    };
}

/// A statement prepared once and executed with different arguments.
///
/// Created by [`Conn::prepare_store`](crate::Conn::prepare_store). Binding
/// mutates the shared statement, so each call holds a lock from the first
/// bind until the request is submitted; the response is awaited after the
/// lock is released.
pub struct PreparedStatement {
    query: String,
    arity: usize,
    timeout: Duration,
    statement: Mutex<Statement>,
    session: Arc<dyn Session>,
    stats: Arc<CallStats>,
}

impl PreparedStatement {
    pub(crate) fn new(
        session: Arc<dyn Session>,
        stats: Arc<CallStats>,
        statement: Statement,
        timeout: Duration,
    ) -> Self {
        Self {
            query: statement.query().to_string(),
            arity: statement.arity(),
            timeout,
            statement: Mutex::new(statement),
            session,
            stats,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Number of arguments every call must supply.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Bind `args` and store.
    ///
    /// `Ok(false)` means the statement ran and failed or timed out; `Err` is
    /// reserved for argument mistakes.
    pub async fn store(&self, args: &[&dyn WireEncode]) -> Result<bool, Error> {
        Ok(self.run(args, None, &self.stats.stored).await?.is_success())
    }

    /// Bind `args` and fetch into `consumer`.
    pub async fn fetch(
        &self,
        args: &[&dyn WireEncode],
        consumer: &mut dyn FetchConsumer,
    ) -> Result<bool, Error> {
        Ok(self
            .run(args, Some(consumer), &self.stats.fetched)
            .await?
            .is_success())
    }

    async fn run(
        &self,
        args: &[&dyn WireEncode],
        consumer: Option<&mut dyn FetchConsumer>,
        counters: &CallCounters,
    ) -> Result<Outcome, Error> {
        let response = self.submit(args)?;
        Ok(complete(response, consumer, &self.query, self.timeout, counters).await)
    }

    fn submit(&self, args: &[&dyn WireEncode]) -> Result<ResponseFuture, Error> {
        if args.len() != self.arity {
            return Err(Error::Arity {
                query: self.query.clone(),
                expected: self.arity,
                actual: args.len(),
            });
        }

        let mut statement = self.statement.lock();
        statement.clear_bindings();
        for (index, arg) in args.iter().enumerate() {
            arg.to_wire()
                .and_then(|value| statement.bind(index, value))
                .map_err(|source| Error::Bind {
                    query: self.query.clone(),
                    index,
                    arity: self.arity,
                    source,
                })?;
        }
        Ok(self.session.execute(statement.clone()))
    }
}

impl fmt::Debug for PreparedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("query", &self.query)
            .field("arity", &self.arity)
            .field("timeout", &self.timeout)
            .finish()
    }
}
