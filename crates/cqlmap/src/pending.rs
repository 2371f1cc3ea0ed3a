//! Fetches submitted now and observed later.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cqlmap_driver::ResponseFuture;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

use crate::command::Outcome;
use crate::consumer::FetchConsumer;
use crate::executor::complete;
use crate::stats::CallStats;

/// A fetch whose response is waited for on first observation.
///
/// Submit through [`Conn::fetch_async`](crate::Conn::fetch_async), keep
/// working, then call [`observe`](Self::observe), [`consumer`](Self::consumer)
/// or [`was_set`](Self::was_set). The first of these waits for the response
/// and runs the consumer; the outcome is cached and later calls return it
/// without waiting or counting again. Concurrent observers queue on an async
/// lock, so the rows are consumed at most once.
///
/// If the task doing the first observation is cancelled while waiting, the
/// response is lost and later observations report [`Outcome::Interrupted`].
pub struct PendingFetch<C> {
    state: Mutex<PendingState<C>>,
}

struct PendingState<C> {
    response: Option<ResponseFuture>,
    consumer: Option<C>,
    query: String,
    timeout: Duration,
    stats: Option<Arc<CallStats>>,
    consumed: bool,
    outcome: Option<Outcome>,
}

impl<C> PendingState<C> {
    fn empty() -> Self {
        Self {
            response: None,
            consumer: None,
            query: String::new(),
            timeout: Duration::ZERO,
            stats: None,
            consumed: true,
            outcome: Some(Outcome::NotSubmitted),
        }
    }
}

impl<C: FetchConsumer> PendingState<C> {
    async fn run(&mut self) -> Outcome {
        if !self.consumed {
            self.consumed = true;
            let outcome = match (self.response.take(), self.stats.take()) {
                (Some(response), Some(stats)) => {
                    let consumer = self.consumer.as_mut().map(|c| c as &mut dyn FetchConsumer);
                    complete(response, consumer, &self.query, self.timeout, &stats.fetched).await
                }
                _ => Outcome::NotSubmitted,
            };
            tracing::debug!(query = %self.query, outcome = %outcome, "Async fetch observed");
            self.outcome = Some(outcome);
        }
        self.outcome.clone().unwrap_or(Outcome::Interrupted)
    }
}

impl<C: FetchConsumer> PendingFetch<C> {
    /// An empty handle; observing it reports [`Outcome::NotSubmitted`].
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PendingState::empty()),
        }
    }

    /// Take charge of a submitted request.
    ///
    /// Returns false, leaving the handle empty, if either the response or
    /// the consumer is missing.
    pub fn assign(
        &mut self,
        response: Option<ResponseFuture>,
        consumer: Option<C>,
        query: impl Into<String>,
        timeout: Duration,
        stats: Arc<CallStats>,
    ) -> bool {
        let state = self.state.get_mut();
        match (response, consumer) {
            (Some(response), Some(consumer)) => {
                *state = PendingState {
                    response: Some(response),
                    consumer: Some(consumer),
                    query: query.into(),
                    timeout,
                    stats: Some(stats),
                    consumed: false,
                    outcome: None,
                };
                true
            }
            _ => {
                *state = PendingState::empty();
                false
            }
        }
    }

    /// Wait for the response and consume it, once.
    pub async fn observe(&self) -> Outcome {
        self.state.lock().await.run().await
    }

    /// Observe, then lend out the consumer.
    pub async fn consumer(&self) -> Option<MappedMutexGuard<'_, C>> {
        let mut state = self.state.lock().await;
        state.run().await;
        MutexGuard::try_map(state, |s| s.consumer.as_mut()).ok()
    }

    /// Observe, then ask the consumer whether it saw a value.
    pub async fn was_set(&self) -> bool {
        let mut state = self.state.lock().await;
        state.run().await;
        state
            .consumer
            .as_ref()
            .is_some_and(|c| c.was_any_value_set())
    }

    /// Observe, then hand the consumer back.
    pub async fn into_consumer(self) -> Option<C> {
        let mut state = self.state.into_inner();
        state.run().await;
        state.consumer
    }

    /// Drop the request and the consumer.
    pub fn clear(&mut self) {
        *self.state.get_mut() = PendingState::empty();
    }
}

impl<C: FetchConsumer> Default for PendingFetch<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for PendingFetch<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("PendingFetch");
        match self.state.try_lock() {
            Ok(state) => s
                .field("query", &state.query)
                .field("consumed", &state.consumed)
                .field("outcome", &state.outcome),
            Err(_) => s.field("state", &"<observing>"),
        };
        s.finish()
    }
}
