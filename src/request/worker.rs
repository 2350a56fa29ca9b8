//! Request Worker Thread
//!
//! A long-lived serial executor owning a FIFO queue of queries. Runs at most
//! one query at a time on its own thread and delivers progress and terminal
//! notifications through each query's callback channel.
//!
//! The queue and the current-query slot live under a single lock. Each
//! dequeued query gets a child of the worker's root [`CancellationToken`], so
//! `cancel` interrupts one query and `terminate` interrupts whichever query is
//! in flight.

use std::any::Any;
use std::collections::VecDeque;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tokio_util::sync::CancellationToken;

use super::handler::{Cycle, ProgressUpdate, RequestHandler};
use super::transport::Transport;
use super::types::{Callback, Notification, Query, QueryId, RequestError, Response};

type ParamsOf<H> = <H as RequestHandler>::Params;
type OutputOf<H> = <H as RequestHandler>::Output;

struct WorkerState<P, O> {
    queue: VecDeque<Query<P, O>>,
    current: Option<(QueryId, CancellationToken)>,
    terminated: bool,
}

struct WorkerShared<P, O> {
    state: Mutex<WorkerState<P, O>>,
    wake: Condvar,
    root: CancellationToken,
}

impl<P, O> WorkerShared<P, O> {
    fn lock(&self) -> MutexGuard<'_, WorkerState<P, O>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until a query is available; `None` once terminated
    fn dequeue(&self) -> Option<(Query<P, O>, CancellationToken)> {
        let mut state = self.lock();
        loop {
            if state.terminated {
                return None;
            }
            if let Some(query) = state.queue.pop_front() {
                let token = self.root.child_token();
                state.current = Some((query.id(), token.clone()));
                return Some((query, token));
            }
            state = self.wake.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Clear the current slot and deliver the terminal notification
    ///
    /// Delivery happens under the lock so that a concurrent `cancel` either
    /// lands before (and suppresses it) or after (and is a no-op).
    fn finish(
        &self,
        token: &CancellationToken,
        callback: &Callback<P, O>,
        notification: Option<Notification<P, O>>,
    ) {
        let mut state = self.lock();
        state.current = None;

        let Some(notification) = notification else {
            return;
        };
        if token.is_cancelled() {
            log::debug!(
                "Query {} cancelled, dropping its response",
                notification.query_id()
            );
            return;
        }
        if callback.send(notification).is_err() {
            log::debug!("Callback receiver gone, response discarded");
        }
    }
}

/// Serial executor of queries for one resource type
///
/// Dropping the worker terminates it without waiting for the thread; use
/// [`RequestWorker::shutdown`] to join.
pub struct RequestWorker<H: RequestHandler> {
    name: String,
    shared: Arc<WorkerShared<ParamsOf<H>, OutputOf<H>>>,
    thread: Option<JoinHandle<()>>,
}

impl<H: RequestHandler> RequestWorker<H> {
    /// Spawn the worker thread
    ///
    /// # Arguments
    /// * `name` - Thread name, also used in log lines
    /// * `handler` - Locator and body hooks for this resource type
    /// * `transport` - Client used to open locators
    pub fn spawn(
        name: impl Into<String>,
        handler: H,
        transport: Arc<dyn Transport>,
    ) -> io::Result<Self> {
        let name = name.into();
        let shared = Arc::new(WorkerShared {
            state: Mutex::new(WorkerState {
                queue: VecDeque::new(),
                current: None,
                terminated: false,
            }),
            wake: Condvar::new(),
            root: CancellationToken::new(),
        });

        let thread = thread::Builder::new().name(name.clone()).spawn({
            let shared = Arc::clone(&shared);
            let name = name.clone();
            move || worker_loop(&name, &handler, transport.as_ref(), &shared)
        })?;

        Ok(Self {
            name,
            shared,
            thread: Some(thread),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a query to the tail of the queue and wake the worker
    ///
    /// Never blocks. After `terminate` the query is dropped silently.
    pub fn enqueue(&self, query: Query<ParamsOf<H>, OutputOf<H>>) -> QueryId {
        let id = query.id();
        let mut state = self.shared.lock();
        if state.terminated {
            log::debug!("{} worker terminated, ignoring query {}", self.name, id);
            return id;
        }
        state.queue.push_back(query);
        log::debug!(
            "{} worker queued query {} ({} pending)",
            self.name,
            id,
            state.queue.len()
        );
        self.shared.wake.notify_one();
        id
    }

    /// Cancel a pending or executing query
    ///
    /// A pending query is removed and never executes. The executing query is
    /// interrupted and delivers no response. Returns `false` if the query is
    /// unknown or already completed.
    pub fn cancel(&self, id: QueryId) -> bool {
        let mut state = self.shared.lock();

        if let Some(pos) = state.queue.iter().position(|q| q.id() == id) {
            state.queue.remove(pos);
            log::debug!("{} worker removed pending query {}", self.name, id);
            return true;
        }

        match &state.current {
            Some((current, token)) if *current == id => {
                token.cancel();
                log::debug!("{} worker cancelling in-flight query {}", self.name, id);
                true
            }
            _ => false,
        }
    }

    /// Number of queries waiting behind the current one
    pub fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Query currently executing, if any
    pub fn current(&self) -> Option<QueryId> {
        self.shared.lock().current.as_ref().map(|(id, _)| *id)
    }

    pub fn is_terminated(&self) -> bool {
        self.shared.lock().terminated
    }

    /// Stop the worker
    ///
    /// Interrupts the in-flight query (no response is delivered for it) and
    /// discards everything still queued. Idempotent.
    pub fn terminate(&self) {
        let mut state = self.shared.lock();
        if state.terminated {
            return;
        }
        state.terminated = true;
        let dropped = state.queue.len();
        state.queue.clear();
        self.shared.root.cancel();
        self.shared.wake.notify_all();
        log::debug!(
            "{} worker terminating ({} pending queries dropped)",
            self.name,
            dropped
        );
    }

    /// Terminate and wait for the worker thread to exit
    pub fn shutdown(mut self) {
        self.terminate();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("{} worker thread panicked during shutdown", self.name);
            }
        }
    }
}

impl<H: RequestHandler> Drop for RequestWorker<H> {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Main worker loop - runs cycles until terminated
fn worker_loop<H: RequestHandler>(
    name: &str,
    handler: &H,
    transport: &dyn Transport,
    shared: &WorkerShared<ParamsOf<H>, OutputOf<H>>,
) {
    log::debug!("{} worker thread started", name);

    while let Some((query, token)) = shared.dequeue() {
        let (query_id, params, callback) = query.into_parts();
        log::debug!("{} worker executing query {}", name, query_id);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            run_cycle(handler, transport, query_id, &params, &token, &callback)
        }))
        .unwrap_or_else(|payload| {
            let msg = panic_message(payload.as_ref());
            log::error!("{} worker panic in query {}: {}", name, query_id, msg);
            Err(RequestError::Crashed(msg))
        });

        let notification = match result {
            Ok(output) => {
                log::debug!("{} worker query {} succeeded", name, query_id);
                Some(Notification::Finished(Response {
                    query_id,
                    params,
                    outcome: Ok(output),
                }))
            }
            Err(RequestError::Cancelled) => {
                log::debug!("{} worker query {} was cancelled", name, query_id);
                None
            }
            Err(e) => {
                log::error!("{} worker query {} failed: {}", name, query_id, e);
                Some(Notification::Failed(Response {
                    query_id,
                    params,
                    outcome: Err(e),
                }))
            }
        };

        shared.finish(&token, &callback, notification);
    }

    log::debug!("{} worker thread shutting down", name);
}

/// One execution cycle: build locator, open it, hand the body to the handler
fn run_cycle<H: RequestHandler>(
    handler: &H,
    transport: &dyn Transport,
    query_id: QueryId,
    params: &H::Params,
    token: &CancellationToken,
    callback: &Callback<H::Params, H::Output>,
) -> Result<H::Output, RequestError> {
    if token.is_cancelled() {
        return Err(RequestError::Cancelled);
    }

    let locator = handler.build_locator(params)?;
    log::debug!("Query {} requesting {}", query_id, locator);

    let body = transport.open(&locator)?;
    if token.is_cancelled() {
        return Err(RequestError::Cancelled);
    }

    let sink = |update: ProgressUpdate| {
        if token.is_cancelled() {
            return;
        }
        let notification = match update {
            ProgressUpdate::Percent(percent) => Notification::Progress { query_id, percent },
            ProgressUpdate::Indeterminate => Notification::Indeterminate { query_id },
        };
        let _ = callback.send(notification);
    };

    let mut cycle = Cycle::new(query_id, token.clone(), &sink);
    handler.consume_body(body, &mut cycle)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic in request worker".to_string()
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod worker_tests;
