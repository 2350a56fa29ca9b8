//! Request Worker Types
//!
//! Queries, responses, and the notifications a worker posts back to the
//! caller's callback channel.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;

use thiserror::Error;

static NEXT_QUERY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a query, used for cancellation and matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(u64);

impl QueryId {
    fn next() -> Self {
        QueryId(NEXT_QUERY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Channel on which a worker delivers notifications for a query
pub type Callback<P, O> = Sender<Notification<P, O>>;

/// One caller-initiated request awaiting asynchronous execution
///
/// `params` are opaque to the worker and only interpreted by the handler's
/// `build_locator`. Immutable after creation.
#[derive(Debug)]
pub struct Query<P, O> {
    id: QueryId,
    params: P,
    callback: Callback<P, O>,
}

impl<P, O> Query<P, O> {
    pub fn new(params: P, callback: Callback<P, O>) -> Self {
        Self {
            id: QueryId::next(),
            params,
            callback,
        }
    }

    pub fn id(&self) -> QueryId {
        self.id
    }

    pub fn params(&self) -> &P {
        &self.params
    }

    pub(crate) fn into_parts(self) -> (QueryId, P, Callback<P, O>) {
        (self.id, self.params, self.callback)
    }
}

/// Terminal outcome of a query
///
/// Exactly one of success-with-result or failure-with-error holds, enforced
/// by `outcome` being a `Result`.
#[derive(Debug)]
pub struct Response<P, O> {
    pub query_id: QueryId,
    pub params: P,
    pub outcome: Result<O, RequestError>,
}

impl<P, O> Response<P, O> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn result(&self) -> Option<&O> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&RequestError> {
        self.outcome.as_ref().err()
    }

    /// Human-readable failure description, if this is a failure
    pub fn error_message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }

    pub fn into_result(self) -> Result<O, RequestError> {
        self.outcome
    }
}

/// Message posted by a worker to a query's callback channel
///
/// For a given query, any number of progress notifications may precede
/// exactly one terminal notification (`Finished` or `Failed`), unless the
/// query was cancelled, in which case nothing terminal is sent.
#[derive(Debug)]
pub enum Notification<P, O> {
    /// Percentage of the body received, strictly increasing, at most 100
    Progress { query_id: QueryId, percent: u8 },
    /// Body length unknown; no numeric progress will follow
    Indeterminate { query_id: QueryId },
    /// Query completed with a result
    Finished(Response<P, O>),
    /// Query failed; the response carries the error
    Failed(Response<P, O>),
}

impl<P, O> Notification<P, O> {
    pub fn query_id(&self) -> QueryId {
        match self {
            Notification::Progress { query_id, .. } | Notification::Indeterminate { query_id } => {
                *query_id
            }
            Notification::Finished(response) | Notification::Failed(response) => {
                response.query_id
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Notification::Finished(_) | Notification::Failed(_))
    }

    /// Convert a terminal notification into its response
    pub fn into_response(self) -> Option<Response<P, O>> {
        match self {
            Notification::Finished(response) | Notification::Failed(response) => Some(response),
            _ => None,
        }
    }
}

/// Errors that end a query cycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RequestError {
    /// Parameters could not be turned into a locator; no I/O was attempted
    #[error("Invalid request: {0}")]
    Locator(String),

    /// Connection or read failure, including bodies that end early
    #[error("Network error: {0}")]
    Transport(String),

    /// The remote response reported failure through its own status indicator
    #[error("Remote error: {0}")]
    Protocol(String),

    /// The body could not be interpreted as the expected result
    #[error("Decode error: {0}")]
    Decode(String),

    /// The handler panicked while executing the query
    #[error("Request worker crashed: {0}")]
    Crashed(String),

    /// The query was cancelled; never delivered to callers
    #[error("Request cancelled")]
    Cancelled,
}

impl RequestError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RequestError::Cancelled)
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
