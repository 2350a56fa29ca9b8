//! Handler extension points and the per-cycle context

use std::io::{self, Read};

use tokio_util::sync::CancellationToken;

use super::transport::{Locator, ResponseBody};
use super::types::{QueryId, RequestError};

/// Per-resource-type behaviour plugged into a [`RequestWorker`]
///
/// [`RequestWorker`]: super::worker::RequestWorker
pub trait RequestHandler: Send + 'static {
    /// Caller-defined query parameters
    type Params: Send + 'static;
    /// Result type delivered on success
    type Output: Send + 'static;

    /// Build the locator for a query
    ///
    /// An error here is a pre-flight failure; the transport is never touched.
    fn build_locator(&self, params: &Self::Params) -> Result<Locator, RequestError>;

    /// Decode the response body into a result
    ///
    /// Implementations should call [`Cycle::check_cancelled`] at every chunk
    /// boundary and return [`RequestError::Cancelled`] promptly.
    fn consume_body(
        &self,
        body: ResponseBody,
        cycle: &mut Cycle<'_>,
    ) -> Result<Self::Output, RequestError>;
}

/// Progress update emitted by a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUpdate {
    Percent(u8),
    Indeterminate,
}

/// Context of one execution cycle, owned by the worker thread
///
/// Tracks the progress already reported for the current query so that
/// reported values only ever increase.
pub struct Cycle<'a> {
    query_id: QueryId,
    cancel: CancellationToken,
    last_percent: u8,
    indeterminate: bool,
    sink: &'a dyn Fn(ProgressUpdate),
}

impl<'a> Cycle<'a> {
    pub fn new(
        query_id: QueryId,
        cancel: CancellationToken,
        sink: &'a dyn Fn(ProgressUpdate),
    ) -> Self {
        Self {
            query_id,
            cancel,
            last_percent: 0,
            indeterminate: false,
            sink,
        }
    }

    pub fn query_id(&self) -> QueryId {
        self.query_id
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn check_cancelled(&self) -> Result<(), RequestError> {
        if self.cancel.is_cancelled() {
            Err(RequestError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Report a percentage; ignored unless it exceeds the last reported value
    pub fn report_progress(&mut self, percent: u8) -> bool {
        let percent = percent.min(100);
        if percent <= self.last_percent {
            return false;
        }
        self.last_percent = percent;
        (self.sink)(ProgressUpdate::Percent(percent));
        true
    }

    /// Switch to indeterminate mode; reported at most once per cycle
    pub fn report_indeterminate(&mut self) {
        if !self.indeterminate {
            self.indeterminate = true;
            (self.sink)(ProgressUpdate::Indeterminate);
        }
    }

    /// Report `received` bytes of a body of `total` bytes
    ///
    /// Falls back to indeterminate mode when the total is unknown or zero.
    pub fn report_bytes(&mut self, received: u64, total: Option<u64>) {
        match total {
            Some(total) if total > 0 => {
                self.report_progress(percent_of(received, total));
            }
            _ => self.report_indeterminate(),
        }
    }

    pub fn last_progress(&self) -> u8 {
        self.last_percent
    }
}

/// Rounded percentage of `done` over `total`, capped at 100
pub(crate) fn percent_of(done: u64, total: u64) -> u8 {
    let pct = done.saturating_mul(100).saturating_add(total / 2) / total;
    pct.min(100) as u8
}

/// Reader adapter that reports byte progress and stops on cancellation
///
/// Used by handlers that hand the body to a pull parser instead of reading
/// chunks themselves.
pub struct ProgressReader<'c, 'a, R> {
    inner: R,
    cycle: &'c mut Cycle<'a>,
    total: Option<u64>,
    received: u64,
}

impl<'c, 'a, R: Read> ProgressReader<'c, 'a, R> {
    pub fn new(inner: R, total: Option<u64>, cycle: &'c mut Cycle<'a>) -> Self {
        Self {
            inner,
            cycle,
            total,
            received: 0,
        }
    }

    pub fn received(&self) -> u64 {
        self.received
    }
}

impl<R: Read> Read for ProgressReader<'_, '_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cycle.is_cancelled() {
            return Err(io::Error::other(RequestError::Cancelled));
        }

        let n = self.inner.read(buf)?;
        self.received += n as u64;
        if n > 0 {
            self.cycle.report_bytes(self.received, self.total);
        }
        Ok(n)
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod handler_tests;
