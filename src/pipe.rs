//! Bounded Byte Pipe
//!
//! A fixed-capacity circular byte buffer with exactly one write end and one
//! read end. Lets a network-reading producer and a payload-decoding consumer
//! run concurrently on the same response body while keeping memory bounded
//! by the pipe capacity instead of the payload size.
//!
//! ## Semantics
//!
//! - `write` blocks while the buffer is full, then copies as many bytes as fit
//! - `read` blocks while the buffer is empty, then returns whatever is available
//! - closing the write end lets the reader drain what is left, then see EOF (`Ok(0)`)
//! - closing the read end fails any pending or future write with [`PipeError::Closed`]
//!
//! Both ends can share a [`CancellationToken`]; blocked waits re-check it and
//! fail with [`PipeError::Interrupted`] once it fires.

use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// How often a blocked end re-checks its cancellation token
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Errors raised by either end of the pipe
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipeError {
    /// Capacity must be at least one byte
    #[error("pipe capacity must be greater than 0")]
    InvalidCapacity,

    /// The other end (or this end) is closed and no further transfer is possible
    #[error("pipe closed")]
    Closed,

    /// A blocked wait was abandoned because the cancellation token fired
    #[error("interrupted while waiting on pipe")]
    Interrupted,
}

impl From<PipeError> for io::Error {
    fn from(err: PipeError) -> Self {
        // Interrupted must not map to io::ErrorKind::Interrupted: write_all and
        // read_to_end retry that kind forever.
        let kind = match err {
            PipeError::Closed => io::ErrorKind::BrokenPipe,
            PipeError::InvalidCapacity => io::ErrorKind::InvalidInput,
            PipeError::Interrupted => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

/// Ring buffer state, always accessed under the shared lock
#[derive(Debug)]
struct RingState {
    buf: Box<[u8]>,
    read_pos: usize,
    write_pos: usize,
    readable: usize,
    free: usize,
    read_closed: bool,
    write_closed: bool,
}

impl RingState {
    fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            read_pos: 0,
            write_pos: 0,
            readable: 0,
            free: capacity,
            read_closed: false,
            write_closed: false,
        }
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Copy as much of `data` as fits, wrapping at the end of the buffer
    fn push(&mut self, data: &[u8]) -> usize {
        let cap = self.capacity();
        let n = data.len().min(self.free);
        let first = n.min(cap - self.write_pos);

        self.buf[self.write_pos..self.write_pos + first].copy_from_slice(&data[..first]);
        self.buf[..n - first].copy_from_slice(&data[first..n]);

        self.write_pos = (self.write_pos + n) % cap;
        self.free -= n;
        self.readable += n;
        debug_assert_eq!(self.readable + self.free, cap);
        n
    }

    /// Move up to `out.len()` readable bytes into `out`
    fn pull(&mut self, out: &mut [u8]) -> usize {
        let cap = self.capacity();
        let n = out.len().min(self.readable);
        let first = n.min(cap - self.read_pos);

        out[..first].copy_from_slice(&self.buf[self.read_pos..self.read_pos + first]);
        out[first..n].copy_from_slice(&self.buf[..n - first]);

        self.read_pos = (self.read_pos + n) % cap;
        self.readable -= n;
        self.free += n;
        debug_assert_eq!(self.readable + self.free, cap);
        n
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<RingState>,
    changed: Condvar,
    cancel: Option<CancellationToken>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until another state transition, or until cancelled
    fn wait<'a>(
        &self,
        guard: MutexGuard<'a, RingState>,
    ) -> Result<MutexGuard<'a, RingState>, PipeError> {
        match &self.cancel {
            Some(token) => {
                if token.is_cancelled() {
                    return Err(PipeError::Interrupted);
                }
                let (guard, _) = self
                    .changed
                    .wait_timeout(guard, CANCEL_POLL_INTERVAL)
                    .unwrap_or_else(PoisonError::into_inner);
                Ok(guard)
            }
            None => Ok(self
                .changed
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner)),
        }
    }
}

/// A bounded single-producer single-consumer byte pipe
///
/// The buffer is allocated once in [`BoundedPipe::new`] and never grows.
/// Use [`BoundedPipe::split`] to obtain the two ends.
#[derive(Debug)]
pub struct BoundedPipe {
    shared: Arc<Shared>,
}

impl BoundedPipe {
    /// Create a pipe holding at most `capacity` bytes
    pub fn new(capacity: usize) -> Result<Self, PipeError> {
        Self::build(capacity, None)
    }

    /// Create a pipe whose blocked reads and writes give up once `cancel` fires
    pub fn with_cancel(capacity: usize, cancel: CancellationToken) -> Result<Self, PipeError> {
        Self::build(capacity, Some(cancel))
    }

    fn build(capacity: usize, cancel: Option<CancellationToken>) -> Result<Self, PipeError> {
        if capacity == 0 {
            return Err(PipeError::InvalidCapacity);
        }

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(RingState::new(capacity)),
                changed: Condvar::new(),
                cancel,
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.shared.lock().capacity()
    }

    /// Split into the write end and the read end
    pub fn split(self) -> (PipeWriter, PipeReader) {
        (
            PipeWriter {
                shared: Arc::clone(&self.shared),
            },
            PipeReader {
                shared: self.shared,
            },
        )
    }
}

/// Producer end of a [`BoundedPipe`]. Dropping it closes the write end.
#[derive(Debug)]
pub struct PipeWriter {
    shared: Arc<Shared>,
}

impl PipeWriter {
    /// Write as many bytes of `data` as currently fit
    ///
    /// Blocks while the buffer is full. Returns the number of bytes copied,
    /// which is at least one unless `data` is empty.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, PipeError> {
        if data.is_empty() {
            return Ok(0);
        }

        let mut state = self.shared.lock();
        loop {
            if state.read_closed || state.write_closed {
                return Err(PipeError::Closed);
            }
            if state.free > 0 {
                break;
            }
            state = self.shared.wait(state)?;
        }

        let written = state.push(data);
        self.shared.changed.notify_all();
        Ok(written)
    }

    /// Write all of `data`, blocking as often as needed
    pub fn write_all(&mut self, mut data: &[u8]) -> Result<(), PipeError> {
        while !data.is_empty() {
            let written = PipeWriter::write(self, data)?;
            data = &data[written..];
        }
        Ok(())
    }

    /// Close the write end; idempotent
    ///
    /// The reader still receives every buffered byte before end-of-stream.
    pub fn close(&mut self) {
        let mut state = self.shared.lock();
        if !state.write_closed {
            state.write_closed = true;
            self.shared.changed.notify_all();
        }
    }

    /// True once the read end has been closed and writes can no longer succeed
    pub fn is_reader_closed(&self) -> bool {
        self.shared.lock().read_closed
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        self.close();
    }
}

impl io::Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        PipeWriter::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Consumer end of a [`BoundedPipe`]. Dropping it closes the read end.
#[derive(Debug)]
pub struct PipeReader {
    shared: Arc<Shared>,
}

impl PipeReader {
    /// Read up to `out.len()` bytes
    ///
    /// Blocks only while nothing is buffered. Returns `Ok(0)` once the buffer
    /// is empty and the write end is closed.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize, PipeError> {
        if out.is_empty() {
            return Ok(0);
        }

        let mut state = self.shared.lock();
        loop {
            if state.readable > 0 {
                break;
            }
            if state.write_closed {
                return Ok(0);
            }
            if state.read_closed {
                return Err(PipeError::Closed);
            }
            state = self.shared.wait(state)?;
        }

        let read = state.pull(out);
        self.shared.changed.notify_all();
        Ok(read)
    }

    /// Close the read end; idempotent
    ///
    /// Any writer blocked on a full buffer wakes up with [`PipeError::Closed`].
    pub fn close(&mut self) {
        let mut state = self.shared.lock();
        if !state.read_closed {
            state.read_closed = true;
            self.shared.changed.notify_all();
        }
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        self.close();
    }
}

impl io::Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        PipeReader::read(self, buf).map_err(io::Error::from)
    }
}

#[cfg(test)]
#[path = "pipe_tests.rs"]
mod pipe_tests;
