//! Binary-payload request handler
//!
//! Reads an image body in bounded chunks with progress reporting and decodes
//! it. In streaming mode the network reads run on the worker thread and feed
//! a [`BoundedPipe`] drained by a scoped decoder thread, so decoding starts
//! before the transfer has finished.

use std::io::{self, Read};
use std::thread;

use super::decode::{DecodedImage, decode_bytes};
use super::options::DecodeOptions;
use crate::config::ImageConfig;
use crate::pipe::{BoundedPipe, PipeError, PipeReader, PipeWriter};
use crate::request::{Cycle, Locator, RequestError, RequestHandler, ResponseBody};

/// Default network read size
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Default capacity of the streaming pipe
pub const DEFAULT_PIPE_CAPACITY: usize = 5_000;

/// Upper bound on buffer preallocation from an announced content length
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Parameters of an image query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageQuery {
    pub url: String,
}

impl ImageQuery {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// How the body travels from the network to the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// Accumulate the whole body on the worker thread, then decode
    Buffered,
    /// Overlap network reads and decoding through a bounded pipe
    Streaming { pipe_capacity: usize },
}

/// Image worker handler
#[derive(Debug, Clone)]
pub struct ImageHandler {
    options: DecodeOptions,
    mode: BodyMode,
    chunk_size: usize,
}

impl ImageHandler {
    pub fn new(options: DecodeOptions) -> Self {
        Self {
            options,
            mode: BodyMode::Buffered,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Build a handler from the `[image]` config section
    pub fn from_config(config: &ImageConfig) -> Self {
        let mut options = DecodeOptions::new().filter(config.filter);
        options.max_dimension = config.max_dimension;

        let handler = Self::new(options).with_chunk_size(config.chunk_size);
        if config.streaming {
            handler.streaming(config.pipe_capacity)
        } else {
            handler
        }
    }

    pub fn streaming(mut self, pipe_capacity: usize) -> Self {
        self.mode = BodyMode::Streaming { pipe_capacity };
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn mode(&self) -> BodyMode {
        self.mode
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    fn consume_buffered(
        &self,
        mut body: ResponseBody,
        cycle: &mut Cycle<'_>,
    ) -> Result<DecodedImage, RequestError> {
        let total = body.content_length();
        let mut data = Vec::with_capacity(preallocation(total));
        let mut chunk = vec![0u8; self.chunk_size];

        if total.is_none() {
            cycle.report_indeterminate();
        }

        loop {
            cycle.check_cancelled()?;
            let n = read_chunk(&mut body, &mut chunk)?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);
            cycle.report_bytes(data.len() as u64, total);
        }

        check_complete(data.len() as u64, total)?;
        cycle.check_cancelled()?;
        decode_bytes(&data, &self.options)
    }

    fn consume_streaming(
        &self,
        mut body: ResponseBody,
        cycle: &mut Cycle<'_>,
        pipe_capacity: usize,
    ) -> Result<DecodedImage, RequestError> {
        let total = body.content_length();
        let pipe = BoundedPipe::with_cancel(pipe_capacity, cycle.cancel_token().clone())
            .map_err(|e| RequestError::Decode(e.to_string()))?;
        let (mut writer, reader) = pipe.split();
        let options = self.options;

        thread::scope(|scope| {
            let decoder = thread::Builder::new()
                .name("image-decoder".to_string())
                .spawn_scoped(scope, move || {
                    let data = drain_pipe(reader, total)?;
                    decode_bytes(&data, &options)
                })
                .map_err(|e| RequestError::Crashed(format!("failed to spawn decoder: {}", e)))?;

            let produced = self.pump(&mut body, &mut writer, cycle);
            // EOF for the decoder, whether or not the transfer completed
            writer.close();

            let decoded = decoder
                .join()
                .unwrap_or_else(|_| Err(RequestError::Crashed("image decoder panicked".to_string())));

            match produced {
                Ok(()) => decoded,
                Err(PumpError::Cancelled) => Err(RequestError::Cancelled),
                Err(PumpError::Transport(e)) => Err(e),
                Err(PumpError::DecoderGone) => match decoded {
                    Err(e) => Err(e),
                    Ok(_) => Err(RequestError::Decode(
                        "decoder finished before the body was complete".to_string(),
                    )),
                },
            }
        })
    }

    /// Producer side: copy network chunks into the pipe
    fn pump(
        &self,
        body: &mut ResponseBody,
        writer: &mut PipeWriter,
        cycle: &mut Cycle<'_>,
    ) -> Result<(), PumpError> {
        let total = body.content_length();
        let mut chunk = vec![0u8; self.chunk_size];
        let mut received: u64 = 0;

        if total.is_none() {
            cycle.report_indeterminate();
        }

        loop {
            if cycle.is_cancelled() {
                return Err(PumpError::Cancelled);
            }
            let n = read_chunk(body, &mut chunk).map_err(PumpError::Transport)?;
            if n == 0 {
                break;
            }
            writer.write_all(&chunk[..n]).map_err(|e| match e {
                PipeError::Interrupted => PumpError::Cancelled,
                _ => PumpError::DecoderGone,
            })?;
            received += n as u64;
            cycle.report_bytes(received, total);
        }

        check_complete(received, total).map_err(PumpError::Transport)
    }
}

impl RequestHandler for ImageHandler {
    type Params = ImageQuery;
    type Output = DecodedImage;

    fn build_locator(&self, params: &ImageQuery) -> Result<Locator, RequestError> {
        let locator = Locator::parse(params.url.trim())
            .map_err(|e| RequestError::Locator(format!("{}: {}", params.url, e)))?;

        match locator.scheme() {
            "http" | "https" => Ok(locator),
            other => Err(RequestError::Locator(format!(
                "unsupported scheme '{}' in {}",
                other, params.url
            ))),
        }
    }

    fn consume_body(
        &self,
        body: ResponseBody,
        cycle: &mut Cycle<'_>,
    ) -> Result<DecodedImage, RequestError> {
        match self.mode {
            BodyMode::Buffered => self.consume_buffered(body, cycle),
            BodyMode::Streaming { pipe_capacity } => {
                self.consume_streaming(body, cycle, pipe_capacity)
            }
        }
    }
}

/// Why the streaming producer stopped early
#[derive(Debug)]
enum PumpError {
    Cancelled,
    /// The decoder closed its end; its own result explains why
    DecoderGone,
    Transport(RequestError),
}

fn read_chunk(body: &mut ResponseBody, chunk: &mut [u8]) -> Result<usize, RequestError> {
    loop {
        match body.read(chunk) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RequestError::Transport(e.to_string())),
        }
    }
}

/// A body shorter than its announced length never completed
fn check_complete(received: u64, total: Option<u64>) -> Result<(), RequestError> {
    match total {
        Some(total) if received < total => Err(RequestError::Transport(format!(
            "content ended early: received {} of {} bytes",
            received, total
        ))),
        _ => Ok(()),
    }
}

/// Consumer side: collect everything the producer writes
fn drain_pipe(mut reader: PipeReader, size_hint: Option<u64>) -> Result<Vec<u8>, RequestError> {
    let mut data = Vec::with_capacity(preallocation(size_hint));
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(data),
            Ok(n) => data.extend_from_slice(&buf[..n]),
            Err(PipeError::Interrupted) => return Err(RequestError::Cancelled),
            Err(e) => return Err(RequestError::Decode(e.to_string())),
        }
    }
}

fn preallocation(total: Option<u64>) -> usize {
    total.map_or(0, |t| t.min(MAX_PREALLOCATION) as usize)
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod handler_tests;
