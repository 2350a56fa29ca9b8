//! Blocking transport used by request workers
//!
//! A [`Transport`] turns a locator into a readable body plus an optional
//! content length. [`HttpTransport`] is the reqwest-backed implementation.

use std::fmt;
use std::io::{self, Read};
use std::time::Duration;

use reqwest::blocking::Client;

use super::types::RequestError;
use crate::config::HttpConfig;

/// Resource address built from a query's parameters
pub type Locator = reqwest::Url;

/// Response body handed to a handler's `consume_body`
pub struct ResponseBody {
    reader: Box<dyn Read + Send>,
    content_length: Option<u64>,
}

impl ResponseBody {
    pub fn new(reader: Box<dyn Read + Send>, content_length: Option<u64>) -> Self {
        Self {
            reader,
            content_length,
        }
    }

    /// Body from an in-memory buffer with a known length
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let len = bytes.len() as u64;
        Self::new(Box::new(io::Cursor::new(bytes)), Some(len))
    }

    /// Announced length in bytes, if the server sent one
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl Read for ResponseBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

/// Generic blocking byte-stream client
pub trait Transport: Send + Sync {
    /// Open `locator` and return its body
    ///
    /// Connection failures and non-success statuses map to
    /// [`RequestError::Transport`].
    fn open(&self, locator: &Locator) -> Result<ResponseBody, RequestError>;
}

/// HTTP transport on top of reqwest's blocking client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a transport from the `[http]` config section
    pub fn from_config(config: &HttpConfig) -> Result<Self, RequestError> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs));

        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        } else {
            builder = builder.timeout(None);
        }

        let client = builder
            .build()
            .map_err(|e| RequestError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn open(&self, locator: &Locator) -> Result<ResponseBody, RequestError> {
        let response = self
            .client
            .get(locator.clone())
            .send()
            .map_err(|e| RequestError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestError::Transport(format!("HTTP status {}", status)));
        }

        let content_length = response.content_length();
        log::debug!(
            "Opened {} (content length: {:?})",
            locator,
            content_length
        );

        Ok(ResponseBody::new(Box::new(response), content_length))
    }
}
