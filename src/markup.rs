//! Streaming parser for structured-markup API responses
//!
//! The photo API answers with an `<rsp stat="ok">` envelope. [`parse_markup`]
//! pulls events off the response body, checks the envelope and forwards the
//! elements inside it to a [`MarkupSink`]. Cancellation is checked before
//! every event, so a cancelled query stops within one read.

use std::borrow::Cow;
use std::io::BufReader;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::request::{Cycle, ProgressReader, RequestError, ResponseBody};

const ROOT_ELEMENT: &str = "rsp";
const STATUS_OK: &str = "ok";

/// A start tag handed to a [`MarkupSink`]
pub struct Element<'a> {
    name: String,
    start: &'a BytesStart<'a>,
}

impl<'a> Element<'a> {
    fn new(start: &'a BytesStart<'a>) -> Self {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        Self { name, start }
    }

    /// Local name of the element, without namespace prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unescaped value of an attribute, `None` when absent
    pub fn attr(&self, key: &str) -> Result<Option<String>, RequestError> {
        let attribute = self
            .start
            .try_get_attribute(key)
            .map_err(|e| RequestError::Decode(format!("malformed attribute on <{}>: {}", self.name, e)))?;

        match attribute {
            Some(attribute) => attribute
                .unescape_value()
                .map(Cow::into_owned)
                .map(Some)
                .map_err(|e| RequestError::Decode(format!("malformed attribute {}: {}", key, e))),
            None => Ok(None),
        }
    }

    /// Attribute parsed as a number; absent or unparsable values give `None`
    pub fn attr_parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, RequestError> {
        Ok(self.attr(key)?.and_then(|value| value.trim().parse().ok()))
    }
}

/// Receives the elements inside a successful response envelope
pub trait MarkupSink {
    type Output;

    fn start_element(&mut self, element: &Element<'_>) -> Result<(), RequestError>;

    fn text(&mut self, _text: &str) -> Result<(), RequestError> {
        Ok(())
    }

    fn end_element(&mut self, _name: &str) -> Result<(), RequestError> {
        Ok(())
    }

    /// Called once the envelope has been fully read
    fn finish(self) -> Result<Self::Output, RequestError>;
}

/// Remote failure details collected from an `<err>` element
#[derive(Debug, Default)]
struct RemoteFailure {
    status: String,
    code: Option<String>,
    message: Option<String>,
}

impl RemoteFailure {
    fn into_error(self) -> RequestError {
        let detail = match (self.code, self.message) {
            (Some(code), Some(message)) => format!("{} (code {})", message, code),
            (None, Some(message)) => message,
            (Some(code), None) => format!("code {}", code),
            (None, None) => format!("status \"{}\"", self.status),
        };
        RequestError::Protocol(detail)
    }
}

enum Envelope {
    Pending,
    Ok,
    Failed(RemoteFailure),
}

/// Parse a markup response body into the sink's output
///
/// Reports byte progress through the cycle while reading.
pub fn parse_markup<S: MarkupSink>(
    body: ResponseBody,
    cycle: &mut Cycle<'_>,
    mut sink: S,
) -> Result<S::Output, RequestError> {
    let cancel = cycle.cancel_token().clone();
    let total = body.content_length();
    let query_id = cycle.query_id();

    let mut reader = Reader::from_reader(BufReader::new(ProgressReader::new(body, total, cycle)));
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut envelope = Envelope::Pending;
    let mut depth = 0usize;

    loop {
        if cancel.is_cancelled() {
            return Err(RequestError::Cancelled);
        }

        let event = reader.read_event_into(&mut buf).map_err(|e| {
            if cancel.is_cancelled() {
                RequestError::Cancelled
            } else {
                read_error(e)
            }
        })?;

        match event {
            Event::Start(start) => {
                envelope = open_element(envelope, depth, &start, &mut sink)?;
                depth += 1;
            }
            Event::Empty(start) => {
                envelope = open_element(envelope, depth, &start, &mut sink)?;
                if depth > 0 && matches!(envelope, Envelope::Ok) {
                    sink.end_element(&Element::new(&start).name)?;
                }
            }
            Event::End(end) => {
                depth = depth.saturating_sub(1);
                if depth > 0 && matches!(envelope, Envelope::Ok) {
                    let name = String::from_utf8_lossy(end.local_name().as_ref()).into_owned();
                    sink.end_element(&name)?;
                }
            }
            Event::Text(text) => {
                if depth > 1 && matches!(envelope, Envelope::Ok) {
                    let text = text
                        .unescape()
                        .map_err(|e| RequestError::Decode(format!("malformed text: {}", e)))?;
                    sink.text(&text)?;
                }
            }
            Event::CData(data) => {
                if depth > 1 && matches!(envelope, Envelope::Ok) {
                    sink.text(&String::from_utf8_lossy(&data))?;
                }
            }
            Event::Eof => break,
            _ => {}
        }

        buf.clear();
    }

    match envelope {
        Envelope::Ok => {
            log::debug!("Parsed markup response for query {}", query_id);
            sink.finish()
        }
        Envelope::Failed(failure) => Err(failure.into_error()),
        Envelope::Pending => Err(RequestError::Decode("empty response document".to_string())),
    }
}

fn open_element<S: MarkupSink>(
    envelope: Envelope,
    depth: usize,
    start: &BytesStart<'_>,
    sink: &mut S,
) -> Result<Envelope, RequestError> {
    let element = Element::new(start);

    if depth == 0 {
        if element.name() != ROOT_ELEMENT {
            return Err(RequestError::Protocol(format!(
                "unexpected root element <{}>",
                element.name()
            )));
        }
        return match element.attr("stat")? {
            Some(status) if status == STATUS_OK => Ok(Envelope::Ok),
            status => Ok(Envelope::Failed(RemoteFailure {
                status: status.unwrap_or_default(),
                ..RemoteFailure::default()
            })),
        };
    }

    match envelope {
        Envelope::Ok => {
            sink.start_element(&element)?;
            Ok(Envelope::Ok)
        }
        Envelope::Failed(mut failure) => {
            if element.name() == "err" {
                failure.code = element.attr("code")?;
                failure.message = element.attr("msg")?;
            }
            Ok(Envelope::Failed(failure))
        }
        Envelope::Pending => Ok(Envelope::Pending),
    }
}

fn read_error(e: quick_xml::Error) -> RequestError {
    match e {
        quick_xml::Error::Io(io) => RequestError::Transport(io.to_string()),
        other => RequestError::Decode(format!("malformed response: {}", other)),
    }
}

#[cfg(test)]
#[path = "markup_tests.rs"]
mod markup_tests;
