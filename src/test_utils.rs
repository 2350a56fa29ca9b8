//! Shared test utilities for panofetch
//!
//! In-memory transports and readers used across worker, image and photo tests.

#[cfg(test)]
pub mod test_helpers {
    use std::collections::HashMap;
    use std::io::{self, Read};
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    use crate::request::{Locator, RequestError, ResponseBody, Transport};

    /// Canned reply for one URL
    #[derive(Debug, Clone)]
    pub enum FakeReply {
        /// Body with the given announced content length
        Body {
            bytes: Vec<u8>,
            content_length: Option<u64>,
        },
        /// Body delivered `chunk` bytes at a time with a pause between reads
        Slow {
            bytes: Vec<u8>,
            chunk: usize,
            delay: Duration,
        },
        /// Body that never ends, delivering `chunk` bytes per read
        Endless { chunk: usize, delay: Duration },
        /// Open fails with this error
        Fail(RequestError),
    }

    impl FakeReply {
        pub fn body(bytes: impl Into<Vec<u8>>) -> Self {
            let bytes = bytes.into();
            let len = bytes.len() as u64;
            FakeReply::Body {
                bytes,
                content_length: Some(len),
            }
        }

        pub fn body_without_length(bytes: impl Into<Vec<u8>>) -> Self {
            FakeReply::Body {
                bytes: bytes.into(),
                content_length: None,
            }
        }
    }

    /// Transport serving canned replies and recording every opened URL
    #[derive(Debug, Default)]
    pub struct FakeTransport {
        replies: Mutex<HashMap<String, FakeReply>>,
        opened: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_reply(self, url: &str, reply: FakeReply) -> Self {
            self.replies
                .lock()
                .unwrap()
                .insert(url.to_string(), reply);
            self
        }

        pub fn opened(&self) -> Vec<String> {
            self.opened.lock().unwrap().clone()
        }
    }

    impl Transport for FakeTransport {
        fn open(&self, locator: &Locator) -> Result<ResponseBody, RequestError> {
            self.opened.lock().unwrap().push(locator.to_string());

            let reply = self
                .replies
                .lock()
                .unwrap()
                .get(locator.as_str())
                .cloned()
                .ok_or_else(|| RequestError::Transport("HTTP status 404 Not Found".to_string()))?;

            match reply {
                FakeReply::Body {
                    bytes,
                    content_length,
                } => Ok(ResponseBody::new(
                    Box::new(io::Cursor::new(bytes)),
                    content_length,
                )),
                FakeReply::Slow {
                    bytes,
                    chunk,
                    delay,
                } => {
                    let len = bytes.len() as u64;
                    Ok(ResponseBody::new(
                        Box::new(SlowReader::new(bytes, chunk, delay)),
                        Some(len),
                    ))
                }
                FakeReply::Endless { chunk, delay } => {
                    Ok(ResponseBody::new(Box::new(EndlessReader { chunk, delay }), None))
                }
                FakeReply::Fail(err) => Err(err),
            }
        }
    }

    /// Reader that hands out at most `chunk` bytes per call, sleeping first
    pub struct SlowReader {
        data: io::Cursor<Vec<u8>>,
        chunk: usize,
        delay: Duration,
    }

    impl SlowReader {
        pub fn new(data: Vec<u8>, chunk: usize, delay: Duration) -> Self {
            Self {
                data: io::Cursor::new(data),
                chunk,
                delay,
            }
        }
    }

    impl Read for SlowReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            thread::sleep(self.delay);
            let n = buf.len().min(self.chunk);
            self.data.read(&mut buf[..n])
        }
    }

    /// Reader that never reaches EOF
    pub struct EndlessReader {
        chunk: usize,
        delay: Duration,
    }

    impl Read for EndlessReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            thread::sleep(self.delay);
            let n = buf.len().min(self.chunk);
            buf[..n].fill(0xAB);
            Ok(n)
        }
    }

    /// Deterministic pseudo-random bytes
    pub fn noise(len: usize) -> Vec<u8> {
        let mut x: u32 = 0x1234_5678;
        (0..len)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                (x & 0xFF) as u8
            })
            .collect()
    }
}
