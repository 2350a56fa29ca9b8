//! Request Worker Module
//!
//! Executes remote requests on dedicated background threads so the caller's
//! UI thread never blocks. One [`RequestWorker`] per resource type serially
//! runs queued [`Query`] values and posts [`Notification`]s back on the
//! query's callback channel.
//!
//! ## Architecture
//!
//! - Single background thread per worker, blocking on an internal queue
//! - Per-query [`CancellationToken`](tokio_util::sync::CancellationToken),
//!   children of a worker-wide token used by `terminate`
//! - Two extension points per resource type: [`RequestHandler::build_locator`]
//!   and [`RequestHandler::consume_body`]
//! - Each cycle returns its outcome as a value; the worker delivers it
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::{mpsc::channel, Arc};
//! use panofetch::request::{HttpTransport, Notification, Query, RequestWorker};
//!
//! let transport = Arc::new(HttpTransport::from_config(&config.http)?);
//! let worker = RequestWorker::spawn("thumbnails", ImageHandler::new(options), transport)?;
//!
//! let (tx, rx) = channel();
//! let id = worker.enqueue(Query::new(ImageQuery::new(url), tx));
//!
//! for notification in rx.iter() {
//!     match notification {
//!         Notification::Progress { percent, .. } => println!("{}%", percent),
//!         Notification::Finished(response) => break,
//!         Notification::Failed(response) => eprintln!("{:?}", response.error_message()),
//!         Notification::Indeterminate { .. } => {}
//!     }
//! }
//! ```

pub mod handler;
pub mod transport;
pub mod types;
pub mod worker;

// Re-exports for convenience
pub use handler::{Cycle, ProgressReader, ProgressUpdate, RequestHandler};
pub use transport::{HttpTransport, Locator, ResponseBody, Transport};
pub use types::{Callback, Notification, Query, QueryId, RequestError, Response};
pub use worker::RequestWorker;
