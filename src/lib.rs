//! panofetch library - background request execution for a panorama photo client
//!
//! Requests run on dedicated worker threads that report progress and results
//! over channels, so the calling thread never blocks on the network.

pub mod bitmap;
pub mod config;
pub mod error;
pub mod markup;
pub mod photos;
pub mod pipe;
pub mod request;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::PanoError;
pub use request::{Notification, Query, QueryId, RequestError, RequestHandler, RequestWorker};
