//! Image download and decode
//!
//! The binary-payload specialization of the request worker. See
//! [`ImageHandler`] for the buffered and streaming body modes.

mod decode;
mod handler;
mod options;

pub use decode::{DecodedImage, decode_bytes};
pub use handler::{
    BodyMode, DEFAULT_CHUNK_SIZE, DEFAULT_PIPE_CAPACITY, ImageHandler, ImageQuery,
};
pub use options::{DecodeOptions, ScaleFilter};
