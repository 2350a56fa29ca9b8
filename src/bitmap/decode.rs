//! Image decoding from an accumulated body

use image::{DynamicImage, ImageFormat};

use super::options::DecodeOptions;
use crate::request::RequestError;

/// Structured image result delivered by the image worker
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
    /// Width before any scaling
    pub source_width: u32,
    /// Height before any scaling
    pub source_height: u32,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn was_scaled(&self) -> bool {
        self.width() != self.source_width || self.height() != self.source_height
    }
}

/// Decode `bytes` into an image, applying `options`
pub fn decode_bytes(bytes: &[u8], options: &DecodeOptions) -> Result<DecodedImage, RequestError> {
    if bytes.is_empty() {
        return Err(RequestError::Decode("empty image body".to_string()));
    }

    let format = image::guess_format(bytes)
        .map_err(|e| RequestError::Decode(format!("unrecognised image format: {}", e)))?;
    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| RequestError::Decode(e.to_string()))?;

    let (source_width, source_height) = (image.width(), image.height());

    if options.require_equirectangular && source_width != 2 * source_height {
        return Err(RequestError::Decode(format!(
            "not an equirectangular panorama ({}x{})",
            source_width, source_height
        )));
    }

    let image = match options.max_dimension {
        Some(max) if source_width.max(source_height) > max => {
            log::debug!(
                "Scaling {}x{} image to fit {}",
                source_width,
                source_height,
                max
            );
            image.resize(max, max, options.filter.filter_type())
        }
        _ => image,
    };

    Ok(DecodedImage {
        image,
        format,
        source_width,
        source_height,
    })
}
