//! Photo sizes requests

use super::types::{ApiEndpoint, ImageSize, PhotoSizes, SizedImage};
use crate::config::PhotosConfig;
use crate::markup::{Element, MarkupSink, parse_markup};
use crate::request::{Cycle, Locator, RequestError, RequestHandler, ResponseBody};

const SIZES_METHOD: &str = "flickr.photos.getSizes";

/// Handler listing the renditions of one photo
///
/// Params are the photo id.
#[derive(Debug, Clone)]
pub struct PhotoSizesHandler {
    api: ApiEndpoint,
}

impl PhotoSizesHandler {
    pub fn new(api: ApiEndpoint) -> Self {
        Self { api }
    }

    pub fn from_config(config: &PhotosConfig) -> Self {
        Self::new(ApiEndpoint::from_config(config))
    }
}

impl RequestHandler for PhotoSizesHandler {
    type Params = String;
    type Output = PhotoSizes;

    fn build_locator(&self, photo_id: &String) -> Result<Locator, RequestError> {
        if photo_id.trim().is_empty() {
            return Err(RequestError::Locator("empty photo id".to_string()));
        }
        self.api
            .locator(SIZES_METHOD, &[("photo_id", photo_id.clone())])
    }

    fn consume_body(
        &self,
        body: ResponseBody,
        cycle: &mut Cycle<'_>,
    ) -> Result<PhotoSizes, RequestError> {
        parse_markup(body, cycle, SizesSink::default())
    }
}

#[derive(Default)]
struct SizesSink {
    sizes: PhotoSizes,
}

impl MarkupSink for SizesSink {
    type Output = PhotoSizes;

    fn start_element(&mut self, element: &Element<'_>) -> Result<(), RequestError> {
        if element.name() != "size" {
            return Ok(());
        }

        let Some(label) = element.attr("label")? else {
            return Ok(());
        };
        let slot = match label.to_ascii_lowercase().as_str() {
            "square" => &mut self.sizes.square,
            "thumbnail" => &mut self.sizes.thumbnail,
            "small" => &mut self.sizes.small,
            "medium" => &mut self.sizes.medium,
            "large" => &mut self.sizes.large,
            "original" => &mut self.sizes.original,
            other => {
                log::debug!("Ignoring size label {:?}", other);
                return Ok(());
            }
        };

        // Entries without a usable source or dimensions are skipped
        let Some(url) = element
            .attr("source")?
            .filter(|source| Locator::parse(source).is_ok())
        else {
            return Ok(());
        };
        let Some(size) = ImageSize::from_parts(element.attr_parsed("width")?, element.attr_parsed("height")?)
        else {
            return Ok(());
        };

        *slot = Some(SizedImage { size, url });
        Ok(())
    }

    fn finish(self) -> Result<PhotoSizes, RequestError> {
        Ok(self.sizes)
    }
}

#[cfg(test)]
#[path = "sizes_tests.rs"]
mod sizes_tests;
