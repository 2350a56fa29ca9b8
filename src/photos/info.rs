//! Photo info requests

use super::types::{ApiEndpoint, PhotoInfo};
use crate::config::PhotosConfig;
use crate::markup::{Element, MarkupSink, parse_markup};
use crate::request::{Cycle, Locator, RequestError, RequestHandler, ResponseBody};

const INFO_METHOD: &str = "flickr.photos.getInfo";

/// Handler fetching the full description of one photo
///
/// Params are the photo id.
#[derive(Debug, Clone)]
pub struct PhotoInfoHandler {
    api: ApiEndpoint,
}

impl PhotoInfoHandler {
    pub fn new(api: ApiEndpoint) -> Self {
        Self { api }
    }

    pub fn from_config(config: &PhotosConfig) -> Self {
        Self::new(ApiEndpoint::from_config(config))
    }
}

impl RequestHandler for PhotoInfoHandler {
    type Params = String;
    type Output = PhotoInfo;

    fn build_locator(&self, photo_id: &String) -> Result<Locator, RequestError> {
        if photo_id.trim().is_empty() {
            return Err(RequestError::Locator("empty photo id".to_string()));
        }
        self.api
            .locator(INFO_METHOD, &[("photo_id", photo_id.clone())])
    }

    fn consume_body(
        &self,
        body: ResponseBody,
        cycle: &mut Cycle<'_>,
    ) -> Result<PhotoInfo, RequestError> {
        parse_markup(body, cycle, InfoSink::default())
    }
}

#[derive(Default)]
struct InfoSink {
    info: PhotoInfo,
    seen_photo: bool,
    in_title: bool,
}

impl MarkupSink for InfoSink {
    type Output = PhotoInfo;

    fn start_element(&mut self, element: &Element<'_>) -> Result<(), RequestError> {
        match element.name() {
            "photo" => {
                self.seen_photo = true;
                self.info.id = element.attr("id")?.unwrap_or_default();
                self.info.secret = element.attr("secret")?.unwrap_or_default();
                self.info.server = element.attr("server")?.unwrap_or_default();
                self.info.farm = element.attr("farm")?.unwrap_or_default();
                self.info.original_secret = element.attr("originalsecret")?;
                self.info.original_format = element.attr("originalformat")?;
            }
            "owner" => {
                self.info.owner.nsid = element.attr("nsid")?;
                self.info.owner.username = element.attr("username")?;
                self.info.owner.realname = element.attr("realname")?.filter(|name| !name.is_empty());
            }
            "title" => self.in_title = true,
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), RequestError> {
        if self.in_title {
            self.info.title = Some(text.to_string());
        }
        Ok(())
    }

    fn end_element(&mut self, name: &str) -> Result<(), RequestError> {
        if name == "title" {
            self.in_title = false;
        }
        Ok(())
    }

    fn finish(self) -> Result<PhotoInfo, RequestError> {
        if !self.seen_photo {
            return Err(RequestError::Decode("response has no photo element".to_string()));
        }
        Ok(self.info)
    }
}

#[cfg(test)]
#[path = "info_tests.rs"]
mod info_tests;
