// Photo API data types

use serde::Serialize;

use crate::config::PhotosConfig;
use crate::request::{Locator, RequestError};

/// Host serving static photo files
pub const IMAGE_HOST: &str = "static.flickr.com";

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both dimensions known and non-zero
    pub fn from_parts(width: Option<u32>, height: Option<u32>) -> Option<Self> {
        match (width, height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => Some(Self { width, height }),
            _ => None,
        }
    }

    /// Width is exactly twice the height
    pub fn is_equirectangular(&self) -> bool {
        u64::from(self.width) == 2 * u64::from(self.height)
    }
}

/// Photo owner as reported by the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Owner {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nsid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realname: Option<String>,
}

/// Description of one photo
///
/// Search results carry the coarse fields plus the size extras; a photo info
/// request fills in the owner's real name and the title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhotoInfo {
    pub id: String,
    pub secret: String,
    pub server: String,
    pub farm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub owner: Owner,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_size: Option<ImageSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_size: Option<ImageSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_size: Option<ImageSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_format: Option<String>,
}

impl PhotoInfo {
    /// Enough fields to build static file URLs
    pub fn is_complete(&self) -> bool {
        !self.id.is_empty() && !self.secret.is_empty() && !self.server.is_empty() && !self.farm.is_empty()
    }

    fn url_base(&self) -> String {
        format!(
            "https://farm{}.{}/{}/{}_{}",
            self.farm, IMAGE_HOST, self.server, self.id, self.secret
        )
    }

    /// 75x75 square
    pub fn square_url(&self) -> String {
        format!("{}_s.jpg", self.url_base())
    }

    /// 100px on the longest side
    pub fn thumbnail_url(&self) -> String {
        format!("{}_t.jpg", self.url_base())
    }

    /// 240px on the longest side
    pub fn small_url(&self) -> String {
        format!("{}_m.jpg", self.url_base())
    }

    /// 500px on the longest side
    pub fn medium_url(&self) -> String {
        format!("{}.jpg", self.url_base())
    }

    /// 640px on the longest side
    pub fn medium_640_url(&self) -> String {
        format!("{}_z.jpg", self.url_base())
    }

    /// 1024px on the longest side
    pub fn large_url(&self) -> String {
        format!("{}_b.jpg", self.url_base())
    }

    /// Original upload, only when its secret and format are known
    pub fn original_url(&self) -> Option<String> {
        let secret = self.original_secret.as_deref()?;
        let format = self.original_format.as_deref()?;
        Some(format!(
            "https://farm{}.{}/{}/{}_{}_o.{}",
            self.farm, IMAGE_HOST, self.server, self.id, secret, format
        ))
    }

    /// Forget everything known about the original upload
    pub fn clear_original(&mut self) {
        self.original_secret = None;
        self.original_format = None;
        self.original_size = None;
    }
}

/// One available rendition of a photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizedImage {
    pub size: ImageSize,
    pub url: String,
}

/// Renditions returned by a photo sizes request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhotoSizes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub square: Option<SizedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<SizedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small: Option<SizedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<SizedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large: Option<SizedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<SizedImage>,
}

impl PhotoSizes {
    /// Largest available rendition, original first
    pub fn best(&self) -> Option<&SizedImage> {
        self.original
            .as_ref()
            .or(self.large.as_ref())
            .or(self.medium.as_ref())
            .or(self.small.as_ref())
            .or(self.thumbnail.as_ref())
            .or(self.square.as_ref())
    }
}

/// REST endpoint and credentials shared by the photo handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    endpoint: String,
    api_key: Option<String>,
}

impl ApiEndpoint {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
        }
    }

    pub fn from_config(config: &PhotosConfig) -> Self {
        Self::new(config.endpoint.clone(), config.api_key.clone())
    }

    /// Locator for an API method call with the given parameters
    pub fn locator(&self, method: &str, params: &[(&str, String)]) -> Result<Locator, RequestError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| RequestError::Locator("missing API key".to_string()))?;

        let mut url = Locator::parse(&self.endpoint)
            .map_err(|e| RequestError::Locator(format!("bad endpoint {}: {}", self.endpoint, e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("method", method);
            query.append_pair("api_key", api_key);
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
