//! Decode options supplied by the caller of the image worker

use image::imageops::FilterType;
use serde::Deserialize;

/// Resampling filter used when an image is scaled down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScaleFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl ScaleFilter {
    pub fn filter_type(self) -> FilterType {
        match self {
            ScaleFilter::Nearest => FilterType::Nearest,
            ScaleFilter::Triangle => FilterType::Triangle,
            ScaleFilter::CatmullRom => FilterType::CatmullRom,
            ScaleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// How a downloaded image is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    /// Scale down so that the longest side fits; `None` keeps full size
    pub max_dimension: Option<u32>,
    pub filter: ScaleFilter,
    /// Reject images whose width is not exactly twice their height
    pub require_equirectangular: bool,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_dimension(mut self, max: u32) -> Self {
        self.max_dimension = Some(max);
        self
    }

    pub fn filter(mut self, filter: ScaleFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn equirectangular(mut self) -> Self {
        self.require_equirectangular = true;
        self
    }
}
