// Configuration type definitions

use serde::Deserialize;

use crate::bitmap::{DEFAULT_CHUNK_SIZE, DEFAULT_PIPE_CAPACITY, ScaleFilter};

/// Default photo API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.flickr.com/services/rest";

fn default_user_agent() -> String {
    concat!("panofetch/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_pipe_capacity() -> usize {
    DEFAULT_PIPE_CAPACITY
}

fn default_streaming() -> bool {
    true
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// Results requested per search page
fn default_per_page() -> u32 {
    50
}

/// Pages tried per search before giving up
fn default_max_tries() -> u32 {
    3
}

/// Accepted panoramas wanted per search
fn default_required_results() -> usize {
    10
}

/// Minimum original width of a high quality panorama
fn default_min_high_res_width() -> u32 {
    3000
}

/// HTTP transport configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Whole-request timeout; unset means none, callers cancel instead
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: None,
        }
    }
}

/// Image download configuration section
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_pipe_capacity")]
    pub pipe_capacity: usize,
    /// Overlap download and decode through a bounded pipe
    #[serde(default = "default_streaming")]
    pub streaming: bool,
    #[serde(default)]
    pub max_dimension: Option<u32>,
    #[serde(default)]
    pub filter: ScaleFilter,
}

impl Default for ImageConfig {
    fn default() -> Self {
        ImageConfig {
            chunk_size: default_chunk_size(),
            pipe_capacity: default_pipe_capacity(),
            streaming: default_streaming(),
            max_dimension: None,
            filter: ScaleFilter::default(),
        }
    }
}

/// Photo search API configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct PhotosConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key (required for any photo API request)
    pub api_key: Option<String>,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
    #[serde(default = "default_required_results")]
    pub required_results: usize,
    /// Accept panoramas without a high resolution original
    #[serde(default)]
    pub include_low_res: bool,
    #[serde(default = "default_min_high_res_width")]
    pub min_high_res_width: u32,
    /// Originals wider than this are not offered
    #[serde(default)]
    pub max_pano_width: Option<u32>,
}

impl Default for PhotosConfig {
    fn default() -> Self {
        PhotosConfig {
            endpoint: default_endpoint(),
            api_key: None,
            per_page: default_per_page(),
            max_tries: default_max_tries(),
            required_results: default_required_results(),
            include_low_res: false,
            min_high_res_width: default_min_high_res_width(),
            max_pano_width: None,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub photos: PhotosConfig,
}

impl Config {
    /// Reset values the workers cannot run with; returns one message per fix
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut fixed = Vec::new();

        if self.image.chunk_size == 0 {
            self.image.chunk_size = default_chunk_size();
            fixed.push(format!("image.chunk_size must be positive, using {}", self.image.chunk_size));
        }
        if self.image.pipe_capacity == 0 {
            self.image.pipe_capacity = default_pipe_capacity();
            fixed.push(format!(
                "image.pipe_capacity must be positive, using {}",
                self.image.pipe_capacity
            ));
        }
        if self.image.max_dimension == Some(0) {
            self.image.max_dimension = None;
            fixed.push("image.max_dimension must be positive, ignoring it".to_string());
        }
        if self.photos.per_page == 0 {
            self.photos.per_page = default_per_page();
            fixed.push(format!("photos.per_page must be positive, using {}", self.photos.per_page));
        }
        if self.photos.max_tries == 0 {
            self.photos.max_tries = default_max_tries();
            fixed.push(format!("photos.max_tries must be positive, using {}", self.photos.max_tries));
        }

        fixed
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
