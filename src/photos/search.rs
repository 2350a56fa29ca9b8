//! Photo search requests

use super::types::{ApiEndpoint, ImageSize, Owner, PhotoInfo};
use crate::config::PhotosConfig;
use crate::markup::{Element, MarkupSink, parse_markup};
use crate::request::{Cycle, Locator, RequestError, RequestHandler, ResponseBody};

const SEARCH_METHOD: &str = "flickr.photos.search";

/// Extra fields requested per result so no follow-up request is needed
const SEARCH_EXTRAS: &str = "owner_name,url_o,url_l,url_t,original_format,o_dims";

/// The API wants at least one criterion besides location
const MIN_UPLOAD_DATE: &str = "1990-01-01";

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Interestingness,
    DatePosted,
}

impl SortOrder {
    pub fn as_param(self) -> &'static str {
        match self {
            SortOrder::Interestingness => "interestingness-desc",
            SortOrder::DatePosted => "date-posted-desc",
        }
    }
}

/// Search circle center in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Parameters of one search page
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    /// All tags must match
    pub tags: Vec<String>,
    pub center: Option<GeoPoint>,
    /// Radius around `center`; the circle is ignored unless positive
    pub radius_km: f64,
    pub sort: SortOrder,
    /// 1-based page; 0 leaves the choice to the server
    pub page: u32,
    pub per_page: u32,
}

impl SearchParams {
    pub fn new(tags: Vec<String>) -> Self {
        Self {
            tags,
            center: None,
            radius_km: 0.0,
            sort: SortOrder::default(),
            page: 0,
            per_page: 50,
        }
    }

    pub fn near(mut self, center: GeoPoint, radius_km: f64) -> Self {
        self.center = Some(center);
        self.radius_km = radius_km;
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();

        if !self.tags.is_empty() {
            query.push(("tags", self.tags.join(",")));
            query.push(("tag_mode", "all".to_string()));
        }

        if let Some(center) = self.center.filter(|_| self.radius_km > 0.0) {
            query.push(("lat", center.latitude.to_string()));
            query.push(("lon", center.longitude.to_string()));
            query.push(("radius", self.radius_km.to_string()));
            query.push(("radius_units", "km".to_string()));
            // Accept world-level location accuracy
            query.push(("accuracy", "1".to_string()));
        }

        // Photos only, no screenshots or other content
        query.push(("content_type", "1".to_string()));
        query.push(("per_page", self.per_page.to_string()));
        if self.page > 0 {
            query.push(("page", self.page.to_string()));
        }
        query.push(("sort", self.sort.as_param().to_string()));
        query.push(("extras", SEARCH_EXTRAS.to_string()));
        query.push(("min_upload_date", MIN_UPLOAD_DATE.to_string()));

        query
    }
}

/// Handler for photo search pages
#[derive(Debug, Clone)]
pub struct PhotoSearchHandler {
    api: ApiEndpoint,
}

impl PhotoSearchHandler {
    pub fn new(api: ApiEndpoint) -> Self {
        Self { api }
    }

    pub fn from_config(config: &PhotosConfig) -> Self {
        Self::new(ApiEndpoint::from_config(config))
    }
}

impl RequestHandler for PhotoSearchHandler {
    type Params = SearchParams;
    type Output = Vec<PhotoInfo>;

    fn build_locator(&self, params: &SearchParams) -> Result<Locator, RequestError> {
        self.api.locator(SEARCH_METHOD, &params.to_query())
    }

    fn consume_body(
        &self,
        body: ResponseBody,
        cycle: &mut Cycle<'_>,
    ) -> Result<Vec<PhotoInfo>, RequestError> {
        let photos = parse_markup(body, cycle, SearchSink::default())?;
        log::debug!("Search returned {} photos", photos.len());
        Ok(photos)
    }
}

#[derive(Default)]
struct SearchSink {
    photos: Vec<PhotoInfo>,
}

impl MarkupSink for SearchSink {
    type Output = Vec<PhotoInfo>;

    fn start_element(&mut self, element: &Element<'_>) -> Result<(), RequestError> {
        if element.name() == "photo" {
            self.photos.push(photo_from_result(element)?);
        }
        Ok(())
    }

    fn finish(self) -> Result<Vec<PhotoInfo>, RequestError> {
        Ok(self.photos)
    }
}

fn photo_from_result(element: &Element<'_>) -> Result<PhotoInfo, RequestError> {
    Ok(PhotoInfo {
        id: element.attr("id")?.unwrap_or_default(),
        secret: element.attr("secret")?.unwrap_or_default(),
        server: element.attr("server")?.unwrap_or_default(),
        farm: element.attr("farm")?.unwrap_or_default(),
        title: element.attr("title")?.filter(|title| !title.is_empty()),
        owner: Owner {
            nsid: element.attr("owner")?,
            username: element.attr("ownername")?,
            realname: None,
        },
        thumbnail_size: ImageSize::from_parts(
            element.attr_parsed("width_t")?,
            element.attr_parsed("height_t")?,
        ),
        large_size: ImageSize::from_parts(
            element.attr_parsed("width_l")?,
            element.attr_parsed("height_l")?,
        ),
        original_size: ImageSize::from_parts(
            element.attr_parsed("width_o")?,
            element.attr_parsed("height_o")?,
        ),
        original_secret: element.attr("originalsecret")?,
        original_format: element.attr("originalformat")?,
    })
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod search_tests;
