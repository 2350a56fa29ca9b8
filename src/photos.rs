//! Photo API client
//!
//! Request handlers for the photo search, info and sizes API methods, each
//! meant to run on its own [`RequestWorker`](crate::request::RequestWorker),
//! plus the paging policy used to collect panoramas from search results.

mod info;
mod pager;
mod search;
mod sizes;
mod types;

pub use info::PhotoInfoHandler;
pub use pager::{FilterRules, PageOutcome, PageResult, SearchPager};
pub use search::{GeoPoint, PhotoSearchHandler, SearchParams, SortOrder};
pub use sizes::PhotoSizesHandler;
pub use types::{ApiEndpoint, IMAGE_HOST, ImageSize, Owner, PhotoInfo, PhotoSizes, SizedImage};
