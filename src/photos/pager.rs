//! Paged panorama search
//!
//! Most search results are not usable panoramas, so one user-visible search
//! may take several pages. [`SearchPager`] decides which page to request
//! next and when to stop; the caller enqueues the returned parameters on a
//! search worker and feeds each page's photos back in.

use super::search::SearchParams;
use super::types::PhotoInfo;
use crate::config::PhotosConfig;

/// Rules deciding which search results are offered as panoramas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterRules {
    /// Accept panoramas without a high resolution original
    pub include_low_res: bool,
    pub min_high_res_width: u32,
    /// Originals wider than this are dropped from the result
    pub max_pano_width: Option<u32>,
}

impl FilterRules {
    pub fn from_config(config: &PhotosConfig) -> Self {
        Self {
            include_low_res: config.include_low_res,
            min_high_res_width: config.min_high_res_width,
            max_pano_width: config.max_pano_width,
        }
    }

    /// Keep the equirectangular panoramas of a result page
    ///
    /// Original upload details that are incomplete, not JPEG or too large
    /// are cleared rather than rejecting the photo.
    pub fn apply(&self, photos: Vec<PhotoInfo>) -> Vec<PhotoInfo> {
        photos
            .into_iter()
            .filter_map(|photo| self.accept(photo))
            .collect()
    }

    fn accept(&self, mut photo: PhotoInfo) -> Option<PhotoInfo> {
        let large = photo.large_size.filter(|_| photo.is_complete())?;
        if !large.is_equirectangular() {
            return None;
        }

        if photo.original_url().is_none() || photo.original_size.is_none() {
            photo.clear_original();
        }

        let jpeg = photo
            .original_format
            .as_deref()
            .is_some_and(|format| format.eq_ignore_ascii_case("jpg"));
        if !jpeg {
            photo.clear_original();
        }

        if let (Some(original), Some(max)) = (photo.original_size, self.max_pano_width) {
            if original.width > max {
                photo.clear_original();
            }
        }

        if !self.include_low_res {
            let high_res = photo
                .original_size
                .is_some_and(|original| original.width >= self.min_high_res_width);
            if !high_res {
                return None;
            }
        }

        Some(photo)
    }
}

/// What to do after a page has been processed
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Not enough panoramas yet; request this page next
    More(SearchParams),
    /// The search round is over with `found` panoramas accepted
    Done { found: usize },
    /// All tries used without a single accepted panorama
    Exhausted,
}

/// Accepted photos of one page plus the next step
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    pub accepted: Vec<PhotoInfo>,
    pub outcome: PageOutcome,
}

/// Drives repeated search pages until enough panoramas were found
#[derive(Debug, Clone)]
pub struct SearchPager {
    base: SearchParams,
    rules: FilterRules,
    required_results: usize,
    max_tries: u32,
    current_page: u32,
    tries: u32,
    found: usize,
    total_found: usize,
}

impl SearchPager {
    pub fn new(base: SearchParams, config: &PhotosConfig) -> Self {
        let base = base.per_page(config.per_page);
        Self {
            current_page: base.page.saturating_sub(1),
            base,
            rules: FilterRules::from_config(config),
            required_results: config.required_results,
            max_tries: config.max_tries.max(1),
            tries: 0,
            found: 0,
            total_found: 0,
        }
    }

    /// Begin a search round; returns the first page to request
    ///
    /// A later round continues after the last page of the previous one.
    pub fn start(&mut self) -> SearchParams {
        self.tries = 0;
        self.found = 0;
        self.next_page()
    }

    /// Account for one page of results
    pub fn process(&mut self, photos: Vec<PhotoInfo>) -> PageResult {
        let received = photos.len();
        let accepted = self.rules.apply(photos);
        self.found += accepted.len();
        self.total_found += accepted.len();

        log::debug!(
            "Search page {} (try {}/{}): accepted {} of {}",
            self.current_page,
            self.tries,
            self.max_tries,
            accepted.len(),
            received
        );

        let outcome = if self.found >= self.required_results {
            PageOutcome::Done { found: self.found }
        } else if self.tries >= self.max_tries {
            if self.found == 0 {
                PageOutcome::Exhausted
            } else {
                PageOutcome::Done { found: self.found }
            }
        } else {
            PageOutcome::More(self.next_page())
        };

        PageResult { accepted, outcome }
    }

    /// Panoramas accepted over all rounds
    pub fn total_found(&self) -> usize {
        self.total_found
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    fn next_page(&mut self) -> SearchParams {
        self.current_page += 1;
        self.tries += 1;
        self.base.clone().page(self.current_page)
    }
}

#[cfg(test)]
#[path = "pager_tests.rs"]
mod pager_tests;
