//! Tests for photo search requests

use super::*;
use insta::assert_snapshot;
use std::sync::Arc;
use std::sync::mpsc::channel;
use std::time::Duration;

use crate::request::{Notification, Query, RequestWorker};
use crate::test_utils::test_helpers::{FakeReply, FakeTransport};

fn handler() -> PhotoSearchHandler {
    PhotoSearchHandler::new(ApiEndpoint::new(
        "https://api.example.com/rest",
        Some("k3y".to_string()),
    ))
}

const SEARCH_RESPONSE: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<rsp stat="ok">
<photos page="1" pages="3" perpage="50" total="120">
  <photo id="101" owner="12@N01" secret="s1" server="7" farm="1" title="Market square"
         ownername="alice" originalsecret="o1" originalformat="jpg"
         url_l="https://example.com/l.jpg" height_l="512" width_l="1024"
         url_o="https://example.com/o.jpg" height_o="3000" width_o="6000"
         url_t="https://example.com/t.jpg" height_t="50" width_t="100"/>
  <photo id="102" owner="34@N01" secret="s2" server="8" farm="2" title=""
         ownername="bob"/>
</photos>
</rsp>"#;

#[test]
fn test_tag_search_locator() {
    let params = SearchParams::new(vec!["pano".to_string(), "equirectangular".to_string()])
        .per_page(50)
        .page(2);

    let url = handler().build_locator(&params).unwrap();

    assert_snapshot!(url.as_str(), @"https://api.example.com/rest?method=flickr.photos.search&api_key=k3y&tags=pano%2Cequirectangular&tag_mode=all&content_type=1&per_page=50&page=2&sort=interestingness-desc&extras=owner_name%2Curl_o%2Curl_l%2Curl_t%2Coriginal_format%2Co_dims&min_upload_date=1990-01-01");
}

#[test]
fn test_geo_search_locator() {
    let params = SearchParams::new(Vec::new())
        .near(GeoPoint::new(48.5, 9.25), 5.0)
        .sort(SortOrder::DatePosted)
        .per_page(20);

    let url = handler().build_locator(&params).unwrap();

    assert_snapshot!(url.as_str(), @"https://api.example.com/rest?method=flickr.photos.search&api_key=k3y&lat=48.5&lon=9.25&radius=5&radius_units=km&accuracy=1&content_type=1&per_page=20&sort=date-posted-desc&extras=owner_name%2Curl_o%2Curl_l%2Curl_t%2Coriginal_format%2Co_dims&min_upload_date=1990-01-01");
}

#[test]
fn test_zero_radius_ignores_center() {
    let params = SearchParams::new(vec!["pano".to_string()]).near(GeoPoint::new(1.0, 2.0), 0.0);
    let url = handler().build_locator(&params).unwrap();

    assert!(!url.as_str().contains("lat="));
    assert!(!url.as_str().contains("accuracy="));
}

#[test]
fn test_missing_api_key_is_a_locator_error() {
    let handler = PhotoSearchHandler::new(ApiEndpoint::new("https://api.example.com/rest", None));
    let err = handler
        .build_locator(&SearchParams::new(vec!["pano".to_string()]))
        .unwrap_err();

    assert!(matches!(err, RequestError::Locator(_)));
}

#[test]
fn test_search_results_through_worker() {
    let params = SearchParams::new(vec!["pano".to_string()]);
    let url = handler().build_locator(&params).unwrap();

    let transport = Arc::new(FakeTransport::new().with_reply(url.as_str(), FakeReply::body(SEARCH_RESPONSE)));
    let worker = RequestWorker::spawn("search", handler(), transport).unwrap();

    let (tx, rx) = channel();
    worker.enqueue(Query::new(params, tx));

    let photos = loop {
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            Notification::Finished(response) => break response.into_result().unwrap(),
            Notification::Failed(response) => panic!("search failed: {:?}", response.error()),
            _ => {}
        }
    };

    assert_eq!(photos.len(), 2);

    let first = &photos[0];
    assert_eq!(first.id, "101");
    assert_eq!(first.title.as_deref(), Some("Market square"));
    assert_eq!(first.owner.username.as_deref(), Some("alice"));
    assert_eq!(first.owner.nsid.as_deref(), Some("12@N01"));
    assert_eq!(first.large_size, Some(ImageSize::new(1024, 512)));
    assert_eq!(first.original_size, Some(ImageSize::new(6000, 3000)));
    assert_eq!(first.thumbnail_size, Some(ImageSize::new(100, 50)));
    assert_eq!(
        first.original_url().as_deref(),
        Some("https://farm1.static.flickr.com/7/101_o1_o.jpg")
    );

    let second = &photos[1];
    assert_eq!(second.title, None);
    assert_eq!(second.large_size, None);
    assert_eq!(second.original_url(), None);

    worker.shutdown();
}

#[test]
fn test_remote_failure_is_reported() {
    let params = SearchParams::new(vec!["pano".to_string()]);
    let url = handler().build_locator(&params).unwrap();
    let body = r#"<rsp stat="fail"><err code="100" msg="Invalid API Key (Key has invalid format)"/></rsp>"#;

    let transport = Arc::new(FakeTransport::new().with_reply(url.as_str(), FakeReply::body(body)));
    let worker = RequestWorker::spawn("search", handler(), transport).unwrap();

    let (tx, rx) = channel();
    worker.enqueue(Query::new(params, tx));

    let error = loop {
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            Notification::Failed(response) => break response.error_message().unwrap(),
            Notification::Finished(_) => panic!("expected failure"),
            _ => {}
        }
    };

    assert_snapshot!(error, @"Remote error: Invalid API Key (Key has invalid format) (code 100)");
}
