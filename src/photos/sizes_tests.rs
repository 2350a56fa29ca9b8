//! Tests for photo sizes requests

use super::*;
use insta::assert_snapshot;
use std::sync::mpsc::channel;
use tokio_util::sync::CancellationToken;

use crate::request::{Notification, ProgressUpdate, Query, QueryId};

fn handler() -> PhotoSizesHandler {
    PhotoSizesHandler::new(ApiEndpoint::new(
        "https://api.example.com/rest",
        Some("k3y".to_string()),
    ))
}

fn query_id() -> QueryId {
    let (tx, _rx) = channel::<Notification<(), ()>>();
    Query::new((), tx).id()
}

fn consume(xml: &str) -> Result<PhotoSizes, RequestError> {
    let sink = |_: ProgressUpdate| {};
    let mut cycle = Cycle::new(query_id(), CancellationToken::new(), &sink);
    handler().consume_body(ResponseBody::from_bytes(xml.as_bytes().to_vec()), &mut cycle)
}

#[test]
fn test_sizes_locator() {
    let url = handler().build_locator(&"5301".to_string()).unwrap();
    assert_snapshot!(url.as_str(), @"https://api.example.com/rest?method=flickr.photos.getSizes&api_key=k3y&photo_id=5301");
}

#[test]
fn test_parses_known_labels() {
    let sizes = consume(
        r#"<rsp stat="ok">
<sizes canblog="0" canprint="0" candownload="1">
  <size label="Square" width="75" height="75" source="https://farm6.static.flickr.com/42/5301_abc_s.jpg" media="photo"/>
  <size label="Thumbnail" width="100" height="50" source="https://farm6.static.flickr.com/42/5301_abc_t.jpg" media="photo"/>
  <size label="Large" width="1024" height="512" source="https://farm6.static.flickr.com/42/5301_abc_b.jpg" media="photo"/>
  <size label="Original" width="8000" height="4000" source="https://farm6.static.flickr.com/42/5301_ffee_o.jpg" media="photo"/>
</sizes>
</rsp>"#,
    )
    .unwrap();

    assert_eq!(sizes.square.as_ref().map(|s| s.size), Some(ImageSize::new(75, 75)));
    assert_eq!(sizes.thumbnail.as_ref().map(|s| s.size), Some(ImageSize::new(100, 50)));
    assert_eq!(sizes.small, None);
    assert_eq!(sizes.medium, None);
    assert_eq!(sizes.large.as_ref().map(|s| s.size), Some(ImageSize::new(1024, 512)));

    let best = sizes.best().unwrap();
    assert_eq!(best.size, ImageSize::new(8000, 4000));
    assert_eq!(best.url, "https://farm6.static.flickr.com/42/5301_ffee_o.jpg");
}

#[test]
fn test_unknown_labels_and_bad_entries_are_ignored() {
    let sizes = consume(
        r#"<rsp stat="ok"><sizes>
  <size label="Large Square" width="150" height="150" source="https://example.com/q.jpg"/>
  <size label="Medium 640" width="640" height="320" source="https://example.com/z.jpg"/>
  <size label="Small" width="240" height="120" source="not a url"/>
  <size label="Medium" width="" height="250" source="https://example.com/m.jpg"/>
</sizes></rsp>"#,
    )
    .unwrap();

    assert_eq!(sizes, PhotoSizes::default());
}

#[test]
fn test_labels_are_case_insensitive() {
    let sizes = consume(
        r#"<rsp stat="ok"><sizes><size label="medium" width="500" height="250" source="https://example.com/m.jpg"/></sizes></rsp>"#,
    )
    .unwrap();

    assert_eq!(sizes.medium.map(|s| s.url).as_deref(), Some("https://example.com/m.jpg"));
}
