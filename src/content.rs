//! Standard content serving: conditional requests and byte ranges.
//!
//! By the time [`serve_content`] runs, the file server has already chosen
//! the file and set its representation headers (`Content-Type`, `ETag`,
//! `Content-Encoding`, `Vary`). This module only decides *how much* of the
//! file to send and with which status, following RFC 9110 §13 for
//! preconditions and §14 for ranges.

use std::io::{self, SeekFrom};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use http::header;
use httpdate::{fmt_http_date, parse_http_date};
use tokio::fs::File;
use tokio::io::AsyncSeekExt;

use crate::etag;
use crate::method::Method;
use crate::request::Request;
use crate::response::{Body, Response};
use crate::status::Status;

/// A single satisfiable byte range.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ByteRange {
    pub start: u64,
    pub len: u64,
}

#[derive(Debug, Eq, PartialEq)]
pub(crate) enum RangeError {
    Invalid,
    NoOverlap,
}

impl RangeError {
    fn message(&self) -> &'static str {
        match self {
            Self::Invalid   => "invalid range",
            Self::NoOverlap => "invalid range: failed to overlap",
        }
    }
}

/// Reading the file failed after `response` was prepared.
#[derive(Debug)]
pub(crate) struct ServeError {
    /// The response as it stood, route headers included.
    pub response: Response,
    pub source: io::Error,
}

#[derive(Debug, Eq, PartialEq)]
enum Precondition {
    Pass,
    NotModified,
    Failed,
}

/// Finishes `response` with (part of) `file`, which is `size` bytes long.
///
/// `modified` is `None` when the route disables Last-Modified; the header is
/// then omitted and date-based preconditions are ignored.
pub(crate) async fn serve_content(
    req: &Request,
    mut response: Response,
    mut file: File,
    size: u64,
    modified: Option<SystemTime>,
) -> Result<Response, ServeError> {
    if let Some(modified) = modified {
        response.set_header(header::LAST_MODIFIED, &fmt_http_date(modified));
    }

    match check_preconditions(req, &response, modified) {
        Precondition::Pass => {}
        Precondition::NotModified => return Ok(not_modified(response)),
        Precondition::Failed => return Ok(precondition_failed(response)),
    }

    let mut range = None;
    if let Some(value) = req.header("range").filter(|v| !v.is_empty()) {
        if req.method.is_read() && if_range_passes(req, &response, modified) {
            match parse_range(value, size) {
                Ok(ranges) if ranges.len() == 1 => range = Some(ranges[0]),
                // Multiple ranges are answered with the whole representation.
                Ok(_) => {}
                Err(err) => return Ok(range_not_satisfiable(response, size, err)),
            }
        }
    }

    if !response.headers.contains_key(header::CONTENT_ENCODING) {
        response.set_header(header::ACCEPT_RANGES, "bytes");
    }

    let len = match range {
        Some(ByteRange { start, len }) => {
            response.status = Status::PartialContent;
            response.set_header(
                header::CONTENT_RANGE,
                &format!("bytes {}-{}/{}", start, start + len - 1, size),
            );
            if start > 0 && req.method != Method::Head {
                if let Err(source) = file.seek(SeekFrom::Start(start)).await {
                    return Err(ServeError { response, source });
                }
            }
            len
        }
        None => size,
    };
    response.set_header(header::CONTENT_LENGTH, &len.to_string());

    response.body = match req.method {
        Method::Head => Body::Empty,
        _ => Body::File { file, len },
    };
    Ok(response)
}

fn check_preconditions(
    req: &Request,
    response: &Response,
    modified: Option<SystemTime>,
) -> Precondition {
    let etag = response.header(header::ETAG);

    let mut outcome = check_if_match(req, etag);
    if outcome.is_none() {
        outcome = check_if_unmodified_since(req, modified);
    }
    if outcome == Some(false) {
        return Precondition::Failed;
    }

    match req.header("if-none-match") {
        Some(value) => {
            let matched = value.trim() == "*"
                || etag.is_some_and(|tag| etag::weak_match(tag, value));
            if !matched {
                Precondition::Pass
            } else if req.method.is_read() {
                Precondition::NotModified
            } else {
                Precondition::Failed
            }
        }
        None if check_if_modified_since(req, modified) == Some(false) => Precondition::NotModified,
        None => Precondition::Pass,
    }
}

fn check_if_match(req: &Request, etag: Option<&str>) -> Option<bool> {
    let value = req.header("if-match")?;
    Some(value.trim() == "*" || etag.is_some_and(|tag| etag::strong_match(tag, value)))
}

fn check_if_unmodified_since(req: &Request, modified: Option<SystemTime>) -> Option<bool> {
    let since = parse_http_date(req.header("if-unmodified-since")?).ok()?;
    Some(unix_secs(modified?) <= unix_secs(since))
}

/// `Some(false)` means "not modified".
fn check_if_modified_since(req: &Request, modified: Option<SystemTime>) -> Option<bool> {
    if !req.method.is_read() {
        return None;
    }
    let since = parse_http_date(req.header("if-modified-since")?).ok()?;
    Some(unix_secs(modified?) > unix_secs(since))
}

/// An `If-Range` entity tag must match strongly, so weak tags always fail
/// and the full representation is sent. A date must match exactly.
fn if_range_passes(req: &Request, response: &Response, modified: Option<SystemTime>) -> bool {
    let Some(value) = req.header("if-range") else {
        return true;
    };

    if value.starts_with('"') || value.starts_with("W/") {
        return response.header(header::ETAG)
            .is_some_and(|tag| !etag::is_weak(tag) && !etag::is_weak(value) && tag == value);
    }

    match (modified, parse_http_date(value)) {
        (Some(modified), Ok(date)) => unix_secs(modified) == unix_secs(date),
        _ => false,
    }
}

/// Parses a `Range` header against a representation of `size` bytes.
///
/// Unsatisfiable parts are dropped; if nothing remains the whole header is
/// unsatisfiable. An empty result means "serve everything".
pub(crate) fn parse_range(value: &str, size: u64) -> Result<Vec<ByteRange>, RangeError> {
    let set = value.strip_prefix("bytes=").ok_or(RangeError::Invalid)?;

    let mut ranges = Vec::new();
    let mut no_overlap = false;

    for part in set.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (first, last) = part.split_once('-').ok_or(RangeError::Invalid)?;
        let (first, last) = (first.trim(), last.trim());

        if first.is_empty() {
            // Suffix range: the final `last` bytes.
            if last.is_empty() || last.starts_with('-') {
                return Err(RangeError::Invalid);
            }
            let suffix: u64 = last.parse().map_err(|_| RangeError::Invalid)?;
            let len = suffix.min(size);
            if len == 0 {
                no_overlap = true;
                continue;
            }
            ranges.push(ByteRange { start: size - len, len });
            continue;
        }

        let start: u64 = first.parse().map_err(|_| RangeError::Invalid)?;
        if start >= size {
            no_overlap = true;
            continue;
        }

        let end = if last.is_empty() {
            size - 1
        } else {
            let end: u64 = last.parse().map_err(|_| RangeError::Invalid)?;
            if start > end {
                return Err(RangeError::Invalid);
            }
            end.min(size - 1)
        };
        ranges.push(ByteRange { start, len: end - start + 1 });
    }

    if no_overlap && ranges.is_empty() {
        return Err(RangeError::NoOverlap);
    }

    // Ranges that add up to more than the file are not worth honouring.
    if ranges.iter().map(|r| r.len).sum::<u64>() > size {
        ranges.clear();
    }
    Ok(ranges)
}

fn not_modified(mut response: Response) -> Response {
    response.remove_header(header::CONTENT_TYPE);
    response.remove_header(header::CONTENT_LENGTH);
    response.remove_header(header::CONTENT_ENCODING);
    if response.headers.contains_key(header::ETAG) {
        response.remove_header(header::LAST_MODIFIED);
    }
    response.status = Status::NotModified;
    response.body = Body::Empty;
    response
}

fn precondition_failed(mut response: Response) -> Response {
    response.remove_header(header::CONTENT_TYPE);
    response.remove_header(header::CONTENT_ENCODING);
    response.set_header(header::CONTENT_LENGTH, "0");
    response.status = Status::PreconditionFailed;
    response.body = Body::Empty;
    response
}

fn range_not_satisfiable(mut response: Response, size: u64, err: RangeError) -> Response {
    let message = err.message();
    response.set_header(header::CONTENT_RANGE, &format!("bytes */{size}"));
    response.set_header(header::CONTENT_TYPE, "text/plain; charset=utf-8");
    response.set_header(header::X_CONTENT_TYPE_OPTIONS, "nosniff");
    response.set_header(header::CONTENT_LENGTH, &message.len().to_string());
    response.status = Status::RangeNotSatisfiable;
    response.body = Body::Bytes(Bytes::from_static(message.as_bytes()));
    response
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::time::Duration;

    fn range(start: u64, len: u64) -> ByteRange {
        ByteRange { start, len }
    }

    #[test]
    fn parses_single_ranges() {
        assert_eq!(parse_range("bytes=0-4", 10), Ok(vec![range(0, 5)]));
        assert_eq!(parse_range("bytes=5-", 10), Ok(vec![range(5, 5)]));
        assert_eq!(parse_range("bytes=-3", 10), Ok(vec![range(7, 3)]));
        assert_eq!(parse_range("bytes=8-100", 10), Ok(vec![range(8, 2)]));
        assert_eq!(parse_range("bytes=-100", 10), Ok(vec![range(0, 10)]));
    }

    #[test]
    fn rejects_malformed_ranges() {
        assert_eq!(parse_range("items=0-1", 10), Err(RangeError::Invalid));
        assert_eq!(parse_range("bytes=5-1", 10), Err(RangeError::Invalid));
        assert_eq!(parse_range("bytes=x-1", 10), Err(RangeError::Invalid));
        assert_eq!(parse_range("bytes=3", 10), Err(RangeError::Invalid));
    }

    #[test]
    fn out_of_bounds_ranges_do_not_overlap() {
        assert_eq!(parse_range("bytes=10-", 10), Err(RangeError::NoOverlap));
        assert_eq!(parse_range("bytes=20-30, 0-1", 10), Ok(vec![range(0, 2)]));
    }

    #[test]
    fn oversized_range_sets_are_ignored() {
        assert_eq!(parse_range("bytes=0-9, 0-9", 10), Ok(vec![]));
    }

    async fn fixture(contents: &[u8]) -> (tempfile::NamedTempFile, File) {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut tmp, contents).unwrap();
        let file = File::open(tmp.path()).await.unwrap();
        (tmp, file)
    }

    fn with_etag(tag: &str) -> Response {
        let mut response = Response::new();
        response.set_header(header::CONTENT_TYPE, "text/plain");
        response.set_header(header::ETAG, tag);
        response
    }

    async fn body_of(response: Response) -> Bytes {
        response.into_inner().into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn full_body_by_default() {
        let (_tmp, file) = fixture(b"hello world").await;
        let req = Request::get("/");
        let response = serve_content(&req, with_etag("W/\"a\""), file, 11, None).await.unwrap();

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.header(header::CONTENT_LENGTH), Some("11"));
        assert_eq!(response.header(header::ACCEPT_RANGES), Some("bytes"));
        assert!(response.header(header::LAST_MODIFIED).is_none());
        assert_eq!(&body_of(response).await[..], b"hello world");
    }

    #[tokio::test]
    async fn matching_if_none_match_is_not_modified() {
        let (_tmp, file) = fixture(b"hello").await;
        let req = Request::get("/").with_header("If-None-Match", "W/\"a\"");
        let modified = Some(SystemTime::now());
        let response = serve_content(&req, with_etag("W/\"a\""), file, 5, modified).await.unwrap();

        assert_eq!(response.status(), Status::NotModified);
        assert!(response.header(header::CONTENT_TYPE).is_none());
        assert!(response.header(header::LAST_MODIFIED).is_none());
        assert_eq!(response.header(header::ETAG), Some("W/\"a\""));
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn if_modified_since_needs_a_modification_time() {
        let modified = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let req = Request::get("/").with_header("If-Modified-Since", &fmt_http_date(modified));

        let (_tmp, file) = fixture(b"hello").await;
        let response = serve_content(&req, Response::new(), file, 5, Some(modified)).await.unwrap();
        assert_eq!(response.status(), Status::NotModified);

        let (_tmp, file) = fixture(b"hello").await;
        let response = serve_content(&req, Response::new(), file, 5, None).await.unwrap();
        assert_eq!(response.status(), Status::Ok);
    }

    #[tokio::test]
    async fn single_range_is_partial_content() {
        let (_tmp, file) = fixture(b"0123456789").await;
        let req = Request::get("/").with_header("Range", "bytes=2-5");
        let response = serve_content(&req, Response::new(), file, 10, None).await.unwrap();

        assert_eq!(response.status(), Status::PartialContent);
        assert_eq!(response.header(header::CONTENT_RANGE), Some("bytes 2-5/10"));
        assert_eq!(response.header(header::CONTENT_LENGTH), Some("4"));
        assert_eq!(&body_of(response).await[..], b"2345");
    }

    #[tokio::test]
    async fn unsatisfiable_range_is_416() {
        let (_tmp, file) = fixture(b"0123456789").await;
        let req = Request::get("/").with_header("Range", "bytes=50-");
        let response = serve_content(&req, Response::new(), file, 10, None).await.unwrap();

        assert_eq!(response.status(), Status::RangeNotSatisfiable);
        assert_eq!(response.header(header::CONTENT_RANGE), Some("bytes */10"));
    }

    #[tokio::test]
    async fn weak_if_range_falls_back_to_full_body() {
        let (_tmp, file) = fixture(b"0123456789").await;
        let req = Request::get("/")
            .with_header("Range", "bytes=0-1")
            .with_header("If-Range", "W/\"a\"");
        let response = serve_content(&req, with_etag("W/\"a\""), file, 10, None).await.unwrap();

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(&body_of(response).await[..], b"0123456789");
    }

    #[tokio::test]
    async fn if_match_with_weak_tag_fails() {
        let (_tmp, file) = fixture(b"x").await;
        let req = Request::get("/").with_header("If-Match", "W/\"a\"");
        let response = serve_content(&req, with_etag("W/\"a\""), file, 1, None).await.unwrap();
        assert_eq!(response.status(), Status::PreconditionFailed);
    }

    #[tokio::test]
    async fn head_sends_headers_only() {
        let (_tmp, file) = fixture(b"hello").await;
        let req = Request::head("/");
        let response = serve_content(&req, Response::new(), file, 5, None).await.unwrap();

        assert_eq!(response.header(header::CONTENT_LENGTH), Some("5"));
        assert!(body_of(response).await.is_empty());
    }
}
