//! Outgoing HTTP response type.
//!
//! A [`Response`] is built up in stages by the [`FileServer`](crate::FileServer):
//! route headers first, then representation headers, then a body. Files are
//! never read into memory; the body keeps the open handle and streams exactly
//! `len` bytes from its current position.

use bytes::Bytes;
use futures_util::TryStreamExt;
use http::{HeaderMap, HeaderName, HeaderValue, header};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::Frame;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

use crate::status::Status;

/// Characters escaped when a path is written into a `Location` header.
const LOCATION: &AsciiSet = &CONTROLS
    .add(b' ').add(b'"').add(b'#').add(b'%').add(b'&').add(b'<').add(b'>')
    .add(b'?').add(b'`').add(b'{').add(b'}');

/// The hyper body type every response converts into.
pub type ResponseBody = UnsyncBoxBody<Bytes, std::io::Error>;

/// Response payload.
#[derive(Debug)]
pub enum Body {
    Empty,
    Bytes(Bytes),
    /// `len` bytes of `file`, starting at its current position.
    File { file: tokio::fs::File, len: u64 },
}

/// An outgoing HTTP response.
#[derive(Debug)]
pub struct Response {
    pub(crate) status: Status,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Body,
}

impl Response {
    pub(crate) fn new() -> Self {
        Self { status: Status::Ok, headers: HeaderMap::new(), body: Body::Empty }
    }

    /// Turns this response into a `301 Moved Permanently` to `path`.
    ///
    /// Headers already set are kept. Like most servers, a short HTML body
    /// points at the new location for clients that do not follow redirects;
    /// HEAD requests get no body.
    pub(crate) fn redirect(mut self, path: &str, with_body: bool) -> Self {
        let location = utf8_percent_encode(path, LOCATION).to_string();
        self.status = Status::MovedPermanently;
        self.set_header(header::LOCATION, &location);
        self.body = Body::Empty;
        if with_body {
            self.set_header(header::CONTENT_TYPE, "text/html; charset=utf-8");
            self.body = Body::Bytes(Bytes::from(
                format!("<a href=\"{location}\">Moved Permanently</a>.\n"),
            ));
        }
        self
    }

    /// Turns this response into a short plain-text message with `status`.
    pub(crate) fn plain_text(mut self, status: Status, text: &'static str) -> Self {
        self.status = status;
        self.set_header(header::CONTENT_TYPE, "text/plain; charset=utf-8");
        self.set_header(header::X_CONTENT_TYPE_OPTIONS, "nosniff");
        self.body = Body::Bytes(Bytes::from_static(text.as_bytes()));
        self
    }

    /// `405 Method Not Allowed`; only `GET` and `HEAD` are served.
    pub(crate) fn method_not_allowed() -> Self {
        let mut response = Self::new();
        response.set_header(header::ALLOW, "GET, HEAD");
        response.plain_text(Status::MethodNotAllowed, "405 method not allowed\n")
    }

    pub fn status(&self) -> Status { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &Body { &self.body }

    /// First value of `name`, if it is valid ASCII.
    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Replaces `name`. An empty or unrepresentable value removes it instead.
    pub(crate) fn set_header(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(v) if !v.is_empty() => { self.headers.insert(name, v); }
            _ => { self.headers.remove(name); }
        }
    }

    /// Adds another value for `name`, keeping existing ones.
    pub(crate) fn append_header(&mut self, name: HeaderName, value: &'static str) {
        self.headers.append(name, HeaderValue::from_static(value));
    }

    pub(crate) fn remove_header(&mut self, name: HeaderName) {
        self.headers.remove(name);
    }

    /// Converts into the `http` response hyper writes to the wire.
    pub fn into_inner(self) -> http::Response<ResponseBody> {
        let body: ResponseBody = match self.body {
            Body::Empty => Empty::<Bytes>::new().map_err(|never| match never {}).boxed_unsync(),
            Body::Bytes(bytes) => Full::new(bytes).map_err(|never| match never {}).boxed_unsync(),
            Body::File { file, len } => {
                let frames = ReaderStream::new(file.take(len)).map_ok(Frame::data);
                StreamBody::new(frames).boxed_unsync()
            }
        };

        let mut response = http::Response::new(body);
        *response.status_mut() = self.status.into();
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(response: Response) -> Bytes {
        response.into_inner().into_body().collect().await.unwrap().to_bytes()
    }

    #[test]
    fn empty_values_remove_headers() {
        let mut response = Response::new();
        response.set_header(header::CACHE_CONTROL, "no-cache");
        assert_eq!(response.header(header::CACHE_CONTROL), Some("no-cache"));
        response.set_header(header::CACHE_CONTROL, "");
        assert!(response.header(header::CACHE_CONTROL).is_none());
    }

    #[tokio::test]
    async fn redirect_escapes_location() {
        let response = Response::new().redirect("/hello world", true);
        assert_eq!(response.status(), Status::MovedPermanently);
        assert_eq!(response.header(header::LOCATION), Some("/hello%20world"));
        let body = body_of(response).await;
        assert!(body.starts_with(b"<a href=\"/hello%20world\">"));
    }

    #[tokio::test]
    async fn file_bodies_stream_exactly_len_bytes() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut tmp, b"0123456789").unwrap();
        let file = tokio::fs::File::open(tmp.path()).await.unwrap();

        let mut response = Response::new();
        response.body = Body::File { file, len: 4 };
        assert_eq!(&body_of(response).await[..], b"0123");
    }
}
