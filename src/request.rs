//! Incoming HTTP request type.
//!
//! The file server never looks at a request body, so a request is just a
//! method, a percent-decoded path and a header list.

use percent_encoding::percent_decode_str;

use crate::method::Method;

/// An incoming HTTP request.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: Vec<(String, String)>,
}

impl Request {
    /// A request for `path`, which must already be percent-decoded.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), headers: Vec::new() }
    }

    pub fn get(path: impl Into<String>) -> Self { Self::new(Method::Get, path) }
    pub fn head(path: impl Into<String>) -> Self { Self::new(Method::Head, path) }

    /// Appends a header. Returns `self` for chaining.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Converts the head of a hyper request. `None` for methods [`Method`]
    /// does not know. Header values that are not visible ASCII are dropped.
    pub(crate) fn from_parts(parts: &http::request::Parts) -> Option<Self> {
        let method = parts.method.as_str().parse().ok()?;
        let path = percent_decode_str(parts.uri.path()).decode_utf8_lossy().into_owned();
        let headers = parts.headers.iter()
            .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
            .collect();
        Some(Self { method, path, headers })
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `true` if the header is present with a non-empty value.
    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some_and(|v| !v.is_empty())
    }
}
