//! HTTP method as a typed enum.
//!
//! Covers the RFC 9110 standard methods. A static file server only ever
//! answers `GET` and `HEAD`; everything else gets `405 Method Not Allowed`,
//! and unknown method strings are rejected the same way before they reach
//! the [`FileServer`](crate::FileServer).

use std::fmt;
use std::str::FromStr;

/// A known HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Delete  => "DELETE",
            Self::Get     => "GET",
            Self::Head    => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch   => "PATCH",
            Self::Post    => "POST",
            Self::Put     => "PUT",
            Self::Trace   => "TRACE",
        }
    }

    /// `GET` or `HEAD`, the only methods with a static representation.
    pub fn is_read(self) -> bool {
        matches!(self, Self::Get | Self::Head)
    }
}

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT" => Ok(Self::Connect),
            "DELETE"  => Ok(Self::Delete),
            "GET"     => Ok(Self::Get),
            "HEAD"    => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "PATCH"   => Ok(Self::Patch),
            "POST"    => Ok(Self::Post),
            "PUT"     => Ok(Self::Put),
            "TRACE"   => Ok(Self::Trace),
            _         => Err(()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_get_and_head_are_reads() {
        let reads: Vec<Method> = ["GET", "HEAD", "POST", "OPTIONS"].iter()
            .filter_map(|s| s.parse().ok())
            .filter(|m: &Method| m.is_read())
            .collect();
        assert_eq!(reads, [Method::Get, Method::Head]);
    }

    #[test]
    fn parsing_is_case_sensitive() {
        assert_eq!("get".parse::<Method>(), Err(()));
        assert_eq!("PATCH".parse::<Method>().map(|m| m.to_string()), Ok("PATCH".to_owned()));
    }
}
