//! `Accept-Encoding` negotiation for precompressed variants.

use crate::file_map::FileDetails;

/// A precompressed variant of a file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Encoding {
    Brotli,
    Gzip,
}

impl Encoding {
    /// The `Content-Encoding` token.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Brotli => "br",
            Self::Gzip   => "gzip",
        }
    }

    /// The suffix appended to the base file's name on disk.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Brotli => ".br",
            Self::Gzip   => ".gz",
        }
    }
}

/// What the client said it can decode.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AcceptEncoding {
    pub brotli: bool,
    pub gzip: bool,
}

impl AcceptEncoding {
    /// Parses an `Accept-Encoding` header value.
    ///
    /// Quality values are ignored: brotli always wins over gzip.
    pub fn parse(header: &str) -> Self {
        let mut accepted = Self::default();
        for part in header.split(',') {
            let token = part.split(';').next().unwrap_or("").trim();
            match token {
                "br"   => accepted.brotli = true,
                "gzip" => accepted.gzip = true,
                _      => {}
            }
        }
        accepted
    }

    /// Picks the variant to serve for `details`.
    ///
    /// Range requests always get the original: compressed variants are not
    /// range-addressable.
    pub fn select(self, details: &FileDetails, range_requested: bool) -> Option<Encoding> {
        if range_requested {
            return None;
        }
        if self.brotli && details.has_brotli {
            Some(Encoding::Brotli)
        } else if self.gzip && details.has_gzip {
            Some(Encoding::Gzip)
        } else {
            None
        }
    }
}
