//! Content-addressed weak entity tags and their comparison rules.
//!
//! The tag hashes the content type together with the file bytes. The same
//! bytes served under two content types therefore get two tags, while a file
//! and its `.br` / `.gz` siblings (same meaning, different bytes) share one,
//! which is exactly what the `W/` prefix permits.

use std::fs::File;
use std::io;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use sha2::{Digest, Sha512_256};

const HASH_LENGTH: usize = 16;

/// Computes the weak ETag of the file at `path` served as `content_type`.
pub fn compute(path: &Path, content_type: &str) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha512_256::new();
    hasher.update(content_type.as_bytes());
    io::copy(&mut file, &mut hasher)?;

    let checksum = URL_SAFE.encode(hasher.finalize());
    Ok(format!("W/\"{}\"", &checksum[..HASH_LENGTH]))
}

/// Weak comparison against an `If-None-Match` list. `*` matches anything.
pub(crate) fn weak_match(etag: &str, header: &str) -> bool {
    let etag = opaque(etag);
    header.split(',')
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .any(|candidate| candidate == "*" || opaque(candidate) == etag)
}

/// Strong comparison against an `If-Match` list. Weak tags never match.
pub(crate) fn strong_match(etag: &str, header: &str) -> bool {
    header.split(',')
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .any(|candidate| candidate == "*" || (!is_weak(etag) && candidate == etag))
}

pub(crate) fn is_weak(etag: &str) -> bool {
    etag.starts_with("W/")
}

fn opaque(etag: &str) -> &str {
    etag.strip_prefix("W/").unwrap_or(etag)
}
