//! Extension → content-type lookup.

use std::collections::{BTreeMap, HashMap};

use crate::error::Error;

const DEFAULTS: &[(&str, &str)] = &[
    (".css",   "text/css; charset=utf-8"),
    (".htm",   "text/html; charset=utf-8"),
    (".html",  "text/html; charset=utf-8"),
    (".js",    "text/javascript; charset=utf-8"),
    (".mjs",   "text/javascript; charset=utf-8"),
    (".txt",   "text/plain; charset=utf-8"),
    (".gif",   "image/gif"),
    (".jpeg",  "image/jpeg"),
    (".jpg",   "image/jpeg"),
    (".png",   "image/png"),
    (".svg",   "image/svg+xml"),
    (".webp",  "image/webp"),
    (".woff",  "font/woff"),
    (".woff2", "font/woff2"),
    (".json",  "application/json"),
    (".pdf",   "application/pdf"),
    (".xml",   "application/xml"),
    (".zip",   "application/zip"),
];

const OCTET_STREAM: &str = "application/octet-stream";

/// Content types keyed by extension, including the leading dot.
#[derive(Clone, Debug)]
pub struct MimeMap {
    types: HashMap<String, String>,
}

impl MimeMap {
    /// The built-in web defaults.
    pub fn with_defaults() -> Self {
        let types = DEFAULTS.iter()
            .map(|(ext, ty)| ((*ext).to_owned(), (*ty).to_owned()))
            .collect();
        Self { types }
    }

    /// Applies `overrides` on top of the current table.
    ///
    /// Every extension must start with `.`.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Result<Self, Error> {
        for (ext, ty) in overrides {
            if !ext.starts_with('.') {
                return Err(Error::InvalidExtension(ext.clone()));
            }
            self.types.insert(ext.clone(), ty.clone());
        }
        Ok(self)
    }

    /// Looks up `ext` (e.g. `".css"`), falling back to the `mime_guess`
    /// registry and finally to `application/octet-stream`.
    pub fn find_type(&self, ext: &str) -> String {
        if let Some(ty) = self.types.get(ext) {
            return ty.clone();
        }

        ext.strip_prefix('.')
            .and_then(|bare| mime_guess::from_ext(bare).first_raw())
            .unwrap_or(OCTET_STREAM)
            .to_owned()
    }
}

impl Default for MimeMap {
    fn default() -> Self { Self::with_defaults() }
}
