//! The pre-built index of everything the server can answer with.
//!
//! Built once at startup by walking the public directory. Keys are logical
//! paths (`/css/site.css`); precompressed siblings (`site.css.br`,
//! `site.css.gz`) never get keys of their own and instead set flags on their
//! base entry. The reserved error pages land in a separate table so no URL
//! can reach them directly.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::encoding::Encoding;
use crate::error::Error;
use crate::etag;
use crate::mime_map::MimeMap;
use crate::route_map::RouteMap;

pub(crate) const NOT_FOUND_PAGE: &str = "/404.html";
pub(crate) const SERVER_ERROR_PAGE: &str = "/500.html";

/// Everything the request path needs to know about one logical file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileDetails {
    pub content_type: String,
    /// Weak entity tag, `None` when the route disables ETags.
    pub etag: Option<String>,
    pub has_brotli: bool,
    pub has_gzip: bool,
}

impl FileDetails {
    pub fn has_variants(&self) -> bool {
        self.has_brotli || self.has_gzip
    }
}

/// Immutable logical path → [`FileDetails`] index plus the error-page table.
#[derive(Debug, Default)]
pub struct FileMap {
    files: HashMap<String, FileDetails>,
    error_pages: HashMap<String, FileDetails>,
}

impl FileMap {
    /// Walks `root` and indexes every regular file below it.
    ///
    /// Variant detection does not depend on walk order: base files are
    /// indexed first, then every `.br` / `.gz` sibling is folded into its
    /// base entry. Any unreadable file or directory aborts the build.
    pub fn build(root: &Path, routes: &RouteMap, mimes: &MimeMap) -> Result<Self, Error> {
        let mut bases: Vec<(String, PathBuf)> = Vec::new();
        let mut variants: Vec<(String, Encoding)> = Vec::new();

        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                Error::build(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(logical) = logical_path(root, entry.path()) else {
                warn!(path = %entry.path().display(), "skipping file without a UTF-8 path");
                continue;
            };

            if let Some(base) = logical.strip_suffix(Encoding::Brotli.suffix()) {
                variants.push((base.to_owned(), Encoding::Brotli));
            } else if let Some(base) = logical.strip_suffix(Encoding::Gzip.suffix()) {
                variants.push((base.to_owned(), Encoding::Gzip));
            } else {
                bases.push((logical, entry.into_path()));
            }
        }

        let mut map = Self::default();

        for (logical, path) in bases {
            let content_type = mimes.find_type(&extension_of(&logical));

            if logical == NOT_FOUND_PAGE || logical == SERVER_ERROR_PAGE {
                let details = FileDetails {
                    content_type,
                    etag: None,
                    has_brotli: false,
                    has_gzip: false,
                };
                map.error_pages.insert(logical, details);
                continue;
            }

            let route_path = logical.strip_suffix(".html").unwrap_or(&logical);
            let etag = if routes.config_for(route_path).etag {
                Some(etag::compute(&path, &content_type).map_err(|e| Error::build(&path, e))?)
            } else {
                None
            };

            let details = FileDetails { content_type, etag, has_brotli: false, has_gzip: false };
            map.files.insert(logical, details);
        }

        for (base, encoding) in variants {
            match (map.files.get_mut(&base), encoding) {
                (Some(details), Encoding::Brotli) => details.has_brotli = true,
                (Some(details), Encoding::Gzip) => details.has_gzip = true,
                (None, _) => debug!(
                    %base,
                    encoding = encoding.as_str(),
                    "ignoring variant without a base file",
                ),
            }
        }

        Ok(map)
    }

    /// Metadata for a routable logical path.
    pub fn get(&self, path: &str) -> Option<&FileDetails> {
        self.files.get(path)
    }

    /// Metadata for one of the reserved error pages (`/404.html`, `/500.html`).
    pub fn error_page(&self, path: &str) -> Option<&FileDetails> {
        self.error_pages.get(path)
    }

    /// Number of routable logical paths.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn error_page_count(&self) -> usize {
        self.error_pages.len()
    }
}

/// `/`-separated path of `file` relative to `root`, with a leading slash.
fn logical_path(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let mut logical = String::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            logical.push('/');
            logical.push_str(part.to_str()?);
        }
    }
    Some(logical)
}

/// The extension of the last path segment including its dot, or `""`.
fn extension_of(logical: &str) -> String {
    Path::new(logical)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RouteOverrides, ServerConfig};
    use std::fs;

    fn site(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, contents) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        dir
    }

    fn build(dir: &tempfile::TempDir, server: &ServerConfig) -> FileMap {
        let routes = RouteMap::new(server).unwrap();
        FileMap::build(dir.path(), &routes, &MimeMap::with_defaults()).unwrap()
    }

    #[test]
    fn indexes_nested_files_by_logical_path() {
        let dir = site(&[("index.html", "home"), ("css/site.css", "body{}")]);
        let map = build(&dir, &ServerConfig::default());

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("/index.html").unwrap().content_type, "text/html; charset=utf-8");
        assert_eq!(map.get("/css/site.css").unwrap().content_type, "text/css; charset=utf-8");
        assert!(map.get("/css").is_none());
    }

    #[test]
    fn content_type_matches_mime_map() {
        let dir = site(&[("data/feed.xml", "<x/>"), ("bin/blob", "\0")]);
        let map = build(&dir, &ServerConfig::default());
        let mimes = MimeMap::with_defaults();

        assert_eq!(map.get("/data/feed.xml").unwrap().content_type, mimes.find_type(".xml"));
        assert_eq!(map.get("/bin/blob").unwrap().content_type, "application/octet-stream");
    }

    #[test]
    fn variants_fold_into_base_entry() {
        let dir = site(&[
            ("app.js", "let a = 1;"),
            ("app.js.br", "br"),
            ("app.js.gz", "gz"),
            ("style.css", "body{}"),
            ("style.css.gz", "gz"),
        ]);
        let map = build(&dir, &ServerConfig::default());

        let js = map.get("/app.js").unwrap();
        assert!(js.has_brotli && js.has_gzip);
        let css = map.get("/style.css").unwrap();
        assert!(!css.has_brotli && css.has_gzip);
        assert!(map.get("/app.js.br").is_none());
        assert!(map.get("/style.css.gz").is_none());
    }

    #[test]
    fn orphan_variants_are_never_indexed() {
        let dir = site(&[("lonely.txt.br", "br"), ("archive.gz", "gz")]);
        let map = build(&dir, &ServerConfig::default());
        assert!(map.is_empty());
    }

    #[test]
    fn error_pages_are_split_out() {
        let dir = site(&[("404.html", "missing"), ("500.html", "broken"), ("ok.html", "ok")]);
        let map = build(&dir, &ServerConfig::default());

        assert!(map.get("/404.html").is_none());
        assert!(map.get("/500.html").is_none());
        assert_eq!(map.error_page_count(), 2);
        assert_eq!(map.error_page("/404.html").unwrap().content_type, "text/html; charset=utf-8");
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn nested_error_page_names_stay_routable() {
        let dir = site(&[("docs/404.html", "a page about 404s")]);
        let map = build(&dir, &ServerConfig::default());
        assert!(map.get("/docs/404.html").is_some());
        assert_eq!(map.error_page_count(), 0);
    }

    #[test]
    fn etag_policy_follows_clean_url_route() {
        let server = ServerConfig {
            routes: [
                ("/about".to_owned(), RouteOverrides { etag: Some(false), ..Default::default() }),
            ].into(),
            ..Default::default()
        };
        let dir = site(&[("about.html", "about"), ("contact.html", "contact")]);
        let map = build(&dir, &server);

        assert_eq!(map.get("/about.html").unwrap().etag, None);
        let tag = map.get("/contact.html").unwrap().etag.as_deref().unwrap();
        assert!(tag.starts_with("W/\""));
    }

    #[test]
    fn missing_root_is_a_build_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let routes = RouteMap::new(&ServerConfig::default()).unwrap();
        let err = FileMap::build(&missing, &routes, &MimeMap::with_defaults()).unwrap_err();
        assert!(matches!(err, Error::Build { .. }));
    }
}
