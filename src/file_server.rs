//! The request-resolution pipeline.
//!
//! [`FileServer::handle`] turns one [`Request`] into one [`Response`]:
//!
//! ```text
//! canonicalize ──► route config ──► file map ──► variant ──► open/stat ──► serve_content
//!      │                                │                        │
//!      └─► 301                          └─► 404 page             └─► 404 / 500 page
//! ```
//!
//! Everything the pipeline reads (routes, file map) is built by
//! [`FileServer::new`] and never changes afterwards, so a `FileServer` can be
//! shared across any number of concurrent requests behind an `Arc`.

use std::any::Any;
use std::future::Future;
use std::io;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Instant;

use futures_util::FutureExt;
use http::{HeaderName, header};
use tokio::fs::File;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::content::{ServeError, serve_content};
use crate::encoding::{AcceptEncoding, Encoding};
use crate::error::Error;
use crate::file_map::{FileDetails, FileMap, NOT_FOUND_PAGE, SERVER_ERROR_PAGE};
use crate::method::Method;
use crate::mime_map::MimeMap;
use crate::path::clean_path;
use crate::request::Request;
use crate::response::{Body, Response};
use crate::route_map::RouteMap;
use crate::status::Status;

const INDEX_PATH: &str = "/index.html";

/// Headers describing the originally requested representation. An error
/// page must not inherit them.
const REPRESENTATION_HEADERS: [HeaderName; 8] = [
    header::ACCEPT_RANGES,
    header::CONTENT_ENCODING,
    header::CONTENT_RANGE,
    header::CACHE_CONTROL,
    header::ETAG,
    header::LAST_MODIFIED,
    header::VARY,
    header::CONTENT_LENGTH,
];

#[derive(Clone, Copy, Debug)]
enum ErrorPage {
    NotFound,
    ServerError,
}

impl ErrorPage {
    fn path(self) -> &'static str {
        match self {
            Self::NotFound    => NOT_FOUND_PAGE,
            Self::ServerError => SERVER_ERROR_PAGE,
        }
    }

    fn status(self) -> Status {
        match self {
            Self::NotFound    => Status::NotFound,
            Self::ServerError => Status::InternalServerError,
        }
    }

    fn fallback_text(self) -> &'static str {
        match self {
            Self::NotFound    => "404 page not found\n",
            Self::ServerError => "500 Internal Server Error\n",
        }
    }
}

/// Serves one directory of pre-built files.
#[derive(Debug)]
pub struct FileServer {
    root: PathBuf,
    routes: RouteMap,
    files: FileMap,
}

impl FileServer {
    /// Resolves `config` and indexes every file under `root`.
    ///
    /// This is the only place the server does blocking work: every file is
    /// read once to compute its ETag. Fails on an invalid route pattern,
    /// header or mimetype extension, or on any unreadable file.
    pub fn new(config: &ServerConfig, root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        let started = Instant::now();

        let routes = RouteMap::new(config)?;
        let mimes = MimeMap::with_defaults().with_overrides(&config.mimetypes)?;
        let files = FileMap::build(&root, &routes, &mimes)?;

        info!(
            root = %root.display(),
            files = files.len(),
            error_pages = files.error_page_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "file map built",
        );

        Ok(Self { root, routes, files })
    }

    pub fn routes(&self) -> &RouteMap { &self.routes }
    pub fn files(&self) -> &FileMap { &self.files }

    /// Answers `req`. Never fails: every problem becomes a status code.
    pub async fn handle(&self, req: &Request) -> Response {
        self.guarded(req, self.resolve(req)).await
    }

    /// Runs `pipeline`, turning a panic into this request's 500 page.
    async fn guarded(&self, req: &Request, pipeline: impl Future<Output = Response>) -> Response {
        match AssertUnwindSafe(pipeline).catch_unwind().await {
            Ok(response) => response,
            Err(panic) => {
                error!(
                    path = %req.path,
                    panic = panic_message(&*panic),
                    "request handler panicked",
                );
                self.serve_error_page(ErrorPage::ServerError, Response::new(), req).await
            }
        }
    }

    async fn resolve(&self, req: &Request) -> Response {
        if !req.method.is_read() {
            return Response::method_not_allowed();
        }

        let url = clean_path(&req.path);
        if url != req.path || url.ends_with(".html") {
            let canonical = url.strip_suffix(".html").unwrap_or(&url);
            return Response::new().redirect(canonical, req.method == Method::Get);
        }

        let config = self.routes.config_for(&url);
        let mut response = Response::new();
        for (name, value) in &config.headers {
            if let Ok(name) = HeaderName::from_bytes(name.as_bytes()) {
                response.set_header(name, value);
            }
        }

        let mut target = match &config.serve {
            Some(serve) => serve.clone(),
            None if url == "/" => INDEX_PATH.to_owned(),
            None => url.clone(),
        };

        let details = match self.files.get(&target) {
            Some(details) => details,
            None => {
                target.push_str(".html");
                match self.files.get(&target) {
                    Some(details) => details,
                    None => return self.serve_error_page(ErrorPage::NotFound, response, req).await,
                }
            }
        };

        if target == INDEX_PATH && url != "/" {
            return response.redirect("/", req.method == Method::Get);
        }

        let encoding = self.negotiate(req, details, &mut response);
        let file_path = self.disk_path(&target, encoding);

        let file = match File::open(&file_path).await {
            Ok(file) => file,
            Err(err) => return self.io_failure(err, &file_path, response, req).await,
        };
        let metadata = match file.metadata().await {
            Ok(metadata) => metadata,
            Err(err) => return self.io_failure(err, &file_path, response, req).await,
        };
        if metadata.is_dir() {
            return self.serve_error_page(ErrorPage::NotFound, response, req).await;
        }

        response.set_header(header::CONTENT_TYPE, &details.content_type);
        response.set_header(header::CONTENT_LENGTH, &metadata.len().to_string());
        if let Some(etag) = &details.etag {
            response.set_header(header::ETAG, etag);
        }
        let modified = if config.lastmod { metadata.modified().ok() } else { None };

        match serve_content(req, response, file, metadata.len(), modified).await {
            Ok(response) => response,
            Err(err) => self.content_failure(err, &file_path, req).await,
        }
    }

    /// Picks a precompressed variant and records the choice on `response`.
    fn negotiate(
        &self,
        req: &Request,
        details: &FileDetails,
        response: &mut Response,
    ) -> Option<Encoding> {
        if !details.has_variants() {
            return None;
        }
        response.append_header(header::VARY, "Accept-Encoding");

        let accepted = AcceptEncoding::parse(req.header("accept-encoding").unwrap_or(""));
        let encoding = accepted.select(details, req.has_header("range"))?;
        response.set_header(header::CONTENT_ENCODING, encoding.as_str());
        Some(encoding)
    }

    fn disk_path(&self, logical: &str, encoding: Option<Encoding>) -> PathBuf {
        let suffix = encoding.map_or("", Encoding::suffix);
        self.root.join(format!("{}{suffix}", logical.trim_start_matches('/')))
    }

    async fn io_failure(
        &self,
        err: io::Error,
        path: &Path,
        response: Response,
        req: &Request,
    ) -> Response {
        if err.kind() == io::ErrorKind::NotFound {
            debug!(path = %path.display(), "indexed file disappeared");
            self.serve_error_page(ErrorPage::NotFound, response, req).await
        } else {
            error!(path = %path.display(), "failed to open file: {err}");
            self.serve_error_page(ErrorPage::ServerError, response, req).await
        }
    }

    async fn content_failure(&self, err: ServeError, path: &Path, req: &Request) -> Response {
        error!(path = %path.display(), "failed to serve file: {}", err.source);
        self.serve_error_page(ErrorPage::ServerError, err.response, req).await
    }

    /// Replaces whatever `response` was going to be with an error page.
    ///
    /// Falls back to a plain-text body when the page is missing or unreadable.
    async fn serve_error_page(
        &self,
        page: ErrorPage,
        mut response: Response,
        req: &Request,
    ) -> Response {
        for name in REPRESENTATION_HEADERS {
            response.remove_header(name);
        }

        let (details, file, len) = match self.open_error_page(page).await {
            Ok(opened) => opened,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    warn!(page = page.path(), "error page unavailable: {err}");
                }
                return response.plain_text(page.status(), page.fallback_text());
            }
        };

        response.set_header(header::CONTENT_TYPE, &details.content_type);
        response.set_header(header::CONTENT_LENGTH, &len.to_string());
        response.status = page.status();
        response.body = match req.method {
            Method::Head => Body::Empty,
            _ => Body::File { file, len },
        };
        response
    }

    async fn open_error_page(&self, page: ErrorPage) -> io::Result<(&FileDetails, File, u64)> {
        let details = self.files.error_page(page.path())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "error page not indexed"))?;

        let file = File::open(self.disk_path(page.path(), None)).await?;
        let metadata = file.metadata().await?;
        if metadata.is_dir() {
            return Err(io::Error::other("expected a file, found a directory"));
        }
        Ok((details, file, metadata.len()))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
