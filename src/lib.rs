//! # stiff
//!
//! A static-asset HTTP server for sites that are fully built ahead of time.
//!
//! ## The contract
//!
//! Your build step produces a directory. stiff indexes it once at startup and
//! never looks at the directory tree again. Everything a request needs
//! (content type, weak ETag, which precompressed siblings exist) is already
//! in memory; the only request-time I/O is opening and streaming one file.
//!
//! What the build step owns:
//!
//! - **Compression**: write `site.css.br` / `site.css.gz` next to `site.css`
//! - **Error pages**: `404.html` and `500.html` at the root
//! - **Clean URLs**: `about.html` is served at `/about`
//!
//! What stiff owns:
//!
//! - Canonical URLs: `/about/`, `/about.html` and `/index` redirect with `301`
//! - Per-route headers, ETag and Last-Modified policy, rewrites
//! - `Accept-Encoding` negotiation with `Vary`
//! - Conditional requests and single byte ranges
//! - Graceful shutdown on SIGTERM / Ctrl-C
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use stiff::{FileServer, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), stiff::Error> {
//!     let files = FileServer::new(&ServerConfig::default(), "public")?;
//!     Server::bind(SocketAddr::from(([0, 0, 0, 0], 1717))).serve(files).await
//! }
//! ```

mod config;
mod content;
mod encoding;
mod error;
mod file_map;
mod file_server;
mod method;
mod mime_map;
mod path;
mod request;
mod response;
mod route_map;
mod server;
mod status;

pub mod etag;

pub use config::{RouteConfig, RouteOverrides, ServerConfig};
pub use encoding::{AcceptEncoding, Encoding};
pub use error::Error;
pub use file_map::{FileDetails, FileMap};
pub use file_server::FileServer;
pub use method::Method;
pub use mime_map::MimeMap;
pub use path::clean_path;
pub use request::Request;
pub use response::{Body, Response, ResponseBody};
pub use route_map::RouteMap;
pub use server::Server;
pub use status::Status;
