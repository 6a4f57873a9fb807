//! Server configuration and per-route resolution.
//!
//! [`ServerConfig`] is what an operator writes (usually as `stiff.json`).
//! [`RouteConfig`] is what a request actually sees: the server-wide defaults
//! merged with whatever the matching route overrides. Resolution happens once
//! per route at startup; requests only ever read the result.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::path::clean_path;

/// Server-wide configuration, as parsed from the configuration file.
///
/// Every field is optional. `ServerConfig::default()` is the configuration of
/// a server started without a configuration file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Headers added to every response. Empty values are ignored.
    pub headers: BTreeMap<String, String>,
    pub etag: Option<bool>,
    pub lastmod: Option<bool>,
    /// Route pattern → overrides. Patterns ending in `/` match by prefix.
    pub routes: BTreeMap<String, RouteOverrides>,
    /// Extension (with its leading dot) → content type.
    pub mimetypes: BTreeMap<String, String>,
}

/// Overrides for a single route pattern.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RouteOverrides {
    /// An empty value removes a header set at server level.
    pub headers: BTreeMap<String, String>,
    pub etag: Option<bool>,
    pub lastmod: Option<bool>,
    /// Serve this file instead of the one named by the URL.
    pub serve: Option<String>,
}

/// The fully resolved configuration for one route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteConfig {
    /// Header names are lowercased, so overrides match regardless of case.
    pub headers: BTreeMap<String, String>,
    pub etag: bool,
    pub lastmod: bool,
    pub serve: Option<String>,
}

/// ETag on, Last-Modified off, no headers.
impl Default for RouteConfig {
    fn default() -> Self {
        Self { headers: BTreeMap::new(), etag: true, lastmod: false, serve: None }
    }
}

impl RouteConfig {
    /// Merges the built-in defaults, then `server`, then `route`.
    pub fn resolve(server: &ServerConfig, route: Option<&RouteOverrides>) -> Self {
        let mut config = Self::default();

        config.headers.extend(
            server.headers.iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, v)| (k.to_ascii_lowercase(), v.clone())),
        );
        if let Some(etag) = server.etag {
            config.etag = etag;
        }
        if let Some(lastmod) = server.lastmod {
            config.lastmod = lastmod;
        }

        let Some(route) = route else {
            return config;
        };

        for (name, value) in &route.headers {
            let name = name.to_ascii_lowercase();
            if value.is_empty() {
                config.headers.remove(&name);
            } else {
                config.headers.insert(name, value.clone());
            }
        }
        if let Some(etag) = route.etag {
            config.etag = etag;
        }
        if let Some(lastmod) = route.lastmod {
            config.lastmod = lastmod;
        }
        config.serve = route.serve.as_deref()
            .filter(|s| !s.is_empty())
            .map(clean_path);

        config
    }
}
