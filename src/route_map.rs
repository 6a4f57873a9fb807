//! Route rule table.
//!
//! Rules are kept in descending lexicographic order of their pattern, so a
//! linear scan meets `/blog/2024/` before `/blog/` before `/`. The first
//! match is therefore the longest matching prefix or the exact match. An
//! implicit `/` rule at the end guarantees every URL resolves to something.

use http::{HeaderName, HeaderValue};

use crate::config::{RouteConfig, ServerConfig};
use crate::error::Error;

#[derive(Debug)]
struct RouteRule {
    pattern: String,
    match_dir: bool,
    config: RouteConfig,
}

impl RouteRule {
    fn matches(&self, url: &str) -> bool {
        if self.match_dir {
            url.starts_with(&self.pattern)
        } else {
            url == self.pattern
        }
    }
}

/// Resolved route configuration, one rule per configured pattern.
#[derive(Debug)]
pub struct RouteMap {
    rules: Vec<RouteRule>,
    fallback: RouteConfig,
}

impl RouteMap {
    /// Resolves every route in `server` into a rule.
    ///
    /// Fails if a pattern does not start with `/`, or if a resolved header
    /// name or value is not valid HTTP.
    pub fn new(server: &ServerConfig) -> Result<Self, Error> {
        let mut patterns: Vec<&String> = server.routes.keys().collect();
        if let Some(bad) = patterns.iter().find(|p| !p.starts_with('/')) {
            return Err(Error::InvalidRoute(bad.to_string()));
        }
        patterns.sort_unstable_by(|a, b| b.cmp(a));

        let mut rules = Vec::with_capacity(patterns.len() + 1);
        for pattern in patterns {
            let config = RouteConfig::resolve(server, server.routes.get(pattern));
            validate_headers(pattern, &config)?;
            rules.push(RouteRule {
                pattern: pattern.clone(),
                match_dir: pattern.ends_with('/'),
                config,
            });
        }

        if !server.routes.contains_key("/") {
            let config = RouteConfig::resolve(server, None);
            validate_headers("/", &config)?;
            rules.push(RouteRule { pattern: "/".to_owned(), match_dir: true, config });
        }

        Ok(Self { rules, fallback: RouteConfig::default() })
    }

    /// Returns the configuration of the first rule matching `url`.
    pub fn config_for(&self, url: &str) -> &RouteConfig {
        self.rules.iter()
            .find(|rule| rule.matches(url))
            .map_or(&self.fallback, |rule| &rule.config)
    }
}

fn validate_headers(route: &str, config: &RouteConfig) -> Result<(), Error> {
    for (name, value) in &config.headers {
        let valid = HeaderName::from_bytes(name.as_bytes()).is_ok()
            && HeaderValue::from_str(value).is_ok();
        if !valid {
            return Err(Error::InvalidHeader { route: route.to_owned(), name: name.clone() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteOverrides;

    fn server_with(routes: &[(&str, RouteOverrides)]) -> ServerConfig {
        ServerConfig {
            routes: routes.iter().map(|(p, o)| (p.to_string(), o.clone())).collect(),
            ..Default::default()
        }
    }

    fn tagged(value: &str) -> RouteOverrides {
        RouteOverrides {
            headers: [("X-Route".to_owned(), value.to_owned())].into(),
            ..Default::default()
        }
    }

    fn tag<'a>(map: &'a RouteMap, url: &str) -> Option<&'a str> {
        map.config_for(url).headers.get("x-route").map(String::as_str)
    }

    #[test]
    fn rejects_patterns_without_leading_slash() {
        let err = RouteMap::new(&server_with(&[("blog/", tagged("blog"))])).unwrap_err();
        assert!(matches!(err, Error::InvalidRoute(p) if p == "blog/"));
    }

    #[test]
    fn rejects_unrepresentable_headers() {
        let route = RouteOverrides {
            headers: [("Bad Header".to_owned(), "x".to_owned())].into(),
            ..Default::default()
        };
        let err = RouteMap::new(&server_with(&[("/a", route)])).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader { .. }));
    }

    #[test]
    fn every_pattern_matches_itself() {
        let map = RouteMap::new(&server_with(&[
            ("/a/", tagged("a-dir")),
            ("/a", tagged("a-exact")),
            ("/b/c", tagged("bc")),
        ])).unwrap();

        assert_eq!(tag(&map, "/a/"), Some("a-dir"));
        assert_eq!(tag(&map, "/a"), Some("a-exact"));
        assert_eq!(tag(&map, "/b/c"), Some("bc"));
    }

    #[test]
    fn longest_prefix_wins() {
        let map = RouteMap::new(&server_with(&[
            ("/a/", tagged("a")),
            ("/a/b/", tagged("ab")),
        ])).unwrap();

        assert_eq!(tag(&map, "/a/b/c"), Some("ab"));
        assert_eq!(tag(&map, "/a/x"), Some("a"));
        assert_eq!(tag(&map, "/other"), None);
    }

    #[test]
    fn exact_rules_do_not_match_by_prefix() {
        let map = RouteMap::new(&server_with(&[("/docs", tagged("docs"))])).unwrap();
        assert_eq!(tag(&map, "/docs"), Some("docs"));
        assert_eq!(tag(&map, "/docs/intro"), None);
    }

    #[test]
    fn implicit_root_carries_server_defaults() {
        let server = ServerConfig {
            headers: [("Cache-Control".to_owned(), "no-cache".to_owned())].into(),
            etag: Some(false),
            ..Default::default()
        };
        let map = RouteMap::new(&server).unwrap();
        let config = map.config_for("/anything/at/all");
        assert!(!config.etag);
        assert_eq!(config.headers["cache-control"], "no-cache");
    }

    #[test]
    fn explicit_root_replaces_implicit_one() {
        let map = RouteMap::new(&server_with(&[("/", tagged("root"))])).unwrap();
        assert_eq!(tag(&map, "/deep/path"), Some("root"));
    }
}
