//! Path and query translation.
//!
//! # Responsibilities
//! - Decide whether a path falls under the public prefix
//! - Strip the public prefix and prepend the upstream prefix
//! - Join backend base, upstream path and the raw query string
//!
//! # Design Decisions
//! - Prefix matching is segment-aware: `/api/proxy` does not match `/api/proxyx`
//! - The query is appended byte-for-byte, never parsed or re-encoded
//! - A bare prefix hit translates to exactly the upstream prefix

use url::{Position, Url};

/// Maps public paths onto upstream paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTranslator {
    public_prefix: String,
    upstream_prefix: String,
}

impl PathTranslator {
    /// Create a translator. Prefixes are expected without a trailing slash.
    pub fn new(public_prefix: impl Into<String>, upstream_prefix: impl Into<String>) -> Self {
        Self {
            public_prefix: public_prefix.into(),
            upstream_prefix: upstream_prefix.into(),
        }
    }

    /// The part of `path` after the public prefix.
    ///
    /// Returns `Some("")` for a bare prefix hit and `None` when the path is
    /// not under the prefix at all.
    pub fn suffix<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.public_prefix.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    /// Translate an inbound path to the upstream path.
    pub fn translate(&self, path: &str) -> Option<String> {
        self.suffix(path)
            .map(|suffix| format!("{}{}", self.upstream_prefix, suffix))
    }
}

/// Build `<base><upstream_path>?<query>`.
///
/// Any path already on `base` is kept (trailing slash trimmed); its query and
/// fragment are dropped. `query` is `None` when the inbound URL had no `?` at
/// all and `Some("")` when it had an empty one.
pub fn upstream_url(base: &Url, upstream_path: &str, query: Option<&str>) -> String {
    let base = base[..Position::AfterPath].trim_end_matches('/');
    match query {
        Some(q) => format!("{base}{upstream_path}?{q}"),
        None => format!("{base}{upstream_path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator() -> PathTranslator {
        PathTranslator::new("/api/proxy", "/api")
    }

    #[test]
    fn strips_public_and_prepends_upstream() {
        let t = translator();
        assert_eq!(
            t.translate("/api/proxy/drivers/search").as_deref(),
            Some("/api/drivers/search")
        );
        assert_eq!(
            t.translate("/api/proxy/drivers/DRV001/bans/active").as_deref(),
            Some("/api/drivers/DRV001/bans/active")
        );
    }

    #[test]
    fn bare_prefix_maps_to_upstream_prefix() {
        let t = translator();
        assert_eq!(t.suffix("/api/proxy"), Some(""));
        assert_eq!(t.translate("/api/proxy").as_deref(), Some("/api"));
    }

    #[test]
    fn trailing_slash_is_part_of_suffix() {
        assert_eq!(translator().translate("/api/proxy/").as_deref(), Some("/api/"));
    }

    #[test]
    fn rejects_paths_outside_prefix() {
        let t = translator();
        assert_eq!(t.translate("/api/proxyx/drivers"), None);
        assert_eq!(t.translate("/api/whoami"), None);
        assert_eq!(t.translate("/"), None);
    }

    #[test]
    fn empty_upstream_prefix() {
        let t = PathTranslator::new("/proxy", "");
        assert_eq!(t.translate("/proxy/admin/me").as_deref(), Some("/admin/me"));
        assert_eq!(t.translate("/proxy").as_deref(), Some(""));
    }

    #[test]
    fn suffix_applies_once() {
        // Translating with identical prefixes is a fixed point.
        let t = PathTranslator::new("/api", "/api");
        let once = t.translate("/api/drivers").unwrap();
        let twice = t.translate(&once).unwrap();
        assert_eq!(once, "/api/drivers");
        assert_eq!(twice, once);
    }

    #[test]
    fn query_is_copied_verbatim() {
        let base = Url::parse("http://127.0.0.1:5000").unwrap();
        for query in [
            "driver_id=DRV001",
            "a=1&a=2&a=3",
            "name=J%C3%BCrgen%20M&x=%2F%3F",
            "flag&=empty&k=",
            "",
        ] {
            let url = upstream_url(&base, "/api/drivers/search", Some(query));
            let (_, sent) = url.split_once('?').unwrap();
            assert_eq!(sent, query);
        }
    }

    #[test]
    fn no_query_means_no_question_mark() {
        let base = Url::parse("https://incentive.example.com/").unwrap();
        assert_eq!(
            upstream_url(&base, "/api/drivers", None),
            "https://incentive.example.com/api/drivers"
        );
    }

    #[test]
    fn base_path_is_kept_and_base_query_dropped() {
        let base = Url::parse("http://10.0.0.5:8000/v2/?debug=1").unwrap();
        assert_eq!(
            upstream_url(&base, "/api/bans", Some("x=1")),
            "http://10.0.0.5:8000/v2/api/bans?x=1"
        );
    }
}
