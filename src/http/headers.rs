//! Header filtering in both directions.
//!
//! # Responsibilities
//! - Copy inbound headers to the upstream request, minus `host`
//! - Collapse repeated inbound headers into one comma-joined value
//! - Copy upstream response headers back, minus `content-length`
//! - Overlay the fixed CORS headers on the relayed response
//!
//! # Design Decisions
//! - Comma-joining is lossless for list-valued headers; for anything else it
//!   is an accepted approximation
//! - `content-length` is recomputed by the server side of the proxy, since
//!   re-framing can change the body size on the wire
//! - When the body is dropped (GET/HEAD) the inbound framing headers go with it

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::http::cors;

/// Build the upstream request headers from the inbound ones.
///
/// `bodiless` drops `content-length` and `transfer-encoding`, which would
/// otherwise describe a body that is no longer sent.
pub fn forward_request_headers(inbound: &HeaderMap, bodiless: bool) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(inbound.keys_len());

    for name in inbound.keys() {
        if name == header::HOST {
            continue;
        }
        if bodiless && is_body_framing(name) {
            continue;
        }
        if let Some(value) = join_values(inbound, name) {
            outbound.insert(name.clone(), value);
        }
    }

    outbound
}

/// Build the relayed response headers from the upstream ones.
pub fn relay_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut relayed = HeaderMap::with_capacity(upstream.len() + 3);

    for (name, value) in upstream {
        if name == header::CONTENT_LENGTH {
            continue;
        }
        relayed.append(name.clone(), value.clone());
    }

    cors::apply(&mut relayed);
    relayed
}

fn is_body_framing(name: &HeaderName) -> bool {
    name == header::CONTENT_LENGTH || name == header::TRANSFER_ENCODING
}

fn join_values(headers: &HeaderMap, name: &HeaderName) -> Option<HeaderValue> {
    let mut values = headers.get_all(name).iter();
    let first = values.next()?;
    let Some(second) = values.next() else {
        return Some(first.clone());
    };

    let mut joined = first.as_bytes().to_vec();
    for value in std::iter::once(second).chain(values) {
        joined.extend_from_slice(b", ");
        joined.extend_from_slice(value.as_bytes());
    }

    // Last value wins if the joined form is somehow not a valid value.
    HeaderValue::from_bytes(&joined)
        .ok()
        .or_else(|| headers.get_all(name).iter().last().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_static(value),
            );
        }
        headers
    }

    #[test]
    fn host_never_forwarded() {
        let inbound = map(&[
            ("host", "dashboard.example.com"),
            ("authorization", "Bearer abc"),
            ("x-request-id", "r-1"),
        ]);
        let outbound = forward_request_headers(&inbound, false);

        assert!(outbound.get(header::HOST).is_none());
        assert_eq!(outbound["authorization"], "Bearer abc");
        assert_eq!(outbound["x-request-id"], "r-1");
        assert_eq!(outbound.len(), 2);
    }

    #[test]
    fn duplicates_joined_once() {
        let inbound = map(&[
            ("accept", "application/json"),
            ("x-tag", "a"),
            ("X-Tag", "b"),
            ("x-tag", "c"),
        ]);
        let outbound = forward_request_headers(&inbound, false);

        let tags: Vec<_> = outbound.get_all("x-tag").iter().collect();
        assert_eq!(tags, vec!["a, b, c"]);
        assert_eq!(outbound["accept"], "application/json");
    }

    #[test]
    fn every_non_host_name_present_exactly_once() {
        let inbound = map(&[
            ("host", "proxy.local"),
            ("cookie", "a=1"),
            ("cookie", "b=2"),
            ("content-type", "multipart/form-data; boundary=x"),
            ("content-length", "1234"),
        ]);
        let outbound = forward_request_headers(&inbound, false);

        for name in inbound.keys().filter(|n| *n != header::HOST) {
            assert_eq!(outbound.get_all(name).iter().count(), 1, "{name}");
        }
        assert_eq!(outbound["content-length"], "1234");
    }

    #[test]
    fn bodiless_requests_drop_framing_headers() {
        let inbound = map(&[
            ("content-length", "5"),
            ("transfer-encoding", "chunked"),
            ("accept", "*/*"),
        ]);
        let outbound = forward_request_headers(&inbound, true);

        assert!(outbound.get(header::CONTENT_LENGTH).is_none());
        assert!(outbound.get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(outbound["accept"], "*/*");
    }

    #[test]
    fn response_drops_content_length_and_adds_cors() {
        let upstream = map(&[
            ("content-type", "application/json"),
            ("content-length", "42"),
            ("set-cookie", "a=1"),
            ("set-cookie", "b=2"),
            ("location", "/api/admin/me"),
            ("access-control-allow-origin", "https://upstream.example.com"),
        ]);
        let relayed = relay_response_headers(&upstream);

        assert!(relayed.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(relayed["content-type"], "application/json");
        assert_eq!(relayed["location"], "/api/admin/me");
        assert_eq!(relayed.get_all("set-cookie").iter().count(), 2);
        assert_eq!(relayed["access-control-allow-origin"], "*");
        assert_eq!(relayed["access-control-allow-headers"], "*");
        assert_eq!(relayed["access-control-allow-methods"], cors::ALLOW_METHODS);
    }
}
