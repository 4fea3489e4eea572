//! Liveness endpoint and the JSON 404 for unproxied paths.

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::http::cors;

#[derive(Debug, Serialize)]
pub struct WhoAmI<'a> {
    pub ok: bool,
    pub url: &'a str,
    pub method: &'a str,
}

/// `{"ok":true,"url":<path>,"method":<method>}` on any method.
pub fn whoami(method: &Method, path: &str) -> Response {
    let body = WhoAmI {
        ok: true,
        url: path,
        method: method.as_str(),
    };
    with_cors((StatusCode::OK, Json(body)).into_response())
}

/// `{"error":"Not found"}` for paths outside the public prefix.
pub fn not_found() -> Response {
    with_cors(
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Not found" })),
        )
            .into_response(),
    )
}

fn with_cors(mut response: Response) -> Response {
    cors::apply(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn whoami_echoes_path() {
        let response = whoami(&Method::DELETE, "/api/whoami");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "ok": true, "url": "/api/whoami", "method": "DELETE" })
        );
    }
}
