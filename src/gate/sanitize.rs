// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Input sanitization.
//!
//! Trims leading and trailing whitespace from string-valued query and JSON
//! body parameters before they reach downstream handlers. Non-string
//! values and non-JSON bodies pass through untouched. This stage rewrites
//! the request in place and never rejects except for an unreadable body.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        uri::PathAndQuery,
        HeaderValue, Method, Uri,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use url::form_urlencoded;

use crate::error::ApiError;

/// Upper bound on buffered bodies; the gateway's own endpoints never
/// carry payloads near it.
const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Sanitization gate stage.
pub async fn sanitize(request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    if let Some(query) = parts.uri.query() {
        let trimmed = trimmed_query(query);
        if trimmed != query {
            if let Some(uri) = rebuild_uri(&parts.uri, &trimmed) {
                parts.uri = uri;
            }
        }
    }

    let has_body = matches!(parts.method, Method::POST | Method::PUT | Method::PATCH);
    let is_json = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);

    let body = if has_body && is_json {
        let bytes = match to_bytes(body, BODY_LIMIT).await {
            Ok(bytes) => bytes,
            Err(_) => return ApiError::bad_request("Unreadable request body").into_response(),
        };
        match sanitized_json(&bytes) {
            Some(rewritten) => {
                if let Ok(len) = HeaderValue::from_str(&rewritten.len().to_string()) {
                    parts.headers.insert(CONTENT_LENGTH, len);
                }
                Body::from(rewritten)
            }
            // Not valid JSON: hand the original bytes to the handler,
            // whose extractor reports the 400.
            None => Body::from(bytes),
        }
    } else {
        body
    };

    next.run(Request::from_parts(parts, body)).await
}

/// Re-encode the query string with every value trimmed.
fn trimmed_query(query: &str) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        serializer.append_pair(&key, value.trim());
    }
    serializer.finish()
}

fn rebuild_uri(uri: &Uri, query: &str) -> Option<Uri> {
    let path = uri.path();
    let combined = if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    };
    let path_and_query: PathAndQuery = combined.parse().ok()?;
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    Uri::from_parts(parts).ok()
}

/// Parse, trim and re-serialize a JSON body. `None` when the bytes are
/// not valid JSON.
fn sanitized_json(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut value: Value = serde_json::from_slice(bytes).ok()?;
    trim_strings(&mut value);
    serde_json::to_vec(&value).ok()
}

/// Trim every string value in place, recursing through objects and arrays.
fn trim_strings(value: &mut Value) {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.len() != s.len() {
                *s = trimmed.to_string();
            }
        }
        Value::Array(items) => {
            for item in items {
                trim_strings(item);
            }
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                trim_strings(item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::Query;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::{get, post};
    use axum::{middleware, Json, Router};
    use std::collections::HashMap;
    use tower::ServiceExt;

    use super::*;

    fn echo_app() -> Router {
        Router::new()
            .route("/echo", post(|Json(value): Json<Value>| async move { Json(value) }))
            .route(
                "/query",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    Json(params)
                }),
            )
            .layer(middleware::from_fn(sanitize))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn trim_strings_recurses_and_leaves_non_strings() {
        let mut value = serde_json::json!({
            "name": "  padded  ",
            "count": 7,
            "flag": true,
            "nested": { "email": " a@b.example " },
            "tags": ["  x", "y  "],
        });
        trim_strings(&mut value);
        assert_eq!(value["name"], "padded");
        assert_eq!(value["count"], 7);
        assert_eq!(value["nested"]["email"], "a@b.example");
        assert_eq!(value["tags"][0], "x");
        assert_eq!(value["tags"][1], "y");
    }

    #[tokio::test]
    async fn json_body_strings_are_trimmed() {
        let request = HttpRequest::post("/echo")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"  padded  ","count":3}"#))
            .unwrap();

        let response = echo_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["name"], "padded");
        assert_eq!(body["count"], 3);
    }

    #[tokio::test]
    async fn query_values_are_trimmed() {
        let request = HttpRequest::get("/query?name=%20%20padded%20%20&other=x")
            .body(Body::empty())
            .unwrap();

        let response = echo_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["name"], "padded");
        assert_eq!(body["other"], "x");
    }

    #[tokio::test]
    async fn invalid_json_passes_through_to_the_handler() {
        let request = HttpRequest::post("/echo")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = echo_app().oneshot(request).await.unwrap();
        // The Json extractor, not the sanitizer, reports the error.
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_json_bodies_are_untouched() {
        let app = Router::new()
            .route(
                "/raw",
                post(|body: String| async move { body }),
            )
            .layer(middleware::from_fn(sanitize));

        let request = HttpRequest::post("/raw")
            .header("content-type", "text/plain")
            .body(Body::from("  keep my spaces  "))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"  keep my spaces  ");
    }
}
