// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Same-origin assertion for state-changing requests.
//!
//! This is not a token-based CSRF scheme: for any non-safe method the
//! request must carry an `Origin` or `Referer` header whose host exactly
//! equals the configured site host (falling back to the request's own
//! declared `Host`). Safe methods pass untouched.

use axum::{
    extract::{Request, State},
    http::{
        header::{HOST, ORIGIN, REFERER},
        Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use url::Url;

use crate::error::ApiError;
use crate::state::AppState;

/// Same-origin gate stage.
pub async fn same_origin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if is_safe_method(request.method()) {
        return next.run(request).await;
    }

    let Some(origin_host) = declared_origin_host(&request) else {
        tracing::warn!(path = request.uri().path(), "request without parsable origin");
        return reject();
    };

    let expected = state
        .config
        .site_host()
        .map(str::to_string)
        .or_else(|| request_host(&request));

    match expected {
        Some(host) if host == origin_host => next.run(request).await,
        _ => {
            tracing::warn!(
                origin = %origin_host,
                path = request.uri().path(),
                "cross-origin request rejected"
            );
            reject()
        }
    }
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Host component of the `Origin` header, or of `Referer` when `Origin`
/// is absent. `None` when neither is present or the value cannot parse.
fn declared_origin_host(request: &Request) -> Option<String> {
    let value = request
        .headers()
        .get(ORIGIN)
        .or_else(|| request.headers().get(REFERER))?
        .to_str()
        .ok()?;
    let url = Url::parse(value).ok()?;
    url.host_str().map(str::to_string)
}

/// Host header without any port suffix.
fn request_host(request: &Request) -> Option<String> {
    let host = request.headers().get(HOST)?.to_str().ok()?;
    Some(host.split(':').next().unwrap_or(host).to_string())
}

fn reject() -> Response {
    ApiError::new(StatusCode::FORBIDDEN, "Invalid origin").into_response()
}
