// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Request Gate
//!
//! An ordered chain of independent middleware stages, each of which may
//! short-circuit with an HTTP-level rejection before the request reaches
//! authentication or business logic:
//!
//! rate limit -> origin check -> input sanitization -> security headers ->
//! audit log
//!
//! The chain order is wired in `crate::api::router`.

pub mod audit;
pub mod headers;
pub mod origin;
pub mod rate_limit;
pub mod sanitize;

use axum::extract::{ConnectInfo, Request};
use axum::http::header::USER_AGENT;
use std::net::SocketAddr;

/// Client network address for rate limiting and auditing.
///
/// Prefers the first `X-Forwarded-For` hop (the gateway normally sits
/// behind a reverse proxy), then the peer address, then `"unknown"`.
pub(crate) fn client_addr(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Client-declared agent string, `"unknown"` when absent.
pub(crate) fn user_agent(request: &Request) -> String {
    request
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    use super::*;

    #[test]
    fn forwarded_for_takes_first_hop() {
        let request = HttpRequest::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_addr(&request), "203.0.113.7");
    }

    #[test]
    fn missing_address_falls_back_to_unknown() {
        let request = HttpRequest::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(client_addr(&request), "unknown");
        assert_eq!(user_agent(&request), "unknown");
    }
}
