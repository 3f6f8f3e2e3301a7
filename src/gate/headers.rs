// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Security response headers.
//!
//! Unconditionally attaches a fixed header set to every response: frame
//! embedding denied, content-type sniffing denied, a conservative referrer
//! policy, and a content-security-policy that allow-lists the identity
//! provider's origin for outbound connections. This stage never rejects.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// Security-header gate stage.
pub async fn security_headers(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    let csp = match state.config.provider_origin() {
        Some(origin) => format!(
            "default-src 'self'; connect-src 'self' {origin}; frame-ancestors 'none'"
        ),
        None => "default-src 'self'; frame-ancestors 'none'".to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&csp) {
        headers.insert(header::CONTENT_SECURITY_POLICY, value);
    }

    response
}
