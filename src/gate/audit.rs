// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request audit logging.
//!
//! Purely observational: records method, path, client address and agent on
//! entry, and status plus elapsed duration on completion. Emits under the
//! `audit` target so operators can route these events separately from
//! application logs. Never rejects.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// Audit-log gate stage.
pub async fn audit_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client = super::client_addr(&request);
    let agent = super::user_agent(&request);
    let start = Instant::now();

    tracing::info!(
        target: "audit",
        %method,
        %path,
        client = %client,
        agent = %agent,
        "request received"
    );

    let response = next.run(request).await;

    tracing::info!(
        target: "audit",
        %method,
        %path,
        client = %client,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}
