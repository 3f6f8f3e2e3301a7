// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{auth::AdminOnly, error::ApiError, state::AppState};

/// Result of a forced key-set refresh.
#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    pub status: String,
}

/// Force a signing-key refresh ahead of the cache TTL, e.g. after the
/// provider rotates keys.
#[utoipa::path(
    post,
    path = "/v1/admin/keys/refresh",
    tag = "Admin",
    responses(
        (status = 200, description = "Key set refreshed", body = RefreshResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 503, description = "Key source unavailable")
    )
)]
pub async fn refresh_keys(
    AdminOnly(_user): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, ApiError> {
    state.key_cache.refresh().await.map_err(|e| {
        tracing::warn!(error = %e, "forced key refresh failed");
        ApiError::unavailable("Key source unavailable")
    })?;

    Ok(Json(RefreshResponse {
        status: "refreshed".to_string(),
    }))
}
