// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::{claims::VerifiedClaims, Auth},
    error::ApiError,
    state::AppState,
};

/// Response to a completed sign-in callback.
#[derive(Debug, Serialize, ToSchema)]
pub struct CallbackResponse {
    /// Canonical subject identifier of the signed-in user.
    pub user_id: String,
    /// Where the frontend should send the user next, when the directory
    /// has an opinion (e.g. first-visit onboarding).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

/// Sign-in callback.
///
/// The provider has already authenticated the user; this endpoint hands
/// the verified `(subject, email)` pair to the user directory for
/// lookup/creation and event logging.
#[utoipa::path(
    post,
    path = "/v1/auth/callback",
    tag = "Session",
    responses(
        (status = 201, description = "Identity recorded", body = CallbackResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Origin mismatch"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn auth_callback(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CallbackResponse>), ApiError> {
    let redirect_to = state
        .directory
        .ensure_user(&user.subject, user.email.as_deref())
        .await
        .map_err(ApiError::internal)?;

    Ok((
        StatusCode::CREATED,
        Json(CallbackResponse {
            user_id: user.subject,
            redirect_to,
        }),
    ))
}

/// Current identity context, as seen by downstream handlers.
#[utoipa::path(
    get,
    path = "/v1/me",
    tag = "Session",
    responses(
        (status = 200, description = "Authenticated identity", body = VerifiedClaims),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn me(Auth(user): Auth) -> Json<VerifiedClaims> {
    Json(user)
}
