// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! The taxonomy is precise internally so causes can be logged, but every
//! token-validation failure collapses to one uniform `invalid_token` 401
//! at the HTTP boundary. A caller probing the API cannot tell a bad
//! signature from a wrong audience or an expired token.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("Authorization header is required")]
    MissingAuthHeader,
    /// Invalid authorization header format
    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,
    /// Token is malformed (empty, wrong segment count, undecodable header)
    #[error("Token is malformed")]
    MalformedToken,
    /// Token signature is invalid
    #[error("Token signature is invalid")]
    InvalidSignature,
    /// Token declares an algorithm outside the allow-list
    #[error("Token algorithm is not allowed")]
    DisallowedAlgorithm,
    /// Token has expired
    #[error("Token has expired")]
    TokenExpired,
    /// Token issuer is invalid
    #[error("Token issuer is invalid")]
    InvalidIssuer,
    /// Token audience is invalid
    #[error("Token audience is invalid")]
    InvalidAudience,
    /// Token is not yet valid
    #[error("Token is not yet valid")]
    TokenNotYetValid,
    /// Key-set fetch failed (network error, malformed response)
    #[error("Failed to fetch key set: {0}")]
    KeySourceUnavailable(String),
    /// No matching key in the published key set
    #[error("No matching signing key found")]
    NoMatchingKey,
    /// Caller lacks the required role
    #[error("Insufficient permissions for this operation")]
    InsufficientPermissions,
    /// Unexpected internal fault
    #[error("Internal authentication error: {0}")]
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Whether this is a token-validation failure that must look uniform
    /// to the caller.
    fn is_token_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::MalformedToken
                | AuthError::InvalidSignature
                | AuthError::DisallowedAlgorithm
                | AuthError::TokenExpired
                | AuthError::InvalidIssuer
                | AuthError::InvalidAudience
                | AuthError::TokenNotYetValid
                | AuthError::NoMatchingKey
                | AuthError::KeySourceUnavailable(_)
        )
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader | AuthError::InvalidAuthHeader => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ if self.is_token_rejection() => StatusCode::UNAUTHORIZED,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Externally visible error code. Token rejections are collapsed.
    pub fn public_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "authorization_required",
            AuthError::InvalidAuthHeader => "authorization_required",
            AuthError::InsufficientPermissions => "insufficient_permissions",
            AuthError::InternalError(_) => "internal_error",
            _ => "invalid_token",
        }
    }

    /// Externally visible message. Token rejections are collapsed.
    fn public_message(&self) -> String {
        match self {
            AuthError::MissingAuthHeader | AuthError::InvalidAuthHeader => self.to_string(),
            AuthError::InsufficientPermissions => self.to_string(),
            AuthError::InternalError(_) => "Internal server error".to_string(),
            _ => "Invalid or expired token".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // The precise cause goes to the log, never the wire. No token or
        // key material is ever part of the message.
        match &self {
            AuthError::InternalError(detail) => {
                tracing::error!(%detail, "authentication internal fault");
            }
            e if e.is_token_rejection() => {
                tracing::debug!(cause = %e, "token rejected");
            }
            _ => {}
        }

        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.public_message(),
            error_code: self.public_code().to_string(),
        });
        (status, body).into_response()
    }
}
