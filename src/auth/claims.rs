// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and the verified identity context.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Raw claims decoded from a provider JWT.
///
/// The provider issues standard OIDC claims plus an `email` /
/// `email_verified` pair and a `role` string. Signature, issuer, audience
/// and expiry are validated by the `jsonwebtoken` crate before these
/// fields are trusted.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderClaims {
    /// Subject (user ID) - the canonical provider identifier, uuid-shaped
    pub sub: String,

    /// Expiration timestamp
    pub exp: i64,

    /// Issuer (the provider base URI)
    pub iss: String,

    /// Audience. String or array of strings; validated by the decoder,
    /// retained here for the identity context.
    #[serde(default)]
    pub aud: Option<serde_json::Value>,

    /// Issued-at timestamp (optional)
    #[serde(default)]
    #[allow(dead_code)]
    pub iat: Option<i64>,

    /// User's email address
    #[serde(default)]
    pub email: Option<String>,

    /// Whether the provider has verified the email
    #[serde(default)]
    pub email_verified: bool,

    /// Role claim (e.g. `authenticated`, `service_role`, `admin`)
    #[serde(default)]
    pub role: Option<String>,
}

impl ProviderClaims {
    /// Audience as a single string: first array element when the claim is
    /// an array, the string itself otherwise.
    fn audience_str(&self) -> Option<String> {
        match &self.aud {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .find_map(|v| v.as_str().map(str::to_string)),
            _ => None,
        }
    }
}

/// Verified identity context attached to the request scope.
///
/// Produced once per successful verification, never mutated, never cached
/// across requests. This is the primary type handlers use to represent the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VerifiedClaims {
    /// Canonical subject identifier (`sub` claim)
    pub subject: String,

    /// User's email, when the provider supplied one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Whether the provider has verified the email
    pub email_verified: bool,

    /// Caller's role (baseline `user` when unclaimed)
    pub role: Role,

    /// Token issuer (not serialized; kept for auditing)
    #[serde(skip)]
    pub issuer: String,

    /// Token audience (not serialized)
    #[serde(skip)]
    pub audience: String,

    /// Token expiry (Unix timestamp, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl VerifiedClaims {
    /// Build the identity context from decoded claims.
    pub fn from_claims(claims: ProviderClaims, expected_audience: &str) -> Self {
        let role = claims
            .role
            .as_deref()
            .and_then(Role::from_claim)
            .unwrap_or_default();

        let audience = claims
            .audience_str()
            .unwrap_or_else(|| expected_audience.to_string());

        Self {
            subject: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified,
            role,
            issuer: claims.iss,
            audience,
            expires_at: claims.exp,
        }
    }

    /// Check if this caller is an admin.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Check if the caller has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }
}
