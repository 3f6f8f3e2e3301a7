// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Verifies provider-issued JWTs for the gateway API.
//!
//! ## Auth Flow
//!
//! 1. Frontend authenticates the user with the identity provider
//! 2. Frontend sends `Authorization: Bearer <JWT>`
//! 3. Gateway:
//!    - Resolves the signing key by `kid` through the cached JWKS
//!    - Verifies signature, expiry, issuer and audience
//!    - Attaches the identity context (`sub`, email, role) to the request
//!
//! ## Security
//!
//! - The signature algorithm allow-list is fixed at RS256
//! - Every token-validation failure is one uniform 401 externally
//! - JWKS entries are TTL-bounded and capacity-bounded
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod roles;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testutil;

pub use claims::VerifiedClaims;
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth};
pub use jwks::KeySetCache;
pub use roles::Role;
pub use verifier::TokenVerifier;
