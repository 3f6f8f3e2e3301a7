// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token verification.
//!
//! Validates a bearer token's signature, issuer, audience and expiry using
//! a key resolved through the [`KeySetCache`]. Every failure path resolves
//! to a typed [`AuthError`]; nothing is thrown past this boundary, and the
//! HTTP surface collapses all rejections into one uniform 401.

use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, Algorithm, Validation};

use super::claims::{ProviderClaims, VerifiedClaims};
use super::error::AuthError;
use super::jwks::KeySetCache;

/// Fixed signature-algorithm allow-list. A token declaring any other
/// algorithm is rejected before key resolution, which closes the
/// algorithm-confusion hole (e.g. an HS256 token "signed" with the
/// public key bytes).
pub const ALLOWED_ALGORITHMS: &[Algorithm] = &[Algorithm::RS256];

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Verifies provider JWTs against the cached key set.
pub struct TokenVerifier {
    keys: Arc<KeySetCache>,
    issuer: String,
    audience: String,
}

impl TokenVerifier {
    pub fn new(keys: Arc<KeySetCache>, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// Verify a bearer token and produce the identity context.
    ///
    /// The same valid token always yields equal [`VerifiedClaims`];
    /// verification has no side effect on the claims themselves.
    pub async fn verify(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        let token = token.trim();
        if token.is_empty() || token.split('.').count() != 3 {
            return Err(AuthError::MalformedToken);
        }

        // Unverified header parse, for algorithm and key id only.
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
        if !ALLOWED_ALGORITHMS.contains(&header.alg) {
            return Err(AuthError::DisallowedAlgorithm);
        }
        let kid = header.kid.ok_or(AuthError::MalformedToken)?;

        let resolved = self.keys.resolve(&kid).await?;

        let mut validation = Validation::new(resolved.algorithm);
        validation.algorithms = ALLOWED_ALGORITHMS.to_vec();
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = CLOCK_SKEW_LEEWAY;

        let token_data = decode::<ProviderClaims>(token, &resolved.key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                jsonwebtoken::errors::ErrorKind::InvalidAudience => AuthError::InvalidAudience,
                jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => {
                    AuthError::DisallowedAlgorithm
                }
                _ => AuthError::MalformedToken,
            })?;

        Ok(VerifiedClaims::from_claims(token_data.claims, &self.audience))
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::time::Duration;

    use jsonwebtoken::{EncodingKey, Header};

    use super::*;
    use crate::auth::roles::Role;
    use crate::auth::testutil;

    fn test_verifier() -> TokenVerifier {
        let cache = KeySetCache::new(
            Arc::new(testutil::StaticKeySource::default_set()),
            Duration::from_secs(600),
            NonZeroUsize::new(5).unwrap(),
        );
        TokenVerifier::new(Arc::new(cache), testutil::TEST_ISSUER, testutil::TEST_AUDIENCE)
    }

    #[tokio::test]
    async fn valid_token_verifies() {
        let verifier = test_verifier();
        let token = testutil::sign_token(&testutil::valid_claims());

        let user = verifier.verify(&token).await.unwrap();
        assert_eq!(user.subject, "6f9619ff-8b86-d011-b42d-00c04fc964ff");
        assert_eq!(user.email.as_deref(), Some("user@app.example"));
        assert!(user.email_verified);
        assert_eq!(user.role, Role::User);
        assert_eq!(user.issuer, testutil::TEST_ISSUER);
    }

    #[tokio::test]
    async fn verification_is_idempotent() {
        let verifier = test_verifier();
        let token = testutil::sign_token(&testutil::valid_claims());

        let first = verifier.verify(&token).await.unwrap();
        let second = verifier.verify(&token).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_and_malformed_tokens_are_rejected() {
        let verifier = test_verifier();
        for token in ["", "   ", "garbage", "a.b", "a.b.c.d"] {
            let err = verifier.verify(token).await.unwrap_err();
            assert!(matches!(err, AuthError::MalformedToken), "token: {token:?}");
        }
    }

    #[tokio::test]
    async fn wrong_issuer_is_rejected() {
        let verifier = test_verifier();
        let mut claims = testutil::valid_claims();
        claims["iss"] = serde_json::json!("https://evil.example");
        let token = testutil::sign_token(&claims);

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidIssuer));
    }

    #[tokio::test]
    async fn wrong_audience_is_rejected_despite_valid_signature() {
        let verifier = test_verifier();
        let mut claims = testutil::valid_claims();
        claims["aud"] = serde_json::json!("some-other-app");
        let token = testutil::sign_token(&claims);

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidAudience));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let verifier = test_verifier();
        let mut claims = testutil::valid_claims();
        // Well past the 60s leeway.
        claims["exp"] = serde_json::json!(chrono::Utc::now().timestamp() - 600);
        let token = testutil::sign_token(&claims);

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn token_signed_by_unknown_key_is_rejected() {
        let verifier = test_verifier();
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some("rotated-away".to_string());
        let key = EncodingKey::from_rsa_pem(testutil::TEST_RSA_PRIVATE_PEM.as_bytes()).unwrap();
        let token = jsonwebtoken::encode(&header, &testutil::valid_claims(), &key).unwrap();

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::NoMatchingKey));
    }

    #[tokio::test]
    async fn missing_kid_is_rejected() {
        let verifier = test_verifier();
        let header = Header::new(Algorithm::RS256);
        let key = EncodingKey::from_rsa_pem(testutil::TEST_RSA_PRIVATE_PEM.as_bytes()).unwrap();
        let token = jsonwebtoken::encode(&header, &testutil::valid_claims(), &key).unwrap();

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken));
    }

    #[tokio::test]
    async fn hmac_token_is_rejected_by_algorithm_allow_list() {
        let verifier = test_verifier();
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(testutil::TEST_KID.to_string());
        let key = EncodingKey::from_secret(b"attacker-chosen-secret");
        let token = jsonwebtoken::encode(&header, &testutil::valid_claims(), &key).unwrap();

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::DisallowedAlgorithm));
    }
}
