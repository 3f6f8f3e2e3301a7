// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Security
//!
//! - Keys are fetched from the configured provider endpoint only
//! - Each key is cached per `kid` with a TTL and an LRU capacity bound
//! - A stale entry is served only after a re-fetch attempt has failed
//!   (fail-open for availability, logged as degraded)
//!
//! ## Coalescing
//!
//! Concurrent lookups for the same missing key do not each trigger a
//! network fetch. The first caller takes `fetch_lock` and performs one
//! fetch of the full key set; every waiter re-checks the cache after the
//! lock is released and is served from the refreshed entries.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use lru::LruCache;
use tokio::sync::Mutex;

use super::error::AuthError;

/// Timeout for key-set fetches. The fetch is the only blocking operation
/// in the verification path and must never stall unrelated requests.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of the provider's published key set.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    async fn fetch_keys(&self) -> Result<JwkSet, AuthError>;
}

/// HTTP key-set source backed by the provider's JWKS endpoint.
pub struct HttpKeySource {
    url: String,
    client: reqwest::Client,
}

impl HttpKeySource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

#[async_trait]
impl KeySetSource for HttpKeySource {
    async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthError::KeySourceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeySourceUnavailable(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::KeySourceUnavailable(e.to_string()))
    }
}

/// A signing key resolved for verification.
#[derive(Clone, Debug)]
pub struct ResolvedKey {
    pub key: DecodingKey,
    pub algorithm: Algorithm,
}

/// A cached signing key. Immutable once fetched.
struct CachedKey {
    key: DecodingKey,
    algorithm: Algorithm,
    fetched_at: Instant,
}

/// Bounded, TTL-expiring cache of the provider's signing keys, keyed by
/// `kid`. Insertion beyond capacity evicts the least-recently-used entry.
pub struct KeySetCache {
    source: Arc<dyn KeySetSource>,
    ttl: Duration,
    keys: Mutex<LruCache<String, CachedKey>>,
    /// Serializes key-set fetches so concurrent misses coalesce.
    fetch_lock: Mutex<()>,
}

impl KeySetCache {
    pub fn new(source: Arc<dyn KeySetSource>, ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            source,
            ttl,
            keys: Mutex::new(LruCache::new(capacity)),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Resolve the signing key for `kid`.
    ///
    /// Serves the cached entry when fresh; otherwise fetches the full key
    /// set (coalesced across concurrent callers, retried once inline) and
    /// retries the lookup once. A stale entry is served only after the
    /// re-fetch attempt has failed.
    pub async fn resolve(&self, kid: &str) -> Result<ResolvedKey, AuthError> {
        if let Some(resolved) = self.lookup(kid, false).await {
            return Ok(resolved);
        }

        let _fetching = self.fetch_lock.lock().await;

        // Another caller may have refreshed the set while we waited.
        if let Some(resolved) = self.lookup(kid, false).await {
            return Ok(resolved);
        }

        if let Err(fetch_err) = self.refresh_entries().await {
            // Degraded mode: the fetch failed but a re-fetch was attempted,
            // so a previously cached key may still be served.
            if let Some(resolved) = self.lookup(kid, true).await {
                tracing::warn!(%kid, error = %fetch_err, "serving stale signing key after failed key-set fetch");
                return Ok(resolved);
            }
            return Err(fetch_err);
        }

        // The set was just replaced; any entry for this kid is current.
        self.lookup(kid, true)
            .await
            .ok_or(AuthError::NoMatchingKey)
    }

    /// Force a key-set refresh (admin surface and readiness probe).
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let _fetching = self.fetch_lock.lock().await;
        self.refresh_entries().await
    }

    /// Whether any unexpired key is currently cached.
    pub async fn is_cached(&self) -> bool {
        let keys = self.keys.lock().await;
        keys.iter().any(|(_, entry)| entry.fetched_at.elapsed() < self.ttl)
    }

    async fn lookup(&self, kid: &str, allow_stale: bool) -> Option<ResolvedKey> {
        let mut keys = self.keys.lock().await;
        let entry = keys.get(kid)?;
        if !allow_stale && entry.fetched_at.elapsed() >= self.ttl {
            return None;
        }
        Some(ResolvedKey {
            key: entry.key.clone(),
            algorithm: entry.algorithm,
        })
    }

    /// Fetch the full key set (one inline retry) and replace the cache
    /// contents with the published keys. A failed fetch never evicts
    /// servable entries.
    async fn refresh_entries(&self) -> Result<(), AuthError> {
        let jwks = match self.source.fetch_keys().await {
            Ok(jwks) => jwks,
            Err(first) => {
                tracing::debug!(error = %first, "key-set fetch failed, retrying once");
                self.source.fetch_keys().await?
            }
        };

        let fetched_at = Instant::now();
        let mut keys = self.keys.lock().await;
        keys.clear();
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match decode_jwk(jwk) {
                Ok((key, algorithm)) => {
                    keys.put(
                        kid,
                        CachedKey {
                            key,
                            algorithm,
                            fetched_at,
                        },
                    );
                }
                Err(e) => {
                    tracing::debug!(%kid, error = %e, "skipping unusable key in JWKS");
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn cached_len(&self) -> usize {
        self.keys.lock().await.len()
    }
}

/// Convert a published JWK into a decoding key. Only RSA keys are
/// accepted; the verifier's algorithm allow-list is RSA-only.
fn decode_jwk(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e).map_err(|e| {
                AuthError::InternalError(format!("Failed to create RSA key: {e}"))
            })?;

            let algorithm = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS256) | None => Algorithm::RS256,
                Some(other) => {
                    return Err(AuthError::InternalError(format!(
                        "Key algorithm {other:?} not in allow-list"
                    )))
                }
            };

            Ok((key, algorithm))
        }
        _ => Err(AuthError::InternalError(
            "Unsupported key type in JWKS".to_string(),
        )),
    }
}
