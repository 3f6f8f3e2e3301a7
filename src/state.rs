// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Application state.
//!
//! The key-set cache and the rate-limit table are the only shared mutable
//! structures in the process. Both are explicitly constructed here and
//! passed by reference through the router state, never reached through
//! ambient singletons, so tests get fresh instances per case.

use std::sync::Arc;

use crate::auth::jwks::{HttpKeySource, KeySetCache, KeySetSource};
use crate::auth::verifier::TokenVerifier;
use crate::config::AppConfig;
use crate::directory::{InMemoryDirectory, UserDirectory};
use crate::gate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub key_cache: Arc<KeySetCache>,
    pub verifier: Arc<TokenVerifier>,
    pub rate_limiter: Arc<RateLimiter>,
    pub directory: Arc<dyn UserDirectory>,
}

impl AppState {
    /// Build state around an explicit key-set source and directory.
    pub fn new(
        config: AppConfig,
        source: Arc<dyn KeySetSource>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        let key_cache = Arc::new(KeySetCache::new(
            source,
            config.jwks_cache_ttl,
            config.jwks_cache_capacity,
        ));
        let verifier = Arc::new(TokenVerifier::new(
            key_cache.clone(),
            config.issuer.clone(),
            config.audience.clone(),
        ));
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limits));

        Self {
            config: Arc::new(config),
            key_cache,
            verifier,
            rate_limiter,
            directory,
        }
    }

    /// Production wiring: HTTP key source, in-memory directory.
    pub fn from_config(config: AppConfig) -> Self {
        let source = Arc::new(HttpKeySource::new(config.jwks_url.clone()));
        Self::new(config, source, Arc::new(InMemoryDirectory::new()))
    }
}
