// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup and passed
//! by reference through [`crate::state::AppState`]. Nothing here is read
//! again after boot.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `AUTH_JWKS_URL` | Provider JWKS endpoint for JWT verification | Required |
//! | `AUTH_ISSUER` | Expected JWT issuer claim | Required |
//! | `AUTH_AUDIENCE` | Expected JWT audience claim | `authenticated` |
//! | `SITE_ORIGIN` | Site origin for same-origin checks | Request `Host` fallback |
//! | `JWKS_CACHE_TTL_SECS` | Signing-key cache TTL | `600` |
//! | `JWKS_CACHE_CAPACITY` | Signing-key cache entry bound | `5` |
//! | `RATE_LIMIT_CALLBACK` | Requests per window on the callback route | `10` |
//! | `RATE_LIMIT_ADMIN` | Requests per window on admin routes | `20` |
//! | `RATE_LIMIT_GENERAL` | Requests per window elsewhere | `60` |
//! | `RATE_LIMIT_WINDOW_SECS` | Rate-limit window length | `60` |
//! | `RATE_LIMIT_MAX_KEYS` | Bound on tracked rate-limit keys | `10000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::env;
use std::num::NonZeroUsize;
use std::time::Duration;

use url::Url;

/// Environment variable name for the provider JWKS endpoint.
pub const JWKS_URL_ENV: &str = "AUTH_JWKS_URL";
/// Environment variable name for the expected issuer claim.
pub const ISSUER_ENV: &str = "AUTH_ISSUER";
/// Environment variable name for the expected audience claim.
pub const AUDIENCE_ENV: &str = "AUTH_AUDIENCE";
/// Environment variable name for the site origin used by the CSRF gate.
pub const SITE_ORIGIN_ENV: &str = "SITE_ORIGIN";

/// Default audience the provider stamps on end-user tokens.
pub const DEFAULT_AUDIENCE: &str = "authenticated";
/// Default signing-key cache TTL (10 minutes).
pub const DEFAULT_JWKS_TTL: Duration = Duration::from_secs(600);
/// Default signing-key cache capacity.
pub const DEFAULT_JWKS_CAPACITY: usize = 5;
/// Default rate-limit window.
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);

/// Per-route-class rate-limit thresholds, all sharing one window length.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    /// Max requests per window on the auth callback route.
    pub callback_limit: u32,
    /// Max requests per window on admin routes.
    pub admin_limit: u32,
    /// Max requests per window on all other routes.
    pub general_limit: u32,
    /// Fixed window length.
    pub window: Duration,
    /// Bound on distinct tracked `(address, agent)` keys.
    pub max_tracked_keys: usize,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            callback_limit: 10,
            admin_limit: 20,
            general_limit: 60,
            window: DEFAULT_RATE_WINDOW,
            max_tracked_keys: 10_000,
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Provider JWKS endpoint.
    pub jwks_url: String,
    /// Expected JWT issuer (exact match).
    pub issuer: String,
    /// Expected JWT audience (exact literal match).
    pub audience: String,
    /// Site origin asserted by the CSRF gate. `None` falls back to the
    /// request's own `Host` header.
    pub site_origin: Option<Url>,
    /// Signing-key cache TTL.
    pub jwks_cache_ttl: Duration,
    /// Signing-key cache entry bound.
    pub jwks_cache_capacity: NonZeroUsize,
    /// Rate-limit thresholds.
    pub rate_limits: RateLimitSettings,
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },
}

impl AppConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwks_url = env::var(JWKS_URL_ENV).map_err(|_| ConfigError::MissingVar(JWKS_URL_ENV))?;
        let issuer = env::var(ISSUER_ENV).map_err(|_| ConfigError::MissingVar(ISSUER_ENV))?;
        let audience = env::var(AUDIENCE_ENV).unwrap_or_else(|_| DEFAULT_AUDIENCE.to_string());

        let site_origin = match env::var(SITE_ORIGIN_ENV) {
            Ok(raw) => Some(Url::parse(&raw).map_err(|e| ConfigError::InvalidVar {
                var: SITE_ORIGIN_ENV,
                reason: e.to_string(),
            })?),
            Err(_) => None,
        };

        let jwks_cache_ttl = duration_var("JWKS_CACHE_TTL_SECS", DEFAULT_JWKS_TTL)?;
        let capacity = usize_var("JWKS_CACHE_CAPACITY", DEFAULT_JWKS_CAPACITY)?;
        let jwks_cache_capacity =
            NonZeroUsize::new(capacity).ok_or(ConfigError::InvalidVar {
                var: "JWKS_CACHE_CAPACITY",
                reason: "must be at least 1".to_string(),
            })?;

        let rate_limits = RateLimitSettings {
            callback_limit: u32_var("RATE_LIMIT_CALLBACK", 10)?,
            admin_limit: u32_var("RATE_LIMIT_ADMIN", 20)?,
            general_limit: u32_var("RATE_LIMIT_GENERAL", 60)?,
            window: duration_var("RATE_LIMIT_WINDOW_SECS", DEFAULT_RATE_WINDOW)?,
            max_tracked_keys: usize_var("RATE_LIMIT_MAX_KEYS", 10_000)?,
        };

        Ok(Self {
            jwks_url,
            issuer,
            audience,
            site_origin,
            jwks_cache_ttl,
            jwks_cache_capacity,
            rate_limits,
        })
    }

    /// The provider's network origin (scheme + host + port), used by the
    /// security-header gate to scope `connect-src`.
    pub fn provider_origin(&self) -> Option<String> {
        let url = Url::parse(&self.jwks_url).ok()?;
        let host = url.host_str()?;
        match url.port() {
            Some(port) => Some(format!("{}://{}:{}", url.scheme(), host, port)),
            None => Some(format!("{}://{}", url.scheme(), host)),
        }
    }

    /// Host component of the configured site origin, if any.
    pub fn site_host(&self) -> Option<&str> {
        self.site_origin.as_ref().and_then(|u| u.host_str())
    }
}

fn duration_var(var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidVar {
                var,
                reason: e.to_string(),
            }),
        Err(_) => Ok(default),
    }
}

fn u32_var(var: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.parse::<u32>().map_err(|e| ConfigError::InvalidVar {
            var,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn usize_var(var: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.parse::<usize>().map_err(|e| ConfigError::InvalidVar {
            var,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
