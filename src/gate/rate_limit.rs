// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-window rate limiting.
//!
//! Counters are keyed by `(client address, agent string, route class)` and
//! reset at discrete window boundaries. A fixed window can admit up to 2x
//! the limit across a window edge; that limitation is accepted here in
//! favor of cheap, atomic counter semantics.
//!
//! The table is bounded: when it outgrows `max_tracked_keys`, entries
//! whose window has elapsed are swept first, then the oldest windows are
//! evicted until the bound holds.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::RateLimitSettings;
use crate::error::ApiError;
use crate::state::AppState;

/// Route classes with distinct limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    /// The auth callback endpoint (tightest limit).
    Callback,
    /// Administrative routes.
    Admin,
    /// Everything else.
    General,
}

impl RouteClass {
    pub fn classify(path: &str) -> Self {
        if path.starts_with("/v1/auth/callback") {
            RouteClass::Callback
        } else if path.starts_with("/v1/admin") {
            RouteClass::Admin
        } else {
            RouteClass::General
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CounterKey {
    addr: String,
    agent: String,
    class: RouteClass,
}

struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Shared fixed-window limiter.
///
/// One mutex guards the whole table; increment-and-compare happens inside
/// a single critical section, so two racing requests in the same window
/// can never both slip past the boundary check.
pub struct RateLimiter {
    settings: RateLimitSettings,
    entries: Mutex<HashMap<CounterKey, WindowEntry>>,
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            settings,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn limit_for(&self, class: RouteClass) -> u32 {
        match class {
            RouteClass::Callback => self.settings.callback_limit,
            RouteClass::Admin => self.settings.admin_limit,
            RouteClass::General => self.settings.general_limit,
        }
    }

    /// Count one request. `Err` carries the retry-after hint in seconds,
    /// computed from the window's reset time.
    pub fn check(&self, addr: &str, agent: &str, class: RouteClass) -> Result<(), u64> {
        let now = Instant::now();
        let limit = self.limit_for(class);
        let window = self.settings.window;

        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let key = CounterKey {
            addr: addr.to_string(),
            agent: agent.to_string(),
            class,
        };

        if !entries.contains_key(&key) && entries.len() >= self.settings.max_tracked_keys {
            Self::evict(&mut entries, self.settings, now);
        }

        let entry = entries.entry(key).or_insert(WindowEntry {
            count: 0,
            window_start: now,
        });

        // Window boundaries are simple reset points, not decayed.
        if now.duration_since(entry.window_start) >= window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        if entry.count > limit {
            let elapsed = now.duration_since(entry.window_start);
            let retry_after = window.saturating_sub(elapsed).as_secs().max(1);
            return Err(retry_after);
        }
        Ok(())
    }

    /// Sweep elapsed windows; if the table is still over its bound, evict
    /// the oldest windows first.
    fn evict(
        entries: &mut HashMap<CounterKey, WindowEntry>,
        settings: RateLimitSettings,
        now: Instant,
    ) {
        entries.retain(|_, entry| now.duration_since(entry.window_start) < settings.window);

        if entries.len() >= settings.max_tracked_keys {
            let mut by_age: Vec<(CounterKey, Instant)> = entries
                .iter()
                .map(|(key, entry)| (key.clone(), entry.window_start))
                .collect();
            by_age.sort_by_key(|(_, start)| *start);

            let excess = entries.len() + 1 - settings.max_tracked_keys;
            for (key, _) in by_age.into_iter().take(excess) {
                entries.remove(&key);
            }
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }
}

/// Rate-limit gate stage.
pub async fn enforce(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let class = RouteClass::classify(request.uri().path());
    let addr = super::client_addr(&request);
    let agent = super::user_agent(&request);

    match state.rate_limiter.check(&addr, &agent, class) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(client = %addr, path = request.uri().path(), "rate limit exceeded");
            let mut response =
                ApiError::new(StatusCode::TOO_MANY_REQUESTS, "Too many requests").into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
    }
}
