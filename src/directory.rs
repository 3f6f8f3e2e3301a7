// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External user-directory collaborator.
//!
//! After a token is verified, the callback endpoint hands the subject id
//! and email to this collaborator for lookup/creation and event logging.
//! Its schema is not defined here; the gateway only depends on this narrow
//! interface and on the optional redirect hint it returns.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Errors surfaced by a directory backend.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory backend unavailable: {0}")]
    Unavailable(String),
}

/// User lookup/creation collaborator.
///
/// Receives the verified `(subject_id, email)` pair. May return a redirect
/// hint for the frontend to follow after sign-in.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn ensure_user(
        &self,
        subject_id: &str,
        email: Option<&str>,
    ) -> Result<Option<String>, DirectoryError>;
}

/// In-memory directory used when no external backend is wired up.
///
/// First sight of a subject redirects to onboarding; returning subjects
/// get no redirect hint.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<String, Option<String>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn ensure_user(
        &self,
        subject_id: &str,
        email: Option<&str>,
    ) -> Result<Option<String>, DirectoryError> {
        let mut users = self.users.write().await;
        if users.contains_key(subject_id) {
            return Ok(None);
        }
        users.insert(subject_id.to_string(), email.map(str::to_string));
        Ok(Some("/onboarding".to_string()))
    }
}
