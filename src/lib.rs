// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authgate - Bearer-Token Authentication Gateway
//!
//! This crate verifies provider-issued JWTs against a remotely published,
//! rotating JWKS and gates every inbound request through an ordered chain
//! of independent checks before it reaches business logic.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers and router (Axum)
//! - `auth` - Token verification (JWKS cache, verifier, middleware)
//! - `gate` - Request-gating middleware (rate limit, origin, sanitize,
//!   headers, audit)
//! - `directory` - External user-directory collaborator interface

pub mod api;
pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod gate;
pub mod state;
