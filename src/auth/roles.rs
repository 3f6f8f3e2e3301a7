// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Admin` - Full access, including the admin route class
/// - `User` - Baseline role for any authenticated subject
/// - `Service` - Machine-to-machine callers (provider service tokens)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full administrative access
    Admin,
    /// Normal authenticated user
    User,
    /// Service-to-service caller
    Service,
}

impl Role {
    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            // Admin can do anything
            (Role::Admin, _) => true,
            // Service tokens act with user privileges
            (Role::Service, Role::User) | (Role::Service, Role::Service) => true,
            (Role::User, Role::User) => true,
            _ => false,
        }
    }

    /// Parse a role claim (case-insensitive). Unknown values map to `None`
    /// so callers fall back to the baseline role.
    pub fn from_claim(s: &str) -> Option<Role> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "service_role" | "service" => Some(Role::Service),
            "authenticated" | "user" => Some(Role::User),
            _ => None,
        }
    }
}

impl Default for Role {
    /// Default role is User (least privilege for authenticated subjects).
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::User => write!(f, "user"),
            Role::Service => write!(f, "service"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_all_privileges() {
        assert!(Role::Admin.has_privilege(Role::Admin));
        assert!(Role::Admin.has_privilege(Role::User));
        assert!(Role::Admin.has_privilege(Role::Service));
    }

    #[test]
    fn user_only_has_user_privilege() {
        assert!(!Role::User.has_privilege(Role::Admin));
        assert!(Role::User.has_privilege(Role::User));
        assert!(!Role::User.has_privilege(Role::Service));
    }

    #[test]
    fn from_claim_parses_provider_values() {
        assert_eq!(Role::from_claim("admin"), Some(Role::Admin));
        assert_eq!(Role::from_claim("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::from_claim("authenticated"), Some(Role::User));
        assert_eq!(Role::from_claim("service_role"), Some(Role::Service));
        assert_eq!(Role::from_claim("unknown"), None);
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
    }
}
