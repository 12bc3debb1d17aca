// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Operator authentication and authorization for the license control plane.
//!
//! ## Auth Flow
//!
//! 1. The operator signs in with the identity provider
//! 2. Callers send `Authorization: Bearer <JWT>`
//! 3. The server:
//!    - Verifies the JWT (JWKS, shared secret, or development mode)
//!    - Extracts `sub` → `user_id` and `email`
//!    - Runs the [`AuthorizationGate`] against the admin allow-list
//!
//! ## Security
//!
//! - Every `/admin` endpoint requires an allow-listed operator
//! - The allow-list is matched case-insensitively and injected at startup
//! - JWKS is cached with TTL for performance
//! - Clock skew tolerance is 60 seconds

pub mod allow_list;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod identity;
pub mod jwks;
pub mod resolver;

pub use allow_list::AdminAllowList;
pub use error::{AuthError, AuthRejection};
pub use extractor::{bearer_token, AdminAuth, AdminOnly};
pub use gate::{AuthorizationGate, Decision, DenyReason, GateWatch};
pub use identity::{Identity, IdentityClaims};
pub use jwks::JwksManager;
pub use resolver::{CredentialResolver, TokenVerifier};
