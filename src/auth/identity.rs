// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and the signed-in operator they describe.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims extracted from an identity provider access token.
///
/// Supabase-style tokens carry the operator's email as a top-level claim;
/// that email is the only attribute the authorization gate looks at.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Operator email
    #[serde(default)]
    pub email: Option<String>,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: i64,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: i64,

    /// Issuer
    #[serde(default)]
    pub iss: Option<String>,

    /// Audience (validated by jsonwebtoken when configured, never read)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,

    /// Provider session ID
    #[serde(default)]
    pub session_id: Option<String>,
}

/// An authenticated operator.
///
/// Lives only as long as the credential it was resolved from; nothing about
/// it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Identity {
    /// Provider user ID (`sub` claim)
    pub user_id: String,

    /// Operator email, if the provider supplied one
    pub email: Option<String>,

    /// Provider session ID (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Credential expiry (Unix seconds, 0 when the token has none)
    #[serde(skip)]
    pub expires_at: i64,

    /// The bearer token this identity was resolved from
    #[serde(skip)]
    pub credential: String,
}

impl Identity {
    /// Build an identity from verified claims and the raw token.
    pub fn from_claims(claims: IdentityClaims, credential: impl Into<String>) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email.filter(|e| !e.trim().is_empty()),
            session_id: claims.session_id,
            expires_at: claims.exp,
            credential: credential.into(),
        }
    }

    /// Whether the underlying credential has expired at `now` (Unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at > 0 && self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }
}
