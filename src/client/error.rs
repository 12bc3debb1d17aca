// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use reqwest::StatusCode;

/// Failure of an administrative API call, as a caller needs to react to it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// No usable session, or the server did not accept the credential.
    #[error("Authentication required")]
    AuthenticationMissing,

    /// The signed-in operator is not an administrator.
    #[error("Access denied. Admin privileges required.")]
    AuthorizationDenied,

    /// The server answered with a non-success status.
    #[error("{detail}")]
    UpstreamRejected { status: u16, detail: String },

    /// The request never got an answer.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// A success response whose body did not have the expected shape.
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ClientError {
    /// Whether the caller should send the operator back to sign in.
    pub fn requires_sign_in(&self) -> bool {
        matches!(
            self,
            ClientError::AuthenticationMissing | ClientError::AuthorizationDenied
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::AuthenticationMissing => Some(401),
            ClientError::AuthorizationDenied => Some(403),
            ClientError::UpstreamRejected { status, .. } => Some(*status),
            ClientError::Transport(_) | ClientError::Decode(_) => None,
        }
    }

    /// Classify a non-success response from its status and raw body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ClientError::AuthenticationMissing,
            StatusCode::FORBIDDEN => ClientError::AuthorizationDenied,
            _ => ClientError::UpstreamRejected {
                status: status.as_u16(),
                detail: detail_of(status, body),
            },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

/// Human-readable message of an error body.
///
/// Prefers a JSON `detail` field, then a bare JSON string, then the raw text.
fn detail_of(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => match map.get("detail") {
            Some(serde_json::Value::String(detail)) => return detail.clone(),
            Some(other) => return other.to_string(),
            None => {}
        },
        Ok(serde_json::Value::String(text)) if !text.is_empty() => return text,
        _ => {}
    }

    if body.trim().is_empty() {
        format!("Request failed with status {}", status.as_u16())
    } else {
        body.trim().to_string()
    }
}
