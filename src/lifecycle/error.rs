// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::error::ApiError;

/// Domain failures of the license, activation, and release lifecycles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Request failed validation.
    #[error("{0}")]
    Invalid(String),

    /// The license exists but cannot be used right now.
    #[error("{0}")]
    LicenseUnusable(String),

    #[error("This device activation has been revoked")]
    ActivationRevoked,

    #[error("Maximum activations ({0}) reached for this license")]
    ActivationLimitReached(u32),

    #[error("{0}")]
    Conflict(String),

    #[error("Failed to generate license key: {0}")]
    KeyGeneration(String),
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        let message = err.to_string();
        match err {
            LifecycleError::NotFound(_) => ApiError::not_found(message),
            LifecycleError::Invalid(_) | LifecycleError::LicenseUnusable(_) => {
                ApiError::bad_request(message)
            }
            LifecycleError::ActivationRevoked => ApiError::forbidden(message),
            LifecycleError::ActivationLimitReached(_) | LifecycleError::Conflict(_) => {
                ApiError::conflict(message)
            }
            LifecycleError::KeyGeneration(_) => ApiError::internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn maps_to_http_statuses() {
        let cases = [
            (LifecycleError::NotFound("License"), StatusCode::NOT_FOUND),
            (LifecycleError::Invalid("bad".into()), StatusCode::BAD_REQUEST),
            (
                LifecycleError::LicenseUnusable("License is suspended".into()),
                StatusCode::BAD_REQUEST,
            ),
            (LifecycleError::ActivationRevoked, StatusCode::FORBIDDEN),
            (LifecycleError::ActivationLimitReached(2), StatusCode::CONFLICT),
            (LifecycleError::KeyGeneration("rng".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn limit_message_names_the_limit() {
        let api: ApiError = LifecycleError::ActivationLimitReached(3).into();
        assert_eq!(api.message, "Maximum activations (3) reached for this license");

        let api: ApiError = LifecycleError::NotFound("Release").into();
        assert_eq!(api.message, "Release not found");
    }
}
