// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::JwksManager;

/// Dependencies checked by the readiness probe.
///
/// Extracted from the service state with `FromRef`, so the gateway and the
/// authority share these handlers.
#[derive(Clone)]
pub struct HealthProbe {
    jwks: Option<JwksManager>,
}

impl HealthProbe {
    pub fn new(jwks: Option<JwksManager>) -> Self {
        Self { jwks }
    }

    /// Check if JWKS is available (only when JWKS verification is configured).
    async fn check_jwks(&self) -> Option<String> {
        let jwks = self.jwks.as_ref()?;
        if jwks.is_cached().await {
            return Some("ok".to_string());
        }
        match jwks.refresh().await {
            Ok(_) => Some("ok".to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "JWKS unavailable");
                Some("unavailable".to_string())
            }
        }
    }
}

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    pub service: String,
    /// Identity provider keys. Absent unless `AUTH_JWKS_URL` is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<String>,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
///
/// Returns 200 only if all dependencies are available, 503 otherwise.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(State(probe): State<HealthProbe>) -> (StatusCode, Json<ReadyResponse>) {
    let jwks = probe.check_jwks().await;
    let all_ok = jwks.as_deref().is_none_or(|s| s == "ok");

    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            jwks,
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
