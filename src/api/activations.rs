// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Device activation endpoints: the public activation call made by
//! installed clients and the administrative revoke.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde_json::json;

use super::{extract::ApiJson, ActionResponse};
use crate::{
    audit::{AuditAction, AuditEvent},
    auth::AdminOnly,
    error::ApiError,
    lifecycle::{ActivationRequest, ActivationResponse},
    state::AuthorityState,
};

/// Activate a device against a license key.
///
/// A device that is already bound to the license only refreshes its
/// `last_seen_at` and app version; a new device needs free headroom.
/// Calls are rate limited per client address.
#[utoipa::path(
    post,
    path = "/activate",
    tag = "Public",
    request_body = ActivationRequest,
    responses(
        (status = 200, description = "Device activated", body = ActivationResponse),
        (status = 400, description = "License revoked, suspended or expired"),
        (status = 403, description = "Activation of this device was revoked"),
        (status = 404, description = "License key not found"),
        (status = 409, description = "Maximum activations reached"),
        (status = 422, description = "Malformed request body"),
        (status = 429, description = "Too many activation attempts from this address")
    )
)]
pub async fn activate(
    State(state): State<AuthorityState>,
    ApiJson(request): ApiJson<ActivationRequest>,
) -> Result<Json<ActivationResponse>, ApiError> {
    let mut store = state.store.write().await;
    let (license, activation) =
        store.activate(request, state.device_hash_salt.as_deref(), Utc::now())?;

    Ok(Json(ActivationResponse {
        license: license.summary(),
        activation,
        grace_days: state.grace_days,
    }))
}

/// Revoke one activation, freeing one unit of headroom on its license.
#[utoipa::path(
    post,
    path = "/admin/activations/{activation_id}/revoke",
    tag = "Licenses",
    params(("activation_id" = String, Path, description = "Activation ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Activation revoked", body = ActionResponse),
        (status = 404, description = "Activation not found")
    )
)]
pub async fn revoke_activation(
    AdminOnly(admin): AdminOnly,
    State(state): State<AuthorityState>,
    Path(activation_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    let mut store = state.store.write().await;
    if store.revoke_activation(&activation_id, Utc::now())? {
        store.record_audit(
            AuditEvent::new(AuditAction::RevokeActivation, &admin.user_id)
                .with_payload(json!({ "activation_id": activation_id })),
        );
    }

    Ok(Json(ActionResponse::ok("Activation revoked successfully")))
}
