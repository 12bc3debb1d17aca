// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! License administration endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::json;

use super::{
    extract::{ApiJson, ApiQuery},
    ActionResponse,
};
use crate::{
    audit::{AuditAction, AuditEvent},
    auth::AdminOnly,
    error::ApiError,
    lifecycle::{Activation, License, LicenseQuery, LicenseUpdate, NewLicense},
    state::AuthorityState,
};

/// Create a license with a freshly generated key.
#[utoipa::path(
    post,
    path = "/admin/licenses",
    tag = "Licenses",
    request_body = NewLicense,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "License created", body = License),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn create_license(
    AdminOnly(admin): AdminOnly,
    State(state): State<AuthorityState>,
    ApiJson(request): ApiJson<NewLicense>,
) -> Result<(StatusCode, Json<License>), ApiError> {
    let mut store = state.store.write().await;
    let license = store.create_license(request, &state.rng, Utc::now())?;
    store.record_audit(
        AuditEvent::new(AuditAction::CreateLicense, &admin.user_id).with_payload(json!({
            "license_id": license.id,
            "customer_name": license.customer_name,
            "max_activations": license.max_activations,
        })),
    );

    Ok((StatusCode::CREATED, Json(license)))
}

/// List licenses, newest first.
#[utoipa::path(
    get,
    path = "/admin/licenses",
    tag = "Licenses",
    params(LicenseQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Matching licenses", body = Vec<License>),
        (status = 400, description = "Invalid status filter"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn list_licenses(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AuthorityState>,
    ApiQuery(query): ApiQuery<LicenseQuery>,
) -> Result<Json<Vec<License>>, ApiError> {
    let filter = query.into_filter()?;
    let store = state.store.read().await;
    Ok(Json(store.list_licenses(&filter)))
}

#[utoipa::path(
    get,
    path = "/admin/licenses/{license_id}",
    tag = "Licenses",
    params(("license_id" = String, Path, description = "License ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "License", body = License),
        (status = 404, description = "License not found")
    )
)]
pub async fn get_license(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AuthorityState>,
    Path(license_id): Path<String>,
) -> Result<Json<License>, ApiError> {
    let store = state.store.read().await;
    Ok(Json(store.license(&license_id)?))
}

/// Partially update a license. Revoked licenses cannot be reinstated.
#[utoipa::path(
    put,
    path = "/admin/licenses/{license_id}",
    tag = "Licenses",
    params(("license_id" = String, Path, description = "License ID")),
    request_body = LicenseUpdate,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated license", body = License),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "License not found"),
        (status = 409, description = "Status change not allowed")
    )
)]
pub async fn update_license(
    AdminOnly(admin): AdminOnly,
    State(state): State<AuthorityState>,
    Path(license_id): Path<String>,
    ApiJson(update): ApiJson<LicenseUpdate>,
) -> Result<Json<License>, ApiError> {
    let payload = json!({ "license_id": license_id, "changes": update });
    let mut store = state.store.write().await;
    let license = store.update_license(&license_id, update, Utc::now())?;
    store.record_audit(
        AuditEvent::new(AuditAction::UpdateLicense, &admin.user_id).with_payload(payload),
    );

    Ok(Json(license))
}

/// Revoke a license. Revoking an already revoked license succeeds.
#[utoipa::path(
    post,
    path = "/admin/licenses/{license_id}/revoke",
    tag = "Licenses",
    params(("license_id" = String, Path, description = "License ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "License revoked", body = ActionResponse),
        (status = 404, description = "License not found")
    )
)]
pub async fn revoke_license(
    AdminOnly(admin): AdminOnly,
    State(state): State<AuthorityState>,
    Path(license_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    let mut store = state.store.write().await;
    if store.revoke_license(&license_id, Utc::now())? {
        store.record_audit(
            AuditEvent::new(AuditAction::RevokeLicense, &admin.user_id)
                .with_payload(json!({ "license_id": license_id })),
        );
    }

    Ok(Json(ActionResponse::ok("License revoked successfully")))
}

/// Activations of one license, newest first.
#[utoipa::path(
    get,
    path = "/admin/licenses/{license_id}/activations",
    tag = "Licenses",
    params(("license_id" = String, Path, description = "License ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Activations", body = Vec<Activation>),
        (status = 404, description = "License not found")
    )
)]
pub async fn list_license_activations(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AuthorityState>,
    Path(license_id): Path<String>,
) -> Result<Json<Vec<Activation>>, ApiError> {
    let store = state.store.read().await;
    Ok(Json(store.activations_for(&license_id)?))
}
