// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Release publishing endpoints and the public update check.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::IntoParams;

use super::{
    extract::{ApiJson, ApiQuery},
    ActionResponse,
};
use crate::{
    audit::{AuditAction, AuditEvent},
    auth::AdminOnly,
    error::ApiError,
    lifecycle::{
        LatestReleaseQuery, LatestReleaseResponse, NewRelease, Platform, Release, ReleaseUpdate,
        ReleaseVersion,
    },
    state::AuthorityState,
};

/// Query string of `GET /admin/releases`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReleaseListQuery {
    /// Only releases of this platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

/// Publish a release. With `is_latest` set it replaces the platform's
/// current latest release.
#[utoipa::path(
    post,
    path = "/admin/releases",
    tag = "Releases",
    request_body = NewRelease,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Release created", body = Release),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_release(
    AdminOnly(admin): AdminOnly,
    State(state): State<AuthorityState>,
    ApiJson(request): ApiJson<NewRelease>,
) -> Result<(StatusCode, Json<Release>), ApiError> {
    let mut store = state.store.write().await;
    let release = store.create_release(request, Utc::now())?;
    store.record_audit(
        AuditEvent::new(AuditAction::CreateRelease, &admin.user_id).with_payload(json!({
            "release_id": release.id,
            "platform": release.platform,
            "version": release.version,
            "is_latest": release.is_latest,
        })),
    );

    Ok((StatusCode::CREATED, Json(release)))
}

/// List releases, newest first.
#[utoipa::path(
    get,
    path = "/admin/releases",
    tag = "Releases",
    params(ReleaseListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Releases", body = Vec<Release>),
        (status = 400, description = "Invalid platform")
    )
)]
pub async fn list_releases(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AuthorityState>,
    ApiQuery(query): ApiQuery<ReleaseListQuery>,
) -> Result<Json<Vec<Release>>, ApiError> {
    let platform = query
        .platform
        .filter(|p| !p.trim().is_empty())
        .map(|p| Platform::parse(&p))
        .transpose()?;
    let store = state.store.read().await;
    Ok(Json(store.list_releases(platform.as_ref())))
}

#[utoipa::path(
    put,
    path = "/admin/releases/{release_id}",
    tag = "Releases",
    params(("release_id" = String, Path, description = "Release ID")),
    request_body = ReleaseUpdate,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated release", body = Release),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Release not found")
    )
)]
pub async fn update_release(
    AdminOnly(admin): AdminOnly,
    State(state): State<AuthorityState>,
    Path(release_id): Path<String>,
    ApiJson(update): ApiJson<ReleaseUpdate>,
) -> Result<Json<Release>, ApiError> {
    let payload = json!({ "release_id": release_id, "changes": update });
    let mut store = state.store.write().await;
    let release = store.update_release(&release_id, update)?;
    store.record_audit(
        AuditEvent::new(AuditAction::UpdateRelease, &admin.user_id).with_payload(payload),
    );

    Ok(Json(release))
}

/// Make a release the only latest one of its platform.
#[utoipa::path(
    post,
    path = "/admin/releases/{release_id}/set-latest",
    tag = "Releases",
    params(("release_id" = String, Path, description = "Release ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Release set as latest", body = ActionResponse),
        (status = 404, description = "Release not found")
    )
)]
pub async fn set_latest_release(
    AdminOnly(admin): AdminOnly,
    State(state): State<AuthorityState>,
    Path(release_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    let mut store = state.store.write().await;
    let release = store.set_latest(&release_id)?;
    store.record_audit(
        AuditEvent::new(AuditAction::SetLatestRelease, &admin.user_id).with_payload(json!({
            "release_id": release.id,
            "platform": release.platform,
        })),
    );

    Ok(Json(ActionResponse::ok("Release set as latest")))
}

/// Update check for installed clients.
#[utoipa::path(
    get,
    path = "/releases/latest",
    tag = "Public",
    params(LatestReleaseQuery),
    responses(
        (status = 200, description = "Update check result", body = LatestReleaseResponse),
        (status = 400, description = "Invalid platform or version")
    )
)]
pub async fn latest_release(
    State(state): State<AuthorityState>,
    ApiQuery(query): ApiQuery<LatestReleaseQuery>,
) -> Result<Json<LatestReleaseResponse>, ApiError> {
    let platform = match query.platform.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(raw) => Platform::parse(raw)?,
        None => Platform::default(),
    };
    let current = ReleaseVersion::parse(query.current_version.as_deref().unwrap_or("0.0.0"))?;

    let store = state.store.read().await;
    Ok(Json(LatestReleaseResponse::evaluate(
        store.latest_release(&platform),
        &current,
    )))
}
