// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::State,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::extract::ApiQuery;
use crate::{
    audit::{AuditEvent, DEFAULT_AUDIT_LIMIT},
    auth::AdminOnly,
    state::AuthorityState,
};

/// Query parameters for audit log queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditQueryParams {
    /// Maximum number of results (default 100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Recent administrative actions, newest first.
#[utoipa::path(
    get,
    path = "/admin/audit-logs",
    tag = "Audit",
    params(AuditQueryParams),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Audit events", body = Vec<AuditEvent>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn list_audit_logs(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AuthorityState>,
    ApiQuery(params): ApiQuery<AuditQueryParams>,
) -> Json<Vec<AuditEvent>> {
    let limit = params.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    let store = state.store.read().await;
    Json(store.audit_events(limit))
}
