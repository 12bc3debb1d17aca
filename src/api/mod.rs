// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP surface of the license authority.
//!
//! `/admin/*` routes require an allow-listed administrator (see
//! [`crate::auth::AdminOnly`]); `/activate`, `/releases/latest` and the
//! health probes are public.

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi, ToSchema,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    audit::{AuditAction, AuditEvent},
    lifecycle::{
        Activation, ActivationRequest, ActivationResponse, ActivationStatus,
        LatestReleaseResponse, License, LicenseStatus, LicenseSummary, LicenseUpdate, NewLicense,
        NewRelease, Release, ReleaseUpdate,
    },
    state::AuthorityState,
};

pub mod activations;
pub mod audit;
pub mod extract;
pub mod health;
pub mod licenses;
pub mod rate_limit;
pub mod releases;

/// Acknowledgement of an action without a resource body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

pub fn router(state: AuthorityState) -> Router {
    let activate = post(activations::activate).route_layer(middleware::from_fn_with_state(
        state.activation_limiter.clone(),
        rate_limit::limit_activations,
    ));

    let admin_routes = Router::new()
        .route(
            "/licenses",
            get(licenses::list_licenses).post(licenses::create_license),
        )
        .route(
            "/licenses/{license_id}",
            get(licenses::get_license).put(licenses::update_license),
        )
        .route(
            "/licenses/{license_id}/revoke",
            post(licenses::revoke_license),
        )
        .route(
            "/licenses/{license_id}/activations",
            get(licenses::list_license_activations),
        )
        .route(
            "/activations/{activation_id}/revoke",
            post(activations::revoke_activation),
        )
        .route(
            "/releases",
            get(releases::list_releases).post(releases::create_release),
        )
        .route("/releases/{release_id}", put(releases::update_release))
        .route(
            "/releases/{release_id}/set-latest",
            post(releases::set_latest_release),
        )
        .route("/audit-logs", get(audit::list_audit_logs));

    Router::new()
        .nest("/admin", admin_routes)
        .route("/activate", activate)
        .route("/releases/latest", get(releases::latest_release))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        licenses::create_license,
        licenses::list_licenses,
        licenses::get_license,
        licenses::update_license,
        licenses::revoke_license,
        licenses::list_license_activations,
        activations::revoke_activation,
        activations::activate,
        releases::create_release,
        releases::list_releases,
        releases::update_release,
        releases::set_latest_release,
        releases::latest_release,
        audit::list_audit_logs,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            License,
            LicenseStatus,
            LicenseSummary,
            NewLicense,
            LicenseUpdate,
            Activation,
            ActivationStatus,
            ActivationRequest,
            ActivationResponse,
            Release,
            NewRelease,
            ReleaseUpdate,
            LatestReleaseResponse,
            AuditEvent,
            AuditAction,
            ActionResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Licenses", description = "License and activation administration"),
        (name = "Releases", description = "Release publishing"),
        (name = "Audit", description = "Administrative audit trail"),
        (name = "Public", description = "Endpoints called by installed clients"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
