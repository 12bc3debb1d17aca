// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Gateway Relay
//!
//! Same-origin entry point for the admin UI. Every request under `/` is
//! authorized by the [`AuthorizationGate`] and then relayed, once, to the
//! license authority:
//!
//! ```text
//! UI --> AdminOnly (gate) --> relay --> license authority
//!                                  <-- status + JSON or text body
//! ```
//!
//! Only `Authorization` is forwarded from the inbound headers. Every
//! response, including denials and transport failures, carries the CORS
//! headers below.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{FromRef, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::api::health::{self, HealthProbe};
use crate::auth::{AdminAuth, AdminOnly, AuthorizationGate, CredentialResolver, TokenVerifier};
use crate::config::GatewayConfig;

pub mod payload;
pub mod upstream;

pub use payload::{RelayOutcome, RelayPayload};
pub use upstream::{upstream_url, RelayRequest, UpstreamClient};

/// Largest request body relayed upstream.
pub const MAX_RELAY_BODY_BYTES: usize = 2 * 1024 * 1024;

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Shared state of the gateway. Immutable after startup.
#[derive(Clone)]
pub struct GatewayState {
    pub resolver: Arc<CredentialResolver>,
    pub gate: AuthorizationGate,
    pub upstream: UpstreamClient,
}

impl GatewayState {
    pub fn new(resolver: CredentialResolver, gate: AuthorizationGate, upstream: UpstreamClient) -> Self {
        Self {
            resolver: Arc::new(resolver),
            gate,
            upstream,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let upstream = UpstreamClient::new(&config.upstream_base, config.upstream_timeout)?;
        let verifier = TokenVerifier::from_settings(&config.auth, reqwest::Client::new());
        let gate = AuthorizationGate::new(config.admins.clone(), config.auth.sign_in_path.clone());
        Ok(Self::new(CredentialResolver::new(verifier), gate, upstream))
    }
}

impl AdminAuth for GatewayState {
    fn resolver(&self) -> &CredentialResolver {
        &self.resolver
    }

    fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }
}

impl FromRef<GatewayState> for HealthProbe {
    fn from_ref(state: &GatewayState) -> Self {
        HealthProbe::new(state.resolver.verifier().jwks().cloned())
    }
}

pub fn router(state: GatewayState) -> Router {
    let relayed: MethodRouter<GatewayState> = get(relay)
        .post(relay)
        .put(relay)
        .delete(relay)
        .options(preflight);

    Router::new()
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/", relayed.clone())
        .route("/{*path}", relayed)
        .with_state(state)
        .layer(middleware::from_fn(cors_headers))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Relay an authorized request to the license authority.
pub async fn relay(
    AdminOnly(identity): AdminOnly,
    State(state): State<GatewayState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> RelayOutcome {
    let body = if matches!(method, Method::POST | Method::PUT) {
        match to_bytes(body, MAX_RELAY_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read request body, relaying it empty");
                Default::default()
            }
        }
    } else {
        Default::default()
    };

    tracing::debug!(user_id = %identity.user_id, %method, path = uri.path(), "Relaying request");

    state
        .upstream
        .forward(RelayRequest {
            method,
            path: uri.path().to_string(),
            query: uri.query().map(String::from),
            authorization: headers.get(header::AUTHORIZATION).cloned(),
            body,
        })
        .await
}

/// CORS pre-flight, answered without going upstream.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn cors_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}
