// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `license-gateway`: admin-only relay in front of the license authority.

use license_control_plane::{
    config::{Env, GatewayConfig},
    relay::{self, GatewayState},
    server, telemetry,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let env = Env::from_process();
    telemetry::init(telemetry::LogFormat::from_env(&env));

    let config = GatewayConfig::from_env(&env).expect("Invalid gateway configuration");
    let state = GatewayState::from_config(&config).expect("Failed to build upstream HTTP client");

    let mode = state.resolver.verifier().mode_name();
    if mode == "development" {
        tracing::warn!("No AUTH_JWKS_URL or AUTH_JWT_SECRET set: token signatures are NOT verified");
    }
    if config.admins.is_empty() {
        tracing::warn!("ADMIN_EMAILS is empty: every request will be denied");
    }
    tracing::info!(
        upstream = %config.upstream_base,
        timeout_secs = config.upstream_timeout.as_secs(),
        admins = config.admins.len(),
        auth_mode = mode,
        "Starting license gateway"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(server::shutdown_on_signal(shutdown.clone()));

    server::serve(relay::router(state), &config.listen, shutdown)
        .await
        .expect("Gateway server failed");
}
