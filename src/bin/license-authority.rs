// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `license-authority`: licenses, device activations and releases.

use license_control_plane::{
    api,
    config::{AuthorityConfig, Env},
    server,
    state::AuthorityState,
    telemetry,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let env = Env::from_process();
    telemetry::init(telemetry::LogFormat::from_env(&env));

    let config = AuthorityConfig::from_env(&env).expect("Invalid authority configuration");
    let state = AuthorityState::from_config(&config, reqwest::Client::new());

    let mode = state.resolver.verifier().mode_name();
    if mode == "development" {
        tracing::warn!("No AUTH_JWKS_URL or AUTH_JWT_SECRET set: token signatures are NOT verified");
    }
    if config.device_hash_salt.is_none() {
        tracing::warn!("DEVICE_HASH_SALT is not set: device hashes are unsalted");
    }
    tracing::info!(
        admins = config.admins.len(),
        grace_days = config.grace_days,
        auth_mode = mode,
        "Starting license authority (docs at /docs)"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(server::shutdown_on_signal(shutdown.clone()));

    server::serve(api::router(state), &config.listen, shutdown)
        .await
        .expect("License authority server failed");
}
