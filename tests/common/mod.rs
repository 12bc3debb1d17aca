// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

#![allow(dead_code)]

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::time::Duration;

use axum::Router;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use license_control_plane::{
    api,
    auth::{AdminAllowList, AuthorizationGate, CredentialResolver, TokenVerifier},
    relay::{self, GatewayState, UpstreamClient},
    state::AuthorityState,
};

pub const ADMIN_EMAIL: &str = "admin@example.com";

/// Unsigned token accepted by the development verifier.
pub fn dev_token(email: &str) -> String {
    let header = r#"{"alg":"HS256","typ":"JWT"}"#;
    let claims = format!(
        r#"{{"sub":"user_{}","email":"{email}","iat":1609459200,"exp":9999999999}}"#,
        email.split('@').next().unwrap_or("anon")
    );
    format!(
        "{}.{}.fake_signature",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(claims)
    )
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });
    format!("http://{addr}")
}

/// Gateway admitting [`ADMIN_EMAIL`] and relaying to `upstream`.
pub fn gateway(upstream: &str) -> Router {
    relay::router(GatewayState::new(
        CredentialResolver::new(TokenVerifier::development()),
        AuthorizationGate::new(AdminAllowList::parse(ADMIN_EMAIL), "/login"),
        UpstreamClient::new(upstream, Duration::from_secs(5)).unwrap(),
    ))
}

/// License authority admitting [`ADMIN_EMAIL`], with an activation budget
/// no single test exhausts.
pub fn authority() -> Router {
    authority_with_activation_limit(1_000)
}

pub fn authority_with_activation_limit(per_minute: u32) -> Router {
    let limit = NonZeroU32::new(per_minute).unwrap();
    api::router(
        AuthorityState::development(AdminAllowList::parse(ADMIN_EMAIL)).with_activation_limit(limit),
    )
}
