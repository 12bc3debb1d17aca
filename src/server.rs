// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Listener plumbing shared by both binaries.
//!
//! Plain HTTP through `axum::serve`, or HTTPS through `axum-server` when a
//! certificate and key are configured. Both stop accepting connections once
//! the shutdown token is cancelled and drain in-flight requests. Handlers
//! can read the peer address through `ConnectInfo<SocketAddr>`.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;

use crate::config::{ListenConfig, TlsPaths};

/// Upper bound on draining in-flight requests under TLS.
pub const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Install the ring provider for rustls.
///
/// Must run before any TLS configuration is built. Installing twice is
/// harmless; the first provider wins.
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }
}

/// Serve `app` until `shutdown` is cancelled.
pub async fn serve(app: Router, listen: &ListenConfig, shutdown: CancellationToken) -> io::Result<()> {
    match &listen.tls {
        Some(tls) => serve_tls(app, listen, tls, shutdown).await,
        None => {
            let listener = tokio::net::TcpListener::bind(listen.addr).await?;
            tracing::info!(addr = %listen.addr, "Listening on http://{}", listen.addr);
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move {
                    shutdown.cancelled().await;
                    tracing::info!("HTTP server shutting down gracefully");
                })
                .await
        }
    }
}

async fn serve_tls(
    app: Router,
    listen: &ListenConfig,
    tls: &TlsPaths,
    shutdown: CancellationToken,
) -> io::Result<()> {
    install_crypto_provider();
    let config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;

    let handle = Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            shutdown.cancelled().await;
            tracing::info!("HTTPS server shutting down gracefully");
            handle.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        }
    });

    tracing::info!(addr = %listen.addr, "Listening on https://{}", listen.addr);
    axum_server::bind_rustls(listen.addr, config)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
}

/// Cancel `token` on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
    token.cancel();
}
