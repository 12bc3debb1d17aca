// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Forwarding of one request to the license authority.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderValue, Method, StatusCode};

use super::payload::{RelayOutcome, RelayPayload};

/// Build the upstream URL for `path` and the raw `query`.
///
/// Empty path segments are dropped; the query is appended verbatim, and only
/// when non-empty.
pub fn upstream_url(base: &str, path: &str, query: Option<&str>) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut url = format!("{}/{}", base.trim_end_matches('/'), segments.join("/"));
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

/// An inbound request, reduced to what is relayed.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    /// Forwarded byte-for-byte when present.
    pub authorization: Option<HeaderValue>,
    /// Sent for POST and PUT only.
    pub body: Bytes,
}

/// HTTP client bound to the license authority's base address.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base: Arc<str>,
}

impl UpstreamClient {
    /// Create a client whose every call is bounded by `timeout`.
    pub fn new(base: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base, http))
    }

    pub fn with_client(base: &str, http: reqwest::Client) -> Self {
        Self {
            http,
            base: Arc::from(base.trim_end_matches('/')),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Relay `request` once, without retries.
    ///
    /// The call runs on its own task: if the caller goes away the upstream
    /// call still completes, and its result is dropped.
    pub async fn forward(&self, request: RelayRequest) -> RelayOutcome {
        let url = upstream_url(&self.base, &request.path, request.query.as_deref());
        let method = request.method.clone();

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(authorization) = request.authorization {
            builder = builder.header(header::AUTHORIZATION, authorization);
        }
        if matches!(request.method, Method::POST | Method::PUT) {
            builder = builder.body(request.body);
        }

        let call = tokio::spawn(async move {
            let response = builder.send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        });

        match call.await {
            Ok(Ok((status, text))) => {
                tracing::debug!(%method, %url, status = status.as_u16(), "Relayed request");
                RelayOutcome::new(reproduce_status(status), RelayPayload::from_text(text))
            }
            Ok(Err(e)) => {
                tracing::error!(%method, %url, error = %e, "Upstream request failed");
                RelayOutcome::transport_failure(e.to_string())
            }
            Err(e) => {
                tracing::error!(%method, %url, error = %e, "Upstream task failed");
                RelayOutcome::transport_failure(format!("Upstream task failed: {e}"))
            }
        }
    }
}

fn reproduce_status(status: reqwest::StatusCode) -> StatusCode {
    StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
