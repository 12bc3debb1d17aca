// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Admin Client
//!
//! Typed consumer of the administrative API, used by the admin UI (through
//! the gateway) and by tooling. [`AdminClient`] is stateless and takes the
//! bearer credential per call; [`AdminSession`] binds it to a signed-in
//! operator and re-runs the authorization gate before every call.

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::api::ActionResponse;
use crate::audit::AuditEvent;
use crate::lifecycle::{
    Activation, License, LicenseQuery, LicenseUpdate, NewLicense, NewRelease, Release,
    ReleaseUpdate,
};

pub mod debounce;
pub mod error;
pub mod session;

pub use debounce::SearchDebounce;
pub use error::ClientError;
pub use session::AdminSession;

/// HTTP client for the administrative API.
#[derive(Clone)]
pub struct AdminClient {
    http: reqwest::Client,
    base: String,
}

impl AdminClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self::with_client(base, reqwest::Client::new())
    }

    pub fn with_client(base: impl Into<String>, http: reqwest::Client) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self { http, base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base, path))
            .bearer_auth(token)
    }

    /// Send and decode a success body; classify anything else.
    async fn execute<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::from_response(status, &text));
        }
        serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
    }

    // -------------------------------------------------------------------------
    // Licenses
    // -------------------------------------------------------------------------

    pub async fn create_license(
        &self,
        token: &str,
        request: &NewLicense,
    ) -> Result<License, ClientError> {
        Self::execute(self.request(Method::POST, "/admin/licenses", token).json(request)).await
    }

    pub async fn list_licenses(
        &self,
        token: &str,
        query: &LicenseQuery,
    ) -> Result<Vec<License>, ClientError> {
        Self::execute(self.request(Method::GET, "/admin/licenses", token).query(query)).await
    }

    pub async fn get_license(&self, token: &str, id: &str) -> Result<License, ClientError> {
        Self::execute(self.request(Method::GET, &format!("/admin/licenses/{id}"), token)).await
    }

    pub async fn update_license(
        &self,
        token: &str,
        id: &str,
        update: &LicenseUpdate,
    ) -> Result<License, ClientError> {
        let path = format!("/admin/licenses/{id}");
        Self::execute(self.request(Method::PUT, &path, token).json(update)).await
    }

    /// Revoke a license. A conflict means it is already revoked, which is
    /// the requested end state, so it counts as success.
    pub async fn revoke_license(&self, token: &str, id: &str) -> Result<(), ClientError> {
        let path = format!("/admin/licenses/{id}/revoke");
        match Self::execute::<ActionResponse>(self.request(Method::POST, &path, token)).await {
            Ok(_) => Ok(()),
            Err(ClientError::UpstreamRejected { status, .. })
                if status == StatusCode::CONFLICT.as_u16() =>
            {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn list_activations(
        &self,
        token: &str,
        license_id: &str,
    ) -> Result<Vec<Activation>, ClientError> {
        let path = format!("/admin/licenses/{license_id}/activations");
        Self::execute(self.request(Method::GET, &path, token)).await
    }

    pub async fn revoke_activation(&self, token: &str, id: &str) -> Result<(), ClientError> {
        let path = format!("/admin/activations/{id}/revoke");
        Self::execute::<ActionResponse>(self.request(Method::POST, &path, token))
            .await
            .map(|_| ())
    }

    // -------------------------------------------------------------------------
    // Releases
    // -------------------------------------------------------------------------

    pub async fn create_release(
        &self,
        token: &str,
        request: &NewRelease,
    ) -> Result<Release, ClientError> {
        Self::execute(self.request(Method::POST, "/admin/releases", token).json(request)).await
    }

    pub async fn list_releases(
        &self,
        token: &str,
        platform: Option<&str>,
    ) -> Result<Vec<Release>, ClientError> {
        let mut builder = self.request(Method::GET, "/admin/releases", token);
        if let Some(platform) = platform {
            builder = builder.query(&[("platform", platform)]);
        }
        Self::execute(builder).await
    }

    pub async fn update_release(
        &self,
        token: &str,
        id: &str,
        update: &ReleaseUpdate,
    ) -> Result<Release, ClientError> {
        let path = format!("/admin/releases/{id}");
        Self::execute(self.request(Method::PUT, &path, token).json(update)).await
    }

    pub async fn set_latest_release(&self, token: &str, id: &str) -> Result<(), ClientError> {
        let path = format!("/admin/releases/{id}/set-latest");
        Self::execute::<ActionResponse>(self.request(Method::POST, &path, token))
            .await
            .map(|_| ())
    }

    // -------------------------------------------------------------------------
    // Audit
    // -------------------------------------------------------------------------

    pub async fn audit_logs(
        &self,
        token: &str,
        limit: Option<usize>,
    ) -> Result<Vec<AuditEvent>, ClientError> {
        let mut builder = self.request(Method::GET, "/admin/audit-logs", token);
        if let Some(limit) = limit {
            builder = builder.query(&[("limit", limit)]);
        }
        Self::execute(builder).await
    }
}
