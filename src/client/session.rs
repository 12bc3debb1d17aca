// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! A signed-in operator's view of the administrative API.

use std::sync::Arc;

use crate::audit::AuditEvent;
use crate::auth::{AuthError, AuthorizationGate, CredentialResolver, Decision, DenyReason, GateWatch, Identity};
use crate::lifecycle::{
    Activation, License, LicenseQuery, LicenseUpdate, NewLicense, NewRelease, Release,
    ReleaseUpdate,
};

use super::{AdminClient, ClientError};

/// Admin client bound to a session.
///
/// The gate is evaluated again before every call, so a sign-out or an
/// expired credential stops the next call before it leaves the process.
#[derive(Clone)]
pub struct AdminSession {
    resolver: Arc<CredentialResolver>,
    gate: AuthorizationGate,
    client: AdminClient,
}

impl AdminSession {
    pub fn new(resolver: Arc<CredentialResolver>, gate: AuthorizationGate, client: AdminClient) -> Self {
        Self {
            resolver,
            gate,
            client,
        }
    }

    pub async fn sign_in(&self, token: &str) -> Result<Identity, AuthError> {
        self.resolver.sign_in(token).await
    }

    pub fn sign_out(&self) {
        self.resolver.sign_out();
    }

    pub fn identity(&self) -> Option<Identity> {
        self.resolver.current_identity()
    }

    /// Where to send the operator when a call fails with
    /// [`ClientError::requires_sign_in`].
    pub fn sign_in_path(&self) -> &str {
        self.gate.sign_in_path()
    }

    /// Follow gate decisions as the session's identity changes.
    pub fn watch(&self) -> GateWatch {
        self.gate.watch(self.resolver.subscribe())
    }

    /// The credential to send, if the gate currently allows this session.
    pub fn authorize(&self) -> Result<String, ClientError> {
        let identity = self.resolver.current_identity();
        match self.gate.authorize(identity.as_ref()) {
            Decision::Allow => identity
                .map(|identity| identity.credential)
                .ok_or(ClientError::AuthenticationMissing),
            Decision::Deny(DenyReason::AuthenticationMissing) => {
                Err(ClientError::AuthenticationMissing)
            }
            Decision::Deny(DenyReason::NotAdministrator) => Err(ClientError::AuthorizationDenied),
        }
    }

    pub async fn create_license(&self, request: &NewLicense) -> Result<License, ClientError> {
        let token = self.authorize()?;
        self.client.create_license(&token, request).await
    }

    pub async fn list_licenses(&self, query: &LicenseQuery) -> Result<Vec<License>, ClientError> {
        let token = self.authorize()?;
        self.client.list_licenses(&token, query).await
    }

    pub async fn get_license(&self, id: &str) -> Result<License, ClientError> {
        let token = self.authorize()?;
        self.client.get_license(&token, id).await
    }

    pub async fn update_license(&self, id: &str, update: &LicenseUpdate) -> Result<License, ClientError> {
        let token = self.authorize()?;
        self.client.update_license(&token, id, update).await
    }

    pub async fn revoke_license(&self, id: &str) -> Result<(), ClientError> {
        let token = self.authorize()?;
        self.client.revoke_license(&token, id).await
    }

    pub async fn list_activations(&self, license_id: &str) -> Result<Vec<Activation>, ClientError> {
        let token = self.authorize()?;
        self.client.list_activations(&token, license_id).await
    }

    pub async fn revoke_activation(&self, id: &str) -> Result<(), ClientError> {
        let token = self.authorize()?;
        self.client.revoke_activation(&token, id).await
    }

    pub async fn create_release(&self, request: &NewRelease) -> Result<Release, ClientError> {
        let token = self.authorize()?;
        self.client.create_release(&token, request).await
    }

    pub async fn list_releases(&self, platform: Option<&str>) -> Result<Vec<Release>, ClientError> {
        let token = self.authorize()?;
        self.client.list_releases(&token, platform).await
    }

    pub async fn update_release(&self, id: &str, update: &ReleaseUpdate) -> Result<Release, ClientError> {
        let token = self.authorize()?;
        self.client.update_release(&token, id, update).await
    }

    pub async fn set_latest_release(&self, id: &str) -> Result<(), ClientError> {
        let token = self.authorize()?;
        self.client.set_latest_release(&token, id).await
    }

    pub async fn audit_logs(&self, limit: Option<usize>) -> Result<Vec<AuditEvent>, ClientError> {
        let token = self.authorize()?;
        self.client.audit_logs(&token, limit).await
    }
}
