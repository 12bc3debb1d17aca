// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::FromRef;
use ring::rand::SystemRandom;
use tokio::sync::RwLock;

use crate::api::{health::HealthProbe, rate_limit::ActivationRateLimiter};
use crate::auth::{
    AdminAllowList, AdminAuth, AuthorizationGate, CredentialResolver, TokenVerifier,
};
use crate::config::{
    AuthorityConfig, DEFAULT_ACTIVATE_PER_MINUTE, DEFAULT_GRACE_DAYS, DEFAULT_SIGN_IN_PATH,
};
use crate::store::LicenseStore;

/// Shared state of the license authority.
#[derive(Clone)]
pub struct AuthorityState {
    pub store: Arc<RwLock<LicenseStore>>,
    pub resolver: Arc<CredentialResolver>,
    pub gate: AuthorizationGate,
    pub rng: SystemRandom,
    pub device_hash_salt: Option<Arc<str>>,
    pub grace_days: u32,
    pub activation_limiter: ActivationRateLimiter,
}

impl AuthorityState {
    pub fn new(store: LicenseStore, resolver: CredentialResolver, gate: AuthorizationGate) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            resolver: Arc::new(resolver),
            gate,
            rng: SystemRandom::new(),
            device_hash_salt: None,
            grace_days: DEFAULT_GRACE_DAYS,
            activation_limiter: ActivationRateLimiter::per_minute(
                NonZeroU32::new(DEFAULT_ACTIVATE_PER_MINUTE).unwrap_or(NonZeroU32::MIN),
            ),
        }
    }

    /// Replace the activation budget applied per client address.
    pub fn with_activation_limit(mut self, per_minute: NonZeroU32) -> Self {
        self.activation_limiter = ActivationRateLimiter::per_minute(per_minute);
        self
    }

    pub fn from_config(config: &AuthorityConfig, http: reqwest::Client) -> Self {
        let verifier = TokenVerifier::from_settings(&config.auth, http);
        let gate = AuthorizationGate::new(config.admins.clone(), config.auth.sign_in_path.clone());
        let mut state = Self::new(LicenseStore::new(), CredentialResolver::new(verifier), gate);
        state.device_hash_salt = config.device_hash_salt.as_deref().map(Arc::from);
        state.grace_days = config.grace_days;
        state.with_activation_limit(config.activate_per_minute)
    }

    /// Development-mode state admitting `admins`.
    pub fn development(admins: AdminAllowList) -> Self {
        Self::new(
            LicenseStore::new(),
            CredentialResolver::new(TokenVerifier::development()),
            AuthorizationGate::new(admins, DEFAULT_SIGN_IN_PATH),
        )
    }
}

impl AdminAuth for AuthorityState {
    fn resolver(&self) -> &CredentialResolver {
        &self.resolver
    }

    fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }
}

impl FromRef<AuthorityState> for HealthProbe {
    fn from_ref(state: &AuthorityState) -> Self {
        HealthProbe::new(state.resolver.verifier().jwks().cloned())
    }
}
