// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential resolution: bearer token → [`Identity`].
//!
//! ## Verification Modes
//!
//! - **JWKS** (`AUTH_JWKS_URL` set): signature verified against the
//!   provider's published keys
//! - **Shared secret** (`AUTH_JWT_SECRET` set): HS256 verification
//! - **Development** (neither set): structure and expiry only, no
//!   signature check
//!
//! The [`CredentialResolver`] additionally keeps the signed-in operator of a
//! client session and publishes every change on a `watch` channel, including
//! the moment the operator's credential expires.

use std::sync::{Arc, Weak};
use std::time::Duration;

use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use tokio::sync::watch;

use super::identity::{Identity, IdentityClaims};
use super::jwks::JwksManager;
use super::AuthError;
use crate::config::AuthSettings;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

#[derive(Clone)]
enum VerificationMode {
    Jwks(JwksManager),
    SharedSecret(String),
    Development,
}

/// Verifies identity provider tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    mode: VerificationMode,
    issuer: Option<String>,
    audience: Option<String>,
}

impl TokenVerifier {
    /// Pick the verification mode from configuration.
    ///
    /// JWKS wins over a shared secret when both are configured.
    pub fn from_settings(settings: &AuthSettings, client: reqwest::Client) -> Self {
        let mode = match (&settings.jwks_url, &settings.jwt_secret) {
            (Some(url), _) => VerificationMode::Jwks(JwksManager::new(url.clone(), client)),
            (None, Some(secret)) => VerificationMode::SharedSecret(secret.clone()),
            (None, None) => VerificationMode::Development,
        };

        Self {
            mode,
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
        }
    }

    /// Signature-less verifier.
    ///
    /// WARNING: This should only be used in development environments.
    pub fn development() -> Self {
        Self {
            mode: VerificationMode::Development,
            issuer: None,
            audience: None,
        }
    }

    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            mode: VerificationMode::SharedSecret(secret.into()),
            issuer: None,
            audience: None,
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self.mode {
            VerificationMode::Jwks(_) => "jwks",
            VerificationMode::SharedSecret(_) => "shared_secret",
            VerificationMode::Development => "development",
        }
    }

    /// The JWKS manager, when running in JWKS mode.
    pub fn jwks(&self) -> Option<&JwksManager> {
        match &self.mode {
            VerificationMode::Jwks(manager) => Some(manager),
            _ => None,
        }
    }

    /// Verify `token` and return the identity it carries.
    pub async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = match &self.mode {
            VerificationMode::Jwks(jwks) => {
                let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
                let (key, algorithm) = match &header.kid {
                    Some(kid) => jwks.get_decoding_key(kid).await?,
                    None => jwks.get_any_decoding_key().await?,
                };
                self.decode_verified(token, &key, algorithm)?
            }
            VerificationMode::SharedSecret(secret) => {
                let key = DecodingKey::from_secret(secret.as_bytes());
                self.decode_verified(token, &key, Algorithm::HS256)?
            }
            VerificationMode::Development => decode_unverified(token)?,
        };

        Ok(Identity::from_claims(claims, token))
    }

    fn decode_verified(
        &self,
        token: &str,
        key: &DecodingKey,
        algorithm: Algorithm,
    ) -> Result<IdentityClaims, AuthError> {
        let mut validation = Validation::new(algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY;

        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        decode::<IdentityClaims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                ErrorKind::InvalidAudience => AuthError::InvalidAudience,
                ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                _ => AuthError::MalformedToken,
            })
    }
}

/// Decode without signature verification, checking expiry by hand.
///
/// `exp` is required here exactly as in the verified modes.
fn decode_unverified(token: &str) -> Result<IdentityClaims, AuthError> {
    let claims = jsonwebtoken::dangerous::insecure_decode::<IdentityClaims>(token)
        .map_err(|_| AuthError::MalformedToken)?
        .claims;

    if claims.exp <= 0 {
        return Err(AuthError::MalformedToken);
    }

    let now = chrono::Utc::now().timestamp();
    if claims.exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::TokenExpired);
    }

    Ok(claims)
}

/// Resolves credentials and tracks the signed-in operator of a session.
pub struct CredentialResolver {
    verifier: TokenVerifier,
    session: Arc<watch::Sender<Option<Identity>>>,
}

impl CredentialResolver {
    pub fn new(verifier: TokenVerifier) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            verifier,
            session: Arc::new(session),
        }
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Verify a bearer token without touching the session.
    pub async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        self.verifier.verify(token).await
    }

    /// Verify `token` and make its identity the session's current one.
    ///
    /// A failed verification leaves the session unchanged. Once the
    /// credential's `exp` passes, subscribers see the session go empty.
    pub async fn sign_in(&self, token: &str) -> Result<Identity, AuthError> {
        let identity = self.resolve(token).await?;
        tracing::info!(user_id = %identity.user_id, "Operator signed in");
        self.session.send_replace(Some(identity.clone()));
        if identity.expires_at > 0 {
            tokio::spawn(expire_session(
                Arc::downgrade(&self.session),
                identity.credential.clone(),
                identity.expires_at,
            ));
        }
        Ok(identity)
    }

    /// Drop the current identity.
    pub fn sign_out(&self) {
        if self.session.send_replace(None).is_some() {
            tracing::info!("Operator signed out");
        }
    }

    /// The signed-in identity, or `None` once its credential has expired.
    pub fn current_identity(&self) -> Option<Identity> {
        self.session
            .borrow()
            .as_ref()
            .filter(|identity| !identity.is_expired())
            .cloned()
    }

    /// Bearer credential for outgoing calls.
    ///
    /// Fails soft: `None` means "send the operator to sign in", never an
    /// error.
    pub fn token(&self) -> Option<String> {
        self.current_identity().map(|identity| identity.credential)
    }

    /// Observe identity changes (sign-in, sign-out, expiry).
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.session.subscribe()
    }
}

/// Clear the session at `expires_at` unless the operator has since signed
/// out or signed in with another credential.
async fn expire_session(
    session: Weak<watch::Sender<Option<Identity>>>,
    credential: String,
    expires_at: i64,
) {
    let remaining = expires_at.saturating_sub(chrono::Utc::now().timestamp()).max(0);
    tokio::time::sleep(Duration::from_secs(remaining as u64)).await;

    let Some(session) = session.upgrade() else {
        return;
    };
    let cleared = session.send_if_modified(|current| {
        let same = current
            .as_ref()
            .is_some_and(|identity| identity.credential == credential);
        if same {
            *current = None;
        }
        same
    });
    if cleared {
        tracing::info!("Operator credential expired");
    }
}
