// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Device activations bound to a license.
//!
//! A device is identified only by the SHA-256 of its fingerprint; the raw
//! fingerprint never leaves [`device_hash`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use uuid::Uuid;

use super::license::LicenseSummary;
use super::LifecycleError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivationStatus {
    #[default]
    Active,
    Revoked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Activation {
    pub id: String,
    pub license_id: String,
    /// Lower-case hex SHA-256 of the device fingerprint.
    pub device_id_hash: String,
    pub device_label: Option<String>,
    pub activated_app_version: String,
    pub first_activated_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub status: ActivationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /activate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActivationRequest {
    pub license_key: String,
    pub device_fingerprint: String,
    pub app_version: String,
    #[serde(default)]
    pub device_label: Option<String>,
}

/// Returned by `POST /activate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActivationResponse {
    pub license: LicenseSummary,
    pub activation: Activation,
    /// Days the client may run offline before it must check in again.
    pub grace_days: u32,
}

/// Hash a device fingerprint, mixing in `salt` when one is configured.
pub fn device_hash(fingerprint: &str, salt: Option<&str>) -> String {
    let digest = match salt {
        Some(salt) => Sha256::digest(format!("{fingerprint}:{salt}").as_bytes()),
        None => Sha256::digest(fingerprint.as_bytes()),
    };
    format!("{digest:x}")
}

/// Fail when `active` activations already use up `max_activations`.
pub fn ensure_headroom(active: usize, max_activations: u32) -> Result<(), LifecycleError> {
    if active >= max_activations as usize {
        return Err(LifecycleError::ActivationLimitReached(max_activations));
    }
    Ok(())
}

impl Activation {
    pub fn new(
        license_id: &str,
        device_id_hash: String,
        device_label: Option<String>,
        app_version: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            license_id: license_id.to_string(),
            device_id_hash,
            device_label: device_label
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            activated_app_version: app_version,
            first_activated_at: now,
            last_seen_at: now,
            status: ActivationStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ActivationStatus::Active
    }

    /// Record a check-in from an already activated device.
    pub fn touch(&mut self, app_version: String, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        if !self.is_active() {
            return Err(LifecycleError::ActivationRevoked);
        }
        self.activated_app_version = app_version;
        self.last_seen_at = now;
        self.updated_at = now;
        Ok(())
    }

    /// Move to `revoked`. Returns `false` when the activation already was.
    pub fn revoke(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.status = ActivationStatus::Revoked;
        self.updated_at = now;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_hash_is_lowercase_hex_sha256() {
        assert_eq!(
            device_hash("abc", None),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let salted = device_hash("abc", Some("pepper"));
        assert_eq!(salted, device_hash("abc:pepper", None));
        assert_ne!(salted, device_hash("abc", None));
        assert_eq!(salted.len(), 64);
    }

    #[test]
    fn headroom_check() {
        assert!(ensure_headroom(0, 1).is_ok());
        assert!(ensure_headroom(1, 2).is_ok());
        assert_eq!(
            ensure_headroom(2, 2),
            Err(LifecycleError::ActivationLimitReached(2))
        );
    }

    #[test]
    fn revoked_activation_cannot_check_in() {
        let now = Utc::now();
        let mut activation = Activation::new("lic", "hash".into(), None, "1.0.0".into(), now);
        activation.touch("1.1.0".into(), now).unwrap();
        assert_eq!(activation.activated_app_version, "1.1.0");

        assert!(activation.revoke(now));
        assert!(!activation.revoke(now));
        assert_eq!(
            activation.touch("1.2.0".into(), now),
            Err(LifecycleError::ActivationRevoked)
        );
    }
}
