// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! License records and their status transitions.
//!
//! ```text
//!            update              revoke
//!   active <-------> suspended ---------> revoked
//!      |                                     ^
//!      +-------------------------------------+
//! ```
//!
//! `revoked` is terminal: revoking again is a no-op, and no update can move
//! a revoked license to another status.

use std::fmt;
use std::str::FromStr;

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use ring::rand::SecureRandom;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::LifecycleError;

/// Random bytes behind every license key.
pub const LICENSE_KEY_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    #[default]
    Active,
    Suspended,
    Revoked,
}

impl LicenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseStatus::Active => "active",
            LicenseStatus::Suspended => "suspended",
            LicenseStatus::Revoked => "revoked",
        }
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(LicenseStatus::Active),
            "suspended" => Ok(LicenseStatus::Suspended),
            "revoked" => Ok(LicenseStatus::Revoked),
            other => Err(LifecycleError::Invalid(format!(
                "Invalid license status '{other}' (expected active, suspended or revoked)"
            ))),
        }
    }
}

/// A license as stored by the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct License {
    pub id: String,
    /// Opaque URL-safe key handed to the customer.
    pub license_key: String,
    pub customer_name: Option<String>,
    /// Upper bound on simultaneously active device activations.
    pub max_activations: u32,
    pub status: LicenseStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewLicense {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default = "default_max_activations")]
    pub max_activations: u32,
    #[serde(default)]
    pub status: Option<LicenseStatus>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_max_activations() -> u32 {
    1
}

impl Default for NewLicense {
    fn default() -> Self {
        Self {
            customer_name: None,
            max_activations: default_max_activations(),
            status: None,
            expires_at: None,
            notes: None,
        }
    }
}

/// Partial license update. Absent fields are left untouched; a blank
/// `customer_name` or `notes` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LicenseUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_activations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LicenseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The license fields echoed back to a device on activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LicenseSummary {
    pub id: String,
    pub customer_name: Option<String>,
    pub max_activations: u32,
    pub status: LicenseStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Generate a fresh license key from `rng`.
pub fn generate_license_key(rng: &dyn SecureRandom) -> Result<String, LifecycleError> {
    let mut bytes = [0u8; LICENSE_KEY_BYTES];
    rng.fill(&mut bytes)
        .map_err(|_| LifecycleError::KeyGeneration("system RNG unavailable".to_string()))?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_max_activations(max: u32) -> Result<(), LifecycleError> {
    if max == 0 {
        return Err(LifecycleError::Invalid(
            "max_activations must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_expiry(
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    match expires_at {
        Some(at) if at <= now => Err(LifecycleError::Invalid(
            "expires_at must be in the future".to_string(),
        )),
        _ => Ok(()),
    }
}

impl License {
    /// Build a new license from a validated request.
    pub fn create(
        request: NewLicense,
        license_key: String,
        now: DateTime<Utc>,
    ) -> Result<Self, LifecycleError> {
        validate_max_activations(request.max_activations)?;
        validate_expiry(request.expires_at, now)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            license_key,
            customer_name: normalize_text(request.customer_name),
            max_activations: request.max_activations,
            status: request.status.unwrap_or_default(),
            expires_at: request.expires_at,
            notes: normalize_text(request.notes),
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update. Nothing changes unless every field is valid.
    ///
    /// Lowering `max_activations` below the current active count is allowed;
    /// it only blocks new devices until enough activations are revoked.
    pub fn apply_update(
        &mut self,
        update: LicenseUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        if let Some(max) = update.max_activations {
            validate_max_activations(max)?;
        }
        validate_expiry(update.expires_at, now)?;
        if let Some(status) = update.status {
            if self.status == LicenseStatus::Revoked && status != LicenseStatus::Revoked {
                return Err(LifecycleError::Conflict(
                    "A revoked license cannot be reinstated".to_string(),
                ));
            }
        }

        if let Some(name) = update.customer_name {
            self.customer_name = normalize_text(Some(name));
        }
        if let Some(max) = update.max_activations {
            self.max_activations = max;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(expires_at) = update.expires_at {
            self.expires_at = Some(expires_at);
        }
        if let Some(notes) = update.notes {
            self.notes = normalize_text(Some(notes));
        }
        self.updated_at = now;
        Ok(())
    }

    /// Move to `revoked`. Returns `false` when the license already was.
    pub fn revoke(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == LicenseStatus::Revoked {
            return false;
        }
        self.status = LicenseStatus::Revoked;
        self.updated_at = now;
        true
    }

    /// Check that new activations may be bound to this license at `now`.
    pub fn ensure_usable(&self, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        match self.status {
            LicenseStatus::Revoked => Err(LifecycleError::LicenseUnusable(
                "License has been revoked".to_string(),
            )),
            LicenseStatus::Suspended => Err(LifecycleError::LicenseUnusable(
                "License is suspended".to_string(),
            )),
            LicenseStatus::Active => match self.expires_at {
                Some(at) if at <= now => Err(LifecycleError::LicenseUnusable(
                    "License has expired".to_string(),
                )),
                _ => Ok(()),
            },
        }
    }

    pub fn summary(&self) -> LicenseSummary {
        LicenseSummary {
            id: self.id.clone(),
            customer_name: self.customer_name.clone(),
            max_activations: self.max_activations,
            status: self.status,
            expires_at: self.expires_at,
        }
    }
}

/// Query string of `GET /admin/licenses`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LicenseQuery {
    /// Case-insensitive substring of the license key or customer name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Exact status (`active`, `suspended`, `revoked`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_filter: Option<String>,
}

/// A parsed [`LicenseQuery`]. Both criteria are independent; empty matches
/// everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseFilter {
    search: Option<String>,
    status: Option<LicenseStatus>,
}

impl LicenseQuery {
    /// Parse into a filter. Blank values count as absent.
    pub fn into_filter(self) -> Result<LicenseFilter, LifecycleError> {
        let search = self
            .search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let status = self
            .status_filter
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<LicenseStatus>())
            .transpose()?;
        Ok(LicenseFilter { search, status })
    }
}

impl LicenseFilter {
    pub fn matches(&self, license: &License) -> bool {
        if let Some(status) = self.status {
            if license.status != status {
                return false;
            }
        }

        match &self.search {
            None => true,
            Some(needle) => {
                license.license_key.to_lowercase().contains(needle)
                    || license
                        .customer_name
                        .as_deref()
                        .is_some_and(|name| name.to_lowercase().contains(needle))
            }
        }
    }
}
