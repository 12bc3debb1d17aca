// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory record store of the license authority.
//!
//! The store itself is not synchronized; [`crate::state::AuthorityState`]
//! wraps it in a single `RwLock`. Every method that checks a rule spanning
//! several records (activation limit, single latest release) takes
//! `&mut self`, so the check and the write happen under one write guard.

use chrono::{DateTime, Utc};
use ring::rand::SecureRandom;

use crate::audit::{AuditEvent, AuditLog};
use crate::lifecycle::{
    device_hash, ensure_headroom, generate_license_key, promote_latest, Activation,
    ActivationRequest, License, LicenseFilter, LicenseUpdate, LifecycleError, NewLicense,
    NewRelease, Platform, Release, ReleaseUpdate,
};

/// Attempts at drawing a license key that is not already taken.
const MAX_KEY_ATTEMPTS: usize = 10;

/// Records are kept in insertion order.
#[derive(Debug, Default)]
pub struct LicenseStore {
    licenses: Vec<License>,
    activations: Vec<Activation>,
    releases: Vec<Release>,
    audit: AuditLog,
}

/// Newest first; equal timestamps keep reverse insertion order.
fn newest_first<'a, T: Clone + 'a>(
    records: impl DoubleEndedIterator<Item = &'a T>,
    created_at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut out: Vec<T> = records.rev().cloned().collect();
    out.sort_by_key(|record| std::cmp::Reverse(created_at(record)));
    out
}

impl LicenseStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Licenses
    // -------------------------------------------------------------------------

    pub fn create_license(
        &mut self,
        request: NewLicense,
        rng: &dyn SecureRandom,
        now: DateTime<Utc>,
    ) -> Result<License, LifecycleError> {
        let mut key = None;
        for _ in 0..MAX_KEY_ATTEMPTS {
            let candidate = generate_license_key(rng)?;
            if self.license_by_key(&candidate).is_none() {
                key = Some(candidate);
                break;
            }
        }
        let key = key.ok_or_else(|| {
            LifecycleError::KeyGeneration("failed to generate a unique license key".to_string())
        })?;

        let license = License::create(request, key, now)?;
        self.licenses.push(license.clone());
        Ok(license)
    }

    pub fn list_licenses(&self, filter: &LicenseFilter) -> Vec<License> {
        newest_first(
            self.licenses.iter().filter(|license| filter.matches(license)),
            |license| license.created_at,
        )
    }

    pub fn license(&self, id: &str) -> Result<License, LifecycleError> {
        self.licenses
            .iter()
            .find(|license| license.id == id)
            .cloned()
            .ok_or(LifecycleError::NotFound("License"))
    }

    fn license_mut(&mut self, id: &str) -> Result<&mut License, LifecycleError> {
        self.licenses
            .iter_mut()
            .find(|license| license.id == id)
            .ok_or(LifecycleError::NotFound("License"))
    }

    fn license_by_key(&self, key: &str) -> Option<&License> {
        self.licenses.iter().find(|license| license.license_key == key)
    }

    pub fn update_license(
        &mut self,
        id: &str,
        update: LicenseUpdate,
        now: DateTime<Utc>,
    ) -> Result<License, LifecycleError> {
        let license = self.license_mut(id)?;
        license.apply_update(update, now)?;
        Ok(license.clone())
    }

    /// Revoke a license. `Ok(false)` means it was already revoked.
    pub fn revoke_license(&mut self, id: &str, now: DateTime<Utc>) -> Result<bool, LifecycleError> {
        Ok(self.license_mut(id)?.revoke(now))
    }

    // -------------------------------------------------------------------------
    // Activations
    // -------------------------------------------------------------------------

    pub fn activations_for(&self, license_id: &str) -> Result<Vec<Activation>, LifecycleError> {
        self.license(license_id)?;
        Ok(newest_first(
            self.activations
                .iter()
                .filter(|activation| activation.license_id == license_id),
            |activation| activation.created_at,
        ))
    }

    pub fn active_activation_count(&self, license_id: &str) -> usize {
        self.activations
            .iter()
            .filter(|activation| activation.license_id == license_id && activation.is_active())
            .count()
    }

    /// Revoke one activation. `Ok(false)` means it was already revoked.
    pub fn revoke_activation(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, LifecycleError> {
        let activation = self
            .activations
            .iter_mut()
            .find(|activation| activation.id == id)
            .ok_or(LifecycleError::NotFound("Activation"))?;
        Ok(activation.revoke(now))
    }

    /// Bind a device to a license, or refresh an existing binding.
    pub fn activate(
        &mut self,
        request: ActivationRequest,
        salt: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(License, Activation), LifecycleError> {
        let license = self
            .license_by_key(request.license_key.trim())
            .cloned()
            .ok_or(LifecycleError::NotFound("License key"))?;
        license.ensure_usable(now)?;

        let hash = device_hash(&request.device_fingerprint, salt);
        let existing = self
            .activations
            .iter_mut()
            .find(|a| a.license_id == license.id && a.device_id_hash == hash);

        if let Some(activation) = existing {
            activation.touch(request.app_version, now)?;
            return Ok((license, activation.clone()));
        }

        ensure_headroom(
            self.active_activation_count(&license.id),
            license.max_activations,
        )?;

        let activation = Activation::new(
            &license.id,
            hash,
            request.device_label,
            request.app_version,
            now,
        );
        self.activations.push(activation.clone());
        tracing::info!(
            license_id = %license.id,
            activation_id = %activation.id,
            "Device activated"
        );
        Ok((license, activation))
    }

    // -------------------------------------------------------------------------
    // Releases
    // -------------------------------------------------------------------------

    pub fn create_release(
        &mut self,
        request: NewRelease,
        now: DateTime<Utc>,
    ) -> Result<Release, LifecycleError> {
        let release = Release::create(request, now)?;
        self.releases.push(release.clone());
        if release.is_latest {
            promote_latest(self.releases.iter_mut(), &release.platform, &release.id);
        }
        Ok(release)
    }

    pub fn list_releases(&self, platform: Option<&Platform>) -> Vec<Release> {
        newest_first(
            self.releases
                .iter()
                .filter(|release| platform.map_or(true, |p| &release.platform == p)),
            |release| release.created_at,
        )
    }

    fn release_mut(&mut self, id: &str) -> Result<&mut Release, LifecycleError> {
        self.releases
            .iter_mut()
            .find(|release| release.id == id)
            .ok_or(LifecycleError::NotFound("Release"))
    }

    pub fn update_release(
        &mut self,
        id: &str,
        update: ReleaseUpdate,
    ) -> Result<Release, LifecycleError> {
        let release = self.release_mut(id)?;
        release.apply_update(update)?;
        let updated = release.clone();
        if updated.is_latest {
            promote_latest(self.releases.iter_mut(), &updated.platform, &updated.id);
        }
        Ok(updated)
    }

    /// Make `id` the only latest release of its platform.
    pub fn set_latest(&mut self, id: &str) -> Result<Release, LifecycleError> {
        let release = self.release_mut(id)?;
        release.is_latest = true;
        let updated = release.clone();
        promote_latest(self.releases.iter_mut(), &updated.platform, &updated.id);
        Ok(updated)
    }

    pub fn latest_release(&self, platform: &Platform) -> Option<&Release> {
        self.releases
            .iter()
            .find(|release| &release.platform == platform && release.is_latest)
    }

    // -------------------------------------------------------------------------
    // Audit
    // -------------------------------------------------------------------------

    pub fn record_audit(&mut self, event: AuditEvent) {
        self.audit.record(event);
    }

    pub fn audit_events(&self, limit: usize) -> Vec<AuditEvent> {
        self.audit.recent(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{LicenseQuery, LicenseStatus, ReleaseVersion};
    use chrono::Duration;
    use ring::rand::SystemRandom;

    fn new_license(store: &mut LicenseStore, name: &str, max: u32) -> License {
        let request = NewLicense {
            customer_name: Some(name.to_string()),
            max_activations: max,
            ..NewLicense::default()
        };
        store
            .create_license(request, &SystemRandom::new(), Utc::now())
            .unwrap()
    }

    fn activation_request(key: &str, fingerprint: &str) -> ActivationRequest {
        ActivationRequest {
            license_key: key.to_string(),
            device_fingerprint: fingerprint.to_string(),
            app_version: "1.0.0".to_string(),
            device_label: None,
        }
    }

    fn new_release(store: &mut LicenseStore, platform: &str, version: &str, latest: bool) -> Release {
        let request = NewRelease {
            platform: Platform::parse(platform).unwrap(),
            version: ReleaseVersion::parse(version).unwrap(),
            release_notes: None,
            download_url: format!("https://downloads.example.com/{version}.exe"),
            is_latest: latest,
        };
        store.create_release(request, Utc::now()).unwrap()
    }

    fn latest_count(store: &LicenseStore, platform: &str) -> usize {
        let platform = Platform::parse(platform).unwrap();
        store
            .list_releases(Some(&platform))
            .iter()
            .filter(|r| r.is_latest)
            .count()
    }

    #[test]
    fn list_is_newest_first_and_filtered() {
        let mut store = LicenseStore::new();
        let acme = new_license(&mut store, "Acme", 1);
        let globex = new_license(&mut store, "Globex", 1);
        store.revoke_license(&globex.id, Utc::now()).unwrap();

        let all = store.list_licenses(&LicenseFilter::default());
        assert_eq!(all[0].id, globex.id);
        assert_eq!(all[1].id, acme.id);

        let filter = LicenseQuery {
            search: Some("ACM".to_string()),
            status_filter: Some("active".to_string()),
        }
        .into_filter()
        .unwrap();
        let found = store.list_licenses(&filter);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, acme.id);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut store = LicenseStore::new();
        assert_eq!(store.license("nope"), Err(LifecycleError::NotFound("License")));
        assert!(store.activations_for("nope").is_err());
        assert!(store.revoke_activation("nope", Utc::now()).is_err());
        assert!(store.set_latest("nope").is_err());
    }

    #[test]
    fn activation_limit_and_headroom() {
        let mut store = LicenseStore::new();
        let license = new_license(&mut store, "Acme", 2);
        let now = Utc::now();

        store
            .activate(activation_request(&license.license_key, "device-a"), None, now)
            .unwrap();
        let (_, second) = store
            .activate(activation_request(&license.license_key, "device-b"), None, now)
            .unwrap();

        let third = store.activate(activation_request(&license.license_key, "device-c"), None, now);
        assert_eq!(third.unwrap_err(), LifecycleError::ActivationLimitReached(2));

        // A known device re-activating does not consume headroom.
        store
            .activate(activation_request(&license.license_key, "device-a"), None, now)
            .unwrap();
        assert_eq!(store.active_activation_count(&license.id), 2);

        assert!(store.revoke_activation(&second.id, now).unwrap());
        assert!(!store.revoke_activation(&second.id, now).unwrap());
        store
            .activate(activation_request(&license.license_key, "device-c"), None, now)
            .unwrap();
        let fourth = store.activate(activation_request(&license.license_key, "device-d"), None, now);
        assert!(matches!(fourth, Err(LifecycleError::ActivationLimitReached(2))));
    }

    #[test]
    fn revoked_device_cannot_reactivate() {
        let mut store = LicenseStore::new();
        let license = new_license(&mut store, "Acme", 3);
        let now = Utc::now();
        let (_, activation) = store
            .activate(activation_request(&license.license_key, "device-a"), None, now)
            .unwrap();
        store.revoke_activation(&activation.id, now).unwrap();

        let again = store.activate(activation_request(&license.license_key, "device-a"), None, now);
        assert_eq!(again.unwrap_err(), LifecycleError::ActivationRevoked);
    }

    #[test]
    fn activation_requires_usable_license() {
        let mut store = LicenseStore::new();
        let license = new_license(&mut store, "Acme", 3);
        let now = Utc::now();

        assert!(matches!(
            store.activate(activation_request("missing", "d"), None, now),
            Err(LifecycleError::NotFound(_))
        ));

        store
            .update_license(
                &license.id,
                LicenseUpdate {
                    status: Some(LicenseStatus::Suspended),
                    ..LicenseUpdate::default()
                },
                now,
            )
            .unwrap();
        assert!(matches!(
            store.activate(activation_request(&license.license_key, "d"), None, now),
            Err(LifecycleError::LicenseUnusable(_))
        ));
    }

    #[test]
    fn expired_license_rejects_activation() {
        let mut store = LicenseStore::new();
        let license = new_license(&mut store, "Acme", 1);
        let later = Utc::now() + Duration::days(1);
        store
            .update_license(
                &license.id,
                LicenseUpdate {
                    expires_at: Some(Utc::now() + Duration::hours(1)),
                    ..LicenseUpdate::default()
                },
                Utc::now(),
            )
            .unwrap();

        let result = store.activate(activation_request(&license.license_key, "d"), None, later);
        assert_eq!(
            result.unwrap_err(),
            LifecycleError::LicenseUnusable("License has expired".to_string())
        );
    }

    #[test]
    fn salted_hashes_are_stored() {
        let mut store = LicenseStore::new();
        let license = new_license(&mut store, "Acme", 1);
        let (_, activation) = store
            .activate(
                activation_request(&license.license_key, "fp"),
                Some("salt"),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(activation.device_id_hash, device_hash("fp:salt", None));
        assert_eq!(store.activations_for(&license.id).unwrap().len(), 1);
    }

    #[test]
    fn exactly_one_latest_per_platform() {
        let mut store = LicenseStore::new();
        let r1 = new_release(&mut store, "windows", "1.0.0", true);
        let r2 = new_release(&mut store, "windows", "1.1.0", true);
        new_release(&mut store, "macos", "1.0.0", true);
        assert_eq!(latest_count(&store, "windows"), 1);
        assert_eq!(latest_count(&store, "macos"), 1);

        let windows = Platform::default();
        assert_eq!(store.latest_release(&windows).unwrap().id, r2.id);

        store.set_latest(&r1.id).unwrap();
        assert_eq!(latest_count(&store, "windows"), 1);
        assert_eq!(store.latest_release(&windows).unwrap().id, r1.id);
        assert_eq!(latest_count(&store, "macos"), 1);

        store
            .update_release(
                &r2.id,
                ReleaseUpdate {
                    is_latest: Some(true),
                    ..ReleaseUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(store.latest_release(&windows).unwrap().id, r2.id);
        assert_eq!(latest_count(&store, "windows"), 1);
    }

    #[test]
    fn moving_latest_release_to_another_platform_keeps_single_latest() {
        let mut store = LicenseStore::new();
        let win = new_release(&mut store, "windows", "2.0.0", true);
        new_release(&mut store, "linux", "1.0.0", true);

        store
            .update_release(
                &win.id,
                ReleaseUpdate {
                    platform: Some(Platform::parse("linux").unwrap()),
                    ..ReleaseUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(latest_count(&store, "linux"), 1);
        assert_eq!(latest_count(&store, "windows"), 0);
    }
}
