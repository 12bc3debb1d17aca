// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Distributable releases and the single-latest-per-platform rule.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::LifecycleError;

pub const DEFAULT_PLATFORM: &str = "windows";

/// Target platform of a release, always lower-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Platform(String);

impl Platform {
    pub fn parse(raw: &str) -> Result<Self, LifecycleError> {
        let name = raw.trim().to_ascii_lowercase();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(LifecycleError::Invalid(format!("Invalid platform '{raw}'")));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self(DEFAULT_PLATFORM.to_string())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Platform {
    type Error = LifecycleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Platform> for String {
    fn from(value: Platform) -> Self {
        value.0
    }
}

/// Dotted numeric version such as `1.4.2`.
///
/// Compared component-wise with missing components treated as zero, so
/// `1.2` equals `1.2.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReleaseVersion {
    raw: String,
    parts: Vec<u64>,
}

impl ReleaseVersion {
    pub fn parse(raw: &str) -> Result<Self, LifecycleError> {
        let raw = raw.trim();
        let parts = raw
            .split('.')
            .map(|part| part.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| {
                LifecycleError::Invalid(format!(
                    "Invalid version '{raw}' (expected dotted numbers such as 1.2.3)"
                ))
            })?;
        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| {
                let a = self.parts.get(i).copied().unwrap_or(0);
                let b = other.parts.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ReleaseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ReleaseVersion {}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for ReleaseVersion {
    type Error = LifecycleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReleaseVersion> for String {
    fn from(value: ReleaseVersion) -> Self {
        value.raw
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Release {
    pub id: String,
    #[schema(value_type = String, example = "windows")]
    pub platform: Platform,
    #[schema(value_type = String, example = "1.2.3")]
    pub version: ReleaseVersion,
    pub release_notes: Option<String>,
    /// Absolute http(s) URL of the installer.
    pub download_url: String,
    /// At most one release per platform carries this flag.
    pub is_latest: bool,
    pub created_at: DateTime<Utc>,
}

/// Request to publish a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewRelease {
    #[serde(default)]
    #[schema(value_type = String, example = "windows")]
    pub platform: Platform,
    #[schema(value_type = String, example = "1.2.3")]
    pub version: ReleaseVersion,
    #[serde(default)]
    pub release_notes: Option<String>,
    pub download_url: String,
    #[serde(default)]
    pub is_latest: bool,
}

/// Partial release update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReleaseUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub platform: Option<Platform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_latest: Option<bool>,
}

fn validate_download_url(raw: &str) -> Result<String, LifecycleError> {
    let invalid = || LifecycleError::Invalid(format!("Invalid download_url '{raw}'"));
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    Ok(raw.trim().to_string())
}

impl Release {
    /// Build a release from a request. The caller enforces the single
    /// latest rule with [`promote_latest`] when `is_latest` is set.
    pub fn create(request: NewRelease, now: DateTime<Utc>) -> Result<Self, LifecycleError> {
        let download_url = validate_download_url(&request.download_url)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            platform: request.platform,
            version: request.version,
            release_notes: request.release_notes,
            download_url,
            is_latest: request.is_latest,
            created_at: now,
        })
    }

    /// Apply a partial update. Nothing changes unless every field is valid.
    pub fn apply_update(&mut self, update: ReleaseUpdate) -> Result<(), LifecycleError> {
        let download_url = update
            .download_url
            .as_deref()
            .map(validate_download_url)
            .transpose()?;

        if let Some(platform) = update.platform {
            self.platform = platform;
        }
        if let Some(notes) = update.release_notes {
            self.release_notes = Some(notes);
        }
        if let Some(url) = download_url {
            self.download_url = url;
        }
        if let Some(is_latest) = update.is_latest {
            self.is_latest = is_latest;
        }
        Ok(())
    }
}

/// Make `id` the only latest release of `platform`.
///
/// Must run in the same critical section that changed the target release.
pub fn promote_latest<'a>(
    releases: impl IntoIterator<Item = &'a mut Release>,
    platform: &Platform,
    id: &str,
) {
    for release in releases {
        if &release.platform == platform {
            release.is_latest = release.id == id;
        }
    }
}

/// Query string of `GET /releases/latest`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LatestReleaseQuery {
    /// Defaults to `windows`.
    #[serde(default)]
    pub platform: Option<String>,
    /// Version installed on the device. Defaults to `0.0.0`.
    #[serde(default)]
    pub current_version: Option<String>,
}

/// Update check result; details are present only when an update exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LatestReleaseResponse {
    pub update_available: bool,
    pub latest_version: Option<String>,
    pub release_notes: Option<String>,
    pub download_url: Option<String>,
}

impl LatestReleaseResponse {
    pub fn evaluate(latest: Option<&Release>, current: &ReleaseVersion) -> Self {
        match latest {
            Some(release) if release.version > *current => Self {
                update_available: true,
                latest_version: Some(release.version.to_string()),
                release_notes: release.release_notes.clone(),
                download_url: Some(release.download_url.clone()),
            },
            _ => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(raw: &str) -> ReleaseVersion {
        ReleaseVersion::parse(raw).unwrap()
    }

    fn release(platform: &str, v: &str, latest: bool) -> Release {
        Release::create(
            NewRelease {
                platform: Platform::parse(platform).unwrap(),
                version: version(v),
                release_notes: None,
                download_url: "https://downloads.example.com/app.exe".to_string(),
                is_latest: latest,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn versions_compare_numerically_with_padding() {
        assert!(version("1.10.0") > version("1.9.9"));
        assert_eq!(version("1.2"), version("1.2.0"));
        assert!(version("2") > version("1.99"));
        assert!(ReleaseVersion::parse("1.x").is_err());
        assert!(ReleaseVersion::parse("").is_err());
        assert!(ReleaseVersion::parse("v1.0").is_err());
    }

    #[test]
    fn platform_is_lower_cased_and_defaults_to_windows() {
        assert_eq!(Platform::parse(" MacOS ").unwrap().as_str(), "macos");
        assert!(Platform::parse("").is_err());
        assert!(Platform::parse("linux x64").is_err());

        let request: NewRelease = serde_json::from_str(
            r#"{"version":"1.0.0","download_url":"https://example.com/a.exe"}"#,
        )
        .unwrap();
        assert_eq!(request.platform.as_str(), "windows");
        assert!(!request.is_latest);
    }

    #[test]
    fn rejects_relative_or_non_http_download_urls() {
        let mut request = NewRelease {
            platform: Platform::default(),
            version: version("1.0.0"),
            release_notes: None,
            download_url: "/downloads/app.exe".to_string(),
            is_latest: false,
        };
        assert!(Release::create(request.clone(), Utc::now()).is_err());

        request.download_url = "ftp://example.com/app.exe".to_string();
        assert!(Release::create(request, Utc::now()).is_err());
    }

    #[test]
    fn promote_latest_touches_only_the_platform() {
        let mut releases = vec![
            release("windows", "1.0.0", true),
            release("windows", "1.1.0", false),
            release("macos", "1.0.0", true),
        ];
        let target = releases[1].id.clone();
        promote_latest(releases.iter_mut(), &Platform::default(), &target);

        assert!(!releases[0].is_latest);
        assert!(releases[1].is_latest);
        assert!(releases[2].is_latest);
    }

    #[test]
    fn update_check_reports_details_only_when_newer() {
        let mut latest = release("windows", "1.2.0", true);
        latest.release_notes = Some("Fixes".to_string());

        let response = LatestReleaseResponse::evaluate(Some(&latest), &version("1.1.9"));
        assert!(response.update_available);
        assert_eq!(response.latest_version.as_deref(), Some("1.2.0"));
        assert_eq!(response.release_notes.as_deref(), Some("Fixes"));

        let response = LatestReleaseResponse::evaluate(Some(&latest), &version("1.2"));
        assert_eq!(response, LatestReleaseResponse::default());

        let response = LatestReleaseResponse::evaluate(None, &version("0.0.0"));
        assert!(!response.update_available);
    }
}
