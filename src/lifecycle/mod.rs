// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Lifecycle Model
//!
//! Licenses, the device activations bound to them, and distributable
//! releases. Types here are shared by the license authority (which enforces
//! the rules) and the admin client (which speaks the same wire format).
//!
//! ## Invariants
//!
//! - A license never has more active activations than `max_activations`
//! - `revoked` is terminal for licenses and activations alike
//! - At most one release per platform is marked latest
//!
//! Functions that depend on the clock take `now` explicitly.

pub mod activation;
pub mod error;
pub mod license;
pub mod release;

pub use activation::{
    device_hash, ensure_headroom, Activation, ActivationRequest, ActivationResponse,
    ActivationStatus,
};
pub use error::LifecycleError;
pub use license::{
    generate_license_key, License, LicenseFilter, LicenseQuery, LicenseStatus, LicenseSummary,
    LicenseUpdate, NewLicense,
};
pub use release::{
    promote_latest, LatestReleaseQuery, LatestReleaseResponse, NewRelease, Platform, Release,
    ReleaseUpdate, ReleaseVersion,
};
