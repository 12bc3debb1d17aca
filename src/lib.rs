// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! License Control Plane - Admin Gateway and License Authority
//!
//! Administrative control plane for software licensing: operators manage
//! licenses, device activations and release metadata through a gateway that
//! only admits allow-listed administrators.
//!
//! ## Modules
//!
//! - `auth` - Credential resolution and the admin authorization gate
//! - `relay` - Gateway relay to the license authority
//! - `lifecycle` - License, activation and release rules
//! - `api` - License authority HTTP handlers (Axum)
//! - `store` - In-memory license authority store
//! - `audit` - Audit trail of administrative actions
//! - `client` - Typed admin API client
//! - `server` - Plain or TLS listener with graceful shutdown

pub mod api;
pub mod audit;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod relay;
pub mod server;
pub mod state;
pub mod store;
pub mod telemetry;
