// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit trail of administrative actions.
//!
//! Every mutating `/admin` operation records who did what. Events are kept
//! in memory next to the records they describe and served newest first.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Events retained before the oldest are dropped.
pub const MAX_AUDIT_EVENTS: usize = 10_000;

/// Default page size of `GET /admin/audit-logs`.
pub const DEFAULT_AUDIT_LIMIT: usize = 100;

/// Types of auditable actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreateLicense,
    UpdateLicense,
    RevokeLicense,
    RevokeActivation,
    CreateRelease,
    UpdateRelease,
    SetLatestRelease,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    pub id: String,
    /// `user_id` of the administrator who acted.
    pub admin_user_id: String,
    pub action: AuditAction,
    /// Action-specific details.
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(action: AuditAction, admin_user_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            admin_user_id: admin_user_id.into(),
            action,
            payload: serde_json::Value::Object(Default::default()),
            created_at: Utc::now(),
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Bounded, append-only audit log.
#[derive(Debug, Default)]
pub struct AuditLog {
    events: VecDeque<AuditEvent>,
}

impl AuditLog {
    pub fn record(&mut self, event: AuditEvent) {
        tracing::info!(
            action = ?event.action,
            admin_user_id = %event.admin_user_id,
            "Administrative action"
        );
        if self.events.len() == MAX_AUDIT_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Up to `limit` events, newest first.
    pub fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        self.events.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
