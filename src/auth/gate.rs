// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The authorization gate.
//!
//! There is exactly one privilege tier: an identity whose email is on the
//! [`AdminAllowList`] may use the administrative API, nobody else may. The
//! gate keeps no decision cache; it is re-run for every request and for
//! every identity change observed through [`GateWatch`].

use std::sync::Arc;

use tokio::sync::watch;

use super::{AdminAllowList, AuthError, Identity};

/// Why the gate refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No (valid) credential was presented.
    AuthenticationMissing,
    /// A valid credential whose email is not on the allow-list.
    NotAdministrator,
}

/// Outcome of [`AuthorizationGate::authorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Convert into a `Result`, mapping denials to the matching [`AuthError`].
    pub fn into_result(self) -> Result<(), AuthError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::AuthenticationMissing) => Err(AuthError::MissingAuthHeader),
            Decision::Deny(DenyReason::NotAdministrator) => Err(AuthError::NotAdministrator),
        }
    }
}

/// Decides whether an identity may perform administrative operations.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    admins: Arc<AdminAllowList>,
    sign_in_path: String,
}

impl AuthorizationGate {
    pub fn new(admins: AdminAllowList, sign_in_path: impl Into<String>) -> Self {
        Self {
            admins: Arc::new(admins),
            sign_in_path: sign_in_path.into(),
        }
    }

    /// Where denied callers are sent to re-authenticate.
    pub fn sign_in_path(&self) -> &str {
        &self.sign_in_path
    }

    pub fn admins(&self) -> &AdminAllowList {
        &self.admins
    }

    pub fn authorize(&self, identity: Option<&Identity>) -> Decision {
        let Some(identity) = identity else {
            return Decision::Deny(DenyReason::AuthenticationMissing);
        };

        match identity.email.as_deref() {
            Some(email) if self.admins.contains(email) => Decision::Allow,
            _ => Decision::Deny(DenyReason::NotAdministrator),
        }
    }

    /// Follow an identity channel, re-deciding on every change.
    pub fn watch(&self, identities: watch::Receiver<Option<Identity>>) -> GateWatch {
        GateWatch {
            gate: self.clone(),
            identities,
        }
    }
}

/// A gate bound to a session's identity channel.
pub struct GateWatch {
    gate: AuthorizationGate,
    identities: watch::Receiver<Option<Identity>>,
}

impl GateWatch {
    /// Decision for the identity as it is right now.
    pub fn current(&self) -> Decision {
        let identity = self.identities.borrow();
        self.decide(identity.as_ref())
    }

    /// Wait for the next identity change and return the fresh decision.
    ///
    /// Returns `None` once the session side has been dropped; callers must
    /// treat that as a deny.
    pub async fn changed(&mut self) -> Option<Decision> {
        self.identities.changed().await.ok()?;
        let identity = self.identities.borrow_and_update().clone();
        Some(self.decide(identity.as_ref()))
    }

    /// An identity whose credential has expired counts as signed out.
    fn decide(&self, identity: Option<&Identity>) -> Decision {
        self.gate.authorize(identity.filter(|identity| !identity.is_expired()))
    }
}
