// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Administrator allow-list.

use std::collections::BTreeSet;

/// The set of email addresses allowed to use the administrative API.
///
/// Entries are trimmed and lower-cased on construction, and lookups
/// lower-case the candidate, so membership is case-insensitive on both
/// sides. The list is immutable once built; an empty list admits nobody.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowList {
    emails: BTreeSet<String>,
}

impl AdminAllowList {
    /// Parse a comma-separated list such as `"ops@example.com, Dev@Example.com"`.
    pub fn parse(raw: &str) -> Self {
        Self::from_emails(raw.split(','))
    }

    pub fn from_emails<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let emails = emails
            .into_iter()
            .map(|e| e.as_ref().trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { emails }
    }

    /// Check whether `email` belongs to an administrator (case-insensitive).
    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&email.trim().to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }
}
