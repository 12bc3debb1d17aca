// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Quiet period before a license search is sent.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Collapses bursts of search input into one query.
///
/// Each call to [`settle`](Self::settle) supersedes the ones before it. Only
/// the input that stays unchanged for the whole delay is returned.
#[derive(Debug, Clone)]
pub struct SearchDebounce {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Default for SearchDebounce {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

impl SearchDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Wait out the delay; `Some(input)` if nothing newer arrived meanwhile.
    pub async fn settle<T>(&self, input: T) -> Option<T> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        (self.generation.load(Ordering::SeqCst) == generation).then_some(input)
    }
}
