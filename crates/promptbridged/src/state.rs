// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The State Store: a thread-safe record of the idle state and the table of
//! pending requests. Every operation is a plain in-memory update guarded by
//! a single synchronous mutex — nothing here ever awaits, so the lock is
//! never held across a suspension point.

use std::time::Instant;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::coordinator::request::PendingRequest;
use crate::model::{IdleSnapshot, IdleTransition};

struct IdleRecord {
    is_idle: bool,
    since: Instant,
}

struct Inner {
    idle: IdleRecord,
    pending: IndexMap<String, PendingRequest>,
}

/// Shared store for the idle record and the pending-request table.
///
/// The pending table preserves insertion order (`IndexMap`) so a `drain()`
/// resolves requests in the order they arrived, giving deterministic traces
/// for the idle→active fan-out.
pub struct StateStore {
    inner: Mutex<Inner>,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                idle: IdleRecord { is_idle: false, since: Instant::now() },
                pending: IndexMap::new(),
            }),
        }
    }

    /// Read a snapshot of the idle record.
    pub fn snapshot_idle(&self) -> IdleSnapshot {
        let inner = self.inner.lock();
        IdleSnapshot {
            is_idle: inner.idle.is_idle,
            since: inner.idle.since,
            duration: inner.idle.since.elapsed(),
        }
    }

    /// Apply an idle-state observation. No-op (returns `None`) if the value
    /// is unchanged; otherwise updates `since` and returns the transition so
    /// the caller can fire follow-up work outside this critical section.
    pub fn set_idle(&self, is_idle: bool) -> Option<IdleTransition> {
        let mut inner = self.inner.lock();
        if inner.idle.is_idle == is_idle {
            return None;
        }
        inner.idle.is_idle = is_idle;
        inner.idle.since = Instant::now();
        Some(IdleTransition { is_idle })
    }

    /// Insert a newly-posted pending request. Panics (in debug) only via the
    /// `unwrap_used`/`panic` lint gate — callers are expected to pass a
    /// request whose id is not already present; this is an internal
    /// invariant of the coordinator, not something triggerable from hook
    /// input.
    pub fn insert(&self, entry: PendingRequest) {
        let mut inner = self.inner.lock();
        inner.pending.insert(entry.request_id.clone(), entry);
    }

    /// Atomically remove and return the entry for `request_id`, or `None` if
    /// it is not present (a losing race).
    pub fn remove(&self, request_id: &str) -> Option<PendingRequest> {
        let mut inner = self.inner.lock();
        inner.pending.shift_remove(request_id)
    }

    /// Check whether `request_id` is currently pending, without removing it.
    /// `PendingRequest` owns the live connection half and isn't `Clone`, so
    /// unlike `remove`/`drain` this can't hand back the entry itself.
    pub fn contains(&self, request_id: &str) -> bool {
        self.inner.lock().pending.contains_key(request_id)
    }

    /// Remove and return every pending entry, oldest first.
    pub fn drain(&self) -> Vec<PendingRequest> {
        let mut inner = self.inner.lock();
        inner.pending.drain(..).map(|(_, entry)| entry).collect()
    }

    /// Number of entries currently pending. Test/diagnostic use.
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
