//! Pending request store
//!
//! Maps a resource key to the single in-flight request for it plus the FIFO
//! list of callers suspended on its outcome. The store itself is plain data;
//! the broker keeps it behind the same lock as the cache so the
//! check-then-create sequence can never interleave with another caller.

use crate::request::PermissionRequest;
use std::collections::HashMap;
use tokio::sync::oneshot;

/// Terminal outcome of a pending request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionOutcome {
    /// The call may proceed
    Granted,
    /// The call must fail
    Denied {
        /// Explanation supplied with the denial
        reason: Option<String>,
    },
}

impl PermissionOutcome {
    /// Whether the call may proceed.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// A suspended caller's handle on the outcome.
#[derive(Debug)]
pub struct PendingWaiter {
    rx: oneshot::Receiver<PermissionOutcome>,
}

impl PendingWaiter {
    /// Suspend until the request is resolved.
    ///
    /// If the entry is dropped without a decision (the broker itself went
    /// away) the caller is treated as denied.
    pub async fn outcome(self) -> PermissionOutcome {
        self.rx.await.unwrap_or(PermissionOutcome::Denied {
            reason: Some("request abandoned before a decision was made".to_string()),
        })
    }
}

/// An in-flight request and the callers waiting on it.
#[derive(Debug)]
pub struct PendingEntry {
    request: PermissionRequest,
    waiters: Vec<oneshot::Sender<PermissionOutcome>>,
}

impl PendingEntry {
    /// The request as first raised.
    pub fn request(&self) -> &PermissionRequest {
        &self.request
    }

    /// Number of callers still attached. Callers that were dropped while
    /// waiting do not count.
    pub fn waiter_count(&self) -> usize {
        self.waiters.iter().filter(|tx| !tx.is_closed()).count()
    }

    fn is_abandoned(&self) -> bool {
        self.waiter_count() == 0
    }

    fn join(&mut self) -> PendingWaiter {
        self.waiters.retain(|tx| !tx.is_closed());
        let (tx, rx) = oneshot::channel();
        self.waiters.push(tx);
        PendingWaiter { rx }
    }
}

/// Result of resolving an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    /// The request that was resolved
    pub request: PermissionRequest,
    /// Callers that received the outcome
    pub released: usize,
}

/// In-flight permission requests keyed by resource key.
#[derive(Debug, Default)]
pub struct PendingRequests {
    entries: HashMap<String, PendingEntry>,
}

impl PendingRequests {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the entry for `request`, creating it if none exists.
    ///
    /// Returns the caller's waiter and whether the entry is new. Only the
    /// creator of an entry announces it to listeners. Other entries whose
    /// callers have all gone away are dropped on the way; an abandoned entry
    /// for `request` itself is rejoined, since its announcement is already out.
    pub fn get_or_create(&mut self, request: PermissionRequest) -> (PendingWaiter, bool) {
        self.entries
            .retain(|key, entry| key == &request.request_id || !entry.is_abandoned());
        if let Some(entry) = self.entries.get_mut(&request.request_id) {
            return (entry.join(), false);
        }
        let key = request.request_id.clone();
        let mut entry = PendingEntry {
            request,
            waiters: Vec::new(),
        };
        let waiter = entry.join();
        self.entries.insert(key, entry);
        (waiter, true)
    }

    /// Look up an in-flight entry.
    pub fn get(&self, request_id: &str) -> Option<&PendingEntry> {
        self.entries.get(request_id)
    }

    /// Whether `request_id` is in flight.
    pub fn contains(&self, request_id: &str) -> bool {
        self.entries.contains_key(request_id)
    }

    /// Release every waiter of `request_id` with `outcome`, in join order, and
    /// remove the entry.
    pub fn resolve(
        &mut self,
        request_id: &str,
        outcome: PermissionOutcome,
    ) -> Option<ResolvedRequest> {
        let entry = self.entries.remove(request_id)?;
        let mut released = 0;
        for waiter in entry.waiters {
            // A waiter whose caller was dropped has nobody left to notify.
            if waiter.send(outcome.clone()).is_ok() {
                released += 1;
            }
        }
        Some(ResolvedRequest {
            request: entry.request,
            released,
        })
    }

    /// Snapshot of in-flight requests that still have a caller, oldest first.
    pub fn requests(&self) -> Vec<PermissionRequest> {
        let mut requests: Vec<_> = self
            .entries
            .values()
            .filter(|e| !e.is_abandoned())
            .map(|e| e.request.clone())
            .collect();
        requests.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.request_id.cmp(&b.request_id))
        });
        requests
    }

    /// Number of entries, abandoned ones not yet swept included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry is held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
