//! In-memory permission cache
//!
//! Answers "is this resource already authorized?" from grants made during the
//! lifetime of the broker. Grants are keyed by resource key; spending grants
//! become per-originator allowances that later payments draw down.
//!
//! Expired entries are pruned lazily, on the lookup that finds them stale.

use crate::key::ResourceKey;
use crate::request::{GrantParams, PermissionRequest, PermissionResource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A grant remembered by the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPermission {
    /// Grant time, seconds since the epoch
    pub granted_at: u64,
    /// Expiry, seconds since the epoch; `None` is open-ended
    pub expiry: Option<u64>,
    /// Not to be persisted beyond this process
    pub ephemeral: bool,
}

impl CachedPermission {
    /// An entry whose expiry lies in the past is no longer valid.
    pub fn is_expired(&self, now_secs: u64) -> bool {
        self.expiry.is_some_and(|expiry| expiry < now_secs)
    }
}

/// Spending budget granted to an originator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingAllowance {
    /// Total satoshis authorized
    pub limit: u64,
    /// Satoshis already drawn against the limit
    pub spent: u64,
    /// Grant metadata
    pub permission: CachedPermission,
}

impl SpendingAllowance {
    /// Satoshis still available.
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.spent)
    }
}

/// Cache of granted permissions.
#[derive(Debug, Default)]
pub struct PermissionCache {
    grants: HashMap<String, CachedPermission>,
    allowances: HashMap<String, SpendingAllowance>,
}

impl PermissionCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a live grant covers `request`.
    ///
    /// Spending requests are covered by an allowance with enough headroom, and
    /// a hit debits the allowance by the requested amount.
    pub fn check(&mut self, request: &PermissionRequest, now_secs: u64) -> bool {
        if let PermissionResource::Spending { satoshis, .. } = request.resource {
            return self.draw_allowance(request, satoshis, now_secs);
        }
        match self.grants.get(&request.request_id) {
            Some(cached) if cached.is_expired(now_secs) => {
                self.grants.remove(&request.request_id);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Record a grant for `request`.
    ///
    /// `uses` is the number of callers released by the grant; for spending
    /// requests each of them draws the requested amount from the new
    /// allowance.
    pub fn store(
        &mut self,
        request: &PermissionRequest,
        grant: &GrantParams,
        now_secs: u64,
        uses: usize,
    ) {
        let permission = CachedPermission {
            granted_at: now_secs,
            expiry: grant.expiry,
            ephemeral: grant.ephemeral,
        };
        match request.resource {
            PermissionResource::Spending { satoshis, .. } => {
                let limit = grant.amount.unwrap_or(satoshis);
                let spent = satoshis.saturating_mul(uses as u64);
                let key = ResourceKey::spending_allowance(&request.originator, request.privileged);
                self.allowances.insert(
                    key.into_string(),
                    SpendingAllowance {
                        limit,
                        spent,
                        permission,
                    },
                );
            }
            _ => {
                self.grants.insert(request.request_id.clone(), permission);
            }
        }
    }

    /// Drop a grant or allowance by key. Returns whether anything was removed.
    pub fn revoke(&mut self, key: &str) -> bool {
        self.grants.remove(key).is_some() | self.allowances.remove(key).is_some()
    }

    /// Forget every grant.
    pub fn clear(&mut self) {
        self.grants.clear();
        self.allowances.clear();
    }

    /// Snapshot of the resource grants, sorted by key.
    pub fn entries(&self) -> Vec<(String, CachedPermission)> {
        let mut entries: Vec<_> = self
            .grants
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Current allowance for an originator, if any.
    pub fn allowance(&self, originator: &str, privileged: bool) -> Option<&SpendingAllowance> {
        self.allowances
            .get(ResourceKey::spending_allowance(originator, privileged).as_str())
    }

    /// Grants plus allowances held.
    pub fn len(&self) -> usize {
        self.grants.len() + self.allowances.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn draw_allowance(&mut self, request: &PermissionRequest, satoshis: u64, now_secs: u64) -> bool {
        let key = ResourceKey::spending_allowance(&request.originator, request.privileged);
        let Some(allowance) = self.allowances.get_mut(key.as_str()) else {
            return false;
        };
        if allowance.permission.is_expired(now_secs) {
            self.allowances.remove(key.as_str());
            return false;
        }
        if satoshis > allowance.remaining() {
            return false;
        }
        allowance.spent = allowance.spent.saturating_add(satoshis);
        true
    }
}
