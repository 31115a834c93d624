//! # Warden Permissions - Wallet Permission Broker
//!
//! Gates a wallet's capability surface behind explicit grant/deny decisions.
//! Every guarded call from a non-administrative originator derives a resource
//! key, consults the grant cache, and on a miss joins (or raises) the single
//! pending request for that key. New requests are announced once through the
//! callback registry; the caller stays suspended until an external
//! decision-maker calls [`PermissionsManager::grant_permission`] or
//! [`PermissionsManager::deny_permission`].

#![deny(clippy::await_holding_lock)]

pub mod cache;
pub mod callbacks;
pub mod config;
pub mod errors;
mod facade;
pub mod key;
pub mod manager;
pub mod pending;
pub mod policy;
pub mod prelude;
pub mod request;

pub use cache::{CachedPermission, PermissionCache, SpendingAllowance};
pub use callbacks::{
    callback_fn, CallbackError, CallbackId, CallbackRegistry, CallbackSelector, DispatchReport,
    PermissionCallback, PermissionEvent,
};
pub use config::{PermissionsConfig, UnknownRequestPolicy};
pub use errors::{PermissionError, PermissionResult};
pub use key::{ParsedResourceKey, ResourceKey};
pub use manager::{PermissionsManager, PermissionsManagerBuilder};
pub use pending::{PendingRequests, PermissionOutcome};
pub use request::{
    BasketUsage, DenyParams, GrantParams, PermissionRequest, PermissionResource, ProtocolUsage,
    SpendingLineItem,
};
