//! Warden Permissions prelude.
//!
//! Curated re-exports for wiring a manager in front of a wallet.

pub use crate::callbacks::{callback_fn, CallbackError, CallbackId, PermissionCallback, PermissionEvent};
pub use crate::config::{PermissionsConfig, UnknownRequestPolicy};
pub use crate::errors::{PermissionError, PermissionResult};
pub use crate::manager::PermissionsManager;
pub use crate::request::{DenyParams, GrantParams, PermissionRequest, PermissionResource};
pub use warden_core::{WalletError, WalletInterface};
