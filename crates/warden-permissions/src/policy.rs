//! Admin-only resources.
//!
//! Some protocol, basket and label names belong to the wallet itself. Requests
//! for them from any originator other than the administrator are refused
//! outright instead of being put to the decision-maker.

use crate::errors::{PermissionError, PermissionResult};
use warden_core::WalletProtocol;

/// Basket the wallet keeps its own change in.
pub const DEFAULT_BASKET: &str = "default";

fn is_admin_reserved_name(name: &str) -> bool {
    name.starts_with("admin") || name.starts_with("p ")
}

/// Refuse reserved protocol names.
pub fn check_protocol(protocol: &WalletProtocol) -> PermissionResult<()> {
    if is_admin_reserved_name(&protocol.name) {
        return Err(PermissionError::ReservedResource {
            resource: format!("protocol '{}'", protocol.name),
        });
    }
    Ok(())
}

/// Refuse reserved baskets.
pub fn check_basket(basket: &str) -> PermissionResult<()> {
    if basket == DEFAULT_BASKET || is_admin_reserved_name(basket) {
        return Err(PermissionError::ReservedResource {
            resource: format!("basket '{basket}'"),
        });
    }
    Ok(())
}

/// Refuse reserved action labels.
pub fn check_label(label: &str) -> PermissionResult<()> {
    if label.starts_with("admin") {
        return Err(PermissionError::ReservedResource {
            resource: format!("label '{label}'"),
        });
    }
    Ok(())
}
