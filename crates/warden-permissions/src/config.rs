//! Permission broker configuration.
//!
//! Every gate defaults to enabled. Switching one off lets the matching calls
//! through without consulting the cache or prompting.

use crate::errors::{PermissionError, PermissionResult};
use crate::request::{BasketUsage, ProtocolUsage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How grant/deny calls for unknown request ids are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownRequestPolicy {
    /// Log a warning and return successfully
    #[default]
    Ignore,
    /// Return `PermissionError::UnknownRequest`
    Reject,
}

/// Which gates are active and how stray decisions are handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Gate signature creation and verification
    pub seek_protocol_permissions_for_signing: bool,
    /// Gate encryption and decryption
    pub seek_protocol_permissions_for_encrypting: bool,
    /// Gate HMAC creation and verification
    pub seek_protocol_permissions_for_hmac: bool,
    /// Gate counterparty and specific key linkage revelation
    pub seek_permissions_for_key_linkage_revelation: bool,
    /// Gate derived public key retrieval
    pub seek_permissions_for_public_key_revelation: bool,
    /// Gate identity key retrieval
    pub seek_permissions_for_identity_key_revelation: bool,
    /// Gate discovery by identity key or attributes
    pub seek_permissions_for_identity_resolution: bool,

    /// Gate adding outputs to a basket
    pub seek_basket_insertion_permissions: bool,
    /// Gate relinquishing outputs from a basket
    pub seek_basket_removal_permissions: bool,
    /// Gate listing a basket's outputs
    pub seek_basket_listing_permissions: bool,

    /// Gate labels applied by `create_action`
    pub seek_permission_when_applying_action_labels: bool,
    /// Gate `list_actions` label filters
    pub seek_permission_when_listing_actions_by_label: bool,

    /// Gate revealing certificate fields to a verifier
    pub seek_certificate_disclosure_permissions: bool,
    /// Gate acquiring certificates
    pub seek_certificate_acquisition_permissions: bool,
    /// Gate relinquishing certificates
    pub seek_certificate_relinquishment_permissions: bool,
    /// Gate listing certificates
    pub seek_certificate_listing_permissions: bool,

    /// Gate actions that spend wallet funds
    pub seek_spending_permissions: bool,

    /// When false, the privileged flag is dropped from every request
    pub differentiate_privileged_operations: bool,

    /// Treatment of grant/deny calls for ids with no pending request
    pub unknown_request_policy: UnknownRequestPolicy,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            seek_protocol_permissions_for_signing: true,
            seek_protocol_permissions_for_encrypting: true,
            seek_protocol_permissions_for_hmac: true,
            seek_permissions_for_key_linkage_revelation: true,
            seek_permissions_for_public_key_revelation: true,
            seek_permissions_for_identity_key_revelation: true,
            seek_permissions_for_identity_resolution: true,
            seek_basket_insertion_permissions: true,
            seek_basket_removal_permissions: true,
            seek_basket_listing_permissions: true,
            seek_permission_when_applying_action_labels: true,
            seek_permission_when_listing_actions_by_label: true,
            seek_certificate_disclosure_permissions: true,
            seek_certificate_acquisition_permissions: true,
            seek_certificate_relinquishment_permissions: true,
            seek_certificate_listing_permissions: true,
            seek_spending_permissions: true,
            differentiate_privileged_operations: true,
            unknown_request_policy: UnknownRequestPolicy::Ignore,
        }
    }
}

impl PermissionsConfig {
    /// Configuration with every gate switched off.
    pub fn permissive() -> Self {
        Self {
            seek_protocol_permissions_for_signing: false,
            seek_protocol_permissions_for_encrypting: false,
            seek_protocol_permissions_for_hmac: false,
            seek_permissions_for_key_linkage_revelation: false,
            seek_permissions_for_public_key_revelation: false,
            seek_permissions_for_identity_key_revelation: false,
            seek_permissions_for_identity_resolution: false,
            seek_basket_insertion_permissions: false,
            seek_basket_removal_permissions: false,
            seek_basket_listing_permissions: false,
            seek_permission_when_applying_action_labels: false,
            seek_permission_when_listing_actions_by_label: false,
            seek_certificate_disclosure_permissions: false,
            seek_certificate_acquisition_permissions: false,
            seek_certificate_relinquishment_permissions: false,
            seek_certificate_listing_permissions: false,
            seek_spending_permissions: false,
            ..Self::default()
        }
    }

    /// Parse from JSON; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> PermissionResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PermissionError::invalid_config(format!("Invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load_from_file(path: &Path) -> PermissionResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PermissionError::invalid_config(format!("Failed to read config file: {e}"))
        })?;
        Self::from_json_str(&content)
    }

    /// Check the configuration for contradictions.
    ///
    /// Every combination of switches is currently meaningful, so this only
    /// exists to keep loaders uniform.
    pub fn validate(&self) -> PermissionResult<()> {
        Ok(())
    }

    /// Whether protocol requests for `usage` are gated.
    pub fn seeks_protocol(&self, usage: ProtocolUsage) -> bool {
        match usage {
            ProtocolUsage::Signing => self.seek_protocol_permissions_for_signing,
            ProtocolUsage::Encrypting => self.seek_protocol_permissions_for_encrypting,
            ProtocolUsage::Hmac => self.seek_protocol_permissions_for_hmac,
            ProtocolUsage::PublicKey => self.seek_permissions_for_public_key_revelation,
            ProtocolUsage::IdentityKey => self.seek_permissions_for_identity_key_revelation,
            ProtocolUsage::LinkageRevelation => self.seek_permissions_for_key_linkage_revelation,
            ProtocolUsage::IdentityResolution => self.seek_permissions_for_identity_resolution,
            ProtocolUsage::Generic => true,
        }
    }

    /// Whether basket requests for `usage` are gated.
    pub fn seeks_basket(&self, usage: BasketUsage) -> bool {
        match usage {
            BasketUsage::Insertion => self.seek_basket_insertion_permissions,
            BasketUsage::Removal => self.seek_basket_removal_permissions,
            BasketUsage::Listing => self.seek_basket_listing_permissions,
        }
    }
}
