//! Permission requests and resolution parameters
//!
//! A [`PermissionRequest`] is the authorization question raised when a guarded
//! call misses the cache. Its `request_id` is the derived resource key, so two
//! requests with the same id are the same question. Requests are only built
//! through the constructors here, which keep the id in sync with the fields.

use crate::key::ResourceKey;
use serde::{Deserialize, Serialize};
use warden_core::{Counterparty, WalletProtocol};

/// Why a protocol permission is being sought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProtocolUsage {
    /// Creating or verifying signatures
    Signing,
    /// Encrypting or decrypting data
    Encrypting,
    /// Creating or verifying HMACs
    Hmac,
    /// Revealing a derived public key
    PublicKey,
    /// Revealing the identity key
    IdentityKey,
    /// Revealing key linkage to a verifier
    LinkageRevelation,
    /// Discovering identities by key or attribute
    IdentityResolution,
    /// Internal wallet protocols such as certificate listing
    Generic,
}

/// What an application wants to do with a basket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BasketUsage {
    /// Adding outputs
    Insertion,
    /// Relinquishing outputs
    Removal,
    /// Listing outputs
    Listing,
}

/// The capability category and its discriminating fields.
///
/// Serialized with an internal `type` tag so event payloads read as
/// `{ "type": "protocol", "requestID": ..., "protocolID": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PermissionResource {
    /// Use of a key-derivation protocol
    #[serde(rename_all = "camelCase")]
    Protocol {
        /// Security level and protocol name
        #[serde(rename = "protocolID")]
        protocol_id: WalletProtocol,
        /// Whose keys the derivation involves
        counterparty: Counterparty,
        /// Operation that raised the request; not part of the key
        usage: ProtocolUsage,
    },
    /// Access to an output basket
    #[serde(rename_all = "camelCase")]
    Basket {
        /// Basket name
        basket: String,
        /// Intended access
        usage: BasketUsage,
    },
    /// Disclosure of certificate fields to a verifier
    #[serde(rename_all = "camelCase")]
    Certificate {
        /// Party the fields are revealed to
        verifier: String,
        /// Certificate type
        cert_type: String,
        /// Sorted, deduplicated field names
        fields: Vec<String>,
    },
    /// Authorization to spend wallet funds
    #[serde(rename_all = "camelCase")]
    Spending {
        /// Amount the call would spend
        satoshis: u64,
        /// Breakdown shown to the decision-maker; not part of the key
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        line_items: Vec<SpendingLineItem>,
    },
}

/// One output of a payment awaiting spending authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingLineItem {
    /// What the output pays for
    pub description: String,
    /// Output value
    pub satoshis: u64,
}

impl PermissionResource {
    /// Prefix used in the resource key for this category.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            Self::Protocol { .. } => "proto",
            Self::Basket { .. } => "basket",
            Self::Certificate { .. } => "cert",
            Self::Spending { .. } => "spend",
        }
    }
}

/// An authorization question awaiting a grant or denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    /// Derived resource key; identical questions share it
    #[serde(rename = "requestID")]
    pub request_id: String,
    /// Domain of the calling application
    pub originator: String,
    /// Whether the privileged keyring is involved
    pub privileged: bool,
    /// Category and discriminating fields
    #[serde(flatten)]
    pub resource: PermissionResource,
    /// Human readable justification, if the caller gave one
    #[serde(default)]
    pub reason: Option<String>,
    /// Creation time, milliseconds since the epoch
    pub created_at: u64,
}

impl PermissionRequest {
    /// Build a request for `resource`, deriving its identifier.
    pub fn new(
        originator: impl Into<String>,
        privileged: bool,
        resource: PermissionResource,
    ) -> Self {
        let originator = originator.into();
        let request_id = ResourceKey::derive(&originator, privileged, &resource).into_string();
        Self {
            request_id,
            originator,
            privileged,
            resource,
            reason: None,
            created_at: 0,
        }
    }

    /// Protocol permission request.
    pub fn protocol(
        originator: impl Into<String>,
        privileged: bool,
        protocol_id: WalletProtocol,
        counterparty: Counterparty,
        usage: ProtocolUsage,
    ) -> Self {
        Self::new(
            originator,
            privileged,
            PermissionResource::Protocol {
                protocol_id,
                counterparty,
                usage,
            },
        )
    }

    /// Basket access request. Basket access is never privileged.
    pub fn basket(originator: impl Into<String>, basket: impl Into<String>, usage: BasketUsage) -> Self {
        Self::new(
            originator,
            false,
            PermissionResource::Basket {
                basket: basket.into(),
                usage,
            },
        )
    }

    /// Certificate disclosure request; `fields` are normalised.
    pub fn certificate<I, S>(
        originator: impl Into<String>,
        privileged: bool,
        verifier: impl Into<String>,
        cert_type: impl Into<String>,
        fields: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        fields.sort();
        fields.dedup();
        Self::new(
            originator,
            privileged,
            PermissionResource::Certificate {
                verifier: verifier.into(),
                cert_type: cert_type.into(),
                fields,
            },
        )
    }

    /// Spending authorization request.
    pub fn spending(originator: impl Into<String>, satoshis: u64) -> Self {
        Self::new(
            originator,
            false,
            PermissionResource::Spending {
                satoshis,
                line_items: Vec::new(),
            },
        )
    }

    /// Attach the payment breakdown to a spending request.
    pub fn with_line_items(mut self, items: Vec<SpendingLineItem>) -> Self {
        if let PermissionResource::Spending { line_items, .. } = &mut self.resource {
            *line_items = items;
        }
        self
    }

    /// Attach a justification.
    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    /// Stamp the creation time.
    pub fn created_at(mut self, ts_ms: u64) -> Self {
        self.created_at = ts_ms;
        self
    }

    /// Requested satoshis for spending requests.
    pub fn spending_amount(&self) -> Option<u64> {
        match self.resource {
            PermissionResource::Spending { satoshis, .. } => Some(satoshis),
            _ => None,
        }
    }
}

/// Parameters for granting a pending request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantParams {
    /// Identifier of the pending request
    #[serde(rename = "requestID")]
    pub request_id: String,
    /// Expiry, seconds since the epoch; open-ended when absent
    #[serde(default)]
    pub expiry: Option<u64>,
    /// Grant lives only as long as this process
    #[serde(default)]
    pub ephemeral: bool,
    /// Spending limit in satoshis; spending requests only
    #[serde(default)]
    pub amount: Option<u64>,
}

impl GrantParams {
    /// Open-ended, persistent grant of `request_id`.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Default::default()
        }
    }

    /// Expire the grant at `expiry` seconds since the epoch.
    pub fn with_expiry(mut self, expiry: u64) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Keep the grant in memory only.
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Allow spending up to `amount` satoshis in total.
    pub fn with_amount(mut self, amount: u64) -> Self {
        self.amount = Some(amount);
        self
    }
}

/// Parameters for denying a pending request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenyParams {
    /// Identifier of the pending request
    #[serde(rename = "requestID")]
    pub request_id: String,
    /// Explanation passed on to every waiting caller
    #[serde(default)]
    pub reason: Option<String>,
}

impl DenyParams {
    /// Denial of `request_id` without a reason.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            reason: None,
        }
    }

    /// Attach an explanation.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::SecurityLevel;

    #[test]
    fn payload_carries_type_and_request_id() {
        let request = PermissionRequest::protocol(
            "non-admin.example.com",
            false,
            WalletProtocol::new(SecurityLevel::App, "some-protocol"),
            Counterparty::Myself,
            ProtocolUsage::Signing,
        );
        let payload = serde_json::to_value(&request).unwrap();
        assert_eq!(payload["type"], "protocol");
        assert_eq!(payload["originator"], "non-admin.example.com");
        assert_eq!(payload["privileged"], false);
        assert!(payload["requestID"]
            .as_str()
            .unwrap()
            .starts_with("proto:non-admin.example.com:false"));
    }

    #[test]
    fn certificate_fields_are_normalised() {
        let a = PermissionRequest::certificate("o.com", false, "02aa", "kyc", ["name", "dob", "name"]);
        let b = PermissionRequest::certificate("o.com", false, "02aa", "kyc", ["dob", "name"]);
        assert_eq!(a.request_id, b.request_id);
        assert_matches::assert_matches!(
            &a.resource,
            PermissionResource::Certificate { fields, .. } if fields == &["dob".to_string(), "name".to_string()]
        );
    }

    #[test]
    fn reason_does_not_change_identity() {
        let a = PermissionRequest::spending("shop.com", 500);
        let b = PermissionRequest::spending("shop.com", 500).with_reason(Some("coffee".into()));
        assert_eq!(a.request_id, b.request_id);
        assert_eq!(b.spending_amount(), Some(500));
    }

    #[test]
    fn line_items_ride_along_in_the_payload() {
        let plain = PermissionRequest::spending("shop.com", 500);
        let itemised = PermissionRequest::spending("shop.com", 500).with_line_items(vec![
            SpendingLineItem {
                description: "coffee".into(),
                satoshis: 300,
            },
            SpendingLineItem {
                description: "tip".into(),
                satoshis: 200,
            },
        ]);
        assert_eq!(plain.request_id, itemised.request_id);

        let payload = serde_json::to_value(&itemised).unwrap();
        assert_eq!(payload["type"], "spending");
        assert_eq!(payload["lineItems"][1]["satoshis"], 200);
        assert!(serde_json::to_value(&plain).unwrap().get("lineItems").is_none());
    }

    #[test]
    fn grant_params_parse_from_ui_json() {
        let params: GrantParams =
            serde_json::from_str(r#"{"requestID":"spend:a.com:false:5","expiry":10,"ephemeral":true}"#)
                .unwrap();
        assert_eq!(params.request_id, "spend:a.com:false:5");
        assert_eq!(params.expiry, Some(10));
        assert!(params.ephemeral);
        assert_eq!(params.amount, None);
    }

    #[test]
    fn deny_params_parse_from_ui_json() {
        let params: DenyParams =
            serde_json::from_str(r#"{"requestID":"basket:a.com:false:tokens","reason":"no"}"#).unwrap();
        assert_eq!(
            params,
            DenyParams::new("basket:a.com:false:tokens").with_reason("no")
        );

        let bare: DenyParams = serde_json::from_str(r#"{"requestID":"basket:a.com:false:x"}"#).unwrap();
        assert_eq!(bare.reason, None);
    }
}
