//! Wallet operation vocabulary
//!
//! Argument and result types for every wallet capability the broker can
//! guard. Field names serialize in camelCase so payloads match the JSON wallet
//! wire format used by remote wallets and UIs.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Protocol security level.
///
/// Level 0 protocols are open to every application; levels 1 and 2 require
/// the application to hold a protocol permission, with level 2 permissions
/// additionally bound to a specific counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SecurityLevel {
    /// No permission required
    Silent,
    /// Permission per application
    App,
    /// Permission per application and counterparty
    Counterparty,
}

impl SecurityLevel {
    /// Numeric wire value of the level.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Silent => 0,
            Self::App => 1,
            Self::Counterparty => 2,
        }
    }
}

impl TryFrom<u8> for SecurityLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Silent),
            1 => Ok(Self::App),
            2 => Ok(Self::Counterparty),
            other => Err(format!("invalid security level: {other}")),
        }
    }
}

impl From<SecurityLevel> for u8 {
    fn from(level: SecurityLevel) -> Self {
        level.as_u8()
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// A protocol identifier: security level plus protocol name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletProtocol {
    /// Security level
    pub security_level: SecurityLevel,
    /// Protocol name
    pub name: String,
}

impl WalletProtocol {
    /// Create a protocol identifier.
    pub fn new(security_level: SecurityLevel, name: impl Into<String>) -> Self {
        Self {
            security_level,
            name: name.into(),
        }
    }
}

impl fmt::Display for WalletProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.security_level, self.name)
    }
}

/// The other party in a key derivation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Counterparty {
    /// The wallet's own key
    #[default]
    #[serde(rename = "self")]
    Myself,
    /// The publicly known "anyone" key
    Anyone,
    /// A specific public key, hex encoded
    #[serde(untagged)]
    Key(String),
}

impl fmt::Display for Counterparty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Myself => write!(f, "self"),
            Self::Anyone => write!(f, "anyone"),
            Self::Key(key) => write!(f, "{key}"),
        }
    }
}

/// Key derivation parameters shared by the protocol-scoped operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDerivation {
    /// Protocol the key belongs to
    #[serde(rename = "protocolID")]
    pub protocol_id: WalletProtocol,
    /// Key identifier within the protocol
    #[serde(rename = "keyID")]
    pub key_id: String,
    /// Counterparty; `self` when absent
    #[serde(default)]
    pub counterparty: Option<Counterparty>,
    /// Use the privileged keyring
    #[serde(default)]
    pub privileged: bool,
    /// Justification shown when privileged access is requested
    #[serde(default)]
    pub privileged_reason: Option<String>,
}

impl KeyDerivation {
    /// Derivation for `protocol_id` and `key_id` against the wallet's own key.
    pub fn new(protocol_id: WalletProtocol, key_id: impl Into<String>) -> Self {
        Self {
            protocol_id,
            key_id: key_id.into(),
            counterparty: None,
            privileged: false,
            privileged_reason: None,
        }
    }

    /// Set the counterparty.
    pub fn with_counterparty(mut self, counterparty: Counterparty) -> Self {
        self.counterparty = Some(counterparty);
        self
    }

    /// Mark the derivation as privileged.
    pub fn privileged(mut self, reason: impl Into<String>) -> Self {
        self.privileged = true;
        self.privileged_reason = Some(reason.into());
        self
    }

    /// Counterparty with the `self` default applied.
    pub fn counterparty_or_self(&self) -> Counterparty {
        self.counterparty.clone().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Key-based cryptography
// ---------------------------------------------------------------------------

/// Arguments for `create_signature`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSignatureArgs {
    #[serde(flatten)]
    pub derivation: KeyDerivation,
    #[serde(default)]
    pub data: Vec<u8>,
    #[serde(default)]
    pub hash_to_directly_sign: Option<Vec<u8>>,
}

/// Result of `create_signature`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSignatureResult {
    pub signature: Vec<u8>,
}

/// Arguments for `verify_signature`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifySignatureArgs {
    #[serde(flatten)]
    pub derivation: KeyDerivation,
    #[serde(default)]
    pub data: Vec<u8>,
    pub signature: Vec<u8>,
    #[serde(default)]
    pub for_self: bool,
}

/// Result of `verify_signature`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifySignatureResult {
    pub valid: bool,
}

/// Arguments for `encrypt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptArgs {
    #[serde(flatten)]
    pub derivation: KeyDerivation,
    pub plaintext: Vec<u8>,
}

/// Result of `encrypt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptResult {
    pub ciphertext: Vec<u8>,
}

/// Arguments for `decrypt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptArgs {
    #[serde(flatten)]
    pub derivation: KeyDerivation,
    pub ciphertext: Vec<u8>,
}

/// Result of `decrypt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptResult {
    pub plaintext: Vec<u8>,
}

/// Arguments for `create_hmac`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateHmacArgs {
    #[serde(flatten)]
    pub derivation: KeyDerivation,
    pub data: Vec<u8>,
}

/// Result of `create_hmac`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateHmacResult {
    pub hmac: Vec<u8>,
}

/// Arguments for `verify_hmac`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyHmacArgs {
    #[serde(flatten)]
    pub derivation: KeyDerivation,
    pub data: Vec<u8>,
    pub hmac: Vec<u8>,
}

/// Result of `verify_hmac`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyHmacResult {
    pub valid: bool,
}

/// Public key lookup: either the identity key or a protocol-derived key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetPublicKeyArgs {
    #[serde(default)]
    pub identity_key: bool,
    /// Required unless `identity_key` is set
    #[serde(default)]
    pub derivation: Option<KeyDerivation>,
    #[serde(default)]
    pub for_self: bool,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub privileged_reason: Option<String>,
}

/// Result of `get_public_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPublicKeyResult {
    pub public_key: String,
}

/// Arguments for `reveal_counterparty_key_linkage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealCounterpartyKeyLinkageArgs {
    pub counterparty: String,
    pub verifier: String,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub privileged_reason: Option<String>,
}

/// Result of `reveal_counterparty_key_linkage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealCounterpartyKeyLinkageResult {
    pub prover: String,
    pub verifier: String,
    pub counterparty: String,
    pub revelation_time: String,
    pub encrypted_linkage: Vec<u8>,
    pub encrypted_linkage_proof: Vec<u8>,
}

/// Arguments for `reveal_specific_key_linkage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealSpecificKeyLinkageArgs {
    pub counterparty: Counterparty,
    pub verifier: String,
    #[serde(rename = "protocolID")]
    pub protocol_id: WalletProtocol,
    #[serde(rename = "keyID")]
    pub key_id: String,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub privileged_reason: Option<String>,
}

/// Result of `reveal_specific_key_linkage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealSpecificKeyLinkageResult {
    pub prover: String,
    pub verifier: String,
    pub counterparty: Counterparty,
    #[serde(rename = "protocolID")]
    pub protocol_id: WalletProtocol,
    #[serde(rename = "keyID")]
    pub key_id: String,
    pub encrypted_linkage: Vec<u8>,
    pub encrypted_linkage_proof: Vec<u8>,
    pub proof_type: u8,
}

// ---------------------------------------------------------------------------
// Transactions and outputs
// ---------------------------------------------------------------------------

/// An input spent by a new action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionInput {
    pub outpoint: String,
    pub input_description: String,
    #[serde(default)]
    pub unlocking_script: Option<String>,
    #[serde(default)]
    pub unlocking_script_length: Option<u32>,
}

/// An output created by a new action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionOutput {
    pub locking_script: String,
    pub satoshis: u64,
    pub output_description: String,
    #[serde(default)]
    pub basket: Option<String>,
    #[serde(default)]
    pub custom_instructions: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Arguments for `create_action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionArgs {
    pub description: String,
    #[serde(default)]
    pub inputs: Vec<CreateActionInput>,
    #[serde(default)]
    pub outputs: Vec<CreateActionOutput>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub lock_time: Option<u32>,
    #[serde(default)]
    pub sign_and_process: Option<bool>,
}

impl CreateActionArgs {
    /// Total satoshis sent to the action's outputs.
    pub fn total_output_satoshis(&self) -> u64 {
        self.outputs
            .iter()
            .fold(0u64, |acc, o| acc.saturating_add(o.satoshis))
    }
}

/// Result of `create_action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionResult {
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub signable_reference: Option<String>,
}

/// Arguments for `sign_action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignActionArgs {
    pub reference: String,
    /// Unlocking scripts keyed by input index
    #[serde(default)]
    pub spends: BTreeMap<u32, String>,
}

/// Result of `sign_action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignActionResult {
    pub txid: Option<String>,
}

/// Arguments for `abort_action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortActionArgs {
    pub reference: String,
}

/// Result of `abort_action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortActionResult {
    pub aborted: bool,
}

/// How a list of labels or tags is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    #[default]
    Any,
    All,
}

/// Arguments for `list_actions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListActionsArgs {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub label_query_mode: QueryMode,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// A recorded action as returned by `list_actions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAction {
    pub txid: String,
    pub satoshis: i64,
    pub status: String,
    pub description: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Result of `list_actions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListActionsResult {
    pub total_actions: u32,
    pub actions: Vec<WalletAction>,
}

/// How an incoming transaction output is taken into the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "protocol")]
pub enum InternalizeProtocol {
    /// Output pays the wallet directly
    WalletPayment,
    /// Output is tracked in a basket
    #[serde(rename_all = "camelCase")]
    BasketInsertion {
        basket: String,
        #[serde(default)]
        custom_instructions: Option<String>,
        #[serde(default)]
        tags: Vec<String>,
    },
}

/// An output of an incoming transaction to take ownership of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalizeOutput {
    pub output_index: u32,
    #[serde(flatten)]
    pub protocol: InternalizeProtocol,
}

/// Arguments for `internalize_action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalizeActionArgs {
    pub tx: Vec<u8>,
    pub outputs: Vec<InternalizeOutput>,
    pub description: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Result of `internalize_action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalizeActionResult {
    pub accepted: bool,
}

/// Arguments for `list_outputs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ListOutputsArgs {
    pub basket: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// A spendable output as returned by `list_outputs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletOutput {
    pub outpoint: String,
    pub satoshis: u64,
    pub spendable: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Result of `list_outputs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListOutputsResult {
    pub total_outputs: u32,
    pub outputs: Vec<WalletOutput>,
}

/// Arguments for `relinquish_output`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelinquishOutputArgs {
    pub basket: String,
    pub output: String,
}

/// Result of `relinquish_output`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelinquishOutputResult {
    pub relinquished: bool,
}

// ---------------------------------------------------------------------------
// Certificates and identity
// ---------------------------------------------------------------------------

/// An identity certificate held by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletCertificate {
    #[serde(rename = "type")]
    pub cert_type: String,
    pub subject: String,
    pub serial_number: String,
    pub certifier: String,
    pub revocation_outpoint: String,
    pub signature: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// How a certificate is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionProtocol {
    #[default]
    Direct,
    Issuance,
}

/// Arguments for `acquire_certificate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquireCertificateArgs {
    #[serde(rename = "type")]
    pub cert_type: String,
    pub certifier: String,
    #[serde(default)]
    pub acquisition_protocol: AcquisitionProtocol,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub privileged_reason: Option<String>,
}

/// Arguments for `list_certificates`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListCertificatesArgs {
    #[serde(default)]
    pub certifiers: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub privileged_reason: Option<String>,
}

/// Result of `list_certificates`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListCertificatesResult {
    pub total_certificates: u32,
    pub certificates: Vec<WalletCertificate>,
}

/// Arguments for `prove_certificate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProveCertificateArgs {
    pub certificate: WalletCertificate,
    pub fields_to_reveal: Vec<String>,
    pub verifier: String,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub privileged_reason: Option<String>,
}

/// Result of `prove_certificate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProveCertificateResult {
    pub keyring_for_verifier: BTreeMap<String, String>,
}

/// Arguments for `relinquish_certificate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelinquishCertificateArgs {
    #[serde(rename = "type")]
    pub cert_type: String,
    pub serial_number: String,
    pub certifier: String,
}

/// Result of `relinquish_certificate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelinquishCertificateResult {
    pub relinquished: bool,
}

/// Arguments for `discover_by_identity_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverByIdentityKeyArgs {
    pub identity_key: String,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// Arguments for `discover_by_attributes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverByAttributesArgs {
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// Certificates found by either discovery call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverCertificatesResult {
    pub total_certificates: u32,
    pub certificates: Vec<WalletCertificate>,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Chain the wallet operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}
