//! The wallet capability surface.
//!
//! [`WalletInterface`] is the set of operations an application can invoke on
//! a wallet. Each call names the `originator`, the domain of the application
//! on whose behalf it is made. Concrete wallets, remote wallet clients and
//! permission-enforcing wrappers all implement the same trait, so wrappers can
//! be stacked without callers noticing.

use crate::errors::WalletResult;
use crate::types::*;
use async_trait::async_trait;

/// The wallet operations a broker can guard.
///
/// Every call carries the originator of the application making it.
#[async_trait]
pub trait WalletInterface: Send + Sync {
    // Transactions and outputs
    /// Build and possibly broadcast a transaction.
    async fn create_action(
        &self,
        args: CreateActionArgs,
        originator: &str,
    ) -> WalletResult<CreateActionResult>;
    /// Supply signatures for an action created unsigned.
    async fn sign_action(&self, args: SignActionArgs, originator: &str)
        -> WalletResult<SignActionResult>;
    /// Abandon an unfinished action.
    async fn abort_action(
        &self,
        args: AbortActionArgs,
        originator: &str,
    ) -> WalletResult<AbortActionResult>;
    /// List recorded actions, optionally filtered by label.
    async fn list_actions(
        &self,
        args: ListActionsArgs,
        originator: &str,
    ) -> WalletResult<ListActionsResult>;
    /// Take ownership of outputs of an incoming transaction.
    async fn internalize_action(
        &self,
        args: InternalizeActionArgs,
        originator: &str,
    ) -> WalletResult<InternalizeActionResult>;
    /// List the spendable outputs of a basket.
    async fn list_outputs(
        &self,
        args: ListOutputsArgs,
        originator: &str,
    ) -> WalletResult<ListOutputsResult>;
    /// Drop an output from its basket.
    async fn relinquish_output(
        &self,
        args: RelinquishOutputArgs,
        originator: &str,
    ) -> WalletResult<RelinquishOutputResult>;

    // Key-based cryptography
    /// Identity key or a protocol-derived public key.
    async fn get_public_key(
        &self,
        args: GetPublicKeyArgs,
        originator: &str,
    ) -> WalletResult<GetPublicKeyResult>;
    /// Reveal to a verifier every key shared with a counterparty.
    async fn reveal_counterparty_key_linkage(
        &self,
        args: RevealCounterpartyKeyLinkageArgs,
        originator: &str,
    ) -> WalletResult<RevealCounterpartyKeyLinkageResult>;
    /// Reveal to a verifier the linkage of one derived key.
    async fn reveal_specific_key_linkage(
        &self,
        args: RevealSpecificKeyLinkageArgs,
        originator: &str,
    ) -> WalletResult<RevealSpecificKeyLinkageResult>;
    /// Encrypt with a derived key.
    async fn encrypt(&self, args: EncryptArgs, originator: &str) -> WalletResult<EncryptResult>;
    /// Decrypt with a derived key.
    async fn decrypt(&self, args: DecryptArgs, originator: &str) -> WalletResult<DecryptResult>;
    /// HMAC with a derived key.
    async fn create_hmac(
        &self,
        args: CreateHmacArgs,
        originator: &str,
    ) -> WalletResult<CreateHmacResult>;
    /// Check an HMAC made with a derived key.
    async fn verify_hmac(
        &self,
        args: VerifyHmacArgs,
        originator: &str,
    ) -> WalletResult<VerifyHmacResult>;
    /// Sign with a derived key.
    async fn create_signature(
        &self,
        args: CreateSignatureArgs,
        originator: &str,
    ) -> WalletResult<CreateSignatureResult>;
    /// Check a signature made with a derived key.
    async fn verify_signature(
        &self,
        args: VerifySignatureArgs,
        originator: &str,
    ) -> WalletResult<VerifySignatureResult>;

    // Certificates and identity
    /// Obtain a certificate from a certifier.
    async fn acquire_certificate(
        &self,
        args: AcquireCertificateArgs,
        originator: &str,
    ) -> WalletResult<WalletCertificate>;
    /// List held certificates.
    async fn list_certificates(
        &self,
        args: ListCertificatesArgs,
        originator: &str,
    ) -> WalletResult<ListCertificatesResult>;
    /// Reveal selected certificate fields to a verifier.
    async fn prove_certificate(
        &self,
        args: ProveCertificateArgs,
        originator: &str,
    ) -> WalletResult<ProveCertificateResult>;
    /// Drop a held certificate.
    async fn relinquish_certificate(
        &self,
        args: RelinquishCertificateArgs,
        originator: &str,
    ) -> WalletResult<RelinquishCertificateResult>;
    /// Find certificates issued for an identity key.
    async fn discover_by_identity_key(
        &self,
        args: DiscoverByIdentityKeyArgs,
        originator: &str,
    ) -> WalletResult<DiscoverCertificatesResult>;
    /// Find certificates by field values.
    async fn discover_by_attributes(
        &self,
        args: DiscoverByAttributesArgs,
        originator: &str,
    ) -> WalletResult<DiscoverCertificatesResult>;

    // Status
    /// Whether the wallet is unlocked.
    async fn is_authenticated(&self, originator: &str) -> WalletResult<bool>;
    /// Current chain height.
    async fn get_height(&self, originator: &str) -> WalletResult<u32>;
    /// Chain the wallet operates on.
    async fn get_network(&self, originator: &str) -> WalletResult<Network>;
    /// Wallet implementation version.
    async fn get_version(&self, originator: &str) -> WalletResult<String>;
}
