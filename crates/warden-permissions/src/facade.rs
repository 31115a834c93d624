//! Guarded wallet surface
//!
//! `PermissionsManager<W>` is itself a [`WalletInterface`]. Each operation
//! checks the administrative bypass once, runs the gates that apply to it,
//! and only then delegates to the wrapped wallet. A denied gate returns
//! `WalletError::PermissionDenied` without touching the wallet; errors from
//! the wallet after a grant are returned as-is.

use crate::manager::PermissionsManager;
use crate::request::{BasketUsage, ProtocolUsage, SpendingLineItem};
use async_trait::async_trait;
use std::collections::BTreeSet;
use warden_core::*;

#[async_trait]
impl<W: WalletInterface> WalletInterface for PermissionsManager<W> {
    async fn create_action(
        &self,
        args: CreateActionArgs,
        originator: &str,
    ) -> WalletResult<CreateActionResult> {
        if !self.is_admin(originator) {
            let apply_labels = self.config().seek_permission_when_applying_action_labels;
            for label in &args.labels {
                self.ensure_label(originator, label, apply_labels).await?;
            }
            let baskets: BTreeSet<&str> = args
                .outputs
                .iter()
                .filter_map(|o| o.basket.as_deref())
                .collect();
            for basket in baskets {
                self.ensure_basket(
                    originator,
                    basket,
                    BasketUsage::Insertion,
                    Some(args.description.clone()),
                )
                .await?;
            }
            let line_items = args
                .outputs
                .iter()
                .filter(|o| o.satoshis > 0)
                .map(|o| SpendingLineItem {
                    description: o.output_description.clone(),
                    satoshis: o.satoshis,
                })
                .collect();
            self.ensure_spending(
                originator,
                args.total_output_satoshis(),
                line_items,
                Some(args.description.clone()),
            )
            .await?;
        }
        self.wallet().create_action(args, originator).await
    }

    async fn sign_action(
        &self,
        args: SignActionArgs,
        originator: &str,
    ) -> WalletResult<SignActionResult> {
        self.wallet().sign_action(args, originator).await
    }

    async fn abort_action(
        &self,
        args: AbortActionArgs,
        originator: &str,
    ) -> WalletResult<AbortActionResult> {
        self.wallet().abort_action(args, originator).await
    }

    async fn list_actions(
        &self,
        args: ListActionsArgs,
        originator: &str,
    ) -> WalletResult<ListActionsResult> {
        if !self.is_admin(originator) {
            let list_labels = self.config().seek_permission_when_listing_actions_by_label;
            for label in &args.labels {
                self.ensure_label(originator, label, list_labels).await?;
            }
        }
        self.wallet().list_actions(args, originator).await
    }

    async fn internalize_action(
        &self,
        args: InternalizeActionArgs,
        originator: &str,
    ) -> WalletResult<InternalizeActionResult> {
        if !self.is_admin(originator) {
            let apply_labels = self.config().seek_permission_when_applying_action_labels;
            for label in &args.labels {
                self.ensure_label(originator, label, apply_labels).await?;
            }
            let baskets: BTreeSet<&str> = args
                .outputs
                .iter()
                .filter_map(|o| match &o.protocol {
                    InternalizeProtocol::BasketInsertion { basket, .. } => Some(basket.as_str()),
                    InternalizeProtocol::WalletPayment => None,
                })
                .collect();
            for basket in baskets {
                self.ensure_basket(
                    originator,
                    basket,
                    BasketUsage::Insertion,
                    Some(args.description.clone()),
                )
                .await?;
            }
        }
        self.wallet().internalize_action(args, originator).await
    }

    async fn list_outputs(
        &self,
        args: ListOutputsArgs,
        originator: &str,
    ) -> WalletResult<ListOutputsResult> {
        if !self.is_admin(originator) {
            self.ensure_basket(originator, &args.basket, BasketUsage::Listing, None)
                .await?;
        }
        self.wallet().list_outputs(args, originator).await
    }

    async fn relinquish_output(
        &self,
        args: RelinquishOutputArgs,
        originator: &str,
    ) -> WalletResult<RelinquishOutputResult> {
        if !self.is_admin(originator) {
            self.ensure_basket(originator, &args.basket, BasketUsage::Removal, None)
                .await?;
        }
        self.wallet().relinquish_output(args, originator).await
    }

    async fn get_public_key(
        &self,
        args: GetPublicKeyArgs,
        originator: &str,
    ) -> WalletResult<GetPublicKeyResult> {
        if !self.is_admin(originator) {
            if args.identity_key {
                self.ensure_protocol(
                    originator,
                    args.privileged,
                    &WalletProtocol::new(SecurityLevel::App, "identity key"),
                    Counterparty::Myself,
                    ProtocolUsage::IdentityKey,
                    args.privileged_reason.clone(),
                )
                .await?;
            } else {
                let derivation = args.derivation.as_ref().ok_or_else(|| {
                    WalletError::invalid("a protocol and key id are required unless identity_key is set")
                })?;
                self.ensure_protocol(
                    originator,
                    derivation.privileged,
                    &derivation.protocol_id,
                    derivation.counterparty_or_self(),
                    ProtocolUsage::PublicKey,
                    derivation.privileged_reason.clone(),
                )
                .await?;
            }
        }
        self.wallet().get_public_key(args, originator).await
    }

    async fn reveal_counterparty_key_linkage(
        &self,
        args: RevealCounterpartyKeyLinkageArgs,
        originator: &str,
    ) -> WalletResult<RevealCounterpartyKeyLinkageResult> {
        if !self.is_admin(originator) {
            let protocol = WalletProtocol::new(
                SecurityLevel::Counterparty,
                format!("counterparty key linkage revelation {}", args.counterparty),
            );
            self.ensure_protocol(
                originator,
                args.privileged,
                &protocol,
                Counterparty::Key(args.verifier.clone()),
                ProtocolUsage::LinkageRevelation,
                args.privileged_reason.clone(),
            )
            .await?;
        }
        self.wallet()
            .reveal_counterparty_key_linkage(args, originator)
            .await
    }

    async fn reveal_specific_key_linkage(
        &self,
        args: RevealSpecificKeyLinkageArgs,
        originator: &str,
    ) -> WalletResult<RevealSpecificKeyLinkageResult> {
        if !self.is_admin(originator) {
            let protocol = WalletProtocol::new(
                SecurityLevel::Counterparty,
                format!(
                    "specific key linkage revelation {} {}",
                    args.protocol_id.security_level, args.protocol_id.name
                ),
            );
            self.ensure_protocol(
                originator,
                args.privileged,
                &protocol,
                Counterparty::Key(args.verifier.clone()),
                ProtocolUsage::LinkageRevelation,
                args.privileged_reason.clone(),
            )
            .await?;
        }
        self.wallet().reveal_specific_key_linkage(args, originator).await
    }

    async fn encrypt(&self, args: EncryptArgs, originator: &str) -> WalletResult<EncryptResult> {
        if !self.is_admin(originator) {
            self.guard_derivation(originator, &args.derivation, ProtocolUsage::Encrypting)
                .await?;
        }
        self.wallet().encrypt(args, originator).await
    }

    async fn decrypt(&self, args: DecryptArgs, originator: &str) -> WalletResult<DecryptResult> {
        if !self.is_admin(originator) {
            self.guard_derivation(originator, &args.derivation, ProtocolUsage::Encrypting)
                .await?;
        }
        self.wallet().decrypt(args, originator).await
    }

    async fn create_hmac(
        &self,
        args: CreateHmacArgs,
        originator: &str,
    ) -> WalletResult<CreateHmacResult> {
        if !self.is_admin(originator) {
            self.guard_derivation(originator, &args.derivation, ProtocolUsage::Hmac)
                .await?;
        }
        self.wallet().create_hmac(args, originator).await
    }

    async fn verify_hmac(
        &self,
        args: VerifyHmacArgs,
        originator: &str,
    ) -> WalletResult<VerifyHmacResult> {
        if !self.is_admin(originator) {
            self.guard_derivation(originator, &args.derivation, ProtocolUsage::Hmac)
                .await?;
        }
        self.wallet().verify_hmac(args, originator).await
    }

    async fn create_signature(
        &self,
        args: CreateSignatureArgs,
        originator: &str,
    ) -> WalletResult<CreateSignatureResult> {
        if !self.is_admin(originator) {
            self.guard_derivation(originator, &args.derivation, ProtocolUsage::Signing)
                .await?;
        }
        self.wallet().create_signature(args, originator).await
    }

    async fn verify_signature(
        &self,
        args: VerifySignatureArgs,
        originator: &str,
    ) -> WalletResult<VerifySignatureResult> {
        if !self.is_admin(originator) {
            self.guard_derivation(originator, &args.derivation, ProtocolUsage::Signing)
                .await?;
        }
        self.wallet().verify_signature(args, originator).await
    }

    async fn acquire_certificate(
        &self,
        args: AcquireCertificateArgs,
        originator: &str,
    ) -> WalletResult<WalletCertificate> {
        if !self.is_admin(originator) {
            self.ensure_generic(
                originator,
                args.privileged,
                format!("certificate acquisition {}", args.cert_type),
                self.config().seek_certificate_acquisition_permissions,
                args.privileged_reason.clone(),
            )
            .await?;
        }
        self.wallet().acquire_certificate(args, originator).await
    }

    async fn list_certificates(
        &self,
        args: ListCertificatesArgs,
        originator: &str,
    ) -> WalletResult<ListCertificatesResult> {
        if !self.is_admin(originator) {
            self.ensure_generic(
                originator,
                args.privileged,
                "certificate list".to_string(),
                self.config().seek_certificate_listing_permissions,
                args.privileged_reason.clone(),
            )
            .await?;
        }
        self.wallet().list_certificates(args, originator).await
    }

    async fn prove_certificate(
        &self,
        args: ProveCertificateArgs,
        originator: &str,
    ) -> WalletResult<ProveCertificateResult> {
        if !self.is_admin(originator) {
            self.ensure_certificate_disclosure(
                originator,
                args.privileged,
                &args.verifier,
                &args.certificate.cert_type,
                &args.fields_to_reveal,
                args.privileged_reason.clone(),
            )
            .await?;
        }
        self.wallet().prove_certificate(args, originator).await
    }

    async fn relinquish_certificate(
        &self,
        args: RelinquishCertificateArgs,
        originator: &str,
    ) -> WalletResult<RelinquishCertificateResult> {
        if !self.is_admin(originator) {
            self.ensure_generic(
                originator,
                false,
                format!("certificate relinquishment {}", args.cert_type),
                self.config().seek_certificate_relinquishment_permissions,
                None,
            )
            .await?;
        }
        self.wallet().relinquish_certificate(args, originator).await
    }

    async fn discover_by_identity_key(
        &self,
        args: DiscoverByIdentityKeyArgs,
        originator: &str,
    ) -> WalletResult<DiscoverCertificatesResult> {
        if !self.is_admin(originator) {
            self.guard_identity_resolution(originator).await?;
        }
        self.wallet().discover_by_identity_key(args, originator).await
    }

    async fn discover_by_attributes(
        &self,
        args: DiscoverByAttributesArgs,
        originator: &str,
    ) -> WalletResult<DiscoverCertificatesResult> {
        if !self.is_admin(originator) {
            self.guard_identity_resolution(originator).await?;
        }
        self.wallet().discover_by_attributes(args, originator).await
    }

    async fn is_authenticated(&self, originator: &str) -> WalletResult<bool> {
        self.wallet().is_authenticated(originator).await
    }

    async fn get_height(&self, originator: &str) -> WalletResult<u32> {
        self.wallet().get_height(originator).await
    }

    async fn get_network(&self, originator: &str) -> WalletResult<Network> {
        self.wallet().get_network(originator).await
    }

    async fn get_version(&self, originator: &str) -> WalletResult<String> {
        self.wallet().get_version(originator).await
    }
}

impl<W: WalletInterface> PermissionsManager<W> {
    async fn guard_derivation(
        &self,
        originator: &str,
        derivation: &KeyDerivation,
        usage: ProtocolUsage,
    ) -> WalletResult<()> {
        self.ensure_protocol(
            originator,
            derivation.privileged,
            &derivation.protocol_id,
            derivation.counterparty_or_self(),
            usage,
            derivation.privileged_reason.clone(),
        )
        .await
        .map_err(Into::into)
    }

    async fn guard_identity_resolution(&self, originator: &str) -> WalletResult<()> {
        self.ensure_protocol(
            originator,
            false,
            &WalletProtocol::new(SecurityLevel::App, "identity resolution"),
            Counterparty::Myself,
            ProtocolUsage::IdentityResolution,
            None,
        )
        .await
        .map_err(Into::into)
    }
}
