//! Recording mock wallet
//!
//! Every operation records `(operation, originator)` and returns a small
//! deterministic result. Failures can be queued per operation to exercise
//! error passthrough.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use warden_core::*;

/// A call observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Wallet method name, e.g. `create_signature`
    pub operation: &'static str,
    /// Originator the call was made for
    pub originator: String,
}

#[derive(Default)]
struct MockState {
    calls: Vec<RecordedCall>,
    failures: HashMap<&'static str, WalletError>,
}

/// Cloneable handle to a shared mock wallet.
#[derive(Clone, Default)]
pub struct MockWallet {
    state: Arc<Mutex<MockState>>,
}

impl MockWallet {
    /// Mock with no recorded calls and no scripted failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call to `operation` fail with `error`.
    pub fn fail_next(&self, operation: &'static str, error: WalletError) {
        self.state.lock().failures.insert(operation, error);
    }

    /// All calls so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Number of calls made to `operation`.
    pub fn call_count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    fn record(&self, operation: &'static str, originator: &str) -> WalletResult<()> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall {
            operation,
            originator: originator.to_string(),
        });
        match state.failures.remove(operation) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn fake_key(seed: u8) -> String {
    let mut bytes = [seed; 33];
    bytes[0] = 0x02;
    hex::encode(bytes)
}

fn fake_certificate(cert_type: &str, certifier: &str) -> WalletCertificate {
    WalletCertificate {
        cert_type: cert_type.to_string(),
        subject: fake_key(1),
        serial_number: "serial-1".to_string(),
        certifier: certifier.to_string(),
        revocation_outpoint: format!("{}.0", "00".repeat(32)),
        signature: "3044".to_string(),
        fields: BTreeMap::new(),
    }
}

#[async_trait]
impl WalletInterface for MockWallet {
    async fn create_action(
        &self,
        args: CreateActionArgs,
        originator: &str,
    ) -> WalletResult<CreateActionResult> {
        self.record("create_action", originator)?;
        Ok(CreateActionResult {
            txid: Some(hex::encode(args.description.as_bytes())),
            signable_reference: None,
        })
    }

    async fn sign_action(&self, args: SignActionArgs, originator: &str) -> WalletResult<SignActionResult> {
        self.record("sign_action", originator)?;
        Ok(SignActionResult {
            txid: Some(args.reference),
        })
    }

    async fn abort_action(
        &self,
        _args: AbortActionArgs,
        originator: &str,
    ) -> WalletResult<AbortActionResult> {
        self.record("abort_action", originator)?;
        Ok(AbortActionResult { aborted: true })
    }

    async fn list_actions(
        &self,
        _args: ListActionsArgs,
        originator: &str,
    ) -> WalletResult<ListActionsResult> {
        self.record("list_actions", originator)?;
        Ok(ListActionsResult::default())
    }

    async fn internalize_action(
        &self,
        _args: InternalizeActionArgs,
        originator: &str,
    ) -> WalletResult<InternalizeActionResult> {
        self.record("internalize_action", originator)?;
        Ok(InternalizeActionResult { accepted: true })
    }

    async fn list_outputs(
        &self,
        _args: ListOutputsArgs,
        originator: &str,
    ) -> WalletResult<ListOutputsResult> {
        self.record("list_outputs", originator)?;
        Ok(ListOutputsResult::default())
    }

    async fn relinquish_output(
        &self,
        _args: RelinquishOutputArgs,
        originator: &str,
    ) -> WalletResult<RelinquishOutputResult> {
        self.record("relinquish_output", originator)?;
        Ok(RelinquishOutputResult { relinquished: true })
    }

    async fn get_public_key(
        &self,
        args: GetPublicKeyArgs,
        originator: &str,
    ) -> WalletResult<GetPublicKeyResult> {
        self.record("get_public_key", originator)?;
        let seed = if args.identity_key { 0x11 } else { 0x22 };
        Ok(GetPublicKeyResult {
            public_key: fake_key(seed),
        })
    }

    async fn reveal_counterparty_key_linkage(
        &self,
        args: RevealCounterpartyKeyLinkageArgs,
        originator: &str,
    ) -> WalletResult<RevealCounterpartyKeyLinkageResult> {
        self.record("reveal_counterparty_key_linkage", originator)?;
        Ok(RevealCounterpartyKeyLinkageResult {
            prover: fake_key(0x11),
            verifier: args.verifier,
            counterparty: args.counterparty,
            revelation_time: "2026-01-01T00:00:00Z".to_string(),
            encrypted_linkage: vec![1, 2, 3],
            encrypted_linkage_proof: vec![4, 5, 6],
        })
    }

    async fn reveal_specific_key_linkage(
        &self,
        args: RevealSpecificKeyLinkageArgs,
        originator: &str,
    ) -> WalletResult<RevealSpecificKeyLinkageResult> {
        self.record("reveal_specific_key_linkage", originator)?;
        Ok(RevealSpecificKeyLinkageResult {
            prover: fake_key(0x11),
            verifier: args.verifier,
            counterparty: args.counterparty,
            protocol_id: args.protocol_id,
            key_id: args.key_id,
            encrypted_linkage: vec![1, 2, 3],
            encrypted_linkage_proof: vec![4, 5, 6],
            proof_type: 0,
        })
    }

    async fn encrypt(&self, args: EncryptArgs, originator: &str) -> WalletResult<EncryptResult> {
        self.record("encrypt", originator)?;
        Ok(EncryptResult {
            ciphertext: args.plaintext.iter().map(|b| b ^ 0xff).collect(),
        })
    }

    async fn decrypt(&self, args: DecryptArgs, originator: &str) -> WalletResult<DecryptResult> {
        self.record("decrypt", originator)?;
        Ok(DecryptResult {
            plaintext: args.ciphertext.iter().map(|b| b ^ 0xff).collect(),
        })
    }

    async fn create_hmac(&self, args: CreateHmacArgs, originator: &str) -> WalletResult<CreateHmacResult> {
        self.record("create_hmac", originator)?;
        Ok(CreateHmacResult {
            hmac: args.data.iter().rev().copied().collect(),
        })
    }

    async fn verify_hmac(&self, args: VerifyHmacArgs, originator: &str) -> WalletResult<VerifyHmacResult> {
        self.record("verify_hmac", originator)?;
        let expected: Vec<u8> = args.data.iter().rev().copied().collect();
        Ok(VerifyHmacResult {
            valid: expected == args.hmac,
        })
    }

    async fn create_signature(
        &self,
        args: CreateSignatureArgs,
        originator: &str,
    ) -> WalletResult<CreateSignatureResult> {
        self.record("create_signature", originator)?;
        let mut signature = vec![0x30, args.data.len() as u8];
        signature.extend_from_slice(&args.data);
        Ok(CreateSignatureResult { signature })
    }

    async fn verify_signature(
        &self,
        args: VerifySignatureArgs,
        originator: &str,
    ) -> WalletResult<VerifySignatureResult> {
        self.record("verify_signature", originator)?;
        Ok(VerifySignatureResult {
            valid: args.signature.get(2..) == Some(args.data.as_slice()),
        })
    }

    async fn acquire_certificate(
        &self,
        args: AcquireCertificateArgs,
        originator: &str,
    ) -> WalletResult<WalletCertificate> {
        self.record("acquire_certificate", originator)?;
        let mut cert = fake_certificate(&args.cert_type, &args.certifier);
        cert.fields = args.fields;
        Ok(cert)
    }

    async fn list_certificates(
        &self,
        _args: ListCertificatesArgs,
        originator: &str,
    ) -> WalletResult<ListCertificatesResult> {
        self.record("list_certificates", originator)?;
        Ok(ListCertificatesResult::default())
    }

    async fn prove_certificate(
        &self,
        args: ProveCertificateArgs,
        originator: &str,
    ) -> WalletResult<ProveCertificateResult> {
        self.record("prove_certificate", originator)?;
        let keyring_for_verifier = args
            .fields_to_reveal
            .into_iter()
            .map(|field| (field, "a2V5".to_string()))
            .collect();
        Ok(ProveCertificateResult {
            keyring_for_verifier,
        })
    }

    async fn relinquish_certificate(
        &self,
        _args: RelinquishCertificateArgs,
        originator: &str,
    ) -> WalletResult<RelinquishCertificateResult> {
        self.record("relinquish_certificate", originator)?;
        Ok(RelinquishCertificateResult { relinquished: true })
    }

    async fn discover_by_identity_key(
        &self,
        _args: DiscoverByIdentityKeyArgs,
        originator: &str,
    ) -> WalletResult<DiscoverCertificatesResult> {
        self.record("discover_by_identity_key", originator)?;
        Ok(DiscoverCertificatesResult::default())
    }

    async fn discover_by_attributes(
        &self,
        _args: DiscoverByAttributesArgs,
        originator: &str,
    ) -> WalletResult<DiscoverCertificatesResult> {
        self.record("discover_by_attributes", originator)?;
        Ok(DiscoverCertificatesResult::default())
    }

    async fn is_authenticated(&self, originator: &str) -> WalletResult<bool> {
        self.record("is_authenticated", originator)?;
        Ok(true)
    }

    async fn get_height(&self, originator: &str) -> WalletResult<u32> {
        self.record("get_height", originator)?;
        Ok(850_000)
    }

    async fn get_network(&self, originator: &str) -> WalletResult<Network> {
        self.record("get_network", originator)?;
        Ok(Network::Testnet)
    }

    async fn get_version(&self, originator: &str) -> WalletResult<String> {
        self.record("get_version", originator)?;
        Ok("mock-wallet-0.1.0".to_string())
    }
}
