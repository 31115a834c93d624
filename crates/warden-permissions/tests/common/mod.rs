//! Shared fixtures for the broker integration tests
#![allow(dead_code)]

use std::sync::Arc;
use warden_core::*;
use warden_permissions::{PermissionsConfig, PermissionsManager};
use warden_testkit::{init_test_tracing, ManualClock, MockWallet, ADMIN_ORIGINATOR};

pub type Broker = Arc<PermissionsManager<MockWallet>>;

pub const ADMIN: &str = ADMIN_ORIGINATOR;

/// Broker with default configuration and the system clock.
pub fn broker() -> (Broker, MockWallet) {
    broker_with(PermissionsConfig::default(), None)
}

/// Broker with a custom configuration and optionally a manual clock.
pub fn broker_with(config: PermissionsConfig, clock: Option<&ManualClock>) -> (Broker, MockWallet) {
    init_test_tracing();
    let wallet = MockWallet::new();
    let mut builder = PermissionsManager::builder(wallet.clone(), ADMIN).config(config);
    if let Some(clock) = clock {
        builder = builder.time(clock.effects());
    }
    (Arc::new(builder.build()), wallet)
}

pub fn derivation(level: SecurityLevel, name: &str) -> KeyDerivation {
    KeyDerivation::new(WalletProtocol::new(level, name), "1")
}

pub fn sign_args(protocol: &str, data: &[u8]) -> CreateSignatureArgs {
    CreateSignatureArgs {
        derivation: derivation(SecurityLevel::App, protocol),
        data: data.to_vec(),
        hash_to_directly_sign: None,
    }
}

pub fn encrypt_args(protocol: &str) -> EncryptArgs {
    EncryptArgs {
        derivation: derivation(SecurityLevel::App, protocol),
        plaintext: vec![0xff, 0xff],
    }
}

pub fn payment(satoshis: u64) -> CreateActionArgs {
    CreateActionArgs {
        description: format!("pay {satoshis}"),
        outputs: vec![CreateActionOutput {
            locking_script: "76a914".to_string(),
            satoshis,
            output_description: "payment".to_string(),
            basket: None,
            custom_instructions: None,
            tags: Vec::new(),
        }],
        ..Default::default()
    }
}

/// Spawn a guarded signature call.
pub fn spawn_sign(
    broker: &Broker,
    protocol: &str,
    originator: &str,
) -> tokio::task::JoinHandle<WalletResult<CreateSignatureResult>> {
    let broker = broker.clone();
    let args = sign_args(protocol, &[0x01, 0x02]);
    let originator = originator.to_string();
    tokio::spawn(async move { broker.create_signature(args, &originator).await })
}

/// Spawn a guarded payment.
pub fn spawn_payment(
    broker: &Broker,
    satoshis: u64,
    originator: &str,
) -> tokio::task::JoinHandle<WalletResult<CreateActionResult>> {
    let broker = broker.clone();
    let originator = originator.to_string();
    tokio::spawn(async move { broker.create_action(payment(satoshis), &originator).await })
}

/// Yield until `count` callers are suspended on `request_id`.
pub async fn wait_for_waiters(broker: &Broker, request_id: &str, count: usize) {
    for _ in 0..1000 {
        if broker.pending_waiters(request_id) >= count {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("expected {count} waiters on {request_id}");
}
