//! Grant caching: expiry, spending allowances, revocation and grant validation

mod common;

use assert_matches::assert_matches;
use common::*;
use warden_core::*;
use warden_permissions::{
    DenyParams, GrantParams, PermissionError, PermissionEvent, PermissionsConfig,
    UnknownRequestPolicy,
};
use warden_testkit::{event_recorder, ManualClock};

const NOW: u64 = 1_700_000_000;

#[tokio::test]
async fn grant_expires_at_its_deadline() {
    let clock = ManualClock::at_secs(NOW);
    let (broker, wallet) = broker_with(PermissionsConfig::default(), Some(&clock));
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PermissionEvent::ProtocolPermissionRequested, recorder);

    let call = spawn_sign(&broker, "timed", "app.example.com");
    let request = events.next().await;
    broker
        .grant_permission(GrantParams::new(&request.request_id).with_expiry(NOW + 60))
        .await
        .unwrap();
    call.await.unwrap().unwrap();

    clock.advance_secs(60);
    broker
        .create_signature(sign_args("timed", &[1]), "app.example.com")
        .await
        .unwrap();
    assert!(events.try_next().is_none());

    clock.advance_secs(1);
    let call = spawn_sign(&broker, "timed", "app.example.com");
    let again = events.next().await;
    assert_eq!(again.request_id, request.request_id);
    assert!(broker.cached_permissions().is_empty());

    broker.deny_permission(DenyParams::new(&again.request_id)).unwrap();
    assert!(call.await.unwrap().is_err());
    assert_eq!(wallet.call_count("create_signature"), 2);
}

#[tokio::test]
async fn grant_records_clock_time_and_flags() {
    let clock = ManualClock::at_secs(NOW);
    let (broker, _) = broker_with(PermissionsConfig::default(), Some(&clock));
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PermissionEvent::ProtocolPermissionRequested, recorder);

    let call = spawn_sign(&broker, "flags", "app.example.com");
    let request = events.next().await;
    assert_eq!(request.created_at, NOW * 1000);

    broker
        .grant_permission(
            GrantParams::new(&request.request_id)
                .with_expiry(NOW + 3600)
                .ephemeral(),
        )
        .await
        .unwrap();
    call.await.unwrap().unwrap();

    let cached = broker.cached_permissions();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].1.granted_at, NOW);
    assert_eq!(cached[0].1.expiry, Some(NOW + 3600));
    assert!(cached[0].1.ephemeral);
}

#[tokio::test]
async fn revoked_grants_prompt_again() {
    let (broker, _) = broker();
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PermissionEvent::ProtocolPermissionRequested, recorder);

    let call = spawn_sign(&broker, "revocable", "app.example.com");
    let request = events.next().await;
    broker.grant_permission(GrantParams::new(&request.request_id)).await.unwrap();
    call.await.unwrap().unwrap();

    assert!(broker.revoke_permission(&request.request_id));
    assert!(!broker.revoke_permission(&request.request_id));

    let call = spawn_sign(&broker, "revocable", "app.example.com");
    let again = events.next().await;
    broker.deny_permission(DenyParams::new(&again.request_id)).unwrap();
    assert!(call.await.unwrap().is_err());
}

#[tokio::test]
async fn cancelled_spender_is_not_charged() {
    let (broker, wallet) = broker();
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PermissionEvent::SpendingAuthorizationRequested, recorder);

    let abandoned = spawn_payment(&broker, 100, "shop.example.com");
    let request = events.next().await;
    abandoned.abort();
    assert!(abandoned.await.unwrap_err().is_cancelled());
    assert_eq!(broker.pending_waiters(&request.request_id), 0);

    let live = spawn_payment(&broker, 100, "shop.example.com");
    wait_for_waiters(&broker, &request.request_id, 1).await;
    broker
        .grant_permission(GrantParams::new(&request.request_id).with_amount(1_000))
        .await
        .unwrap();
    live.await.unwrap().unwrap();

    let allowance = broker.spending_allowance("shop.example.com", false).unwrap();
    assert_eq!((allowance.limit, allowance.spent), (1_000, 100));
    assert_eq!(wallet.call_count("create_action"), 1);
    assert!(events.try_next().is_none());
}

#[tokio::test]
async fn spending_allowance_is_drawn_down_then_reprompts() {
    let (broker, wallet) = broker();
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PermissionEvent::SpendingAuthorizationRequested, recorder);

    let call = spawn_payment(&broker, 100, "shop.example.com");
    let request = events.next().await;
    assert_eq!(request.request_id, "spend:shop.example.com:false:100");
    broker
        .grant_permission(GrantParams::new(&request.request_id).with_amount(250))
        .await
        .unwrap();
    call.await.unwrap().unwrap();

    let allowance = broker.spending_allowance("shop.example.com", false).unwrap();
    assert_eq!((allowance.limit, allowance.spent), (250, 100));

    broker
        .create_action(payment(100), "shop.example.com")
        .await
        .unwrap();
    assert!(events.try_next().is_none());
    assert_eq!(
        broker.spending_allowance("shop.example.com", false).unwrap().remaining(),
        50
    );

    let call = spawn_payment(&broker, 100, "shop.example.com");
    let request = events.next().await;
    broker.deny_permission(DenyParams::new(&request.request_id)).unwrap();
    assert!(call.await.unwrap().is_err());

    assert_eq!(wallet.call_count("create_action"), 2);
    assert_eq!(
        broker.spending_allowance("shop.example.com", false).unwrap().spent,
        200
    );
}

#[tokio::test]
async fn spending_grant_without_amount_covers_exactly_the_request() {
    let (broker, _) = broker();
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PermissionEvent::SpendingAuthorizationRequested, recorder);

    let call = spawn_payment(&broker, 40, "shop.example.com");
    let request = events.next().await;
    broker.grant_permission(GrantParams::new(&request.request_id)).await.unwrap();
    call.await.unwrap().unwrap();

    let allowance = broker.spending_allowance("shop.example.com", false).unwrap();
    assert_eq!(allowance.remaining(), 0);

    let call = spawn_payment(&broker, 1, "shop.example.com");
    let request = events.next().await;
    assert_eq!(request.spending_amount(), Some(1));
    broker.deny_permission(DenyParams::new(&request.request_id)).unwrap();
    let _ = call.await.unwrap();
}

#[tokio::test]
async fn zero_value_actions_need_no_spending_grant() {
    let (broker, wallet) = broker();

    broker.create_action(payment(0), "shop.example.com").await.unwrap();

    assert!(broker.pending_requests().is_empty());
    assert_eq!(wallet.call_count("create_action"), 1);
}

#[tokio::test]
async fn invalid_grant_leaves_the_request_pending() {
    let (broker, _) = broker();
    let (protocols, mut protocol_events) = event_recorder();
    let (spending, mut spending_events) = event_recorder();
    broker.bind_callback(PermissionEvent::ProtocolPermissionRequested, protocols);
    broker.bind_callback(PermissionEvent::SpendingAuthorizationRequested, spending);

    let sign = spawn_sign(&broker, "strict", "app.example.com");
    let request = protocol_events.next().await;

    let err = broker
        .grant_permission(GrantParams::new(&request.request_id).with_amount(10))
        .await
        .unwrap_err();
    assert_matches!(err, PermissionError::InvalidGrantParameters { .. });
    let err = broker
        .grant_permission(GrantParams::new(&request.request_id).with_expiry(0))
        .await
        .unwrap_err();
    assert_matches!(err, PermissionError::InvalidGrantParameters { .. });
    assert_eq!(broker.pending_waiters(&request.request_id), 1);

    let pay = spawn_payment(&broker, 500, "app.example.com");
    let spend = spending_events.next().await;
    let err = broker
        .grant_permission(GrantParams::new(&spend.request_id).with_amount(499))
        .await
        .unwrap_err();
    assert_matches!(err, PermissionError::InvalidGrantParameters { .. });

    broker.grant_permission(GrantParams::new(&request.request_id)).await.unwrap();
    broker.deny_permission(DenyParams::new(&spend.request_id)).unwrap();
    assert!(sign.await.unwrap().is_ok());
    assert!(pay.await.unwrap().is_err());
}

#[tokio::test]
async fn unknown_request_ids_are_ignored_by_default() {
    let (broker, _) = broker();

    broker
        .grant_permission(GrantParams::new("proto:nobody:false:1:x:self"))
        .await
        .unwrap();
    broker.deny_permission(DenyParams::new("proto:nobody:false:1:x:self")).unwrap();

    assert!(broker.cached_permissions().is_empty());
}

#[tokio::test]
async fn unknown_request_ids_can_be_rejected() {
    let config = PermissionsConfig {
        unknown_request_policy: UnknownRequestPolicy::Reject,
        ..PermissionsConfig::default()
    };
    let (broker, _) = broker_with(config, None);

    let err = broker
        .grant_permission(GrantParams::new("missing"))
        .await
        .unwrap_err();
    assert_matches!(err, PermissionError::UnknownRequest { ref request_id } if request_id == "missing");

    let err = broker.deny_permission(DenyParams::new("missing")).unwrap_err();
    assert_matches!(err, PermissionError::UnknownRequest { .. });
    assert_eq!(
        WalletError::from(err),
        WalletError::not_found("Unknown permission request: missing")
    );
}

#[tokio::test]
async fn second_grant_for_a_resolved_request_is_unknown() {
    let config = PermissionsConfig {
        unknown_request_policy: UnknownRequestPolicy::Reject,
        ..PermissionsConfig::default()
    };
    let (broker, _) = broker_with(config, None);
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PermissionEvent::ProtocolPermissionRequested, recorder);

    let call = spawn_sign(&broker, "once", "app.example.com");
    let request = events.next().await;
    broker.grant_permission(GrantParams::new(&request.request_id)).await.unwrap();
    call.await.unwrap().unwrap();

    assert_matches!(
        broker.deny_permission(DenyParams::new(&request.request_id)),
        Err(PermissionError::UnknownRequest { .. })
    );
}
