//! End-to-end request flows: prompt, grant or deny, release

mod common;

use assert_matches::assert_matches;
use async_trait::async_trait;
use common::*;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use warden_core::*;
use warden_permissions::{
    CallbackError, DenyParams, GrantParams, PermissionCallback, PermissionEvent, PermissionRequest,
    PermissionResource, ProtocolUsage,
};
use warden_testkit::event_recorder;

const PROTOCOL_EVENT: PermissionEvent = PermissionEvent::ProtocolPermissionRequested;

#[tokio::test]
async fn protocol_request_carries_the_expected_payload() {
    let (broker, wallet) = broker();
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PROTOCOL_EVENT, recorder);

    let call = spawn_sign(&broker, "some-protocol", "non-admin.example.com");
    let request = events.next().await;

    assert_eq!(request.originator, "non-admin.example.com");
    assert!(request.request_id.starts_with("proto:non-admin.example.com:false"));
    assert_matches!(
        &request.resource,
        PermissionResource::Protocol { protocol_id, usage: ProtocolUsage::Signing, .. }
            if protocol_id.name == "some-protocol"
    );
    let payload = serde_json::to_value(&request).unwrap();
    assert_eq!(payload["type"], "protocol");
    assert_eq!(payload["requestID"], request.request_id.as_str());
    assert_eq!(broker.pending_requests().len(), 1);

    broker.deny_permission(DenyParams::new(&request.request_id)).unwrap();

    let err = call.await.unwrap().unwrap_err();
    assert!(err.is_permission_denied());
    assert!(err.to_string().contains("Permission denied"));
    assert_eq!(wallet.call_count("create_signature"), 0);
    assert!(broker.pending_requests().is_empty());
}

#[tokio::test]
async fn grant_releases_the_caller_into_the_wallet() {
    let (broker, wallet) = broker();
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PROTOCOL_EVENT, recorder);

    let call = spawn_sign(&broker, "testproto", "nonadmin.com");
    let request = events.next().await;

    broker
        .grant_permission(
            GrantParams::new(&request.request_id)
                .with_expiry(123_456_789)
                .ephemeral(),
        )
        .await
        .unwrap();

    let result = call.await.unwrap().unwrap();
    assert_eq!(result.signature, vec![0x30, 2, 0x01, 0x02]);
    assert_eq!(wallet.call_count("create_signature"), 1);
    assert_eq!(wallet.calls()[0].originator, "nonadmin.com");
}

#[tokio::test]
async fn denial_rejects_the_caller_with_the_reason() {
    let (broker, wallet) = broker();
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PROTOCOL_EVENT, recorder);

    let call = {
        let broker = broker.clone();
        tokio::spawn(async move {
            broker
                .encrypt(encrypt_args("secretproto"), "unauthorized-domain.com")
                .await
        })
    };
    let request = events.next().await;
    assert_matches!(
        request.resource,
        PermissionResource::Protocol { usage: ProtocolUsage::Encrypting, .. }
    );

    broker
        .deny_permission(DenyParams::new(&request.request_id).with_reason("user declined"))
        .unwrap();

    let err = call.await.unwrap().unwrap_err();
    assert_matches!(err, WalletError::PermissionDenied { ref message } if message.contains("user declined"));
    assert_eq!(wallet.call_count("encrypt"), 0);
}

#[tokio::test]
async fn identical_concurrent_requests_share_one_prompt() {
    let (broker, wallet) = broker();
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PROTOCOL_EVENT, recorder);

    let first = spawn_sign(&broker, "parallel-test", "parallel-user.com");
    let second = spawn_sign(&broker, "parallel-test", "parallel-user.com");
    let request = events.next().await;
    wait_for_waiters(&broker, &request.request_id, 2).await;

    assert!(events.try_next().is_none());
    assert_eq!(broker.pending_requests().len(), 1);

    broker
        .grant_permission(GrantParams::new(&request.request_id).ephemeral())
        .await
        .unwrap();

    assert!(first.await.unwrap().is_ok());
    assert!(second.await.unwrap().is_ok());
    assert_eq!(wallet.call_count("create_signature"), 2);
    assert!(events.try_next().is_none());
}

#[tokio::test]
async fn joined_callers_are_released_in_join_order() {
    let (broker, _) = broker();
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PROTOCOL_EVENT, recorder);
    let finished: Arc<Mutex<Vec<u8>>> = Arc::default();

    let queued = |index: u8| {
        let broker = broker.clone();
        let finished = finished.clone();
        tokio::spawn(async move {
            let result = broker
                .create_signature(sign_args("queue", &[index]), "app.example.com")
                .await;
            finished.lock().push(index);
            result
        })
    };

    let mut calls = vec![queued(0)];
    let request = events.next().await;
    wait_for_waiters(&broker, &request.request_id, 1).await;
    for index in 1..3u8 {
        calls.push(queued(index));
        wait_for_waiters(&broker, &request.request_id, usize::from(index) + 1).await;
    }

    broker.grant_permission(GrantParams::new(&request.request_id)).await.unwrap();
    for call in calls {
        call.await.unwrap().unwrap();
    }

    assert_eq!(*finished.lock(), vec![0, 1, 2]);
}

/// Listener that holds dispatch open until released.
struct HeldListener {
    entered: mpsc::UnboundedSender<()>,
    release: Arc<Notify>,
}

#[async_trait]
impl PermissionCallback for HeldListener {
    async fn on_permission_requested(&self, _request: &PermissionRequest) -> Result<(), CallbackError> {
        let _ = self.entered.send(());
        self.release.notified().await;
        Ok(())
    }
}

#[tokio::test]
async fn prompt_survives_a_cancelled_requester() {
    let (broker, wallet) = broker();
    let (entered_tx, mut entered) = mpsc::unbounded_channel();
    let release = Arc::new(Notify::new());
    broker.bind_callback(
        PROTOCOL_EVENT,
        Arc::new(HeldListener {
            entered: entered_tx,
            release: release.clone(),
        }),
    );
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PROTOCOL_EVENT, recorder);

    let requester = spawn_sign(&broker, "held", "app.example.com");
    entered.recv().await.unwrap();
    requester.abort();
    assert!(requester.await.unwrap_err().is_cancelled());

    let joined = spawn_sign(&broker, "held", "app.example.com");
    let request_id = loop {
        if let Some(request) = broker.pending_requests().into_iter().next() {
            break request.request_id;
        }
        tokio::task::yield_now().await;
    };

    release.notify_one();
    let request = events.next().await;
    assert_eq!(request.request_id, request_id);
    assert_eq!(broker.pending_waiters(&request_id), 1);

    broker.grant_permission(GrantParams::new(&request_id)).await.unwrap();
    assert!(joined.await.unwrap().is_ok());
    assert!(events.try_next().is_none());
    assert_eq!(wallet.call_count("create_signature"), 1);
}

#[tokio::test]
async fn denial_parsed_from_ui_json_reaches_the_caller() {
    let (broker, _) = broker();
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PROTOCOL_EVENT, recorder);

    let call = spawn_sign(&broker, "json-deny", "app.example.com");
    let request = events.next().await;
    let params: DenyParams = serde_json::from_value(serde_json::json!({
        "requestID": request.request_id,
        "reason": "not today",
    }))
    .unwrap();
    broker.deny_permission(params).unwrap();

    let err = call.await.unwrap().unwrap_err();
    assert_matches!(err, WalletError::PermissionDenied { ref message } if message.contains("not today"));
}

#[tokio::test]
async fn different_resources_prompt_separately() {
    let (broker, _) = broker();
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PROTOCOL_EVENT, recorder);

    let first = spawn_sign(&broker, "resourceA", "user.com");
    let a = events.next().await;
    let second = spawn_sign(&broker, "resourceB", "user.com");
    let b = events.next().await;

    assert_ne!(a.request_id, b.request_id);
    assert_eq!(broker.pending_requests().len(), 2);

    broker.grant_permission(GrantParams::new(&a.request_id)).await.unwrap();
    broker.deny_permission(DenyParams::new(&b.request_id)).unwrap();

    assert!(first.await.unwrap().is_ok());
    assert!(second.await.unwrap().unwrap_err().is_permission_denied());
}

#[tokio::test]
async fn denied_waiters_all_fail_together() {
    let (broker, wallet) = broker();
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PROTOCOL_EVENT, recorder);

    let calls: Vec<_> = (0..3)
        .map(|_| spawn_sign(&broker, "shared", "app.example.com"))
        .collect();
    let request = events.next().await;
    wait_for_waiters(&broker, &request.request_id, 3).await;

    broker.deny_permission(DenyParams::new(&request.request_id)).unwrap();

    for call in calls {
        assert!(call.await.unwrap().unwrap_err().is_permission_denied());
    }
    assert_eq!(wallet.call_count("create_signature"), 0);
}

#[tokio::test]
async fn granted_resource_is_served_from_cache() {
    let (broker, wallet) = broker();
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PROTOCOL_EVENT, recorder);

    let call = spawn_sign(&broker, "cached", "app.example.com");
    let request = events.next().await;
    broker.grant_permission(GrantParams::new(&request.request_id)).await.unwrap();
    call.await.unwrap().unwrap();

    broker
        .create_signature(sign_args("cached", &[9]), "app.example.com")
        .await
        .unwrap();

    assert!(events.try_next().is_none());
    assert_eq!(wallet.call_count("create_signature"), 2);
    assert_eq!(broker.cached_permissions().len(), 1);
    assert_eq!(broker.cached_permissions()[0].0, request.request_id);
}

#[tokio::test]
async fn denials_are_not_remembered() {
    let (broker, _) = broker();
    let (recorder, mut events) = event_recorder();
    broker.bind_callback(PROTOCOL_EVENT, recorder);

    let call = spawn_sign(&broker, "retry", "app.example.com");
    let first = events.next().await;
    broker.deny_permission(DenyParams::new(&first.request_id)).unwrap();
    assert!(call.await.unwrap().is_err());

    let call = spawn_sign(&broker, "retry", "app.example.com");
    let second = events.next().await;
    assert_eq!(first.request_id, second.request_id);

    broker.grant_permission(GrantParams::new(&second.request_id)).await.unwrap();
    assert!(call.await.unwrap().is_ok());
}

#[tokio::test]
async fn listener_may_resolve_from_inside_its_handler() {
    let (broker, _) = broker();
    let weak = std::sync::Arc::downgrade(&broker);
    broker.bind_callback(
        PROTOCOL_EVENT,
        warden_permissions::callback_fn(move |request| {
            if let Some(broker) = weak.upgrade() {
                broker.deny_permission(DenyParams::new(&request.request_id).with_reason("auto"))?;
            }
            Ok(())
        }),
    );

    let err = broker
        .create_signature(sign_args("auto-deny", &[1]), "app.example.com")
        .await
        .unwrap_err();
    assert!(err.is_permission_denied());
    assert!(broker.pending_requests().is_empty());
}

#[tokio::test]
async fn request_without_listeners_stays_pending_until_resolved() {
    let (broker, _) = broker();

    let call = spawn_sign(&broker, "unattended", "app.example.com");
    let request_id = loop {
        if let Some(request) = broker.pending_requests().into_iter().next() {
            break request.request_id;
        }
        tokio::task::yield_now().await;
    };

    broker.grant_permission(GrantParams::new(&request_id)).await.unwrap();
    assert!(call.await.unwrap().is_ok());
}
