//! Callback recorders
//!
//! Tests wait on dispatched events through a channel instead of sleeping.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use warden_permissions::{callback_fn, PermissionCallback, PermissionRequest};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Receiving side of an [`event_recorder`].
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<PermissionRequest>,
}

impl EventStream {
    /// Wait for the next dispatched request.
    ///
    /// Panics if none arrives within a few seconds, so a missing dispatch
    /// fails the test instead of hanging it.
    pub async fn next(&mut self) -> PermissionRequest {
        match tokio::time::timeout(EVENT_TIMEOUT, self.rx.recv()).await {
            Ok(Some(request)) => request,
            Ok(None) => panic!("event recorder was dropped"),
            Err(_) => panic!("no permission event dispatched within {EVENT_TIMEOUT:?}"),
        }
    }

    /// The next request if one has already been dispatched.
    pub fn try_next(&mut self) -> Option<PermissionRequest> {
        self.rx.try_recv().ok()
    }

    /// Drain everything dispatched so far.
    pub fn drain(&mut self) -> Vec<PermissionRequest> {
        let mut out = Vec::new();
        while let Some(request) = self.try_next() {
            out.push(request);
        }
        out
    }
}

/// A callback that forwards every payload to the returned stream.
pub fn event_recorder() -> (Arc<dyn PermissionCallback>, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = callback_fn(move |request| {
        tx.send(request.clone())
            .map_err(|_| "event stream closed".into())
    });
    (handler, EventStream { rx })
}
