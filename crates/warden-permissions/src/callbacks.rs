//! Callback registry and event dispatch
//!
//! Listeners register per [`PermissionEvent`] and are invoked strictly in
//! registration order. Each invocation runs inside its own error boundary:
//! a listener that returns an error or panics is logged and skipped, the
//! remaining listeners still run, and nothing reaches the emitting call path.

use crate::errors::PermissionError;
use crate::request::{PermissionRequest, PermissionResource};
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Error type listeners may return.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Events announced when a new permission request is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionEvent {
    /// A protocol permission is needed
    ProtocolPermissionRequested,
    /// Basket access is needed
    BasketAccessRequested,
    /// Certificate fields are about to be revealed
    CertificateAccessRequested,
    /// A payment needs spending authorization
    SpendingAuthorizationRequested,
}

impl PermissionEvent {
    /// Every event, in declaration order.
    pub const ALL: [PermissionEvent; 4] = [
        Self::ProtocolPermissionRequested,
        Self::BasketAccessRequested,
        Self::CertificateAccessRequested,
        Self::SpendingAuthorizationRequested,
    ];

    /// Wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProtocolPermissionRequested => "onProtocolPermissionRequested",
            Self::BasketAccessRequested => "onBasketAccessRequested",
            Self::CertificateAccessRequested => "onCertificateAccessRequested",
            Self::SpendingAuthorizationRequested => "onSpendingAuthorizationRequested",
        }
    }

    /// Event announcing requests for `resource`.
    pub fn for_resource(resource: &PermissionResource) -> Self {
        match resource {
            PermissionResource::Protocol { .. } => Self::ProtocolPermissionRequested,
            PermissionResource::Basket { .. } => Self::BasketAccessRequested,
            PermissionResource::Certificate { .. } => Self::CertificateAccessRequested,
            PermissionResource::Spending { .. } => Self::SpendingAuthorizationRequested,
        }
    }
}

impl fmt::Display for PermissionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionEvent {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| PermissionError::UnknownEvent {
                name: s.to_string(),
            })
    }
}

/// A listener for permission request events.
#[async_trait]
pub trait PermissionCallback: Send + Sync {
    async fn on_permission_requested(&self, request: &PermissionRequest)
        -> Result<(), CallbackError>;
}

/// Adapter turning a closure into a [`PermissionCallback`].
pub struct FnCallback<F>(F);

#[async_trait]
impl<F> PermissionCallback for FnCallback<F>
where
    F: Fn(&PermissionRequest) -> Result<(), CallbackError> + Send + Sync,
{
    async fn on_permission_requested(
        &self,
        request: &PermissionRequest,
    ) -> Result<(), CallbackError> {
        (self.0)(request)
    }
}

/// Wrap a closure as a shareable callback handle.
///
/// Keep the returned `Arc` to unbind the listener by reference later.
pub fn callback_fn<F>(f: F) -> Arc<dyn PermissionCallback>
where
    F: Fn(&PermissionRequest) -> Result<(), CallbackError> + Send + Sync + 'static,
{
    Arc::new(FnCallback(f))
}

/// Handle returned by registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

impl CallbackId {
    /// Raw numeric value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "callback#{}", self.0)
    }
}

/// Selects a registration to remove: by handle or by handler identity.
#[derive(Clone, Copy)]
pub enum CallbackSelector<'a> {
    Id(CallbackId),
    Handler(&'a Arc<dyn PermissionCallback>),
}

impl From<CallbackId> for CallbackSelector<'_> {
    fn from(id: CallbackId) -> Self {
        Self::Id(id)
    }
}

impl<'a> From<&'a Arc<dyn PermissionCallback>> for CallbackSelector<'a> {
    fn from(handler: &'a Arc<dyn PermissionCallback>) -> Self {
        Self::Handler(handler)
    }
}

#[derive(Clone)]
struct Registration {
    id: CallbackId,
    handler: Arc<dyn PermissionCallback>,
}

impl Registration {
    fn matches(&self, selector: CallbackSelector<'_>) -> bool {
        match selector {
            CallbackSelector::Id(id) => self.id == id,
            // Compare data pointers only; vtable pointers are not unique.
            CallbackSelector::Handler(handler) => std::ptr::eq(
                Arc::as_ptr(&self.handler) as *const (),
                Arc::as_ptr(handler) as *const (),
            ),
        }
    }
}

/// A listener failure caught during dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFailure {
    /// Listener that failed
    pub id: CallbackId,
    /// Returned error or panic message
    pub message: String,
}

/// Summary of a dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Listeners invoked
    pub invoked: usize,
    /// Listeners that failed, in invocation order
    pub failures: Vec<CallbackFailure>,
}

/// Ordered per-event listener lists.
#[derive(Default)]
pub struct CallbackRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<PermissionEvent, Vec<Registration>>>,
}

impl CallbackRegistry {
    /// Registry with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the listeners of `event`.
    pub fn bind(&self, event: PermissionEvent, handler: Arc<dyn PermissionCallback>) -> CallbackId {
        let id = CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.listeners
            .lock()
            .entry(event)
            .or_default()
            .push(Registration { id, handler });
        tracing::debug!(event = %event, callback = %id, "callback bound");
        id
    }

    /// Remove the first registration matching `selector`.
    pub fn unbind<'a>(&self, event: PermissionEvent, selector: impl Into<CallbackSelector<'a>>) -> bool {
        let selector = selector.into();
        let mut listeners = self.listeners.lock();
        let Some(list) = listeners.get_mut(&event) else {
            return false;
        };
        match list.iter().position(|r| r.matches(selector)) {
            Some(index) => {
                let removed = list.remove(index);
                tracing::debug!(event = %event, callback = %removed.id, "callback unbound");
                true
            }
            None => false,
        }
    }

    /// Number of listeners bound to `event`.
    pub fn listener_count(&self, event: PermissionEvent) -> usize {
        self.listeners.lock().get(&event).map_or(0, Vec::len)
    }

    /// Invoke every listener of `event` in registration order.
    ///
    /// The listener list is snapshotted first, so listeners may bind, unbind,
    /// grant or deny from inside their handler without deadlocking.
    pub async fn dispatch(&self, event: PermissionEvent, payload: &PermissionRequest) -> DispatchReport {
        let snapshot: Vec<Registration> = self
            .listeners
            .lock()
            .get(&event)
            .cloned()
            .unwrap_or_default();

        let mut report = DispatchReport::default();
        for registration in snapshot {
            report.invoked += 1;
            let call = AssertUnwindSafe(registration.handler.on_permission_requested(payload));
            let message = match call.catch_unwind().await {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err.to_string(),
                Err(panic) => panic_message(panic.as_ref()),
            };
            tracing::warn!(
                event = %event,
                callback = %registration.id,
                request_id = %payload.request_id,
                error = %message,
                "permission callback failed"
            );
            report.failures.push(CallbackFailure {
                id: registration.id,
                message,
            });
        }
        report
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
