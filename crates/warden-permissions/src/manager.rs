//! The permissions manager
//!
//! [`PermissionsManager`] owns all broker state for one wrapped wallet: the
//! grant cache, the pending request store and the callback registry. There is
//! no global state; two managers never share grants.
//!
//! ## Lock usage
//!
//! The cache and the pending store sit behind one `parking_lot::Mutex` so the
//! cache check, the pending-entry lookup and its creation happen in a single
//! critical section, as do cache population and waiter release on a grant.
//! The lock is never held across an await; callbacks run after it is dropped.
//!
//! ## Announcements
//!
//! A new request is announced to listeners from a task spawned on the current
//! Tokio runtime, so the announcement completes even if the caller that raised
//! the request is cancelled while listeners are still running.

use crate::cache::{CachedPermission, PermissionCache, SpendingAllowance};
use crate::callbacks::{CallbackId, CallbackRegistry, CallbackSelector, PermissionCallback, PermissionEvent};
use crate::config::{PermissionsConfig, UnknownRequestPolicy};
use crate::errors::{PermissionError, PermissionResult};
use crate::pending::{PendingRequests, PermissionOutcome};
use crate::policy;
use crate::request::{
    BasketUsage, DenyParams, GrantParams, PermissionRequest, PermissionResource, ProtocolUsage, SpendingLineItem,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use warden_core::{
    Counterparty, PhysicalTime, PhysicalTimeEffects, SecurityLevel, SystemTimeHandler,
    WalletInterface, WalletProtocol,
};

#[derive(Default)]
struct BrokerState {
    cache: PermissionCache,
    pending: PendingRequests,
}

/// Permission broker wrapping a wallet.
pub struct PermissionsManager<W> {
    wallet: W,
    admin_originator: String,
    config: PermissionsConfig,
    time: Arc<dyn PhysicalTimeEffects>,
    state: Mutex<BrokerState>,
    callbacks: Arc<CallbackRegistry>,
}

/// Builder for [`PermissionsManager`].
pub struct PermissionsManagerBuilder<W> {
    wallet: W,
    admin_originator: String,
    config: PermissionsConfig,
    time: Arc<dyn PhysicalTimeEffects>,
}

impl<W: WalletInterface> PermissionsManagerBuilder<W> {
    /// Use `config` instead of the defaults.
    pub fn config(mut self, config: PermissionsConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the system clock, e.g. with a controllable test clock.
    pub fn time(mut self, time: Arc<dyn PhysicalTimeEffects>) -> Self {
        self.time = time;
        self
    }

    /// Finish with empty cache, pending store and registry.
    pub fn build(self) -> PermissionsManager<W> {
        PermissionsManager {
            wallet: self.wallet,
            admin_originator: self.admin_originator,
            config: self.config,
            time: self.time,
            state: Mutex::new(BrokerState::default()),
            callbacks: Arc::new(CallbackRegistry::new()),
        }
    }
}

impl<W: WalletInterface> PermissionsManager<W> {
    /// Wrap `wallet` with default configuration and the system clock.
    pub fn new(wallet: W, admin_originator: impl Into<String>) -> Self {
        Self::builder(wallet, admin_originator).build()
    }

    /// Start configuring a manager around `wallet`.
    pub fn builder(wallet: W, admin_originator: impl Into<String>) -> PermissionsManagerBuilder<W> {
        PermissionsManagerBuilder {
            wallet,
            admin_originator: admin_originator.into(),
            config: PermissionsConfig::default(),
            time: Arc::new(SystemTimeHandler),
        }
    }

    /// The wrapped wallet.
    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    /// Originator that bypasses every gate.
    pub fn admin_originator(&self) -> &str {
        &self.admin_originator
    }

    /// Active configuration.
    pub fn config(&self) -> &PermissionsConfig {
        &self.config
    }

    /// Whether calls from `originator` bypass every gate.
    pub fn is_admin(&self, originator: &str) -> bool {
        originator == self.admin_originator
    }

    // -----------------------------------------------------------------------
    // Callbacks
    // -----------------------------------------------------------------------

    /// Register a listener for `event`.
    pub fn bind_callback(
        &self,
        event: PermissionEvent,
        handler: Arc<dyn PermissionCallback>,
    ) -> CallbackId {
        self.callbacks.bind(event, handler)
    }

    /// Remove a listener by handle or by the handler it was bound with.
    pub fn unbind_callback<'a>(
        &self,
        event: PermissionEvent,
        selector: impl Into<CallbackSelector<'a>>,
    ) -> bool {
        self.callbacks.unbind(event, selector)
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Grant a pending request, cache the grant and release its callers.
    ///
    /// A spending grant is debited once for every caller actually released;
    /// callers dropped while waiting are not charged.
    pub async fn grant_permission(&self, params: GrantParams) -> PermissionResult<()> {
        let now = self.now().await?;
        let resolved = {
            let mut state = self.state.lock();
            match state.pending.get(&params.request_id) {
                Some(entry) => validate_grant(entry.request(), &params)?,
                None => return self.unknown_request(&params.request_id, "grant"),
            }
            let resolved = state
                .pending
                .resolve(&params.request_id, PermissionOutcome::Granted);
            if let Some(resolved) = &resolved {
                state
                    .cache
                    .store(&resolved.request, &params, now.as_secs(), resolved.released);
            }
            resolved
        };
        if let Some(resolved) = resolved {
            info!(
                request_id = %params.request_id,
                originator = %resolved.request.originator,
                released = resolved.released,
                expiry = ?params.expiry,
                ephemeral = params.ephemeral,
                "permission granted"
            );
        }
        Ok(())
    }

    /// Deny a pending request; every caller waiting on it fails.
    ///
    /// Denials are not cached, so the next identical call prompts again.
    pub fn deny_permission(&self, params: DenyParams) -> PermissionResult<()> {
        let DenyParams { request_id, reason } = params;
        let resolved = self.state.lock().pending.resolve(
            &request_id,
            PermissionOutcome::Denied {
                reason: reason.clone(),
            },
        );
        match resolved {
            Some(resolved) => {
                info!(
                    request_id = %request_id,
                    originator = %resolved.request.originator,
                    released = resolved.released,
                    reason = ?reason,
                    "permission denied"
                );
                Ok(())
            }
            None => self.unknown_request(&request_id, "deny"),
        }
    }

    /// Drop a cached grant or spending allowance.
    pub fn revoke_permission(&self, key: &str) -> bool {
        let revoked = self.state.lock().cache.revoke(key);
        if revoked {
            info!(key = %key, "permission revoked");
        }
        revoked
    }

    /// Requests currently awaiting a decision, oldest first.
    pub fn pending_requests(&self) -> Vec<PermissionRequest> {
        self.state.lock().pending.requests()
    }

    /// Number of callers suspended on `request_id`; zero once it is resolved.
    pub fn pending_waiters(&self, request_id: &str) -> usize {
        self.state
            .lock()
            .pending
            .get(request_id)
            .map_or(0, |entry| entry.waiter_count())
    }

    /// Snapshot of cached resource grants.
    pub fn cached_permissions(&self) -> Vec<(String, CachedPermission)> {
        self.state.lock().cache.entries()
    }

    /// Current spending allowance of `originator`.
    pub fn spending_allowance(&self, originator: &str, privileged: bool) -> Option<SpendingAllowance> {
        let privileged = self.normalise_privileged(privileged);
        self.state.lock().cache.allowance(originator, privileged).cloned()
    }

    fn unknown_request(&self, request_id: &str, action: &'static str) -> PermissionResult<()> {
        match self.config.unknown_request_policy {
            UnknownRequestPolicy::Ignore => {
                warn!(request_id = %request_id, action, "no pending permission request with this id");
                Ok(())
            }
            UnknownRequestPolicy::Reject => Err(PermissionError::UnknownRequest {
                request_id: request_id.to_string(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Gates
    // -----------------------------------------------------------------------

    /// Ensure `request` is authorized, suspending until a decision if needed.
    pub(crate) async fn ensure(&self, request: PermissionRequest) -> PermissionResult<()> {
        let now = self.now().await?;
        let request = request.created_at(now.ts_ms);

        let (waiter, is_new) = {
            let mut state = self.state.lock();
            if state.cache.check(&request, now.as_secs()) {
                debug!(request_id = %request.request_id, "permission cache hit");
                return Ok(());
            }
            state.pending.get_or_create(request.clone())
        };

        if is_new {
            self.announce(request.clone()).await;
        } else {
            debug!(request_id = %request.request_id, "joined pending permission request");
        }

        match waiter.outcome().await {
            PermissionOutcome::Granted => Ok(()),
            PermissionOutcome::Denied { reason } => Err(PermissionError::PermissionDenied {
                request_id: request.request_id,
                reason,
            }),
        }
    }

    /// Hand a new request to its listeners.
    ///
    /// Runs detached when a Tokio runtime is available; otherwise the
    /// listeners run inline on the caller's future.
    async fn announce(&self, request: PermissionRequest) {
        let event = PermissionEvent::for_resource(&request.resource);
        info!(
            request_id = %request.request_id,
            originator = %request.originator,
            event = %event,
            "permission requested"
        );
        let callbacks = Arc::clone(&self.callbacks);
        let announcement = async move {
            let report = callbacks.dispatch(event, &request).await;
            if report.invoked == 0 {
                warn!(
                    request_id = %request.request_id,
                    event = %event,
                    "no listeners bound; request stays pending until granted or denied"
                );
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(announcement);
            }
            Err(_) => announcement.await,
        }
    }

    /// Gate a protocol use. Level 0 protocols are always open.
    pub(crate) async fn ensure_protocol(
        &self,
        originator: &str,
        privileged: bool,
        protocol_id: &WalletProtocol,
        counterparty: Counterparty,
        usage: ProtocolUsage,
        reason: Option<String>,
    ) -> PermissionResult<()> {
        if protocol_id.security_level == SecurityLevel::Silent {
            return Ok(());
        }
        policy::check_protocol(protocol_id)?;
        if !self.config.seeks_protocol(usage) {
            return Ok(());
        }
        let request = PermissionRequest::protocol(
            originator,
            self.normalise_privileged(privileged),
            protocol_id.clone(),
            counterparty,
            usage,
        )
        .with_reason(reason);
        self.ensure(request).await
    }

    /// Gate a use of an internal wallet protocol, such as certificate listing.
    pub(crate) async fn ensure_generic(
        &self,
        originator: &str,
        privileged: bool,
        protocol_name: String,
        enabled: bool,
        reason: Option<String>,
    ) -> PermissionResult<()> {
        if !enabled {
            return Ok(());
        }
        let request = PermissionRequest::protocol(
            originator,
            self.normalise_privileged(privileged),
            WalletProtocol::new(SecurityLevel::App, protocol_name),
            Counterparty::Myself,
            ProtocolUsage::Generic,
        )
        .with_reason(reason);
        self.ensure(request).await
    }

    /// Gate basket access; reserved baskets are refused outright.
    pub(crate) async fn ensure_basket(
        &self,
        originator: &str,
        basket: &str,
        usage: BasketUsage,
        reason: Option<String>,
    ) -> PermissionResult<()> {
        policy::check_basket(basket)?;
        if !self.config.seeks_basket(usage) {
            return Ok(());
        }
        self.ensure(PermissionRequest::basket(originator, basket, usage).with_reason(reason))
            .await
    }

    pub(crate) async fn ensure_label(
        &self,
        originator: &str,
        label: &str,
        enabled: bool,
    ) -> PermissionResult<()> {
        policy::check_label(label)?;
        self.ensure_generic(originator, false, format!("action label {label}"), enabled, None)
            .await
    }

    pub(crate) async fn ensure_certificate_disclosure(
        &self,
        originator: &str,
        privileged: bool,
        verifier: &str,
        cert_type: &str,
        fields: &[String],
        reason: Option<String>,
    ) -> PermissionResult<()> {
        if !self.config.seek_certificate_disclosure_permissions {
            return Ok(());
        }
        let request = PermissionRequest::certificate(
            originator,
            self.normalise_privileged(privileged),
            verifier,
            cert_type,
            fields.iter().cloned(),
        )
        .with_reason(reason);
        self.ensure(request).await
    }

    pub(crate) async fn ensure_spending(
        &self,
        originator: &str,
        satoshis: u64,
        line_items: Vec<SpendingLineItem>,
        reason: Option<String>,
    ) -> PermissionResult<()> {
        if satoshis == 0 || !self.config.seek_spending_permissions {
            return Ok(());
        }
        let request = PermissionRequest::spending(originator, satoshis)
            .with_line_items(line_items)
            .with_reason(reason);
        self.ensure(request).await
    }

    fn normalise_privileged(&self, privileged: bool) -> bool {
        privileged && self.config.differentiate_privileged_operations
    }

    async fn now(&self) -> PermissionResult<PhysicalTime> {
        Ok(self.time.physical_time().await?)
    }
}

fn validate_grant(request: &PermissionRequest, params: &GrantParams) -> PermissionResult<()> {
    if params.expiry == Some(0) {
        return Err(PermissionError::invalid_grant(
            &params.request_id,
            "expiry must be a positive timestamp",
        ));
    }
    match (&request.resource, params.amount) {
        (PermissionResource::Spending { satoshis, .. }, Some(amount)) if amount < *satoshis => {
            Err(PermissionError::invalid_grant(
                &params.request_id,
                format!("amount {amount} is below the requested {satoshis} satoshis"),
            ))
        }
        (PermissionResource::Spending { .. }, _) | (_, None) => Ok(()),
        (_, Some(_)) => Err(PermissionError::invalid_grant(
            &params.request_id,
            "amount only applies to spending requests",
        )),
    }
}
