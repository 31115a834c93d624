//! Broker error handling
//!
//! [`PermissionError`] is what the broker's own operations return. At the
//! wallet boundary it collapses into [`WalletError`] so guarded calls keep the
//! wallet's signatures: denials surface as `WalletError::PermissionDenied`,
//! and failures of the underlying wallet pass through untouched.

use warden_core::{TimeError, WalletError};

/// Errors raised by the permission broker
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    /// The decision-maker denied the request
    #[error("Permission denied: request {request_id}{}", reason_suffix(.reason))]
    PermissionDenied {
        /// Resource key of the denied request
        request_id: String,
        /// Optional explanation supplied with the denial
        reason: Option<String>,
    },

    /// A non-administrative originator asked for a reserved resource
    #[error("Permission denied: {resource} is reserved for the wallet administrator")]
    ReservedResource {
        /// Human readable name of the reserved resource
        resource: String,
    },

    /// Grant or deny referenced a request that is not pending
    #[error("Unknown permission request: {request_id}")]
    UnknownRequest {
        /// The unmatched request identifier
        request_id: String,
    },

    /// Grant parameters do not fit the pending request
    #[error("Invalid grant parameters for {request_id}: {message}")]
    InvalidGrantParameters {
        /// Request the grant targeted
        request_id: String,
        /// What was wrong with the parameters
        message: String,
    },

    /// Configuration could not be parsed or validated
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Event name did not match a known permission event
    #[error("Unknown permission event: {name}")]
    UnknownEvent {
        /// The unrecognised event name
        name: String,
    },

    /// Resource key could not be parsed
    #[error("Malformed resource key '{key}': {message}")]
    MalformedKey {
        /// The offending key
        key: String,
        /// Why parsing failed
        message: String,
    },

    /// The time effect failed
    #[error("Clock error: {message}")]
    Clock {
        /// Error message from the time handler
        message: String,
    },

    /// Error raised by the underlying wallet
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(" ({reason})"),
        None => String::new(),
    }
}

impl PermissionError {
    /// Create an invalid grant parameters error
    pub fn invalid_grant(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidGrantParameters {
            request_id: request_id.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a malformed key error
    pub fn malformed_key(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedKey {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for the two denial variants.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. } | Self::ReservedResource { .. }
        )
    }
}

impl From<TimeError> for PermissionError {
    fn from(err: TimeError) -> Self {
        Self::Clock {
            message: err.to_string(),
        }
    }
}

impl From<PermissionError> for WalletError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::Wallet(inner) => inner,
            PermissionError::PermissionDenied { request_id, reason } => {
                WalletError::permission_denied(format!(
                    "request {request_id}{}",
                    reason_suffix(&reason)
                ))
            }
            PermissionError::ReservedResource { resource } => WalletError::permission_denied(
                format!("{resource} is reserved for the wallet administrator"),
            ),
            PermissionError::UnknownRequest { .. } => WalletError::not_found(err.to_string()),
            PermissionError::InvalidGrantParameters { .. }
            | PermissionError::InvalidConfig { .. }
            | PermissionError::UnknownEvent { .. }
            | PermissionError::MalformedKey { .. } => WalletError::invalid(err.to_string()),
            PermissionError::Clock { .. } => WalletError::internal(err.to_string()),
        }
    }
}

/// Broker result type
pub type PermissionResult<T> = std::result::Result<T, PermissionError>;
