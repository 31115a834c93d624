//! # Warden Testkit
//!
//! Test doubles for the permission broker's collaborators: a recording
//! wallet, a manual clock, event recorders, and one-time tracing setup.

pub mod events;
pub mod time;
pub mod wallet;

pub use events::{event_recorder, EventStream};
pub use time::ManualClock;
pub use wallet::{MockWallet, RecordedCall};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static TRACING: OnceCell<()> = OnceCell::new();

/// Install a test-writer tracing subscriber once per process.
///
/// Honours `RUST_LOG`; silent by default.
pub fn init_test_tracing() {
    TRACING.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Originator configured as administrator in the standard fixtures.
pub const ADMIN_ORIGINATOR: &str = "admin.domain.com";
