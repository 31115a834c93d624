//! # Warden Core - Wallet Operation Vocabulary
//!
//! Foundation types shared by every Warden crate: the wallet capability trait,
//! its argument and result types, the unified [`WalletError`], and the time
//! effect used for expiry decisions.

pub mod effects;
pub mod errors;
pub mod types;
pub mod wallet;

pub use effects::{PhysicalTime, PhysicalTimeEffects, SystemTimeHandler, TimeError};
pub use errors::{WalletError, WalletResult};
pub use types::*;
pub use wallet::WalletInterface;
