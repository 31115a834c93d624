//! Effect traits consumed by the permission broker.

pub mod time;

pub use time::{PhysicalTime, PhysicalTimeEffects, SystemTimeHandler, TimeError};
