//! Fixed-cadence fan-out
//!
//! Every interval the scheduler copies the price cache and pushes one
//! `PriceUpdate` to each symbol group that has members. Consumers never
//! poll; delivery goes through whatever [`GroupSink`] the transport
//! provides.

mod scheduler;
mod types;

pub use scheduler::{BroadcastScheduler, CycleReport, DEFAULT_BROADCAST_INTERVAL};
pub use types::{DeliveryError, GroupSink, PriceUpdate};
