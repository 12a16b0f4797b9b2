//! Subscription groups
//!
//! Tracks which connected consumers want updates for which instrument.
//! The broadcaster only ever asks "who is listening to X".

mod subscriptions;
mod types;

pub use subscriptions::SubscriptionRegistry;
pub use types::ConnectionId;
