//! Client hub
//!
//! Connection table, subscribe/unsubscribe command handling with audit
//! records, and the [`GroupSink`](crate::broadcast::GroupSink) that puts
//! price updates on each member's outbound queue.

mod connections;
mod messages;

pub use connections::{Hub, HubError, DEFAULT_CLIENT_QUEUE};
pub use messages::{ClientCommand, ServerEvent};
