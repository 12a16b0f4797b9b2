//! Client-facing message types

use crate::broadcast::PriceUpdate;
use serde::{Deserialize, Serialize};

/// Commands a client may send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    SubscribeToSymbol { symbol: String },
    UnsubscribeFromSymbol { symbol: String },
}

/// Events pushed to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Latest price for a symbol the client is subscribed to
    PriceUpdate(PriceUpdate),
    /// Subscription acknowledged (upper-cased symbol)
    Subscribed { symbol: String },
    /// Unsubscription acknowledged (upper-cased symbol)
    Unsubscribed { symbol: String },
    /// Command rejected
    Error { message: String },
}
