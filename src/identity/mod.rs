//! Identity collaborator
//!
//! Turns whatever credential a connection presented into a verified user
//! id. The relay never checks credentials itself; it only asks a provider.

mod static_tokens;

pub use static_tokens::StaticTokenIdentity;

use serde::{Deserialize, Serialize};
use std::fmt;

const ANONYMOUS: &str = "anonymous";

/// Verified user identifier, or the anonymous sentinel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Sentinel used when no verified identity is available
    pub fn anonymous() -> Self {
        Self(ANONYMOUS.to_string())
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves a connection credential to a user id
pub trait IdentityProvider: Send + Sync {
    /// `credential` is the raw token presented during the handshake, if any
    fn identify(&self, credential: Option<&str>) -> UserId;
}

/// Provider that treats every connection as anonymous
#[derive(Debug, Default, Clone, Copy)]
pub struct AnonymousIdentity;

impl IdentityProvider for AnonymousIdentity {
    fn identify(&self, _credential: Option<&str>) -> UserId {
        UserId::anonymous()
    }
}
