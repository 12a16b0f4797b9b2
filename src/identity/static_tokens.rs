//! Token table identity provider

use super::{IdentityProvider, UserId};
use std::collections::HashMap;

/// Maps pre-shared bearer tokens to user ids.
///
/// Unknown or missing tokens resolve to the anonymous user.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenIdentity {
    tokens: HashMap<String, String>,
}

impl StaticTokenIdentity {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

impl IdentityProvider for StaticTokenIdentity {
    fn identify(&self, credential: Option<&str>) -> UserId {
        credential
            .and_then(|token| self.tokens.get(token))
            .map(UserId::new)
            .unwrap_or_else(UserId::anonymous)
    }
}
