//! Per-symbol membership sets

use super::ConnectionId;
use crate::symbol::normalize_symbol;
use dashmap::DashMap;
use std::collections::HashSet;

/// Symbol -> set of subscribed connections.
///
/// Every mutation of one symbol's group happens under that key's shard
/// lock, so concurrent subscribe/unsubscribe calls never lose updates.
/// Groups are created on first subscribe and left as empty sets when the
/// last member leaves.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    groups: DashMap<String, HashSet<ConnectionId>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            groups: DashMap::new(),
        }
    }

    /// Add `connection` to the symbol's group. Returns false if it was already a member.
    pub fn subscribe(&self, connection: ConnectionId, symbol: &str) -> bool {
        self.groups
            .entry(normalize_symbol(symbol))
            .or_default()
            .insert(connection)
    }

    /// Remove `connection` from the symbol's group. Returns false if it was not a member.
    pub fn unsubscribe(&self, connection: ConnectionId, symbol: &str) -> bool {
        match self.groups.get_mut(&normalize_symbol(symbol)) {
            Some(mut group) => group.remove(&connection),
            None => false,
        }
    }

    /// Drop `connection` from every group; returns how many groups it left
    pub fn remove_connection(&self, connection: ConnectionId) -> usize {
        let mut left = 0;
        for mut group in self.groups.iter_mut() {
            if group.value_mut().remove(&connection) {
                left += 1;
            }
        }
        left
    }

    /// Current members of a symbol's group
    pub fn members_of(&self, symbol: &str) -> Vec<ConnectionId> {
        self.groups
            .get(&normalize_symbol(symbol))
            .map(|group| group.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of members in a symbol's group
    pub fn member_count(&self, symbol: &str) -> usize {
        self.groups
            .get(&normalize_symbol(symbol))
            .map(|group| group.len())
            .unwrap_or(0)
    }

    /// Symbols a connection is currently subscribed to
    pub fn symbols_for(&self, connection: ConnectionId) -> Vec<String> {
        self.groups
            .iter()
            .filter(|group| group.value().contains(&connection))
            .map(|group| group.key().clone())
            .collect()
    }

    /// True if a group exists for the symbol, even if it is empty
    pub fn has_group(&self, symbol: &str) -> bool {
        self.groups.contains_key(&normalize_symbol(symbol))
    }
}
