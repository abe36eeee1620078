//! Per-ticket replay counters.

use std::collections::BTreeMap;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::errors::SettlementError;

/// Ticket id to the nonce the next offer on that ticket must carry.
///
/// Advanced exactly once per committed settlement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<NonceEntry>", into = "Vec<NonceEntry>")]
pub struct NonceRegistry {
    nonces: BTreeMap<U256, u64>,
}

/// Serialized form of one registry slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceEntry {
    pub ticket: U256,
    pub nonce: u64,
}

impl NonceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self, ticket: U256) -> u64 {
        self.nonces.get(&ticket).copied().unwrap_or(0)
    }

    /// Value the counter takes once the pending settlement on `ticket` commits.
    pub fn next(&self, ticket: U256) -> Result<u64, SettlementError> {
        self.current(ticket)
            .checked_add(1)
            .ok_or(SettlementError::ValueOverflow("nonce"))
    }

    pub(crate) fn store(&mut self, ticket: U256, nonce: u64) {
        self.nonces.insert(ticket, nonce);
    }

    pub fn len(&self) -> usize {
        self.nonces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nonces.is_empty()
    }

    /// JSON snapshot, ordered by ticket.
    pub fn snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn restore(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<Vec<NonceEntry>> for NonceRegistry {
    fn from(entries: Vec<NonceEntry>) -> Self {
        Self {
            nonces: entries.into_iter().map(|e| (e.ticket, e.nonce)).collect(),
        }
    }
}

impl From<NonceRegistry> for Vec<NonceEntry> {
    fn from(registry: NonceRegistry) -> Self {
        registry
            .nonces
            .into_iter()
            .map(|(ticket, nonce)| NonceEntry { ticket, nonce })
            .collect()
    }
}
