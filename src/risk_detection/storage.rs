//! Bounded transaction store
//!
//! Most-recent-first ring of classified transactions. Writers take the lock
//! for a single push/evict; readers get an owned copy.

use parking_lot::RwLock;
use std::collections::VecDeque;

use crate::risk_detection::{
    errors::{MonitorError, Result},
    rules::RiskTier,
    StoredTransaction,
};

/// Capacity of the store behind the HTTP API
pub const DEFAULT_API_CAPACITY: usize = 100;
/// Capacity of the store behind the dashboard
pub const DEFAULT_DASHBOARD_CAPACITY: usize = 20;

pub struct TransactionStore {
    entries: RwLock<VecDeque<StoredTransaction>>,
    capacity: usize,
}

impl TransactionStore {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(MonitorError::Configuration(
                "transaction store capacity must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity + 1)),
            capacity,
        })
    }

    /// Insert at the front, evicting the oldest entry past capacity
    pub fn add(&self, transaction: StoredTransaction) {
        let mut entries = self.entries.write();
        entries.push_front(transaction);
        while entries.len() > self.capacity {
            entries.pop_back();
        }
    }

    /// Snapshot in current order, optionally restricted to one tier
    pub fn list(&self, filter: Option<RiskTier>) -> Vec<StoredTransaction> {
        let entries = self.entries.read();
        match filter {
            Some(tier) => entries
                .iter()
                .filter(|tx| tx.classification.tier == tier)
                .cloned()
                .collect(),
            None => entries.iter().cloned().collect(),
        }
    }

    /// Full snapshot
    pub fn snapshot(&self) -> Vec<StoredTransaction> {
        self.list(None)
    }

    pub fn get(&self, hash: &str) -> Option<StoredTransaction> {
        self.entries
            .read()
            .iter()
            .find(|tx| tx.transaction.hash == hash)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TransactionStore {
    fn default() -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(DEFAULT_API_CAPACITY + 1)),
            capacity: DEFAULT_API_CAPACITY,
        }
    }
}
