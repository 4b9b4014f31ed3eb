//! Per-loop working sets and the status each loop publishes.

use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::blockchain::types::Address;
use crate::requests::Candidate;

/// Requests a loop is working on in the current cycle, keyed by request id.
///
/// Owned by exactly one loop; other tasks only ever see a [`LoopStatus`] copy.
#[derive(Debug, Default, Clone)]
pub struct PendingSet {
    entries: BTreeMap<u64, Address>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with this cycle's candidates.
    pub fn rebuild(&mut self, candidates: &[Candidate]) {
        self.entries = candidates.iter().map(|c| (c.id, c.address)).collect();
    }

    pub fn insert(&mut self, candidate: Candidate) {
        self.entries.insert(candidate.id, candidate.address);
    }

    /// Drop a request whose transition was committed (or re-routed).
    pub fn remove(&mut self, id: u64) -> Option<Address> {
        self.entries.remove(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Candidates in ascending id order.
    pub fn candidates(&self) -> Vec<Candidate> {
        self.entries
            .iter()
            .map(|(id, address)| Candidate { id: *id, address: *address })
            .collect()
    }
}

/// What happened in one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    /// Candidates considered.
    pub candidates: usize,
    /// Transitions pushed to the request service.
    pub committed: usize,
    /// Transactions accepted by the chain.
    pub submitted: usize,
    /// Requests sent back to account creation.
    pub rerouted: usize,
    /// Requests whose processing failed and will be retried.
    pub failed: usize,
}

/// Summary of the most recent cycle of a loop.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    /// Unix seconds.
    pub finished_at: u64,
    pub stats: CycleStats,
    /// Set when the cycle could not run at all.
    pub error: Option<String>,
}

/// Published by each loop after every cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoopStatus {
    pub pending: Vec<Candidate>,
    pub last_cycle: Option<CycleReport>,
}
