//! Drift ledger for remote renames and deletes that failed
//!
//! Renames and deletes are applied locally before the network answers and
//! are never rolled back. When the remote half fails, the id is recorded
//! here and repaired against the next successful remote listing.

use std::collections::{HashMap, HashSet};

use crate::gateway::RemoteSession;

/// Repairs computed from the ledger and a fresh remote listing
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RepairPlan {
    /// Local titles to reset to the remote value: `(id, remote_title)`
    pub titles: Vec<(String, String)>,
    /// Remote deletes to issue again
    pub deletes: Vec<String>,
}

impl RepairPlan {
    /// Returns `true` when nothing needs repairing
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty() && self.deletes.is_empty()
    }
}

/// Ids whose remote rename or delete failed
#[derive(Debug, Default)]
pub struct DriftLedger {
    failed_renames: HashSet<String>,
    failed_deletes: HashSet<String>,
}

impl DriftLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that the remote rename of `id` failed
    pub fn record_failed_rename(&mut self, id: &str) {
        self.failed_renames.insert(id.to_string());
    }

    /// Remember that the remote delete of `id` failed
    pub fn record_failed_delete(&mut self, id: &str) {
        self.failed_renames.remove(id);
        self.failed_deletes.insert(id.to_string());
    }

    /// Forget a pending rename repair, e.g. after a later rename succeeded
    pub fn clear_rename(&mut self, id: &str) {
        self.failed_renames.remove(id);
    }

    /// Number of ids awaiting repair
    pub fn len(&self) -> usize {
        self.failed_renames.len() + self.failed_deletes.len()
    }

    /// Returns `true` when no drift is recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain the ledger into a repair plan against `remote`
    ///
    /// Failed renames whose session still exists remotely get their local
    /// title reset to the remote one. Failed deletes whose session still
    /// exists remotely are re-issued. Entries for sessions the remote no
    /// longer has are dropped.
    pub fn plan(&mut self, remote: &[RemoteSession]) -> RepairPlan {
        let by_id: HashMap<&str, &RemoteSession> =
            remote.iter().map(|r| (r.id.as_str(), r)).collect();

        let mut plan = RepairPlan::default();

        for id in self.failed_renames.drain() {
            if let Some(r) = by_id.get(id.as_str()) {
                plan.titles.push((id, r.title.clone()));
            }
        }

        for id in self.failed_deletes.drain() {
            if by_id.contains_key(id.as_str()) {
                plan.deletes.push(id);
            }
        }

        plan.titles.sort();
        plan.deletes.sort();
        plan
    }
}
