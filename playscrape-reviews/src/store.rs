//! Dedup/merge store for one app's crawl.
//!
//! A virtualized review list re-renders reviews it has already shown (new DOM
//! nodes, reshuffled order), so every pass re-reads overlapping content. The
//! store keys records by their content-derived [`IdentityKey`] and keeps the
//! first-seen order.
use crate::record::{IdentityKey, ReviewRecord};
use indexmap::map::Entry;
use indexmap::IndexMap;

/// Result of offering one record to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Duplicate,
}

#[derive(Debug, Default)]
pub struct ReviewStore {
    records: IndexMap<IdentityKey, ReviewRecord>,
}

impl ReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `candidate` unless a record with the same identity is present.
    /// Duplicates leave the first-seen record untouched.
    pub fn merge(&mut self, candidate: ReviewRecord) -> MergeOutcome {
        match self.records.entry(candidate.identity_key.clone()) {
            Entry::Occupied(_) => MergeOutcome::Duplicate,
            Entry::Vacant(slot) => {
                slot.insert(candidate);
                MergeOutcome::Inserted
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in discovery order.
    pub fn records(&self) -> impl Iterator<Item = &ReviewRecord> {
        self.records.values()
    }

    pub fn into_records(self) -> Vec<ReviewRecord> {
        self.records.into_values().collect()
    }
}
