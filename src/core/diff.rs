//! Environment comparison.
//!
//! Compares the key sets and displayed values of two environments.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::types::Key;

/// How a key compares between the left and right side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    /// Present on both sides with the same displayed value.
    Same,
    /// Present on both sides with different values.
    Changed,
    /// Only present on the left.
    LeftOnly,
    /// Only present on the right.
    RightOnly,
}

/// A single key in a comparison.
#[derive(Debug, Clone)]
pub struct DiffEntry {
    key: Key,
    left: Option<String>,
    right: Option<String>,
    status: EntryStatus,
}

impl DiffEntry {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn left(&self) -> Option<&str> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&str> {
        self.right.as_deref()
    }

    pub fn status(&self) -> &EntryStatus {
        &self.status
    }
}

/// The full comparison of two environments' displayed values.
#[derive(Debug)]
pub struct Diff {
    entries: Vec<DiffEntry>,
}

impl Diff {
    /// Compare two `key -> displayed value` views.
    ///
    /// Entries come out sorted by key.
    pub fn compute(left: &BTreeMap<Key, String>, right: &BTreeMap<Key, String>) -> Self {
        let keys: BTreeSet<&Key> = left.keys().chain(right.keys()).collect();

        let entries = keys
            .into_iter()
            .map(|key| {
                let l = left.get(key).cloned();
                let r = right.get(key).cloned();
                let status = match (&l, &r) {
                    (Some(a), Some(b)) if a == b => EntryStatus::Same,
                    (Some(_), Some(_)) => EntryStatus::Changed,
                    (Some(_), None) => EntryStatus::LeftOnly,
                    (None, _) => EntryStatus::RightOnly,
                };
                DiffEntry {
                    key: key.clone(),
                    left: l,
                    right: r,
                    status,
                }
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[DiffEntry] {
        &self.entries
    }

    /// Entries that differ, including keys missing on one side.
    pub fn changes(&self) -> Vec<&DiffEntry> {
        self.entries
            .iter()
            .filter(|e| e.status != EntryStatus::Same)
            .collect()
    }

    /// Whether both sides are identical.
    pub fn is_same(&self) -> bool {
        self.entries.iter().all(|e| e.status == EntryStatus::Same)
    }
}

/// Keys present on one side only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyComparison {
    pub only_left: Vec<Key>,
    pub only_right: Vec<Key>,
}

impl KeyComparison {
    /// Whether both sides have exactly the same keys.
    pub fn matches(&self) -> bool {
        self.only_left.is_empty() && self.only_right.is_empty()
    }
}

/// Compare two key lists, ignoring values.
pub fn compare_keys(left: &[Key], right: &[Key]) -> KeyComparison {
    let l: BTreeSet<&Key> = left.iter().collect();
    let r: BTreeSet<&Key> = right.iter().collect();

    KeyComparison {
        only_left: l.difference(&r).map(|k| (*k).clone()).collect(),
        only_right: r.difference(&l).map(|k| (*k).clone()).collect(),
    }
}
