// src/matching/selector.rs

use log::debug;

use crate::models::{AssignmentSnapshot, DistanceAnnotatedResponder, SnapshotEntry};

/// The in-progress set of responders chosen for one assignment.
///
/// No two entries ever match under [`SnapshotEntry::same_responder`]:
/// toggling a match removes it, toggling anything else appends it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    entries: Vec<SnapshotEntry>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a selection from a stored snapshot when reopening an assignment
    pub fn from_snapshot(snapshot: &AssignmentSnapshot) -> Self {
        let mut selection = Self::new();
        selection.seed(snapshot);
        selection
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entry: &SnapshotEntry) -> bool {
        self.entries.iter().any(|existing| existing.same_responder(entry))
    }

    pub fn is_selected(&self, candidate: &DistanceAnnotatedResponder) -> bool {
        self.contains(&candidate.to_snapshot_entry())
    }

    pub fn toggle(&mut self, candidate: &DistanceAnnotatedResponder) {
        self.toggle_entry(candidate.to_snapshot_entry());
    }

    /// Removes the earliest entry matching `entry`, or appends `entry` when
    /// nothing matches. An id-less entry can match several entries with
    /// distinct ids; only the earliest is removed per call.
    pub fn toggle_entry(&mut self, entry: SnapshotEntry) {
        match self
            .entries
            .iter()
            .position(|existing| existing.same_responder(&entry))
        {
            Some(index) => {
                let removed = self.entries.remove(index);
                debug!("Deselected responder {}", removed.name);
            }
            None => {
                debug!("Selected responder {}", entry.name);
                self.entries.push(entry);
            }
        }
    }

    /// Replaces the whole selection with the first `n` ranked candidates.
    /// Candidates that match an earlier one are skipped, so fewer than `n`
    /// entries can result.
    pub fn auto_select_nearest(&mut self, ranked: &[DistanceAnnotatedResponder], n: usize) {
        self.entries.clear();
        for candidate in ranked.iter().take(n) {
            self.push_unique(candidate.to_snapshot_entry());
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replaces the selection with a stored snapshot's entries. Duplicates in
    /// the snapshot collapse onto their first occurrence.
    pub fn seed(&mut self, snapshot: &AssignmentSnapshot) {
        self.entries.clear();
        for entry in &snapshot.entries {
            self.push_unique(entry.clone());
        }
    }

    // First occurrence wins
    fn push_unique(&mut self, entry: SnapshotEntry) {
        if !self.contains(&entry) {
            self.entries.push(entry);
        }
    }

    pub fn into_entries(self) -> Vec<SnapshotEntry> {
        self.entries
    }
}
