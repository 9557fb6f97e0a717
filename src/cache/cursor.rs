use std::collections::HashMap;

/// Per-cache sync bookkeeping.
///
/// Every local mutation bumps a revision counter. A dirty entry or a delete
/// tombstone is only cleared when the revision that was pushed is still the
/// current one, which makes late completions of stale pushes harmless.
#[derive(Debug, Clone, Default)]
pub struct SyncCursor {
    last_pull: Option<i64>,
    revision: u64,
    dirty: HashMap<String, u64>,
    tombstones: HashMap<String, u64>,
}

impl SyncCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp (epoch millis) of the last successful pull.
    pub fn last_pull(&self) -> Option<i64> {
        self.last_pull
    }

    pub fn record_pull(&mut self, at: i64) {
        self.last_pull = Some(at);
    }

    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    /// Mark `id` as locally modified and return its new revision.
    pub fn mark_dirty(&mut self, id: &str) -> u64 {
        let revision = self.next_revision();
        self.tombstones.remove(id);
        self.dirty.insert(id.to_string(), revision);
        revision
    }

    /// Record a pending remote delete for `id`.
    pub fn mark_deleted(&mut self, id: &str) -> u64 {
        let revision = self.next_revision();
        self.dirty.remove(id);
        self.tombstones.insert(id.to_string(), revision);
        revision
    }

    pub fn revision_of(&self, id: &str) -> Option<u64> {
        self.dirty.get(id).copied()
    }

    pub fn is_dirty(&self, id: &str) -> bool {
        self.dirty.contains_key(id)
    }

    pub fn is_tombstoned(&self, id: &str) -> bool {
        self.tombstones.contains_key(id)
    }

    /// Clear the dirty flag if `revision` is still current.
    pub fn clear_dirty(&mut self, id: &str, revision: u64) -> bool {
        if self.dirty.get(id) == Some(&revision) {
            self.dirty.remove(id);
            true
        } else {
            false
        }
    }

    /// Drop the tombstone if `revision` is still current.
    pub fn clear_tombstone(&mut self, id: &str, revision: u64) -> bool {
        if self.tombstones.get(id) == Some(&revision) {
            self.tombstones.remove(id);
            true
        } else {
            false
        }
    }

    /// Forget all state about `id`.
    pub fn forget(&mut self, id: &str) {
        self.dirty.remove(id);
        self.tombstones.remove(id);
    }

    /// Move the dirty entry of `old` to `new`.
    pub fn rename(&mut self, old: &str, new: &str) {
        if let Some(revision) = self.dirty.remove(old) {
            self.dirty.insert(new.to_string(), revision);
        }
    }

    pub fn dirty_ids(&self) -> Vec<String> {
        self.dirty.keys().cloned().collect()
    }

    pub fn tombstones(&self) -> Vec<(String, u64)> {
        self.tombstones.iter().map(|(id, rev)| (id.clone(), *rev)).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.dirty.len() + self.tombstones.len()
    }

    /// Drop dirty and tombstone state; keeps the revision counter running.
    pub fn reset(&mut self) {
        self.dirty.clear();
        self.tombstones.clear();
    }
}
