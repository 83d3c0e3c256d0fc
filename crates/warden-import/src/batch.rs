//! The in-progress batch: write operations plus lookup tables over them

use std::collections::HashMap;
use warden_domain::{EntryId, NativeId, PortablePunishment, UniquenessKey, UniquenessPolicy};

/// Why a record folded into another one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Lost to the record it folded into
    Rejected,

    /// Was the winner until a later record took over
    Superseded,
}

/// A record that does not become an entry of its own but still gets provenance
#[derive(Debug, Clone, PartialEq)]
pub struct AbsorbedRecord {
    /// Native id of the absorbed record
    pub native_id: NativeId,
    /// The record as imported
    pub punishment: PortablePunishment,
    /// How it ended up absorbed
    pub disposition: Disposition,
}

/// One write against the destination
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create an entry for `punishment`
    Insert {
        /// Native id of the winning record
        native_id: NativeId,
        /// The winning record
        punishment: PortablePunishment,
        /// Records folded into the new entry
        absorbed: Vec<AbsorbedRecord>,
    },

    /// Overwrite an existing entry with `punishment`
    Replace {
        /// Entry to overwrite
        entry_id: EntryId,
        /// Native id of the winning record
        native_id: NativeId,
        /// The winning record
        punishment: PortablePunishment,
        /// Records folded into the entry
        absorbed: Vec<AbsorbedRecord>,
    },

    /// Link a losing record to an existing entry without touching the entry
    Absorb {
        /// Entry the record lost to
        entry_id: EntryId,
        /// Native id of the losing record
        native_id: NativeId,
        /// The losing record
        punishment: PortablePunishment,
    },
}

impl WriteOp {
    /// Native id and record this operation writes, or links
    pub fn primary(&self) -> (&NativeId, &PortablePunishment) {
        match self {
            WriteOp::Insert {
                native_id,
                punishment,
                ..
            }
            | WriteOp::Replace {
                native_id,
                punishment,
                ..
            }
            | WriteOp::Absorb {
                native_id,
                punishment,
                ..
            } => (native_id, punishment),
        }
    }

    /// Records folded into this operation's entry
    pub fn absorbed(&self) -> &[AbsorbedRecord] {
        match self {
            WriteOp::Insert { absorbed, .. } | WriteOp::Replace { absorbed, .. } => absorbed,
            WriteOp::Absorb { .. } => &[],
        }
    }

    /// Every native id this operation records provenance for
    pub fn native_ids(&self) -> impl Iterator<Item = &NativeId> {
        std::iter::once(self.primary().0).chain(self.absorbed().iter().map(|a| &a.native_id))
    }

    /// Number of source records this operation stands for
    pub fn record_count(&self) -> usize {
        1 + self.absorbed().len()
    }
}

/// Write operations of the batch being built, with lookup tables
///
/// Only inserts and replacements are indexed by content: they decide what
/// the entry will hold once the batch commits.
#[derive(Debug)]
pub struct PendingBatch {
    policy: UniquenessPolicy,
    ops: Vec<WriteOp>,
    records: usize,
    by_key: HashMap<UniquenessKey, usize>,
    exact: HashMap<PortablePunishment, usize>,
    entries: HashMap<EntryId, usize>,
}

impl PendingBatch {
    /// Create an empty batch for a source with `policy`
    pub fn new(policy: UniquenessPolicy) -> Self {
        Self {
            policy,
            ops: Vec::new(),
            records: 0,
            by_key: HashMap::new(),
            exact: HashMap::new(),
            entries: HashMap::new(),
        }
    }

    /// Number of source records taken into the batch
    pub fn record_count(&self) -> usize {
        self.records
    }

    /// Whether nothing needs writing
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Operations so far, in native order of their first record
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Record that won the operation at `index`
    pub fn primary(&self, index: usize) -> Option<&PortablePunishment> {
        self.ops.get(index).map(|op| op.primary().1)
    }

    /// Operation whose winning record equals `punishment`
    pub fn by_exact(&self, punishment: &PortablePunishment) -> Option<usize> {
        self.exact.get(punishment).copied()
    }

    /// Operation whose winning record shares the policy key
    pub fn by_key(&self, key: &UniquenessKey) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    /// Whether the batch decides the future content of `entry_id`
    pub fn for_entry(&self, entry_id: EntryId) -> Option<usize> {
        self.entries.get(&entry_id).copied()
    }

    /// Add a new entry
    pub fn push_insert(&mut self, native_id: NativeId, punishment: PortablePunishment) -> usize {
        let index = self.ops.len();
        self.index_content(&punishment, index);
        self.ops.push(WriteOp::Insert {
            native_id,
            punishment,
            absorbed: Vec::new(),
        });
        self.records += 1;
        index
    }

    /// Overwrite a committed entry
    pub fn push_replace(&mut self, entry_id: EntryId, native_id: NativeId, punishment: PortablePunishment) -> usize {
        let index = self.ops.len();
        self.index_content(&punishment, index);
        self.entries.insert(entry_id, index);
        self.ops.push(WriteOp::Replace {
            entry_id,
            native_id,
            punishment,
            absorbed: Vec::new(),
        });
        self.records += 1;
        index
    }

    /// Link a losing record to a committed entry
    pub fn push_absorb(&mut self, entry_id: EntryId, native_id: NativeId, punishment: PortablePunishment) -> usize {
        let index = self.ops.len();
        self.ops.push(WriteOp::Absorb {
            entry_id,
            native_id,
            punishment,
        });
        self.records += 1;
        index
    }

    /// Fold a losing record into the operation at `index`
    pub fn absorb_into(&mut self, index: usize, native_id: NativeId, punishment: PortablePunishment) {
        if let Some(WriteOp::Insert { absorbed, .. } | WriteOp::Replace { absorbed, .. }) = self.ops.get_mut(index) {
            absorbed.push(AbsorbedRecord {
                native_id,
                punishment,
                disposition: Disposition::Rejected,
            });
            self.records += 1;
        }
    }

    /// Make a later record the winner of the operation at `index`
    ///
    /// The previous winner stays in the operation as superseded.
    pub fn supersede(&mut self, index: usize, native_id: NativeId, punishment: PortablePunishment) {
        let Some(old) = self.primary(index).cloned() else {
            return;
        };
        self.unindex_content(&old, index);
        self.index_content(&punishment, index);

        if let Some(
            WriteOp::Insert {
                native_id: winner_id,
                punishment: winner,
                absorbed,
            }
            | WriteOp::Replace {
                native_id: winner_id,
                punishment: winner,
                absorbed,
                ..
            },
        ) = self.ops.get_mut(index)
        {
            absorbed.push(AbsorbedRecord {
                native_id: std::mem::replace(winner_id, native_id),
                punishment: std::mem::replace(winner, punishment),
                disposition: Disposition::Superseded,
            });
            self.records += 1;
        }
    }

    /// Count a record that needs no write at all
    pub fn count_skipped(&mut self) {
        self.records += 1;
    }

    /// Hand the operations over for committing and start afresh
    pub fn take(&mut self) -> Vec<WriteOp> {
        self.records = 0;
        self.by_key.clear();
        self.exact.clear();
        self.entries.clear();
        std::mem::take(&mut self.ops)
    }

    fn index_content(&mut self, punishment: &PortablePunishment, index: usize) {
        if let Some(key) = self.policy.key(punishment) {
            self.by_key.insert(key, index);
        }
        self.exact.insert(punishment.clone(), index);
    }

    fn unindex_content(&mut self, punishment: &PortablePunishment, index: usize) {
        if let Some(key) = self.policy.key(punishment) {
            if self.by_key.get(&key) == Some(&index) {
                self.by_key.remove(&key);
            }
        }
        if self.exact.get(punishment) == Some(&index) {
            self.exact.remove(punishment);
        }
    }
}
