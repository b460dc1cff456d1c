//! Dirty-field tracking for partial updates.
//!
//! A persisted record remembers which fields were set since its last
//! successful update, so the next update only sends those. The protocol is
//! clear-then-send, union-on-failure:
//!
//! 1. `take()` snapshots the pending set and empties it in one go. Anything
//!    set while the request is in flight lands in the fresh set.
//! 2. On success, drop the snapshot. The live set already excludes it.
//! 3. On failure, `restore()` unions the snapshot back in. Nothing set during
//!    the failed attempt gets clobbered.
//!
//! The tracker is plain data; the record owning it is responsible for making
//! take/restore atomic with respect to its attribute bag.

use ::std::collections::BTreeSet;

use ::jedi::{self, Map, Value};

/// The distinguished identity field. Never tracked, never sent in an update.
pub const ID_FIELD: &'static str = "Id";

/// The set of field names pending in the next partial update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirtyFields {
    pending: BTreeSet<String>,
}

impl DirtyFields {
    pub fn new() -> Self {
        Default::default()
    }

    /// Mark fields as changed. The identity field is ignored.
    pub fn mark<'a, I>(&mut self, fields: I)
        where I: IntoIterator<Item = &'a str>
    {
        for field in fields {
            if field == ID_FIELD { continue; }
            self.pending.insert(String::from(field));
        }
    }

    /// Snapshot and clear the pending set
    pub fn take(&mut self) -> BTreeSet<String> {
        ::std::mem::replace(&mut self.pending, BTreeSet::new())
    }

    /// Union a snapshot from a failed update back into the pending set
    pub fn restore(&mut self, snapshot: BTreeSet<String>) {
        self.pending.extend(snapshot);
    }

    pub fn contains(&self, field: &str) -> bool {
        self.pending.contains(field)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Sorted list of pending field names
    pub fn fields(&self) -> Vec<String> {
        self.pending.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Build a partial-update payload: the attribute values whose keys are in the
/// snapshot, minus the identity field. Fields named in the snapshot that the
/// record doesn't actually have are skipped.
pub fn build_payload(data: &Map<String, Value>, snapshot: &BTreeSet<String>) -> Map<String, Value> {
    let mut payload = jedi::pick(data, snapshot.iter());
    payload.remove(ID_FIELD);
    payload
}
