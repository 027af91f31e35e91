//! The archive arena and the per-indexing-call change log that makes
//! `undo` possible.

use slab::Slab;

use crate::archive::{Archive, ArchiveHandle};

/// Archives are exclusively owned by the registry; this is that ownership.
/// A `slab::Slab` gives `O(1)` insert/remove with handles stable across
/// unrelated insertions.
#[derive(Default)]
pub struct ArchiveArena {
    archives: Slab<Box<dyn Archive>>,
}

impl ArchiveArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, archive: Box<dyn Archive>) -> ArchiveHandle {
        ArchiveHandle(self.archives.insert(archive))
    }

    pub fn get(&self, handle: ArchiveHandle) -> Option<&dyn Archive> {
        self.archives.get(handle.0).map(Box::as_ref)
    }

    pub fn get_mut(&mut self, handle: ArchiveHandle) -> Option<&mut (dyn Archive + 'static)> {
        self.archives.get_mut(handle.0).map(Box::as_mut)
    }

    pub fn remove(&mut self, handle: ArchiveHandle) {
        if self.archives.contains(handle.0) {
            self.archives.remove(handle.0);
        }
    }

    pub fn clear(&mut self) {
        self.archives.clear();
    }

    pub fn len(&self) -> usize {
        self.archives.len()
    }
}

/// A stable reference to one row within one bucket: the bucket's hash plus
/// the row's slab key inside that bucket's `ResourceList`. Stable because
/// neither half is invalidated by insertions elsewhere in the registry.
#[derive(Clone, Copy, Debug)]
pub struct RowRef {
    pub hash: u64,
    pub row_key: usize,
}

/// Everything one or more indexing calls contributed while sharing this
/// `Change`, enabling `undo` to remove exactly those calls' effects and
/// nothing else. Callers construct one, pass `Some(&mut change)` into as
/// many `add_archive`/`add_resource_dir` calls as should be undoable
/// together, then hand it to `Registry::undo`.
///
/// `Change` is itself the opaque cookie: its fields are private, so a
/// caller can hold and pass it around but never inspect or forge its
/// contents. After `Registry::undo` drains it, reusing the same (now-empty)
/// `Change` is a no-op, matching a stale cookie's behavior.
#[derive(Default)]
pub struct Change {
    rows: Vec<RowRef>,
    archives: Vec<ArchiveHandle>,
}

impl Change {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_row(&mut self, row: RowRef) {
        self.rows.push(row);
    }

    pub(crate) fn record_archive(&mut self, handle: ArchiveHandle) {
        self.archives.push(handle);
    }

    pub fn rows(&self) -> &[RowRef] {
        &self.rows
    }

    pub fn archives(&self) -> &[ArchiveHandle] {
        &self.archives
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.archives.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.rows.clear();
        self.archives.clear();
    }
}
