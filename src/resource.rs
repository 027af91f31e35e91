//! Resource rows and the per-bucket ordered list they live in.

use std::path::PathBuf;

use slab::Slab;

use crate::archive::ArchiveHandle;
use crate::types::FileType;

/// Where a resource's bytes ultimately come from.
#[derive(Clone, Debug)]
pub enum Source {
    Archive { handle: ArchiveHandle, index: u32 },
    File { path: PathBuf },
}

/// One occurrence of a logical asset. `priority == 0` means blacklisted —
/// never chosen as a winner regardless of how many rows share its bucket.
#[derive(Clone, Debug)]
pub struct Resource {
    pub name: String,
    pub file_type: Option<FileType>,
    pub priority: u32,
    pub source: Source,
}

struct Row {
    resource: Resource,
    seq: u64,
}

/// The ordered sequence of `Resource`s sharing one hash, kept sorted stably
/// by ascending priority. Rows live in a `slab::Slab` rather than a plain
/// `Vec` so that a row's key (used as the stable half of a change-log
/// `RowRef`) survives later insertions and removals elsewhere in the same
/// bucket — a `Vec` index would shift under those operations.
#[derive(Default)]
pub struct ResourceList {
    rows: Slab<Row>,
    /// Slab keys, kept sorted ascending by `(priority, seq)`. The back
    /// element is the winner.
    order: Vec<usize>,
    /// Canonical `name.ext` of the first resource ever inserted into this
    /// bucket, kept around purely so later insertions can detect a genuine
    /// hash collision (a different `(name,type)` landing on the same hash).
    first_key: Option<String>,
}

impl ResourceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_key(&self) -> Option<&str> {
        self.first_key.as_deref()
    }

    pub fn set_first_key_if_absent(&mut self, key: &str) {
        if self.first_key.is_none() {
            self.first_key = Some(key.to_string());
        }
    }

    /// Inserts `resource`, returning the row key to record in a `Change`.
    /// `seq` must be strictly increasing across the lifetime of the owning
    /// registry so that equal-priority ties resolve to "last inserted wins".
    pub fn insert(&mut self, resource: Resource, seq: u64) -> usize {
        let priority = resource.priority;
        let key = self.rows.insert(Row { resource, seq });
        let pos = self.order.partition_point(|&k| {
            let row = &self.rows[k];
            (row.resource.priority, row.seq) <= (priority, seq)
        });
        self.order.insert(pos, key);
        key
    }

    /// Removes a row by its stable key. No-op if already removed.
    pub fn remove(&mut self, key: usize) {
        if self.rows.contains(key) {
            self.rows.remove(key);
        }
        self.order.retain(|&k| k != key);
    }

    pub fn get(&self, key: usize) -> Option<&Resource> {
        self.rows.get(key).map(|r| &r.resource)
    }

    pub fn get_mut(&mut self, key: usize) -> Option<&mut Resource> {
        self.rows.get_mut(key).map(|r| &mut r.resource)
    }

    /// The current winner: highest priority, last-inserted among ties.
    pub fn winner(&self) -> Option<&Resource> {
        self.order.last().map(|&k| &self.rows[k].resource)
    }

    pub fn winner_key(&self) -> Option<usize> {
        self.order.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Resource)> {
        self.order.iter().map(move |&k| (k, &self.rows[k].resource))
    }

    /// Sets every row in the bucket to `priority` (used by `blacklist`),
    /// then restores the ascending-priority invariant: since all rows now
    /// share one priority, the correct order collapses to insertion order
    /// (ascending `seq`), which a full resort recomputes safely.
    pub fn set_all_priorities(&mut self, priority: u32) {
        for &key in &self.order {
            self.rows[key].resource.priority = priority;
        }
        self.order
            .sort_by_key(|&k| (self.rows[k].resource.priority, self.rows[k].seq));
    }

    /// Overwrites every row's `name`/`type` (used by `declare_resource`).
    /// Does not disturb priority ordering.
    pub fn declare_all(&mut self, name: &str, file_type: Option<FileType>) {
        for &key in &self.order {
            let row = &mut self.rows[key].resource;
            row.name = name.to_string();
            row.file_type = file_type.clone();
        }
    }
}
