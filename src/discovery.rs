//! Per-archive-kind search directory bookkeeping and filename resolution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::archive::ArchiveKind;

#[derive(Clone, Debug)]
pub struct SearchDirEntry {
    pub path: PathBuf,
    pub recursive: bool,
}

/// Per-`ArchiveKind` list of directories to search when resolving a
/// requested archive filename to an absolute path.
#[derive(Default)]
pub struct DiscoveryDirs {
    dirs: HashMap<ArchiveKind, Vec<SearchDirEntry>>,
}

impl DiscoveryDirs {
    pub fn new() -> Self {
        Self::default()
    }

    /// `register_base_dir`: every kind that registers directories at all
    /// starts out searching `base` non-recursively.
    pub fn register_base_dir(&mut self, base: &Path) {
        for kind in ArchiveKind::ALL {
            if kind.has_directory_registration() {
                self.dirs.entry(kind).or_default().push(SearchDirEntry {
                    path: base.to_path_buf(),
                    recursive: false,
                });
            }
        }
    }

    pub fn add_dir(&mut self, kind: ArchiveKind, dir: PathBuf, recursive: bool) {
        self.dirs
            .entry(kind)
            .or_default()
            .push(SearchDirEntry { path: dir, recursive });
    }

    pub fn dirs_for(&self, kind: ArchiveKind) -> &[SearchDirEntry] {
        self.dirs.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.dirs.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.values().all(Vec::is_empty)
    }
}

/// Walks every registered directory for `kind` (respecting each entry's own
/// recursion flag) and returns every file matching one of `globs`.
///
/// Directories are walked in parallel; the result is only ever fed into a
/// single-threaded insertion pass afterward, so this cannot perturb
/// insertion-order tie-breaking (see the concurrency notes on indexing).
pub fn collect_known_files(dirs: &[SearchDirEntry], globs: &[&str]) -> Vec<PathBuf> {
    dirs.par_iter()
        .flat_map(|entry| walk_one_dir(entry, globs))
        .collect()
}

fn walk_one_dir(entry: &SearchDirEntry, globs: &[&str]) -> Vec<PathBuf> {
    let mut overrides = ignore::overrides::OverrideBuilder::new(&entry.path);
    for g in globs {
        // Case-insensitive, anchored anywhere: prefix with `**/` so the
        // glob matches at any depth under this root.
        let _ = overrides.add(&format!("**/{g}"));
    }
    let Ok(overrides) = overrides.build() else {
        return Vec::new();
    };

    let mut builder = ignore::WalkBuilder::new(&entry.path);
    builder
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .overrides(overrides);
    if !entry.recursive {
        builder.max_depth(Some(1));
    }

    builder
        .build()
        .filter_map(|res| res.ok())
        .filter(|dent| dent.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|dent| dent.into_path())
        .collect()
}

/// `find_archive`: normalizes `name`, searches `known_files` for any entry
/// whose suffix matches `"/name"` case-insensitively, then among matches
/// chooses the first whose parent directory equals one of `dirs` (in `dirs`
/// order). Returns `None` if absent.
pub fn find_archive(name: &str, dirs: &[SearchDirEntry], known_files: &[PathBuf]) -> Option<PathBuf> {
    let suffix = format!("/{}", name.to_ascii_lowercase());
    let matches: Vec<&PathBuf> = known_files
        .iter()
        .filter(|p| p.to_string_lossy().to_ascii_lowercase().ends_with(&suffix))
        .collect();

    for dir in dirs {
        if let Some(found) = matches.iter().find(|p| p.parent() == Some(dir.path.as_path())) {
            return Some((*found).clone());
        }
    }
    None
}
