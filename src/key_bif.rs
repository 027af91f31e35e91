//! The KEY→BIF join: KEY archives are split across a manifest file (the
//! KEY) and one or more anonymous-entry data files (the BIFs) that must be
//! located, opened, and hydrated with the KEY-declared names before they
//! can be indexed like any other archive.
//!
//! Parsing the KEY/BIF binary formats themselves is out of scope (an
//! external collaborator); `ContainerProvider` is the seam a host plugs its
//! real parser into.

use std::collections::HashMap;
use std::path::Path;

use crate::archive::{Archive, ArchiveEntry, ArchiveKind, Stream};
use crate::discovery::{find_archive, SearchDirEntry};
use crate::error::{RegistryError, Result};
use crate::hash::HashAlgo;
use crate::types::FileType;

/// One name/type declared by a KEY for an entry living at `bif_local_index`
/// inside a specific referenced BIF.
#[derive(Clone, Debug)]
pub struct KeyEntryDecl {
    pub name: String,
    pub file_type: FileType,
    pub bif_local_index: u32,
}

/// One BIF a KEY references, plus every entry the KEY declares for it.
#[derive(Clone, Debug)]
pub struct BifRef {
    pub filename: String,
    pub entries: Vec<KeyEntryDecl>,
}

/// The parsed manifest contents of a KEY file.
#[derive(Clone, Debug, Default)]
pub struct KeyFile {
    pub bifs: Vec<BifRef>,
}

/// Injection point for the binary container parsers this crate does not
/// implement. A host supplies a `ContainerProvider` that knows how to turn
/// a resolved filesystem path into an open archive (or, for KEY, into a
/// parsed manifest).
pub trait ContainerProvider: Send + Sync {
    fn open_archive(&self, kind: ArchiveKind, path: &Path) -> Result<Box<dyn Archive>>;
    fn open_key(&self, path: &Path) -> Result<KeyFile>;
    /// HERF containers live inside an already-indexed NDS resource rather
    /// than at a discoverable filesystem path, so they are opened from a
    /// stream instead of a path.
    fn open_herf_stream(&self, stream: Stream) -> Result<Box<dyn Archive>>;
}

/// Wraps an opened BIF, overriding `resources()` to report only the
/// entries the owning KEY declared, under the names/types the KEY gave
/// them — a BIF's own entries carry no names, only indices.
struct HydratedBif {
    inner: Box<dyn Archive>,
    declared: HashMap<u32, (String, FileType)>,
}

impl Archive for HydratedBif {
    fn name_hash_algo(&self) -> Option<HashAlgo> {
        self.inner.name_hash_algo()
    }

    fn resources(&self) -> Vec<ArchiveEntry> {
        self.inner
            .resources()
            .into_iter()
            .filter_map(|entry| {
                self.declared.get(&entry.index).map(|(name, file_type)| ArchiveEntry {
                    name: name.clone(),
                    file_type: file_type.clone(),
                    index: entry.index,
                    prehash: entry.prehash,
                })
            })
            .collect()
    }

    fn open(&self, index: u32) -> Result<Stream> {
        self.inner.open(index)
    }

    fn size(&self, index: u32) -> u64 {
        self.inner.size(index)
    }

    fn clear_scratch(&mut self) {
        self.inner.clear_scratch();
    }
}

/// Resolves every BIF a KEY references, opens and hydrates each, and
/// returns them as ready-to-index archives.
///
/// Atomic by construction: nothing is returned to the caller (and thus
/// nothing is handed to the registry's archive arena) until every
/// referenced BIF has been found and opened. If any BIF is missing or
/// fails to open, the already-opened `Box<dyn Archive>` values collected so
/// far are simply dropped when this function returns `Err` — they were
/// never registered anywhere, so there is nothing further to tear down.
pub fn join_key_bif(
    provider: &dyn ContainerProvider,
    key_path: &Path,
    key_name: &str,
    bif_dirs: &[SearchDirEntry],
    known_bif_files: &[std::path::PathBuf],
) -> Result<Vec<(String, Box<dyn Archive>)>> {
    let key_file = provider.open_key(key_path)?;
    let mut opened = Vec::with_capacity(key_file.bifs.len());

    for bif_ref in &key_file.bifs {
        let bif_path = find_archive(&bif_ref.filename, bif_dirs, known_bif_files).ok_or_else(|| {
            RegistryError::BifNotFound {
                key: key_name.to_string(),
                bif: bif_ref.filename.clone(),
            }
        })?;

        let raw = provider.open_archive(ArchiveKind::Bif, &bif_path)?;
        let declared = bif_ref
            .entries
            .iter()
            .map(|e| (e.bif_local_index, (e.name.clone(), e.file_type.clone())))
            .collect();
        let hydrated: Box<dyn Archive> = Box::new(HydratedBif { inner: raw, declared });
        opened.push((bif_ref.filename.clone(), hydrated));
    }

    Ok(opened)
}
