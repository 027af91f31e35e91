//! The container abstraction consumed by the registry. Concrete archive
//! formats (KEY, BIF, ERF, RIM, ZIP, EXE, NDS, HERF binary layouts) are
//! external collaborators; this module only defines the seam they plug
//! into plus the discovery metadata (kind, glob, search dirs) that is the
//! registry's own responsibility.

use std::io::{Read, Seek};

use crate::error::Result;
use crate::hash::HashAlgo;
use crate::types::FileType;

/// A stream that both reads and seeks, boxed so `Archive::open` can return
/// whatever backing storage (file handle, mmap cursor, in-memory slice) its
/// concrete implementation prefers.
pub trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

pub type Stream = Box<dyn ReadSeek>;

/// Sentinel returned by `Archive::size` / `Registry::get_size` when the
/// container cannot report a size without doing the equivalent of a full
/// decode.
pub const UNKNOWN_SIZE: u64 = 0xFFFF_FFFF;

/// One entry as enumerated out of an open archive.
#[derive(Clone, Debug)]
pub struct ArchiveEntry {
    pub name: String,
    pub file_type: FileType,
    pub index: u32,
    /// Pre-computed hash the archive advertises for this entry, if its
    /// format stores hashes rather than names (e.g. some BIF variants).
    pub prehash: Option<u64>,
}

/// Trait object representing an already-opened container. The registry
/// never branches on `ArchiveKind` once it holds one of these — kind is a
/// property of the discovery path that produced it, not of the trait.
pub trait Archive: Send {
    /// `Some(algo)` if every name this archive reports is pre-hashed with a
    /// specific algorithm; `None` if the registry should hash names itself.
    fn name_hash_algo(&self) -> Option<HashAlgo>;

    fn resources(&self) -> Vec<ArchiveEntry>;

    fn open(&self, index: u32) -> Result<Stream>;

    /// `UNKNOWN_SIZE` if the container cannot report a size for `index`.
    fn size(&self, index: u32) -> u64;

    /// Frees any transient state retained only for `resources()` — called
    /// once after indexing so the archive keeps just what `open` needs.
    fn clear_scratch(&mut self);
}

/// Opaque reference to an archive owned by a registry's archive arena.
/// Archives are exclusively owned by the registry that created them; a
/// handle from one registry is never valid against another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ArchiveHandle(pub usize);

/// The eight archive kinds the registry knows how to discover and index.
/// `Bif` is special: it is never addressable directly (`add_archive(Bif,
/// ..)` always fails) — BIFs are reached exclusively through a KEY.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    Key,
    Bif,
    Erf,
    Rim,
    Zip,
    Exe,
    Nds,
    Herf,
}

impl ArchiveKind {
    pub const ALL: [ArchiveKind; 8] = [
        ArchiveKind::Key,
        ArchiveKind::Bif,
        ArchiveKind::Erf,
        ArchiveKind::Rim,
        ArchiveKind::Zip,
        ArchiveKind::Exe,
        ArchiveKind::Nds,
        ArchiveKind::Herf,
    ];

    /// Case-insensitive glob patterns identifying files of this kind.
    /// `rims_are_erfs` additionally folds the RIM globs into ERF's list.
    pub fn globs(self, rims_are_erfs: bool) -> Vec<&'static str> {
        match self {
            ArchiveKind::Key => vec!["*.key"],
            ArchiveKind::Bif => vec!["*.bif"],
            ArchiveKind::Erf => {
                let mut v = vec!["*.erf", "*.mod", "*.hak", "*.nwm"];
                if rims_are_erfs {
                    v.extend(["*.rim", "*.rimp"]);
                }
                v
            }
            ArchiveKind::Rim => vec!["*.rim", "*.rimp"],
            ArchiveKind::Zip => vec!["*.zip"],
            ArchiveKind::Exe => vec!["*.exe"],
            ArchiveKind::Nds => vec!["*.nds"],
            ArchiveKind::Herf => vec!["*.herf"],
        }
    }

    /// NDS is loaded from an arbitrary filesystem path and HERF from an
    /// already-indexed resource; neither registers search directories.
    pub fn has_directory_registration(self) -> bool {
        !matches!(self, ArchiveKind::Nds | ArchiveKind::Herf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rims_are_erfs_folds_rim_globs_into_erf() {
        let without = ArchiveKind::Erf.globs(false);
        let with = ArchiveKind::Erf.globs(true);
        assert!(!without.contains(&"*.rim"));
        assert!(with.contains(&"*.rim"));
        assert!(with.contains(&"*.rimp"));
    }

    #[test]
    fn nds_and_herf_have_no_directory_registration() {
        assert!(!ArchiveKind::Nds.has_directory_registration());
        assert!(!ArchiveKind::Herf.has_directory_registration());
        assert!(ArchiveKind::Key.has_directory_registration());
    }
}
