use std::path::PathBuf;

use crate::archive::ArchiveKind;
use crate::hash::HashAlgo;

/// Every failure mode the registry can raise, matchable by callers that need
/// to tell "missing optional archive" from "corrupt archive" apart.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("directory `{0}` does not exist under the registered base")]
    NoSuchDirectory(PathBuf),

    #[error("archive `{name}` ({kind:?}) not found in registered search directories")]
    NoSuchArchive { kind: ArchiveKind, name: String },

    #[error("BIF archives cannot be added directly; they are only reachable through a KEY")]
    LoneBif,

    #[error("KEY `{key}` references BIF `{bif}`, which was not found in any registered BIF directory")]
    BifNotFound { key: String, bif: String },

    #[error("archive advertises hash algorithm {advertised:?}, registry is configured for {registry:?}")]
    HashAlgoMismatch {
        advertised: HashAlgo,
        registry: HashAlgo,
    },

    #[error("hash algorithm cannot be changed: the registry already holds resources")]
    AlreadyPopulated,

    #[error("seek failed on `{path}`")]
    SeekError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read failed on `{path}`")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open `{path}`")]
    OpenError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed writing diagnostic dump to `{path}`")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
