//! Priority-ordered, name-hash-indexed virtual resource registry for
//! game-engine asset resolution across heterogeneous archive containers.

pub mod archive;
pub mod change;
pub mod config;
pub mod discovery;
pub mod error;
pub mod hash;
pub mod key_bif;
pub mod registry;
pub mod resource;
pub mod types;

pub use archive::{Archive, ArchiveEntry, ArchiveHandle, ArchiveKind, Stream, UNKNOWN_SIZE};
pub use change::Change;
pub use config::{load_config, RegistryConfig};
pub use error::{RegistryError, Result};
pub use hash::HashAlgo;
pub use key_bif::{ContainerProvider, KeyFile};
pub use registry::{Registry, TypeQuery};
pub use resource::{Resource, Source};
pub use types::{FileType, ResourceClass, TypeAliases};
