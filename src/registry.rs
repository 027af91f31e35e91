//! The registry: the orchestrating struct tying the hash layer, type
//! normalization, discovery, change log, and query API together. Modeled
//! as an explicit, independently-instantiable value rather than a
//! process-wide singleton (test suites need more than one).

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::archive::{Archive, ArchiveKind, Stream, UNKNOWN_SIZE};
use crate::change::{ArchiveArena, Change, RowRef};
use crate::config::RegistryConfig;
use crate::discovery::{collect_known_files, find_archive, DiscoveryDirs};
use crate::error::{RegistryError, Result};
use crate::hash::{canonical_hash, canonical_key, HashAlgo};
use crate::key_bif::{join_key_bif, ContainerProvider};
use crate::resource::{Resource, ResourceList, Source};
use crate::types::{FileType, ResourceClass, TypeAliases};

/// Registry lifecycle. `Clearing` is never externally observable — mutation
/// is single-threaded and `clear()` runs to completion before returning —
/// so only the three steady states are modeled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Empty,
    Configured,
    Populated,
}

/// Accepts either a single type, a set of candidate types, a semantic
/// resource class, or no type at all, so `has_resource`/`get_resource`/
/// `get_size`/`list_available` can each take whichever shape the caller has
/// on hand through one generic parameter.
pub enum TypeQuery {
    Type(FileType),
    Types(Vec<FileType>),
    Class(ResourceClass),
    /// No type at all: resolves only resources declared with `type = None`.
    None,
}

impl From<FileType> for TypeQuery {
    fn from(t: FileType) -> Self {
        TypeQuery::Type(t)
    }
}

impl From<Vec<FileType>> for TypeQuery {
    fn from(v: Vec<FileType>) -> Self {
        TypeQuery::Types(v)
    }
}

impl From<ResourceClass> for TypeQuery {
    fn from(c: ResourceClass) -> Self {
        TypeQuery::Class(c)
    }
}

impl From<()> for TypeQuery {
    fn from(_: ()) -> Self {
        TypeQuery::None
    }
}

impl TypeQuery {
    fn candidates(&self) -> Vec<Option<FileType>> {
        match self {
            TypeQuery::Type(t) => vec![Some(t.clone())],
            TypeQuery::Types(v) => v.iter().cloned().map(Some).collect(),
            TypeQuery::Class(c) => c.expansion().into_iter().map(Some).collect(),
            TypeQuery::None => vec![None],
        }
    }
}

pub struct Registry {
    state: State,
    base_dir: Option<PathBuf>,
    hash_algo: HashAlgo,
    rims_are_erfs: bool,
    cursor_remap: Vec<String>,
    type_aliases: TypeAliases,
    discovery: DiscoveryDirs,
    resource_dirs: Vec<PathBuf>,
    buckets: HashMap<u64, ResourceList>,
    archives: ArchiveArena,
    next_seq: u64,
    provider: Box<dyn ContainerProvider>,
}

impl Registry {
    pub fn new(config: RegistryConfig, provider: Box<dyn ContainerProvider>) -> Self {
        Self {
            state: State::Empty,
            base_dir: None,
            hash_algo: parse_hash_algo(&config.hash_algo),
            rims_are_erfs: config.rims_are_erfs,
            cursor_remap: config.cursor_remap,
            type_aliases: TypeAliases::new(),
            discovery: DiscoveryDirs::new(),
            resource_dirs: Vec::new(),
            buckets: HashMap::new(),
            archives: ArchiveArena::new(),
            next_seq: 0,
            provider,
        }
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    // ---- configuration & lifecycle ----------------------------------

    pub fn register_base_dir(&mut self, path: &Path) -> Result<()> {
        if !path.is_dir() {
            return Err(RegistryError::NoSuchDirectory(path.to_path_buf()));
        }
        self.base_dir = Some(path.to_path_buf());
        self.discovery.register_base_dir(path);
        if self.state == State::Empty {
            self.state = State::Configured;
        }
        Ok(())
    }

    pub fn add_archive_dir(&mut self, kind: ArchiveKind, relative_dir: &str, recursive: bool) -> Result<()> {
        let dir = self.resolve_dir(relative_dir)?;
        self.discovery.add_dir(kind, dir, recursive);
        if self.state == State::Empty {
            self.state = State::Configured;
        }
        Ok(())
    }

    fn resolve_dir(&self, relative: &str) -> Result<PathBuf> {
        let base = self
            .base_dir
            .as_ref()
            .ok_or_else(|| RegistryError::NoSuchDirectory(PathBuf::from(relative)))?;
        let dir = base.join(relative);
        if !dir.is_dir() {
            return Err(RegistryError::NoSuchDirectory(dir));
        }
        Ok(dir)
    }

    pub fn has_resource_dir(&self, relative_dir: &str) -> bool {
        let Some(base) = self.base_dir.as_ref() else { return false };
        let dir = base.join(relative_dir);
        self.resource_dirs.iter().any(|d| d == &dir)
    }

    pub fn add_type_alias(&mut self, alias: FileType, real: FileType) {
        self.type_aliases.add(alias, real);
    }

    pub fn set_rims_are_erfs(&mut self, value: bool) {
        self.rims_are_erfs = value;
    }

    pub fn set_hash_algo(&mut self, algo: HashAlgo) -> Result<()> {
        if self.state == State::Populated {
            return Err(RegistryError::AlreadyPopulated);
        }
        self.hash_algo = algo;
        Ok(())
    }

    pub fn set_cursor_remap(&mut self, names: Vec<String>) {
        self.cursor_remap = names;
    }

    pub fn cursor_remap(&self) -> &[String] {
        &self.cursor_remap
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.archives.clear();
        self.discovery.clear();
        self.resource_dirs.clear();
        self.base_dir = None;
        self.type_aliases = TypeAliases::new();
        self.next_seq = 0;
        self.state = State::Empty;
    }

    // ---- archive discovery & indexing --------------------------------

    pub fn has_archive(&self, kind: ArchiveKind, name: &str) -> bool {
        match kind {
            ArchiveKind::Nds => Path::new(name).is_file(),
            ArchiveKind::Herf => self.has_resource(name, FileType::new("HERF")),
            _ => {
                let dirs = self.discovery.dirs_for(kind);
                let globs = kind.globs(self.rims_are_erfs);
                let known = collect_known_files(dirs, &globs);
                find_archive(name, dirs, &known).is_some()
            }
        }
    }

    pub fn add_archive(
        &mut self,
        kind: ArchiveKind,
        name: &str,
        priority: u32,
        mut change: Option<&mut Change>,
    ) -> Result<()> {
        match kind {
            ArchiveKind::Bif => Err(RegistryError::LoneBif),

            ArchiveKind::Nds => {
                let path = PathBuf::from(name);
                if !path.is_file() {
                    return Err(RegistryError::NoSuchArchive { kind, name: name.to_string() });
                }
                let archive = self.provider.open_archive(ArchiveKind::Nds, &path)?;
                self.index_archive(archive, priority, change)?;
                Ok(())
            }

            ArchiveKind::Herf => {
                let resolved = self.get_resource(name, FileType::new("HERF"))?;
                let (stream, _ty) = resolved
                    .ok_or_else(|| RegistryError::NoSuchArchive { kind, name: name.to_string() })?;
                let archive = self.provider.open_herf_stream(stream)?;
                self.index_archive(archive, priority, change)?;
                Ok(())
            }

            ArchiveKind::Key => {
                let key_dirs = self.discovery.dirs_for(ArchiveKind::Key).to_vec();
                let key_globs = ArchiveKind::Key.globs(self.rims_are_erfs);
                let key_known = collect_known_files(&key_dirs, &key_globs);
                let key_path = find_archive(name, &key_dirs, &key_known)
                    .ok_or_else(|| RegistryError::NoSuchArchive { kind, name: name.to_string() })?;

                let bif_dirs = self.discovery.dirs_for(ArchiveKind::Bif).to_vec();
                let bif_globs = ArchiveKind::Bif.globs(self.rims_are_erfs);
                let bif_known = collect_known_files(&bif_dirs, &bif_globs);

                let opened = join_key_bif(self.provider.as_ref(), &key_path, name, &bif_dirs, &bif_known)?;
                tracing::debug!(key = name, bifs = opened.len(), "joined KEY to its BIFs");
                for (_filename, archive) in opened {
                    let reborrow = change.as_mut().map(|c| &mut **c);
                    self.index_archive(archive, priority, reborrow)?;
                }
                Ok(())
            }

            ArchiveKind::Erf | ArchiveKind::Rim | ArchiveKind::Zip | ArchiveKind::Exe => {
                let dirs = self.discovery.dirs_for(kind).to_vec();
                let globs = kind.globs(self.rims_are_erfs);
                let known = collect_known_files(&dirs, &globs);
                let path = find_archive(name, &dirs, &known)
                    .ok_or_else(|| RegistryError::NoSuchArchive { kind, name: name.to_string() })?;
                let archive = self.provider.open_archive(kind, &path)?;
                self.index_archive(archive, priority, change)?;
                Ok(())
            }
        }
    }

    /// Steps 1–4 of the indexing pipeline for an already-opened archive.
    #[tracing::instrument(skip(self, archive, change))]
    fn index_archive(
        &mut self,
        archive: Box<dyn Archive>,
        priority: u32,
        mut change: Option<&mut Change>,
    ) -> Result<()> {
        if let Some(advertised) = archive.name_hash_algo() {
            if advertised != self.hash_algo {
                return Err(RegistryError::HashAlgoMismatch {
                    advertised,
                    registry: self.hash_algo.clone(),
                });
            }
        }

        let handle = self.archives.insert(archive);
        if let Some(c) = change.as_mut() {
            c.record_archive(handle);
        }

        let entries = self
            .archives
            .get(handle)
            .map(|a| a.resources())
            .unwrap_or_default();

        for entry in entries {
            let mut file_type = entry.file_type.clone();
            let normalized = self.type_aliases.normalize(&mut file_type);
            let hash = match entry.prehash {
                Some(prehash) if !normalized => prehash,
                _ => canonical_hash(&self.hash_algo, &entry.name, Some(&file_type)),
            };

            let key = canonical_key(&entry.name, Some(&file_type));
            let seq = self.take_seq();
            let resource = Resource {
                name: entry.name.to_ascii_lowercase(),
                file_type: Some(file_type),
                priority,
                source: Source::Archive { handle, index: entry.index },
            };
            let row_key = self.bucket_with_collision_check(hash, &key).insert(resource, seq);
            if let Some(c) = change.as_mut() {
                c.record_row(RowRef { hash, row_key });
            }
        }

        if let Some(archive) = self.archives.get_mut(handle) {
            archive.clear_scratch();
        }

        self.state = State::Populated;
        Ok(())
    }

    /// Walks `relative_dir` to `depth` plies, indexing every matching file
    /// as a `File`-sourced resource.
    pub fn add_resource_dir(
        &mut self,
        relative_dir: &str,
        glob_pattern: Option<&str>,
        depth: usize,
        priority: u32,
        mut change: Option<&mut Change>,
    ) -> Result<()> {
        let dir = self.resolve_dir(relative_dir)?;
        self.resource_dirs.push(dir.clone());

        let pattern = glob_pattern.and_then(|p| match glob::Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                tracing::warn!(pattern = p, error = %err, "ignoring unparseable resource glob");
                None
            }
        });

        let mut builder = ignore::WalkBuilder::new(&dir);
        builder
            .hidden(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .max_depth(Some(depth));

        for entry in builder.build().filter_map(|e| e.ok()) {
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let path = entry.into_path();
            if let Some(pattern) = &pattern {
                if !pattern.matches(&path.to_string_lossy()) {
                    continue;
                }
            }

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_ascii_lowercase();
            let mut file_type = path.extension().and_then(|s| s.to_str()).map(FileType::new);
            if let Some(ty) = file_type.as_mut() {
                self.type_aliases.normalize(ty);
            }

            let key = canonical_key(&stem, file_type.as_ref());
            let hash = canonical_hash(&self.hash_algo, &stem, file_type.as_ref());
            let seq = self.take_seq();
            let resource = Resource {
                name: stem,
                file_type,
                priority,
                source: Source::File { path },
            };
            let row_key = self.bucket_with_collision_check(hash, &key).insert(resource, seq);
            if let Some(c) = change.as_mut() {
                c.record_row(RowRef { hash, row_key });
            }
        }

        self.state = State::Populated;
        Ok(())
    }

    /// Ensures a bucket exists for `hash`, emitting the once-per-collision
    /// warning when a new, distinct `(name,type)` lands on an existing hash.
    fn bucket_with_collision_check(&mut self, hash: u64, key: &str) -> &mut ResourceList {
        let is_new = !self.buckets.contains_key(&hash);
        let bucket = self.buckets.entry(hash).or_insert_with(ResourceList::new);
        if is_new {
            bucket.set_first_key_if_absent(key);
        } else if bucket.first_key() != Some(key) {
            tracing::warn!(
                hash = format!("{hash:#018x}"),
                existing = bucket.first_key().unwrap_or(""),
                incoming = key,
                "hash collision: bucket already holds a different (name, type)"
            );
        }
        bucket
    }

    // ---- overlay operations ------------------------------------------

    pub fn declare_resource(&mut self, name: &str, ty: Option<FileType>) {
        let hash = canonical_hash(&self.hash_algo, name, ty.as_ref());
        if let Some(bucket) = self.buckets.get_mut(&hash) {
            bucket.declare_all(name, ty);
        }
    }

    /// Single-argument overload: splits `"stem.ext"` and forwards.
    pub fn declare_resource_named(&mut self, full_name: &str) {
        let (stem, ty) = split_stem_ext(full_name);
        self.declare_resource(&stem, ty);
    }

    pub fn blacklist(&mut self, name: &str, ty: Option<FileType>) {
        let hash = canonical_hash(&self.hash_algo, name, ty.as_ref());
        if let Some(bucket) = self.buckets.get_mut(&hash) {
            bucket.set_all_priorities(0);
        }
    }

    // ---- lookup ---------------------------------------------------------

    pub fn has_resource(&self, name: &str, query: impl Into<TypeQuery>) -> bool {
        let query = query.into();
        for candidate in query.candidates() {
            let hash = canonical_hash(&self.hash_algo, name, candidate.as_ref());
            if let Some(winner) = self.buckets.get(&hash).and_then(ResourceList::winner) {
                if winner.priority != 0 {
                    return true;
                }
            }
        }
        false
    }

    /// Single-argument overload: does *any* type currently registered under
    /// this name stem resolve? Unlike `has_resource(name, TypeQuery::None)`
    /// (which only matches untyped resources), this enumerates every bucket
    /// looking for a winner whose name matches, regardless of type.
    pub fn has_resource_named(&self, name: &str) -> bool {
        let lowered = name.to_ascii_lowercase();
        self.buckets
            .values()
            .filter_map(ResourceList::winner)
            .any(|w| w.priority != 0 && w.name == lowered)
    }

    pub fn get_resource(
        &self,
        name: &str,
        query: impl Into<TypeQuery>,
    ) -> Result<Option<(Stream, Option<FileType>)>> {
        let query = query.into();
        for candidate in query.candidates() {
            let hash = canonical_hash(&self.hash_algo, name, candidate.as_ref());
            let Some(winner) = self.buckets.get(&hash).and_then(ResourceList::winner) else {
                continue;
            };
            if winner.priority == 0 {
                continue;
            }
            let stream = self.open_source(&winner.source)?;
            return Ok(Some((stream, winner.file_type.clone())));
        }
        Ok(None)
    }

    /// Resolves a winner directly by its bucket hash, bypassing name/type
    /// canonicalization — the only way to reach a resource whose container
    /// advertised a pre-hash the registry cannot reverse into a name.
    pub fn get_by_hash(&self, hash: u64) -> Result<Option<(Stream, Option<FileType>)>> {
        let Some(winner) = self.buckets.get(&hash).and_then(ResourceList::winner) else {
            return Ok(None);
        };
        if winner.priority == 0 {
            return Ok(None);
        }
        let stream = self.open_source(&winner.source)?;
        Ok(Some((stream, winner.file_type.clone())))
    }

    pub fn get_size(&self, name: &str, query: impl Into<TypeQuery>) -> Result<Option<u64>> {
        let query = query.into();
        for candidate in query.candidates() {
            let hash = canonical_hash(&self.hash_algo, name, candidate.as_ref());
            let Some(winner) = self.buckets.get(&hash).and_then(ResourceList::winner) else {
                continue;
            };
            if winner.priority == 0 {
                continue;
            }
            return self.size_of(winner).map(Some);
        }
        Ok(None)
    }

    pub fn size_of(&self, resource: &Resource) -> Result<u64> {
        match &resource.source {
            Source::Archive { handle, index } => {
                let archive = self.archives.get(*handle).ok_or_else(|| RegistryError::OpenError {
                    path: PathBuf::from(format!("<archive handle {}>", handle.0)),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "stale archive handle"),
                })?;
                Ok(archive.size(*index))
            }
            Source::File { path } => {
                let meta = fs::metadata(path).map_err(|e| RegistryError::OpenError {
                    path: path.clone(),
                    source: e,
                })?;
                Ok(meta.len())
            }
        }
    }

    pub fn list_available(&self, query: impl Into<TypeQuery>) -> Vec<(String, Option<FileType>)> {
        let wanted = query.into().candidates();
        self.buckets
            .values()
            .filter_map(ResourceList::winner)
            .filter(|w| w.priority != 0)
            .filter(|w| wanted.iter().any(|t| t.as_ref() == w.file_type.as_ref()))
            .map(|w| (w.name.clone(), w.file_type.clone()))
            .collect()
    }

    fn open_source(&self, source: &Source) -> Result<Stream> {
        match source {
            Source::Archive { handle, index } => {
                let archive = self.archives.get(*handle).ok_or_else(|| RegistryError::OpenError {
                    path: PathBuf::from(format!("<archive handle {}>", handle.0)),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "stale archive handle"),
                })?;
                archive.open(*index)
            }
            Source::File { path } => {
                let file = std::fs::File::open(path).map_err(|e| RegistryError::OpenError {
                    path: path.clone(),
                    source: e,
                })?;
                Ok(Box::new(file))
            }
        }
    }

    // ---- undo -----------------------------------------------------------

    pub fn undo(&mut self, change: &mut Change) {
        for row in change.rows() {
            if let Some(bucket) = self.buckets.get_mut(&row.hash) {
                bucket.remove(row.row_key);
                if bucket.is_empty() {
                    self.buckets.remove(&row.hash);
                }
            }
        }
        for handle in change.archives() {
            self.archives.remove(*handle);
        }
        change.clear();

        if self.buckets.is_empty() {
            self.state = if self.base_dir.is_some() || !self.discovery.is_empty() {
                State::Configured
            } else {
                State::Empty
            };
        }
    }

    // ---- diagnostics ------------------------------------------------------

    /// Writes the fixed-width diagnostic table: `Name (36) | Hash (18 hex,
    /// 0x-prefixed) | Size (12 digits)`, one row per bucket with a winner.
    /// Written atomically (temp file + rename) so a concurrent reader never
    /// observes a half-written dump.
    pub fn dump_index(&self, path: &Path) -> Result<()> {
        let tmp_path = path.with_extension("tmp");
        let write_result = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            let mut rows: Vec<(&str, u64, u64)> = Vec::new();
            for (hash, list) in &self.buckets {
                if let Some(winner) = list.winner() {
                    if winner.priority == 0 {
                        continue;
                    }
                    let size = self.size_of(winner).unwrap_or(UNKNOWN_SIZE);
                    rows.push((winner.name.as_str(), *hash, size));
                }
            }
            rows.sort_by(|a, b| a.0.cmp(b.0));
            for (name, hash, size) in rows {
                writeln!(file, "{name:<36} | 0x{hash:016x} | {size:012}")?;
            }
            file.flush()
        })();

        write_result.map_err(|e| RegistryError::WriteError { path: tmp_path.clone(), source: e })?;
        fs::rename(&tmp_path, path).map_err(|e| RegistryError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

fn split_stem_ext(full_name: &str) -> (String, Option<FileType>) {
    match full_name.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), Some(FileType::new(ext))),
        None => (full_name.to_string(), None),
    }
}

fn parse_hash_algo(name: &str) -> HashAlgo {
    match name.to_ascii_lowercase().as_str() {
        "djb2" => HashAlgo::Djb2,
        "xxh3" => HashAlgo::Xxh3,
        "fnv64" | "" => HashAlgo::Fnv64,
        other => {
            tracing::warn!(configured = other, "unknown hash_algo, falling back to fnv64");
            HashAlgo::Fnv64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;

    use crate::archive::ArchiveEntry;
    use crate::key_bif::KeyFile;

    /// An in-memory archive holding named byte blobs, standing in for a
    /// real ERF/RIM/ZIP/etc. reader.
    struct StubArchive {
        entries: Vec<ArchiveEntry>,
        bodies: Vec<Vec<u8>>,
        algo: Option<HashAlgo>,
        scratch_cleared: Mutex<bool>,
    }

    impl StubArchive {
        fn new(entries: Vec<(&str, &str, &[u8])>) -> Self {
            let mut archive_entries = Vec::new();
            let mut bodies = Vec::new();
            for (i, (name, ty, body)) in entries.into_iter().enumerate() {
                archive_entries.push(ArchiveEntry {
                    name: name.to_string(),
                    file_type: FileType::new(ty),
                    index: i as u32,
                    prehash: None,
                });
                bodies.push(body.to_vec());
            }
            StubArchive { entries: archive_entries, bodies, algo: None, scratch_cleared: Mutex::new(false) }
        }
    }

    impl Archive for StubArchive {
        fn name_hash_algo(&self) -> Option<HashAlgo> {
            self.algo.clone()
        }

        fn resources(&self) -> Vec<ArchiveEntry> {
            self.entries.clone()
        }

        fn open(&self, index: u32) -> Result<Stream> {
            let body = self.bodies[index as usize].clone();
            Ok(Box::new(Cursor::new(body)))
        }

        fn size(&self, index: u32) -> u64 {
            self.bodies[index as usize].len() as u64
        }

        fn clear_scratch(&mut self) {
            *self.scratch_cleared.lock().unwrap() = true;
        }
    }

    /// Hands back whatever archive a test pre-registered under a path,
    /// bypassing real binary parsing entirely.
    #[derive(Default)]
    struct StubProvider {
        archives: Mutex<HashMap<PathBuf, Vec<(&'static str, &'static str, &'static [u8])>>>,
        keys: Mutex<HashMap<PathBuf, KeyFile>>,
    }

    impl StubProvider {
        fn new() -> Self {
            Self::default()
        }

        fn register_archive(&self, path: &Path, entries: Vec<(&'static str, &'static str, &'static [u8])>) {
            self.archives.lock().unwrap().insert(path.to_path_buf(), entries);
        }

        fn register_key(&self, path: &Path, key: KeyFile) {
            self.keys.lock().unwrap().insert(path.to_path_buf(), key);
        }
    }

    impl ContainerProvider for StubProvider {
        fn open_archive(&self, _kind: ArchiveKind, path: &Path) -> Result<Box<dyn Archive>> {
            let entries = self
                .archives
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| RegistryError::OpenError {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no stub registered"),
                })?;
            Ok(Box::new(StubArchive::new(entries)))
        }

        fn open_key(&self, path: &Path) -> Result<KeyFile> {
            self.keys.lock().unwrap().get(path).cloned().ok_or_else(|| RegistryError::OpenError {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no stub key registered"),
            })
        }

        fn open_herf_stream(&self, _stream: Stream) -> Result<Box<dyn Archive>> {
            Err(RegistryError::OpenError {
                path: PathBuf::from("<herf stream>"),
                source: std::io::Error::new(std::io::ErrorKind::Unsupported, "not used in these tests"),
            })
        }
    }

    fn registry_with(tmp: &Path) -> Registry {
        let mut reg = Registry::new(RegistryConfig::default(), Box::new(StubProvider::new()));
        reg.register_base_dir(tmp).unwrap();
        reg
    }

    #[test]
    fn higher_priority_archive_wins_resource_lookup() {
        let tmp = tempfile::tempdir().unwrap();
        let mut reg = registry_with(tmp.path());

        let low = StubArchive::new(vec![("Foo", "WAV", b"low")]);
        let high = StubArchive::new(vec![("Foo", "WAV", b"high")]);
        reg.index_archive(Box::new(low), 1, None).unwrap();
        reg.index_archive(Box::new(high), 10, None).unwrap();

        let (mut stream, ty) = reg.get_resource("foo", FileType::new("WAV")).unwrap().unwrap();
        let mut out = Vec::new();
        std::io::Read::read_to_end(&mut stream, &mut out).unwrap();
        assert_eq!(out, b"high");
        assert_eq!(ty, Some(FileType::new("WAV")));
    }

    #[test]
    fn class_lookup_falls_through_to_next_type_when_winner_is_blacklisted() {
        let tmp = tempfile::tempdir().unwrap();
        let mut reg = registry_with(tmp.path());

        let archive = StubArchive::new(vec![
            ("cursor", "DDS", b"dds-bytes"),
            ("cursor", "TGA", b"tga-bytes"),
        ]);
        reg.index_archive(Box::new(archive), 5, None).unwrap();
        reg.blacklist("cursor", Some(FileType::new("DDS")));

        let (mut stream, ty) = reg.get_resource("cursor", ResourceClass::Cursor).unwrap().unwrap();
        let mut out = Vec::new();
        std::io::Read::read_to_end(&mut stream, &mut out).unwrap();
        assert_eq!(out, b"tga-bytes");
        assert_eq!(ty, Some(FileType::new("TGA")));
    }

    #[test]
    fn type_alias_rewrites_before_hashing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut reg = registry_with(tmp.path());
        reg.add_type_alias(FileType::new("TXB2"), FileType::new("TPC"));

        let archive = StubArchive::new(vec![("splash", "TXB2", b"bytes")]);
        reg.index_archive(Box::new(archive), 1, None).unwrap();

        assert!(reg.has_resource("splash", FileType::new("TPC")));
        assert!(!reg.has_resource("splash", FileType::new("TXB2")));
    }

    #[test]
    fn key_bif_join_indexes_declared_entries_under_their_declared_names() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let bif_dir = base.join("data");
        fs::create_dir_all(&bif_dir).unwrap();
        fs::write(bif_dir.join("module.bif"), b"").unwrap();
        fs::write(base.join("module.key"), b"").unwrap();

        let provider = StubProvider::new();
        provider.register_archive(&bif_dir.join("module.bif"), vec![("raw0", "BIN", b"raw")]);
        provider.register_key(
            &base.join("module.key"),
            KeyFile {
                bifs: vec![crate::key_bif::BifRef {
                    filename: "module.bif".to_string(),
                    entries: vec![crate::key_bif::KeyEntryDecl {
                        name: "hero_portrait".to_string(),
                        file_type: FileType::new("TGA"),
                        bif_local_index: 0,
                    }],
                }],
            },
        );

        let mut reg = Registry::new(RegistryConfig::default(), Box::new(provider));
        reg.register_base_dir(base).unwrap();
        reg.add_archive_dir(ArchiveKind::Key, ".", false).unwrap();
        reg.add_archive_dir(ArchiveKind::Bif, "data", false).unwrap();

        reg.add_archive(ArchiveKind::Key, "module.key", 1, None).unwrap();

        assert!(reg.has_resource("hero_portrait", FileType::new("TGA")));
        assert!(!reg.has_resource("raw0", FileType::new("BIN")));
    }

    #[test]
    fn key_bif_join_fails_when_referenced_bif_is_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        fs::write(base.join("module.key"), b"").unwrap();

        let provider = StubProvider::new();
        provider.register_key(
            &base.join("module.key"),
            KeyFile {
                bifs: vec![crate::key_bif::BifRef {
                    filename: "missing.bif".to_string(),
                    entries: vec![],
                }],
            },
        );

        let mut reg = Registry::new(RegistryConfig::default(), Box::new(provider));
        reg.register_base_dir(base).unwrap();
        reg.add_archive_dir(ArchiveKind::Key, ".", false).unwrap();

        let err = reg.add_archive(ArchiveKind::Key, "module.key", 1, None).unwrap_err();
        assert!(matches!(err, RegistryError::BifNotFound { .. }));
    }

    #[test]
    fn undo_removes_exactly_the_rows_and_archives_recorded_in_the_change() {
        let tmp = tempfile::tempdir().unwrap();
        let mut reg = registry_with(tmp.path());

        let mut change = Change::new();
        let archive = StubArchive::new(vec![("temp", "WAV", b"bytes")]);
        reg.index_archive(Box::new(archive), 5, Some(&mut change)).unwrap();
        assert!(reg.has_resource("temp", FileType::new("WAV")));

        reg.undo(&mut change);
        assert!(!reg.has_resource("temp", FileType::new("WAV")));
        // Undoing an already-drained change is a no-op.
        reg.undo(&mut change);
    }

    #[test]
    fn hash_collision_between_distinct_names_emits_a_warning() {
        let tmp = tempfile::tempdir().unwrap();
        let mut reg = registry_with(tmp.path());
        reg.set_hash_algo(HashAlgo::Custom(std::sync::Arc::new(|_s: &str| 7))).unwrap();

        let archive = StubArchive::new(vec![("alpha", "WAV", b"a"), ("beta", "OGG", b"b")]);
        reg.index_archive(Box::new(archive), 1, None).unwrap();

        // Both land in the same bucket; the winner is whichever inserted
        // last, regardless of which name the bucket first saw.
        assert!(reg.has_resource("beta", FileType::new("OGG")));
    }

    #[test]
    fn dump_index_writes_atomically_and_lists_only_non_blacklisted_winners() {
        let tmp = tempfile::tempdir().unwrap();
        let mut reg = registry_with(tmp.path());

        let archive = StubArchive::new(vec![("visible", "WAV", b"v"), ("hidden", "WAV", b"h")]);
        reg.index_archive(Box::new(archive), 1, None).unwrap();
        reg.blacklist("hidden", Some(FileType::new("WAV")));

        let out_path = tmp.path().join("index.txt");
        reg.dump_index(&out_path).unwrap();
        let contents = fs::read_to_string(&out_path).unwrap();
        assert!(contents.contains("visible"));
        assert!(!contents.contains("hidden"));
        assert!(!out_path.with_extension("tmp").exists());
    }
}
