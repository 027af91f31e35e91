//! Canonical resource type handling: alias resolution and the fixed
//! variant-to-canonical rewrite table, plus the semantic resource classes
//! used by the class-based lookup overloads.

use std::collections::HashMap;

/// A canonical, uppercased file-type extension (e.g. `WAV`, `TXB2`).
///
/// Since the concrete archive formats are out of scope here, a type is
/// modeled as the extension string itself rather than a hardcoded
/// enumeration of every known game asset type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileType(String);

impl FileType {
    pub fn new(ext: impl AsRef<str>) -> Self {
        FileType(ext.as_ref().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FileType {
    fn from(s: &str) -> Self {
        FileType::new(s)
    }
}

/// Fixed variant → canonical rewrites applied after the user's alias map,
/// unconditionally, for every resource indexed.
const FIXED_REWRITES: &[(&str, &str)] = &[
    ("QST2", "QST"),
    ("MDX2", "MDX"),
    ("TXB2", "TXB"),
    ("MDB2", "MDB"),
    ("MDA2", "MDA"),
    ("SPT2", "SPT"),
    ("JPG2", "JPG"),
];

/// User-populated `type → type` overrides, consulted before the fixed table.
#[derive(Clone, Debug, Default)]
pub struct TypeAliases {
    aliases: HashMap<FileType, FileType>,
}

impl TypeAliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, alias: FileType, real: FileType) {
        self.aliases.insert(alias, real);
    }

    /// Normalizes `ty` in place, returning `true` if it changed.
    ///
    /// Callers must recompute the resource's hash whenever this returns
    /// `true`: the bucket key is derived from the canonical type, not the
    /// type as originally declared by the container.
    pub fn normalize(&self, ty: &mut FileType) -> bool {
        if let Some(real) = self.aliases.get(ty) {
            *ty = real.clone();
            return true;
        }
        for (src, dst) in FIXED_REWRITES {
            if ty.as_str() == *src {
                *ty = FileType::new(dst);
                return true;
            }
        }
        false
    }
}

/// Semantic resource classes, each expanding to an ordered, fixed list of
/// concrete types tried in order until one resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceClass {
    Image,
    Video,
    Sound,
    Music,
    Cursor,
}

impl ResourceClass {
    pub fn expansion(self) -> Vec<FileType> {
        let exts: &[&str] = match self {
            ResourceClass::Image => &["DDS", "TPC", "TXB", "TGA", "PNG", "BMP", "JPG", "SBM"],
            ResourceClass::Video => &["BIK", "MPG", "WMV", "MOV", "XMV", "VX"],
            ResourceClass::Sound => &["WAV", "OGG", "WMA"],
            ResourceClass::Music => &["WAV", "BMU", "OGG", "WMA"],
            ResourceClass::Cursor => &["CUR", "CURS", "DDS", "TGA"],
        };
        exts.iter().map(|e| FileType::new(e)).collect()
    }
}
