//! Name/type canonicalization into the 64-bit bucket key.

use std::sync::Arc;

use crate::types::FileType;

/// Selects how `(name, type)` pairs are folded into a `u64` bucket key.
///
/// `Custom` exists so tests can install a deliberately-colliding stub
/// algorithm without touching the production variants.
#[derive(Clone)]
pub enum HashAlgo {
    Fnv64,
    Djb2,
    Xxh3,
    Custom(Arc<dyn Fn(&str) -> u64 + Send + Sync>),
}

impl std::fmt::Debug for HashAlgo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgo::Fnv64 => write!(f, "Fnv64"),
            HashAlgo::Djb2 => write!(f, "Djb2"),
            HashAlgo::Xxh3 => write!(f, "Xxh3"),
            HashAlgo::Custom(_) => write!(f, "Custom"),
        }
    }
}

impl PartialEq for HashAlgo {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HashAlgo::Fnv64, HashAlgo::Fnv64) => true,
            (HashAlgo::Djb2, HashAlgo::Djb2) => true,
            (HashAlgo::Xxh3, HashAlgo::Xxh3) => true,
            // Two custom closures are never considered equal to each other or
            // to a named variant; a mismatch there is always surfaced as
            // HashAlgoMismatch, which is the conservative choice.
            _ => false,
        }
    }
}

const FNV64_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV64_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv64(s: &str) -> u64 {
    let mut hash = FNV64_OFFSET_BASIS;
    for byte in s.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV64_PRIME);
    }
    hash
}

fn djb2(s: &str) -> u64 {
    let mut hash: u64 = 5381;
    for byte in s.as_bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(u64::from(*byte));
    }
    hash
}

impl HashAlgo {
    pub fn digest(&self, s: &str) -> u64 {
        match self {
            HashAlgo::Fnv64 => fnv64(s),
            HashAlgo::Djb2 => djb2(s),
            HashAlgo::Xxh3 => xxhash_rust::xxh3::xxh3_64(s.as_bytes()),
            HashAlgo::Custom(f) => f(s),
        }
    }
}

/// The canonical `"name.ext"` string a resource hashes to (or just `"name"`
/// when it carries no type). Exposed separately from `canonical_hash` so
/// the registry can compare canonical keys directly for collision
/// detection without redoing the hash.
pub fn canonical_key(name: &str, ty: Option<&FileType>) -> String {
    let lowered = name.to_ascii_lowercase();
    match ty {
        Some(ty) => format!("{lowered}.{}", ty.as_str().to_ascii_lowercase()),
        None => lowered,
    }
}

/// `hash(name, type) = hash_algo(lowercase(name) + "." + ext(type))`.
///
/// No dot (and no extension) is appended when `ty` is `None`.
pub fn canonical_hash(algo: &HashAlgo, name: &str, ty: Option<&FileType>) -> u64 {
    algo.digest(&canonical_key(name, ty))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv64_matches_known_vector() {
        // FNV-1a 64-bit of the empty string is the offset basis itself.
        assert_eq!(fnv64(""), FNV64_OFFSET_BASIS);
    }

    #[test]
    fn canonical_hash_appends_extension_only_when_type_present() {
        let algo = HashAlgo::Fnv64;
        let with_type = canonical_hash(&algo, "Foo", Some(&FileType::new("WAV")));
        let without_type = canonical_hash(&algo, "Foo", None);
        assert_ne!(with_type, without_type);
        assert_eq!(with_type, algo.digest("foo.wav"));
        assert_eq!(without_type, algo.digest("foo"));
    }

    #[test]
    fn canonical_hash_is_case_insensitive_on_name() {
        let algo = HashAlgo::Djb2;
        let lower = canonical_hash(&algo, "foo", Some(&FileType::new("WAV")));
        let mixed = canonical_hash(&algo, "FoO", Some(&FileType::new("WAV")));
        assert_eq!(lower, mixed);
    }

    #[test]
    fn custom_algo_can_force_a_collision() {
        let stub = HashAlgo::Custom(Arc::new(|_s: &str| 42));
        let a = canonical_hash(&stub, "foo", Some(&FileType::new("WAV")));
        let b = canonical_hash(&stub, "bar", Some(&FileType::new("OGG")));
        assert_eq!(a, b);
    }
}
