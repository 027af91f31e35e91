//! Typed configuration for the knobs the registry exposes, loadable from an
//! optional TOML file with per-field defaults — the same
//! `#[serde(default)]` + `impl Default` shape this codebase otherwise uses
//! for its settings structs, except a present-but-malformed file is a hard
//! error here rather than a silent fallback: misconfiguring `hash_algo` has
//! sharper consequences than misconfiguring a scan heuristic.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_hash_algo_name() -> String {
    "fnv64".to_string()
}

fn default_rims_are_erfs() -> bool {
    false
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// One of `"fnv64"` (default), `"djb2"`, or `"xxh3"`.
    pub hash_algo: String,

    /// When true, RIM-globbed files are additionally considered when
    /// scanning ERF search directories.
    pub rims_are_erfs: bool,

    /// Ordered logical cursor names consumed by the EXE/PE archive reader.
    pub cursor_remap: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            hash_algo: default_hash_algo_name(),
            rims_are_erfs: default_rims_are_erfs(),
            cursor_remap: Vec::new(),
        }
    }
}

/// Loads `path` as TOML. A missing file yields `RegistryConfig::default()`;
/// a present file that fails to parse is surfaced as an error rather than
/// silently discarded.
pub fn load_config(path: &Path) -> Result<RegistryConfig> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(RegistryConfig::default());
        }
        Err(err) => return Err(err).with_context(|| format!("reading {}", path.display())),
    };

    toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = load_config(Path::new("/nonexistent/registry.toml")).unwrap();
        assert_eq!(cfg.hash_algo, "fnv64");
        assert!(!cfg.rims_are_erfs);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("registry.toml");
        fs::write(&path, "this is not valid toml = = =").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("registry.toml");
        fs::write(&path, "rims_are_erfs = true\n").unwrap();
        let cfg = load_config(&path).unwrap();
        assert!(cfg.rims_are_erfs);
        assert_eq!(cfg.hash_algo, "fnv64");
    }
}
