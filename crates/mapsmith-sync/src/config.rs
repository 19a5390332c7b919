//! Pipeline configuration.
//!
//! Options load from an optional JSON file and can be overridden per field
//! from the CLI. Boolean overrides are parsed strictly so a typo surfaces as
//! an error instead of silently falling back to a default.

use std::fs;
use std::path::{Path, PathBuf};

use mapsmith_core::options::SynthesizerOptions;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SyncError};

const DEFAULT_XML_DIR: &str = "mapper";

/// Options controlling the reconciliation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SyncOptions {
    /// Artifact root, relative paths resolve against the project root.
    pub xml_dir: String,
    /// Treat missing statement ids as a hard error.
    pub fail_on_missing: bool,
    /// Treat orphan statement ids as a hard error.
    pub fail_on_orphan: bool,
    /// Generate stub blocks and orphan annotations (write path).
    pub generate_missing: bool,
    /// Explicit write consent, required on top of `generate_missing`.
    pub allow_write: bool,
    /// Detailed diagnostics.
    pub debug: bool,
    /// Statement synthesis knobs.
    pub synthesizer: SynthesizerOptions,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            xml_dir: DEFAULT_XML_DIR.to_string(),
            fail_on_missing: true,
            fail_on_orphan: false,
            generate_missing: false,
            allow_write: false,
            debug: false,
            synthesizer: SynthesizerOptions::default(),
        }
    }
}

impl SyncOptions {
    /// Loads options from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| SyncError::ConfigError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut options: Self =
            serde_json::from_str(&raw).map_err(|e| SyncError::ConfigError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        options.xml_dir = normalize_xml_dir(&options.xml_dir);
        debug!(path = %path.display(), "loaded config");
        Ok(options)
    }

    /// Artifact root as a path, with trailing separators already stripped.
    #[must_use]
    pub fn xml_dir_path(&self) -> PathBuf {
        PathBuf::from(normalize_xml_dir(&self.xml_dir))
    }
}

/// Trims the value and strips trailing separators; blank input falls back to
/// the default root.
#[must_use]
pub fn normalize_xml_dir(raw: &str) -> String {
    let mut v = raw.trim();
    while v.ends_with('/') || v.ends_with('\\') {
        v = v[..v.len() - 1].trim_end();
    }
    if v.is_empty() {
        DEFAULT_XML_DIR.to_string()
    } else {
        v.to_string()
    }
}

/// Strict boolean parsing for CLI/property overrides.
///
/// `None` or blank keeps the default; anything other than `true`/`false`
/// (case-insensitive) is an error.
pub fn parse_bool_strict(key: &str, raw: Option<&str>, default: bool) -> Result<bool> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let v = raw.trim().to_ascii_lowercase();
    match v.as_str() {
        "" => Ok(default),
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(SyncError::InvalidBoolean {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let opts = SyncOptions::default();
        assert_eq!(opts.xml_dir, "mapper");
        assert!(opts.fail_on_missing);
        assert!(!opts.fail_on_orphan);
        assert!(!opts.generate_missing);
        assert!(!opts.allow_write);
    }

    #[test]
    fn test_normalize_xml_dir() {
        assert_eq!(normalize_xml_dir("mapper/"), "mapper");
        assert_eq!(normalize_xml_dir("  mapper\\\\ "), "mapper");
        assert_eq!(normalize_xml_dir("   "), "mapper");
        assert_eq!(normalize_xml_dir("sql/xml"), "sql/xml");
    }

    #[test]
    fn test_strict_boolean_parsing() {
        assert!(parse_bool_strict("k", None, true).unwrap());
        assert!(parse_bool_strict("k", Some(" TRUE "), false).unwrap());
        assert!(!parse_bool_strict("k", Some("false"), true).unwrap());
        assert!(parse_bool_strict("k", Some(""), true).unwrap());
        assert!(parse_bool_strict("k", Some("yes"), false).is_err());
    }

    #[test]
    fn test_load_from_json() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{ "xml-dir": "sql/mapper/", "fail-on-orphan": true }}"#
        )
        .unwrap();
        let opts = SyncOptions::load(f.path()).unwrap();
        assert_eq!(opts.xml_dir, "sql/mapper");
        assert!(opts.fail_on_orphan);
        assert!(opts.fail_on_missing);
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "not json").unwrap();
        assert!(matches!(
            SyncOptions::load(f.path()),
            Err(SyncError::ConfigError { .. })
        ));
    }
}
