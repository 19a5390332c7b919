//! Artifact scanning: mapper xml files to a namespace index.
//!
//! Scanning is textual: the namespace attribute and statement ids are pulled
//! with regexes after stripping comments, so no entity or DTD expansion can
//! ever run against untrusted artifact content.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};

fn comment_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").unwrap())
}

fn namespace_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<mapper\b[^>]*?\bnamespace\s*=\s*"([^"]+)""#).unwrap())
}

fn statement_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<(select|insert|update|delete)\b[^>]*?\bid\s*=\s*"([^"]+)""#).unwrap()
    })
}

/// Index of scanned artifacts: namespace to path and to present statement ids.
#[derive(Debug, Clone, Default)]
pub struct XmlIndex {
    path_of: BTreeMap<String, PathBuf>,
    ids_of: BTreeMap<String, BTreeSet<String>>,
}

impl XmlIndex {
    /// Path of the artifact claiming `namespace`, if any.
    #[must_use]
    pub fn path_of(&self, namespace: &str) -> Option<&Path> {
        self.path_of.get(namespace).map(PathBuf::as_path)
    }

    /// Statement ids present for `namespace`; empty when unknown.
    #[must_use]
    pub fn ids_of(&self, namespace: &str) -> BTreeSet<String> {
        self.ids_of.get(namespace).cloned().unwrap_or_default()
    }

    /// All indexed namespaces, sorted.
    #[must_use]
    pub fn namespaces(&self) -> Vec<&str> {
        self.path_of.keys().map(String::as_str).collect()
    }

    /// Number of indexed artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.path_of.len()
    }

    /// True when nothing was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path_of.is_empty()
    }
}

/// Scans the artifact root into an [`XmlIndex`].
///
/// The layout is flat by policy: an xml file inside a subdirectory of the
/// root is a hard error, as is the same namespace claimed by two files. A
/// missing root yields an empty index. Files without a namespace attribute
/// are skipped with a warning.
pub fn scan(root: &Path) -> Result<XmlIndex> {
    let mut index = XmlIndex::default();

    if !root.exists() {
        debug!(root = %root.display(), "artifact root does not exist, empty index");
        return Ok(index);
    }

    for path in collect_xml_files(root)? {
        let rel = path.strip_prefix(root).unwrap_or(&path);
        if rel.components().count() != 1 {
            return Err(SyncError::NestedArtifact(path));
        }

        let content = fs::read_to_string(&path)?;
        let Some(namespace) = extract_namespace(&content) else {
            warn!(path = %path.display(), "artifact has no namespace attribute, skipped");
            continue;
        };

        if let Some(first) = index.path_of.get(&namespace) {
            return Err(SyncError::DuplicateNamespace {
                namespace,
                first: first.clone(),
                second: path,
            });
        }

        let ids = extract_statement_ids(&content);
        debug!(namespace = %namespace, ids = ids.len(), path = %path.display(), "indexed artifact");
        index.path_of.insert(namespace.clone(), path);
        index.ids_of.insert(namespace, ids);
    }

    Ok(index)
}

fn collect_xml_files(root: &Path) -> Result<Vec<PathBuf>> {
    fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                walk(&path, out)?;
            } else if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("xml")) {
                out.push(path);
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    walk(root, &mut files)?;
    files.sort();
    Ok(files)
}

/// Namespace attribute of the root element, comments excluded.
#[must_use]
pub fn extract_namespace(content: &str) -> Option<String> {
    let stripped = comment_pattern().replace_all(content, "");
    namespace_pattern()
        .captures(&stripped)
        .map(|c| c[1].trim().to_string())
        .filter(|ns| !ns.is_empty())
}

/// Statement ids present anywhere in the artifact, comments excluded.
#[must_use]
pub fn extract_statement_ids(content: &str) -> BTreeSet<String> {
    let stripped = comment_pattern().replace_all(content, "");
    statement_id_pattern()
        .captures_iter(&stripped)
        .map(|c| c[2].trim().to_string())
        .collect()
}

/// Resolves the artifact root against the project root.
///
/// Absolute configured roots pass through. Relative ones resolve against the
/// nearest ancestor of `cwd` carrying a project-boundary marker (`Cargo.toml`
/// or `.git`), falling back to `cwd` itself. The walk result is memoized per
/// working directory; entries are write-once.
#[must_use]
pub fn resolve_artifact_root(xml_dir: &Path, cwd: &Path) -> PathBuf {
    if xml_dir.is_absolute() {
        return xml_dir.to_path_buf();
    }
    project_root_for(cwd).join(xml_dir)
}

fn project_root_cache() -> &'static Mutex<HashMap<PathBuf, PathBuf>> {
    static CACHE: OnceLock<Mutex<HashMap<PathBuf, PathBuf>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

fn project_root_for(cwd: &Path) -> PathBuf {
    if let Ok(cache) = project_root_cache().lock() {
        if let Some(root) = cache.get(cwd) {
            return root.clone();
        }
    }

    let root = find_project_root(cwd).unwrap_or_else(|| cwd.to_path_buf());

    if let Ok(mut cache) = project_root_cache().lock() {
        cache.entry(cwd.to_path_buf()).or_insert_with(|| root.clone());
    }
    root
}

fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut cur = Some(start);
    while let Some(dir) = cur {
        if dir.join("Cargo.toml").exists() || dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        cur = dir.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_scan_indexes_namespace_and_ids() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "OrderMapper.xml",
            r#"<mapper namespace="orders.OrderMapper">
	<select id="findById">SELECT 1</select>
	<insert id="insert">INSERT</insert>
</mapper>"#,
        );

        let index = scan(dir.path()).unwrap();
        assert_eq!(index.namespaces(), vec!["orders.OrderMapper"]);
        let ids = index.ids_of("orders.OrderMapper");
        assert!(ids.contains("findById"));
        assert!(ids.contains("insert"));
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_commented_statements_are_not_indexed() {
        let content = r#"<mapper namespace="orders.OrderMapper">
	<!-- <select id="ghost">SELECT 1</select> -->
	<select id="real">SELECT 1</select>
</mapper>"#;
        let ids = extract_statement_ids(content);
        assert!(ids.contains("real"));
        assert!(!ids.contains("ghost"));
    }

    #[test]
    fn test_nested_artifact_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        write(
            &dir.path().join("sub"),
            "Hidden.xml",
            r#"<mapper namespace="hidden.Mapper"></mapper>"#,
        );

        assert!(matches!(
            scan(dir.path()),
            Err(SyncError::NestedArtifact(_))
        ));
    }

    #[test]
    fn test_duplicate_namespace_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "A.xml", r#"<mapper namespace="dup.Mapper"></mapper>"#);
        write(dir.path(), "B.xml", r#"<mapper namespace="dup.Mapper"></mapper>"#);

        assert!(matches!(
            scan(dir.path()),
            Err(SyncError::DuplicateNamespace { .. })
        ));
    }

    #[test]
    fn test_missing_root_yields_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let index = scan(&dir.path().join("nope")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_file_without_namespace_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Plain.xml", "<mapper></mapper>");
        let index = scan(dir.path()).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_resolve_artifact_root_walks_to_marker() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        let nested = dir.path().join("crates/app");
        fs::create_dir_all(&nested).unwrap();

        let resolved = resolve_artifact_root(Path::new("mapper"), &nested);
        assert_eq!(resolved, dir.path().join("mapper"));

        // Absolute configured roots win outright.
        let abs = resolve_artifact_root(dir.path(), &nested);
        assert_eq!(abs, dir.path());
    }
}
