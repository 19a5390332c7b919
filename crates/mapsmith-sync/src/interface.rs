//! Interface scanning: declared mapper interfaces to expected statement ids.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SyncError};

/// One declared operation on a mapper interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MapperMethod {
    /// Method name, doubling as the statement id.
    pub name: String,
    /// The method carries its own inline statement and is not generated.
    #[serde(default)]
    pub inline_statement: bool,
    /// Default methods are implementation details, not statements.
    #[serde(default)]
    pub default_method: bool,
    /// Associated functions are not statements either.
    #[serde(default)]
    pub static_method: bool,
}

impl MapperMethod {
    /// Creates a plain abstract method declaration.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inline_statement: false,
            default_method: false,
            static_method: false,
        }
    }

    /// Marks the method as carrying its own inline statement.
    #[must_use]
    pub const fn inline(mut self) -> Self {
        self.inline_statement = true;
        self
    }

    /// Marks the method as a default method.
    #[must_use]
    pub const fn default_impl(mut self) -> Self {
        self.default_method = true;
        self
    }

    /// Marks the method as an associated function.
    #[must_use]
    pub const fn associated(mut self) -> Self {
        self.static_method = true;
        self
    }
}

/// One declared mapper interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MapperInterface {
    /// Namespace, unique per interface.
    pub namespace: String,
    /// Declared methods.
    #[serde(default)]
    pub methods: Vec<MapperMethod>,
}

impl MapperInterface {
    /// Creates an interface declaration.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            methods: Vec::new(),
        }
    }

    /// Adds a method declaration.
    #[must_use]
    pub fn method(mut self, method: MapperMethod) -> Self {
        self.methods.push(method);
        self
    }
}

/// Loads interface declarations from a JSON manifest.
pub fn load_manifest(path: &Path) -> Result<Vec<MapperInterface>> {
    let raw = fs::read_to_string(path).map_err(|e| SyncError::ConfigError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let interfaces: Vec<MapperInterface> =
        serde_json::from_str(&raw).map_err(|e| SyncError::ConfigError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    debug!(path = %path.display(), interfaces = interfaces.len(), "loaded manifest");
    Ok(interfaces)
}

/// Scan result: expected statement ids and overload collisions, per namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceScan {
    /// Expected statement ids per namespace, sorted.
    pub expected: BTreeMap<String, BTreeSet<String>>,
    /// Method names declared more than once, per namespace.
    pub overloaded: BTreeMap<String, BTreeSet<String>>,
}

impl InterfaceScan {
    /// True when at least one namespace has an overload collision.
    #[must_use]
    pub fn has_collisions(&self) -> bool {
        !self.overloaded.is_empty()
    }

    /// Flattened (namespace, name) collision pairs, sorted.
    #[must_use]
    pub fn collision_pairs(&self) -> Vec<(String, String)> {
        self.overloaded
            .iter()
            .flat_map(|(ns, names)| names.iter().map(move |n| (ns.clone(), n.clone())))
            .collect()
    }
}

/// Walks declared interfaces and derives the expected statement-id set.
///
/// Default methods, associated functions, and methods carrying their own
/// inline statement are skipped. A method name declared twice or more in one
/// namespace is an overload collision; the id space is flat per namespace.
#[must_use]
pub fn scan(interfaces: &[MapperInterface]) -> InterfaceScan {
    let mut result = InterfaceScan::default();

    for mapper in interfaces {
        let mut ids = BTreeSet::new();
        let mut name_count: HashMap<&str, usize> = HashMap::new();

        for method in &mapper.methods {
            if method.default_method || method.static_method || method.inline_statement {
                continue;
            }
            *name_count.entry(method.name.as_str()).or_insert(0) += 1;
            ids.insert(method.name.clone());
        }

        let collisions: BTreeSet<String> = name_count
            .iter()
            .filter(|(_, count)| **count >= 2)
            .map(|(name, _)| (*name).to_string())
            .collect();
        if !collisions.is_empty() {
            result.overloaded.insert(mapper.namespace.clone(), collisions);
        }

        debug!(namespace = %mapper.namespace, ids = ids.len(), "scanned interface");
        result.expected.insert(mapper.namespace.clone(), ids);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_collects_abstract_methods() {
        let mapper = MapperInterface::new("orders.OrderMapper")
            .method(MapperMethod::new("findById"))
            .method(MapperMethod::new("insert"))
            .method(MapperMethod::new("helper").default_impl())
            .method(MapperMethod::new("of").associated())
            .method(MapperMethod::new("findSpecial").inline());

        let result = scan(&[mapper]);
        let ids = &result.expected["orders.OrderMapper"];
        assert_eq!(
            ids.iter().collect::<Vec<_>>(),
            vec!["findById", "insert"]
        );
        assert!(!result.has_collisions());
    }

    #[test]
    fn test_overload_collision_is_flagged() {
        let mapper = MapperInterface::new("orders.OrderMapper")
            .method(MapperMethod::new("findActive"))
            .method(MapperMethod::new("findActive"));

        let result = scan(&[mapper]);
        assert!(result.has_collisions());
        assert_eq!(
            result.collision_pairs(),
            vec![("orders.OrderMapper".to_string(), "findActive".to_string())]
        );
        // The colliding id still appears once in the expected set.
        assert!(result.expected["orders.OrderMapper"].contains("findActive"));
    }

    #[test]
    fn test_manifest_round_trip() {
        use std::io::Write;

        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"[{{"namespace": "orders.OrderMapper",
                 "methods": [{{"name": "findById"}},
                             {{"name": "helper", "default-method": true}}]}}]"#
        )
        .unwrap();

        let interfaces = load_manifest(f.path()).unwrap();
        assert_eq!(interfaces.len(), 1);
        let result = scan(&interfaces);
        let ids = &result.expected["orders.OrderMapper"];
        assert_eq!(ids.iter().collect::<Vec<_>>(), vec!["findById"]);
    }

    #[test]
    fn test_namespaces_are_sorted() {
        let result = scan(&[
            MapperInterface::new("b.Mapper").method(MapperMethod::new("findAll")),
            MapperInterface::new("a.Mapper").method(MapperMethod::new("findAll")),
        ]);
        let namespaces: Vec<_> = result.expected.keys().collect();
        assert_eq!(namespaces, vec!["a.Mapper", "b.Mapper"]);
    }
}
