//! Pipeline orchestration: scan, diff, patch, enforce.
//!
//! Overload collisions and duplicate namespaces abort before anything is
//! written. Everything downstream is best-effort per artifact: a failure
//! patching one file logs and leaves that file untouched while the rest of
//! the run proceeds.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mapsmith_core::dialect::resolve_dialect;
use mapsmith_core::naming::{to_pascal_case, to_snake_case, SnakeCaseStrategy};
use mapsmith_core::schema::{EntityDescriptor, FieldDescriptor, FieldTag, TableInfo};
use mapsmith_core::statement::{synthesize, StatementBlock};
use tracing::{debug, error, info, warn};

use crate::artifact::{self, XmlIndex};
use crate::config::SyncOptions;
use crate::diff::{self, DiffResult};
use crate::entity::{map_sql_type, SchemaSnapshot};
use crate::error::{Result, SyncError};
use crate::gate::WriteGate;
use crate::interface::{self, MapperInterface};
use crate::region;

const SUMMARY_PREVIEW: usize = 5;
const DETAILED_LIMIT: usize = 50;

/// Schemas registered per namespace, used to synthesize real statements
/// instead of TODO stubs for missing ids.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entries: BTreeMap<String, RegisteredSchema>,
}

/// One registered schema.
#[derive(Debug, Clone)]
pub struct RegisteredSchema {
    /// Resolved table metadata.
    pub info: Arc<TableInfo>,
    /// Declared-type path emitted into `resultType` attributes.
    pub result_type: String,
}

impl SchemaRegistry {
    /// Registers a schema for a namespace.
    pub fn register(
        &mut self,
        namespace: impl Into<String>,
        info: Arc<TableInfo>,
        result_type: impl Into<String>,
    ) {
        self.entries.insert(
            namespace.into(),
            RegisteredSchema {
                info,
                result_type: result_type.into(),
            },
        );
    }

    /// Schema registered for `namespace`, if any.
    #[must_use]
    pub fn get(&self, namespace: &str) -> Option<&RegisteredSchema> {
        self.entries.get(namespace)
    }

    /// Builds a registry from a captured schema snapshot. Each table maps to
    /// `{prefix}.{PascalName}Mapper`, the convention the entity generator
    /// uses for companion artifacts.
    pub fn from_snapshot(snapshot: &SchemaSnapshot, namespace_prefix: &str) -> Result<Self> {
        let mut registry = Self::default();

        for table in &snapshot.tables {
            if table.name.trim().is_empty() {
                continue;
            }
            let type_name = to_pascal_case(&to_snake_case(&table.name));

            let mut desc = EntityDescriptor::new(&type_name).table(&table.name);
            for column in &table.columns {
                let field_name = to_snake_case(&column.name);
                let rust_type = if field_name.eq_ignore_ascii_case("id") {
                    "i64"
                } else {
                    map_sql_type(&column.sql_type)
                };
                let mut field = FieldDescriptor::new(&field_name, rust_type)
                    .tag(FieldTag::ColumnOverride(column.name.clone()));
                if field_name.eq_ignore_ascii_case("id") {
                    field = field.tag(FieldTag::PrimaryKey);
                }
                desc = desc.field(field);
            }

            let info = TableInfo::resolve(&desc, &SnakeCaseStrategy)?;
            let namespace = format!("{namespace_prefix}.{type_name}Mapper");
            registry.register(namespace, Arc::new(info), type_name);
        }

        Ok(registry)
    }
}

/// What a run did.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// The computed diff.
    pub diff: DiffResult,
    /// Artifacts created or patched, per namespace.
    pub patched: Vec<(String, PathBuf)>,
    /// Namespaces whose patching failed and were left untouched.
    pub failed: Vec<String>,
    /// The write gate refused, so the run was report-only.
    pub write_skipped: bool,
}

/// The reconciliation pipeline.
pub struct Pipeline<'a> {
    options: &'a SyncOptions,
    registry: &'a SchemaRegistry,
    product_name: Option<String>,
    cwd: PathBuf,
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline rooted at `cwd`.
    #[must_use]
    pub fn new(
        options: &'a SyncOptions,
        registry: &'a SchemaRegistry,
        product_name: Option<String>,
        cwd: PathBuf,
    ) -> Self {
        Self {
            options,
            registry,
            product_name,
            cwd,
        }
    }

    /// Artifact root resolved against the project root.
    #[must_use]
    pub fn artifact_root(&self) -> PathBuf {
        artifact::resolve_artifact_root(&self.options.xml_dir_path(), &self.cwd)
    }

    /// Scans interfaces and artifacts and computes the diff. Read-only.
    ///
    /// An overload collision aborts before the diff; the statement-id space
    /// is flat per namespace.
    pub fn check(&self, interfaces: &[MapperInterface]) -> Result<DiffResult> {
        let scan = interface::scan(interfaces);
        if scan.has_collisions() {
            return Err(SyncError::OverloadedMethods(scan.collision_pairs()));
        }

        let root = self.artifact_root();
        debug!(root = %root.display(), "scanning artifacts");
        let index = artifact::scan(&root)?;

        Ok(diff::diff(&scan.expected, &index))
    }

    /// Full run: check, then (gated) create or patch artifacts, then apply
    /// the severity policy. A collision writes zero files.
    pub fn sync(&self, interfaces: &[MapperInterface]) -> Result<SyncReport> {
        let scan = interface::scan(interfaces);
        if scan.has_collisions() {
            return Err(SyncError::OverloadedMethods(scan.collision_pairs()));
        }

        let root = self.artifact_root();
        let index = artifact::scan(&root)?;
        let diff = diff::diff(&scan.expected, &index);

        let mut report = SyncReport {
            diff: diff.clone(),
            ..SyncReport::default()
        };

        let has_work = !diff.is_clean();
        if self.options.generate_missing && has_work {
            let gate = WriteGate::new(self.options.generate_missing, self.options.allow_write);
            if gate.confirm(&project_root(&self.cwd), &[&root]) {
                self.apply(&diff, &index, &root, &mut report);
            } else {
                report.write_skipped = true;
            }
        }

        self.enforce(&diff)?;
        Ok(report)
    }

    /// Applies patches per namespace, best-effort.
    fn apply(&self, diff: &DiffResult, index: &XmlIndex, root: &Path, report: &mut SyncReport) {
        let mut namespaces: BTreeSet<&str> =
            diff.missing.keys().map(String::as_str).collect();
        namespaces.extend(diff.orphan.keys().map(String::as_str));

        for ns in namespaces {
            let missing = diff.missing.get(ns).cloned().unwrap_or_default();
            let orphans = diff.orphan.get(ns).cloned().unwrap_or_default();

            match self.patch_namespace(ns, &missing, &orphans, index, root) {
                Ok(Some(path)) => report.patched.push((ns.to_string(), path)),
                Ok(None) => {}
                Err(e) => {
                    // Best-effort per artifact: this one passes through
                    // unmodified, the run continues.
                    error!(namespace = ns, error = %e, "patching failed, artifact left untouched");
                    report.failed.push(ns.to_string());
                }
            }
        }
    }

    fn patch_namespace(
        &self,
        namespace: &str,
        missing: &BTreeSet<String>,
        orphans: &BTreeSet<String>,
        index: &XmlIndex,
        root: &Path,
    ) -> Result<Option<PathBuf>> {
        let path = index
            .path_of(namespace)
            .map_or_else(|| root.join(default_artifact_name(namespace)), Path::to_path_buf);

        if !path.exists() {
            // A fresh artifact only makes sense when something is missing;
            // orphans without a file are nothing to annotate.
            if missing.is_empty() {
                return Ok(None);
            }
            let blocks = self.blocks_for(namespace, missing, &BTreeSet::new());
            region::write_new_artifact(&path, namespace, &blocks)?;
            return Ok(Some(path));
        }

        region::ensure_region(&path)?;
        let present = index.ids_of(namespace);
        let blocks = self.blocks_for(namespace, missing, &present);
        region::append_missing(&path, &blocks)?;
        region::annotate_orphans(&path, orphans)?;
        info!(namespace, path = %path.display(), "patched artifact");
        Ok(Some(path))
    }

    /// Blocks for the missing ids: synthesized statements where a schema is
    /// registered for the namespace, TODO stubs for everything else.
    fn blocks_for(
        &self,
        namespace: &str,
        missing: &BTreeSet<String>,
        present: &BTreeSet<String>,
    ) -> Vec<StatementBlock> {
        let mut blocks = Vec::new();
        let mut covered = BTreeSet::new();

        if self.options.synthesizer.enabled {
            if let Some(registered) = self.registry.get(namespace) {
                let dialect = resolve_dialect(
                    self.options.synthesizer.dialect,
                    self.product_name.as_deref(),
                );
                for block in synthesize(
                    &registered.info,
                    &registered.result_type,
                    dialect,
                    &self.options.synthesizer,
                    present,
                ) {
                    if missing.contains(&block.id) {
                        covered.insert(block.id.clone());
                        blocks.push(block);
                    }
                }
            }
        }

        for id in missing {
            if !covered.contains(id) {
                blocks.push(region::stub_block(id));
            }
        }

        blocks
    }

    /// Severity policy: missing first (the more severe finding), then
    /// orphans, each a warning or a hard error per configuration.
    fn enforce(&self, diff: &DiffResult) -> Result<()> {
        if !diff.missing.is_empty() {
            let msg = if self.options.debug {
                diff.format_missing_detailed(DETAILED_LIMIT)
            } else {
                diff.format_missing(SUMMARY_PREVIEW)
            };
            if self.options.fail_on_missing {
                return Err(SyncError::MissingStatements(msg));
            }
            warn!("{msg}");
        }

        if !diff.orphan.is_empty() {
            let msg = if self.options.debug {
                diff.format_orphan_detailed(DETAILED_LIMIT)
            } else {
                diff.format_orphan(SUMMARY_PREVIEW)
            };
            if self.options.fail_on_orphan {
                return Err(SyncError::OrphanStatements(msg));
            }
            warn!("{msg}");
        }

        Ok(())
    }
}

/// Nearest ancestor of `cwd` carrying a `Cargo.toml` or `.git`, else `cwd`.
#[must_use]
pub fn project_root(cwd: &Path) -> PathBuf {
    let mut cur = cwd;
    loop {
        if cur.join("Cargo.toml").exists() || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(parent) => cur = parent,
            None => return cwd.to_path_buf(),
        }
    }
}

/// Artifact file name for a namespace without one: its last dotted segment.
#[must_use]
pub fn default_artifact_name(namespace: &str) -> String {
    let simple = namespace.rsplit('.').next().unwrap_or(namespace);
    format!("{simple}.xml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::MapperMethod;

    #[test]
    fn test_default_artifact_name() {
        assert_eq!(default_artifact_name("orders.OrderMapper"), "OrderMapper.xml");
        assert_eq!(default_artifact_name("Flat"), "Flat.xml");
    }

    #[test]
    fn test_registry_from_snapshot_maps_namespaces() {
        use crate::entity::{ColumnSnapshot, TableSnapshot};

        let snapshot = SchemaSnapshot {
            product_name: None,
            tables: vec![TableSnapshot {
                name: "order_item".to_string(),
                columns: vec![
                    ColumnSnapshot {
                        name: "id".to_string(),
                        sql_type: "BIGINT".to_string(),
                    },
                    ColumnSnapshot {
                        name: "quantity".to_string(),
                        sql_type: "INTEGER".to_string(),
                    },
                ],
            }],
        };

        let registry = SchemaRegistry::from_snapshot(&snapshot, "mapper").unwrap();
        let registered = registry.get("mapper.OrderItemMapper").unwrap();
        assert_eq!(registered.result_type, "OrderItem");
        assert_eq!(registered.info.table_name, "order_item");
        assert_eq!(registered.info.pk_column(), "id");
    }

    #[test]
    fn test_collision_aborts_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();

        let options = SyncOptions {
            generate_missing: true,
            allow_write: true,
            ..SyncOptions::default()
        };
        let registry = SchemaRegistry::default();
        let pipeline = Pipeline::new(&options, &registry, None, dir.path().to_path_buf());

        let mapper = MapperInterface::new("orders.OrderMapper")
            .method(MapperMethod::new("findActive"))
            .method(MapperMethod::new("findActive"));

        let err = pipeline.sync(&[mapper]).unwrap_err();
        assert!(matches!(err, SyncError::OverloadedMethods(_)));
        // Zero files written.
        assert!(!dir.path().join("mapper").exists());
    }
}
