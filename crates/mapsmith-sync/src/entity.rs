//! Entity generation from a captured schema snapshot.
//!
//! A snapshot (tables and columns, serialized as JSON by whatever captured
//! it) drives two things per table: a struct source file, created whole when
//! absent and drift-reconciled when present, and a companion mapper artifact
//! skeleton created when absent. No live database connection is involved.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use mapsmith_core::naming::{to_pascal_case, to_snake_case};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::drift::{self, SchemaField, ADDED_BLOCK_BEGIN, ADDED_BLOCK_END};
use crate::error::Result;
use crate::region;

/// One column in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ColumnSnapshot {
    /// Column name as reported by the engine.
    pub name: String,
    /// Declared SQL type name (`BIGINT`, `VARCHAR`, ...).
    pub sql_type: String,
}

/// One table in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TableSnapshot {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnSnapshot>,
}

/// A captured schema snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SchemaSnapshot {
    /// Database product name as reported by the engine, if captured. Feeds
    /// dialect sniffing when no dialect is configured.
    #[serde(default)]
    pub product_name: Option<String>,
    /// All tables.
    pub tables: Vec<TableSnapshot>,
}

impl SchemaSnapshot {
    /// Loads a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Placement options for generated entity sources and artifact skeletons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EntityOptions {
    /// Directory for struct sources.
    pub entity_dir: String,
    /// Directory for companion artifact skeletons.
    pub xml_dir: String,
    /// Namespace prefix for companion artifacts.
    pub namespace_prefix: String,
    /// Place each table's source under a per-module subdirectory.
    pub module_dirs: bool,
    /// module -> tables routed into it.
    pub module_mapping: BTreeMap<String, Vec<String>>,
    /// Module for tables no mapping claims.
    pub default_module: String,
}

impl Default for EntityOptions {
    fn default() -> Self {
        Self {
            entity_dir: "src/entity".to_string(),
            xml_dir: "mapper".to_string(),
            namespace_prefix: "mapper".to_string(),
            module_dirs: false,
            module_mapping: BTreeMap::new(),
            default_module: "misc".to_string(),
        }
    }
}

/// What the entity sync did, per file.
#[derive(Debug, Clone, Default)]
pub struct EntityReport {
    /// Struct sources created from scratch.
    pub created: Vec<PathBuf>,
    /// Struct sources rewritten by drift reconciliation.
    pub updated: Vec<PathBuf>,
    /// Companion artifacts created.
    pub artifacts_created: Vec<PathBuf>,
}

/// Creates or reconciles one source file per snapshot table, plus a companion
/// artifact skeleton when none exists. Existing artifacts are left to the
/// statement pipeline.
pub fn sync_entities(
    snapshot: &SchemaSnapshot,
    options: &EntityOptions,
    root: &Path,
) -> Result<EntityReport> {
    let table_to_module = build_table_module_map(&options.module_mapping);
    let mut report = EntityReport::default();

    for table in &snapshot.tables {
        if table.name.trim().is_empty() {
            continue;
        }

        let entity_dir = if options.module_dirs {
            let module = table_to_module
                .get(&normalize_table_name(&table.name))
                .map_or(options.default_module.as_str(), String::as_str);
            root.join(&options.entity_dir).join(module)
        } else {
            root.join(&options.entity_dir)
        };
        fs::create_dir_all(&entity_dir)?;

        let type_name = to_pascal_case(&to_snake_case(&table.name));
        let source_path = entity_dir.join(format!("{}.rs", to_snake_case(&table.name)));
        let schema = snapshot_fields(table);

        if source_path.exists() {
            let content = fs::read_to_string(&source_path)?;
            let outcome = drift::reconcile(&content, &table.name, &schema);
            if outcome.changed {
                region::atomic_write(&source_path, &outcome.content)?;
                info!(path = %source_path.display(), "synced entity source");
                report.updated.push(source_path);
            }
        } else {
            let source = render_struct_source(&type_name, &schema);
            region::atomic_write(&source_path, &source)?;
            info!(path = %source_path.display(), "created entity source");
            report.created.push(source_path);
        }

        let xml_dir = root.join(&options.xml_dir);
        fs::create_dir_all(&xml_dir)?;
        let xml_path = xml_dir.join(format!("{type_name}Mapper.xml"));
        if !xml_path.exists() {
            let namespace = format!("{}.{type_name}Mapper", options.namespace_prefix);
            region::write_new_artifact(&xml_path, &namespace, &[])?;
            report.artifacts_created.push(xml_path);
        }
    }

    Ok(report)
}

/// Derived field list for a snapshot table. `id` is always `i64`.
#[must_use]
pub fn snapshot_fields(table: &TableSnapshot) -> Vec<SchemaField> {
    table
        .columns
        .iter()
        .map(|col| {
            let field = to_snake_case(&col.name).to_ascii_lowercase();
            let rust_type = if field == "id" {
                "i64".to_string()
            } else {
                map_sql_type(&col.sql_type).to_string()
            };
            SchemaField::new(field, col.name.clone(), rust_type)
        })
        .collect()
}

/// SQL type name to the Rust type emitted in declarations. Unrecognized
/// types fall back to `String`.
#[must_use]
pub fn map_sql_type(sql_type: &str) -> &'static str {
    let t = sql_type.trim().to_ascii_uppercase();
    match t.as_str() {
        "BIGINT" | "INT8" | "BIGSERIAL" => "i64",
        "INT" | "INTEGER" | "INT4" | "SMALLINT" | "TINYINT" | "SERIAL" => "i32",
        "BOOLEAN" | "BOOL" | "BIT" => "bool",
        "DOUBLE" | "DOUBLE PRECISION" | "FLOAT" | "REAL" => "f64",
        "DATE" => "NaiveDate",
        _ if t.starts_with("TIMESTAMP") => "DateTime<Utc>",
        _ => "String",
    }
}

fn render_struct_source(type_name: &str, fields: &[SchemaField]) -> String {
    let needs_chrono = fields
        .iter()
        .any(|f| f.rust_type.contains("DateTime") || f.rust_type == "NaiveDate");

    let mut out = String::with_capacity(256 + fields.len() * 32);
    if needs_chrono {
        out.push_str("use chrono::{DateTime, NaiveDate, Utc};\n\n");
    }
    out.push_str("#[derive(Debug, Clone, Default, PartialEq)]\n");
    out.push_str(&format!("pub struct {type_name} {{\n"));
    for f in fields {
        if f.field == "id" {
            out.push_str("    /// Primary key.\n");
        }
        out.push_str(&format!("    pub {}: {},\n", f.field, f.rust_type));
    }
    out.push('\n');
    out.push_str(&format!("{ADDED_BLOCK_BEGIN}\n{ADDED_BLOCK_END}\n"));
    out.push_str("}\n");
    out
}

/// Inverts module -> tables into table -> module. A table claimed by two
/// modules keeps the first mapping; the conflict is logged.
#[must_use]
pub fn build_table_module_map(mapping: &BTreeMap<String, Vec<String>>) -> BTreeMap<String, String> {
    let mut table_to_module = BTreeMap::new();

    for (module, tables) in mapping {
        let module = module.trim();
        if module.is_empty() {
            continue;
        }
        for table in tables {
            let norm = normalize_table_name(table);
            if norm.is_empty() {
                continue;
            }
            if let Some(prev) = table_to_module.get(&norm) {
                if prev != module {
                    warn!(table = %norm, kept = %prev, ignored = module, "table mapping conflict");
                }
                continue;
            }
            table_to_module.insert(norm, module.to_string());
        }
    }

    table_to_module
}

fn normalize_table_name(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_table() -> TableSnapshot {
        TableSnapshot {
            name: "customer_order".to_string(),
            columns: vec![
                ColumnSnapshot {
                    name: "id".to_string(),
                    sql_type: "INTEGER".to_string(),
                },
                ColumnSnapshot {
                    name: "customer_name".to_string(),
                    sql_type: "VARCHAR".to_string(),
                },
                ColumnSnapshot {
                    name: "created_at".to_string(),
                    sql_type: "TIMESTAMP".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_sql_type_mapping() {
        assert_eq!(map_sql_type("BIGINT"), "i64");
        assert_eq!(map_sql_type("integer"), "i32");
        assert_eq!(map_sql_type("TIMESTAMP WITH TIME ZONE"), "DateTime<Utc>");
        assert_eq!(map_sql_type("DATE"), "NaiveDate");
        assert_eq!(map_sql_type("BOOLEAN"), "bool");
        assert_eq!(map_sql_type("DOUBLE"), "f64");
        assert_eq!(map_sql_type("VARCHAR"), "String");
        assert_eq!(map_sql_type("SOMETHING_ODD"), "String");
    }

    #[test]
    fn test_id_is_forced_to_i64() {
        let fields = snapshot_fields(&order_table());
        assert_eq!(fields[0].field, "id");
        assert_eq!(fields[0].rust_type, "i64");
        assert_eq!(fields[1].rust_type, "String");
        assert_eq!(fields[2].rust_type, "DateTime<Utc>");
    }

    #[test]
    fn test_create_then_reconcile_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SchemaSnapshot {
            product_name: None,
            tables: vec![order_table()],
        };
        let options = EntityOptions::default();

        let report = sync_entities(&snapshot, &options, dir.path()).unwrap();
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.artifacts_created.len(), 1);

        let source = fs::read_to_string(&report.created[0]).unwrap();
        assert!(source.contains("pub struct CustomerOrder {"));
        assert!(source.contains("/// Primary key.\n    pub id: i64,"));
        assert!(source.contains("// mapsmith:added-fields:begin"));
        assert!(source.contains("use chrono::"));

        // Second run: nothing to create, nothing drifted.
        let again = sync_entities(&snapshot, &options, dir.path()).unwrap();
        assert!(again.created.is_empty());
        assert!(again.updated.is_empty());
        assert_eq!(fs::read_to_string(&report.created[0]).unwrap(), source);
    }

    #[test]
    fn test_new_column_lands_in_added_block() {
        let dir = tempfile::tempdir().unwrap();
        let mut snapshot = SchemaSnapshot {
            product_name: None,
            tables: vec![order_table()],
        };
        let options = EntityOptions::default();
        sync_entities(&snapshot, &options, dir.path()).unwrap();

        snapshot.tables[0].columns.push(ColumnSnapshot {
            name: "note".to_string(),
            sql_type: "VARCHAR".to_string(),
        });
        let report = sync_entities(&snapshot, &options, dir.path()).unwrap();
        assert_eq!(report.updated.len(), 1);

        let source = fs::read_to_string(&report.updated[0]).unwrap();
        assert!(source.contains("pub note: String, // added from column 'note'"));
    }

    #[test]
    fn test_companion_artifact_skeleton() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SchemaSnapshot {
            product_name: None,
            tables: vec![order_table()],
        };
        let report = sync_entities(&snapshot, &EntityOptions::default(), dir.path()).unwrap();

        let xml = fs::read_to_string(&report.artifacts_created[0]).unwrap();
        assert!(xml.contains("<mapper namespace=\"mapper.CustomerOrderMapper\">"));
        assert!(xml.contains(region::REGION_BEGIN));
        assert!(region::region_ids(&xml).is_empty());
    }

    #[test]
    fn test_module_mapping_conflict_keeps_first() {
        let mut mapping = BTreeMap::new();
        mapping.insert("orders".to_string(), vec!["customer_order".to_string()]);
        mapping.insert("sales".to_string(), vec!["CUSTOMER_ORDER ".to_string()]);

        let table_to_module = build_table_module_map(&mapping);
        assert_eq!(table_to_module["CUSTOMER_ORDER"], "orders");
    }

    #[test]
    fn test_module_dirs_route_sources() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SchemaSnapshot {
            product_name: None,
            tables: vec![order_table()],
        };
        let mut options = EntityOptions {
            module_dirs: true,
            ..EntityOptions::default()
        };
        options
            .module_mapping
            .insert("orders".to_string(), vec!["customer_order".to_string()]);

        let report = sync_entities(&snapshot, &options, dir.path()).unwrap();
        assert!(report.created[0].ends_with("src/entity/orders/customer_order.rs"));
    }
}
