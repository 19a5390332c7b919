//! Schema metadata for declared entity types.
//!
//! A host type system describes its entities through [`SchemaDescribable`];
//! [`TableInfo`] is the resolved, cached view the synthesizer and the drift
//! detector consume. Resolution is lazy and memoized per declared type in a
//! [`SchemaCache`], which can be cleared when the naming strategy changes.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::naming::NamingStrategy;

/// Declarative per-field capability tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldTag {
    /// Marks the primary-key field. Takes priority over a field named `id`.
    PrimaryKey,
    /// Marks the soft-delete column. With no explicit values the column is
    /// treated as a nullable timestamp: `NULL` = live, now-expression = deleted.
    SoftDelete {
        /// Value written on logical deletion, if flag-based.
        deleted_value: Option<String>,
        /// Value meaning "not deleted", if flag-based.
        not_deleted_value: Option<String>,
    },
    /// Declares a child table whose rows follow this entity on delete.
    CascadeDelete {
        /// Child table name.
        table: String,
        /// Foreign-key column on the child table.
        foreign_key: String,
    },
    /// Explicit column-name override for this field.
    ColumnOverride(String),
}

/// One declared field: name, resolved type, and capability tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Declared field name.
    pub name: String,
    /// Resolved type as written in source (e.g. `i64`, `Option<String>`).
    pub rust_type: String,
    /// Capability tags attached to the field.
    pub tags: Vec<FieldTag>,
}

impl FieldDescriptor {
    /// Creates a field with no tags.
    #[must_use]
    pub fn new(name: impl Into<String>, rust_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rust_type: rust_type.into(),
            tags: Vec::new(),
        }
    }

    /// Attaches a capability tag.
    #[must_use]
    pub fn tag(mut self, tag: FieldTag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Returns whether this field carries the primary-key tag.
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.tags.iter().any(|t| matches!(t, FieldTag::PrimaryKey))
    }

    /// Returns the explicit column override, if any.
    #[must_use]
    pub fn column_override(&self) -> Option<&str> {
        self.tags.iter().find_map(|t| match t {
            FieldTag::ColumnOverride(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Returns the soft-delete tag values, if present.
    #[must_use]
    pub fn soft_delete(&self) -> Option<(Option<&str>, Option<&str>)> {
        self.tags.iter().find_map(|t| match t {
            FieldTag::SoftDelete {
                deleted_value,
                not_deleted_value,
            } => Some((deleted_value.as_deref(), not_deleted_value.as_deref())),
            _ => None,
        })
    }
}

/// Capability interface a host type system implements to expose entity
/// metadata without depending on runtime reflection.
pub trait SchemaDescribable {
    /// Declared type name (e.g. `Order`).
    fn type_name(&self) -> &str;

    /// Explicit table-name override, if declared.
    fn table_override(&self) -> Option<&str> {
        None
    }

    /// Declared fields in declaration order.
    fn fields(&self) -> Vec<FieldDescriptor>;
}

/// Plain-data implementation of [`SchemaDescribable`], convenient for hosts
/// that load entity declarations from configuration or snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Declared type name.
    pub type_name: String,
    /// Explicit table name, if any.
    pub table_override: Option<String>,
    /// Declared fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    /// Creates an empty descriptor for the given type name.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            table_override: None,
            fields: Vec::new(),
        }
    }

    /// Sets an explicit table name.
    #[must_use]
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table_override = Some(name.into());
        self
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}

impl SchemaDescribable for EntityDescriptor {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn table_override(&self) -> Option<&str> {
        self.table_override.as_deref()
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        self.fields.clone()
    }
}

/// Resolved soft-delete marker for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftDeleteMarker {
    /// Declared field name.
    pub field: String,
    /// Resolved column name.
    pub column: String,
    /// Flag value written on deletion, if flag-based.
    pub deleted_value: Option<String>,
    /// Flag value meaning "live", if flag-based.
    pub not_deleted_value: Option<String>,
}

/// Resolved cascade-delete rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeRule {
    /// Child table name.
    pub table: String,
    /// Foreign-key column on the child table.
    pub foreign_key: String,
}

/// Resolved table metadata for one declared type.
///
/// Invariants enforced at resolution time:
/// - every field maps to a non-blank column;
/// - field names are unique;
/// - `id_field`, when present, is a key of the field/column map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Resolved table name.
    pub table_name: String,
    /// Field -> column pairs in declaration order.
    field_column_map: Vec<(String, String)>,
    /// Field -> resolved type pairs in declaration order.
    field_type_map: Vec<(String, String)>,
    /// Primary-key field, if resolvable.
    pub id_field: Option<String>,
    /// Primary-key column, if resolvable.
    pub id_column: Option<String>,
    /// Soft-delete marker, if declared.
    pub soft_delete: Option<SoftDeleteMarker>,
    /// Cascade-delete rules, in declaration order.
    pub cascades: Vec<CascadeRule>,
}

impl TableInfo {
    /// Resolves table metadata for one declared type.
    ///
    /// Primary-key priority: explicit [`FieldTag::PrimaryKey`] tag, else a
    /// field literally named `id` (case-insensitive), else absent.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSchema`] when a column resolves blank or a
    /// field name is declared twice.
    pub fn resolve(desc: &dyn SchemaDescribable, naming: &dyn NamingStrategy) -> Result<Self> {
        let type_name = desc.type_name().to_string();
        let invalid = |message: String| CoreError::InvalidSchema {
            type_name: type_name.clone(),
            message,
        };

        let table_name = match desc.table_override() {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => naming.table_name(desc.type_name()),
        };

        let mut field_column_map: Vec<(String, String)> = Vec::new();
        let mut field_type_map: Vec<(String, String)> = Vec::new();
        let mut id_field = None;
        let mut id_column = None;
        let mut soft_delete = None;
        let mut cascades = Vec::new();

        for field in desc.fields() {
            let column = field
                .column_override()
                .map_or_else(|| naming.column_name(&field.name), str::to_string);
            if column.trim().is_empty() {
                return Err(invalid(format!(
                    "field '{}' resolves to a blank column",
                    field.name
                )));
            }
            if field_column_map.iter().any(|(f, _)| *f == field.name) {
                return Err(invalid(format!("duplicate field '{}'", field.name)));
            }

            if field.is_primary_key() && id_field.is_none() {
                id_field = Some(field.name.clone());
                id_column = Some(column.clone());
            }

            if let Some((deleted, live)) = field.soft_delete() {
                if soft_delete.is_none() {
                    soft_delete = Some(SoftDeleteMarker {
                        field: field.name.clone(),
                        column: column.clone(),
                        deleted_value: deleted.map(str::to_string),
                        not_deleted_value: live.map(str::to_string),
                    });
                }
            }

            for tag in &field.tags {
                if let FieldTag::CascadeDelete { table, foreign_key } = tag {
                    cascades.push(CascadeRule {
                        table: table.clone(),
                        foreign_key: foreign_key.clone(),
                    });
                }
            }

            field_column_map.push((field.name.clone(), column));
            field_type_map.push((field.name, field.rust_type));
        }

        // Fallback: a field literally named "id".
        if id_field.is_none() {
            if let Some((f, c)) = field_column_map
                .iter()
                .find(|(f, _)| f.eq_ignore_ascii_case("id"))
            {
                id_field = Some(f.clone());
                id_column = Some(c.clone());
            }
        }

        Ok(Self {
            table_name,
            field_column_map,
            field_type_map,
            id_field,
            id_column,
            soft_delete,
            cascades,
        })
    }

    /// Field -> column pairs in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.field_column_map
            .iter()
            .map(|(f, c)| (f.as_str(), c.as_str()))
    }

    /// Field -> resolved-type pairs in declaration order.
    pub fn field_types(&self) -> impl Iterator<Item = (&str, &str)> {
        self.field_type_map
            .iter()
            .map(|(f, t)| (f.as_str(), t.as_str()))
    }

    /// Column names in declaration order, duplicates removed.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for (_, c) in &self.field_column_map {
            if !seen.contains(&c.as_str()) {
                seen.push(c.as_str());
            }
        }
        seen
    }

    /// Returns whether a column is declared (case-insensitive).
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.field_column_map
            .iter()
            .any(|(_, c)| c.eq_ignore_ascii_case(column))
    }

    /// Primary-key column, defensively defaulting to `id`.
    #[must_use]
    pub fn pk_column(&self) -> &str {
        self.id_column.as_deref().filter(|c| !c.is_empty()).unwrap_or("id")
    }

    /// Primary-key field, defensively defaulting to `id`.
    #[must_use]
    pub fn pk_field(&self) -> &str {
        self.id_field.as_deref().filter(|f| !f.is_empty()).unwrap_or("id")
    }
}

/// Process-lifetime memoization of resolved [`TableInfo`], keyed by declared
/// type name.
///
/// Entries are write-once-then-immutable, so concurrent readers are safe.
/// [`SchemaCache::clear`] exists for naming-strategy replacement and host
/// teardown; it is the only mutation besides first insert.
#[derive(Debug, Default)]
pub struct SchemaCache {
    inner: RwLock<HashMap<String, Arc<TableInfo>>>,
}

impl SchemaCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves (or returns the memoized) table metadata for a type.
    ///
    /// # Errors
    ///
    /// Propagates [`CoreError::InvalidSchema`] from first resolution.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn resolve(
        &self,
        desc: &dyn SchemaDescribable,
        naming: &dyn NamingStrategy,
    ) -> Result<Arc<TableInfo>> {
        if let Some(info) = self.inner.read().unwrap().get(desc.type_name()) {
            return Ok(Arc::clone(info));
        }

        let info = Arc::new(TableInfo::resolve(desc, naming)?);
        tracing::debug!(
            type_name = desc.type_name(),
            table = %info.table_name,
            "resolved table metadata"
        );
        let mut guard = self.inner.write().unwrap();
        let entry = guard
            .entry(desc.type_name().to_string())
            .or_insert_with(|| Arc::clone(&info));
        Ok(Arc::clone(entry))
    }

    /// Drops all memoized entries.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear(&self) {
        self.inner.write().unwrap().clear();
    }

    /// Number of memoized types.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    /// Returns whether the cache is empty.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::SnakeCaseStrategy;

    fn order_entity() -> EntityDescriptor {
        EntityDescriptor::new("Order")
            .field(FieldDescriptor::new("id", "i64").tag(FieldTag::PrimaryKey))
            .field(FieldDescriptor::new("customerName", "String"))
    }

    #[test]
    fn test_resolve_basic() {
        let info = TableInfo::resolve(&order_entity(), &SnakeCaseStrategy).unwrap();
        assert_eq!(info.table_name, "order");
        assert_eq!(info.pk_field(), "id");
        assert_eq!(info.pk_column(), "id");
        assert_eq!(info.columns(), vec!["id", "customer_name"]);
    }

    #[test]
    fn test_table_override_wins() {
        let desc = order_entity().table("orders");
        let info = TableInfo::resolve(&desc, &SnakeCaseStrategy).unwrap();
        assert_eq!(info.table_name, "orders");
    }

    #[test]
    fn test_column_override_wins() {
        let desc = EntityDescriptor::new("User").field(
            FieldDescriptor::new("email", "String").tag(FieldTag::ColumnOverride(
                "email_address".to_string(),
            )),
        );
        let info = TableInfo::resolve(&desc, &SnakeCaseStrategy).unwrap();
        assert_eq!(info.columns(), vec!["email_address"]);
    }

    #[test]
    fn test_id_fallback_by_name() {
        let desc = EntityDescriptor::new("Tag")
            .field(FieldDescriptor::new("id", "i64"))
            .field(FieldDescriptor::new("label", "String"));
        let info = TableInfo::resolve(&desc, &SnakeCaseStrategy).unwrap();
        assert_eq!(info.id_field.as_deref(), Some("id"));
    }

    #[test]
    fn test_pk_tag_beats_id_name() {
        let desc = EntityDescriptor::new("Legacy")
            .field(FieldDescriptor::new("id", "i64"))
            .field(FieldDescriptor::new("code", "String").tag(FieldTag::PrimaryKey));
        let info = TableInfo::resolve(&desc, &SnakeCaseStrategy).unwrap();
        assert_eq!(info.id_field.as_deref(), Some("code"));
    }

    #[test]
    fn test_absent_pk_defaults_defensively() {
        let desc = EntityDescriptor::new("Audit").field(FieldDescriptor::new("note", "String"));
        let info = TableInfo::resolve(&desc, &SnakeCaseStrategy).unwrap();
        assert!(info.id_field.is_none());
        assert_eq!(info.pk_column(), "id");
    }

    #[test]
    fn test_soft_delete_marker() {
        let desc = order_entity().field(FieldDescriptor::new("deletedAt", "Option<String>").tag(
            FieldTag::SoftDelete {
                deleted_value: None,
                not_deleted_value: None,
            },
        ));
        let info = TableInfo::resolve(&desc, &SnakeCaseStrategy).unwrap();
        let sd = info.soft_delete.unwrap();
        assert_eq!(sd.column, "deleted_at");
    }

    #[test]
    fn test_duplicate_field_is_error() {
        let desc = EntityDescriptor::new("Dup")
            .field(FieldDescriptor::new("a", "i64"))
            .field(FieldDescriptor::new("a", "String"));
        assert!(matches!(
            TableInfo::resolve(&desc, &SnakeCaseStrategy),
            Err(CoreError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn test_cache_memoizes_and_clears() {
        let cache = SchemaCache::new();
        let a = cache.resolve(&order_entity(), &SnakeCaseStrategy).unwrap();
        let b = cache.resolve(&order_entity(), &SnakeCaseStrategy).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_columns_deduplicated() {
        let desc = EntityDescriptor::new("Odd")
            .field(FieldDescriptor::new("a", "i64"))
            .field(
                FieldDescriptor::new("b", "i64")
                    .tag(FieldTag::ColumnOverride("a".to_string())),
            );
        let info = TableInfo::resolve(&desc, &SnakeCaseStrategy).unwrap();
        assert_eq!(info.columns(), vec!["a"]);
    }
}
