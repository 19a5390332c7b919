//! Statement synthesis: turns resolved schema metadata into textual
//! statement blocks for the seven canonical operations.
//!
//! Synthesis is a pure function of the schema, the dialect, the options and
//! the set of statement ids already present in the target artifact. Ids that
//! are already present are never re-emitted, so user-authored statements
//! always win.

use std::collections::BTreeSet;

use crate::dialect::{
    resolve_key_retrieval, strip_quotes, Dialect, IdentifierQuoter, KeyRetrieval,
};
use crate::options::{FindAllPolicy, OrderMode, SynthesizerOptions};
use crate::schema::TableInfo;

/// The four statement element kinds an artifact can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// A read statement.
    Select,
    /// An insert statement.
    Insert,
    /// An update statement.
    Update,
    /// A delete statement.
    Delete,
}

impl StatementKind {
    /// Element tag name.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Infers a kind from a statement id by prefix.
    ///
    /// `insert`/`save`/`create` map to insert, `update`/`modify` to update,
    /// `delete`/`remove` to delete; everything else reads.
    #[must_use]
    pub fn infer(id: &str) -> Self {
        let lower = id.to_ascii_lowercase();
        if lower.starts_with("insert") || lower.starts_with("save") || lower.starts_with("create") {
            Self::Insert
        } else if lower.starts_with("update") || lower.starts_with("modify") {
            Self::Update
        } else if lower.starts_with("delete") || lower.starts_with("remove") {
            Self::Delete
        } else {
            Self::Select
        }
    }
}

/// One synthesized statement block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementBlock {
    /// Statement id, unique within its namespace.
    pub id: String,
    /// Element kind.
    pub kind: StatementKind,
    /// Rendered block, tab-indented for region insertion, no trailing newline.
    pub xml: String,
}

/// The seven canonical operation ids, in synthesis order.
pub const CANONICAL_IDS: [&str; 7] = [
    "insert",
    "findById",
    "findAll",
    "findPage",
    "countAll",
    "update",
    "deleteById",
];

/// Synthesizes statement blocks for every canonical operation not already
/// present in `present`.
///
/// `result_type` is the declared-type path emitted into `resultType`
/// attributes. `findPage`/`countAll` require pagination to be enabled, and
/// `findAll` honors its safety policy (a disabled policy emits nothing).
#[must_use]
pub fn synthesize(
    info: &TableInfo,
    result_type: &str,
    dialect: Dialect,
    options: &SynthesizerOptions,
    present: &BTreeSet<String>,
) -> Vec<StatementBlock> {
    let ctx = Context::new(info, result_type, dialect, options);
    let mut blocks = Vec::new();

    let wanted = |id: &str| !present.contains(id);

    if wanted("insert") {
        blocks.push(ctx.build_insert());
    }
    if wanted("findById") {
        blocks.push(ctx.build_find_by_id());
    }
    if wanted("findAll") {
        if let Some(block) = ctx.build_find_all() {
            blocks.push(block);
        }
    }
    if options.pagination.enabled {
        if wanted("findPage") {
            blocks.push(ctx.build_find_page());
        }
        if wanted("countAll") {
            blocks.push(ctx.build_count_all());
        }
    }
    if wanted("update") {
        blocks.push(ctx.build_update());
    }
    if wanted("deleteById") {
        blocks.push(ctx.build_delete_by_id());
    }

    blocks
}

/// Shared per-call rendering state.
struct Context<'a> {
    info: &'a TableInfo,
    result_type: &'a str,
    dialect: Dialect,
    options: &'a SynthesizerOptions,
    quoter: IdentifierQuoter,
    table: String,
    pk_column: String,
    pk_field: String,
    select_columns: String,
    now_expr: String,
}

impl<'a> Context<'a> {
    fn new(
        info: &'a TableInfo,
        result_type: &'a str,
        dialect: Dialect,
        options: &'a SynthesizerOptions,
    ) -> Self {
        let quoter = IdentifierQuoter::new(dialect, options.quote_identifiers);
        let table = quoter.quote(&info.table_name);
        let pk_column = quoter.quote(info.pk_column());
        let pk_field = info.pk_field().to_string();

        let columns = info.columns();
        let select_columns = if columns.is_empty() {
            "*".to_string()
        } else {
            columns
                .iter()
                .map(|c| quoter.quote(c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let now_expr = options.now_expr(dialect);

        Self {
            info,
            result_type,
            dialect,
            options,
            quoter,
            table,
            pk_column,
            pk_field,
            select_columns,
            now_expr,
        }
    }

    /// Non-primary-key (field, quoted column) pairs.
    fn non_pk_fields(&self) -> Vec<(String, String)> {
        self.info
            .fields()
            .filter(|(f, _)| *f != self.pk_field)
            .map(|(f, c)| (f.to_string(), self.quoter.quote(c)))
            .collect()
    }

    /// Soft-delete predicate (`AND`-less), if a marker is declared.
    fn soft_delete_predicate(&self) -> Option<String> {
        self.info.soft_delete.as_ref().map(|sd| {
            let col = self.quoter.quote(&sd.column);
            sd.not_deleted_value.as_ref().map_or_else(
                || format!("{col} IS NULL"),
                |live| format!("{col} = {live}"),
            )
        })
    }

    fn build_insert(&self) -> StatementBlock {
        let non_pk = self.non_pk_fields();
        let any_not_null = any_not_null_test(&non_pk);

        let strategy =
            resolve_key_retrieval(self.options.generated_key.strategy, self.dialect);
        let open = if strategy == KeyRetrieval::DriverGenerated {
            let key_column = strip_quotes(self.options.generated_key.effective_key_column());
            format!(
                "<insert id=\"insert\" useGeneratedKeys=\"true\" keyProperty=\"{}\" keyColumn=\"{key_column}\">",
                self.pk_field
            )
        } else {
            "<insert id=\"insert\">".to_string()
        };

        let mut x = Xml::new();
        x.line(0, open);
        x.line(1, "<choose>");
        x.line(2, format!("<when test=\"{any_not_null}\">"));
        x.line(3, format!("INSERT INTO {}", self.table));
        x.line(3, "<trim prefix=\"(\" suffix=\")\" suffixOverrides=\",\">");
        for (field, column) in &non_pk {
            x.line(4, format!("<if test=\"{field} != null\">{column},</if>"));
        }
        x.line(3, "</trim>");
        x.line(3, "<trim prefix=\"VALUES (\" suffix=\")\" suffixOverrides=\",\">");
        for (field, _) in &non_pk {
            x.line(4, format!("<if test=\"{field} != null\">#{{{field}}},</if>"));
        }
        x.line(3, "</trim>");
        x.line(2, "</when>");
        x.line(2, "<otherwise>");
        x.line(3, format!("INSERT INTO {} DEFAULT VALUES", self.table));
        x.line(2, "</otherwise>");
        x.line(1, "</choose>");
        x.line(0, "</insert>");

        x.block("insert", StatementKind::Insert)
    }

    fn build_find_by_id(&self) -> StatementBlock {
        let mut x = Xml::new();
        x.line(
            0,
            format!("<select id=\"findById\" resultType=\"{}\">", self.result_type),
        );
        x.line(1, format!("SELECT {} FROM {}", self.select_columns, self.table));
        x.line(1, format!("WHERE {} = #{{{}}}", self.pk_column, self.pk_field));
        if let Some(pred) = self.soft_delete_predicate() {
            x.line(1, format!("AND {pred}"));
        }
        x.line(0, "</select>");

        x.block("findById", StatementKind::Select)
    }

    fn build_find_all(&self) -> Option<StatementBlock> {
        let fa = &self.options.pagination.find_all;
        if fa.policy == FindAllPolicy::Disabled {
            return None;
        }
        let cap = fa.effective_cap();
        let capped = fa.policy == FindAllPolicy::Capped;
        let predicate = self.soft_delete_predicate();

        let mut x = Xml::new();
        x.line(
            0,
            format!("<select id=\"findAll\" resultType=\"{}\">", self.result_type),
        );

        if capped && self.dialect == Dialect::Oracle {
            // Oracle has no native LIMIT; wrap in a ROWNUM subquery.
            x.line(1, format!("SELECT {} FROM (", self.select_columns));
            x.line(2, format!("SELECT {} FROM {}", self.select_columns, self.table));
            if let Some(pred) = &predicate {
                x.line(2, format!("WHERE {pred}"));
            }
            x.line(1, ")");
            x.line(1, format!("WHERE ROWNUM <= {cap}"));
            x.line(0, "</select>");
            return Some(x.block("findAll", StatementKind::Select));
        }

        if capped && self.dialect == Dialect::SqlServer {
            x.line(
                1,
                format!("SELECT TOP ({cap}) {} FROM {}", self.select_columns, self.table),
            );
        } else {
            x.line(1, format!("SELECT {} FROM {}", self.select_columns, self.table));
        }
        if let Some(pred) = &predicate {
            x.line(1, format!("WHERE {pred}"));
        }
        if capped {
            match self.dialect {
                Dialect::MySql | Dialect::MariaDb => x.line(1, format!("LIMIT {cap}")),
                Dialect::SqlServer | Dialect::Oracle => {}
                _ => x.line(1, format!("FETCH FIRST {cap} ROWS ONLY")),
            }
        }
        x.line(0, "</select>");

        Some(x.block("findAll", StatementKind::Select))
    }

    fn build_find_page(&self) -> StatementBlock {
        let max = self.options.pagination.effective_max_page_size();
        let order_by = self.default_order_by();
        let predicate = self.soft_delete_predicate();

        let mut x = Xml::new();
        x.line(
            0,
            format!("<select id=\"findPage\" resultType=\"{}\">", self.result_type),
        );
        // The clamp lives inside the statement; callers cannot exceed it.
        x.line(
            1,
            format!("<bind name=\"__limit\" value=\"limit &gt; {max} ? {max} : limit\"/>"),
        );

        match self.dialect {
            Dialect::Oracle => {
                x.line(1, format!("SELECT {} FROM (", self.select_columns));
                x.line(2, "SELECT inner_q.*, ROWNUM rn FROM (");
                x.line(3, format!("SELECT {} FROM {}", self.select_columns, self.table));
                if let Some(pred) = &predicate {
                    x.line(3, format!("WHERE {pred}"));
                }
                if let Some(order) = &order_by {
                    x.line(3, order.clone());
                }
                x.line(2, ") inner_q");
                x.line(2, "WHERE ROWNUM &lt;= (#{offset} + #{__limit})");
                x.line(1, ")");
                x.line(1, "WHERE rn &gt; #{offset}");
            }
            Dialect::MySql | Dialect::MariaDb => {
                x.line(1, format!("SELECT {} FROM {}", self.select_columns, self.table));
                if let Some(pred) = &predicate {
                    x.line(1, format!("WHERE {pred}"));
                }
                if let Some(order) = &order_by {
                    x.line(1, order.clone());
                }
                x.line(1, "LIMIT #{__limit} OFFSET #{offset}");
            }
            // SQL Server and the ANSI family share OFFSET/FETCH.
            _ => {
                x.line(1, format!("SELECT {} FROM {}", self.select_columns, self.table));
                if let Some(pred) = &predicate {
                    x.line(1, format!("WHERE {pred}"));
                }
                if let Some(order) = &order_by {
                    x.line(1, order.clone());
                }
                x.line(1, "OFFSET #{offset} ROWS FETCH NEXT #{__limit} ROWS ONLY");
            }
        }
        x.line(0, "</select>");

        x.block("findPage", StatementKind::Select)
    }

    /// Default ORDER BY clause, or `None` when no candidate column exists.
    ///
    /// Priority: configured mode, then `created_at`, `updated_at`, primary
    /// key. A missing candidate omits the clause entirely rather than
    /// ordering by something arbitrary.
    fn default_order_by(&self) -> Option<String> {
        let order = &self.options.pagination.default_order;
        if order.mode == OrderMode::None {
            return None;
        }

        let pk = strip_quotes(&self.pk_column);
        let pk_candidate = || (!pk.is_empty()).then(|| pk.clone());

        let resolved = match order.mode {
            OrderMode::CreatedAt => self
                .info
                .has_column("created_at")
                .then(|| "created_at".to_string()),
            OrderMode::UpdatedAt => self
                .info
                .has_column("updated_at")
                .then(|| "updated_at".to_string()),
            OrderMode::PrimaryKey => pk_candidate(),
            OrderMode::Auto => {
                if self.info.has_column("created_at") {
                    Some("created_at".to_string())
                } else if self.info.has_column("updated_at") {
                    Some("updated_at".to_string())
                } else {
                    pk_candidate()
                }
            }
            OrderMode::None => None,
        }?;

        Some(format!(
            "ORDER BY {} {}",
            self.quoter.quote(&resolved),
            order.direction.keyword()
        ))
    }

    fn build_count_all(&self) -> StatementBlock {
        let mut x = Xml::new();
        x.line(0, "<select id=\"countAll\" resultType=\"i64\">");
        x.line(1, format!("SELECT COUNT(*) FROM {}", self.table));
        if let Some(pred) = self.soft_delete_predicate() {
            x.line(1, format!("WHERE {pred}"));
        }
        x.line(0, "</select>");

        x.block("countAll", StatementKind::Select)
    }

    fn build_update(&self) -> StatementBlock {
        let has_updated_at = self.info.has_column("updated_at");

        // updated_at is force-set to the now-expression, never caller-supplied.
        let updatable: Vec<(String, String)> = self
            .info
            .fields()
            .filter(|(f, c)| *f != self.pk_field && !c.eq_ignore_ascii_case("updated_at"))
            .map(|(f, c)| (f.to_string(), self.quoter.quote(c)))
            .collect();

        let non_empty = any_not_null_test(&updatable);
        let allow_empty = self.options.update.allow_empty_set;

        let mut x = Xml::new();
        x.line(0, "<update id=\"update\">");

        let body_depth = if allow_empty {
            1
        } else {
            x.line(1, "<choose>");
            x.line(2, format!("<when test=\"{non_empty}\">"));
            3
        };

        x.line(body_depth, format!("UPDATE {}", self.table));
        x.line(body_depth, "<set>");
        for (field, column) in &updatable {
            x.line(
                body_depth + 1,
                format!("<if test=\"{field} != null\">{column} = #{{{field}}},</if>"),
            );
        }
        if has_updated_at {
            x.line(
                body_depth + 1,
                format!("{} = {},", self.quoter.quote("updated_at"), self.now_expr),
            );
        }
        x.line(body_depth, "</set>");
        x.line(
            body_depth,
            format!("WHERE {} = #{{{}}}", self.pk_column, self.pk_field),
        );
        if let Some(pred) = self.soft_delete_predicate() {
            x.line(body_depth, format!("AND {pred}"));
        }

        if !allow_empty {
            x.line(2, "</when>");
            x.line(2, "<otherwise>");
            // Zero-row no-op, never an unconditional full-table update.
            x.line(
                3,
                format!("UPDATE {} SET {} = {}", self.table, self.pk_column, self.pk_column),
            );
            x.line(3, "WHERE 1 = 0");
            x.line(2, "</otherwise>");
            x.line(1, "</choose>");
        }
        x.line(0, "</update>");

        x.block("update", StatementKind::Update)
    }

    fn build_delete_by_id(&self) -> StatementBlock {
        let mut x = Xml::new();

        if let Some(sd) = &self.info.soft_delete {
            let col = self.quoter.quote(&sd.column);
            let value = sd
                .deleted_value
                .clone()
                .unwrap_or_else(|| self.now_expr.clone());
            x.line(0, "<update id=\"deleteById\">");
            x.line(1, format!("UPDATE {}", self.table));
            x.line(1, format!("SET {col} = {value}"));
            x.line(1, format!("WHERE {} = #{{{}}}", self.pk_column, self.pk_field));
            x.line(0, "</update>");
            return x.block("deleteById", StatementKind::Update);
        }

        x.line(0, "<delete id=\"deleteById\">");
        x.line(1, format!("DELETE FROM {}", self.table));
        x.line(1, format!("WHERE {} = #{{{}}}", self.pk_column, self.pk_field));
        x.line(0, "</delete>");
        x.block("deleteById", StatementKind::Delete)
    }
}

fn any_not_null_test(fields: &[(String, String)]) -> String {
    if fields.is_empty() {
        return "false".to_string();
    }
    fields
        .iter()
        .map(|(f, _)| format!("{f} != null"))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Line accumulator producing tab-based blocks for region insertion.
struct Xml {
    lines: Vec<String>,
}

impl Xml {
    const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    fn line(&mut self, depth: usize, content: impl Into<String>) {
        self.lines.push(format!("\t{}{}", "  ".repeat(depth), content.into()));
    }

    fn block(self, id: &str, kind: StatementKind) -> StatementBlock {
        StatementBlock {
            id: id.to_string(),
            kind,
            xml: self.lines.join("\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::SnakeCaseStrategy;
    use crate::options::{FindAllOptions, PaginationOptions};
    use crate::schema::{EntityDescriptor, FieldDescriptor, FieldTag};

    fn order_info() -> TableInfo {
        let desc = EntityDescriptor::new("Order")
            .field(FieldDescriptor::new("id", "i64").tag(FieldTag::PrimaryKey))
            .field(FieldDescriptor::new("customerName", "String"));
        TableInfo::resolve(&desc, &SnakeCaseStrategy).unwrap()
    }

    fn synth(info: &TableInfo, dialect: Dialect, options: &SynthesizerOptions) -> Vec<StatementBlock> {
        synthesize(info, "Order", dialect, options, &BTreeSet::new())
    }

    fn ids(blocks: &[StatementBlock]) -> Vec<&str> {
        blocks.iter().map(|b| b.id.as_str()).collect()
    }

    #[test]
    fn test_all_seven_for_fresh_artifact() {
        let blocks = synth(&order_info(), Dialect::Postgres, &SynthesizerOptions::default());
        assert_eq!(
            ids(&blocks),
            vec!["insert", "findById", "findAll", "findPage", "countAll", "update", "deleteById"]
        );

        let insert = &blocks[0];
        assert!(insert.xml.contains("<if test=\"customerName != null\">customer_name,</if>"));
        assert!(insert.xml.contains("INSERT INTO order DEFAULT VALUES"));
        // Primary key is excluded from both column and value lists.
        assert!(!insert.xml.contains("<if test=\"id != null\">"));

        let update = blocks.iter().find(|b| b.id == "update").unwrap();
        assert!(update.xml.contains("customer_name = #{customerName}"));
        assert!(!update.xml.contains("id = #{id},"));
        assert!(update.xml.contains("WHERE 1 = 0"));
    }

    #[test]
    fn test_present_ids_are_skipped() {
        let present: BTreeSet<String> = ["insert".to_string()].into();
        let blocks = synthesize(
            &order_info(),
            "Order",
            Dialect::Postgres,
            &SynthesizerOptions::default(),
            &present,
        );
        assert!(!ids(&blocks).contains(&"insert"));
        assert_eq!(blocks.len(), 6);
    }

    #[test]
    fn test_explicit_column_list_never_wildcard() {
        let blocks = synth(&order_info(), Dialect::Postgres, &SynthesizerOptions::default());
        let find_by_id = blocks.iter().find(|b| b.id == "findById").unwrap();
        assert!(find_by_id.xml.contains("SELECT id, customer_name FROM order"));
        assert!(!find_by_id.xml.contains("SELECT *"));
    }

    #[test]
    fn test_driver_generated_key_attributes() {
        let blocks = synth(&order_info(), Dialect::Postgres, &SynthesizerOptions::default());
        assert!(blocks[0].xml.contains(
            "<insert id=\"insert\" useGeneratedKeys=\"true\" keyProperty=\"id\" keyColumn=\"id\">"
        ));
    }

    #[test]
    fn test_oracle_auto_key_retrieval_is_none() {
        let blocks = synth(&order_info(), Dialect::Oracle, &SynthesizerOptions::default());
        assert!(blocks[0].xml.starts_with("\t<insert id=\"insert\">"));
        assert!(!blocks[0].xml.contains("useGeneratedKeys"));
    }

    #[test]
    fn test_soft_delete_predicates_and_delete_degradation() {
        let desc = EntityDescriptor::new("Order")
            .field(FieldDescriptor::new("id", "i64").tag(FieldTag::PrimaryKey))
            .field(FieldDescriptor::new("customerName", "String"))
            .field(
                FieldDescriptor::new("deletedAt", "Option<String>").tag(FieldTag::SoftDelete {
                    deleted_value: None,
                    not_deleted_value: None,
                }),
            );
        let info = TableInfo::resolve(&desc, &SnakeCaseStrategy).unwrap();
        let blocks = synth(&info, Dialect::Postgres, &SynthesizerOptions::default());

        let find_by_id = blocks.iter().find(|b| b.id == "findById").unwrap();
        assert!(find_by_id.xml.contains("AND deleted_at IS NULL"));

        let count_all = blocks.iter().find(|b| b.id == "countAll").unwrap();
        assert!(count_all.xml.contains("WHERE deleted_at IS NULL"));

        let delete = blocks.iter().find(|b| b.id == "deleteById").unwrap();
        assert_eq!(delete.kind, StatementKind::Update);
        assert!(delete.xml.contains("SET deleted_at = CURRENT_TIMESTAMP"));
        assert!(!delete.xml.contains("DELETE FROM"));
    }

    #[test]
    fn test_hard_delete_without_marker() {
        let blocks = synth(&order_info(), Dialect::Postgres, &SynthesizerOptions::default());
        let delete = blocks.iter().find(|b| b.id == "deleteById").unwrap();
        assert_eq!(delete.kind, StatementKind::Delete);
        assert!(delete.xml.contains("DELETE FROM order"));
    }

    #[test]
    fn test_capped_find_all_without_native_limit_uses_rownum() {
        let options = SynthesizerOptions {
            pagination: PaginationOptions {
                find_all: FindAllOptions {
                    policy: FindAllPolicy::Capped,
                    cap: 100,
                },
                ..PaginationOptions::default()
            },
            ..SynthesizerOptions::default()
        };
        let blocks = synth(&order_info(), Dialect::Oracle, &options);
        let find_all = blocks.iter().find(|b| b.id == "findAll").unwrap();
        assert!(find_all.xml.contains("WHERE ROWNUM <= 100"));
        assert!(!find_all.xml.contains("LIMIT"));
    }

    #[test]
    fn test_capped_find_all_per_dialect() {
        let options = SynthesizerOptions {
            pagination: PaginationOptions {
                find_all: FindAllOptions {
                    policy: FindAllPolicy::Capped,
                    cap: 50,
                },
                ..PaginationOptions::default()
            },
            ..SynthesizerOptions::default()
        };

        let mysql = synth(&order_info(), Dialect::MySql, &options);
        assert!(mysql.iter().any(|b| b.id == "findAll" && b.xml.contains("LIMIT 50")));

        let mssql = synth(&order_info(), Dialect::SqlServer, &options);
        assert!(mssql.iter().any(|b| b.id == "findAll" && b.xml.contains("SELECT TOP (50)")));

        let pg = synth(&order_info(), Dialect::Postgres, &options);
        assert!(pg
            .iter()
            .any(|b| b.id == "findAll" && b.xml.contains("FETCH FIRST 50 ROWS ONLY")));
    }

    #[test]
    fn test_disabled_find_all_emits_nothing() {
        let options = SynthesizerOptions {
            pagination: PaginationOptions {
                find_all: FindAllOptions {
                    policy: FindAllPolicy::Disabled,
                    cap: 0,
                },
                ..PaginationOptions::default()
            },
            ..SynthesizerOptions::default()
        };
        let blocks = synth(&order_info(), Dialect::Postgres, &options);
        assert!(!ids(&blocks).contains(&"findAll"));
    }

    #[test]
    fn test_pagination_disabled_skips_page_and_count() {
        let options = SynthesizerOptions {
            pagination: PaginationOptions {
                enabled: false,
                ..PaginationOptions::default()
            },
            ..SynthesizerOptions::default()
        };
        let blocks = synth(&order_info(), Dialect::Postgres, &options);
        let got = ids(&blocks);
        assert!(!got.contains(&"findPage"));
        assert!(!got.contains(&"countAll"));
    }

    #[test]
    fn test_find_page_clamps_limit_in_statement() {
        let blocks = synth(&order_info(), Dialect::Postgres, &SynthesizerOptions::default());
        let page = blocks.iter().find(|b| b.id == "findPage").unwrap();
        assert!(page
            .xml
            .contains("<bind name=\"__limit\" value=\"limit &gt; 200 ? 200 : limit\"/>"));
        assert!(page.xml.contains("OFFSET #{offset} ROWS FETCH NEXT #{__limit} ROWS ONLY"));
    }

    #[test]
    fn test_find_page_dialect_idioms() {
        let mysql = synth(&order_info(), Dialect::MySql, &SynthesizerOptions::default());
        let page = mysql.iter().find(|b| b.id == "findPage").unwrap();
        assert!(page.xml.contains("LIMIT #{__limit} OFFSET #{offset}"));

        let oracle = synth(&order_info(), Dialect::Oracle, &SynthesizerOptions::default());
        let page = oracle.iter().find(|b| b.id == "findPage").unwrap();
        assert!(page.xml.contains("SELECT inner_q.*, ROWNUM rn FROM ("));
        assert!(page.xml.contains("WHERE rn &gt; #{offset}"));
    }

    #[test]
    fn test_default_order_priority() {
        // Primary key is the last resort.
        let blocks = synth(&order_info(), Dialect::Postgres, &SynthesizerOptions::default());
        let page = blocks.iter().find(|b| b.id == "findPage").unwrap();
        assert!(page.xml.contains("ORDER BY id DESC"));

        // created_at wins over the primary key.
        let desc = EntityDescriptor::new("Order")
            .field(FieldDescriptor::new("id", "i64").tag(FieldTag::PrimaryKey))
            .field(FieldDescriptor::new("createdAt", "String"));
        let info = TableInfo::resolve(&desc, &SnakeCaseStrategy).unwrap();
        let blocks = synth(&info, Dialect::Postgres, &SynthesizerOptions::default());
        let page = blocks.iter().find(|b| b.id == "findPage").unwrap();
        assert!(page.xml.contains("ORDER BY created_at DESC"));
    }

    #[test]
    fn test_update_touches_updated_at_with_now_expr() {
        let desc = EntityDescriptor::new("Order")
            .field(FieldDescriptor::new("id", "i64").tag(FieldTag::PrimaryKey))
            .field(FieldDescriptor::new("customerName", "String"))
            .field(FieldDescriptor::new("updatedAt", "String"));
        let info = TableInfo::resolve(&desc, &SnakeCaseStrategy).unwrap();
        let blocks = synth(&info, Dialect::SqlServer, &SynthesizerOptions::default());
        let update = blocks.iter().find(|b| b.id == "update").unwrap();
        assert!(update.xml.contains("updated_at = SYSUTCDATETIME(),"));
        assert!(!update.xml.contains("updated_at = #{updatedAt}"));
    }

    #[test]
    fn test_allow_empty_set_removes_guard() {
        let options = SynthesizerOptions {
            update: crate::options::UpdateOptions {
                allow_empty_set: true,
            },
            ..SynthesizerOptions::default()
        };
        let blocks = synth(&order_info(), Dialect::Postgres, &options);
        let update = blocks.iter().find(|b| b.id == "update").unwrap();
        assert!(!update.xml.contains("<choose>"));
        assert!(!update.xml.contains("WHERE 1 = 0"));
    }

    #[test]
    fn test_quoted_identifiers() {
        let options = SynthesizerOptions {
            quote_identifiers: true,
            ..SynthesizerOptions::default()
        };
        let blocks = synth(&order_info(), Dialect::MySql, &options);
        let find_by_id = blocks.iter().find(|b| b.id == "findById").unwrap();
        assert!(find_by_id.xml.contains("SELECT `id`, `customer_name` FROM `order`"));

        // keyColumn stays raw even when quoting is on.
        assert!(blocks[0].xml.contains("keyColumn=\"id\""));
    }

    #[test]
    fn test_kind_inference() {
        assert_eq!(StatementKind::infer("insertOrder"), StatementKind::Insert);
        assert_eq!(StatementKind::infer("saveDraft"), StatementKind::Insert);
        assert_eq!(StatementKind::infer("createUser"), StatementKind::Insert);
        assert_eq!(StatementKind::infer("updateName"), StatementKind::Update);
        assert_eq!(StatementKind::infer("modifyState"), StatementKind::Update);
        assert_eq!(StatementKind::infer("deleteStale"), StatementKind::Delete);
        assert_eq!(StatementKind::infer("removeTag"), StatementKind::Delete);
        assert_eq!(StatementKind::infer("findActive"), StatementKind::Select);
    }

    #[test]
    fn test_determinism() {
        let a = synth(&order_info(), Dialect::Postgres, &SynthesizerOptions::default());
        let b = synth(&order_info(), Dialect::Postgres, &SynthesizerOptions::default());
        assert_eq!(a, b);
    }
}
