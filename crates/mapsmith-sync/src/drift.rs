//! Drift detection between declared struct fields and schema columns.
//!
//! Works on the struct's source text: deleted columns get a removal marker,
//! retyped columns a type-mismatch marker, and renamed columns a rename hint,
//! all as comments above the field line. Newly added columns become field
//! declarations inside a dedicated sub-region so repeated runs never
//! re-insert them. Type mismatches are never auto-corrected.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use mapsmith_core::naming::to_snake_case;
use regex::Regex;
use tracing::warn;

/// Minimum similarity score for a deleted/added pair to count as a rename.
pub const RENAME_SCORE_THRESHOLD: f64 = 0.62;

const SHORT_NAME_PENALTY: f64 = 0.08;
const SHORT_NAME_LEN: usize = 4;

const DELETED_MARK_PREFIX: &str = "// [DELETED] column '";
const RENAMED_MARK_PREFIX: &str = "// [RENAMED?] field may have been renamed to column '";
const TYPE_MISMATCH_PREFIX: &str = "// [TYPE MISMATCH] schema type:";
const ADDED_MARK: &str = "// added from column";

/// Opening marker of the added-fields sub-region.
pub const ADDED_BLOCK_BEGIN: &str = "    // mapsmith:added-fields:begin";
/// Closing marker.
pub const ADDED_BLOCK_END: &str = "    // mapsmith:added-fields:end";

fn field_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*pub\s+(\w+)\s*:\s*([A-Za-z0-9_:<>]+)\s*,").unwrap())
}

fn added_block_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)[\t ]*// mapsmith:added-fields:begin.*?// mapsmith:added-fields:end[\t ]*",
        )
        .unwrap()
    })
}

/// One schema column with its derived field name and resolved type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    /// Field name the column maps to.
    pub field: String,
    /// Source column name.
    pub column: String,
    /// Resolved Rust type as emitted in declarations.
    pub rust_type: String,
}

impl SchemaField {
    /// Creates a schema field entry.
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        column: impl Into<String>,
        rust_type: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            column: column.into(),
            rust_type: rust_type.into(),
        }
    }
}

/// How one declared field relates to the current schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriftKind {
    /// Declared and present with the same type.
    Unchanged,
    /// Column exists, declaration does not; added to the sub-region.
    Added,
    /// Declaration exists, column does not, no rename candidate.
    Deleted,
    /// Declaration's column disappeared while a same-typed similar column
    /// appeared.
    Renamed {
        /// Field name of the rename candidate.
        to_field: String,
        /// Column name of the rename candidate.
        to_column: String,
    },
    /// Same name, different resolved type; flagged, never corrected.
    TypeMismatch {
        /// Type the schema reports.
        schema_type: String,
    },
}

/// Result of reconciling one struct source against the schema.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// Updated source text; equals the input when nothing changed.
    pub content: String,
    /// True when the text differs from the input.
    pub changed: bool,
    /// Per-name classification, declared fields first, added fields after.
    pub classifications: Vec<(String, DriftKind)>,
}

/// Declared `pub name: Type,` fields in declaration order.
#[must_use]
pub fn parse_declared_fields(content: &str) -> Vec<(String, String)> {
    field_pattern()
        .captures_iter(content)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

/// Reconciles a struct source against the schema snapshot for `table`.
///
/// The returned content carries marker comments and the added-fields
/// sub-region; when no classification changes the text, `changed` is false
/// and no write should happen.
#[must_use]
pub fn reconcile(content: &str, table: &str, schema: &[SchemaField]) -> ReconcileOutcome {
    let declared = parse_declared_fields(content);
    let declared_types: BTreeMap<&str, &str> = declared
        .iter()
        .map(|(n, t)| (n.as_str(), t.as_str()))
        .collect();
    let schema_by_field: BTreeMap<&str, &SchemaField> =
        schema.iter().map(|f| (f.field.as_str(), f)).collect();

    let deleted: Vec<&(String, String)> = declared
        .iter()
        .filter(|(name, _)| !schema_by_field.contains_key(name.as_str()))
        .collect();
    let added: Vec<&SchemaField> = schema
        .iter()
        .filter(|f| !declared_types.contains_key(f.field.as_str()))
        .collect();

    let renames = detect_rename_pairs(&deleted, &added);
    let matched_added: HashSet<&str> = renames.values().map(|f| f.field.as_str()).collect();

    let mut out = content.to_string();
    let mut classifications = Vec::new();

    for (name, ty) in &declared {
        if let Some(schema_field) = schema_by_field.get(name.as_str()) {
            if schema_field.rust_type == *ty {
                classifications.push((name.clone(), DriftKind::Unchanged));
            } else {
                classifications.push((
                    name.clone(),
                    DriftKind::TypeMismatch {
                        schema_type: schema_field.rust_type.clone(),
                    },
                ));
                mark_type_mismatch(&mut out, name, ty, &schema_field.rust_type);
            }
            continue;
        }

        if let Some(candidate) = renames.get(name.as_str()) {
            classifications.push((
                name.clone(),
                DriftKind::Renamed {
                    to_field: candidate.field.clone(),
                    to_column: candidate.column.clone(),
                },
            ));
            mark_renamed(&mut out, name, ty, candidate);
        } else {
            classifications.push((name.clone(), DriftKind::Deleted));
            mark_deleted(&mut out, name, ty, table);
        }
    }

    let effective_added: Vec<&SchemaField> = added
        .iter()
        .filter(|f| !matched_added.contains(f.field.as_str()))
        .copied()
        .collect();
    for f in &effective_added {
        classifications.push((f.field.clone(), DriftKind::Added));
    }
    if !effective_added.is_empty() {
        out = upsert_added_fields(&out, &effective_added);
    }

    // A marker may be removed and re-inserted verbatim; only a real textual
    // difference counts as a change.
    let changed = out != content;
    ReconcileOutcome {
        content: out,
        changed,
        classifications,
    }
}

fn target_line(name: &str, ty: &str) -> String {
    format!("pub {name}: {ty},")
}

fn mark_deleted(content: &mut String, name: &str, ty: &str, table: &str) {
    let target = target_line(name, ty);
    if !content.contains(&target) {
        return;
    }
    let msg = format!(
        "{DELETED_MARK_PREFIX}{}' no longer exists in table {table}",
        to_snake_case(name)
    );
    *content = remove_marker_above(content, &target, DELETED_MARK_PREFIX);
    if content.contains(&msg) {
        return;
    }
    warn!(field = name, table, "field marked as deleted");
    *content = content.replacen(&target, &format!("{msg}\n    {target}"), 1);
}

fn mark_renamed(content: &mut String, name: &str, ty: &str, candidate: &SchemaField) {
    let target = target_line(name, ty);
    if !content.contains(&target) {
        return;
    }
    let msg = format!(
        "{RENAMED_MARK_PREFIX}{}' (field: {})",
        candidate.column, candidate.field
    );
    *content = remove_marker_above(content, &target, RENAMED_MARK_PREFIX);
    if content.contains(&msg) {
        return;
    }
    warn!(field = name, to = %candidate.column, "field marked as possibly renamed");
    *content = content.replacen(&target, &format!("{msg}\n    {target}"), 1);
}

fn mark_type_mismatch(content: &mut String, name: &str, ty: &str, schema_type: &str) {
    let target = target_line(name, ty);
    if !content.contains(&target) {
        return;
    }
    let msg = format!("{TYPE_MISMATCH_PREFIX} {schema_type} (current: {ty})");
    *content = remove_marker_above(content, &target, TYPE_MISMATCH_PREFIX);
    if content.contains(&msg) {
        return;
    }
    warn!(field = name, schema_type, current = ty, "type mismatch");
    *content = content.replacen(&target, &format!("{msg}\n    {target}"), 1);
}

/// Drops a stale marker of the given kind sitting directly above the field
/// line, so the current marker replaces it instead of stacking.
fn remove_marker_above(content: &str, target: &str, marker_prefix: &str) -> String {
    let pattern = format!(
        r"(?m)^[\t ]*{}.*\n[\t ]*{}[\t ]*$",
        regex::escape(marker_prefix),
        regex::escape(target)
    );
    let Ok(re) = Regex::new(&pattern) else {
        return content.to_string();
    };
    re.replace(content, format!("    {target}")).into_owned()
}

fn upsert_added_fields(content: &str, added: &[&SchemaField]) -> String {
    let render = |f: &SchemaField| {
        format!(
            "    pub {}: {}, {ADDED_MARK} '{}'\n",
            f.field, f.rust_type, f.column
        )
    };

    if let Some(m) = added_block_pattern().find(content) {
        let block = m.as_str();
        let already: HashSet<String> = parse_declared_fields(block)
            .into_iter()
            .map(|(n, _)| n)
            .collect();

        let mut append = String::new();
        for f in added {
            if already.contains(&f.field) {
                continue;
            }
            append.push_str(&render(f));
        }
        if append.is_empty() {
            return content.to_string();
        }

        let new_block = block.replacen(ADDED_BLOCK_END, &format!("{append}{ADDED_BLOCK_END}"), 1);
        let mut out = String::with_capacity(content.len() + new_block.len());
        out.push_str(&content[..m.start()]);
        out.push_str(&new_block);
        out.push_str(&content[m.end()..]);
        return out;
    }

    // No sub-region yet: create one before the struct's closing brace.
    let Some(last_brace) = content.rfind('}') else {
        return content.to_string();
    };
    let mut fields = String::new();
    for f in added {
        fields.push_str(&render(f));
    }
    if fields.is_empty() {
        return content.to_string();
    }

    let block = format!("\n{ADDED_BLOCK_BEGIN}\n{fields}{ADDED_BLOCK_END}\n");
    format!("{}{block}{}", content[..last_brace].trim_end(), &content[last_brace..])
}

fn detect_rename_pairs<'a>(
    deleted: &[&(String, String)],
    added: &[&'a SchemaField],
) -> BTreeMap<String, &'a SchemaField> {
    let mut result = BTreeMap::new();
    let mut used: HashSet<&str> = HashSet::new();

    for (name, ty) in deleted.iter().copied() {
        let mut best: Option<&SchemaField> = None;
        let mut best_score = 0.0_f64;

        for candidate in added.iter().copied() {
            if used.contains(candidate.field.as_str()) {
                continue;
            }
            if candidate.rust_type != *ty {
                continue;
            }
            let score = similarity(name, &candidate.field);
            if score > best_score {
                best_score = score;
                best = Some(candidate);
            }
        }

        if let Some(candidate) = best {
            if best_score >= RENAME_SCORE_THRESHOLD {
                used.insert(candidate.field.as_str());
                result.insert(name.clone(), candidate);
            }
        }
    }

    result
}

/// Name similarity on a 0..=1 scale.
///
/// Exact normalized match is 1.0, substring containment 0.92, otherwise one
/// minus the normalized edit distance with a penalty for very short names to
/// suppress coincidental matches.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let na = normalize_name(a);
    let nb = normalize_name(b);

    if na == nb {
        return 1.0;
    }
    if na.contains(&nb) || nb.contains(&na) {
        return 0.92;
    }

    let dist = levenshtein(&na, &nb);
    let max = na.chars().count().max(nb.chars().count());
    if max == 0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let mut ratio = 1.0 - (dist as f64 / max as f64);
    if max <= SHORT_NAME_LEN {
        ratio -= SHORT_NAME_PENALTY;
    }
    ratio.clamp(0.0, 1.0)
}

fn normalize_name(s: &str) -> String {
    to_snake_case(s).replace('_', "").to_ascii_lowercase()
}

fn levenshtein(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, &c1) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &c2) in b.iter().enumerate() {
            let cost = usize::from(c1 != c2);
            curr[j + 1] = (curr[j] + 1).min(prev[j + 1] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
