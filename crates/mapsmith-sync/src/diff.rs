//! Diff engine: expected ids versus present ids, per namespace.

use std::collections::{BTreeMap, BTreeSet};

use crate::artifact::XmlIndex;

/// Missing and orphan statement ids, keyed by namespace, all sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// expected − actual; namespaces without an artifact contribute their
    /// entire expected set.
    pub missing: BTreeMap<String, BTreeSet<String>>,
    /// actual − expected; namespaces without an interface contribute their
    /// entire actual set.
    pub orphan: BTreeMap<String, BTreeSet<String>>,
}

impl DiffResult {
    /// True when nothing is missing and nothing is orphaned.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.orphan.is_empty()
    }

    /// Summary of missing ids, previewing up to `limit` ids per namespace.
    #[must_use]
    pub fn format_missing(&self, limit: usize) -> String {
        format("missing", &self.missing, limit, false)
    }

    /// Summary of orphan ids.
    #[must_use]
    pub fn format_orphan(&self, limit: usize) -> String {
        format("orphan", &self.orphan, limit, false)
    }

    /// One-id-per-line missing report, truncated at `limit` per namespace.
    #[must_use]
    pub fn format_missing_detailed(&self, limit: usize) -> String {
        format("missing", &self.missing, limit, true)
    }

    /// One-id-per-line orphan report.
    #[must_use]
    pub fn format_orphan_detailed(&self, limit: usize) -> String {
        format("orphan", &self.orphan, limit, true)
    }
}

/// Computes the per-namespace diff over the union of both sides.
#[must_use]
pub fn diff(expected: &BTreeMap<String, BTreeSet<String>>, index: &XmlIndex) -> DiffResult {
    let mut result = DiffResult::default();

    let mut namespaces: BTreeSet<&str> = expected.keys().map(String::as_str).collect();
    namespaces.extend(index.namespaces());

    for ns in namespaces {
        let want = expected.get(ns).cloned().unwrap_or_default();
        let have = index.ids_of(ns);

        let missing: BTreeSet<String> = want.difference(&have).cloned().collect();
        let orphan: BTreeSet<String> = have.difference(&want).cloned().collect();

        if !missing.is_empty() {
            result.missing.insert(ns.to_string(), missing);
        }
        if !orphan.is_empty() {
            result.orphan.insert(ns.to_string(), orphan);
        }
    }

    result
}

fn format(
    title: &str,
    map: &BTreeMap<String, BTreeSet<String>>,
    limit: usize,
    detailed: bool,
) -> String {
    if map.is_empty() {
        return format!("mapsmith {title}: <none>");
    }

    let total: usize = map.values().map(BTreeSet::len).sum();
    let mut out = if detailed {
        format!("mapsmith {title}:\n")
    } else {
        format!("mapsmith {title}: total={total}\n")
    };

    for (ns, ids) in map {
        if detailed {
            out.push_str(&format!("- {ns} ({})\n", ids.len()));
            for (printed, id) in ids.iter().enumerate() {
                out.push_str(&format!("  * {id}\n"));
                if printed + 1 >= limit {
                    out.push_str(&format!("  ... (truncated at {limit} entries)\n"));
                    break;
                }
            }
        } else {
            let preview: Vec<&str> = ids.iter().take(limit).map(String::as_str).collect();
            out.push_str(&format!("- {ns} ({}): {}", ids.len(), preview.join(", ")));
            if ids.len() > limit {
                out.push_str(" ...");
            }
            out.push('\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact;
    use std::fs;

    fn index_with(files: &[(&str, &str)]) -> XmlIndex {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        artifact::scan(dir.path()).unwrap()
    }

    fn expected_of(pairs: &[(&str, &[&str])]) -> BTreeMap<String, BTreeSet<String>> {
        pairs
            .iter()
            .map(|(ns, ids)| {
                (
                    (*ns).to_string(),
                    ids.iter().map(|s| (*s).to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_missing_and_orphan_over_union() {
        let index = index_with(&[(
            "Order.xml",
            r#"<mapper namespace="orders.OrderMapper">
	<select id="findById">x</select>
	<select id="legacyLookup">x</select>
</mapper>"#,
        )]);
        let expected = expected_of(&[
            ("orders.OrderMapper", &["findById", "insert"]),
            ("users.UserMapper", &["findAll"]),
        ]);

        let result = diff(&expected, &index);

        assert_eq!(
            result.missing["orders.OrderMapper"],
            ["insert".to_string()].into()
        );
        // No artifact at all: whole expected set missing.
        assert_eq!(
            result.missing["users.UserMapper"],
            ["findAll".to_string()].into()
        );
        assert_eq!(
            result.orphan["orders.OrderMapper"],
            ["legacyLookup".to_string()].into()
        );
    }

    #[test]
    fn test_artifact_without_interface_is_all_orphans() {
        let index = index_with(&[(
            "Stray.xml",
            r#"<mapper namespace="stray.Mapper"><select id="anything">x</select></mapper>"#,
        )]);
        let result = diff(&BTreeMap::new(), &index);
        assert_eq!(result.orphan["stray.Mapper"], ["anything".to_string()].into());
        assert!(result.missing.is_empty());
    }

    #[test]
    fn test_clean_diff() {
        let index = index_with(&[(
            "Order.xml",
            r#"<mapper namespace="orders.OrderMapper"><select id="findById">x</select></mapper>"#,
        )]);
        let expected = expected_of(&[("orders.OrderMapper", &["findById"])]);
        assert!(diff(&expected, &index).is_clean());
    }

    #[test]
    fn test_summary_format_truncates() {
        let expected = expected_of(&[(
            "ns.Mapper",
            &["a", "b", "c", "d", "e", "f", "g"],
        )]);
        let result = diff(&expected, &XmlIndex::default());

        let summary = result.format_missing(5);
        assert!(summary.starts_with("mapsmith missing: total=7\n"));
        assert!(summary.contains("- ns.Mapper (7): a, b, c, d, e ..."));

        let detailed = result.format_missing_detailed(3);
        assert!(detailed.contains("  * a\n"));
        assert!(detailed.contains("... (truncated at 3 entries)"));

        assert_eq!(result.format_orphan(5), "mapsmith orphan: <none>");
    }
}
