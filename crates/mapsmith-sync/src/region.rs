//! Region patcher: surgical edits inside the generated region of an artifact.
//!
//! The region is a single sentinel-delimited span owned by the tool. All
//! three operations are idempotent, never touch bytes outside the region, and
//! end in an atomic temp-file-plus-rename write so a crash mid-write cannot
//! corrupt the artifact. The region body is append-only: existing blocks are
//! never reordered, reformatted, or removed.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;

use mapsmith_core::statement::{StatementBlock, StatementKind};
use regex::Regex;
use tracing::{debug, info};

use crate::artifact::extract_statement_ids;
use crate::error::{Result, SyncError};

/// Opening sentinel, matched case-sensitively as a fixed literal.
pub const REGION_BEGIN: &str = "<!-- mapsmith:generated:begin -->";
/// Closing sentinel.
pub const REGION_END: &str = "<!-- mapsmith:generated:end -->";

const ORPHAN_PREFIX: &str = "<!-- mapsmith:orphan: id=";
const ORPHAN_LOOKBACK: usize = 400;

/// Region span, byte offsets into the artifact text.
///
/// The body runs from the line after the begin sentinel to the start of the
/// end sentinel's line, so sentinels glued to other content still yield a
/// usable body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SectionRange {
    body_start: usize,
    body_end: usize,
}

fn find_section_range(xml: &str) -> Option<SectionRange> {
    let b = xml.find(REGION_BEGIN)?;
    let e = xml.find(REGION_END)?;
    if e <= b {
        return None;
    }

    let after_begin = b + REGION_BEGIN.len();
    let mut body_start = skip_to_next_line_start(xml, after_begin);
    let mut body_end = move_to_line_start(xml, e);

    if body_end < body_start {
        body_start = after_begin;
        body_end = e;
    }

    Some(SectionRange { body_start, body_end })
}

fn skip_to_next_line_start(s: &str, from: usize) -> usize {
    let bytes = s.as_bytes();
    let mut p = from;
    while p < bytes.len() {
        if bytes[p] == b'\n' {
            return p + 1;
        }
        p += 1;
    }
    bytes.len()
}

fn move_to_line_start(s: &str, from: usize) -> usize {
    let bytes = s.as_bytes();
    let mut p = from;
    while p > 0 && bytes[p - 1] != b'\n' {
        p -= 1;
    }
    p
}

/// Statement ids present inside the region body (ids outside the region do
/// not count; those belong to the user).
#[must_use]
pub fn region_ids(xml: &str) -> BTreeSet<String> {
    find_section_range(xml)
        .map(|r| extract_statement_ids(&xml[r.body_start..r.body_end]))
        .unwrap_or_default()
}

/// Creates the (empty) region immediately before the closing root tag if it
/// is absent. Existing content is untouched.
pub fn ensure_region(path: &Path) -> Result<()> {
    let xml = fs::read_to_string(path)?;

    if xml.contains(REGION_BEGIN) && xml.contains(REGION_END) {
        return Ok(());
    }

    let close = xml
        .rfind("</mapper>")
        .ok_or_else(|| SyncError::MissingRootClose(path.to_path_buf()))?;

    let mut pre = close;
    while pre > 0 && xml.as_bytes()[pre - 1].is_ascii_whitespace() {
        pre -= 1;
    }

    let mut out = String::with_capacity(xml.len() + 80);
    out.push_str(&xml[..pre]);
    out.push_str(&format!("\n\t{REGION_BEGIN}\n\t{REGION_END}\n"));
    out.push_str(&xml[close..]);

    let out = normalize(&out);
    debug!(path = %path.display(), "created generated region");
    atomic_write(path, &out)
}

/// Appends blocks whose ids are not yet present inside the region body.
///
/// Blocks already present are left alone, as is anything outside the region
/// carrying the same id. Returns the number of blocks appended.
pub fn append_missing(path: &Path, blocks: &[StatementBlock]) -> Result<usize> {
    if blocks.is_empty() {
        return Ok(0);
    }

    let xml = fs::read_to_string(path)?;
    let xml = normalize_marker_lines(&xml);

    let Some(range) = find_section_range(&xml) else {
        return Ok(0);
    };

    let body = &xml[range.body_start..range.body_end];
    let present = extract_statement_ids(body);

    let mut appended = Vec::new();
    for block in blocks {
        if present.contains(&block.id) {
            continue;
        }
        appended.push(block.xml.as_str());
    }
    if appended.is_empty() {
        return Ok(0);
    }

    let trimmed = body.trim_end();
    let mut new_body = String::with_capacity(trimmed.len() + 64);
    new_body.push_str(trimmed);
    if !trimmed.is_empty() {
        new_body.push_str("\n\n");
    }
    new_body.push_str(&appended.join("\n\n"));

    let mut out = String::with_capacity(xml.len() + new_body.len());
    out.push_str(&xml[..range.body_start]);
    out.push_str(&new_body);
    out.push('\n');
    out.push_str(&xml[range.body_end..]);

    let out = normalize(&out);
    info!(path = %path.display(), count = appended.len(), "appended statement blocks");
    atomic_write(path, &out)?;
    Ok(appended.len())
}

/// Inserts an orphan comment line above each orphaned statement's opening tag
/// inside the region. An identical comment within the lookback window means
/// the annotation is already there, so repeated runs never accumulate
/// comments. Statements outside the region are never annotated.
pub fn annotate_orphans(path: &Path, orphan_ids: &BTreeSet<String>) -> Result<()> {
    if orphan_ids.is_empty() {
        return Ok(());
    }

    let xml = fs::read_to_string(path)?;
    let xml = normalize_marker_lines(&xml);

    let Some(range) = find_section_range(&xml) else {
        return Ok(());
    };

    let body = &xml[range.body_start..range.body_end];
    let mut updated = body.to_string();
    for id in orphan_ids {
        updated = add_orphan_comment(&updated, id);
    }

    if updated == body {
        return Ok(());
    }

    let mut out = String::with_capacity(xml.len() + 64);
    out.push_str(&xml[..range.body_start]);
    out.push_str(&updated);
    out.push_str(&xml[range.body_end..]);

    let out = normalize(&out);
    info!(path = %path.display(), count = orphan_ids.len(), "annotated orphan statements");
    atomic_write(path, &out)
}

fn add_orphan_comment(body: &str, id: &str) -> String {
    let pattern = format!(
        r#"(?m)(^[\t ]*)(<(?:select|insert|update|delete)\b[^>]*\bid\s*=\s*"{}"[^>]*>)"#,
        regex::escape(id)
    );
    let Ok(re) = Regex::new(&pattern) else {
        return body.to_string();
    };
    let Some(m) = re.captures(body) else {
        return body.to_string();
    };

    let line_start = m.get(1).map_or(0, |g| g.start());
    let indent = m.get(1).map_or("", |g| g.as_str());

    let marker = format!("{ORPHAN_PREFIX}{id}");
    let mut lookback_from = line_start.saturating_sub(ORPHAN_LOOKBACK);
    while !body.is_char_boundary(lookback_from) {
        lookback_from -= 1;
    }
    if body[lookback_from..line_start].contains(&marker) {
        return body.to_string();
    }

    let comment = format!("{indent}{marker} no longer expected by mapper interface -->\n");
    let mut out = String::with_capacity(body.len() + comment.len());
    out.push_str(&body[..line_start]);
    out.push_str(&comment);
    out.push_str(&body[line_start..]);
    out
}

/// Skeleton block for an id with no synthesized statement: the kind comes
/// from the id-prefix heuristic and the body is a TODO placeholder.
#[must_use]
pub fn stub_block(id: &str) -> StatementBlock {
    let kind = StatementKind::infer(id);
    let tag = kind.tag();
    StatementBlock {
        id: id.to_string(),
        kind,
        xml: format!("\t<{tag} id=\"{id}\">\n\t  /* TODO: write SQL */\n\t</{tag}>"),
    }
}

/// Writes a fresh artifact containing only the given blocks inside a region.
pub fn write_new_artifact(path: &Path, namespace: &str, blocks: &[StatementBlock]) -> Result<()> {
    let body: Vec<&str> = blocks.iter().map(|b| b.xml.as_str()).collect();

    let mut out = String::with_capacity(256 + body.iter().map(|b| b.len()).sum::<usize>());
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!("<mapper namespace=\"{namespace}\">\n"));
    out.push_str(&format!("\t{REGION_BEGIN}\n"));
    if !body.is_empty() {
        out.push_str(&body.join("\n\n"));
        out.push('\n');
    }
    out.push_str(&format!("\t{REGION_END}\n"));
    out.push_str("</mapper>\n");

    info!(path = %path.display(), namespace, blocks = blocks.len(), "created artifact");
    atomic_write(path, &out)
}

// --- normalization ---

fn normalize(xml: &str) -> String {
    let xml = normalize_marker_lines(xml);
    let xml = normalize_marker_indent(&xml);
    normalize_section_body(&xml)
}

/// Forces each sentinel onto its own line, splitting it off content glued
/// before or after it, then collapses runs of three or more newlines.
fn normalize_marker_lines(xml: &str) -> String {
    let out = isolate_marker(xml, REGION_BEGIN);
    let out = isolate_marker(&out, REGION_END);
    collapse_blank_runs(&out)
}

fn isolate_marker(xml: &str, marker: &str) -> String {
    let mut out = String::with_capacity(xml.len() + 8);
    let mut rest = xml;

    while let Some(pos) = rest.find(marker) {
        let before = rest[..pos].trim_end_matches([' ', '\t']);
        out.push_str(before);
        if !before.is_empty() && !before.ends_with('\n') {
            out.push_str("\n\t");
        }
        out.push_str(marker);

        rest = rest[pos + marker.len()..].trim_start_matches([' ', '\t']);
        if !rest.is_empty() && !rest.starts_with('\n') {
            out.push('\n');
        }
    }

    out.push_str(rest);
    out
}

fn collapse_blank_runs(xml: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap());
    re.replace_all(xml, "\n\n").into_owned()
}

/// Sentinel lines are always exactly `\t` plus the sentinel.
fn normalize_marker_indent(xml: &str) -> String {
    static BEGIN_RE: OnceLock<Regex> = OnceLock::new();
    static END_RE: OnceLock<Regex> = OnceLock::new();
    let begin = BEGIN_RE.get_or_init(|| {
        Regex::new(&format!(r"(?m)^[\t ]*{}[\t ]*$", regex::escape(REGION_BEGIN))).unwrap()
    });
    let end = END_RE.get_or_init(|| {
        Regex::new(&format!(r"(?m)^[\t ]*{}[\t ]*$", regex::escape(REGION_END))).unwrap()
    });

    let out = begin.replace_all(xml, format!("\t{REGION_BEGIN}")).into_owned();
    end.replace_all(&out, format!("\t{REGION_END}")).into_owned()
}

/// Fixes spacing between blocks in the region body. Statement and orphan
/// comment lines start with a tab, block separation is a single blank line,
/// and trailing whitespace is stripped. SQL inside a block is untouched.
fn normalize_section_body(xml: &str) -> String {
    let Some(range) = find_section_range(xml) else {
        return xml.to_string();
    };

    let body = &xml[range.body_start..range.body_end];
    let fixed = normalize_inter_statement_spacing(body);

    let mut out = String::with_capacity(xml.len());
    out.push_str(&xml[..range.body_start]);
    if !fixed.is_empty() {
        out.push_str(&fixed);
        out.push('\n');
    }
    out.push_str(&xml[range.body_end..]);
    out
}

fn normalize_inter_statement_spacing(body: &str) -> String {
    if body.trim().is_empty() {
        return String::new();
    }

    static OPEN_RE: OnceLock<Regex> = OnceLock::new();
    static ORPHAN_RE: OnceLock<Regex> = OnceLock::new();
    static GAP_RE: OnceLock<Regex> = OnceLock::new();

    let open = OPEN_RE.get_or_init(|| {
        Regex::new(r"(?m)^[\t ]*(<(?:select|insert|update|delete)\b)").unwrap()
    });
    let orphan = ORPHAN_RE
        .get_or_init(|| Regex::new(r"(?m)^[\t ]*(<!-- mapsmith:orphan:)").unwrap());
    let gap = GAP_RE.get_or_init(|| {
        Regex::new(r"(?s)(</(?:select|insert|update|delete)>)(\s*\n){2,}(\t(?:<|<!--))").unwrap()
    });

    let body = open.replace_all(body, "\t$1");
    let body = orphan.replace_all(&body, "\t$1");
    let body = gap.replace_all(&body, "${1}\n\n${3}");
    body.trim_end().to_string()
}

/// Writes `content` through a sibling temp file and an atomic rename.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir)?;
    }

    let mut tmp = tempfile::NamedTempFile::new_in(dir.unwrap_or_else(|| Path::new(".")))?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}
