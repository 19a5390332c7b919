//! Target-engine SQL dialect profiles.
//!
//! A dialect affects paging idiom, identifier quoting, the current-timestamp
//! expression, and whether driver-generated-key capture is reliable. Anything
//! unrecognized falls back to [`Dialect::Ansi`], which emits standard
//! `OFFSET ... ROWS FETCH NEXT ... ROWS ONLY` paging.

use serde::{Deserialize, Serialize};

/// Named SQL-syntax profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// PostgreSQL.
    Postgres,
    /// MySQL.
    MySql,
    /// MariaDB.
    MariaDb,
    /// H2 (ANSI-ish embedded engine).
    H2,
    /// SQLite.
    Sqlite,
    /// Microsoft SQL Server.
    SqlServer,
    /// Oracle.
    Oracle,
    /// Dialect-neutral ANSI fallback.
    Ansi,
}

impl Dialect {
    /// Returns the dialect name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::MariaDb => "mariadb",
            Self::H2 => "h2",
            Self::Sqlite => "sqlite",
            Self::SqlServer => "sqlserver",
            Self::Oracle => "oracle",
            Self::Ansi => "ansi",
        }
    }

    /// Infers a dialect from an engine product name (as reported by driver
    /// metadata). Unrecognized names map to [`Dialect::Ansi`].
    #[must_use]
    pub fn from_product_name(product: &str) -> Self {
        let db = product.trim().to_ascii_lowercase();

        // MariaDB reports "mysql" in some drivers, so test it first.
        if db.contains("mariadb") {
            Self::MariaDb
        } else if db.contains("postgres") {
            Self::Postgres
        } else if db.contains("mysql") {
            Self::MySql
        } else if db.contains("sql server") || db.contains("mssql") {
            Self::SqlServer
        } else if db.contains("oracle") {
            Self::Oracle
        } else if db.contains("sqlite") {
            Self::Sqlite
        } else if db.contains("h2") {
            Self::H2
        } else {
            Self::Ansi
        }
    }

    /// Current-timestamp expression for this dialect.
    #[must_use]
    pub const fn now_expr(self) -> &'static str {
        match self {
            Self::Oracle => "SYSTIMESTAMP",
            Self::SqlServer => "SYSUTCDATETIME()",
            _ => "CURRENT_TIMESTAMP",
        }
    }
}

/// Dialect selection: explicit configuration or live product-name sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DialectSelection {
    /// Infer from the engine product name; ANSI when unavailable.
    #[default]
    Auto,
    /// Use the named dialect unconditionally.
    Fixed(Dialect),
}

/// Resolves the effective dialect.
///
/// Explicit configuration wins; `Auto` consults the product name; no product
/// name means [`Dialect::Ansi`].
#[must_use]
pub fn resolve_dialect(selection: DialectSelection, product_name: Option<&str>) -> Dialect {
    match selection {
        DialectSelection::Fixed(d) => d,
        DialectSelection::Auto => {
            product_name.map_or(Dialect::Ansi, Dialect::from_product_name)
        }
    }
}

/// Primary-key retrieval strategy for synthesized inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyRetrieval {
    /// Resolve per dialect (conservative).
    #[default]
    Auto,
    /// Capture the driver-generated key into the entity.
    DriverGenerated,
    /// No key capture.
    None,
}

/// Resolves `Auto` key retrieval per dialect.
///
/// Oracle resolves to `None`: generated-key capture there depends on
/// sequences/triggers and cannot be automated safely. Everything else gets
/// driver-generated capture.
#[must_use]
pub const fn resolve_key_retrieval(configured: KeyRetrieval, dialect: Dialect) -> KeyRetrieval {
    match configured {
        KeyRetrieval::Auto => match dialect {
            Dialect::Oracle => KeyRetrieval::None,
            _ => KeyRetrieval::DriverGenerated,
        },
        other => other,
    }
}

/// Dialect-aware identifier quoting.
///
/// Quotes each segment of a dot-separated path (`schema.table`, `t.*`)
/// individually and is idempotent against already-quoted input. Disabled
/// quoters pass input through untouched.
#[derive(Debug, Clone, Copy)]
pub struct IdentifierQuoter {
    dialect: Dialect,
    enabled: bool,
}

impl IdentifierQuoter {
    /// Creates a quoter for the given dialect.
    #[must_use]
    pub const fn new(dialect: Dialect, enabled: bool) -> Self {
        Self { dialect, enabled }
    }

    /// Quotes an identifier path.
    #[must_use]
    pub fn quote(&self, raw: &str) -> String {
        if !self.enabled {
            return raw.to_string();
        }
        let s = raw.trim();
        if s.is_empty() || s == "*" || is_fully_quoted(s) {
            return s.to_string();
        }

        if s.contains('.') {
            let mut out = String::with_capacity(s.len() + 8);
            let mut first = true;
            for part in s.split('.') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                if !first {
                    out.push('.');
                }
                first = false;
                if part == "*" || is_fully_quoted(part) {
                    out.push_str(part);
                } else {
                    out.push_str(&self.quote_single(part));
                }
            }
            return out;
        }

        self.quote_single(s)
    }

    fn quote_single(&self, token: &str) -> String {
        match self.dialect {
            Dialect::MySql | Dialect::MariaDb => format!("`{token}`"),
            Dialect::SqlServer => format!("[{token}]"),
            _ => format!("\"{token}\""),
        }
    }
}

fn is_fully_quoted(s: &str) -> bool {
    s.len() >= 2
        && ((s.starts_with('`') && s.ends_with('`'))
            || (s.starts_with('"') && s.ends_with('"'))
            || (s.starts_with('[') && s.ends_with(']')))
}

/// Strips any quoting style from an identifier. Attribute positions (e.g. a
/// driver `keyColumn`) want the raw column name, never a quoted one.
#[must_use]
pub fn strip_quotes(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '`' | '"' | '[' | ']'))
        .collect()
}
