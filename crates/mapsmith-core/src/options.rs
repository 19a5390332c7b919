//! Configuration surface for statement synthesis.
//!
//! All options deserialize from kebab-case keys and carry defaults, so a
//! host can bind them from any property source and omit what it does not
//! care about.

use serde::{Deserialize, Serialize};

use crate::dialect::{DialectSelection, KeyRetrieval};

const DEFAULT_FIND_ALL_CAP: u32 = 1000;
const DEFAULT_MAX_PAGE_SIZE: u32 = 200;

/// Options controlling the statement synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SynthesizerOptions {
    /// Master switch for statement synthesis.
    pub enabled: bool,
    /// Quote identifiers in emitted SQL (dialect-specific style).
    pub quote_identifiers: bool,
    /// Dialect selection.
    pub dialect: DialectSelection,
    /// Override for the current-timestamp expression.
    pub now_function: Option<String>,
    /// Generated-key handling for inserts.
    pub generated_key: GeneratedKeyOptions,
    /// Pagination-related knobs.
    pub pagination: PaginationOptions,
    /// Update-statement knobs.
    pub update: UpdateOptions,
}

impl Default for SynthesizerOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            quote_identifiers: false,
            dialect: DialectSelection::Auto,
            now_function: None,
            generated_key: GeneratedKeyOptions::default(),
            pagination: PaginationOptions::default(),
            update: UpdateOptions::default(),
        }
    }
}

impl SynthesizerOptions {
    /// Effective now-expression: user override wins, else the dialect's.
    #[must_use]
    pub fn now_expr(&self, dialect: crate::dialect::Dialect) -> String {
        match self.now_function.as_deref().map(str::trim) {
            Some(f) if !f.is_empty() => f.to_string(),
            _ => dialect.now_expr().to_string(),
        }
    }
}

/// Generated-key capture for inserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GeneratedKeyOptions {
    /// Retrieval strategy; `Auto` resolves per dialect.
    pub strategy: KeyRetrieval,
    /// Key column reported to the driver; blank falls back to `id`.
    pub key_column: String,
}

impl Default for GeneratedKeyOptions {
    fn default() -> Self {
        Self {
            strategy: KeyRetrieval::Auto,
            key_column: "id".to_string(),
        }
    }
}

impl GeneratedKeyOptions {
    /// Key column with the blank fallback applied.
    #[must_use]
    pub fn effective_key_column(&self) -> &str {
        let trimmed = self.key_column.trim();
        if trimmed.is_empty() { "id" } else { trimmed }
    }
}

/// Pagination knobs: `findPage`/`countAll` are only synthesized when enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PaginationOptions {
    /// Enables `findPage` and `countAll` synthesis.
    pub enabled: bool,
    /// Server-side page-size clamp baked into the statement.
    pub max_page_size: u32,
    /// Default ordering for paged reads.
    pub default_order: DefaultOrderOptions,
    /// Safety policy for `findAll`.
    pub find_all: FindAllOptions,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            default_order: DefaultOrderOptions::default(),
            find_all: FindAllOptions::default(),
        }
    }
}

impl PaginationOptions {
    /// Max page size with the non-positive fallback applied.
    #[must_use]
    pub const fn effective_max_page_size(&self) -> u32 {
        if self.max_page_size == 0 {
            DEFAULT_MAX_PAGE_SIZE
        } else {
            self.max_page_size
        }
    }
}

/// Default ORDER BY resolution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderMode {
    /// `created_at` if present, else `updated_at`, else the primary key.
    #[default]
    Auto,
    /// `created_at` or nothing.
    CreatedAt,
    /// `updated_at` or nothing.
    UpdatedAt,
    /// The primary key or nothing.
    PrimaryKey,
    /// Emit no ORDER BY at all.
    None,
}

/// Sort direction for the default order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderDirection {
    /// Ascending.
    Asc,
    /// Descending (default: newest first).
    #[default]
    Desc,
}

impl OrderDirection {
    /// SQL keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Default ordering configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DefaultOrderOptions {
    /// Column resolution mode.
    pub mode: OrderMode,
    /// Sort direction.
    pub direction: OrderDirection,
}

/// Safety policy for the unpaged `findAll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindAllPolicy {
    /// Emit a plain unbounded select.
    #[default]
    Unbounded,
    /// Cap the result set with the dialect's native row-limiting syntax.
    Capped,
    /// Do not synthesize `findAll` at all.
    Disabled,
}

/// `findAll` policy plus its cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FindAllOptions {
    /// The policy.
    pub policy: FindAllPolicy,
    /// Row cap used by [`FindAllPolicy::Capped`].
    pub cap: u32,
}

impl Default for FindAllOptions {
    fn default() -> Self {
        Self {
            policy: FindAllPolicy::Unbounded,
            cap: DEFAULT_FIND_ALL_CAP,
        }
    }
}

impl FindAllOptions {
    /// Cap with the non-positive fallback applied.
    #[must_use]
    pub const fn effective_cap(&self) -> u32 {
        if self.cap == 0 { DEFAULT_FIND_ALL_CAP } else { self.cap }
    }
}

/// Update-statement behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UpdateOptions {
    /// When false (default), an all-null payload degrades to a statically
    /// false predicate instead of an unconditional full-table update.
    pub allow_empty_set: bool,
}
