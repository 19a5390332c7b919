//! Schema-driven SQL statement synthesis.
//!
//! `mapsmith-core` turns declared entity metadata into per-entity table
//! descriptors and synthesizes the canonical CRUD statement blocks a mapper
//! artifact is expected to carry:
//!
//! - **Schema** - entity descriptors resolved into [`schema::TableInfo`]
//! - **Naming** - declared-name to SQL-identifier strategies
//! - **Dialect** - engine profiles: paging idiom, quoting, now-expression
//! - **Statement** - the seven canonical operations rendered as XML blocks
//!
//! Synthesis is deterministic: the same schema, dialect and options always
//! produce byte-identical blocks, so downstream diffing and region patching
//! can rely on textual comparison.
//!
//! # Example
//!
//! ```rust
//! use mapsmith_core::prelude::*;
//! use std::collections::BTreeSet;
//!
//! let order = EntityDescriptor::new("Order")
//!     .field(FieldDescriptor::new("id", "i64").tag(FieldTag::PrimaryKey))
//!     .field(FieldDescriptor::new("customerName", "String"));
//!
//! let info = TableInfo::resolve(&order, &SnakeCaseStrategy).unwrap();
//! let blocks = synthesize(
//!     &info,
//!     "Order",
//!     Dialect::Postgres,
//!     &SynthesizerOptions::default(),
//!     &BTreeSet::new(),
//! );
//! assert_eq!(blocks.len(), 7);
//! ```

pub mod dialect;
pub mod error;
pub mod naming;
pub mod options;
pub mod schema;
pub mod statement;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::dialect::{
        resolve_dialect, resolve_key_retrieval, Dialect, DialectSelection, IdentifierQuoter,
        KeyRetrieval,
    };
    pub use crate::error::{CoreError, Result};
    pub use crate::naming::{NamingStrategy, SnakeCaseStrategy};
    pub use crate::options::{
        FindAllOptions, FindAllPolicy, GeneratedKeyOptions, OrderDirection, OrderMode,
        PaginationOptions, SynthesizerOptions, UpdateOptions,
    };
    pub use crate::schema::{
        EntityDescriptor, FieldDescriptor, FieldTag, SchemaCache, SchemaDescribable, TableInfo,
    };
    pub use crate::statement::{synthesize, StatementBlock, StatementKind, CANONICAL_IDS};
}
