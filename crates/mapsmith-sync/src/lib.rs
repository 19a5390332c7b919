//! Generated-region reconciliation between mapper interfaces and xml
//! artifacts.
//!
//! `mapsmith-sync` keeps hand-written mapper xml and declared mapper
//! interfaces in step without owning either side:
//!
//! - **Interface scanner** - declared interfaces to expected statement ids,
//!   with overload collisions as a hard error
//! - **Artifact scanner** - flat xml layout to a namespace index
//! - **Diff engine** - missing and orphan ids over the namespace union
//! - **Region patcher** - append-only sentinel region inside each artifact,
//!   patched with atomic writes
//! - **Drift detector** - schema-vs-struct reconciliation with rename
//!   inference
//! - **Entity generator** - declared-type sources from a schema snapshot
//! - **Pipeline** - orchestration plus the severity policy and write gate
//!
//! # Example
//!
//! ```rust,ignore
//! use mapsmith_sync::prelude::*;
//!
//! let options = SyncOptions::default();
//! let registry = SchemaRegistry::default();
//! let pipeline = Pipeline::new(&options, &registry, None, std::env::current_dir()?);
//!
//! let interfaces = load_manifest(Path::new("mappers.json"))?;
//! let diff = pipeline.check(&interfaces)?;
//! if !diff.is_clean() {
//!     println!("{}", diff.format_missing(5));
//! }
//! ```

pub mod artifact;
pub mod config;
pub mod diff;
pub mod drift;
pub mod entity;
pub mod error;
pub mod gate;
pub mod interface;
pub mod pipeline;
pub mod region;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::artifact::{scan as scan_artifacts, XmlIndex};
    pub use crate::config::{parse_bool_strict, SyncOptions};
    pub use crate::diff::{diff, DiffResult};
    pub use crate::drift::{reconcile, DriftKind, ReconcileOutcome, SchemaField};
    pub use crate::entity::{sync_entities, EntityOptions, EntityReport, SchemaSnapshot};
    pub use crate::error::{Result, SyncError};
    pub use crate::gate::WriteGate;
    pub use crate::interface::{
        load_manifest, scan as scan_interfaces, InterfaceScan, MapperInterface, MapperMethod,
    };
    pub use crate::pipeline::{Pipeline, SchemaRegistry, SyncReport};
    pub use crate::region::{REGION_BEGIN, REGION_END};
}
