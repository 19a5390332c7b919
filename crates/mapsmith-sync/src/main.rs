//! mapsmith CLI
//!
//! Command-line tool for reconciling mapper interfaces with xml artifacts.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use mapsmith_sync::pipeline::project_root;
use mapsmith_sync::prelude::*;

/// Generated-region reconciliation for mapper xml.
#[derive(Parser)]
#[command(name = "mapsmith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Options file (JSON).
    #[arg(short, long, env = "MAPSMITH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diff interfaces against artifacts without writing anything.
    Check {
        /// Interface manifest (JSON).
        #[arg(short, long, env = "MAPSMITH_MANIFEST", default_value = "mappers.json")]
        manifest: PathBuf,

        /// Artifact directory override.
        #[arg(short, long)]
        xml_dir: Option<String>,

        /// Override fail-on-missing (true/false).
        #[arg(long)]
        fail_on_missing: Option<String>,

        /// Override fail-on-orphan (true/false).
        #[arg(long)]
        fail_on_orphan: Option<String>,

        /// Database product name for dialect sniffing.
        #[arg(short, long, env = "MAPSMITH_PRODUCT")]
        product: Option<String>,
    },

    /// Patch artifacts: stub missing statements, annotate orphans.
    Sync {
        /// Interface manifest (JSON).
        #[arg(short, long, env = "MAPSMITH_MANIFEST", default_value = "mappers.json")]
        manifest: PathBuf,

        /// Artifact directory override.
        #[arg(short, long)]
        xml_dir: Option<String>,

        /// Override fail-on-missing (true/false).
        #[arg(long)]
        fail_on_missing: Option<String>,

        /// Override fail-on-orphan (true/false).
        #[arg(long)]
        fail_on_orphan: Option<String>,

        /// Consent to writing files.
        #[arg(long)]
        allow_write: bool,

        /// Database product name for dialect sniffing.
        #[arg(short, long, env = "MAPSMITH_PRODUCT")]
        product: Option<String>,

        /// Schema snapshot (JSON); enables statement synthesis for
        /// namespaces the snapshot covers.
        #[arg(short, long, env = "MAPSMITH_SNAPSHOT")]
        snapshot: Option<PathBuf>,

        /// Namespace prefix matching snapshot tables to mapper namespaces.
        #[arg(long, default_value = "mapper")]
        namespace_prefix: String,
    },

    /// Create or reconcile entity sources from a schema snapshot.
    Entities {
        /// Schema snapshot (JSON).
        #[arg(short, long, env = "MAPSMITH_SNAPSHOT", default_value = "schema.json")]
        snapshot: PathBuf,

        /// Directory for struct sources.
        #[arg(short, long)]
        entity_dir: Option<String>,

        /// Directory for companion artifact skeletons.
        #[arg(short, long)]
        xml_dir: Option<String>,

        /// Namespace prefix for companion artifacts.
        #[arg(short, long)]
        namespace_prefix: Option<String>,

        /// Consent to writing files.
        #[arg(long)]
        allow_write: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut options = match &cli.config {
        Some(path) => SyncOptions::load(path)?,
        None => SyncOptions::default(),
    };
    if cli.verbose {
        options.debug = true;
    }

    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Check {
            manifest,
            xml_dir,
            fail_on_missing,
            fail_on_orphan,
            product,
        } => {
            apply_overrides(
                &mut options,
                xml_dir,
                fail_on_missing.as_deref(),
                fail_on_orphan.as_deref(),
            )?;

            let interfaces = load_manifest(&manifest)?;
            let registry = SchemaRegistry::default();
            let pipeline = Pipeline::new(&options, &registry, product, cwd);

            let diff = pipeline.check(&interfaces)?;
            report_diff(&diff, &options)?;
            info!("check passed");
        }

        Commands::Sync {
            manifest,
            xml_dir,
            fail_on_missing,
            fail_on_orphan,
            allow_write,
            product,
            snapshot,
            namespace_prefix,
        } => {
            apply_overrides(
                &mut options,
                xml_dir,
                fail_on_missing.as_deref(),
                fail_on_orphan.as_deref(),
            )?;
            options.generate_missing = true;
            if allow_write {
                options.allow_write = true;
            }

            let interfaces = load_manifest(&manifest)?;
            let mut product = product;
            let registry = match &snapshot {
                Some(path) => {
                    let snapshot = SchemaSnapshot::load(path)?;
                    if product.is_none() {
                        product.clone_from(&snapshot.product_name);
                    }
                    SchemaRegistry::from_snapshot(&snapshot, &namespace_prefix)?
                }
                None => SchemaRegistry::default(),
            };
            let pipeline = Pipeline::new(&options, &registry, product, cwd);

            let report = pipeline.sync(&interfaces)?;
            if report.write_skipped {
                warn!("writes refused, run was report-only (pass --allow-write)");
            }
            for (namespace, path) in &report.patched {
                println!("patched {namespace} -> {}", path.display());
            }
            if report.patched.is_empty() && !report.write_skipped {
                info!("nothing to patch");
            }
        }

        Commands::Entities {
            snapshot,
            entity_dir,
            xml_dir,
            namespace_prefix,
            allow_write,
        } => {
            let mut entity_options = EntityOptions::default();
            if let Some(dir) = entity_dir {
                entity_options.entity_dir = dir;
            }
            if let Some(dir) = xml_dir {
                entity_options.xml_dir = dir;
            }
            if let Some(prefix) = namespace_prefix {
                entity_options.namespace_prefix = prefix;
            }

            let root = project_root(&cwd);
            let entity_target = root.join(&entity_options.entity_dir);
            let xml_target = root.join(&entity_options.xml_dir);
            let gate = WriteGate::new(true, allow_write);
            if !gate.confirm(&root, &[&entity_target, &xml_target]) {
                warn!("writes refused, nothing generated (pass --allow-write)");
                return Ok(());
            }

            let snapshot = SchemaSnapshot::load(&snapshot)?;
            let report = sync_entities(&snapshot, &entity_options, &root)?;
            for path in &report.created {
                println!("created {}", path.display());
            }
            for path in &report.updated {
                println!("updated {}", path.display());
            }
            for path in &report.artifacts_created {
                println!("created {}", path.display());
            }
            info!(
                created = report.created.len(),
                updated = report.updated.len(),
                artifacts = report.artifacts_created.len(),
                "entity sync finished"
            );
        }
    }

    Ok(())
}

fn apply_overrides(
    options: &mut SyncOptions,
    xml_dir: Option<String>,
    fail_on_missing: Option<&str>,
    fail_on_orphan: Option<&str>,
) -> Result<()> {
    if let Some(dir) = xml_dir {
        options.xml_dir = mapsmith_sync::config::normalize_xml_dir(&dir);
    }
    options.fail_on_missing =
        parse_bool_strict("fail-on-missing", fail_on_missing, options.fail_on_missing)?;
    options.fail_on_orphan =
        parse_bool_strict("fail-on-orphan", fail_on_orphan, options.fail_on_orphan)?;
    Ok(())
}

/// Prints the diff and applies the severity policy.
fn report_diff(diff: &DiffResult, options: &SyncOptions) -> anyhow::Result<()> {
    if diff.is_clean() {
        return Ok(());
    }

    if !diff.missing.is_empty() {
        let msg = if options.debug {
            diff.format_missing_detailed(50)
        } else {
            diff.format_missing(5)
        };
        if options.fail_on_missing {
            anyhow::bail!(msg);
        }
        warn!("{msg}");
    }

    if !diff.orphan.is_empty() {
        let msg = if options.debug {
            diff.format_orphan_detailed(50)
        } else {
            diff.format_orphan(5)
        };
        if options.fail_on_orphan {
            anyhow::bail!(msg);
        }
        warn!("{msg}");
    }

    Ok(())
}
