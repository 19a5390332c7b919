//! Write-enablement gate for destructive-capable file generation.
//!
//! Writes require the feature flag, explicit consent, a clearly-development
//! checkout (a `.git` directory at the project root), and a successful write
//! probe against each target directory. A refusal is a logged skip, never an
//! error; the pipeline falls back to report-only mode.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

/// Gate inputs.
#[derive(Debug, Clone, Copy)]
pub struct WriteGate {
    /// The generation feature is switched on.
    pub feature_enabled: bool,
    /// The operator explicitly allowed writes.
    pub allow_write: bool,
}

impl WriteGate {
    /// Creates a gate from the two consent flags.
    #[must_use]
    pub const fn new(feature_enabled: bool, allow_write: bool) -> Self {
        Self {
            feature_enabled,
            allow_write,
        }
    }

    /// True when every condition holds: both flags, a development checkout,
    /// and writable target directories.
    #[must_use]
    pub fn confirm(&self, project_root: &Path, targets: &[&Path]) -> bool {
        if !self.feature_enabled {
            debug!("write gate: generation feature disabled");
            return false;
        }
        if !self.allow_write {
            warn!("write gate: allow-write not set, running report-only");
            return false;
        }
        if !is_dev_checkout(project_root) {
            warn!(
                root = %project_root.display(),
                "write gate: no .git directory at project root, refusing to write"
            );
            return false;
        }
        for target in targets {
            if !probe_writable(target) {
                warn!(target = %target.display(), "write gate: target is not writable");
                return false;
            }
        }
        true
    }
}

fn is_dev_checkout(project_root: &Path) -> bool {
    project_root.join(".git").is_dir()
}

/// Verifies writability with a real create-and-delete probe, not just a
/// metadata check.
fn probe_writable(dir: &Path) -> bool {
    if fs::create_dir_all(dir).is_err() {
        return false;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.subsec_nanos());
    let probe = dir.join(format!(".mapsmith-probe-{nanos}"));
    match fs::write(&probe, b"probe") {
        Ok(()) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}
