//! Top-level directory validation.
//!
//! The first non-hidden regular-file entry of an archive establishes its
//! top-level directory, which doubles as the dataset identifier after
//! dash-to-underscore normalization. The check runs exactly once per
//! archive; once locked, later entries pass through unvalidated.

use std::sync::LazyLock;

use regex::Regex;

use datalift_core::DatasetDir;

static DATE_DIR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}_\d{2}_\d{2}$").expect("date pattern is valid"));

/// Decision for one regular-file entry path, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Directory already locked; the entry passes through.
    Pass,
    /// Hidden entry seen before any directory is locked; hold it back until
    /// the archive is accepted.
    Hold,
    /// This entry just locked the directory.
    Locked(DatasetDir),
    /// The derived directory failed the date check; the whole archive is
    /// rejected.
    Rejected { normalized: String },
}

/// Validation state for one archive, explicit rather than closed over.
#[derive(Debug, Default)]
pub struct DirectoryGate {
    locked: Option<DatasetDir>,
}

impl DirectoryGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locked(&self) -> Option<&DatasetDir> {
        self.locked.as_ref()
    }

    pub fn into_locked(self) -> Option<DatasetDir> {
        self.locked
    }

    /// Observe a regular-file entry path in arrival order. Non-regular
    /// entries must be skipped by the caller; they do not affect this state.
    pub fn observe_file(&mut self, path: &str) -> GateDecision {
        if self.locked.is_some() {
            return GateDecision::Pass;
        }

        if path.starts_with('.') {
            return GateDecision::Hold;
        }

        let original = match path.split('/').next() {
            Some(segment) if !segment.is_empty() => segment,
            _ => path,
        };
        let normalized = original.replace('-', "_");

        if !DATE_DIR_PATTERN.is_match(&normalized) {
            return GateDecision::Rejected { normalized };
        }

        let dir = DatasetDir {
            normalized,
            original: original.to_string(),
        };
        self.locked = Some(dir.clone());
        GateDecision::Locked(dir)
    }
}
