//! Committed movement-pattern store.
//!
//! Holds the learned patterns in commit order, evicting the oldest once the
//! cap is reached (FIFO), and persists the whole set as one JSON document –
//! a bare array of patterns, each an ordered array of steps.  A missing file
//! loads as an empty library; a malformed one is logged and treated as
//! empty.  There is no schema versioning.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};
use vigil_types::MovementPattern;

/// Committed patterns kept at most; the oldest is evicted first.
pub const MAX_PATTERNS: usize = 50;

/// Errors from pattern persistence.
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ────────────────────────────────────────────────────────────────────────────
// PatternLibrary
// ────────────────────────────────────────────────────────────────────────────

/// FIFO-capped set of committed [`MovementPattern`]s with flat-JSON
/// persistence.
///
/// # Example
///
/// ```rust
/// use vigil_memory::PatternLibrary;
/// use vigil_types::MovementPattern;
///
/// let mut library = PatternLibrary::in_memory();
/// library.commit(MovementPattern::new());
/// assert_eq!(library.len(), 1);
/// ```
pub struct PatternLibrary {
    patterns: Vec<MovementPattern>,
    path: Option<PathBuf>,
}

impl PatternLibrary {
    /// Open the library backed by a JSON document at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let patterns = match Self::load_doc(&path) {
            Ok(patterns) => patterns,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load movement patterns; starting empty");
                Vec::new()
            }
        };
        Self {
            patterns,
            path: Some(path),
        }
    }

    /// A library with no backing file; saves are no-ops.
    pub fn in_memory() -> Self {
        Self {
            patterns: Vec::new(),
            path: None,
        }
    }

    /// Commit a pattern, evicting the oldest entries past [`MAX_PATTERNS`]
    /// and rewriting the document.  The caller is responsible for the
    /// minimum-length check.
    pub fn commit(&mut self, pattern: MovementPattern) {
        debug!(steps = pattern.len(), "committing movement pattern");
        self.patterns.push(pattern);
        while self.patterns.len() > MAX_PATTERNS {
            self.patterns.remove(0);
        }
        if let Err(e) = self.save() {
            warn!(error = %e, "failed to save movement patterns; continuing unsaved");
        }
    }

    /// A uniformly random committed pattern, or `None` when empty.
    pub fn random(&self, rng: &mut impl Rng) -> Option<&MovementPattern> {
        if self.patterns.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.patterns.len());
        self.patterns.get(index)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Commit time of the newest pattern, for status displays.
    pub fn latest_recorded_at(&self) -> Option<DateTime<Utc>> {
        self.patterns.iter().map(|p| p.recorded_at).max()
    }

    /// Oldest committed pattern, in commit order.  Exposed for tests and
    /// diagnostics.
    pub fn oldest(&self) -> Option<&MovementPattern> {
        self.patterns.first()
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    fn load_doc(path: &Path) -> Result<Vec<MovementPattern>, PatternError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self) -> Result<(), PatternError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string(&self.patterns)?)?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
