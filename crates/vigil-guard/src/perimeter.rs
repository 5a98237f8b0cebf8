//! Persisted geofence gating automated container access.
//!
//! The perimeter is recorded as a walked sequence of points; finishing the
//! recording derives an axis-aligned bounding box as the component-wise
//! min/max over all points (not a hull).  Two independent allow-lists sit on
//! top: explicitly authorized positions and self-placed container positions.
//! Allow-list membership is stronger than box containment and works without
//! any box at all.
//!
//! # Storage layout
//!
//! One flat JSON document, rewritten wholesale on every mutating command:
//!
//! | field         | contents                                   |
//! |---------------|--------------------------------------------|
//! | `points`      | recorded perimeter points, in walk order   |
//! | `self_placed` | container positions placed by the avatar   |
//! | `authorized`  | explicitly authorized container positions  |
//! | `min_corner`  | derived box minimum (absent until finish)  |
//! | `max_corner`  | derived box maximum (absent until finish)  |
//!
//! A missing or malformed file loads as empty defaults with a logged error.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use vigil_types::BlockPos;

/// Errors from perimeter persistence.
#[derive(Error, Debug)]
pub enum PerimeterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GeofenceDoc {
    #[serde(default)]
    points: Vec<BlockPos>,
    #[serde(default)]
    self_placed: HashSet<BlockPos>,
    #[serde(default)]
    authorized: HashSet<BlockPos>,
    #[serde(default)]
    min_corner: Option<BlockPos>,
    #[serde(default)]
    max_corner: Option<BlockPos>,
}

// ────────────────────────────────────────────────────────────────────────────
// BasePerimeter
// ────────────────────────────────────────────────────────────────────────────

/// Geofence plus allow-lists, persisted to a single JSON document.
///
/// # Example
///
/// ```rust
/// use vigil_guard::BasePerimeter;
/// use vigil_types::BlockPos;
///
/// let mut perimeter = BasePerimeter::in_memory();
/// perimeter.start_recording();
/// perimeter.add_point(BlockPos::new(0, 0, 0));
/// perimeter.add_point(BlockPos::new(10, 5, 10));
/// perimeter.finish_recording();
///
/// assert!(perimeter.can_interact(BlockPos::new(5, 2, 5)));
/// assert!(!perimeter.can_interact(BlockPos::new(11, 2, 5)));
/// ```
pub struct BasePerimeter {
    points: Vec<BlockPos>,
    self_placed: HashSet<BlockPos>,
    authorized: HashSet<BlockPos>,
    min_corner: Option<BlockPos>,
    max_corner: Option<BlockPos>,
    recording: bool,
    path: Option<PathBuf>,
}

impl BasePerimeter {
    /// Open the perimeter backed by a JSON document at `path`.  A missing
    /// file starts empty; a malformed one is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let doc = match Self::load_doc(&path) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load geofence; starting empty");
                GeofenceDoc::default()
            }
        };
        Self {
            points: doc.points,
            self_placed: doc.self_placed,
            authorized: doc.authorized,
            min_corner: doc.min_corner,
            max_corner: doc.max_corner,
            recording: false,
            path: Some(path),
        }
    }

    /// A perimeter with no backing file; saves are no-ops.
    pub fn in_memory() -> Self {
        Self {
            points: Vec::new(),
            self_placed: HashSet::new(),
            authorized: HashSet::new(),
            min_corner: None,
            max_corner: None,
            recording: false,
            path: None,
        }
    }

    // ── Recording commands ───────────────────────────────────────────────────

    /// Begin a fresh recording, clearing any previously recorded points.
    pub fn start_recording(&mut self) {
        self.recording = true;
        self.points.clear();
        info!("perimeter recording started");
    }

    /// Append a point to the recording in progress.  Returns the running
    /// point count, or `None` when no recording is active.
    pub fn add_point(&mut self, pos: BlockPos) -> Option<usize> {
        if !self.recording {
            return None;
        }
        self.points.push(pos);
        Some(self.points.len())
    }

    /// Finish the recording: derive the bounding box and persist.  Returns
    /// the derived box, or `None` when no recording was active or no points
    /// were recorded.
    pub fn finish_recording(&mut self) -> Option<(BlockPos, BlockPos)> {
        if !self.recording {
            return None;
        }
        self.recording = false;
        if let Some(first) = self.points.first().copied() {
            let mut min = first;
            let mut max = first;
            for p in &self.points {
                min = BlockPos::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
                max = BlockPos::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
            }
            self.min_corner = Some(min);
            self.max_corner = Some(max);
            info!(?min, ?max, "perimeter recorded");
        }
        self.persist();
        self.bounds()
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    // ── Allow-lists ──────────────────────────────────────────────────────────

    /// Authorize a container position regardless of the box.
    pub fn mark_authorized(&mut self, pos: BlockPos) {
        self.authorized.insert(pos);
        self.persist();
    }

    /// Record a container the avatar placed itself.
    pub fn record_self_placed(&mut self, pos: BlockPos) {
        self.self_placed.insert(pos);
        self.persist();
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    /// `true` iff `pos` is on either allow-list, or the bounding box exists
    /// and contains it (inclusive on all axes).
    pub fn can_interact(&self, pos: BlockPos) -> bool {
        self.authorized.contains(&pos)
            || self.self_placed.contains(&pos)
            || self.contains(pos)
    }

    /// Inclusive containment in the derived box; always `false` before a
    /// finish-perimeter call.
    pub fn contains(&self, pos: BlockPos) -> bool {
        match (self.min_corner, self.max_corner) {
            (Some(min), Some(max)) => {
                pos.x >= min.x
                    && pos.x <= max.x
                    && pos.y >= min.y
                    && pos.y <= max.y
                    && pos.z >= min.z
                    && pos.z <= max.z
            }
            _ => false,
        }
    }

    pub fn bounds(&self) -> Option<(BlockPos, BlockPos)> {
        self.min_corner.zip(self.max_corner)
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    fn load_doc(path: &Path) -> Result<GeofenceDoc, PerimeterError> {
        if !path.exists() {
            return Ok(GeofenceDoc::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Rewrite the whole document.  Failures are logged and the in-memory
    /// state keeps going unsaved.
    fn persist(&self) {
        if let Err(e) = self.save() {
            warn!(error = %e, "failed to save geofence; continuing unsaved");
        }
    }

    fn save(&self) -> Result<(), PerimeterError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let doc = GeofenceDoc {
            points: self.points.clone(),
            self_placed: self.self_placed.clone(),
            authorized: self.authorized.clone(),
            min_corner: self.min_corner,
            max_corner: self.max_corner,
        };
        fs::write(path, serde_json::to_string(&doc)?)?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
