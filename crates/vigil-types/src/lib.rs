//! `vigil-types` – shared leaf types for the vigil workspace.
//!
//! Everything in here is plain data: world geometry ([`Vec3`], [`BlockPos`],
//! [`Orientation`]), entity references ([`EntityId`], [`EntitySnapshot`]),
//! the per-cycle [`Decision`], the learned-motion data model
//! ([`MovementStep`], [`MovementPattern`]) and the shared error type
//! [`VigilError`].  The closed item/block catalog lives in [`catalog`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod catalog;

pub use catalog::{Block, EquipmentSlot, Item, ItemStack, OreKind, ToolKind, ToolMaterial};

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

/// A 3-component vector in world space (the world uses `f64` positions).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, factor: f64) -> Vec3 {
        Vec3::new(self.x * factor, self.y * factor, self.z * factor)
    }

    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction, or [`Vec3::ZERO`] for a zero vector.
    pub fn normalize(self) -> Vec3 {
        let len = self.length();
        if len < 1e-9 { Vec3::ZERO } else { self.scale(1.0 / len) }
    }

    pub fn distance_to(self, other: Vec3) -> f64 {
        other.sub(self).length()
    }
}

/// Integer cell coordinates in the block grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The cell that contains a continuous position.
    pub fn containing(pos: Vec3) -> Self {
        Self::new(
            pos.x.floor() as i32,
            pos.y.floor() as i32,
            pos.z.floor() as i32,
        )
    }

    /// Centre of the cell in world space.
    pub fn center(self) -> Vec3 {
        Vec3::new(
            f64::from(self.x) + 0.5,
            f64::from(self.y) + 0.5,
            f64::from(self.z) + 0.5,
        )
    }

    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn up(self) -> Self {
        self.offset(0, 1, 0)
    }

    pub fn down(self) -> Self {
        self.offset(0, -1, 0)
    }

    /// The six face-adjacent cells.
    pub fn neighbors(self) -> [BlockPos; 6] {
        [
            self.offset(1, 0, 0),
            self.offset(-1, 0, 0),
            self.offset(0, 1, 0),
            self.offset(0, -1, 0),
            self.offset(0, 0, 1),
            self.offset(0, 0, -1),
        ]
    }
}

/// View angles in degrees.  Yaw is measured in the horizontal plane, pitch is
/// positive looking down (90° = straight down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub yaw: f32,
    pub pitch: f32,
}

/// Wrap an angle difference into `[-180, 180]` degrees.
pub fn wrap_degrees(mut angle: f32) -> f32 {
    if angle.is_nan() {
        return 0.0;
    }
    while angle > 180.0 {
        angle -= 360.0;
    }
    while angle < -180.0 {
        angle += 360.0;
    }
    angle
}

impl Orientation {
    pub const fn new(yaw: f32, pitch: f32) -> Self {
        Self { yaw, pitch }
    }

    /// The orientation that looks from `eye` toward `target`.
    pub fn looking_at(eye: Vec3, target: Vec3) -> Self {
        let dir = target.sub(eye).normalize();
        let yaw = (dir.x.atan2(dir.z)).to_degrees() as f32;
        let pitch = ((-dir.y).asin()).to_degrees() as f32;
        Self { yaw, pitch }
    }

    /// Move a fraction of the way toward `target`, taking the short way round
    /// on yaw.  `factor` of 1.0 snaps, 0.0 stays put.
    pub fn approach(self, target: Orientation, factor: f32) -> Self {
        let yaw_diff = wrap_degrees(target.yaw - self.yaw);
        let pitch_diff = target.pitch - self.pitch;
        Self {
            yaw: self.yaw + yaw_diff * factor,
            pitch: (self.pitch + pitch_diff * factor).clamp(-90.0, 90.0),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Entities
// ────────────────────────────────────────────────────────────────────────────

/// Stable reference to an entity in the connected world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Coarse classification of an observed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// A mob that will attack the avatar.
    Hostile,
    /// Another player's avatar.
    Player,
    Other,
}

/// One entity as seen by a vicinity scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec3,
    pub alive: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Decision
// ────────────────────────────────────────────────────────────────────────────

/// The single decision the planner emits each cycle.  Transient, never
/// persisted; each variant carries only what its state needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Idle,
    Exploring { target: BlockPos },
    Combat { target: EntityId },
    Eating,
    Chest { pos: BlockPos },
    Furnace { pos: BlockPos },
    Mining { pos: BlockPos },
}

impl Decision {
    /// Block target to walk toward, for the variants that carry one.
    pub fn target_pos(&self) -> Option<BlockPos> {
        match self {
            Decision::Exploring { target } => Some(*target),
            Decision::Chest { pos } | Decision::Furnace { pos } | Decision::Mining { pos } => {
                Some(*pos)
            }
            _ => None,
        }
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Idle => "idle",
            Decision::Exploring { .. } => "exploring",
            Decision::Combat { .. } => "combat",
            Decision::Eating => "eating",
            Decision::Chest { .. } => "chest",
            Decision::Furnace { .. } => "furnace",
            Decision::Mining { .. } => "mining",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Movement patterns
// ────────────────────────────────────────────────────────────────────────────

/// Maximum steps kept per pattern; older steps slide out.
pub const MAX_PATTERN_STEPS: usize = 100;

/// One recorded motion sample: the displacement since the previous sample
/// plus the view angles and movement flags at sample time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementStep {
    pub delta: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub airborne: bool,
    pub sprinting: bool,
    /// Milliseconds elapsed since the previous step.
    pub time_delta_ms: u64,
}

/// An ordered motion trace, capped at [`MAX_PATTERN_STEPS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementPattern {
    pub steps: Vec<MovementStep>,
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
}

impl Default for MovementPattern {
    fn default() -> Self {
        Self::new()
    }
}

impl MovementPattern {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            recorded_at: Utc::now(),
        }
    }

    /// Append a step, dropping the oldest one once the cap is reached.
    pub fn push_step(&mut self, step: MovementStep) {
        self.steps.push(step);
        if self.steps.len() > MAX_PATTERN_STEPS {
            self.steps.remove(0);
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Errors shared across the workspace.  Almost everything in the core
/// degrades silently instead of failing; these exist for the few operations
/// that can be meaningfully refused.
#[derive(Error, Debug)]
pub enum VigilError {
    #[error("slot index {0} is outside the quick-access row")]
    SlotOutOfRange(usize),

    #[error("world link is not connected")]
    Disconnected,
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
