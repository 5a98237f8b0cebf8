//! Locomotion synthesis.
//!
//! Produces one velocity/orientation update per call, with enough noise and
//! speed variation to read as a human at the controls: direction jitter,
//! walk/run mixing, diagonal damping, obstacle hops and smoothed view angles
//! that never snap.

use std::time::{Duration, Instant};

use rand::Rng;
use rand::rngs::SmallRng;
use vigil_types::{BlockPos, Orientation, Vec3};
use vigil_world::WorldLink;

/// Close enough: stop within this distance of the target centre.
const STOP_DISTANCE: f64 = 1.5;
/// Per-axis uniform noise added to the travel direction.
const DIRECTION_NOISE: f64 = 0.05;
const WALK_SPEED: f64 = 0.15;
const RUN_SPEED: f64 = 0.3;
const RUN_CHANCE: f64 = 0.6;
/// Occasional sprint-jump impulse while travelling.
const SPRINT_JUMP_CHANCE: f64 = 0.1;
const SPRINT_JUMP_BOOST: f64 = 1.5;
/// Diagonal travel is damped to keep speeds plausible.
const DIAGONAL_FACTOR: f64 = 0.8;
/// Fraction of the remaining view-angle error corrected per call.
const ROTATION_FACTOR: f32 = 0.1;
/// A move call this recent means the controller is actively steering.
const MOVE_ACTIVE_WINDOW: Duration = Duration::from_millis(100);

const WANDER_STAND_STILL_CHANCE: f64 = 0.3;
const WANDER_JUMP_CHANCE: f64 = 0.2;

// ────────────────────────────────────────────────────────────────────────────
// MovementController
// ────────────────────────────────────────────────────────────────────────────

/// Synthesizes per-call velocity and orientation toward a goal, or wanders.
pub struct MovementController {
    rng: SmallRng,
    moving: bool,
    last_move: Option<Instant>,
}

impl MovementController {
    pub fn new(rng: SmallRng) -> Self {
        Self {
            rng,
            moving: false,
            last_move: None,
        }
    }

    /// One steering step toward the centre of `target`.  Stops inside
    /// [`STOP_DISTANCE`].
    pub fn move_towards(&mut self, link: &mut dyn WorldLink, target: BlockPos) {
        if !link.connected() {
            return;
        }
        let position = link.position();
        let target_center = target.center();
        if position.distance_to(target_center) < STOP_DISTANCE {
            self.stop(link);
            return;
        }

        let direction = target_center.sub(position).normalize();
        let direction = Vec3::new(
            direction.x + self.rng.gen_range(-DIRECTION_NOISE..DIRECTION_NOISE),
            direction.y,
            direction.z + self.rng.gen_range(-DIRECTION_NOISE..DIRECTION_NOISE),
        )
        .normalize();

        let mut speed = if self.rng.gen_bool(RUN_CHANCE) {
            RUN_SPEED
        } else {
            WALK_SPEED
        };
        if self.rng.gen_bool(SPRINT_JUMP_CHANCE) && link.on_ground() {
            link.jump();
            speed *= SPRINT_JUMP_BOOST;
        }

        let mut velocity = Vec3::new(direction.x * speed, 0.0, direction.z * speed);
        if direction.x.abs() > 0.1 && direction.z.abs() > 0.1 {
            velocity = velocity.scale(DIAGONAL_FACTOR);
        }
        link.set_velocity(velocity);

        self.hop_obstacle(link);
        self.look_towards(link, target_center);

        self.moving = true;
        self.last_move = Some(Instant::now());
    }

    /// Idle wander: mostly reorient or hop in place, sometimes pick a short
    /// trip to a nearby standable cell.
    pub fn random_walk(&mut self, link: &mut dyn WorldLink) {
        if !link.connected() {
            return;
        }
        if self.rng.gen_bool(WANDER_STAND_STILL_CHANCE) {
            self.stand_still(link);
            return;
        }
        if self.rng.gen_bool(WANDER_JUMP_CHANCE) {
            link.jump();
            return;
        }

        let center = link.block_position();
        let range = 8 + self.rng.gen_range(0..16);
        let x = center.x + self.rng.gen_range(-range..=range);
        let z = center.z + self.rng.gen_range(-range..=range);
        let target = resolve_standable(link, x, center.y, z)
            .unwrap_or(BlockPos::new(x, center.y, z));
        self.move_towards(link, target);
    }

    /// Zero the avatar's velocity and leave steering mode.
    pub fn stop(&mut self, link: &mut dyn WorldLink) {
        if link.connected() {
            link.set_velocity(Vec3::ZERO);
        }
        self.moving = false;
    }

    /// `true` only if a move call happened within the last 100 ms.
    pub fn is_moving(&self) -> bool {
        self.moving
            && self
                .last_move
                .is_some_and(|t| t.elapsed() < MOVE_ACTIVE_WINDOW)
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn stand_still(&mut self, link: &mut dyn WorldLink) {
        self.stop(link);
        let current = link.orientation();
        link.set_orientation(Orientation::new(
            current.yaw + self.rng.gen_range(-30.0..30.0),
            self.rng.gen_range(-15.0..15.0),
        ));
    }

    /// Jump when a solid block sits in the walking direction at foot height
    /// with headroom above it.
    fn hop_obstacle(&mut self, link: &mut dyn WorldLink) {
        if !link.on_ground() {
            return;
        }
        let front = link.block_position().offset_facing(link.orientation().yaw);
        if link.block(front).is_solid() && link.block(front.up()).is_traversable() {
            link.jump();
        }
    }

    fn look_towards(&mut self, link: &mut dyn WorldLink, target: Vec3) {
        let mut wanted = Orientation::looking_at(link.eye_position(), target);
        wanted.yaw += self.rng.gen_range(-2.5..2.5);
        wanted.pitch += self.rng.gen_range(-1.5..1.5);
        let next = link.orientation().approach(wanted, ROTATION_FACTOR);
        link.set_orientation(next);
    }
}

/// Walk the column at `(x, ?, z)` from five cells above down to fourteen
/// below, returning the first standable cell: solid footing with two
/// traversable cells of headroom.
fn resolve_standable(link: &dyn WorldLink, x: i32, y: i32, z: i32) -> Option<BlockPos> {
    for check_y in ((y - 14)..=(y + 5)).rev() {
        let footing = BlockPos::new(x, check_y, z);
        if link.block(footing).is_solid()
            && link.block(footing.up()).is_traversable()
            && link.block(footing.offset(0, 2, 0)).is_traversable()
        {
            return Some(footing.up());
        }
    }
    None
}

/// Cardinal cell offset for a yaw angle, quantized to the nearest quarter
/// turn.
trait FacingOffset {
    fn offset_facing(self, yaw: f32) -> BlockPos;
}

impl FacingOffset for BlockPos {
    fn offset_facing(self, yaw: f32) -> BlockPos {
        match ((yaw / 90.0).round() as i32) & 3 {
            0 => self.offset(0, 0, 1),  // south
            1 => self.offset(-1, 0, 0), // west
            2 => self.offset(0, 0, -1), // north
            _ => self.offset(1, 0, 0),  // east
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
