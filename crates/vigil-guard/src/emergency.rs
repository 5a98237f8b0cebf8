//! Fall-damage override: the liquid clutch.
//!
//! A single condition is watched: the avatar is airborne, falling faster
//! than the trigger velocity, and the computed drop to the surface below
//! strictly exceeds the configured height.  When it holds, the manager
//! switches to a placeable liquid-source item and places it two cells below
//! the avatar so the landing surface is liquid.  This check runs before the
//! planner each cycle and a trigger short-circuits the rest of the cycle.

use std::time::{Duration, Instant};

use tracing::{debug, info};
use vigil_types::{BlockPos, Orientation, Vec3};
use vigil_world::{QUICK_SLOTS, WorldLink};

/// Minimum spacing between two clutch attempts.
const CLUTCH_COOLDOWN: Duration = Duration::from_secs(5);

/// Downward velocity beyond which a fall is considered dangerous.
const FALL_TRIGGER_VELOCITY: f64 = -0.5;

/// How far below the avatar the liquid is placed.
const PLACE_DEPTH: i32 = 2;

/// Per-cycle settings for the override, read from the agent config.
#[derive(Debug, Clone, Copy)]
pub struct EmergencySettings {
    pub enabled: bool,
    /// Drop distance (in cells) above which the clutch fires.
    pub clutch_height: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// EmergencyManager
// ────────────────────────────────────────────────────────────────────────────

/// Watches for dangerous falls and performs the liquid clutch.
pub struct EmergencyManager {
    clutch_in_progress: bool,
    last_clutch: Option<Instant>,
}

impl Default for EmergencyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EmergencyManager {
    pub fn new() -> Self {
        Self {
            clutch_in_progress: false,
            last_clutch: None,
        }
    }

    /// Run the override check for this cycle.  Returns `true` when a clutch
    /// was initiated, in which case the caller must skip the rest of the
    /// cycle.
    pub fn check(&mut self, link: &mut dyn WorldLink, settings: EmergencySettings) -> bool {
        if !settings.enabled || !link.connected() {
            return false;
        }
        // A completed landing ends the clutch; the cooldown below remains the
        // effective rate limit.
        if self.clutch_in_progress && link.on_ground() {
            self.clutch_in_progress = false;
        }
        if !self.falling_dangerously(link, settings.clutch_height) {
            return false;
        }
        self.perform_clutch(link)
    }

    pub fn clutch_in_progress(&self) -> bool {
        self.clutch_in_progress
    }

    fn falling_dangerously(&self, link: &dyn WorldLink, clutch_height: f64) -> bool {
        if link.on_ground() || link.velocity().y >= FALL_TRIGGER_VELOCITY {
            return false;
        }
        let pos = link.position();
        match surface_below(link, pos) {
            Some(ground) => {
                let drop = pos.y - f64::from(ground.y);
                drop > clutch_height
            }
            None => false,
        }
    }

    fn perform_clutch(&mut self, link: &mut dyn WorldLink) -> bool {
        if self.clutch_in_progress {
            return false;
        }
        if let Some(last) = self.last_clutch {
            if last.elapsed() < CLUTCH_COOLDOWN {
                return false;
            }
        }

        // The liquid source has to be in the quick-access row to be held.
        let Some(slot) = (0..QUICK_SLOTS).find(|&i| {
            link.inventory_slot(i)
                .is_some_and(|s| s.item.is_liquid_source())
        }) else {
            debug!("dangerous fall but no liquid source in the quick-access row");
            return false;
        };
        if link.select_slot(slot).is_err() {
            return false;
        }

        let pos = link.position();
        let yaw = link.orientation().yaw;
        // Face straight down, keep the heading.
        link.set_orientation(Orientation::new(yaw, 90.0));

        let place_pos = BlockPos::containing(pos).offset(0, -PLACE_DEPTH, 0);
        link.place_held_at(place_pos);

        self.clutch_in_progress = true;
        self.last_clutch = Some(Instant::now());
        info!(?place_pos, "liquid clutch placed");
        true
    }
}

/// Highest non-air cell at or below `pos`, scanning down to the world floor.
fn surface_below(link: &dyn WorldLink, pos: Vec3) -> Option<BlockPos> {
    let column = BlockPos::containing(pos);
    let mut y = column.y;
    while y > link.bottom_y() {
        let candidate = BlockPos::new(column.x, y, column.z);
        if !link.block(candidate).is_air() {
            return Some(candidate);
        }
        y -= 1;
    }
    None
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::{Block, Item, ItemStack};
    use vigil_world::sim::{ActionRecord, SimLink};

    const SETTINGS: EmergencySettings = EmergencySettings {
        enabled: true,
        clutch_height: 10.0,
    };

    /// Avatar free-falling over a stone floor at y = 0, bucket in slot 0.
    fn falling_link(avatar_y: f64) -> SimLink {
        let mut link = SimLink::builder()
            .with_block(BlockPos::new(0, 0, 0), Block::Stone)
            .with_item(0, ItemStack::new(Item::WaterBucket, 1))
            .with_position(Vec3::new(0.5, avatar_y, 0.5))
            .build();
        link.set_on_ground(false);
        link.set_fall_velocity(Vec3::new(0.0, -0.8, 0.0));
        link
    }

    #[test]
    fn clutch_fires_above_threshold() {
        let mut link = falling_link(11.0);
        let mut mgr = EmergencyManager::new();
        assert!(mgr.check(&mut link, SETTINGS));
        assert!(mgr.clutch_in_progress());
        // Placed two cells below the avatar, facing straight down.
        assert!(link.actions().contains(&ActionRecord::PlaceHeldAt(BlockPos::new(0, 9, 0))));
        assert!(
            link.actions()
                .iter()
                .any(|a| matches!(a, ActionRecord::SetOrientation(o) if (o.pitch - 90.0).abs() < 1e-5))
        );
    }

    #[test]
    fn drop_exactly_at_threshold_does_not_trigger() {
        // Surface block y = 0, avatar y = 10.0: drop is exactly 10.
        let mut link = falling_link(10.0);
        let mut mgr = EmergencyManager::new();
        assert!(!mgr.check(&mut link, SETTINGS));
    }

    #[test]
    fn slow_descent_does_not_trigger() {
        let mut link = falling_link(15.0);
        link.set_fall_velocity(Vec3::new(0.0, -0.3, 0.0));
        let mut mgr = EmergencyManager::new();
        assert!(!mgr.check(&mut link, SETTINGS));
    }

    #[test]
    fn grounded_avatar_does_not_trigger() {
        let mut link = falling_link(15.0);
        link.set_on_ground(true);
        let mut mgr = EmergencyManager::new();
        assert!(!mgr.check(&mut link, SETTINGS));
    }

    #[test]
    fn no_liquid_source_means_no_clutch() {
        let mut link = falling_link(15.0);
        link.set_inventory_slot(0, None);
        let mut mgr = EmergencyManager::new();
        assert!(!mgr.check(&mut link, SETTINGS));
        assert!(link.actions().is_empty());
    }

    #[test]
    fn liquid_source_outside_quick_row_is_unreachable() {
        let mut link = falling_link(15.0);
        link.set_inventory_slot(0, None);
        link.set_inventory_slot(20, Some(ItemStack::new(Item::WaterBucket, 1)));
        let mut mgr = EmergencyManager::new();
        assert!(!mgr.check(&mut link, SETTINGS));
    }

    #[test]
    fn second_clutch_within_cooldown_is_suppressed() {
        let mut link = falling_link(20.0);
        let mut mgr = EmergencyManager::new();
        assert!(mgr.check(&mut link, SETTINGS));

        // Landed, then falling again right away.
        link.set_on_ground(true);
        mgr.check(&mut link, SETTINGS);
        link.set_on_ground(false);
        assert!(!mgr.check(&mut link, SETTINGS));
    }

    #[test]
    fn clutch_rearms_after_cooldown_and_landing() {
        let mut link = falling_link(20.0);
        let mut mgr = EmergencyManager::new();
        assert!(mgr.check(&mut link, SETTINGS));

        link.set_on_ground(true);
        mgr.check(&mut link, SETTINGS);
        link.set_on_ground(false);

        // Backdating the last clutch simulates the 5 s window expiring.
        mgr.last_clutch = Some(Instant::now() - CLUTCH_COOLDOWN - Duration::from_millis(1));
        assert!(mgr.check(&mut link, SETTINGS));
    }

    #[test]
    fn disabled_override_never_triggers() {
        let mut link = falling_link(20.0);
        let mut mgr = EmergencyManager::new();
        let settings = EmergencySettings {
            enabled: false,
            clutch_height: 10.0,
        };
        assert!(!mgr.check(&mut link, settings));
    }
}
