//! Top-level driver: one externally clocked cycle per [`Agent::update`].
//!
//! The agent is the explicit context object for the whole core: it owns the
//! world link, the configuration, every component, both persisted stores and
//! the deferred-task queue, and passes them down by reference.  While
//! toggled off it only feeds idle-motion samples to the learner; while on it
//! lets the emergency override pre-empt, then runs
//! plan → execute → move → automate.

use std::path::Path;

use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::{debug, info, warn};
use vigil_guard::{BasePerimeter, EmergencyManager, EmergencySettings};
use vigil_memory::PatternLibrary;
use vigil_types::{BlockPos, Decision, EntityKind};
use vigil_world::WorldLink;

use crate::automation::AutomationManager;
use crate::config::AgentConfig;
use crate::executor::ActionExecutor;
use crate::learner::MovementLearner;
use crate::movement::MovementController;
use crate::planner::{Planner, scan_volume};
use crate::tasks::TaskQueue;

/// Chance per idle cycle of replaying a learned pattern instead of wandering.
const IDLE_REPLAY_CHANCE: f64 = 0.3;

/// Search box for the mark-chest command.
const MARK_CHEST_RADIUS: i32 = 3;
const MARK_CHEST_VERTICAL: i32 = 2;

// ────────────────────────────────────────────────────────────────────────────
// Agent
// ────────────────────────────────────────────────────────────────────────────

/// The autonomous agent: all components plus the live world link.
pub struct Agent<L: WorldLink> {
    link: L,
    config: AgentConfig,
    planner: Planner,
    executor: ActionExecutor,
    movement: MovementController,
    learner: MovementLearner,
    emergency: EmergencyManager,
    automation: AutomationManager,
    perimeter: BasePerimeter,
    patterns: PatternLibrary,
    queue: TaskQueue,
    rng: SmallRng,
    enabled: bool,
}

impl<L: WorldLink> Agent<L> {
    /// Build the agent.  `data_dir` is where the two persisted documents
    /// live; without one, geofence and patterns stay in memory only.
    pub fn new(link: L, config: AgentConfig, data_dir: Option<&Path>) -> Self {
        let mut rng = config.seeded_rng();

        let (perimeter, patterns) = match data_dir {
            Some(dir) => (
                BasePerimeter::open(dir.join("geofence.json")),
                PatternLibrary::open(dir.join("patterns.json")),
            ),
            None => {
                warn!("no data directory configured; geofence and patterns will not persist");
                (BasePerimeter::in_memory(), PatternLibrary::in_memory())
            }
        };

        let planner = Planner::new(SmallRng::seed_from_u64(rng.next_u64()));
        let executor = ActionExecutor::new(SmallRng::seed_from_u64(rng.next_u64()));
        let movement = MovementController::new(SmallRng::seed_from_u64(rng.next_u64()));
        let mut learner = MovementLearner::new(SmallRng::seed_from_u64(rng.next_u64()));
        let automation = AutomationManager::new(SmallRng::seed_from_u64(rng.next_u64()));

        // The agent starts disabled, observing the operator's own motion.
        learner.start_recording(&link);

        Self {
            link,
            config,
            planner,
            executor,
            movement,
            learner,
            emergency: EmergencyManager::new(),
            automation,
            perimeter,
            patterns,
            queue: TaskQueue::new(),
            rng,
            enabled: false,
        }
    }

    // ── Main cycle ───────────────────────────────────────────────────────────

    /// Advance the agent by one cycle.
    pub fn update(&mut self) {
        // Deferred work runs first and keeps running even while the agent is
        // off; a started sequence is not cancellable.
        self.queue.drain_due(&mut self.link);

        if !self.enabled {
            self.learner.record_sample(&self.link);
            return;
        }
        if !self.link.connected() {
            return;
        }
        self.cycle();
    }

    fn cycle(&mut self) {
        let settings = EmergencySettings {
            enabled: self.config.water_bucket_clutch,
            clutch_height: self.config.clutch_height,
        };
        if self.emergency.check(&mut self.link, settings) {
            return;
        }

        if self.config.pause_on_player_nearby && self.player_nearby() {
            debug!("player nearby; holding still this cycle");
            return;
        }
        if self.config.pause_on_low_health
            && self.link.health() < self.link.max_health() * self.config.emergency_health_threshold
        {
            debug!("health critical; holding still this cycle");
            return;
        }

        let decision = self.planner.plan(&self.link, &self.perimeter, &self.config);
        debug!(decision = decision.label(), "cycle decision");

        self.executor
            .execute(&mut self.link, &decision, &mut self.queue);

        if self.config.enable_movement {
            if let Some(target) = decision.target_pos() {
                self.movement.move_towards(&mut self.link, target);
            } else if matches!(decision, Decision::Idle) && !self.movement.is_moving() {
                if !self.patterns.is_empty() && self.rng.gen_bool(IDLE_REPLAY_CHANCE) {
                    self.learner.schedule_replay(&self.patterns, &mut self.queue);
                } else {
                    self.movement.random_walk(&mut self.link);
                }
            }
        }

        self.automation
            .update(&mut self.link, &self.perimeter, &mut self.queue, &self.config);

        self.maybe_chat();
    }

    fn player_nearby(&self) -> bool {
        self.link
            .entities_within(self.link.position(), self.config.player_detection_radius)
            .iter()
            .any(|e| e.kind == EntityKind::Player && e.alive)
    }

    fn maybe_chat(&mut self) {
        if !self.config.enable_random_chat || self.config.chat_messages.is_empty() {
            return;
        }
        if self.rng.gen_bool(self.config.chat_frequency.clamp(0.0, 1.0)) {
            let index = self.rng.gen_range(0..self.config.chat_messages.len());
            self.link.send_chat(&self.config.chat_messages[index]);
        }
    }

    // ── Enable/disable ───────────────────────────────────────────────────────

    /// Flip the agent on or off.  Off→on commits the observed idle pattern;
    /// on→off stops everything and resumes observation.
    pub fn set_enabled(&mut self, enabled: bool) {
        let was = self.enabled;
        self.enabled = enabled;
        if enabled && !was {
            self.learner.stop_recording(&mut self.patterns);
            info!(patterns = self.patterns.len(), "agent enabled");
        } else if !enabled && was {
            self.movement.stop(&mut self.link);
            self.automation.reset();
            self.learner.start_recording(&self.link);
            info!("agent disabled; observing idle motion");
        }
    }

    /// Toggle and return the new state.
    pub fn toggle(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Hard stop: disable immediately and go back to observing.
    pub fn emergency_stop(&mut self) {
        warn!("emergency stop");
        self.set_enabled(false);
    }

    // ── Command surface ──────────────────────────────────────────────────────

    pub fn start_perimeter(&mut self) {
        self.perimeter.start_recording();
    }

    /// Record the avatar's current cell as a perimeter point.
    pub fn add_perimeter_point(&mut self) -> Option<usize> {
        if !self.link.connected() {
            return None;
        }
        let pos = self.link.block_position();
        self.perimeter.add_point(pos)
    }

    pub fn finish_perimeter(&mut self) -> Option<(BlockPos, BlockPos)> {
        self.perimeter.finish_recording()
    }

    /// Authorize the chest closest to the avatar, if one is in the small
    /// search box around it.
    pub fn mark_nearby_chest(&mut self) -> Option<BlockPos> {
        if !self.link.connected() {
            return None;
        }
        let center = self.link.block_position();
        let chest = scan_volume(&self.link, center, MARK_CHEST_RADIUS, MARK_CHEST_VERTICAL, |_, b| {
            b.is_chest()
        })?;
        self.perimeter.mark_authorized(chest);
        Some(chest)
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn perimeter(&self) -> &BasePerimeter {
        &self.perimeter
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn patterns(&self) -> &PatternLibrary {
        &self.patterns
    }

    /// `true` while idle motion is being observed (agent off).
    pub fn is_learning(&self) -> bool {
        self.learner.is_recording()
    }

    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
