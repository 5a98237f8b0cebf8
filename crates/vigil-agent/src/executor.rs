//! Decision execution under the global action cooldown.
//!
//! Exactly one decision is executed per 2-second window; calls inside the
//! window are no-ops.  Combat re-verifies its target against a fresh scan
//! rather than trusting the planner's snapshot.  Chest interactions schedule
//! the delayed browse task that rummages through the opened container at a
//! human cadence.

use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::debug;
use vigil_types::{BlockPos, Decision, EntityKind, Item, Orientation, Vec3};
use vigil_world::{ContainerKind, INVENTORY_SLOTS, QUICK_SLOTS, WorldLink};

use crate::tasks::{DeferredTask, TaskOutcome, TaskQueue};

/// One execution permitted per window.
const ACTION_COOLDOWN: Duration = Duration::from_millis(2000);

const COMBAT_RESCAN_RADIUS: f64 = 8.0;
const ATTACK_CHANCE: f64 = 0.8;
/// Lateral dodge when the target is inside this range.
const DODGE_RANGE: f64 = 3.0;
const DODGE_CHANCE: f64 = 0.5;
const DODGE_SPEED: f64 = 0.3;
const DODGE_CANCEL_MIN_MS: u64 = 200;
const DODGE_CANCEL_MAX_MS: u64 = 500;

/// Maximum reach for container interaction.
const INTERACT_RANGE: f64 = 4.0;
/// Maximum reach for starting a block break.
const MINING_RANGE: f64 = 5.0;

const CHEST_BROWSE_DELAY_MIN_MS: u64 = 1_500;
const CHEST_BROWSE_DELAY_MAX_MS: u64 = 4_000;

// ────────────────────────────────────────────────────────────────────────────
// ActionExecutor
// ────────────────────────────────────────────────────────────────────────────

/// Executes one [`Decision`] per cooldown window.
pub struct ActionExecutor {
    rng: SmallRng,
    last_action: Option<Instant>,
}

impl ActionExecutor {
    pub fn new(rng: SmallRng) -> Self {
        Self {
            rng,
            last_action: None,
        }
    }

    /// Execute `decision` if the cooldown window has passed.
    pub fn execute(
        &mut self,
        link: &mut dyn WorldLink,
        decision: &Decision,
        queue: &mut TaskQueue,
    ) {
        if let Some(last) = self.last_action {
            if last.elapsed() < ACTION_COOLDOWN {
                return;
            }
        }
        if !link.connected() {
            return;
        }

        match decision {
            Decision::Combat { .. } => self.execute_combat(link, queue),
            Decision::Eating => self.execute_eating(link),
            Decision::Chest { pos } => self.execute_chest(link, queue, *pos),
            Decision::Furnace { pos } => self.execute_furnace(link, *pos),
            Decision::Mining { pos } => self.execute_mining(link, *pos),
            Decision::Idle | Decision::Exploring { .. } => {}
        }

        self.last_action = Some(Instant::now());
    }

    // ── Combat ───────────────────────────────────────────────────────────────

    fn execute_combat(&mut self, link: &mut dyn WorldLink, queue: &mut TaskQueue) {
        let position = link.position();
        let target = link
            .entities_within(position, COMBAT_RESCAN_RADIUS)
            .into_iter()
            .filter(|e| e.kind == EntityKind::Hostile && e.alive)
            .min_by(|a, b| {
                position
                    .distance_to(a.position)
                    .total_cmp(&position.distance_to(b.position))
            });
        let Some(target) = target else { return };
        let distance = position.distance_to(target.position);
        if distance > COMBAT_RESCAN_RADIUS {
            return;
        }

        // Face mid-body, not the feet.
        let aim = target.position.add(Vec3::new(0.0, 0.9, 0.0));
        link.set_orientation(Orientation::looking_at(link.eye_position(), aim));

        self.select_best_weapon(link);

        if self.rng.gen_bool(ATTACK_CHANCE) {
            link.attack(target.id);
        }

        if distance < DODGE_RANGE && self.rng.gen_bool(DODGE_CHANCE) {
            let bearing = self.rng.gen_range(0.0..360.0_f64).to_radians();
            link.set_velocity(Vec3::new(
                bearing.cos() * DODGE_SPEED,
                0.0,
                bearing.sin() * DODGE_SPEED,
            ));
            let delay = Duration::from_millis(
                self.rng.gen_range(DODGE_CANCEL_MIN_MS..DODGE_CANCEL_MAX_MS),
            );
            queue.schedule(delay, Box::new(DodgeCancelTask));
        }
    }

    /// Hold the highest-ranked melee item in the quick-access row.
    fn select_best_weapon(&mut self, link: &mut dyn WorldLink) {
        let best = (0..QUICK_SLOTS)
            .filter_map(|i| {
                link.inventory_slot(i)
                    .and_then(|s| s.item.melee_rank())
                    .map(|rank| (i, rank))
            })
            .max_by_key(|(_, rank)| *rank);
        if let Some((slot, _)) = best {
            let _ = link.select_slot(slot);
        }
    }

    // ── Eating ───────────────────────────────────────────────────────────────

    fn execute_eating(&mut self, link: &mut dyn WorldLink) {
        let food = (0..INVENTORY_SLOTS)
            .find(|&i| link.inventory_slot(i).is_some_and(|s| s.item.is_food()));
        let Some(slot) = food else { return };
        // Only quick-access food can be held and consumed directly.
        if slot < QUICK_SLOTS && link.select_slot(slot).is_ok() {
            link.consume_held();
        }
    }

    // ── Containers ───────────────────────────────────────────────────────────

    fn execute_chest(&mut self, link: &mut dyn WorldLink, queue: &mut TaskQueue, pos: BlockPos) {
        if !self.approach_and_face(link, pos, INTERACT_RANGE) {
            return;
        }
        link.interact_block(pos);
        let delay = Duration::from_millis(
            self.rng
                .gen_range(CHEST_BROWSE_DELAY_MIN_MS..CHEST_BROWSE_DELAY_MAX_MS),
        );
        debug!(?pos, ?delay, "chest opened; browse scheduled");
        queue.schedule(delay, Box::new(ChestBrowseTask::new(self.rng.next_u64())));
    }

    fn execute_furnace(&mut self, link: &mut dyn WorldLink, pos: BlockPos) {
        if !self.approach_and_face(link, pos, INTERACT_RANGE) {
            return;
        }
        link.interact_block(pos);
    }

    // ── Mining ───────────────────────────────────────────────────────────────

    fn execute_mining(&mut self, link: &mut dyn WorldLink, pos: BlockPos) {
        if link.position().distance_to(pos.center()) > MINING_RANGE {
            return;
        }
        self.select_mining_tool(link, pos);
        link.set_orientation(Orientation::looking_at(link.eye_position(), pos.center()));
        link.start_breaking(pos);
    }

    /// Match the target block's material family to a tool family.
    fn select_mining_tool(&mut self, link: &mut dyn WorldLink, pos: BlockPos) {
        let Some(wanted) = link.block(pos).mining_tool() else {
            return;
        };
        let slot = (0..QUICK_SLOTS).find(|&i| {
            link.inventory_slot(i)
                .is_some_and(|s| s.item.tool_kind() == Some(wanted))
        });
        if let Some(slot) = slot {
            let _ = link.select_slot(slot);
        }
    }

    // ── Shared ───────────────────────────────────────────────────────────────

    /// Require proximity, then face the block.  Returns `false` when out of
    /// reach.
    fn approach_and_face(&mut self, link: &mut dyn WorldLink, pos: BlockPos, range: f64) -> bool {
        if link.position().distance_to(pos.center()) > range {
            return false;
        }
        link.set_orientation(Orientation::looking_at(link.eye_position(), pos.center()));
        true
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Dodge cancel
// ────────────────────────────────────────────────────────────────────────────

/// Zeroes the dodge impulse after its randomized delay.
struct DodgeCancelTask;

impl DeferredTask for DodgeCancelTask {
    fn label(&self) -> &'static str {
        "dodge-cancel"
    }

    fn run(&mut self, link: &mut dyn WorldLink) -> TaskOutcome {
        if link.connected() {
            link.set_velocity(Vec3::ZERO);
        }
        TaskOutcome::Done
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Chest browse
// ────────────────────────────────────────────────────────────────────────────

/// Upper bound on transfers per browse, in case the inventory cannot accept
/// anything and pulls keep failing.
const MAX_BROWSE_TRANSFERS: usize = 32;
const TRANSFER_PAUSE_MIN_MS: u64 = 150;
const TRANSFER_PAUSE_MAX_MS: u64 = 200;
const BROWSE_CLOSE_MIN_MS: u64 = 500;
const BROWSE_CLOSE_MAX_MS: u64 = 1_500;

enum BrowseStage {
    Raid,
    Close,
}

/// One container transfer to perform next.
enum Transfer {
    Pull(usize),
    Tidy { from: usize, to: usize },
}

/// Rummages through an open chest: fills empty equipment slots with matching
/// armor, grabs missing tools, hauls smeltable stock, then tidies tools into
/// the quick-access row.  One transfer per wake, best-effort throughout;
/// closes the UI afterwards unless something else already closed it.
pub(crate) struct ChestBrowseTask {
    rng: SmallRng,
    stage: BrowseStage,
    transfers: usize,
}

impl ChestBrowseTask {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            stage: BrowseStage::Raid,
            transfers: 0,
        }
    }

    fn next_transfer(&self, link: &dyn WorldLink) -> Option<Transfer> {
        let container = 0..link.container_size();

        // Armor for any empty equipment slot.
        for i in container.clone() {
            if let Some(stack) = link.container_slot(i) {
                if let Some(slot) = stack.item.armor_slot() {
                    if link.equipment_slot(slot).is_none() {
                        return Some(Transfer::Pull(i));
                    }
                }
            }
        }

        // Tools the inventory lacks.
        for i in container.clone() {
            if let Some(stack) = link.container_slot(i) {
                let missing = match stack.item {
                    Item::Pickaxe(_) => !has_item(link, |it| matches!(it, Item::Pickaxe(_))),
                    Item::Sword(_) => !has_item(link, |it| matches!(it, Item::Sword(_))),
                    Item::Axe(_) => !has_item(link, |it| matches!(it, Item::Axe(_))),
                    _ => false,
                };
                if missing {
                    return Some(Transfer::Pull(i));
                }
            }
        }

        // Smeltable stock (ore, raw material, coal family).
        for i in container {
            if let Some(stack) = link.container_slot(i) {
                if stack.item.is_smeltable()
                    || matches!(stack.item, Item::Coal | Item::Charcoal)
                {
                    return Some(Transfer::Pull(i));
                }
            }
        }

        // Tidy: any tool in the general inventory moves to a free quick slot.
        for from in QUICK_SLOTS..INVENTORY_SLOTS {
            if link.inventory_slot(from).is_some_and(|s| s.item.is_hand_tool()) {
                if let Some(to) = (0..QUICK_SLOTS).find(|&i| link.inventory_slot(i).is_none()) {
                    return Some(Transfer::Tidy { from, to });
                }
            }
        }

        None
    }
}

impl DeferredTask for ChestBrowseTask {
    fn label(&self) -> &'static str {
        "chest-browse"
    }

    fn run(&mut self, link: &mut dyn WorldLink) -> TaskOutcome {
        // The UI was closed externally, or this is not a chest after all.
        if link.open_container() != Some(ContainerKind::Chest) {
            return TaskOutcome::Done;
        }

        match self.stage {
            BrowseStage::Raid => {
                if self.transfers < MAX_BROWSE_TRANSFERS {
                    if let Some(transfer) = self.next_transfer(link) {
                        match transfer {
                            Transfer::Pull(i) => link.pull_container_slot(i),
                            Transfer::Tidy { from, to } => link.move_inventory_item(from, to),
                        }
                        self.transfers += 1;
                        return TaskOutcome::Reschedule(Duration::from_millis(
                            self.rng
                                .gen_range(TRANSFER_PAUSE_MIN_MS..TRANSFER_PAUSE_MAX_MS),
                        ));
                    }
                }
                self.stage = BrowseStage::Close;
                TaskOutcome::Reschedule(Duration::from_millis(
                    self.rng.gen_range(BROWSE_CLOSE_MIN_MS..BROWSE_CLOSE_MAX_MS),
                ))
            }
            BrowseStage::Close => {
                link.close_container();
                TaskOutcome::Done
            }
        }
    }
}

fn has_item(link: &dyn WorldLink, pred: impl Fn(&Item) -> bool) -> bool {
    (0..INVENTORY_SLOTS).any(|i| link.inventory_slot(i).is_some_and(|s| pred(&s.item)))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
