//! Independent furnace-keeping scheduler.
//!
//! Runs alongside the decision pipeline on its own 30-second cadence: scans
//! the vicinity for furnaces, schedules delayed rechecks for lit ones, and
//! services whichever furnace UI is currently open – withdrawing output,
//! topping up fuel and input, and pulling smeltable stock from authorized
//! chests when the inventory runs dry.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::debug;
use vigil_guard::BasePerimeter;
use vigil_types::{Block, BlockPos, Vec3};
use vigil_world::{
    ContainerKind, FURNACE_FUEL_SLOT, FURNACE_INPUT_SLOT, FURNACE_OUTPUT_SLOT, INVENTORY_SLOTS,
    WorldLink,
};

use crate::config::AgentConfig;
use crate::planner::scan_volume;
use crate::tasks::{DeferredTask, TaskOutcome, TaskQueue};

/// Vicinity scan cadence.
const SCAN_INTERVAL: Duration = Duration::from_secs(30);
const SCAN_RADIUS: i32 = 16;
const SCAN_VERTICAL: i32 = 4;

/// Lit furnaces are rechecked after 60–120 s.
const RECHECK_MIN_MS: u64 = 60_000;
const RECHECK_MAX_MS: u64 = 120_000;
/// A recheck is dropped when the avatar wandered beyond this range.
const RECHECK_APPROACH_RADIUS: f64 = 32.0;
const INTERACT_RANGE: f64 = 4.0;

/// Fuel/input slots are topped up below this count.
const TOP_UP_TARGET: u32 = 8;

/// Chest search box when the inventory has no smeltable stock.
const CHEST_SCAN_RADIUS: i32 = 8;
const CHEST_SCAN_VERTICAL: i32 = 3;

/// Open furnace UIs are auto-closed after a 2–5 s dwell.
const UI_DWELL_MIN_MS: u64 = 2_000;
const UI_DWELL_MAX_MS: u64 = 5_000;

// ────────────────────────────────────────────────────────────────────────────
// AutomationManager
// ────────────────────────────────────────────────────────────────────────────

/// Periodic furnace-fueling/smelting scheduler.
pub struct AutomationManager {
    rng: SmallRng,
    tracked: HashSet<BlockPos>,
    last_scan: Option<Instant>,
    close_scheduled: bool,
    retrieve_pending: bool,
}

impl AutomationManager {
    pub fn new(rng: SmallRng) -> Self {
        Self {
            rng,
            tracked: HashSet::new(),
            last_scan: None,
            close_scheduled: false,
            retrieve_pending: false,
        }
    }

    /// Run one automation step; called every cycle.
    pub fn update(
        &mut self,
        link: &mut dyn WorldLink,
        perimeter: &BasePerimeter,
        queue: &mut TaskQueue,
        config: &AgentConfig,
    ) {
        self.update_at(Instant::now(), link, perimeter, queue, config);
    }

    fn update_at(
        &mut self,
        now: Instant,
        link: &mut dyn WorldLink,
        perimeter: &BasePerimeter,
        queue: &mut TaskQueue,
        config: &AgentConfig,
    ) {
        if !config.enable_furnace_management || !link.connected() {
            return;
        }
        let scan_due = match self.last_scan {
            None => true,
            Some(t) => now.duration_since(t) >= SCAN_INTERVAL,
        };
        if scan_due {
            self.scan_furnaces(link, queue);
            self.last_scan = Some(now);
        }
        self.service_open_furnace(link, perimeter, queue, config);
    }

    /// Forget tracked furnaces and pending flags (on agent disable).
    pub fn reset(&mut self) {
        self.tracked.clear();
        self.close_scheduled = false;
        self.retrieve_pending = false;
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    // ── Vicinity scan ────────────────────────────────────────────────────────

    fn scan_furnaces(&mut self, link: &dyn WorldLink, queue: &mut TaskQueue) {
        let center = link.block_position();
        for x in -SCAN_RADIUS..=SCAN_RADIUS {
            for y in -SCAN_VERTICAL..=SCAN_VERTICAL {
                for z in -SCAN_RADIUS..=SCAN_RADIUS {
                    let pos = center.offset(x, y, z);
                    if let Block::Furnace { lit } = link.block(pos) {
                        self.tracked.insert(pos);
                        if lit {
                            let delay = Duration::from_millis(
                                self.rng.gen_range(RECHECK_MIN_MS..RECHECK_MAX_MS),
                            );
                            debug!(?pos, ?delay, "lit furnace; recheck scheduled");
                            queue.schedule(delay, Box::new(FurnaceRecheckTask { pos }));
                        }
                    }
                }
            }
        }
    }

    // ── Open-UI servicing ────────────────────────────────────────────────────

    fn service_open_furnace(
        &mut self,
        link: &mut dyn WorldLink,
        perimeter: &BasePerimeter,
        queue: &mut TaskQueue,
        config: &AgentConfig,
    ) {
        if link.open_container() != Some(ContainerKind::Furnace) {
            self.close_scheduled = false;
            self.retrieve_pending = false;
            return;
        }

        if !self.close_scheduled {
            let dwell =
                Duration::from_millis(self.rng.gen_range(UI_DWELL_MIN_MS..UI_DWELL_MAX_MS));
            queue.schedule(dwell, Box::new(FurnaceCloseTask));
            self.close_scheduled = true;
        }

        if config.auto_collect_output && link.container_slot(FURNACE_OUTPUT_SLOT).is_some() {
            link.pull_container_slot(FURNACE_OUTPUT_SLOT);
        }

        if config.auto_fuel_furnaces && slot_needs_top_up(link, FURNACE_FUEL_SLOT) {
            if let Some(i) = find_inventory_item(link, |item| item.is_fuel()) {
                link.push_to_container(i, FURNACE_FUEL_SLOT);
            }
        }

        if config.auto_smelt_items && slot_needs_top_up(link, FURNACE_INPUT_SLOT) {
            if let Some(i) = find_inventory_item(link, |item| item.is_smeltable()) {
                link.push_to_container(i, FURNACE_INPUT_SLOT);
            } else if !self.retrieve_pending {
                self.request_stock_from_chest(link, perimeter, queue);
            }
        }
    }

    /// Find an authorized chest nearby and schedule the retrieve-and-return
    /// sequence.
    fn request_stock_from_chest(
        &mut self,
        link: &dyn WorldLink,
        perimeter: &BasePerimeter,
        queue: &mut TaskQueue,
    ) {
        let center = link.block_position();
        let chest = scan_volume(link, center, CHEST_SCAN_RADIUS, CHEST_SCAN_VERTICAL, |p, b| {
            b.is_chest() && perimeter.can_interact(p)
        });
        if let Some(pos) = chest {
            debug!(?pos, "no smeltable stock in inventory; chest retrieve scheduled");
            queue.schedule(
                Duration::from_millis(1_000),
                Box::new(ChestRetrieveTask::new(pos, self.rng.next_u64())),
            );
            self.retrieve_pending = true;
        }
    }
}

fn slot_needs_top_up(link: &dyn WorldLink, slot: usize) -> bool {
    link.container_slot(slot).is_none_or(|s| s.count < TOP_UP_TARGET)
}

fn find_inventory_item(
    link: &dyn WorldLink,
    pred: impl Fn(&vigil_types::Item) -> bool,
) -> Option<usize> {
    (0..INVENTORY_SLOTS).find(|&i| link.inventory_slot(i).is_some_and(|s| pred(&s.item)))
}

// ────────────────────────────────────────────────────────────────────────────
// Deferred tasks
// ────────────────────────────────────────────────────────────────────────────

/// Re-approaches a furnace that was lit a minute ago and relights it by
/// interacting if it burned out.
struct FurnaceRecheckTask {
    pos: BlockPos,
}

impl DeferredTask for FurnaceRecheckTask {
    fn label(&self) -> &'static str {
        "furnace-recheck"
    }

    fn run(&mut self, link: &mut dyn WorldLink) -> TaskOutcome {
        if !link.connected() {
            return TaskOutcome::Done;
        }
        let distance = link.position().distance_to(self.pos.center());
        if distance > RECHECK_APPROACH_RADIUS {
            return TaskOutcome::Done;
        }
        if matches!(link.block(self.pos), Block::Furnace { lit: false }) && distance <= INTERACT_RANGE
        {
            link.interact_block(self.pos);
        }
        TaskOutcome::Done
    }
}

/// Closes the furnace UI after its dwell, unless something else already did.
struct FurnaceCloseTask;

impl DeferredTask for FurnaceCloseTask {
    fn label(&self) -> &'static str {
        "furnace-ui-close"
    }

    fn run(&mut self, link: &mut dyn WorldLink) -> TaskOutcome {
        if link.open_container() == Some(ContainerKind::Furnace) {
            link.close_container();
        }
        TaskOutcome::Done
    }
}

/// Walks to an authorized chest, pulls its smeltable stock into the
/// inventory and closes it again.  Best-effort at every stage.
enum RetrieveStage {
    Approach,
    Open,
    Take,
    Close,
}

struct ChestRetrieveTask {
    pos: BlockPos,
    stage: RetrieveStage,
    rng: SmallRng,
}

impl ChestRetrieveTask {
    fn new(pos: BlockPos, seed: u64) -> Self {
        Self {
            pos,
            stage: RetrieveStage::Approach,
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl DeferredTask for ChestRetrieveTask {
    fn label(&self) -> &'static str {
        "chest-retrieve"
    }

    fn run(&mut self, link: &mut dyn WorldLink) -> TaskOutcome {
        if !link.connected() {
            return TaskOutcome::Done;
        }
        match self.stage {
            RetrieveStage::Approach => {
                let distance = link.position().distance_to(self.pos.center());
                if distance > 6.0 {
                    return TaskOutcome::Done;
                }
                self.stage = RetrieveStage::Open;
                if distance > INTERACT_RANGE {
                    // Nudge toward the chest and give the walk time to land.
                    let direction = self.pos.center().sub(link.position()).normalize();
                    link.set_velocity(direction.scale(0.2));
                    TaskOutcome::Reschedule(Duration::from_millis(2_000))
                } else {
                    TaskOutcome::Reschedule(Duration::from_millis(200))
                }
            }
            RetrieveStage::Open => {
                link.set_velocity(Vec3::ZERO);
                link.interact_block(self.pos);
                self.stage = RetrieveStage::Take;
                TaskOutcome::Reschedule(Duration::from_millis(1_500))
            }
            RetrieveStage::Take => {
                if link.open_container() != Some(ContainerKind::Chest) {
                    return TaskOutcome::Done;
                }
                let next = (0..link.container_size()).find(|&i| {
                    link.container_slot(i).is_some_and(|s| s.item.is_smeltable())
                });
                match next {
                    Some(i) => {
                        link.pull_container_slot(i);
                        TaskOutcome::Reschedule(Duration::from_millis(
                            self.rng.gen_range(180..220),
                        ))
                    }
                    None => {
                        self.stage = RetrieveStage::Close;
                        TaskOutcome::Reschedule(Duration::from_millis(1_000))
                    }
                }
            }
            RetrieveStage::Close => {
                if link.open_container().is_some() {
                    link.close_container();
                }
                TaskOutcome::Done
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::{Item, ItemStack};
    use vigil_world::SimLink;
    use vigil_world::sim::ActionRecord;

    fn manager() -> AutomationManager {
        AutomationManager::new(SmallRng::seed_from_u64(8))
    }

    fn run(
        mgr: &mut AutomationManager,
        now: Instant,
        link: &mut SimLink,
        perimeter: &BasePerimeter,
        queue: &mut TaskQueue,
    ) {
        mgr.update_at(now, link, perimeter, queue, &AgentConfig::default());
    }

    #[test]
    fn lit_furnaces_get_a_recheck_scheduled() {
        let mut link = SimLink::builder()
            .with_position(Vec3::new(0.5, 1.0, 0.5))
            .with_block(BlockPos::new(3, 1, 0), Block::Furnace { lit: true })
            .with_block(BlockPos::new(-3, 1, 0), Block::Furnace { lit: false })
            .build();
        let perimeter = BasePerimeter::in_memory();
        let mut queue = TaskQueue::new();
        let mut mgr = manager();
        run(&mut mgr, Instant::now(), &mut link, &perimeter, &mut queue);
        assert_eq!(queue.len(), 1, "only the lit furnace gets a recheck");
        assert_eq!(mgr.tracked_count(), 2);
    }

    #[test]
    fn vicinity_scan_respects_the_cadence() {
        let mut link = SimLink::builder()
            .with_position(Vec3::new(0.5, 1.0, 0.5))
            .with_block(BlockPos::new(3, 1, 0), Block::Furnace { lit: true })
            .build();
        let perimeter = BasePerimeter::in_memory();
        let mut queue = TaskQueue::new();
        let mut mgr = manager();
        let now = Instant::now();
        run(&mut mgr, now, &mut link, &perimeter, &mut queue);
        assert_eq!(queue.len(), 1);
        // Ten seconds later: no rescan, no extra recheck.
        run(&mut mgr, now + Duration::from_secs(10), &mut link, &perimeter, &mut queue);
        assert_eq!(queue.len(), 1);
        // Past the 30-second cadence the furnace is noticed again.
        run(&mut mgr, now + Duration::from_secs(31), &mut link, &perimeter, &mut queue);
        assert_eq!(queue.len(), 2);
    }

    fn open_furnace_scene(contents: Vec<Option<ItemStack>>) -> SimLink {
        let furnace = BlockPos::new(1, 1, 0);
        let mut link = SimLink::builder()
            .with_position(Vec3::new(0.5, 1.0, 0.5))
            .with_block(furnace, Block::Furnace { lit: true })
            .build();
        link.set_container_contents(furnace, contents);
        link.interact_block(furnace);
        link.clear_actions();
        link
    }

    #[test]
    fn open_furnace_output_is_withdrawn() {
        let mut link = open_furnace_scene(vec![
            None,
            None,
            Some(ItemStack::new(Item::Charcoal, 3)),
        ]);
        let perimeter = BasePerimeter::in_memory();
        let mut queue = TaskQueue::new();
        let mut mgr = manager();
        run(&mut mgr, Instant::now(), &mut link, &perimeter, &mut queue);
        assert!(
            link.actions()
                .contains(&ActionRecord::PullContainerSlot(FURNACE_OUTPUT_SLOT))
        );
    }

    #[test]
    fn low_fuel_is_topped_up_from_the_inventory() {
        let mut link = open_furnace_scene(vec![
            Some(ItemStack::new(Item::RawIron, 10)),
            Some(ItemStack::new(Item::Coal, 2)),
            None,
        ]);
        link.set_inventory_slot(5, Some(ItemStack::new(Item::Coal, 20)));
        let perimeter = BasePerimeter::in_memory();
        let mut queue = TaskQueue::new();
        let mut mgr = manager();
        run(&mut mgr, Instant::now(), &mut link, &perimeter, &mut queue);
        assert!(link.actions().contains(&ActionRecord::PushToContainer {
            from: 5,
            to: FURNACE_FUEL_SLOT
        }));
    }

    #[test]
    fn well_stocked_slots_are_left_alone() {
        let mut link = open_furnace_scene(vec![
            Some(ItemStack::new(Item::RawIron, 30)),
            Some(ItemStack::new(Item::Coal, 30)),
            None,
        ]);
        link.set_inventory_slot(5, Some(ItemStack::new(Item::Coal, 20)));
        link.set_inventory_slot(6, Some(ItemStack::new(Item::RawGold, 20)));
        let perimeter = BasePerimeter::in_memory();
        let mut queue = TaskQueue::new();
        let mut mgr = manager();
        run(&mut mgr, Instant::now(), &mut link, &perimeter, &mut queue);
        assert!(
            !link
                .actions()
                .iter()
                .any(|a| matches!(a, ActionRecord::PushToContainer { .. }))
        );
    }

    #[test]
    fn ui_close_is_scheduled_once_per_opening() {
        let mut link = open_furnace_scene(vec![None, None, None]);
        let perimeter = BasePerimeter::in_memory();
        let mut queue = TaskQueue::new();
        let mut mgr = manager();
        let now = Instant::now();
        run(&mut mgr, now, &mut link, &perimeter, &mut queue);
        let after_first = queue.len();
        run(&mut mgr, now + Duration::from_secs(1), &mut link, &perimeter, &mut queue);
        assert_eq!(queue.len(), after_first, "close task must not be re-scheduled");
    }

    #[test]
    fn empty_input_with_no_stock_schedules_chest_retrieve() {
        let chest = BlockPos::new(3, 1, 0);
        let mut link = open_furnace_scene(vec![None, Some(ItemStack::new(Item::Coal, 20)), None]);
        link.set_block(chest, Block::Chest);
        link.set_container_contents(chest, vec![Some(ItemStack::new(Item::RawIron, 20))]);
        let mut perimeter = BasePerimeter::in_memory();
        perimeter.mark_authorized(chest);

        let mut queue = TaskQueue::new();
        let mut mgr = manager();
        let now = Instant::now();
        run(&mut mgr, now, &mut link, &perimeter, &mut queue);
        // Close task + retrieve task.
        assert_eq!(queue.len(), 2);

        // The furnace UI is still open; close it so the retrieve can run its
        // own chest session, then step through the whole sequence.
        link.close_container();
        link.clear_actions();
        for i in 1..=20 {
            queue.drain_due_at(now + Duration::from_secs(i), &mut link);
        }
        assert!(queue.is_empty(), "retrieve never finished");
        assert!(link.actions().contains(&ActionRecord::InteractBlock(chest)));
        assert!(link.actions().contains(&ActionRecord::PullContainerSlot(0)));
        assert!(link.actions().contains(&ActionRecord::CloseContainer));
        assert!(find_inventory_item(&link, |it| it.is_smeltable()).is_some());
    }

    #[test]
    fn unauthorized_chests_are_not_raided_for_stock() {
        let chest = BlockPos::new(3, 1, 0);
        let mut link = open_furnace_scene(vec![None, Some(ItemStack::new(Item::Coal, 20)), None]);
        link.set_block(chest, Block::Chest);
        let perimeter = BasePerimeter::in_memory();
        let mut queue = TaskQueue::new();
        let mut mgr = manager();
        run(&mut mgr, Instant::now(), &mut link, &perimeter, &mut queue);
        // Only the UI close task.
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn recheck_relights_a_burned_out_furnace_in_range() {
        let pos = BlockPos::new(2, 1, 0);
        let mut link = SimLink::builder()
            .with_position(Vec3::new(0.5, 1.0, 0.5))
            .with_block(pos, Block::Furnace { lit: false })
            .build();
        let mut task = FurnaceRecheckTask { pos };
        let _ = task.run(&mut link);
        assert!(link.actions().contains(&ActionRecord::InteractBlock(pos)));
    }

    #[test]
    fn recheck_ignores_a_still_lit_furnace() {
        let pos = BlockPos::new(2, 1, 0);
        let mut link = SimLink::builder()
            .with_position(Vec3::new(0.5, 1.0, 0.5))
            .with_block(pos, Block::Furnace { lit: true })
            .build();
        let mut task = FurnaceRecheckTask { pos };
        let _ = task.run(&mut link);
        assert!(link.actions().is_empty());
    }

    #[test]
    fn recheck_gives_up_when_the_avatar_wandered_off() {
        let pos = BlockPos::new(2, 1, 0);
        let mut link = SimLink::builder()
            .with_position(Vec3::new(50.0, 1.0, 0.5))
            .with_block(pos, Block::Furnace { lit: false })
            .build();
        let mut task = FurnaceRecheckTask { pos };
        assert!(matches!(task.run(&mut link), TaskOutcome::Done));
        assert!(link.actions().is_empty());
    }
}
