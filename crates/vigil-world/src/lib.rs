//! `vigil-world` – the abstraction boundary between the agent core and the
//! live world session.
//!
//! [`WorldLink`] is the single collaborator surface the core talks through:
//! world/avatar state reads, the action-issuing interface, and the
//! currently-open container handle.  Real backends wrap a connected game
//! session; [`sim::SimLink`] is an in-process simulated backend that records
//! every issued action so the full stack can run in headless tests.

use vigil_types::{
    Block, BlockPos, EntityId, EntitySnapshot, EquipmentSlot, ItemStack, Orientation, Vec3,
    VigilError,
};

pub mod sim;

pub use sim::{SimLink, SimLinkBuilder};

/// Number of general inventory slots.
pub const INVENTORY_SLOTS: usize = 36;

/// Size of the quick-access row (the first inventory slots, selectable as the
/// held item).
pub const QUICK_SLOTS: usize = 9;

/// Eye height above the avatar's position, used for view-angle math.
pub const EYE_HEIGHT: f64 = 1.62;

/// Furnace container slot layout.
pub const FURNACE_INPUT_SLOT: usize = 0;
pub const FURNACE_FUEL_SLOT: usize = 1;
pub const FURNACE_OUTPUT_SLOT: usize = 2;

/// Kind of container UI currently open, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Chest,
    Furnace,
}

/// The live-session surface consumed by the agent core.
///
/// All actuation is fire-and-forget: a refused or impossible action is simply
/// dropped by the backend.  The one exception is [`select_slot`], which
/// reports out-of-range indices so callers can ignore the failure explicitly.
///
/// [`select_slot`]: WorldLink::select_slot
pub trait WorldLink {
    // ── Availability ─────────────────────────────────────────────────────────

    /// `false` while the avatar or world references are unavailable.  Every
    /// consumer degrades to a no-op in that case.
    fn connected(&self) -> bool;

    // ── World reads ──────────────────────────────────────────────────────────

    /// Block at a cell; unloaded cells read as [`Block::Air`].
    fn block(&self, pos: BlockPos) -> Block;

    /// Lowest buildable layer of the world.
    fn bottom_y(&self) -> i32;

    /// All entities inside the axis-aligned box of the given half-extent
    /// around `center`.
    fn entities_within(&self, center: Vec3, half_extent: f64) -> Vec<EntitySnapshot>;

    // ── Avatar state ─────────────────────────────────────────────────────────

    fn position(&self) -> Vec3;
    fn velocity(&self) -> Vec3;
    fn orientation(&self) -> Orientation;
    fn on_ground(&self) -> bool;
    fn sprinting(&self) -> bool;
    fn health(&self) -> f32;
    fn max_health(&self) -> f32;
    /// Satiation level, 0..=20.
    fn hunger(&self) -> u32;

    fn eye_position(&self) -> Vec3 {
        self.position().add(Vec3::new(0.0, EYE_HEIGHT, 0.0))
    }

    /// Cell the avatar is standing in.
    fn block_position(&self) -> BlockPos {
        BlockPos::containing(self.position())
    }

    // ── Inventory ────────────────────────────────────────────────────────────

    /// General inventory slot (`0..INVENTORY_SLOTS`); the first
    /// [`QUICK_SLOTS`] form the quick-access row.
    fn inventory_slot(&self, index: usize) -> Option<ItemStack>;

    fn equipment_slot(&self, slot: EquipmentSlot) -> Option<ItemStack>;

    /// Index of the currently held quick-access slot.
    fn selected_slot(&self) -> usize;

    /// Switch the held item.  Fails for indices outside the quick-access row.
    fn select_slot(&mut self, index: usize) -> Result<(), VigilError>;

    // ── Actuation ────────────────────────────────────────────────────────────

    fn set_orientation(&mut self, orientation: Orientation);
    fn set_velocity(&mut self, velocity: Vec3);
    fn jump(&mut self);
    fn attack(&mut self, target: EntityId);
    /// Use a block in place: opens chests and furnaces.
    fn interact_block(&mut self, pos: BlockPos);
    /// Begin breaking the block at `pos` with the held item.
    fn start_breaking(&mut self, pos: BlockPos);
    /// Consume the held item (food).
    fn consume_held(&mut self);
    /// Place the held item's content against the given cell (liquid clutch).
    fn place_held_at(&mut self, pos: BlockPos);
    fn send_chat(&mut self, message: &str);

    // ── Open container ───────────────────────────────────────────────────────

    /// Kind of the container UI currently open, if any.
    fn open_container(&self) -> Option<ContainerKind>;
    fn container_size(&self) -> usize;
    fn container_slot(&self, index: usize) -> Option<ItemStack>;
    /// Shift a container slot's stack out: matching armor fills an empty
    /// equipment slot, everything else lands in the first free inventory slot.
    fn pull_container_slot(&mut self, index: usize);
    /// Move an inventory stack into a specific container slot.
    fn push_to_container(&mut self, inventory_index: usize, container_index: usize);
    /// Move a stack between two general inventory slots (no-op when the
    /// destination is occupied).
    fn move_inventory_item(&mut self, from: usize, to: usize);
    fn close_container(&mut self);
}
