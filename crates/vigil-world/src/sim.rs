//! In-process simulated world link for headless testing.
//!
//! [`SimLink`] implements [`WorldLink`] over a block map, an entity list and
//! a full inventory/container model.  Every issued action is appended to an
//! inspectable log so tests can assert on exactly what the core did, and the
//! state mutations are just real enough to keep multi-step sequences (chest
//! raids, furnace top-ups) honest.
//!
//! # Example
//!
//! ```rust
//! use vigil_world::{SimLink, WorldLink};
//! use vigil_types::{Block, BlockPos, Vec3};
//!
//! let mut link = SimLink::builder()
//!     .with_flat_ground(63, 16)
//!     .with_block(BlockPos::new(3, 64, 0), Block::Chest)
//!     .with_position(Vec3::new(0.5, 64.0, 0.5))
//!     .build();
//!
//! link.interact_block(BlockPos::new(3, 64, 0));
//! assert!(link.open_container().is_some());
//! ```

use std::collections::HashMap;

use tracing::trace;
use vigil_types::{
    Block, BlockPos, EntityId, EntityKind, EntitySnapshot, EquipmentSlot, ItemStack, Orientation,
    Vec3, VigilError,
};

use crate::{ContainerKind, INVENTORY_SLOTS, QUICK_SLOTS, WorldLink};

const CHEST_SLOTS: usize = 27;
const FURNACE_SLOTS: usize = 3;

// ────────────────────────────────────────────────────────────────────────────
// Action log
// ────────────────────────────────────────────────────────────────────────────

/// One action issued through the link, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRecord {
    SetOrientation(Orientation),
    SetVelocity(Vec3),
    Jump,
    SelectSlot(usize),
    Attack(EntityId),
    InteractBlock(BlockPos),
    StartBreaking(BlockPos),
    ConsumeHeld,
    PlaceHeldAt(BlockPos),
    Chat(String),
    PullContainerSlot(usize),
    PushToContainer { from: usize, to: usize },
    MoveInventoryItem { from: usize, to: usize },
    CloseContainer,
}

// ────────────────────────────────────────────────────────────────────────────
// SimLink
// ────────────────────────────────────────────────────────────────────────────

struct OpenContainer {
    kind: ContainerKind,
    pos: BlockPos,
    slots: Vec<Option<ItemStack>>,
}

/// Simulated [`WorldLink`] backend.
pub struct SimLink {
    connected: bool,
    blocks: HashMap<BlockPos, Block>,
    bottom_y: i32,
    entities: Vec<EntitySnapshot>,
    // Avatar
    position: Vec3,
    velocity: Vec3,
    orientation: Orientation,
    on_ground: bool,
    sprinting: bool,
    health: f32,
    max_health: f32,
    hunger: u32,
    inventory: Vec<Option<ItemStack>>,
    equipment: [Option<ItemStack>; 4],
    selected: usize,
    // Containers
    stored_containers: HashMap<BlockPos, Vec<Option<ItemStack>>>,
    open: Option<OpenContainer>,
    // Log
    actions: Vec<ActionRecord>,
}

impl Default for SimLink {
    fn default() -> Self {
        Self {
            connected: true,
            blocks: HashMap::new(),
            bottom_y: -64,
            entities: Vec::new(),
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            orientation: Orientation::default(),
            on_ground: true,
            sprinting: false,
            health: 20.0,
            max_health: 20.0,
            hunger: 20,
            inventory: vec![None; INVENTORY_SLOTS],
            equipment: [None, None, None, None],
            selected: 0,
            stored_containers: HashMap::new(),
            open: None,
            actions: Vec::new(),
        }
    }
}

impl SimLink {
    pub fn builder() -> SimLinkBuilder {
        SimLinkBuilder::default()
    }

    // ── Test/driver state control ────────────────────────────────────────────

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Move the avatar without going through the action interface.
    pub fn teleport(&mut self, pos: Vec3) {
        self.position = pos;
    }

    pub fn set_on_ground(&mut self, on_ground: bool) {
        self.on_ground = on_ground;
    }

    pub fn set_sprinting(&mut self, sprinting: bool) {
        self.sprinting = sprinting;
    }

    pub fn set_health(&mut self, health: f32) {
        self.health = health;
    }

    pub fn set_hunger(&mut self, hunger: u32) {
        self.hunger = hunger.min(20);
    }

    /// Overwrite the current velocity without logging an action.
    pub fn set_fall_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    pub fn set_block(&mut self, pos: BlockPos, block: Block) {
        if block.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, block);
        }
    }

    pub fn add_entity(&mut self, entity: EntitySnapshot) {
        self.entities.push(entity);
    }

    pub fn remove_entity(&mut self, id: EntityId) {
        self.entities.retain(|e| e.id != id);
    }

    pub fn set_inventory_slot(&mut self, index: usize, stack: Option<ItemStack>) {
        if index < self.inventory.len() {
            self.inventory[index] = stack;
        }
    }

    pub fn set_equipment(&mut self, slot: EquipmentSlot, stack: Option<ItemStack>) {
        self.equipment[slot.index()] = stack;
    }

    /// Pre-fill the stored contents of a chest or furnace at `pos`.
    pub fn set_container_contents(&mut self, pos: BlockPos, slots: Vec<Option<ItemStack>>) {
        self.stored_containers.insert(pos, slots);
    }

    /// Integrate velocity into position; crude but enough to make the demo
    /// world move.
    pub fn advance(&mut self, dt: f64) {
        self.position = self.position.add(self.velocity.scale(dt));
    }

    // ── Log access ───────────────────────────────────────────────────────────

    pub fn actions(&self) -> &[ActionRecord] {
        &self.actions
    }

    pub fn clear_actions(&mut self) {
        self.actions.clear();
    }

    /// Drain and return the log.
    pub fn take_actions(&mut self) -> Vec<ActionRecord> {
        std::mem::take(&mut self.actions)
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn held(&self) -> Option<ItemStack> {
        self.inventory[self.selected]
    }

    fn container_template(&self, pos: BlockPos, size: usize) -> Vec<Option<ItemStack>> {
        self.stored_containers
            .get(&pos)
            .cloned()
            .unwrap_or_else(|| vec![None; size])
    }
}

impl WorldLink for SimLink {
    fn connected(&self) -> bool {
        self.connected
    }

    fn block(&self, pos: BlockPos) -> Block {
        self.blocks.get(&pos).copied().unwrap_or(Block::Air)
    }

    fn bottom_y(&self) -> i32 {
        self.bottom_y
    }

    fn entities_within(&self, center: Vec3, half_extent: f64) -> Vec<EntitySnapshot> {
        self.entities
            .iter()
            .filter(|e| {
                (e.position.x - center.x).abs() <= half_extent
                    && (e.position.y - center.y).abs() <= half_extent
                    && (e.position.z - center.z).abs() <= half_extent
            })
            .copied()
            .collect()
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn orientation(&self) -> Orientation {
        self.orientation
    }

    fn on_ground(&self) -> bool {
        self.on_ground
    }

    fn sprinting(&self) -> bool {
        self.sprinting
    }

    fn health(&self) -> f32 {
        self.health
    }

    fn max_health(&self) -> f32 {
        self.max_health
    }

    fn hunger(&self) -> u32 {
        self.hunger
    }

    fn inventory_slot(&self, index: usize) -> Option<ItemStack> {
        self.inventory.get(index).copied().flatten()
    }

    fn equipment_slot(&self, slot: EquipmentSlot) -> Option<ItemStack> {
        self.equipment[slot.index()]
    }

    fn selected_slot(&self) -> usize {
        self.selected
    }

    fn select_slot(&mut self, index: usize) -> Result<(), VigilError> {
        if index >= QUICK_SLOTS {
            return Err(VigilError::SlotOutOfRange(index));
        }
        self.selected = index;
        self.actions.push(ActionRecord::SelectSlot(index));
        Ok(())
    }

    fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
        self.actions.push(ActionRecord::SetOrientation(orientation));
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
        self.actions.push(ActionRecord::SetVelocity(velocity));
    }

    fn jump(&mut self) {
        self.actions.push(ActionRecord::Jump);
    }

    fn attack(&mut self, target: EntityId) {
        self.actions.push(ActionRecord::Attack(target));
    }

    fn interact_block(&mut self, pos: BlockPos) {
        trace!(?pos, "interact");
        self.actions.push(ActionRecord::InteractBlock(pos));
        match self.block(pos) {
            Block::Chest => {
                self.open = Some(OpenContainer {
                    kind: ContainerKind::Chest,
                    pos,
                    slots: self.container_template(pos, CHEST_SLOTS),
                });
            }
            Block::Furnace { .. } => {
                self.open = Some(OpenContainer {
                    kind: ContainerKind::Furnace,
                    pos,
                    slots: self.container_template(pos, FURNACE_SLOTS),
                });
            }
            _ => {}
        }
    }

    fn start_breaking(&mut self, pos: BlockPos) {
        self.actions.push(ActionRecord::StartBreaking(pos));
    }

    fn consume_held(&mut self) {
        self.actions.push(ActionRecord::ConsumeHeld);
        if let Some(stack) = self.held() {
            if stack.item.is_food() {
                self.hunger = (self.hunger + 4).min(20);
                self.inventory[self.selected] = if stack.count > 1 {
                    Some(ItemStack::new(stack.item, stack.count - 1))
                } else {
                    None
                };
            }
        }
    }

    fn place_held_at(&mut self, pos: BlockPos) {
        self.actions.push(ActionRecord::PlaceHeldAt(pos));
        if let Some(stack) = self.held() {
            if stack.item.is_liquid_source() {
                // The liquid surfaces in the cell above the clicked face.
                self.blocks.insert(pos.up(), Block::Water);
            }
        }
    }

    fn send_chat(&mut self, message: &str) {
        self.actions.push(ActionRecord::Chat(message.to_string()));
    }

    fn open_container(&self) -> Option<ContainerKind> {
        self.open.as_ref().map(|c| c.kind)
    }

    fn container_size(&self) -> usize {
        self.open.as_ref().map_or(0, |c| c.slots.len())
    }

    fn container_slot(&self, index: usize) -> Option<ItemStack> {
        self.open
            .as_ref()
            .and_then(|c| c.slots.get(index).copied().flatten())
    }

    fn pull_container_slot(&mut self, index: usize) {
        self.actions.push(ActionRecord::PullContainerSlot(index));
        let Some(open) = self.open.as_mut() else { return };
        let Some(stack) = open.slots.get(index).copied().flatten() else {
            return;
        };
        // Armor shift-clicks into its own slot when that slot is free.
        if let Some(slot) = stack.item.armor_slot() {
            if self.equipment[slot.index()].is_none() {
                self.equipment[slot.index()] = Some(stack);
                open.slots[index] = None;
                return;
            }
        }
        if let Some(free) = self.inventory.iter().position(|s| s.is_none()) {
            self.inventory[free] = Some(stack);
            open.slots[index] = None;
        }
    }

    fn push_to_container(&mut self, inventory_index: usize, container_index: usize) {
        self.actions.push(ActionRecord::PushToContainer {
            from: inventory_index,
            to: container_index,
        });
        let Some(open) = self.open.as_mut() else { return };
        let Some(stack) = self.inventory.get(inventory_index).copied().flatten() else {
            return;
        };
        if container_index >= open.slots.len() {
            return;
        }
        match open.slots[container_index] {
            None => {
                open.slots[container_index] = Some(stack);
                self.inventory[inventory_index] = None;
            }
            Some(existing) if existing.item == stack.item => {
                open.slots[container_index] =
                    Some(ItemStack::new(existing.item, existing.count + stack.count));
                self.inventory[inventory_index] = None;
            }
            Some(_) => {}
        }
    }

    fn move_inventory_item(&mut self, from: usize, to: usize) {
        self.actions
            .push(ActionRecord::MoveInventoryItem { from, to });
        if from >= self.inventory.len() || to >= self.inventory.len() {
            return;
        }
        if self.inventory[to].is_none() {
            self.inventory[to] = self.inventory[from].take();
        }
    }

    fn close_container(&mut self) {
        self.actions.push(ActionRecord::CloseContainer);
        if let Some(open) = self.open.take() {
            trace!(pos = ?open.pos, "container closed");
            self.stored_containers.insert(open.pos, open.slots);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Builder
// ────────────────────────────────────────────────────────────────────────────

/// Builder that assembles a [`SimLink`] scene for tests and the demo world.
#[derive(Default)]
pub struct SimLinkBuilder {
    link: SimLink,
}

impl SimLinkBuilder {
    /// Fill a square slab of ground at `y`, extending `half_extent` cells in
    /// both horizontal directions from the origin.
    pub fn with_flat_ground(mut self, y: i32, half_extent: i32) -> Self {
        for x in -half_extent..=half_extent {
            for z in -half_extent..=half_extent {
                self.link.blocks.insert(BlockPos::new(x, y, z), Block::GrassBlock);
            }
        }
        self
    }

    pub fn with_block(mut self, pos: BlockPos, block: Block) -> Self {
        self.link.set_block(pos, block);
        self
    }

    pub fn with_position(mut self, pos: Vec3) -> Self {
        self.link.position = pos;
        self
    }

    pub fn with_hostile(mut self, position: Vec3) -> Self {
        self.link.entities.push(EntitySnapshot {
            id: EntityId::random(),
            kind: EntityKind::Hostile,
            position,
            alive: true,
        });
        self
    }

    pub fn with_entity(mut self, entity: EntitySnapshot) -> Self {
        self.link.entities.push(entity);
        self
    }

    pub fn with_item(mut self, slot: usize, stack: ItemStack) -> Self {
        self.link.set_inventory_slot(slot, Some(stack));
        self
    }

    pub fn with_hunger(mut self, hunger: u32) -> Self {
        self.link.hunger = hunger.min(20);
        self
    }

    pub fn with_health(mut self, health: f32) -> Self {
        self.link.health = health;
        self
    }

    pub fn with_container_contents(mut self, pos: BlockPos, slots: Vec<Option<ItemStack>>) -> Self {
        self.link.stored_containers.insert(pos, slots);
        self
    }

    pub fn build(self) -> SimLink {
        self.link
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::Item;
    use vigil_types::catalog::ToolMaterial;

    fn chest_scene() -> SimLink {
        SimLink::builder()
            .with_flat_ground(0, 8)
            .with_block(BlockPos::new(2, 1, 0), Block::Chest)
            .with_position(Vec3::new(0.5, 1.0, 0.5))
            .build()
    }

    #[test]
    fn unloaded_cells_read_as_air() {
        let link = SimLink::default();
        assert_eq!(link.block(BlockPos::new(100, 100, 100)), Block::Air);
    }

    #[test]
    fn interact_with_chest_opens_container() {
        let mut link = chest_scene();
        link.interact_block(BlockPos::new(2, 1, 0));
        assert_eq!(link.open_container(), Some(ContainerKind::Chest));
        assert_eq!(link.container_size(), CHEST_SLOTS);
    }

    #[test]
    fn interact_with_plain_block_opens_nothing() {
        let mut link = chest_scene();
        link.interact_block(BlockPos::new(0, 0, 0));
        assert!(link.open_container().is_none());
    }

    #[test]
    fn close_container_persists_contents() {
        let mut link = chest_scene();
        let chest = BlockPos::new(2, 1, 0);
        link.set_container_contents(
            chest,
            vec![Some(ItemStack::new(Item::Coal, 12)); 1],
        );
        link.interact_block(chest);
        link.pull_container_slot(0);
        link.close_container();
        // Re-opening sees the emptied chest.
        link.interact_block(chest);
        assert!(link.container_slot(0).is_none());
        assert_eq!(link.inventory_slot(0), Some(ItemStack::new(Item::Coal, 12)));
    }

    #[test]
    fn pull_armor_fills_matching_equipment_slot() {
        let mut link = chest_scene();
        let chest = BlockPos::new(2, 1, 0);
        link.set_container_contents(chest, vec![Some(ItemStack::new(Item::Helmet, 1))]);
        link.interact_block(chest);
        link.pull_container_slot(0);
        assert_eq!(
            link.equipment_slot(EquipmentSlot::Helmet),
            Some(ItemStack::new(Item::Helmet, 1))
        );
        // The stack left the container rather than landing in the inventory.
        assert!(link.inventory_slot(0).is_none());
    }

    #[test]
    fn pull_armor_falls_back_to_inventory_when_equipped() {
        let mut link = chest_scene();
        let chest = BlockPos::new(2, 1, 0);
        link.set_equipment(EquipmentSlot::Helmet, Some(ItemStack::new(Item::Helmet, 1)));
        link.set_container_contents(chest, vec![Some(ItemStack::new(Item::Helmet, 1))]);
        link.interact_block(chest);
        link.pull_container_slot(0);
        assert_eq!(link.inventory_slot(0), Some(ItemStack::new(Item::Helmet, 1)));
    }

    #[test]
    fn push_to_container_merges_same_item() {
        let mut link = SimLink::builder()
            .with_block(BlockPos::new(0, 1, 0), Block::Furnace { lit: false })
            .with_item(0, ItemStack::new(Item::Coal, 4))
            .build();
        link.set_container_contents(
            BlockPos::new(0, 1, 0),
            vec![None, Some(ItemStack::new(Item::Coal, 2)), None],
        );
        link.interact_block(BlockPos::new(0, 1, 0));
        link.push_to_container(0, crate::FURNACE_FUEL_SLOT);
        assert_eq!(
            link.container_slot(crate::FURNACE_FUEL_SLOT),
            Some(ItemStack::new(Item::Coal, 6))
        );
        assert!(link.inventory_slot(0).is_none());
    }

    #[test]
    fn select_slot_rejects_indices_outside_quick_row() {
        let mut link = SimLink::default();
        assert!(link.select_slot(QUICK_SLOTS).is_err());
        assert!(link.select_slot(3).is_ok());
        assert_eq!(link.selected_slot(), 3);
    }

    #[test]
    fn consume_held_food_restores_hunger_and_shrinks_stack() {
        let mut link = SimLink::builder()
            .with_item(0, ItemStack::new(Item::Bread, 2))
            .with_hunger(10)
            .build();
        link.consume_held();
        assert_eq!(link.hunger(), 14);
        assert_eq!(link.inventory_slot(0), Some(ItemStack::new(Item::Bread, 1)));
    }

    #[test]
    fn place_water_bucket_creates_water() {
        let mut link = SimLink::builder()
            .with_item(0, ItemStack::new(Item::WaterBucket, 1))
            .build();
        link.place_held_at(BlockPos::new(0, 5, 0));
        assert_eq!(link.block(BlockPos::new(0, 6, 0)), Block::Water);
    }

    #[test]
    fn entities_within_is_an_axis_aligned_box() {
        let near = EntitySnapshot {
            id: EntityId::random(),
            kind: EntityKind::Hostile,
            position: Vec3::new(5.0, 0.0, 5.0),
            alive: true,
        };
        let far = EntitySnapshot {
            id: EntityId::random(),
            kind: EntityKind::Hostile,
            position: Vec3::new(20.0, 0.0, 0.0),
            alive: true,
        };
        let link = SimLink::builder().with_entity(near).with_entity(far).build();
        let found = link.entities_within(Vec3::ZERO, 12.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, near.id);
    }

    #[test]
    fn action_log_preserves_issue_order() {
        let mut link = SimLink::builder()
            .with_item(3, ItemStack::new(Item::Sword(ToolMaterial::Iron), 1))
            .build();
        let _ = link.select_slot(3);
        link.jump();
        assert_eq!(
            link.actions(),
            &[ActionRecord::SelectSlot(3), ActionRecord::Jump]
        );
    }

    #[test]
    fn advance_integrates_velocity() {
        let mut link = SimLink::default();
        link.set_fall_velocity(Vec3::new(1.0, 0.0, 2.0));
        link.advance(0.5);
        assert_eq!(link.position(), Vec3::new(0.5, 0.0, 1.0));
    }
}
