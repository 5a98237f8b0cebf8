//! Closed item/block catalog with family classification.
//!
//! Families are resolved from these enums, never from identifier text: the
//! catalog is the single place that decides what counts as fuel, food,
//! smeltable stock, a melee weapon or a digging tool.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Materials & kinds
// ────────────────────────────────────────────────────────────────────────────

/// Tool/weapon material tier, ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ToolMaterial {
    Wood,
    Stone,
    Iron,
    Diamond,
}

impl ToolMaterial {
    /// Rank used when choosing the best melee item (higher is better).
    pub fn rank(self) -> u8 {
        match self {
            ToolMaterial::Wood => 1,
            ToolMaterial::Stone => 2,
            ToolMaterial::Iron => 3,
            ToolMaterial::Diamond => 4,
        }
    }
}

/// Digging tool families, matched against block materials when mining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    Pickaxe,
    Axe,
    Shovel,
}

/// The four armor slots, in inventory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipmentSlot {
    Boots,
    Leggings,
    Chestplate,
    Helmet,
}

impl EquipmentSlot {
    pub const ALL: [EquipmentSlot; 4] = [
        EquipmentSlot::Boots,
        EquipmentSlot::Leggings,
        EquipmentSlot::Chestplate,
        EquipmentSlot::Helmet,
    ];

    pub fn index(self) -> usize {
        match self {
            EquipmentSlot::Boots => 0,
            EquipmentSlot::Leggings => 1,
            EquipmentSlot::Chestplate => 2,
            EquipmentSlot::Helmet => 3,
        }
    }
}

/// Ore varieties the planner can be configured to hunt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OreKind {
    Coal,
    Iron,
    Gold,
    Diamond,
    Emerald,
    Redstone,
}

// ────────────────────────────────────────────────────────────────────────────
// Items
// ────────────────────────────────────────────────────────────────────────────

/// Canonical item catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Item {
    // Weapons and tools
    Sword(ToolMaterial),
    Pickaxe(ToolMaterial),
    Axe(ToolMaterial),
    Shovel(ToolMaterial),
    // Armor
    Helmet,
    Chestplate,
    Leggings,
    Boots,
    // Food
    Bread,
    CookedBeef,
    Apple,
    // Fuel
    Coal,
    Charcoal,
    LavaBucket,
    BlazeRod,
    // Smeltable stock
    RawIron,
    RawGold,
    RawCopper,
    Cobblestone,
    Cactus,
    // Emergency
    WaterBucket,
    // Misc
    Stick,
}

impl Item {
    /// Melee usefulness rank (diamond > iron > stone > wood); `None` for
    /// items that are not weapons.  Swords and axes both qualify.
    pub fn melee_rank(&self) -> Option<u8> {
        match self {
            Item::Sword(m) | Item::Axe(m) => Some(m.rank()),
            _ => None,
        }
    }

    pub fn tool_kind(&self) -> Option<ToolKind> {
        match self {
            Item::Pickaxe(_) => Some(ToolKind::Pickaxe),
            Item::Axe(_) => Some(ToolKind::Axe),
            Item::Shovel(_) => Some(ToolKind::Shovel),
            _ => None,
        }
    }

    /// Swords, pickaxes, axes and shovels: the items worth a quick-access
    /// slot when tidying the inventory.
    pub fn is_hand_tool(&self) -> bool {
        matches!(
            self,
            Item::Sword(_) | Item::Pickaxe(_) | Item::Axe(_) | Item::Shovel(_)
        )
    }

    pub fn is_food(&self) -> bool {
        matches!(self, Item::Bread | Item::CookedBeef | Item::Apple)
    }

    /// Accepted by the furnace fuel slot.
    pub fn is_fuel(&self) -> bool {
        matches!(
            self,
            Item::Coal | Item::Charcoal | Item::LavaBucket | Item::BlazeRod
        )
    }

    /// Accepted by the furnace input slot.
    pub fn is_smeltable(&self) -> bool {
        matches!(
            self,
            Item::RawIron | Item::RawGold | Item::RawCopper | Item::Cobblestone | Item::Cactus
        )
    }

    pub fn armor_slot(&self) -> Option<EquipmentSlot> {
        match self {
            Item::Helmet => Some(EquipmentSlot::Helmet),
            Item::Chestplate => Some(EquipmentSlot::Chestplate),
            Item::Leggings => Some(EquipmentSlot::Leggings),
            Item::Boots => Some(EquipmentSlot::Boots),
            _ => None,
        }
    }

    /// Can be placed to produce a liquid surface (the fall-save item).
    pub fn is_liquid_source(&self) -> bool {
        matches!(self, Item::WaterBucket)
    }
}

/// A stack of one item kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: Item,
    pub count: u32,
}

impl ItemStack {
    pub const fn new(item: Item, count: u32) -> Self {
        Self { item, count }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Blocks
// ────────────────────────────────────────────────────────────────────────────

/// Canonical block catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Block {
    Air,
    Stone,
    Dirt,
    GrassBlock,
    Log,
    Water,
    Bedrock,
    Chest,
    Furnace { lit: bool },
    Ore(OreKind),
}

impl Block {
    pub fn is_air(&self) -> bool {
        matches!(self, Block::Air)
    }

    /// Can the avatar occupy this cell?
    pub fn is_traversable(&self) -> bool {
        matches!(self, Block::Air | Block::Water)
    }

    pub fn is_solid(&self) -> bool {
        !self.is_traversable()
    }

    pub fn is_chest(&self) -> bool {
        matches!(self, Block::Chest)
    }

    pub fn is_furnace(&self) -> bool {
        matches!(self, Block::Furnace { .. })
    }

    pub fn ore(&self) -> Option<OreKind> {
        match self {
            Block::Ore(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Which tool family digs this block fastest, if any applies.
    pub fn mining_tool(&self) -> Option<ToolKind> {
        match self {
            Block::Ore(_) | Block::Stone => Some(ToolKind::Pickaxe),
            Block::Log => Some(ToolKind::Axe),
            Block::Dirt | Block::GrassBlock => Some(ToolKind::Shovel),
            _ => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
