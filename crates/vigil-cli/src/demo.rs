//! Built-in demo scene: a small simulated base the agent can be watched
//! running against without any live session.

use vigil_types::catalog::ToolMaterial;
use vigil_types::{Block, BlockPos, Item, ItemStack, OreKind, Vec3};
use vigil_world::SimLink;

/// A flat clearing with a furnace, a chest of loot, an ore pocket and one
/// hostile at the treeline.
pub fn build_world() -> SimLink {
    let chest = BlockPos::new(4, 65, 2);
    let furnace = BlockPos::new(3, 65, -2);

    let mut link = SimLink::builder()
        .with_flat_ground(64, 24)
        .with_position(Vec3::new(0.5, 65.0, 0.5))
        .with_block(furnace, Block::Furnace { lit: true })
        .with_block(chest, Block::Chest)
        .with_block(BlockPos::new(-6, 64, 5), Block::Ore(OreKind::Coal))
        .with_block(BlockPos::new(-7, 64, 5), Block::Ore(OreKind::Iron))
        .with_block(BlockPos::new(10, 65, 9), Block::Log)
        .with_hostile(Vec3::new(18.5, 65.0, -11.5))
        .with_item(0, ItemStack::new(Item::Sword(ToolMaterial::Iron), 1))
        .with_item(1, ItemStack::new(Item::Pickaxe(ToolMaterial::Stone), 1))
        .with_item(2, ItemStack::new(Item::Bread, 12))
        .with_item(3, ItemStack::new(Item::WaterBucket, 1))
        .with_item(10, ItemStack::new(Item::Coal, 24))
        .build();

    link.set_container_contents(
        chest,
        vec![
            Some(ItemStack::new(Item::Helmet, 1)),
            Some(ItemStack::new(Item::RawIron, 18)),
            Some(ItemStack::new(Item::Charcoal, 9)),
            Some(ItemStack::new(Item::Axe(ToolMaterial::Stone), 1)),
        ],
    );
    link.set_container_contents(
        furnace,
        vec![
            Some(ItemStack::new(Item::RawCopper, 3)),
            Some(ItemStack::new(Item::Coal, 2)),
            None,
        ],
    );
    link
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_world::WorldLink;

    #[test]
    fn demo_world_has_the_expected_fixtures() {
        let link = build_world();
        assert!(link.block(BlockPos::new(3, 65, -2)).is_furnace());
        assert!(link.block(BlockPos::new(4, 65, 2)).is_chest());
        assert!(link.block(BlockPos::new(-6, 64, 5)).ore().is_some());
        assert!(link.connected());
    }
}
