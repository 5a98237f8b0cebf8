//! Flat agent configuration.
//!
//! Owned by the embedding collaborator (the CLI loads and saves it as TOML);
//! the core reads it per cycle and never mutates it.  Every field has a
//! serde default so partial documents load cleanly.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use vigil_types::OreKind;

/// Flat set of toggles and thresholds consumed by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    // ── Movement ─────────────────────────────────────────────────────────────
    pub enable_movement: bool,

    // ── Combat & survival ────────────────────────────────────────────────────
    pub enable_combat: bool,
    pub auto_eat: bool,
    /// Eat when health drops below this fraction of max health.
    pub health_threshold: f32,
    /// Eat when satiation drops below this level.
    pub hunger_threshold: u32,
    pub water_bucket_clutch: bool,
    /// Drop distance (cells) above which the clutch fires.
    pub clutch_height: f64,

    // ── Furnace automation ───────────────────────────────────────────────────
    pub enable_furnace_management: bool,
    pub auto_fuel_furnaces: bool,
    pub auto_smelt_items: bool,
    pub auto_collect_output: bool,

    // ── Mining ───────────────────────────────────────────────────────────────
    pub enable_mining: bool,
    pub mine_coal: bool,
    pub mine_iron: bool,
    pub mine_gold: bool,
    pub mine_diamond: bool,
    pub mine_emerald: bool,
    pub mine_redstone: bool,
    /// Only target ores with at least one exposed face.
    pub only_visible_ores: bool,

    // ── Chests ───────────────────────────────────────────────────────────────
    pub enable_chest_interaction: bool,

    // ── Chat ─────────────────────────────────────────────────────────────────
    pub enable_random_chat: bool,
    /// Per-cycle probability of sending one of the chat lines.
    pub chat_frequency: f64,
    pub chat_messages: Vec<String>,

    // ── Safety ───────────────────────────────────────────────────────────────
    pub pause_on_player_nearby: bool,
    pub player_detection_radius: f64,
    pub pause_on_low_health: bool,
    /// Fraction of max health below which the agent freezes.
    pub emergency_health_threshold: f32,

    // ── Reproducibility ──────────────────────────────────────────────────────
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enable_movement: true,
            enable_combat: true,
            auto_eat: true,
            health_threshold: 0.7,
            hunger_threshold: 16,
            water_bucket_clutch: true,
            clutch_height: 10.0,
            enable_furnace_management: true,
            auto_fuel_furnaces: true,
            auto_smelt_items: true,
            auto_collect_output: true,
            enable_mining: true,
            mine_coal: true,
            mine_iron: true,
            mine_gold: true,
            mine_diamond: true,
            mine_emerald: true,
            mine_redstone: true,
            only_visible_ores: true,
            enable_chest_interaction: true,
            enable_random_chat: false,
            chat_frequency: 0.0001,
            chat_messages: default_chat_messages(),
            pause_on_player_nearby: true,
            player_detection_radius: 32.0,
            pause_on_low_health: true,
            emergency_health_threshold: 0.3,
            rng_seed: None,
        }
    }
}

fn default_chat_messages() -> Vec<String> {
    [
        "nice view here",
        "hmm",
        "interesting",
        "checking things out",
        "exploring a bit",
        "looking for resources",
        "just mining around",
    ]
    .map(str::to_string)
    .to_vec()
}

impl AgentConfig {
    /// Returns the configured RNG seed, generating one from entropy if absent.
    pub fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::seed_from_u64(rand::random()),
        }
    }

    /// Whether the planner is allowed to target this ore kind.
    pub fn mines_ore(&self, kind: OreKind) -> bool {
        match kind {
            OreKind::Coal => self.mine_coal,
            OreKind::Iron => self.mine_iron,
            OreKind::Gold => self.mine_gold,
            OreKind::Diamond => self.mine_diamond,
            OreKind::Emerald => self.mine_emerald,
            OreKind::Redstone => self.mine_redstone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_conservative_about_chat() {
        let cfg = AgentConfig::default();
        assert!(!cfg.enable_random_chat);
        assert!(cfg.enable_combat);
        assert!(cfg.water_bucket_clutch);
    }

    #[test]
    fn partial_document_fills_missing_fields() {
        let cfg: AgentConfig = serde_json::from_str(r#"{"enable_combat": false}"#).unwrap();
        assert!(!cfg.enable_combat);
        assert!(cfg.enable_mining);
        assert_eq!(cfg.hunger_threshold, 16);
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        use rand::Rng;
        let cfg = AgentConfig {
            rng_seed: Some(42),
            ..AgentConfig::default()
        };
        let a: u64 = cfg.seeded_rng().gen_range(0..u64::MAX);
        let b: u64 = cfg.seeded_rng().gen_range(0..u64::MAX);
        assert_eq!(a, b);
    }

    #[test]
    fn ore_toggles_map_to_kinds() {
        let cfg = AgentConfig {
            mine_redstone: false,
            ..AgentConfig::default()
        };
        assert!(cfg.mines_ore(OreKind::Diamond));
        assert!(!cfg.mines_ore(OreKind::Redstone));
    }
}
