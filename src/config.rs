use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

use scout_cache::CacheConfig;

/// Whole harness config file: the cache sections plus `[sim]`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub sim: SimConfig,
    #[serde(flatten)]
    pub caches: CacheConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SimConfig {
    #[serde(default = "default_seed")]
    pub seed: i32,
    #[serde(default = "default_steps")]
    pub steps: u64,
    /// Half-width of the generated square of terrain, in blocks.
    #[serde(default = "default_extent")]
    pub extent: i32,
    #[serde(default = "default_min_y")]
    pub min_y: i32,
    #[serde(default = "default_max_y")]
    pub max_y: i32,
    #[serde(default = "default_height_freq")]
    pub height_frequency: f32,
    #[serde(default = "default_base_height")]
    pub base_height: i32,
    #[serde(default = "default_height_amplitude")]
    pub height_amplitude: f32,
    #[serde(default = "default_ore_freq")]
    pub ore_frequency: f32,
    /// Ore noise above this value becomes ore.
    #[serde(default = "default_ore_threshold")]
    pub ore_threshold: f32,
    #[serde(default = "default_tracked")]
    pub tracked: Vec<String>,
    #[serde(default = "default_hostiles")]
    pub hostiles: u32,
    #[serde(default = "default_passives")]
    pub passives: u32,
    #[serde(default = "default_chests")]
    pub chests: u32,
    /// Observer walk speed in blocks per tick.
    #[serde(default = "default_walk_speed")]
    pub walk_speed: f32,
    /// The observer mines its nearest tracked block every this many ticks.
    #[serde(default = "default_mine_every")]
    pub mine_every: u64,
    #[serde(default = "default_report_every")]
    pub report_every: u64,
}

fn default_seed() -> i32 {
    1337
}
fn default_steps() -> u64 {
    600
}
fn default_extent() -> i32 {
    48
}
fn default_min_y() -> i32 {
    0
}
fn default_max_y() -> i32 {
    96
}
fn default_height_freq() -> f32 {
    0.02
}
fn default_base_height() -> i32 {
    48
}
fn default_height_amplitude() -> f32 {
    12.0
}
fn default_ore_freq() -> f32 {
    0.15
}
fn default_ore_threshold() -> f32 {
    0.72
}
fn default_tracked() -> Vec<String> {
    vec![
        "minecraft:iron_ore".to_string(),
        "minecraft:coal_ore".to_string(),
        "minecraft:diamond_ore".to_string(),
    ]
}
fn default_hostiles() -> u32 {
    6
}
fn default_passives() -> u32 {
    4
}
fn default_chests() -> u32 {
    3
}
fn default_walk_speed() -> f32 {
    0.15
}
fn default_mine_every() -> u64 {
    50
}
fn default_report_every() -> u64 {
    100
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            steps: default_steps(),
            extent: default_extent(),
            min_y: default_min_y(),
            max_y: default_max_y(),
            height_frequency: default_height_freq(),
            base_height: default_base_height(),
            height_amplitude: default_height_amplitude(),
            ore_frequency: default_ore_freq(),
            ore_threshold: default_ore_threshold(),
            tracked: default_tracked(),
            hostiles: default_hostiles(),
            passives: default_passives(),
            chests: default_chests(),
            walk_speed: default_walk_speed(),
            mine_every: default_mine_every(),
            report_every: default_report_every(),
        }
    }
}

pub fn load_harness_config(path: &Path) -> Result<HarnessConfig, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    let cfg: HarnessConfig = toml::from_str(&s)?;
    cfg.caches.validate()?;
    if cfg.sim.max_y <= cfg.sim.min_y {
        return Err("sim.max_y must be above sim.min_y".into());
    }
    Ok(cfg)
}
