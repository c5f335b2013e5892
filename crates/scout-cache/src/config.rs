use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub entities: EntityConfig,
    #[serde(default)]
    pub containers: ContainerConfig,
}

impl CacheConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: CacheConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scan.validate()?;
        self.entities.validate()?;
        self.containers.validate()
    }
}

pub fn load_config_from_path(path: &Path) -> Result<CacheConfig, ConfigError> {
    let s = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    CacheConfig::from_toml_str(&s)
}

#[derive(Clone, Debug, Deserialize)]
pub struct ScanConfig {
    /// Half-extent of the scanned cube, in blocks.
    #[serde(default = "default_scan_radius")]
    pub radius: i32,
    #[serde(default = "default_cells_per_step")]
    pub cells_per_step: usize,
    #[serde(default = "default_max_positions")]
    pub max_positions_per_type: usize,
    /// Ticks until the next scan when the last one found new blocks.
    #[serde(default = "default_rescan_found")]
    pub rescan_interval_found: u64,
    /// Ticks until the next scan when the last one found nothing new.
    #[serde(default = "default_rescan_idle")]
    pub rescan_interval_idle: u64,
    #[serde(default = "default_blacklist_growth")]
    pub blacklist_growth: f32,
    #[serde(default = "default_blacklist_max_delay")]
    pub blacklist_max_delay_secs: f32,
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u32,
}

fn default_scan_radius() -> i32 {
    32
}
fn default_cells_per_step() -> usize {
    4096
}
fn default_max_positions() -> usize {
    64
}
fn default_rescan_found() -> u64 {
    40
}
fn default_rescan_idle() -> u64 {
    200
}
fn default_blacklist_growth() -> f32 {
    2.0
}
fn default_blacklist_max_delay() -> f32 {
    600.0
}
fn default_ticks_per_second() -> u32 {
    20
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            radius: default_scan_radius(),
            cells_per_step: default_cells_per_step(),
            max_positions_per_type: default_max_positions(),
            rescan_interval_found: default_rescan_found(),
            rescan_interval_idle: default_rescan_idle(),
            blacklist_growth: default_blacklist_growth(),
            blacklist_max_delay_secs: default_blacklist_max_delay(),
            ticks_per_second: default_ticks_per_second(),
        }
    }
}

impl ScanConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.radius < 0 {
            return Err(ConfigError::Invalid {
                field: "scan.radius",
                reason: "must not be negative",
            });
        }
        if self.cells_per_step == 0 {
            return Err(ConfigError::Invalid {
                field: "scan.cells_per_step",
                reason: "must be at least 1",
            });
        }
        if self.max_positions_per_type == 0 {
            return Err(ConfigError::Invalid {
                field: "scan.max_positions_per_type",
                reason: "must be at least 1",
            });
        }
        if !(self.blacklist_growth >= 1.0) {
            return Err(ConfigError::Invalid {
                field: "scan.blacklist_growth",
                reason: "must be >= 1.0",
            });
        }
        if self.ticks_per_second == 0 {
            return Err(ConfigError::Invalid {
                field: "scan.ticks_per_second",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct EntityConfig {
    #[serde(default = "default_entity_refresh")]
    pub refresh_interval: u64,
    #[serde(default = "default_close_radius")]
    pub close_radius: f32,
    #[serde(default = "default_gravity")]
    pub projectile_gravity: f32,
    #[serde(default = "default_projectile_steps")]
    pub projectile_max_steps: u32,
    /// Range within which a hostile facing the observer counts as targeting it.
    #[serde(default = "default_target_range")]
    pub facing_target_range: f32,
    #[serde(default = "default_facing_cos")]
    pub facing_cos_threshold: f32,
    /// Closest-approach distance below which a projectile counts as incoming.
    #[serde(default = "default_approach")]
    pub projectile_approach_distance: f32,
    #[serde(default = "default_alignment")]
    pub projectile_alignment: f32,
}

fn default_entity_refresh() -> u64 {
    1
}
fn default_close_radius() -> f32 {
    6.0
}
fn default_gravity() -> f32 {
    0.05
}
fn default_projectile_steps() -> u32 {
    100
}
fn default_target_range() -> f32 {
    16.0
}
fn default_facing_cos() -> f32 {
    0.85
}
fn default_approach() -> f32 {
    4.0
}
fn default_alignment() -> f32 {
    0.5
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            refresh_interval: default_entity_refresh(),
            close_radius: default_close_radius(),
            projectile_gravity: default_gravity(),
            projectile_max_steps: default_projectile_steps(),
            facing_target_range: default_target_range(),
            facing_cos_threshold: default_facing_cos(),
            projectile_approach_distance: default_approach(),
            projectile_alignment: default_alignment(),
        }
    }
}

impl EntityConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.close_radius >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "entities.close_radius",
                reason: "must not be negative",
            });
        }
        if !(-1.0..=1.0).contains(&self.facing_cos_threshold) {
            return Err(ConfigError::Invalid {
                field: "entities.facing_cos_threshold",
                reason: "must lie in [-1, 1]",
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ContainerConfig {
    #[serde(default = "default_max_containers")]
    pub max_entries: usize,
    /// Ticks a snapshot stays valid after capture.
    #[serde(default = "default_container_ttl")]
    pub ttl: u64,
    #[serde(default = "default_container_refresh")]
    pub refresh_interval: u64,
    /// Only containers within this distance contribute to item counts.
    #[serde(default = "default_container_range")]
    pub range: f32,
}

fn default_max_containers() -> usize {
    64
}
fn default_container_ttl() -> u64 {
    6000
}
fn default_container_refresh() -> u64 {
    20
}
fn default_container_range() -> f32 {
    64.0
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_containers(),
            ttl: default_container_ttl(),
            refresh_interval: default_container_refresh(),
            range: default_container_range(),
        }
    }
}

impl ContainerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(ConfigError::Invalid {
                field: "containers.max_entries",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = CacheConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.scan.radius, 32);
        assert_eq!(cfg.entities.projectile_max_steps, 100);
        assert_eq!(cfg.containers.ttl, 6000);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = CacheConfig::from_toml_str(
            r#"
            [scan]
            radius = 128
            max_positions_per_type = 40

            [containers]
            range = 16.0
        "#,
        )
        .unwrap();
        assert_eq!(cfg.scan.radius, 128);
        assert_eq!(cfg.scan.max_positions_per_type, 40);
        assert_eq!(cfg.scan.cells_per_step, 4096);
        assert_eq!(cfg.containers.range, 16.0);
        assert_eq!(cfg.containers.max_entries, 64);
    }

    #[test]
    fn rejects_invalid_values() {
        let err = CacheConfig::from_toml_str("[scan]\ncells_per_step = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "scan.cells_per_step",
                ..
            }
        ));
        let err = CacheConfig::from_toml_str("[scan]\nblacklist_growth = 0.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        let err = CacheConfig::from_toml_str("[scan\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
