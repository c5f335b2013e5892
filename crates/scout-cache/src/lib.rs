//! Lazily refreshed, budgeted views of the world around an observer.
#![forbid(unsafe_code)]

pub mod blocks;
pub mod config;
pub mod containers;
pub mod entities;
pub mod error;
pub mod gate;
pub mod hub;

pub use blocks::{BlockScanCache, ScanCacheStats, ScanStatus};
pub use config::{
    CacheConfig, ContainerConfig, EntityConfig, ScanConfig, load_config_from_path,
};
pub use containers::{ContainerCache, ContainerEntry, ContainerKind, ContainerMatch};
pub use entities::{Classification, EntityClassifier, ProjectileInfo, ThreatInfo};
pub use error::ConfigError;
pub use gate::UpdateGate;
pub use hub::{StepReport, WorldCaches};
