//! Read-only world access and the world-mutation events the caches consume.
#![forbid(unsafe_code)]

pub mod grid;

pub use grid::GridWorld;
pub use scout_geom::{BlockPos, Vec3};
use serde::{Deserialize, Serialize};

pub type EntityId = u64;

/// Blocks per region edge. Regions are the unit of load/unload.
pub const REGION_SIZE: i32 = 16;

/// Name used for empty cells.
pub const AIR: &str = "air";

/// Strips a `namespace:` prefix so `minecraft:iron_ore` and `iron_ore` compare equal.
#[inline]
pub fn strip_namespace(name: &str) -> &str {
    match name.rsplit_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSample<'a> {
    pub name: &'a str,
    pub solid: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionCoord {
    pub rx: i32,
    pub rz: i32,
}

impl RegionCoord {
    #[inline]
    pub const fn new(rx: i32, rz: i32) -> Self {
        Self { rx, rz }
    }

    #[inline]
    pub fn of(pos: BlockPos) -> Self {
        Self {
            rx: pos.x.div_euclid(REGION_SIZE),
            rz: pos.z.div_euclid(REGION_SIZE),
        }
    }

    /// Regions span the whole vertical range, so only x/z matter.
    #[inline]
    pub fn contains(self, pos: BlockPos) -> bool {
        Self::of(pos) == self
    }
}

impl From<(i32, i32)> for RegionCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

/// One visible entity as reported by the environment adapter. Optional,
/// version-dependent fields are resolved here, before any cache sees them.
#[derive(Clone, Debug, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: String,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Unit look direction.
    pub facing: Vec3,
    pub health: f32,
    pub max_health: f32,
    pub target: Option<EntityId>,
    /// Visible pre-attack indicator (fuse lit, bow drawn, charging fireball).
    pub charging: bool,
}

impl EntitySnapshot {
    pub fn new(id: EntityId, kind: impl Into<String>, position: Vec3) -> Self {
        Self {
            id,
            kind: kind.into(),
            position,
            velocity: Vec3::ZERO,
            facing: Vec3::new(0.0, 0.0, 1.0),
            health: 20.0,
            max_health: 20.0,
            target: None,
            charging: false,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_facing(mut self, facing: Vec3) -> Self {
        self.facing = facing.normalized();
        self
    }

    pub fn with_health(mut self, health: f32, max_health: f32) -> Self {
        self.health = health;
        self.max_health = max_health;
        self
    }

    pub fn with_target(mut self, target: Option<EntityId>) -> Self {
        self.target = target;
        self
    }

    pub fn with_charging(mut self, charging: bool) -> Self {
        self.charging = charging;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub name: String,
    pub count: u32,
    pub slot: u16,
}

impl ItemStack {
    pub fn new(name: impl Into<String>, count: u32, slot: u16) -> Self {
        Self {
            name: name.into(),
            count,
            slot,
        }
    }
}

/// Contents of an open container window. Slots `0..container_slots` belong to
/// the container; higher slot indices are the player's own inventory shown in
/// the same window.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContainerWindow {
    pub id: u32,
    pub container_slots: u16,
    pub slots: Vec<ItemStack>,
}

impl ContainerWindow {
    pub fn container_items(&self) -> impl Iterator<Item = &ItemStack> {
        self.slots
            .iter()
            .filter(move |s| s.slot < self.container_slots && s.count > 0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum WorldEvent {
    BlockChanged {
        pos: BlockPos,
        old: String,
        new: String,
    },
    ContainerOpened {
        pos: BlockPos,
        window_id: u32,
    },
    ContainerClosed {
        window: ContainerWindow,
    },
    RegionUnloaded {
        dimension: String,
        region: RegionCoord,
    },
}

/// Synchronous, side-effect-free view of the world around the observer.
pub trait WorldView {
    fn observer_position(&self) -> Vec3;

    /// The observer's own entity id, excluded from entity classification.
    fn observer_id(&self) -> Option<EntityId>;

    fn block_at(&self, pos: BlockPos) -> Option<BlockSample<'_>>;

    /// Monotonic world tick counter.
    fn time(&self) -> u64;

    /// Valid block heights as `min_y..max_y` (max exclusive).
    fn height_bounds(&self) -> (i32, i32);

    /// Identifier of the loaded world region set (dimension).
    fn dimension(&self) -> &str;

    fn entities(&self) -> &[EntitySnapshot];

    /// Observer inventory contents.
    fn inventory(&self) -> &[ItemStack];

    #[inline]
    fn is_solid(&self, pos: BlockPos) -> bool {
        self.block_at(pos).is_some_and(|b| b.solid)
    }
}
