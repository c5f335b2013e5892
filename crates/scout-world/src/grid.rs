//! Sparse in-memory world used by the harness and by tests.

use hashbrown::HashMap;

use crate::{
    AIR, BlockPos, BlockSample, ContainerWindow, EntityId, EntitySnapshot, ItemStack, RegionCoord,
    Vec3, WorldEvent, WorldView,
};

#[derive(Clone, Debug)]
struct PaletteEntry {
    name: String,
    solid: bool,
}

/// Region-partitioned block store plus the observer's surroundings.
/// Cells that were never set read as air.
pub struct GridWorld {
    palette: Vec<PaletteEntry>,
    by_name: HashMap<String, u16>,
    // Map per-region: key=region -> map of world coords -> palette index
    regions: HashMap<RegionCoord, HashMap<BlockPos, u16>>,
    min_y: i32,
    max_y: i32,
    dimension: String,
    time: u64,
    observer: Vec3,
    observer_id: Option<EntityId>,
    entities: Vec<EntitySnapshot>,
    inventory: Vec<ItemStack>,
}

impl GridWorld {
    pub fn new(min_y: i32, max_y: i32) -> Self {
        let mut world = Self {
            palette: Vec::new(),
            by_name: HashMap::new(),
            regions: HashMap::new(),
            min_y,
            max_y,
            dimension: "overworld".to_string(),
            time: 0,
            observer: Vec3::ZERO,
            observer_id: None,
            entities: Vec::new(),
            inventory: Vec::new(),
        };
        world.register_block(AIR, false);
        world
    }

    /// Registers (or re-flags) a block type and returns its palette index.
    pub fn register_block(&mut self, name: &str, solid: bool) -> u16 {
        if let Some(&id) = self.by_name.get(name) {
            self.palette[id as usize].solid = solid;
            return id;
        }
        let id = self.palette.len() as u16;
        self.palette.push(PaletteEntry {
            name: name.to_string(),
            solid,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    fn palette_id(&mut self, name: &str) -> u16 {
        match self.by_name.get(name) {
            Some(&id) => id,
            None => self.register_block(name, name != AIR),
        }
    }

    /// Sets a block and returns the change event a live environment would emit.
    /// Returns `None` if the cell already held that block or lies outside the
    /// height bounds.
    pub fn set_block(&mut self, pos: BlockPos, name: &str) -> Option<WorldEvent> {
        if pos.y < self.min_y || pos.y >= self.max_y {
            return None;
        }
        let id = self.palette_id(name);
        let region = self.regions.entry(RegionCoord::of(pos)).or_default();
        let prev = if id == 0 {
            region.remove(&pos)
        } else {
            region.insert(pos, id)
        };
        let prev = prev.unwrap_or(0);
        if prev == id {
            return None;
        }
        Some(WorldEvent::BlockChanged {
            pos,
            old: self.palette[prev as usize].name.clone(),
            new: self.palette[id as usize].name.clone(),
        })
    }

    /// Fills the inclusive box `a..=b` without producing events (world setup).
    pub fn fill(&mut self, a: BlockPos, b: BlockPos, name: &str) {
        for y in a.y.min(b.y)..=a.y.max(b.y) {
            for z in a.z.min(b.z)..=a.z.max(b.z) {
                for x in a.x.min(b.x)..=a.x.max(b.x) {
                    let _ = self.set_block(BlockPos::new(x, y, z), name);
                }
            }
        }
    }

    /// Drops all stored blocks of a region and returns the unload event.
    pub fn unload_region(&mut self, region: RegionCoord) -> WorldEvent {
        self.regions.remove(&region);
        WorldEvent::RegionUnloaded {
            dimension: self.dimension.clone(),
            region,
        }
    }

    pub fn block_count(&self) -> usize {
        self.regions.values().map(|m| m.len()).sum()
    }

    pub fn set_dimension(&mut self, dimension: impl Into<String>) {
        self.dimension = dimension.into();
    }

    pub fn set_observer(&mut self, position: Vec3, id: Option<EntityId>) {
        self.observer = position;
        self.observer_id = id;
    }

    pub fn move_observer(&mut self, position: Vec3) {
        self.observer = position;
    }

    pub fn advance(&mut self, ticks: u64) {
        self.time = self.time.saturating_add(ticks);
    }

    pub fn spawn(&mut self, entity: EntitySnapshot) {
        self.entities.retain(|e| e.id != entity.id);
        self.entities.push(entity);
    }

    pub fn despawn(&mut self, id: EntityId) {
        self.entities.retain(|e| e.id != id);
    }

    pub fn entities_mut(&mut self) -> &mut Vec<EntitySnapshot> {
        &mut self.entities
    }

    pub fn set_inventory(&mut self, items: Vec<ItemStack>) {
        self.inventory = items;
    }

    /// Builds a window for a container whose first `container_slots` slots hold `items`.
    pub fn container_window(id: u32, container_slots: u16, items: &[(&str, u32)]) -> ContainerWindow {
        let slots = items
            .iter()
            .enumerate()
            .map(|(i, (name, count))| ItemStack::new(*name, *count, i as u16))
            .collect();
        ContainerWindow {
            id,
            container_slots,
            slots,
        }
    }
}

impl WorldView for GridWorld {
    fn observer_position(&self) -> Vec3 {
        self.observer
    }

    fn observer_id(&self) -> Option<EntityId> {
        self.observer_id
    }

    fn block_at(&self, pos: BlockPos) -> Option<BlockSample<'_>> {
        if pos.y < self.min_y || pos.y >= self.max_y {
            return None;
        }
        let id = self
            .regions
            .get(&RegionCoord::of(pos))
            .and_then(|m| m.get(&pos).copied())
            .unwrap_or(0);
        self.palette.get(id as usize).map(|p| BlockSample {
            name: p.name.as_str(),
            solid: p.solid,
        })
    }

    fn time(&self) -> u64 {
        self.time
    }

    fn height_bounds(&self) -> (i32, i32) {
        (self.min_y, self.max_y)
    }

    fn dimension(&self) -> &str {
        &self.dimension
    }

    fn entities(&self) -> &[EntitySnapshot] {
        &self.entities
    }

    fn inventory(&self) -> &[ItemStack] {
        &self.inventory
    }
}
