//! Snapshots of container contents captured when a container window closes.

use hashbrown::HashMap;
use scout_geom::BlockPos;
use scout_world::{ContainerWindow, RegionCoord, WorldView, strip_namespace};

use crate::config::ContainerConfig;
use crate::gate::UpdateGate;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Furnace,
    Hopper,
    Dispenser,
    Chest,
    LargeChest,
    Unknown(u16),
}

impl ContainerKind {
    /// Inferred from the number of container (non-player) slots.
    pub fn from_slot_count(slots: u16) -> Self {
        match slots {
            3 => ContainerKind::Furnace,
            5 => ContainerKind::Hopper,
            9 => ContainerKind::Dispenser,
            27 => ContainerKind::Chest,
            54 => ContainerKind::LargeChest,
            n => ContainerKind::Unknown(n),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedItem {
    pub name: String,
    pub count: u32,
    pub slot: u16,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContainerEntry {
    pub pos: BlockPos,
    pub dimension: String,
    pub items: Vec<CachedItem>,
    pub kind: ContainerKind,
    pub captured_at: u64,
    pub last_accessed: u64,
}

impl ContainerEntry {
    pub fn count_of(&self, names: &[&str]) -> u32 {
        self.items
            .iter()
            .filter(|i| matches_any(&i.name, names))
            .map(|i| i.count)
            .sum()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContainerMatch {
    pub pos: BlockPos,
    pub distance: f32,
    pub count: u32,
}

#[derive(Clone, Debug)]
struct OpenContainer {
    pos: BlockPos,
    dimension: String,
    window_id: u32,
}

fn matches_any(item: &str, names: &[&str]) -> bool {
    let item = strip_namespace(item);
    names.iter().any(|n| strip_namespace(n) == item)
}

/// Event-driven container memory. Nothing is scanned: entries appear when a
/// container closes and disappear by TTL, LRU trimming, explicit
/// invalidation, or region unload.
pub struct ContainerCache {
    cfg: ContainerConfig,
    gate: UpdateGate,
    entries: HashMap<BlockPos, ContainerEntry>,
    open: Option<OpenContainer>,
}

impl ContainerCache {
    pub fn new(cfg: ContainerConfig) -> Self {
        Self {
            gate: UpdateGate::new(cfg.refresh_interval),
            cfg,
            entries: HashMap::new(),
            open: None,
        }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.cfg
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the currently open container, if any.
    pub fn open_container(&self) -> Option<BlockPos> {
        self.open.as_ref().map(|o| o.pos)
    }

    /// CLOSED -> OPEN. A second open before a close overwrites the first.
    pub fn on_container_opened(&mut self, pos: BlockPos, window_id: u32, dimension: &str) {
        if let Some(prev) = &self.open {
            log::debug!(
                target: "containers",
                "open at ({}, {}, {}) replaces unclosed ({}, {}, {})",
                pos.x, pos.y, pos.z, prev.pos.x, prev.pos.y, prev.pos.z
            );
        }
        self.open = Some(OpenContainer {
            pos,
            dimension: dimension.to_string(),
            window_id,
        });
    }

    /// OPEN -> CLOSED: snapshots the container slots of `window` under the
    /// recorded position. Returns false if nothing was open.
    pub fn on_container_closed(&mut self, window: &ContainerWindow, now: u64) -> bool {
        let Some(open) = self.open.take() else {
            log::debug!(target: "containers", "close of window {} with nothing open", window.id);
            return false;
        };
        if open.window_id != window.id {
            log::debug!(
                target: "containers",
                "closed window {} but window {} was recorded open",
                window.id, open.window_id
            );
        }
        let items: Vec<CachedItem> = window
            .container_items()
            .map(|s| CachedItem {
                name: strip_namespace(&s.name).to_string(),
                count: s.count,
                slot: s.slot,
            })
            .collect();
        log::debug!(
            target: "containers",
            "[tick {}] captured ({}, {}, {}) stacks={}",
            now, open.pos.x, open.pos.y, open.pos.z, items.len()
        );
        self.entries.insert(
            open.pos,
            ContainerEntry {
                pos: open.pos,
                dimension: open.dimension,
                items,
                kind: ContainerKind::from_slot_count(window.container_slots),
                captured_at: now,
                last_accessed: now,
            },
        );
        self.trim_to_capacity();
        true
    }

    /// Drops every entry inside the unloaded region, regardless of TTL.
    pub fn on_region_unloaded(&mut self, dimension: &str, region: RegionCoord) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|pos, e| !(e.dimension == dimension && region.contains(*pos)));
        let purged = before - self.entries.len();
        if purged > 0 {
            log::debug!(
                target: "containers",
                "region ({}, {}) unloaded, dropped {} container(s)",
                region.rx, region.rz, purged
            );
        }
        purged
    }

    pub fn invalidate(&mut self, pos: BlockPos) -> bool {
        self.entries.remove(&pos).is_some()
    }

    /// Any block change at a cached position means the container there was
    /// broken or replaced.
    pub fn on_block_changed(&mut self, pos: BlockPos) -> bool {
        self.invalidate(pos)
    }

    fn trim_to_capacity(&mut self) {
        while self.entries.len() > self.cfg.max_entries {
            let victim = self
                .entries
                .values()
                .min_by_key(|e| (e.last_accessed, e.captured_at))
                .map(|e| e.pos);
            match victim {
                Some(pos) => {
                    self.entries.remove(&pos);
                }
                None => break,
            }
        }
    }

    #[inline]
    fn is_expired(&self, entry: &ContainerEntry, now: u64) -> bool {
        now.saturating_sub(entry.captured_at) > self.cfg.ttl
    }

    /// Purges TTL-expired entries when the gate is due. Never scans.
    pub fn ensure_fresh<W: WorldView + ?Sized>(&mut self, world: &W) {
        let now = world.time();
        if !self.gate.is_due(now) {
            return;
        }
        let ttl = self.cfg.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_sub(e.captured_at) <= ttl);
        let purged = before - self.entries.len();
        if purged > 0 {
            log::debug!(target: "containers", "[tick {}] expired {} container(s)", now, purged);
        }
        self.gate.refreshed(now);
    }

    fn in_range<'a, W: WorldView + ?Sized>(
        &'a self,
        world: &'a W,
    ) -> impl Iterator<Item = (&'a ContainerEntry, f32)> + 'a {
        let now = world.time();
        let observer = world.observer_position();
        let dimension = world.dimension();
        let range = self.cfg.range;
        self.entries.values().filter_map(move |e| {
            if e.dimension != dimension || self.is_expired(e, now) {
                return None;
            }
            let d = e.pos.center().distance(observer);
            (d <= range).then_some((e, d))
        })
    }

    pub fn inventory_count<W: WorldView + ?Sized>(&self, world: &W, names: &[&str]) -> u32 {
        world
            .inventory()
            .iter()
            .filter(|s| matches_any(&s.name, names))
            .map(|s| s.count)
            .sum()
    }

    /// Inventory plus every in-range cached container in the current dimension.
    pub fn item_count<W: WorldView + ?Sized>(&mut self, world: &W, names: &[&str]) -> u32 {
        self.ensure_fresh(world);
        let stored: u32 = self.in_range(world).map(|(e, _)| e.count_of(names)).sum();
        self.inventory_count(world, names) + stored
    }

    pub fn has_item<W: WorldView + ?Sized>(&mut self, world: &W, names: &[&str]) -> bool {
        self.item_count(world, names) > 0
    }

    /// In-range containers holding any of `names`, nearest first.
    pub fn containers_with_item<W: WorldView + ?Sized>(
        &mut self,
        world: &W,
        names: &[&str],
    ) -> Vec<ContainerMatch> {
        self.ensure_fresh(world);
        let mut out: Vec<ContainerMatch> = self
            .in_range(world)
            .filter_map(|(e, distance)| {
                let count = e.count_of(names);
                (count > 0).then_some(ContainerMatch {
                    pos: e.pos,
                    distance,
                    count,
                })
            })
            .collect();
        out.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        out
    }

    /// Cached snapshot at `pos`; refreshes its access time.
    pub fn container_at<W: WorldView + ?Sized>(
        &mut self,
        world: &W,
        pos: BlockPos,
    ) -> Option<ContainerEntry> {
        self.ensure_fresh(world);
        let now = world.time();
        if self.is_expired(self.entries.get(&pos)?, now) {
            return None;
        }
        let entry = self.entries.get_mut(&pos)?;
        entry.last_accessed = now;
        Some(entry.clone())
    }
}
