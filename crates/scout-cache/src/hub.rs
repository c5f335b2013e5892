use crossbeam_channel::{Receiver, Sender, unbounded};
use scout_world::{WorldEvent, WorldView};

use crate::blocks::{BlockScanCache, ScanStatus};
use crate::config::CacheConfig;
use crate::containers::ContainerCache;
use crate::entities::EntityClassifier;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport {
    pub events_applied: usize,
    pub scan: ScanStatus,
}

/// Owns the three caches and the channel world-mutation events arrive on.
///
/// Producers push into [`WorldCaches::events`]; [`WorldCaches::tick`] applies
/// every queued event before advancing the block scan, so queries made after
/// a tick always see that step's events.
pub struct WorldCaches {
    pub blocks: BlockScanCache,
    pub entities: EntityClassifier,
    pub containers: ContainerCache,
    tx: Sender<WorldEvent>,
    rx: Receiver<WorldEvent>,
}

impl WorldCaches {
    pub fn new(cfg: &CacheConfig) -> Self {
        let (tx, rx) = unbounded();
        Self {
            blocks: BlockScanCache::new(cfg.scan.clone()),
            entities: EntityClassifier::new(cfg.entities.clone()),
            containers: ContainerCache::new(cfg.containers.clone()),
            tx,
            rx,
        }
    }

    /// Handle for producers; events are applied on the next `tick`.
    pub fn events(&self) -> Sender<WorldEvent> {
        self.tx.clone()
    }

    pub fn pending_events(&self) -> usize {
        self.rx.len()
    }

    /// Applies one event synchronously.
    pub fn handle_event<W: WorldView + ?Sized>(&mut self, world: &W, event: WorldEvent) {
        let tick = world.time();
        match event {
            WorldEvent::BlockChanged { pos, old, new } => {
                log::trace!(target: "events", "[tick {}] BlockChanged ({},{},{}) {} -> {}",
                    tick, pos.x, pos.y, pos.z, old, new);
                self.blocks
                    .on_block_changed(pos, &old, &new, world.observer_position());
                if self.containers.on_block_changed(pos) {
                    log::debug!(target: "events", "[tick {}] container at ({},{},{}) removed",
                        tick, pos.x, pos.y, pos.z);
                }
            }
            WorldEvent::ContainerOpened { pos, window_id } => {
                log::debug!(target: "events", "[tick {}] ContainerOpened ({},{},{}) window={}",
                    tick, pos.x, pos.y, pos.z, window_id);
                self.containers
                    .on_container_opened(pos, window_id, world.dimension());
            }
            WorldEvent::ContainerClosed { window } => {
                log::debug!(target: "events", "[tick {}] ContainerClosed window={}", tick, window.id);
                self.containers.on_container_closed(&window, tick);
            }
            WorldEvent::RegionUnloaded { dimension, region } => {
                log::debug!(target: "events", "[tick {}] RegionUnloaded {} ({}, {})",
                    tick, dimension, region.rx, region.rz);
                self.containers.on_region_unloaded(&dimension, region);
            }
        }
    }

    pub fn drain_events<W: WorldView + ?Sized>(&mut self, world: &W) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(world, event);
            applied += 1;
        }
        applied
    }

    /// One step: apply queued events, then advance the block scan.
    pub fn tick<W: WorldView + ?Sized>(&mut self, world: &W) -> StepReport {
        let events_applied = self.drain_events(world);
        let scan = self.blocks.tick(world);
        StepReport {
            events_applied,
            scan,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_geom::{BlockPos, Vec3};
    use scout_world::{GridWorld, RegionCoord};

    fn small() -> CacheConfig {
        let mut cfg = CacheConfig::default();
        cfg.scan.radius = 4;
        cfg.scan.cells_per_step = 1000;
        cfg
    }

    #[test]
    fn queued_block_change_visible_after_tick() {
        let mut world = GridWorld::new(-16, 16);
        let mut caches = WorldCaches::new(&small());
        let tx = caches.events();
        caches.blocks.track("diamond_ore");
        caches.blocks.ensure_fresh(&world);
        assert!(matches!(caches.tick(&world).scan, ScanStatus::Completed { .. }));

        let pos = BlockPos::new(2, 0, 2);
        if let Some(ev) = world.set_block(pos, "diamond_ore") {
            tx.send(ev).unwrap();
        }
        assert_eq!(caches.pending_events(), 1);
        assert_eq!(caches.blocks.nearest(&world, "diamond_ore"), None);
        let report = caches.tick(&world);
        assert_eq!(report.events_applied, 1);
        assert_eq!(caches.blocks.nearest(&world, "diamond_ore"), Some(pos));
    }

    #[test]
    fn container_lifecycle_through_events() {
        let mut world = GridWorld::new(-64, 320);
        world.set_observer(Vec3::new(0.0, 64.0, 0.0), None);
        let mut caches = WorldCaches::new(&CacheConfig::default());
        let tx = caches.events();
        let p = BlockPos::new(1, 64, 1);
        world.set_block(p, "chest");
        tx.send(WorldEvent::ContainerOpened { pos: p, window_id: 4 }).unwrap();
        tx.send(WorldEvent::ContainerClosed {
            window: GridWorld::container_window(4, 27, &[("a", 1), ("b", 2), ("c", 3)]),
        })
        .unwrap();
        caches.tick(&world);
        assert_eq!(caches.containers.item_count(&world, &["c"]), 3);

        tx.send(world.unload_region(RegionCoord::of(p))).unwrap();
        caches.tick(&world);
        assert!(caches.containers.container_at(&world, p).is_none());
    }

    #[test]
    fn breaking_a_container_block_invalidates_it() {
        let mut world = GridWorld::new(-64, 320);
        let mut caches = WorldCaches::new(&CacheConfig::default());
        let p = BlockPos::new(0, 64, 0);
        world.set_block(p, "chest");
        caches.handle_event(&world, WorldEvent::ContainerOpened { pos: p, window_id: 1 });
        caches.handle_event(
            &world,
            WorldEvent::ContainerClosed {
                window: GridWorld::container_window(1, 27, &[("a", 1)]),
            },
        );
        assert!(caches.containers.container_at(&world, p).is_some());
        if let Some(ev) = world.set_block(p, "air") {
            caches.handle_event(&world, ev);
        }
        assert!(caches.containers.container_at(&world, p).is_none());
    }
}
