//! Incremental block scanning with per-type nearest-first position lists.

mod blacklist;
mod cursor;

pub use blacklist::{Blacklist, BlacklistEntry};
pub use cursor::{ScanCursor, ScanProgress};

use hashbrown::{HashMap, HashSet};
use scout_geom::{BlockPos, Vec3};
use scout_world::{WorldView, strip_namespace};

use crate::config::ScanConfig;
use crate::gate::UpdateGate;

/// `(position, squared distance to the observer when inserted)`, ascending.
pub type PositionList = Vec<(BlockPos, i64)>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScanStatus {
    Idle,
    Scanning { progress: ScanProgress },
    Completed { found_new: bool },
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ScanCacheStats {
    pub tracked_types: usize,
    pub cached_positions: usize,
    pub blacklisted: usize,
    pub scans_completed: u64,
    pub scanning: bool,
}

struct ActiveScan {
    cursor: ScanCursor,
    origin: BlockPos,
    started_at: u64,
    // Types tracked when the scan started; only these get swapped in.
    types: HashSet<String>,
    // Built privately and swapped in on completion.
    pending: HashMap<String, PositionList>,
    found_new: bool,
}

/// Shared, reference-counted interest set of block types, refreshed by a
/// budgeted cube scan around the observer.
///
/// Queries refresh lazily: when the gate is due and no scan is running, a new
/// scan is started; `tick` advances it by `cells_per_step` cells. Lists are
/// double-buffered, so a query never sees a half-built scan.
pub struct BlockScanCache {
    cfg: ScanConfig,
    gate: UpdateGate,
    interest: HashMap<String, u32>,
    positions: HashMap<String, PositionList>,
    blacklist: Blacklist,
    scan: Option<ActiveScan>,
    // New data reported by block-change events since the last completed scan.
    changed_since_scan: bool,
    scans_completed: u64,
}

/// Inserts or moves `pos` keeping ascending distance order, then drops the
/// tail beyond `cap`. Returns true if `pos` was not in the list before.
fn insert_sorted(list: &mut PositionList, pos: BlockPos, dist: i64, cap: usize) -> bool {
    let existed = match list.iter().position(|(p, _)| *p == pos) {
        Some(i) => {
            list.remove(i);
            true
        }
        None => false,
    };
    let idx = list.partition_point(|(_, d)| *d <= dist);
    list.insert(idx, (pos, dist));
    list.truncate(cap);
    !existed
}

fn remove_pos(list: &mut PositionList, pos: BlockPos) -> bool {
    match list.iter().position(|(p, _)| *p == pos) {
        Some(i) => {
            list.remove(i);
            true
        }
        None => false,
    }
}

impl BlockScanCache {
    pub fn new(cfg: ScanConfig) -> Self {
        let blacklist = Blacklist::new(
            cfg.blacklist_growth,
            cfg.blacklist_max_delay_secs,
            cfg.ticks_per_second,
        );
        Self {
            gate: UpdateGate::new(cfg.rescan_interval_idle),
            cfg,
            interest: HashMap::new(),
            positions: HashMap::new(),
            blacklist,
            scan: None,
            changed_since_scan: false,
            scans_completed: 0,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.cfg
    }

    /// Registers interest in `block`. The first registration marks the cache dirty.
    pub fn track(&mut self, block: &str) {
        let key = strip_namespace(block);
        let count = self.interest.entry(key.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            log::debug!(target: "scan", "tracking {}", key);
            self.gate.mark_dirty();
        }
    }

    /// Drops one registration. The last one discards the type's list.
    /// Returns false if `block` was not tracked.
    pub fn untrack(&mut self, block: &str) -> bool {
        let key = strip_namespace(block);
        let Some(count) = self.interest.get_mut(key) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.interest.remove(key);
            self.positions.remove(key);
            if let Some(scan) = self.scan.as_mut() {
                scan.pending.remove(key);
                scan.types.remove(key);
            }
            log::debug!(target: "scan", "untracked {}", key);
        }
        true
    }

    #[inline]
    pub fn is_tracked(&self, block: &str) -> bool {
        self.interest.contains_key(strip_namespace(block))
    }

    pub fn ref_count(&self, block: &str) -> u32 {
        self.interest
            .get(strip_namespace(block))
            .copied()
            .unwrap_or(0)
    }

    /// Starts a scan if the gate is due and none is running.
    pub fn ensure_fresh<W: WorldView + ?Sized>(&mut self, world: &W) {
        if self.scan.is_some() || self.interest.is_empty() {
            return;
        }
        let now = world.time();
        if !self.gate.is_due(now) {
            return;
        }
        let purged = self.blacklist.purge_expired(now);
        let origin = BlockPos::containing(world.observer_position());
        let cursor = ScanCursor::around(origin, self.cfg.radius, world.height_bounds());
        log::debug!(
            target: "scan",
            "[tick {}] scan start at ({}, {}, {}) cells={} types={} purged_blacklist={}",
            now, origin.x, origin.y, origin.z, cursor.progress().total, self.interest.len(), purged
        );
        self.gate.clear_dirty();
        self.scan = Some(ActiveScan {
            cursor,
            origin,
            started_at: now,
            types: self.interest.keys().cloned().collect(),
            pending: HashMap::new(),
            found_new: false,
        });
    }

    /// Advances the running scan by one step's budget.
    pub fn tick<W: WorldView + ?Sized>(&mut self, world: &W) -> ScanStatus {
        let Some(scan) = self.scan.as_mut() else {
            return ScanStatus::Idle;
        };
        let cap = self.cfg.max_positions_per_type;
        for _ in 0..self.cfg.cells_per_step {
            let Some(pos) = scan.cursor.next() else {
                break;
            };
            let Some(sample) = world.block_at(pos) else {
                continue;
            };
            let name = strip_namespace(sample.name);
            if !scan.types.contains(name) {
                continue;
            }
            let dist = pos.distance_sq(scan.origin);
            let list = scan.pending.entry_ref(name).or_default();
            if insert_sorted(list, pos, dist, cap) {
                let known = self
                    .positions
                    .get(name)
                    .is_some_and(|l| l.iter().any(|(p, _)| *p == pos));
                if !known && list.iter().any(|(p, _)| *p == pos) {
                    scan.found_new = true;
                }
            }
        }
        if !scan.cursor.is_done() {
            return ScanStatus::Scanning {
                progress: scan.cursor.progress(),
            };
        }
        self.finish_scan(world.time())
    }

    fn finish_scan(&mut self, now: u64) -> ScanStatus {
        let Some(mut scan) = self.scan.take() else {
            return ScanStatus::Idle;
        };
        let found_new = scan.found_new || self.changed_since_scan;
        self.changed_since_scan = false;
        // Types tracked mid-scan keep their event-fed lists until a scan
        // that covered them from the first cell completes.
        for key in scan.types {
            let list = scan.pending.remove(&key).unwrap_or_default();
            self.positions.insert(key, list);
        }
        let interval = if found_new {
            self.cfg.rescan_interval_found
        } else {
            self.cfg.rescan_interval_idle
        };
        // Tracks registered mid-scan must still trigger the next scan.
        let dirty_again = self.gate.is_dirty();
        self.gate.refreshed_with(now, interval);
        if dirty_again {
            self.gate.mark_dirty();
        }
        self.scans_completed += 1;
        log::debug!(
            target: "scan",
            "[tick {}] scan complete in {} ticks found_new={} next_in={} positions={}",
            now,
            now.saturating_sub(scan.started_at),
            found_new,
            interval,
            self.positions.values().map(Vec::len).sum::<usize>()
        );
        ScanStatus::Completed { found_new }
    }

    /// Progress of the running scan; a full fraction when idle.
    pub fn progress(&self) -> ScanProgress {
        match &self.scan {
            Some(scan) => scan.cursor.progress(),
            None => ScanProgress::default(),
        }
    }

    #[inline]
    pub fn is_scanning(&self) -> bool {
        self.scan.is_some()
    }

    pub fn has_any<W: WorldView + ?Sized>(&mut self, world: &W, block: &str) -> bool {
        self.nearest(world, block).is_some()
    }

    /// Closest cached position of `block` that is not blacklisted.
    pub fn nearest<W: WorldView + ?Sized>(&mut self, world: &W, block: &str) -> Option<BlockPos> {
        self.ensure_fresh(world);
        let now = world.time();
        self.positions
            .get(strip_namespace(block))?
            .iter()
            .map(|(p, _)| *p)
            .find(|p| !self.blacklist.is_blacklisted(*p, now))
    }

    /// Cached positions of `block`, nearest first, skipping blacklisted ones.
    pub fn known_positions<W: WorldView + ?Sized>(
        &mut self,
        world: &W,
        block: &str,
        limit: Option<usize>,
    ) -> Vec<BlockPos> {
        self.ensure_fresh(world);
        let now = world.time();
        let Some(list) = self.positions.get(strip_namespace(block)) else {
            return Vec::new();
        };
        list.iter()
            .map(|(p, _)| *p)
            .filter(|p| !self.blacklist.is_blacklisted(*p, now))
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Blacklists `pos` with exponential backoff; `delay_secs == 0` is permanent.
    pub fn mark_unreachable<W: WorldView + ?Sized>(
        &mut self,
        world: &W,
        pos: BlockPos,
        delay_secs: f32,
    ) -> Option<u64> {
        let now = world.time();
        let ticks = self.blacklist.mark(pos, delay_secs, now);
        log::debug!(
            target: "scan",
            "[tick {}] unreachable ({}, {}, {}) for {:?} ticks",
            now, pos.x, pos.y, pos.z, ticks
        );
        ticks
    }

    pub fn clear_unreachable(&mut self, pos: BlockPos) -> bool {
        self.blacklist.clear(pos)
    }

    pub fn is_unreachable(&self, pos: BlockPos, now: u64) -> bool {
        self.blacklist.is_blacklisted(pos, now)
    }

    pub fn blacklist_entry(&self, pos: BlockPos) -> Option<BlacklistEntry> {
        self.blacklist.get(pos)
    }

    /// Applies a block change immediately, without waiting for a scan.
    pub fn on_block_changed(&mut self, pos: BlockPos, old: &str, new: &str, observer: Vec3) {
        let old = strip_namespace(old);
        let new = strip_namespace(new);
        self.blacklist.clear(pos);
        if old == new {
            return;
        }
        if self.interest.contains_key(old) {
            if let Some(list) = self.positions.get_mut(old) {
                remove_pos(list, pos);
            }
            if let Some(list) = self.scan.as_mut().and_then(|s| s.pending.get_mut(old)) {
                remove_pos(list, pos);
            }
        }
        if self.interest.contains_key(new) {
            let cap = self.cfg.max_positions_per_type;
            let dist = pos.distance_sq(BlockPos::containing(observer));
            let list = self.positions.entry_ref(new).or_default();
            insert_sorted(list, pos, dist, cap);
            if let Some(scan) = self.scan.as_mut().filter(|s| s.types.contains(new)) {
                let dist = pos.distance_sq(scan.origin);
                let list = scan.pending.entry_ref(new).or_default();
                insert_sorted(list, pos, dist, cap);
            }
            self.changed_since_scan = true;
        }
    }

    pub fn stats(&self, now: u64) -> ScanCacheStats {
        ScanCacheStats {
            tracked_types: self.interest.len(),
            cached_positions: self.positions.values().map(Vec::len).sum(),
            blacklisted: self.blacklist.active_len(now),
            scans_completed: self.scans_completed,
            scanning: self.scan.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_world::GridWorld;

    fn small_cfg() -> ScanConfig {
        ScanConfig {
            radius: 4,
            cells_per_step: 100,
            max_positions_per_type: 8,
            ..ScanConfig::default()
        }
    }

    fn run_scan(cache: &mut BlockScanCache, world: &GridWorld) -> ScanStatus {
        cache.ensure_fresh(world);
        loop {
            match cache.tick(world) {
                ScanStatus::Scanning { .. } => continue,
                other => return other,
            }
        }
    }

    #[test]
    fn insert_sorted_updates_duplicates_and_caps() {
        let mut list = PositionList::new();
        assert!(insert_sorted(&mut list, BlockPos::new(3, 0, 0), 9, 3));
        assert!(insert_sorted(&mut list, BlockPos::new(1, 0, 0), 1, 3));
        assert!(!insert_sorted(&mut list, BlockPos::new(3, 0, 0), 4, 3));
        assert_eq!(list, vec![(BlockPos::new(1, 0, 0), 1), (BlockPos::new(3, 0, 0), 4)]);
        insert_sorted(&mut list, BlockPos::new(5, 0, 0), 25, 3);
        insert_sorted(&mut list, BlockPos::new(0, 2, 0), 2, 3);
        assert_eq!(list.len(), 3);
        assert_eq!(list[2].0, BlockPos::new(3, 0, 0));
    }

    #[test]
    fn refcount_controls_list_lifetime() {
        let mut world = GridWorld::new(-16, 16);
        world.set_block(BlockPos::new(1, 0, 1), "coal_ore");
        let mut cache = BlockScanCache::new(small_cfg());
        cache.track("coal_ore");
        cache.track("minecraft:coal_ore");
        assert_eq!(cache.ref_count("coal_ore"), 2);
        run_scan(&mut cache, &world);
        assert!(cache.has_any(&world, "coal_ore"));

        assert!(cache.untrack("coal_ore"));
        assert!(cache.has_any(&world, "coal_ore"));
        assert!(cache.untrack("coal_ore"));
        assert!(!cache.is_tracked("coal_ore"));
        assert!(!cache.has_any(&world, "coal_ore"));
        assert!(!cache.untrack("coal_ore"));
    }

    #[test]
    fn scan_is_incremental_and_reports_progress() {
        let mut world = GridWorld::new(-16, 16);
        world.set_block(BlockPos::new(2, 1, -2), "iron_ore");
        let mut cache = BlockScanCache::new(small_cfg());
        cache.track("iron_ore");
        assert_eq!(cache.nearest(&world, "iron_ore"), None);
        assert!(cache.is_scanning());

        // 9^3 = 729 cells at 100 per step.
        let mut steps = 0;
        loop {
            steps += 1;
            match cache.tick(&world) {
                ScanStatus::Scanning { progress } => {
                    assert!(progress.fraction() < 1.0);
                    assert_eq!(cache.nearest(&world, "iron_ore"), None);
                }
                ScanStatus::Completed { found_new } => {
                    assert!(found_new);
                    break;
                }
                ScanStatus::Idle => panic!("scan vanished"),
            }
        }
        assert_eq!(steps, 8);
        assert_eq!(cache.nearest(&world, "iron_ore"), Some(BlockPos::new(2, 1, -2)));
    }

    #[test]
    fn track_mid_scan_does_not_restart_but_rescans_after() {
        let mut world = GridWorld::new(-16, 16);
        world.set_block(BlockPos::new(0, 0, 0), "gold_ore");
        let mut cache = BlockScanCache::new(small_cfg());
        cache.track("iron_ore");
        cache.ensure_fresh(&world);
        cache.tick(&world);
        let before = cache.progress();
        cache.track("gold_ore");
        cache.ensure_fresh(&world);
        assert_eq!(cache.progress(), before);

        while let ScanStatus::Scanning { .. } = cache.tick(&world) {}
        // Dirty flag survives completion, so the next query starts another scan.
        cache.ensure_fresh(&world);
        assert!(cache.is_scanning());
    }

    #[test]
    fn type_tracked_mid_scan_waits_for_a_full_scan() {
        let mut world = GridWorld::new(-16, 16);
        let near = BlockPos::new(0, -4, 0);
        let far = BlockPos::new(3, 3, 3);
        world.set_block(near, "gold_ore");
        world.set_block(far, "gold_ore");
        let mut cache = BlockScanCache::new(small_cfg());
        cache.track("iron_ore");
        cache.ensure_fresh(&world);
        // The first step covers the whole bottom layer, including `near`.
        cache.tick(&world);
        cache.track("gold_ore");
        while let ScanStatus::Scanning { .. } = cache.tick(&world) {}

        // Only the unvisited part saw `far`; that partial list is not published.
        assert!(cache.known_positions(&world, "gold_ore", None).is_empty());
        assert!(cache.is_scanning());
        run_scan(&mut cache, &world);
        assert_eq!(cache.nearest(&world, "gold_ore"), Some(near));
        assert_eq!(cache.known_positions(&world, "gold_ore", None), vec![near, far]);
    }

    #[test]
    fn event_for_type_tracked_mid_scan_stays_live() {
        let mut world = GridWorld::new(-16, 16);
        let mut cache = BlockScanCache::new(small_cfg());
        cache.track("iron_ore");
        cache.ensure_fresh(&world);
        cache.tick(&world);
        cache.track("gold_ore");
        let pos = BlockPos::new(1, 1, 1);
        world.set_block(pos, "gold_ore");
        cache.on_block_changed(pos, "air", "gold_ore", world.observer_position());
        while let ScanStatus::Scanning { .. } = cache.tick(&world) {}
        assert_eq!(cache.nearest(&world, "gold_ore"), Some(pos));
    }

    #[test]
    fn oversized_radius_scans_without_panicking() {
        let world = GridWorld::new(-64, 320);
        let mut cache = BlockScanCache::new(ScanConfig {
            radius: 1_200_000_000,
            ..ScanConfig::default()
        });
        cache.track("iron_ore");
        cache.ensure_fresh(&world);
        match cache.tick(&world) {
            ScanStatus::Scanning { progress } => {
                assert_eq!(progress.visited, 4096);
                assert_eq!(progress.total, u64::MAX);
            }
            other => panic!("expected a running scan, got {:?}", other),
        }
    }

    #[test]
    fn rescan_interval_adapts_to_discoveries() {
        let mut world = GridWorld::new(-16, 16);
        world.set_block(BlockPos::new(1, 1, 1), "iron_ore");
        let cfg = ScanConfig {
            rescan_interval_found: 10,
            rescan_interval_idle: 50,
            ..small_cfg()
        };
        let mut cache = BlockScanCache::new(cfg);
        cache.track("iron_ore");
        assert_eq!(run_scan(&mut cache, &world), ScanStatus::Completed { found_new: true });

        world.advance(10);
        cache.ensure_fresh(&world);
        assert!(cache.is_scanning());
        assert_eq!(run_scan(&mut cache, &world), ScanStatus::Completed { found_new: false });

        world.advance(49);
        cache.ensure_fresh(&world);
        assert!(!cache.is_scanning());
        world.advance(1);
        cache.ensure_fresh(&world);
        assert!(cache.is_scanning());
    }

    #[test]
    fn block_change_applies_immediately_and_clears_blacklist() {
        let mut world = GridWorld::new(-16, 16);
        let a = BlockPos::new(1, 0, 0);
        let b = BlockPos::new(3, 0, 0);
        world.set_block(a, "iron_ore");
        let mut cache = BlockScanCache::new(small_cfg());
        cache.track("iron_ore");
        run_scan(&mut cache, &world);
        assert_eq!(cache.nearest(&world, "iron_ore"), Some(a));

        cache.mark_unreachable(&world, b, 0.0);
        world.set_block(b, "iron_ore");
        cache.on_block_changed(b, "air", "iron_ore", world.observer_position());
        assert!(!cache.is_unreachable(b, world.time()));
        assert_eq!(cache.known_positions(&world, "iron_ore", None), vec![a, b]);

        world.set_block(a, "stone");
        cache.on_block_changed(a, "iron_ore", "stone", world.observer_position());
        assert_eq!(cache.nearest(&world, "iron_ore"), Some(b));
    }

    #[test]
    fn block_change_during_scan_survives_swap() {
        let mut world = GridWorld::new(-16, 16);
        let a = BlockPos::new(-4, -4, -4);
        world.set_block(a, "iron_ore");
        let mut cache = BlockScanCache::new(small_cfg());
        cache.track("iron_ore");
        run_scan(&mut cache, &world);
        world.advance(1000);
        cache.ensure_fresh(&world);
        // First step covers the corner cell where `a` sits.
        cache.tick(&world);
        world.set_block(a, "air");
        cache.on_block_changed(a, "iron_ore", "air", world.observer_position());
        run_scan(&mut cache, &world);
        assert_eq!(cache.nearest(&world, "iron_ore"), None);
    }

    #[test]
    fn nearest_skips_blacklisted_until_expiry() {
        let mut world = GridWorld::new(-16, 16);
        let near = BlockPos::new(1, 0, 0);
        let far = BlockPos::new(3, 0, 0);
        world.set_block(near, "iron_ore");
        world.set_block(far, "iron_ore");
        let mut cache = BlockScanCache::new(ScanConfig {
            rescan_interval_idle: 100_000,
            rescan_interval_found: 100_000,
            ..small_cfg()
        });
        cache.track("iron_ore");
        run_scan(&mut cache, &world);
        assert_eq!(cache.nearest(&world, "iron_ore"), Some(near));

        let ticks = cache.mark_unreachable(&world, near, 2.0);
        assert_eq!(ticks, Some(40));
        assert_eq!(cache.nearest(&world, "iron_ore"), Some(far));
        world.advance(40);
        assert_eq!(cache.nearest(&world, "iron_ore"), Some(far));
        world.advance(1);
        assert_eq!(cache.nearest(&world, "iron_ore"), Some(near));
        assert_eq!(cache.stats(world.time()).blacklisted, 0);
    }
}
