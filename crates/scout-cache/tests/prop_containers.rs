use proptest::prelude::*;
use scout_cache::{ContainerCache, ContainerConfig};
use scout_world::{BlockPos, GridWorld, RegionCoord, Vec3};

fn capture(cache: &mut ContainerCache, pos: BlockPos, window: u32, now: u64) {
    cache.on_container_opened(pos, window, "overworld");
    let closed = cache.on_container_closed(
        &GridWorld::container_window(window, 27, &[("iron_ingot", 4), ("coal", 9), ("stick", 2)]),
        now,
    );
    assert!(closed);
}

#[test]
fn unloading_the_region_forgets_a_fresh_container() {
    let mut world = GridWorld::new(-64, 320);
    world.set_observer(Vec3::new(0.0, 64.0, 0.0), None);
    let mut cache = ContainerCache::new(ContainerConfig::default());
    let p = BlockPos::new(5, 64, 5);
    capture(&mut cache, p, 1, 0);
    world.advance(10);
    let entry = cache.container_at(&world, p);
    assert_eq!(entry.map(|e| e.items.len()), Some(3));

    assert_eq!(cache.on_region_unloaded("overworld", RegionCoord::of(p)), 1);
    assert!(cache.container_at(&world, p).is_none());
}

proptest! {
    // Capacity holds after any sequence of captures
    #[test]
    fn capacity_never_exceeded(
        cells in prop::collection::vec((-40i32..40, -40i32..40), 1..60),
        max_entries in 1usize..16,
    ) {
        let cfg = ContainerConfig { max_entries, ..ContainerConfig::default() };
        let mut cache = ContainerCache::new(cfg);
        for (i, (x, z)) in cells.iter().enumerate() {
            capture(&mut cache, BlockPos::new(*x, 64, *z), i as u32, i as u64);
            prop_assert!(cache.len() <= max_entries);
        }
    }

    // Unloading a region drops exactly the entries inside it
    #[test]
    fn unload_drops_only_that_region(
        cells in prop::collection::vec((-40i32..40, -40i32..40), 1..30),
        pick in 0usize..30,
    ) {
        let mut world = GridWorld::new(-64, 320);
        world.set_observer(Vec3::new(0.0, 64.0, 0.0), None);
        let mut cache = ContainerCache::new(ContainerConfig::default());
        let positions: Vec<BlockPos> = cells.iter().map(|(x, z)| BlockPos::new(*x, 64, *z)).collect();
        for (i, p) in positions.iter().enumerate() {
            capture(&mut cache, *p, i as u32, 0);
        }
        let region = RegionCoord::of(positions[pick % positions.len()]);
        cache.on_region_unloaded("overworld", region);
        for p in &positions {
            let present = cache.container_at(&world, *p).is_some();
            prop_assert_eq!(present, !region.contains(*p));
        }
    }
}
