//! Step loop that walks an observer through generated terrain and uses the
//! caches the way a behavior layer would.

use crossbeam_channel::Sender;
use hashbrown::HashMap;
use scout_cache::entities::{EntityCategory, classify};
use scout_cache::{ScanStatus, WorldCaches};
use scout_world::{
    AIR, BlockPos, EntityId, EntitySnapshot, GridWorld, RegionCoord, Vec3, WorldEvent, WorldView,
};

use crate::config::{HarnessConfig, SimConfig};
use crate::terrain::Terrain;

const OBSERVER_ID: EntityId = 1;
const HOSTILE_KINDS: [&str; 4] = ["zombie", "skeleton", "creeper", "spider"];
const PASSIVE_KINDS: [&str; 3] = ["cow", "pig", "sheep"];
const MOB_SPEED: f32 = 0.08;
const ARROW_SPEED: f32 = 1.5;
const ARROW_GRAVITY: f32 = 0.05;
const ARROW_LIFETIME: u32 = 60;
const FIRE_EVERY: u64 = 40;
const FIRE_RANGE: f32 = 16.0;
const VISIT_EVERY: u64 = 150;
// Ores deeper than this below the observer count as unreachable.
const MAX_DIG_DEPTH: i32 = 12;
const UNREACHABLE_DELAY_SECS: f32 = 5.0;
const CHEST_SLOTS: u16 = 27;

struct Chest {
    pos: BlockPos,
    items: Vec<(&'static str, u32)>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SimSummary {
    pub ticks: u64,
    pub scans_completed: u64,
    pub events_applied: usize,
    pub blocks_mined: u32,
    pub marked_unreachable: u32,
    pub arrows_fired: u32,
    pub containers_cached: usize,
}

pub struct Sim {
    cfg: SimConfig,
    terrain: Terrain,
    world: GridWorld,
    caches: WorldCaches,
    events: Sender<WorldEvent>,
    chests: Vec<Chest>,
    // Age in ticks of each live arrow.
    arrows: HashMap<EntityId, u32>,
    next_entity: EntityId,
    next_window: u32,
    angle: f32,
    summary: SimSummary,
}

impl Sim {
    pub fn new(cfg: &HarnessConfig) -> Self {
        let sim_cfg = cfg.sim.clone();
        let terrain = Terrain::new(&sim_cfg);
        let mut world = GridWorld::new(sim_cfg.min_y, sim_cfg.max_y);
        let ores = terrain.generate(&mut world, sim_cfg.extent);
        log::info!(
            "generated terrain seed={} extent={} blocks={} ores={}",
            sim_cfg.seed,
            sim_cfg.extent,
            world.block_count(),
            ores
        );
        let caches = WorldCaches::new(&cfg.caches);
        let events = caches.events();
        let mut sim = Self {
            cfg: sim_cfg,
            terrain,
            world,
            caches,
            events,
            chests: Vec::new(),
            arrows: HashMap::new(),
            next_entity: OBSERVER_ID + 1,
            next_window: 1,
            angle: 0.0,
            summary: SimSummary::default(),
        };
        let start = sim.orbit_point(0.0);
        sim.world.set_observer(start, Some(OBSERVER_ID));
        sim.spawn_mobs();
        sim.place_chests();
        for name in &sim.cfg.tracked {
            sim.caches.blocks.track(name);
        }
        sim
    }

    pub fn world(&self) -> &GridWorld {
        &self.world
    }

    fn next_id(&mut self) -> EntityId {
        let id = self.next_entity;
        self.next_entity += 1;
        id
    }

    fn orbit_radius(&self) -> f32 {
        (self.cfg.extent / 2).max(1) as f32
    }

    fn surface_point(&self, x: f32, z: f32) -> Vec3 {
        let y = self.terrain.surface_y(x.floor() as i32, z.floor() as i32) + 1;
        Vec3::new(x, y as f32, z)
    }

    fn orbit_point(&self, angle: f32) -> Vec3 {
        let r = self.orbit_radius();
        self.surface_point(r * angle.cos(), r * angle.sin())
    }

    fn spawn_mobs(&mut self) {
        let observer = self.world.observer_position();
        let n = self.cfg.hostiles.max(1) as f32;
        for i in 0..self.cfg.hostiles {
            let a = i as f32 * std::f32::consts::TAU / n;
            let d = 8.0 + (i % 3) as f32 * 5.0;
            let pos = self.surface_point(observer.x + a.cos() * d, observer.z + a.sin() * d);
            let kind = HOSTILE_KINDS[i as usize % HOSTILE_KINDS.len()];
            let mut mob = EntitySnapshot::new(self.next_id(), kind, pos)
                .with_facing(observer - pos);
            if kind == "skeleton" {
                mob = mob.with_target(Some(OBSERVER_ID));
            }
            self.world.spawn(mob);
        }
        for i in 0..self.cfg.passives {
            let a = i as f32 * 1.7 + 0.4;
            let pos = self.surface_point(observer.x + a.cos() * 14.0, observer.z + a.sin() * 14.0);
            let kind = PASSIVE_KINDS[i as usize % PASSIVE_KINDS.len()];
            let animal = EntitySnapshot::new(self.next_id(), kind, pos);
            self.world.spawn(animal);
        }
        let drop = self.surface_point(observer.x + 2.0, observer.z);
        let item = EntitySnapshot::new(self.next_id(), "item", drop);
        self.world.spawn(item);
    }

    fn place_chests(&mut self) {
        let extent = self.cfg.extent;
        for i in 0..self.cfg.chests as i32 {
            let x = -extent / 2 + i * 6;
            let z = extent / 3;
            let pos = BlockPos::new(x, self.terrain.surface_y(x, z) + 1, z);
            let _ = self.world.set_block(pos, "minecraft:chest");
            self.chests.push(Chest {
                pos,
                items: vec![
                    ("minecraft:iron_ingot", 4 + 3 * i as u32),
                    ("minecraft:coal", 16),
                    ("minecraft:bread", 1 + i as u32),
                ],
            });
        }
    }

    fn send(&self, event: WorldEvent) {
        if self.events.send(event).is_err() {
            log::warn!(target: "events", "event channel closed");
        }
    }

    pub fn step(&mut self) {
        self.world.advance(1);
        let now = self.world.time();
        self.walk();
        self.move_mobs(now);
        if self.cfg.mine_every > 0 && now % self.cfg.mine_every == 0 {
            self.mine(now);
        }
        if !self.chests.is_empty() && now % VISIT_EVERY == VISIT_EVERY / 2 {
            self.visit_chest(now);
        }
        if now == self.cfg.steps * 3 / 4 {
            self.leave_first_chest_region(now);
        }

        self.caches.blocks.ensure_fresh(&self.world);
        let report = self.caches.tick(&self.world);
        self.summary.events_applied += report.events_applied;
        if let ScanStatus::Completed { found_new } = report.scan {
            log::debug!(target: "scan", "[tick {}] scan finished found_new={}", now, found_new);
        }
        self.watch_threats(now);
        if self.cfg.report_every > 0 && now % self.cfg.report_every == 0 {
            self.report(now);
        }
    }

    fn walk(&mut self) {
        self.angle += self.cfg.walk_speed / self.orbit_radius();
        let pos = self.orbit_point(self.angle);
        self.world.move_observer(pos);
    }

    fn move_mobs(&mut self, now: u64) {
        let observer = self.world.observer_position();
        let terrain = &self.terrain;
        let arrows = &mut self.arrows;
        let mut volleys = Vec::new();
        let mut expired = Vec::new();
        for e in self.world.entities_mut() {
            match classify(&e.kind) {
                EntityCategory::Hostile => {
                    let to = observer - e.position;
                    let flat = Vec3::new(to.x, 0.0, to.z);
                    let dist = flat.length();
                    if dist > 1.5 {
                        e.position += flat.normalized() * MOB_SPEED;
                        let ground = terrain.surface_y(e.position.x.floor() as i32, e.position.z.floor() as i32);
                        e.position.y = (ground + 1) as f32;
                    }
                    e.facing = to.normalized();
                    e.charging = e.kind == "creeper" && dist < 3.0;
                    if e.kind == "skeleton" && now % FIRE_EVERY == 0 && to.length() < FIRE_RANGE {
                        volleys.push((e.position + Vec3::new(0.0, 1.5, 0.0), to));
                    }
                }
                EntityCategory::Projectile => {
                    e.position += e.velocity;
                    e.velocity.y -= ARROW_GRAVITY;
                    let age = arrows.entry(e.id).or_insert(0);
                    *age += 1;
                    let ground = terrain.surface_y(e.position.x.floor() as i32, e.position.z.floor() as i32);
                    if *age > ARROW_LIFETIME || e.position.y <= ground as f32 {
                        expired.push(e.id);
                    }
                }
                _ => {}
            }
        }
        for id in expired {
            self.world.despawn(id);
            self.arrows.remove(&id);
        }
        for (from, aim) in volleys {
            let id = self.next_id();
            let velocity = aim.normalized() * ARROW_SPEED + Vec3::new(0.0, 0.1, 0.0);
            self.world
                .spawn(EntitySnapshot::new(id, "arrow", from).with_velocity(velocity));
            self.arrows.insert(id, 0);
            self.summary.arrows_fired += 1;
            log::debug!(target: "entities", "[tick {}] arrow {} fired", now, id);
        }
    }

    /// Digs the nearest known tracked block, or reports it unreachable when it
    /// is buried too deep.
    fn mine(&mut self, now: u64) {
        let found = self
            .cfg
            .tracked
            .iter()
            .find_map(|name| self.caches.blocks.nearest(&self.world, name));
        let Some(pos) = found else {
            return;
        };
        let observer = BlockPos::containing(self.world.observer_position());
        if observer.y - pos.y > MAX_DIG_DEPTH {
            self.caches
                .blocks
                .mark_unreachable(&self.world, pos, UNREACHABLE_DELAY_SECS);
            self.summary.marked_unreachable += 1;
            return;
        }
        if let Some(ev) = self.world.set_block(pos, AIR) {
            log::debug!(target: "events", "[tick {}] mined ({}, {}, {})", now, pos.x, pos.y, pos.z);
            self.send(ev);
            self.summary.blocks_mined += 1;
        }
    }

    fn visit_chest(&mut self, now: u64) {
        let idx = (now / VISIT_EVERY) as usize % self.chests.len();
        let window_id = self.next_window;
        self.next_window += 1;
        let chest = &self.chests[idx];
        let window = GridWorld::container_window(window_id, CHEST_SLOTS, &chest.items);
        self.send(WorldEvent::ContainerOpened {
            pos: chest.pos,
            window_id,
        });
        self.send(WorldEvent::ContainerClosed { window });
    }

    fn leave_first_chest_region(&mut self, now: u64) {
        let Some(chest) = self.chests.first() else {
            return;
        };
        let region = RegionCoord::of(chest.pos);
        log::info!(target: "events", "[tick {}] leaving region ({}, {})", now, region.rx, region.rz);
        let ev = self.world.unload_region(region);
        self.send(ev);
    }

    fn watch_threats(&mut self, now: u64) {
        if let Some(top) = self.caches.entities.closest_hostile(&self.world) {
            if top.targeting_observer && top.distance < 4.0 {
                log::debug!(
                    target: "entities",
                    "[tick {}] {} #{} closing in d={:.1} score={:.1}",
                    now, top.kind, top.id, top.distance, top.score
                );
            }
        }
        for p in self.caches.entities.projectiles_targeting_observer(&self.world) {
            log::debug!(
                target: "entities",
                "[tick {}] incoming {} #{} impact={:?}",
                now, p.kind, p.id, p.predicted_impact
            );
        }
    }

    fn report(&mut self, now: u64) {
        let stats = self.caches.blocks.stats(now);
        let progress = self.caches.blocks.progress().fraction() * 100.0;
        let known: Vec<String> = self
            .cfg
            .tracked
            .iter()
            .map(|name| {
                let n = self.caches.blocks.known_positions(&self.world, name, None).len();
                format!("{}={}", name, n)
            })
            .collect();
        let threats = self.caches.entities.threats(&self.world).len();
        let classified = self.caches.entities.current();
        let (passives, projectiles, close) = (
            classified.passives.len(),
            classified.projectiles.len(),
            classified.close.len(),
        );
        let iron = self.caches.containers.item_count(&self.world, &["iron_ingot"]);
        let bread_sources = self
            .caches
            .containers
            .containers_with_item(&self.world, &["bread"])
            .len();
        log::info!(
            "[tick {}] scan {:.0}% scans={} positions={} blacklisted={} [{}] | hostiles={} passives={} projectiles={} close={} | containers={} iron_ingot={} bread_sources={}",
            now,
            progress,
            stats.scans_completed,
            stats.cached_positions,
            stats.blacklisted,
            known.join(" "),
            threats,
            passives,
            projectiles,
            close,
            self.caches.containers.len(),
            iron,
            bread_sources
        );
    }

    pub fn run(&mut self) -> SimSummary {
        for _ in 0..self.cfg.steps {
            self.step();
        }
        let now = self.world.time();
        self.summary.ticks = now;
        self.summary.scans_completed = self.caches.blocks.stats(now).scans_completed;
        self.summary.containers_cached = self.caches.containers.len();
        self.summary
    }
}
