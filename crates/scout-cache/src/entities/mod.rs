//! Per-refresh entity classification, threat ranking and projectile prediction.

mod ballistics;
mod catalog;
mod threat;

pub use ballistics::{is_heading_toward, predict_impact};
pub use catalog::{CHARGE_BONUS, EntityCategory, Hazard, classify, hazard_of};
pub use threat::{ThreatInfo, targets_observer, threat_score};

use scout_geom::Vec3;
use scout_world::{EntityId, EntitySnapshot, WorldView};

use crate::config::EntityConfig;
use crate::gate::UpdateGate;

#[derive(Clone, Debug, PartialEq)]
pub struct ProjectileInfo {
    pub id: EntityId,
    pub kind: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub predicted_impact: Option<Vec3>,
    pub targeting_observer: bool,
}

/// One refresh worth of buckets. Rebuilt from scratch every time.
#[derive(Clone, Debug, Default)]
pub struct Classification {
    /// Hostiles in descending threat order, parallel to `threats`.
    pub hostiles: Vec<EntitySnapshot>,
    pub threats: Vec<ThreatInfo>,
    pub passives: Vec<EntitySnapshot>,
    pub items: Vec<EntitySnapshot>,
    pub players: Vec<EntitySnapshot>,
    pub projectiles: Vec<ProjectileInfo>,
    pub other: Vec<EntitySnapshot>,
    /// Every classified entity within the close radius, any category.
    pub close: Vec<EntitySnapshot>,
}

impl Classification {
    pub fn len(&self) -> usize {
        self.hostiles.len()
            + self.passives.len()
            + self.items.len()
            + self.players.len()
            + self.projectiles.len()
            + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct EntityClassifier {
    cfg: EntityConfig,
    gate: UpdateGate,
    current: Classification,
}

impl EntityClassifier {
    pub fn new(cfg: EntityConfig) -> Self {
        Self {
            gate: UpdateGate::new(cfg.refresh_interval),
            cfg,
            current: Classification::default(),
        }
    }

    pub fn config(&self) -> &EntityConfig {
        &self.cfg
    }

    /// Forces a recompute on the next query.
    pub fn mark_dirty(&mut self) {
        self.gate.mark_dirty();
    }

    pub fn ensure_fresh<W: WorldView + ?Sized>(&mut self, world: &W) {
        let now = world.time();
        if !self.gate.is_due(now) {
            return;
        }
        self.current = self.classify_all(world);
        self.gate.refreshed(now);
        log::trace!(
            target: "entities",
            "[tick {}] classified hostile={} passive={} item={} player={} projectile={} other={} close={}",
            now,
            self.current.hostiles.len(),
            self.current.passives.len(),
            self.current.items.len(),
            self.current.players.len(),
            self.current.projectiles.len(),
            self.current.other.len(),
            self.current.close.len()
        );
    }

    fn classify_all<W: WorldView + ?Sized>(&self, world: &W) -> Classification {
        let observer = world.observer_position();
        let observer_id = world.observer_id();
        let mut out = Classification::default();
        let mut ranked: Vec<(ThreatInfo, EntitySnapshot)> = Vec::new();

        for e in world.entities() {
            if Some(e.id) == observer_id {
                continue;
            }
            let distance = e.position.distance(observer);
            if distance <= self.cfg.close_radius {
                out.close.push(e.clone());
            }
            match classify(&e.kind) {
                EntityCategory::Hostile => {
                    let Some(hazard) = hazard_of(&e.kind) else {
                        continue;
                    };
                    let targeting = targets_observer(
                        e,
                        observer,
                        observer_id,
                        self.cfg.facing_target_range,
                        self.cfg.facing_cos_threshold,
                    );
                    let info = ThreatInfo {
                        id: e.id,
                        kind: e.kind.clone(),
                        position: e.position,
                        distance,
                        score: threat_score(e, hazard, distance, targeting),
                        targeting_observer: targeting,
                    };
                    ranked.push((info, e.clone()));
                }
                EntityCategory::Passive => out.passives.push(e.clone()),
                EntityCategory::Item => out.items.push(e.clone()),
                EntityCategory::Player => out.players.push(e.clone()),
                EntityCategory::Projectile => {
                    let predicted_impact = predict_impact(
                        world,
                        e.position,
                        e.velocity,
                        self.cfg.projectile_gravity,
                        self.cfg.projectile_max_steps,
                    );
                    let targeting_observer = is_heading_toward(
                        e.position,
                        e.velocity,
                        observer,
                        self.cfg.projectile_approach_distance,
                        self.cfg.projectile_alignment,
                    );
                    out.projectiles.push(ProjectileInfo {
                        id: e.id,
                        kind: e.kind.clone(),
                        position: e.position,
                        velocity: e.velocity,
                        predicted_impact,
                        targeting_observer,
                    });
                }
                EntityCategory::Other => out.other.push(e.clone()),
            }
        }

        ranked.sort_by(|a, b| b.0.score.total_cmp(&a.0.score));
        for (info, e) in ranked {
            out.threats.push(info);
            out.hostiles.push(e);
        }
        out
    }

    /// Snapshot from the last refresh, without refreshing.
    pub fn current(&self) -> &Classification {
        &self.current
    }

    pub fn hostiles<W: WorldView + ?Sized>(&mut self, world: &W) -> &[EntitySnapshot] {
        self.ensure_fresh(world);
        &self.current.hostiles
    }

    pub fn passives<W: WorldView + ?Sized>(&mut self, world: &W) -> &[EntitySnapshot] {
        self.ensure_fresh(world);
        &self.current.passives
    }

    pub fn items<W: WorldView + ?Sized>(&mut self, world: &W) -> &[EntitySnapshot] {
        self.ensure_fresh(world);
        &self.current.items
    }

    pub fn players<W: WorldView + ?Sized>(&mut self, world: &W) -> &[EntitySnapshot] {
        self.ensure_fresh(world);
        &self.current.players
    }

    pub fn close_entities<W: WorldView + ?Sized>(&mut self, world: &W) -> &[EntitySnapshot] {
        self.ensure_fresh(world);
        &self.current.close
    }

    pub fn projectiles<W: WorldView + ?Sized>(&mut self, world: &W) -> &[ProjectileInfo] {
        self.ensure_fresh(world);
        &self.current.projectiles
    }

    pub fn projectiles_targeting_observer<W: WorldView + ?Sized>(
        &mut self,
        world: &W,
    ) -> Vec<ProjectileInfo> {
        self.ensure_fresh(world);
        self.current
            .projectiles
            .iter()
            .filter(|p| p.targeting_observer)
            .cloned()
            .collect()
    }

    /// Hostile threats, highest score first.
    pub fn threats<W: WorldView + ?Sized>(&mut self, world: &W) -> &[ThreatInfo] {
        self.ensure_fresh(world);
        &self.current.threats
    }

    pub fn closest_hostile<W: WorldView + ?Sized>(&mut self, world: &W) -> Option<ThreatInfo> {
        self.ensure_fresh(world);
        self.current
            .threats
            .iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .cloned()
    }

    pub fn any_hostile_targeting_observer<W: WorldView + ?Sized>(&mut self, world: &W) -> bool {
        self.ensure_fresh(world);
        self.current.threats.iter().any(|t| t.targeting_observer)
    }
}
