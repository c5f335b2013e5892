use scout_geom::Vec3;
use scout_world::{EntityId, EntitySnapshot};

use super::catalog::{CHARGE_BONUS, Hazard};

#[derive(Clone, Debug, PartialEq)]
pub struct ThreatInfo {
    pub id: EntityId,
    pub kind: String,
    pub position: Vec3,
    pub distance: f32,
    pub score: f32,
    pub targeting_observer: bool,
}

/// Whether `entity` is after the observer: an explicit target reference wins,
/// otherwise it must face the observer closely enough and be within `range`.
pub fn targets_observer(
    entity: &EntitySnapshot,
    observer: Vec3,
    observer_id: Option<EntityId>,
    range: f32,
    cos_threshold: f32,
) -> bool {
    if let Some(target) = entity.target {
        return Some(target) == observer_id;
    }
    let to_observer = observer - entity.position;
    to_observer.length() < range && entity.facing.cos_angle(to_observer) >= cos_threshold
}

pub fn threat_score(entity: &EntitySnapshot, hazard: Hazard, distance: f32, targeting: bool) -> f32 {
    let mut score = (20.0 - distance).max(0.0) * 0.5;
    score += hazard.base_weight();
    if entity.charging {
        score += CHARGE_BONUS;
    }
    if targeting {
        score *= 2.0;
    }
    if entity.max_health > 0.0 && entity.health < entity.max_health * 0.3 {
        score *= 0.5;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zombie_at(x: f32) -> EntitySnapshot {
        EntitySnapshot::new(7, "zombie", Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn close_charging_beats_far_idle() {
        let near = zombie_at(2.0).with_charging(true);
        let far = zombie_at(15.0);
        let a = threat_score(&near, Hazard::Melee, 2.0, false);
        let b = threat_score(&far, Hazard::Melee, 15.0, false);
        assert!(a > b, "{a} <= {b}");
        assert_eq!(b, 2.5 + 3.0);
    }

    #[test]
    fn targeting_doubles_and_low_health_halves() {
        let e = zombie_at(30.0);
        let base = threat_score(&e, Hazard::Melee, 30.0, false);
        assert_eq!(threat_score(&e, Hazard::Melee, 30.0, true), base * 2.0);
        let hurt = zombie_at(30.0).with_health(5.0, 20.0);
        assert_eq!(threat_score(&hurt, Hazard::Melee, 30.0, false), base * 0.5);
    }

    #[test]
    fn explicit_target_overrides_facing() {
        // Facing straight at the observer but targeting someone else.
        let e = zombie_at(5.0)
            .with_facing(Vec3::new(-1.0, 0.0, 0.0))
            .with_target(Some(99));
        assert!(!targets_observer(&e, Vec3::ZERO, Some(1), 16.0, 0.85));
        let e = e.with_target(Some(1));
        assert!(targets_observer(&e, Vec3::ZERO, Some(1), 16.0, 0.85));
    }

    #[test]
    fn facing_fallback_needs_alignment_and_range() {
        let facing = zombie_at(5.0).with_facing(Vec3::new(-1.0, 0.0, 0.0));
        assert!(targets_observer(&facing, Vec3::ZERO, None, 16.0, 0.85));
        let away = zombie_at(5.0).with_facing(Vec3::new(1.0, 0.0, 0.0));
        assert!(!targets_observer(&away, Vec3::ZERO, None, 16.0, 0.85));
        let far = zombie_at(20.0).with_facing(Vec3::new(-1.0, 0.0, 0.0));
        assert!(!targets_observer(&far, Vec3::ZERO, None, 16.0, 0.85));
    }
}
