use scout_geom::{BlockPos, Vec3};
use scout_world::WorldView;

/// Steps a projectile forward (`pos += vel; vel.y -= gravity`) until it
/// enters a solid block, returning that point. `None` if it flies for
/// `max_steps` or drops below the world.
pub fn predict_impact<W: WorldView + ?Sized>(
    world: &W,
    start: Vec3,
    velocity: Vec3,
    gravity: f32,
    max_steps: u32,
) -> Option<Vec3> {
    let (min_y, _) = world.height_bounds();
    let mut pos = start;
    let mut vel = velocity;
    for _ in 0..max_steps {
        pos += vel;
        vel.y -= gravity;
        if world.is_solid(BlockPos::containing(pos)) {
            return Some(pos);
        }
        if pos.y < min_y as f32 {
            return None;
        }
    }
    None
}

/// Closest-approach test: the straight-line path passes within `approach` of
/// `target` at a non-negative time and the velocity points toward it.
pub fn is_heading_toward(
    position: Vec3,
    velocity: Vec3,
    target: Vec3,
    approach: f32,
    alignment: f32,
) -> bool {
    let speed_sq = velocity.length_sq();
    if speed_sq < 1e-6 {
        return false;
    }
    let offset = target - position;
    let t = offset.dot(velocity) / speed_sq;
    if t < 0.0 {
        return false;
    }
    let closest = position + velocity * t;
    closest.distance(target) < approach && velocity.cos_angle(offset) > alignment
}
