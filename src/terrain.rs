//! Noise-generated test terrain with buried ore veins.

use fastnoise_lite::{FastNoiseLite, NoiseType};
use scout_world::{BlockPos, GridWorld};

use crate::config::SimConfig;

pub struct Terrain {
    height: FastNoiseLite,
    ore: FastNoiseLite,
    base_height: i32,
    amplitude: f32,
    ore_threshold: f32,
    min_y: i32,
    max_y: i32,
}

impl Terrain {
    pub fn new(cfg: &SimConfig) -> Self {
        let mut height = FastNoiseLite::with_seed(cfg.seed);
        height.set_noise_type(Some(NoiseType::OpenSimplex2));
        height.set_frequency(Some(cfg.height_frequency));
        let mut ore = FastNoiseLite::with_seed(cfg.seed ^ 0x5EED_0E5);
        ore.set_noise_type(Some(NoiseType::OpenSimplex2));
        ore.set_frequency(Some(cfg.ore_frequency));
        Self {
            height,
            ore,
            base_height: cfg.base_height,
            amplitude: cfg.height_amplitude,
            ore_threshold: cfg.ore_threshold,
            min_y: cfg.min_y,
            max_y: cfg.max_y,
        }
    }

    /// Y of the topmost solid block in the column.
    pub fn surface_y(&self, x: i32, z: i32) -> i32 {
        let n = self.height.get_noise_2d(x as f32, z as f32);
        let h = self.base_height + (n * self.amplitude).round() as i32;
        h.clamp(self.min_y, self.max_y - 1)
    }

    fn ore_at(&self, pos: BlockPos, surface: i32) -> Option<&'static str> {
        let n = self.ore.get_noise_3d(pos.x as f32, pos.y as f32, pos.z as f32);
        if n <= self.ore_threshold {
            return None;
        }
        let depth = surface - pos.y;
        let ore = if depth > 32 && n > self.ore_threshold + 0.15 {
            "minecraft:diamond_ore"
        } else if depth > 12 {
            "minecraft:iron_ore"
        } else {
            "minecraft:coal_ore"
        };
        Some(ore)
    }

    /// Fills the square of half-width `extent` around the origin.
    pub fn generate(&self, world: &mut GridWorld, extent: i32) -> usize {
        world.register_block("minecraft:grass_block", true);
        world.register_block("minecraft:dirt", true);
        world.register_block("minecraft:stone", true);
        let mut ores = 0usize;
        for z in -extent..=extent {
            for x in -extent..=extent {
                let top = self.surface_y(x, z);
                for y in self.min_y..=top {
                    let pos = BlockPos::new(x, y, z);
                    let name = if y == top {
                        "minecraft:grass_block"
                    } else if y >= top - 3 {
                        "minecraft:dirt"
                    } else {
                        match self.ore_at(pos, top) {
                            Some(ore) => {
                                ores += 1;
                                ore
                            }
                            None => "minecraft:stone",
                        }
                    };
                    let _ = world.set_block(pos, name);
                }
            }
        }
        ores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_world::WorldView;

    fn small() -> SimConfig {
        SimConfig {
            extent: 6,
            ..SimConfig::default()
        }
    }

    #[test]
    fn columns_are_solid_up_to_the_surface() {
        let cfg = small();
        let terrain = Terrain::new(&cfg);
        let mut world = GridWorld::new(cfg.min_y, cfg.max_y);
        terrain.generate(&mut world, cfg.extent);
        let top = terrain.surface_y(2, -3);
        assert_eq!(
            world.block_at(BlockPos::new(2, top, -3)).map(|b| b.name),
            Some("minecraft:grass_block")
        );
        assert!(world.is_solid(BlockPos::new(2, cfg.min_y, -3)));
        assert!(!world.is_solid(BlockPos::new(2, top + 1, -3)));
    }

    #[test]
    fn same_seed_same_surface() {
        let a = Terrain::new(&small());
        let b = Terrain::new(&small());
        for i in -5..5 {
            assert_eq!(a.surface_y(i, i * 2), b.surface_y(i, i * 2));
        }
    }
}
