//! Static entity-name tables.

use scout_world::strip_namespace;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityCategory {
    Hostile,
    Passive,
    Item,
    Player,
    Projectile,
    Other,
}

/// How a hostile hurts you, ordered by base danger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hazard {
    Explosive,
    Ranged,
    Melee,
}

impl Hazard {
    #[inline]
    pub fn base_weight(self) -> f32 {
        match self {
            Hazard::Explosive => 10.0,
            Hazard::Ranged => 6.0,
            Hazard::Melee => 3.0,
        }
    }
}

/// Extra threat when the entity shows a pre-attack indicator.
pub const CHARGE_BONUS: f32 = 5.0;

const ITEMS: &[&str] = &["item", "experience_orb"];
const PLAYERS: &[&str] = &["player"];

const EXPLOSIVE: &[&str] = &["creeper", "ghast", "wither"];
const RANGED: &[&str] = &[
    "skeleton",
    "stray",
    "bogged",
    "blaze",
    "witch",
    "pillager",
    "evoker",
    "illusioner",
    "guardian",
    "elder_guardian",
    "shulker",
    "breeze",
    "drowned",
];
const MELEE: &[&str] = &[
    "zombie",
    "husk",
    "zombie_villager",
    "spider",
    "cave_spider",
    "enderman",
    "endermite",
    "silverfish",
    "slime",
    "magma_cube",
    "phantom",
    "vindicator",
    "ravager",
    "vex",
    "wither_skeleton",
    "piglin_brute",
    "hoglin",
    "zoglin",
    "warden",
];

const PASSIVE: &[&str] = &[
    "cow",
    "pig",
    "sheep",
    "chicken",
    "horse",
    "donkey",
    "mule",
    "rabbit",
    "villager",
    "wandering_trader",
    "wolf",
    "cat",
    "ocelot",
    "parrot",
    "llama",
    "fox",
    "bee",
    "goat",
    "turtle",
    "squid",
    "glow_squid",
    "cod",
    "salmon",
    "axolotl",
    "frog",
    "mooshroom",
    "iron_golem",
    "snow_golem",
    "bat",
];

const PROJECTILES: &[&str] = &[
    "arrow",
    "spectral_arrow",
    "trident",
    "fireball",
    "small_fireball",
    "dragon_fireball",
    "wither_skull",
    "snowball",
    "egg",
    "potion",
    "llama_spit",
    "shulker_bullet",
    "wind_charge",
];

/// Category of an entity type name; item and player checks run before the mob tables.
pub fn classify(kind: &str) -> EntityCategory {
    let kind = strip_namespace(kind);
    if ITEMS.contains(&kind) {
        EntityCategory::Item
    } else if PLAYERS.contains(&kind) {
        EntityCategory::Player
    } else if hazard_of(kind).is_some() {
        EntityCategory::Hostile
    } else if PASSIVE.contains(&kind) {
        EntityCategory::Passive
    } else if PROJECTILES.contains(&kind) {
        EntityCategory::Projectile
    } else {
        EntityCategory::Other
    }
}

pub fn hazard_of(kind: &str) -> Option<Hazard> {
    let kind = strip_namespace(kind);
    if EXPLOSIVE.contains(&kind) {
        Some(Hazard::Explosive)
    } else if RANGED.contains(&kind) {
        Some(Hazard::Ranged)
    } else if MELEE.contains(&kind) {
        Some(Hazard::Melee)
    } else {
        None
    }
}
