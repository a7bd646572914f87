//! Stat tables for units, structures and projectiles

use serde::{Deserialize, Serialize};

use super::economy::{Channel, Resources};

/// Turret rotation speed of attack-capable structures (radians per second)
pub const TURRET_TURN_RATE: f64 = 1.5;
/// Unit turn speed when a left/right flag is held (radians per second)
pub const UNIT_TURN_RATE: f64 = 2.5;
/// Mass used for structures in impulse responses
pub const STRUCTURE_MASS: f64 = 10_000.0;

/// Mobile unit kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// Human-controlled avatar, one per player
    Commander,
    Infantry,
    Archer,
    /// Melee only, fires nothing
    Cavalry,
    Catapult,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitStats {
    pub health: f64,
    pub speed: f64,
    pub mass: f64,
    pub hitbox_radius: f64,
    pub attack_range: f64,
    /// Milliseconds between shots
    pub attack_cooldown: u64,
    pub fired_projectile: Option<ProjectileType>,
    pub cost: Resources,
    /// Milliseconds from order to appearance
    pub train_time: u64,
    pub upkeep: Resources,
}

impl UnitType {
    pub fn stats(self) -> UnitStats {
        match self {
            UnitType::Commander => UnitStats {
                health: 400.0,
                speed: 160.0,
                mass: 200.0,
                hitbox_radius: 14.0,
                attack_range: 450.0,
                attack_cooldown: 600,
                fired_projectile: Some(ProjectileType::Bullet),
                cost: Resources::ZERO,
                train_time: 0,
                upkeep: Resources::new(0, 0, 1, 0, 0),
            },
            UnitType::Infantry => UnitStats {
                health: 120.0,
                speed: 110.0,
                mass: 200.0,
                hitbox_radius: 12.0,
                attack_range: 380.0,
                attack_cooldown: 900,
                fired_projectile: Some(ProjectileType::Bullet),
                cost: Resources::new(0, 0, 60, 20, 10),
                train_time: 4_000,
                upkeep: Resources::new(0, 0, 1, 0, 1),
            },
            UnitType::Archer => UnitStats {
                health: 90.0,
                speed: 120.0,
                mass: 150.0,
                hitbox_radius: 11.0,
                attack_range: 480.0,
                attack_cooldown: 1_100,
                fired_projectile: Some(ProjectileType::Arrow),
                cost: Resources::new(50, 0, 40, 0, 0),
                train_time: 5_000,
                upkeep: Resources::new(0, 0, 1, 0, 0),
            },
            UnitType::Cavalry => UnitStats {
                health: 220.0,
                speed: 210.0,
                mass: 450.0,
                hitbox_radius: 18.0,
                attack_range: 0.0,
                attack_cooldown: 1_000,
                fired_projectile: None,
                cost: Resources::new(0, 0, 100, 60, 0),
                train_time: 8_000,
                upkeep: Resources::new(0, 0, 2, 0, 0),
            },
            UnitType::Catapult => UnitStats {
                health: 260.0,
                speed: 55.0,
                mass: 800.0,
                hitbox_radius: 24.0,
                attack_range: 900.0,
                attack_cooldown: 4_000,
                fired_projectile: Some(ProjectileType::Boulder),
                cost: Resources::new(200, 80, 0, 80, 0),
                train_time: 15_000,
                upkeep: Resources::new(0, 0, 1, 0, 2),
            },
        }
    }
}

/// Static structure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureType {
    MainBase,
    Barracks,
    Stable,
    Workshop,
    LumberCamp,
    Quarry,
    Farm,
    GoldMine,
    Armory,
    Sawmill,
    Granary,
    Market,
    WatchTower,
    CannonTower,
    Wall,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructureStats {
    pub health: f64,
    pub hitbox_radius: f64,
    /// Milliseconds from order to completion
    pub build_time: u64,
    pub cost: Resources,
    pub spawnable_units: &'static [UnitType],
    pub attack_range: f64,
    pub attack_cooldown: u64,
    /// Present only on attack-capable structures
    pub fired_projectile: Option<ProjectileType>,
    /// Channel yielded as a resource structure
    pub produces: Option<Channel>,
    /// Channel raised and the factor added per structure
    pub bonus: Option<(Channel, f64)>,
    pub upkeep: Resources,
}

impl StructureStats {
    const fn inert(health: f64, hitbox_radius: f64, build_time: u64, cost: Resources) -> Self {
        Self {
            health,
            hitbox_radius,
            build_time,
            cost,
            spawnable_units: &[],
            attack_range: 0.0,
            attack_cooldown: 0,
            fired_projectile: None,
            produces: None,
            bonus: None,
            upkeep: Resources::ZERO,
        }
    }
}

impl StructureType {
    pub fn stats(self) -> StructureStats {
        use StructureType::*;
        match self {
            MainBase => StructureStats {
                spawnable_units: &[UnitType::Infantry],
                ..StructureStats::inert(10_000.0, 60.0, 30_000, Resources::new(400, 400, 0, 200, 0))
            },
            Barracks => StructureStats {
                spawnable_units: &[UnitType::Infantry, UnitType::Archer],
                upkeep: Resources::new(0, 0, 1, 0, 0),
                ..StructureStats::inert(2_500.0, 40.0, 15_000, Resources::new(200, 100, 0, 0, 0))
            },
            Stable => StructureStats {
                spawnable_units: &[UnitType::Cavalry],
                upkeep: Resources::new(0, 0, 1, 0, 0),
                ..StructureStats::inert(2_000.0, 40.0, 18_000, Resources::new(250, 0, 0, 50, 0))
            },
            Workshop => StructureStats {
                spawnable_units: &[UnitType::Catapult],
                upkeep: Resources::new(1, 0, 0, 0, 0),
                ..StructureStats::inert(2_200.0, 45.0, 20_000, Resources::new(300, 150, 0, 0, 0))
            },
            LumberCamp => StructureStats {
                produces: Some(Channel::Wood),
                ..StructureStats::inert(800.0, 25.0, 8_000, Resources::new(100, 0, 0, 0, 0))
            },
            Quarry => StructureStats {
                produces: Some(Channel::Stone),
                ..StructureStats::inert(900.0, 25.0, 8_000, Resources::new(120, 0, 0, 0, 0))
            },
            Farm => StructureStats {
                produces: Some(Channel::Food),
                ..StructureStats::inert(600.0, 30.0, 6_000, Resources::new(80, 0, 0, 0, 0))
            },
            GoldMine => StructureStats {
                produces: Some(Channel::Gold),
                ..StructureStats::inert(1_000.0, 28.0, 12_000, Resources::new(150, 50, 0, 0, 0))
            },
            Armory => StructureStats {
                produces: Some(Channel::Ammo),
                ..StructureStats::inert(1_200.0, 28.0, 12_000, Resources::new(150, 100, 0, 50, 0))
            },
            Sawmill => StructureStats {
                bonus: Some((Channel::Wood, 0.25)),
                ..StructureStats::inert(1_000.0, 26.0, 10_000, Resources::new(150, 50, 0, 0, 0))
            },
            Granary => StructureStats {
                bonus: Some((Channel::Food, 0.25)),
                ..StructureStats::inert(1_000.0, 26.0, 10_000, Resources::new(180, 0, 0, 0, 0))
            },
            Market => StructureStats {
                bonus: Some((Channel::Gold, 0.2)),
                ..StructureStats::inert(1_400.0, 30.0, 15_000, Resources::new(200, 100, 0, 100, 0))
            },
            WatchTower => StructureStats {
                attack_range: 500.0,
                attack_cooldown: 1_200,
                fired_projectile: Some(ProjectileType::Arrow),
                upkeep: Resources::new(0, 0, 0, 0, 1),
                ..StructureStats::inert(1_500.0, 20.0, 10_000, Resources::new(150, 100, 0, 0, 0))
            },
            CannonTower => StructureStats {
                attack_range: 700.0,
                attack_cooldown: 3_500,
                fired_projectile: Some(ProjectileType::Cannonball),
                upkeep: Resources::new(0, 0, 0, 0, 2),
                ..StructureStats::inert(3_000.0, 24.0, 20_000, Resources::new(0, 300, 0, 150, 50))
            },
            Wall => StructureStats::inert(4_000.0, 20.0, 3_000, Resources::new(0, 40, 0, 0, 0)),
        }
    }

    /// Structures with a turret and a projectile to fire
    pub fn is_attack_capable(self) -> bool {
        self.stats().fired_projectile.is_some()
    }
}

/// Projectile kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileType {
    Arrow,
    Bullet,
    Cannonball,
    Boulder,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileStats {
    pub damage: f64,
    pub splash_damage: f64,
    pub splash_radius: f64,
    pub speed: f64,
    pub mass: f64,
    pub hitbox_radius: f64,
    pub max_range: f64,
    pub explodes: bool,
    /// Loses speed along the y axis as it flies
    pub lobbed: bool,
}

impl ProjectileType {
    pub fn stats(self) -> ProjectileStats {
        match self {
            ProjectileType::Arrow => ProjectileStats {
                damage: 24.0,
                splash_damage: 0.0,
                splash_radius: 0.0,
                speed: 520.0,
                mass: 1.0,
                hitbox_radius: 3.0,
                max_range: 600.0,
                explodes: false,
                lobbed: false,
            },
            ProjectileType::Bullet => ProjectileStats {
                damage: 35.0,
                splash_damage: 0.0,
                splash_radius: 0.0,
                speed: 900.0,
                mass: 1.0,
                hitbox_radius: 2.0,
                max_range: 700.0,
                explodes: false,
                lobbed: false,
            },
            ProjectileType::Cannonball => ProjectileStats {
                damage: 120.0,
                splash_damage: 80.0,
                splash_radius: 40.0,
                speed: 480.0,
                mass: 20.0,
                hitbox_radius: 6.0,
                max_range: 900.0,
                explodes: true,
                lobbed: true,
            },
            ProjectileType::Boulder => ProjectileStats {
                damage: 200.0,
                splash_damage: 180.0,
                splash_radius: 55.0,
                speed: 300.0,
                mass: 60.0,
                hitbox_radius: 9.0,
                max_range: 1_000.0,
                explodes: true,
                lobbed: true,
            },
        }
    }
}
