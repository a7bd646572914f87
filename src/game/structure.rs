//! Static structures

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use super::combat::{Attacker, Damageable, ProjectileSource};
use super::error::GameError;
use super::physics::Body;
use super::stats::{ProjectileType, StructureType, UnitType, STRUCTURE_MASS, TURRET_TURN_RATE};
use super::vector::Vec2;
use super::{ConnectionId, EntityId, Team};

/// Angle within which a turret counts as aimed (radians)
pub const AIM_TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub id: EntityId,
    /// Owning connection; `None` for neutral map structures
    pub owner: Option<ConnectionId>,
    pub body: Body,
    pub structure_type: StructureType,
    pub team: Team,
    pub health: f64,
    /// Milliseconds it took to build
    pub build_time: u64,
    pub spawnable_unit_types: Vec<UnitType>,
    pub turret_angle: f64,
    pub attack_range: f64,
    pub attack_cooldown: u64,
    pub last_shot_time: u64,
    pub fired_projectile: Option<ProjectileType>,
    pub kills: u32,
    pub destroyed: bool,
}

impl Structure {
    pub fn new(
        id: EntityId,
        structure_type: StructureType,
        team: Team,
        owner: Option<ConnectionId>,
        position: Vec2,
    ) -> Self {
        let stats = structure_type.stats();
        Self {
            id,
            owner,
            body: Body::new(position, STRUCTURE_MASS, stats.hitbox_radius),
            structure_type,
            team,
            health: stats.health,
            build_time: stats.build_time,
            spawnable_unit_types: stats.spawnable_units.to_vec(),
            turret_angle: 0.0,
            attack_range: stats.attack_range,
            attack_cooldown: stats.attack_cooldown,
            last_shot_time: 0,
            fired_projectile: stats.fired_projectile,
            kills: 0,
            destroyed: false,
        }
    }

    pub fn can_spawn(&self, unit_type: UnitType) -> bool {
        self.spawnable_unit_types.contains(&unit_type)
    }

    pub fn is_attack_capable(&self) -> bool {
        self.structure_type.is_attack_capable()
    }

    /// Rotate the turret toward `target` by at most the turret turn rate.
    /// Structures without a turret ignore targets.
    pub fn update(&mut self, dt: f64, target: Option<Vec2>) {
        if !self.is_attack_capable() {
            return;
        }
        let Some(target) = target else {
            return;
        };

        let desired = (target - self.body.position).angle();
        let diff = shortest_arc(self.turret_angle, desired);
        let max_step = TURRET_TURN_RATE * dt;
        let step = diff.clamp(-max_step, max_step);
        self.turret_angle = (self.turret_angle + step).rem_euclid(TAU);
    }

    /// Turret within aim tolerance of `target`
    pub fn is_aimed_at(&self, target: Vec2) -> bool {
        let desired = (target - self.body.position).angle();
        shortest_arc(self.turret_angle, desired).abs() <= AIM_TOLERANCE
    }
}

/// Signed smallest rotation from `from` to `to`, in (-π, π].
fn shortest_arc(from: f64, to: f64) -> f64 {
    let diff = (to - from).rem_euclid(TAU);
    if diff > PI {
        diff - TAU
    } else {
        diff
    }
}

impl Damageable for Structure {
    fn health(&self) -> f64 {
        self.health
    }

    fn health_mut(&mut self) -> &mut f64 {
        &mut self.health
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn mark_destroyed(&mut self) {
        self.destroyed = true;
    }
}

impl Attacker for Structure {
    fn can_attack(&self, now: u64) -> Result<bool, GameError> {
        if !self.is_attack_capable() {
            return Err(GameError::UnsupportedOperation {
                operation: "attack",
                entity: format!("{:?}", self.structure_type),
            });
        }
        Ok(now > self.last_shot_time + self.attack_cooldown)
    }

    fn mark_fired(&mut self, now: u64) {
        self.last_shot_time = now;
    }

    fn credit_kill(&mut self) {
        self.kills += 1;
    }
}

impl ProjectileSource for Structure {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn team(&self) -> Team {
        self.team
    }

    fn body(&self) -> &Body {
        &self.body
    }

    fn facing_angle(&self) -> f64 {
        self.turret_angle
    }

    fn fired_projectile(&self) -> Option<ProjectileType> {
        self.fired_projectile
    }

    fn describe(&self) -> String {
        format!("structure {} ({:?})", self.id, self.structure_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn structure(structure_type: StructureType) -> Structure {
        Structure::new(EntityId(3), structure_type, 1, None, Vec2::new(1000.0, 1000.0))
    }

    #[test]
    fn test_non_turret_attack_is_unsupported() {
        let farm = structure(StructureType::Farm);
        let err = farm.can_attack(10_000).unwrap_err();
        assert_eq!(err.code(), "unsupported_operation");

        let tower = structure(StructureType::WatchTower);
        assert_eq!(tower.can_attack(10_000), Ok(true));
    }

    #[test]
    fn test_turret_turns_at_fixed_rate() {
        let mut tower = structure(StructureType::WatchTower);
        let target = Vec2::new(1000.0, 1500.0); // straight up the y axis
        tower.update(0.5, Some(target));
        assert!((tower.turret_angle - 0.75).abs() < 1e-12);
        assert!(!tower.is_aimed_at(target));

        tower.update(1.0, Some(target));
        assert!((tower.turret_angle - FRAC_PI_2).abs() < 1e-12);
        assert!(tower.is_aimed_at(target));
    }

    #[test]
    fn test_turret_takes_short_way_round() {
        let mut tower = structure(StructureType::CannonTower);
        let target = Vec2::new(1000.0, 500.0); // -π/2
        tower.update(0.1, Some(target));
        assert!((tower.turret_angle - (TAU - 0.15)).abs() < 1e-12);
    }

    #[test]
    fn test_neutral_wall_has_no_turret() {
        let mut wall = structure(StructureType::Wall);
        wall.update(1.0, Some(Vec2::new(0.0, 0.0)));
        assert_eq!(wall.turret_angle, 0.0);
        assert!(wall.spawnable_unit_types.is_empty());
    }
}
