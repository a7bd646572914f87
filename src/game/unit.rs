//! Mobile units

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use super::combat::{Attacker, Damageable, ProjectileSource};
use super::error::GameError;
use super::physics::Body;
use super::stats::{ProjectileType, UnitType, UNIT_TURN_RATE};
use super::structure::Structure;
use super::vector::Vec2;
use super::{ConnectionId, EntityId, MovementFlags, Team};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: EntityId,
    /// Owning connection; `None` once the owner has left
    pub owner: Option<ConnectionId>,
    pub body: Body,
    pub unit_type: UnitType,
    pub team: Team,
    pub is_human: bool,
    pub health: f64,
    pub attack_range: f64,
    /// Milliseconds between shots
    pub attack_cooldown: u64,
    /// Match clock (ms) of the last shot
    pub last_shot_time: u64,
    /// Facing angle in radians, [0, 2π)
    pub movement_angle: f64,
    pub turn_rate: f64,
    pub fired_projectile: Option<ProjectileType>,
    /// Point ordered by the owner, cleared on arrival
    pub move_target: Option<Vec2>,
    pub kills: u32,
    pub destroyed: bool,
}

/// Distance at which a move order counts as reached
pub const ARRIVAL_RADIUS: f64 = 8.0;

impl Unit {
    pub fn new(
        id: EntityId,
        unit_type: UnitType,
        team: Team,
        owner: Option<ConnectionId>,
        position: Vec2,
    ) -> Self {
        let stats = unit_type.stats();
        Self {
            id,
            owner,
            body: Body::new(position, stats.mass, stats.hitbox_radius),
            unit_type,
            team,
            is_human: false,
            health: stats.health,
            attack_range: stats.attack_range,
            attack_cooldown: stats.attack_cooldown,
            last_shot_time: 0,
            movement_angle: 0.0,
            turn_rate: 0.0,
            fired_projectile: stats.fired_projectile,
            move_target: None,
            kills: 0,
            destroyed: false,
        }
    }

    /// Human-controlled avatar for a player
    pub fn new_human(
        id: EntityId,
        unit_type: UnitType,
        team: Team,
        owner: ConnectionId,
        position: Vec2,
    ) -> Self {
        Self {
            is_human: true,
            ..Self::new(id, unit_type, team, Some(owner), position)
        }
    }

    /// Train a unit at `spawn_point` from `structure`, on the structure's team.
    pub fn create_from_structure(
        id: EntityId,
        structure: &Structure,
        unit_type: UnitType,
        spawn_point: Vec2,
    ) -> Result<Self, GameError> {
        if !structure.can_spawn(unit_type) {
            return Err(GameError::InvalidSpawn {
                structure: format!("{:?}", structure.structure_type),
                unit: format!("{:?}", unit_type),
            });
        }
        Ok(Self::new(
            id,
            unit_type,
            structure.team,
            structure.owner,
            spawn_point,
        ))
    }

    /// Apply one buffered input: move along the input angle while a
    /// forward/back flag is held, turn while left/right is held.
    pub fn update_on_input(&mut self, flags: MovementFlags, angle: f64) {
        let speed = self.unit_type.stats().speed;
        self.movement_angle = angle;

        self.body.velocity = match (flags.up, flags.down) {
            (true, false) => Vec2::from_polar(speed, angle),
            (false, true) => Vec2::from_polar(-speed, angle),
            _ => Vec2::ZERO,
        };

        self.turn_rate = match (flags.left, flags.right) {
            (true, false) => -UNIT_TURN_RATE,
            (false, true) => UNIT_TURN_RATE,
            _ => 0.0,
        };
    }

    pub fn order_move(&mut self, target: Vec2) {
        self.move_target = Some(target);
    }

    /// Integrate position and facing over `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        if let Some(target) = self.move_target {
            self.steer_toward(target);
        }
        self.body.integrate(dt);
        self.body.bind_to_world();
        self.movement_angle = (self.movement_angle + self.turn_rate * dt).rem_euclid(TAU);
    }

    fn steer_toward(&mut self, target: Vec2) {
        let offset = target - self.body.position;
        if offset.length() <= ARRIVAL_RADIUS {
            self.body.velocity = Vec2::ZERO;
            self.move_target = None;
            return;
        }
        if let Some(direction) = offset.normalized() {
            self.body.velocity = direction * self.unit_type.stats().speed;
            self.movement_angle = offset.angle().rem_euclid(TAU);
        }
    }

    /// Snap the facing angle toward `target`.
    pub fn face(&mut self, target: Vec2) {
        let direction = target - self.body.position;
        if direction.normalized().is_some() {
            self.movement_angle = direction.angle().rem_euclid(TAU);
        }
    }
}

impl Damageable for Unit {
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

impl Attacker for Unit {
    fn can_attack(&self, now: u64) -> Result<bool, GameError> {
        Ok(now > self.last_shot_time + self.attack_cooldown)
    }

    fn mark_fired(&mut self, now: u64) {
        self.last_shot_time = now;
    }

    fn credit_kill(&mut self) {
        self.kills += 1;
    }
}

impl ProjectileSource for Unit {
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
        self.movement_angle
    }

    fn fired_projectile(&self) -> Option<ProjectileType> {
        self.fired_projectile
    }

    fn describe(&self) -> String {
        format!("unit {} ({:?})", self.id, self.unit_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::WORLD_WIDTH;
    use crate::game::stats::StructureType;
    use std::f64::consts::PI;

    fn infantry_at(x: f64, y: f64) -> Unit {
        Unit::new(EntityId(1), UnitType::Infantry, 1, None, Vec2::new(x, y))
    }

    #[test]
    fn test_cooldown_is_strict() {
        let mut unit = infantry_at(100.0, 100.0);
        unit.mark_fired(1_000);
        assert_eq!(unit.can_attack(1_900), Ok(false));
        assert_eq!(unit.can_attack(1_901), Ok(true));
    }

    #[test]
    fn test_input_moves_along_angle() {
        let mut unit = infantry_at(100.0, 100.0);
        let flags = MovementFlags {
            up: true,
            ..Default::default()
        };
        unit.update_on_input(flags, 0.0);
        assert_eq!(unit.body.velocity, Vec2::new(110.0, 0.0));
        assert_eq!(unit.turn_rate, 0.0);

        unit.update_on_input(MovementFlags::default(), 1.0);
        assert_eq!(unit.body.velocity, Vec2::ZERO);
        assert_eq!(unit.movement_angle, 1.0);
    }

    #[test]
    fn test_update_clamps_and_wraps() {
        let mut unit = infantry_at(WORLD_WIDTH - 1.0, 100.0);
        unit.update_on_input(
            MovementFlags {
                up: true,
                right: true,
                ..Default::default()
            },
            2.0 * PI - 0.1,
        );
        unit.update(1.0);
        assert_eq!(unit.body.position.x, WORLD_WIDTH);
        // 2π - 0.1 + 2.5 wraps past zero
        assert!((unit.movement_angle - 2.4).abs() < 1e-9);
    }

    #[test]
    fn test_move_order_stops_on_arrival() {
        let mut unit = infantry_at(100.0, 100.0);
        unit.order_move(Vec2::new(200.0, 100.0));
        for _ in 0..40 {
            unit.update(0.04);
        }
        assert!(unit.move_target.is_none());
        assert_eq!(unit.body.velocity, Vec2::ZERO);
        assert!((unit.body.position.x - 200.0).abs() <= ARRIVAL_RADIUS);
    }

    #[test]
    fn test_spawn_requires_listed_type() {
        let barracks = Structure::new(
            EntityId(7),
            StructureType::Barracks,
            2,
            None,
            Vec2::new(500.0, 500.0),
        );
        let archer =
            Unit::create_from_structure(EntityId(8), &barracks, UnitType::Archer, Vec2::new(560.0, 500.0))
                .unwrap();
        assert_eq!(archer.team, 2);

        let err = Unit::create_from_structure(
            EntityId(9),
            &barracks,
            UnitType::Catapult,
            Vec2::new(560.0, 500.0),
        )
        .unwrap_err();
        assert_eq!(err.code(), "invalid_spawn");
    }
}
