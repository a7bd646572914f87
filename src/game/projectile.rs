//! Projectiles in flight

use serde::{Deserialize, Serialize};

use super::combat::ProjectileSource;
use super::error::GameError;
use super::physics::Body;
use super::stats::ProjectileType;
use super::structure::Structure;
use super::unit::Unit;
use super::vector::Vec2;
use super::{EntityId, Team};

/// Remaining range below which every projectile starts slowing down
pub const DECELERATION_ZONE: f64 = 90.0;
/// Velocity factor applied per tick inside the deceleration zone
pub const DECELERATION_FACTOR: f64 = 0.9;
/// Fraction of y velocity a lobbed projectile loses per second
pub const LOB_DECAY_PER_SEC: f64 = 0.5;
/// Speed (units per second) below which a projectile counts as spent
pub const MIN_FLIGHT_SPEED: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: EntityId,
    pub body: Body,
    pub projectile_type: ProjectileType,
    /// Weak reference to the firer, resolved by id lookup only
    pub source: Option<EntityId>,
    pub team: Team,
    pub damage: f64,
    pub splash_damage: f64,
    pub splash_radius: f64,
    pub explodes: bool,
    pub lobbed: bool,
    pub max_range: f64,
    pub distance_traveled: f64,
    pub destroyed: bool,
}

impl Projectile {
    pub fn create_from_unit(
        id: EntityId,
        unit: &Unit,
        angle_deviation: f64,
    ) -> Result<Self, GameError> {
        Self::create_from(id, unit, angle_deviation)
    }

    pub fn create_from_structure(
        id: EntityId,
        structure: &Structure,
        angle_deviation: f64,
    ) -> Result<Self, GameError> {
        Self::create_from(id, structure, angle_deviation)
    }

    /// Spawn just outside the source's hitbox, flying at the source's
    /// facing angle plus `angle_deviation`.
    pub fn create_from<S: ProjectileSource>(
        id: EntityId,
        source: &S,
        angle_deviation: f64,
    ) -> Result<Self, GameError> {
        let projectile_type = source
            .fired_projectile()
            .ok_or_else(|| GameError::UnsupportedOperation {
                operation: "fire",
                entity: source.describe(),
            })?;
        let stats = projectile_type.stats();

        let angle = source.facing_angle() + angle_deviation;
        let offset = source.body().hitbox_radius + stats.hitbox_radius + 1.0;
        let position = source.body().position + Vec2::from_polar(offset, angle);

        Ok(Self {
            id,
            body: Body::new(position, stats.mass, stats.hitbox_radius)
                .with_velocity(Vec2::from_polar(stats.speed, angle)),
            projectile_type,
            source: Some(source.entity_id()),
            team: source.team(),
            damage: stats.damage,
            splash_damage: stats.splash_damage,
            splash_radius: stats.splash_radius,
            explodes: stats.explodes,
            lobbed: stats.lobbed,
            max_range: stats.max_range,
            distance_traveled: 0.0,
            destroyed: false,
        })
    }

    /// Advance over `dt` seconds and flag destroyed once out of range,
    /// out of the world or slowed below `MIN_FLIGHT_SPEED`.
    pub fn update(&mut self, dt: f64) {
        let step = self.body.velocity * dt;
        self.body.position += step;
        self.distance_traveled += step.length();

        if self.lobbed {
            self.body.velocity.y -= self.body.velocity.y * (LOB_DECAY_PER_SEC * dt).min(1.0);
        }
        if self.max_range - self.distance_traveled < DECELERATION_ZONE {
            self.body.velocity = self.body.velocity * DECELERATION_FACTOR;
        }

        if self.distance_traveled > self.max_range
            || !self.body.in_world()
            || self.body.velocity.length() < MIN_FLIGHT_SPEED
        {
            self.destroyed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::stats::{StructureType, UnitType};

    fn archer() -> Unit {
        Unit::new(EntityId(1), UnitType::Archer, 1, None, Vec2::new(2000.0, 2000.0))
    }

    #[test]
    fn test_created_at_facing_angle_with_type_stats() {
        let unit = archer();
        let arrow = Projectile::create_from_unit(EntityId(2), &unit, 0.0).unwrap();
        assert_eq!(arrow.projectile_type, ProjectileType::Arrow);
        assert_eq!(arrow.source, Some(EntityId(1)));
        assert_eq!(arrow.body.velocity, Vec2::new(520.0, 0.0));
        assert_eq!(arrow.body.position, Vec2::new(2000.0 + 11.0 + 3.0 + 1.0, 2000.0));
        assert!(!arrow.explodes);
    }

    #[test]
    fn test_unit_without_projectile_cannot_fire() {
        let cavalry = Unit::new(EntityId(1), UnitType::Cavalry, 1, None, Vec2::new(10.0, 10.0));
        let err = Projectile::create_from_unit(EntityId(2), &cavalry, 0.0).unwrap_err();
        assert_eq!(err.code(), "unsupported_operation");
    }

    #[test]
    fn test_destroyed_past_max_range() {
        let unit = archer();
        let mut arrow = Projectile::create_from_unit(EntityId(2), &unit, 0.0).unwrap();
        let mut ticks = 0;
        while !arrow.destroyed {
            arrow.update(0.04);
            ticks += 1;
            assert!(ticks < 1_000, "arrow never expired");
        }
        assert!(arrow.distance_traveled > arrow.max_range);
    }

    #[test]
    fn test_destroyed_when_leaving_world() {
        let unit = Unit::new(EntityId(1), UnitType::Infantry, 1, None, Vec2::new(3990.0, 100.0));
        let mut bullet = Projectile::create_from_unit(EntityId(2), &unit, 0.0).unwrap();
        bullet.update(0.04);
        assert!(bullet.distance_traveled < bullet.max_range);
        assert!(bullet.destroyed);
    }

    #[test]
    fn test_decelerates_near_max_range() {
        let unit = archer();
        let mut arrow = Projectile::create_from_unit(EntityId(2), &unit, 0.0).unwrap();
        arrow.distance_traveled = arrow.max_range - 100.0;
        arrow.update(0.01); // 5.2 units, still outside the zone
        assert_eq!(arrow.body.velocity.x, 520.0);
        arrow.update(0.01);
        assert!(arrow.body.velocity.x < 520.0);
    }

    #[test]
    fn test_lobbed_loses_vertical_speed() {
        let mut tower =
            Structure::new(EntityId(4), StructureType::CannonTower, 1, None, Vec2::new(500.0, 500.0));
        tower.turret_angle = std::f64::consts::FRAC_PI_4;
        let mut ball = Projectile::create_from_structure(EntityId(5), &tower, 0.0).unwrap();
        let before = ball.body.velocity;
        ball.update(0.04);
        assert!(ball.body.velocity.y < before.y);
        assert_eq!(ball.body.velocity.x, before.x);
        assert!(ball.explodes);
    }

    #[test]
    fn test_diagonal_boulder_expires() {
        let mut catapult =
            Unit::new(EntityId(6), UnitType::Catapult, 1, None, Vec2::new(500.0, 500.0));
        catapult.movement_angle = std::f64::consts::FRAC_PI_4;
        let mut boulder = Projectile::create_from_unit(EntityId(7), &catapult, 0.0).unwrap();

        let mut ticks = 0;
        while !boulder.destroyed {
            boulder.update(0.04);
            ticks += 1;
            assert!(ticks < 10_000, "boulder never expired");
        }
        assert!(boulder.body.in_world());
        assert!(boulder.distance_traveled <= boulder.max_range);
    }
}
