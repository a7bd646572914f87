//! Physical bodies, world bounds and collision response

use serde::{Deserialize, Serialize};

use super::vector::Vec2;

/// World width in world units
pub const WORLD_WIDTH: f64 = 4000.0;
/// World height in world units
pub const WORLD_HEIGHT: f64 = 4000.0;

/// Shared physical record of every simulated entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub mass: f64,
    /// Circular collision radius, never negative
    pub hitbox_radius: f64,
}

impl Body {
    pub fn new(position: Vec2, mass: f64, hitbox_radius: f64) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            mass,
            hitbox_radius: hitbox_radius.max(0.0),
        }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Both axes inside the world rectangle (edges inclusive).
    pub fn in_world(&self) -> bool {
        (0.0..=WORLD_WIDTH).contains(&self.position.x)
            && (0.0..=WORLD_HEIGHT).contains(&self.position.y)
    }

    /// Clamp position into the world rectangle.
    pub fn bind_to_world(&mut self) {
        self.position.x = self.position.x.clamp(0.0, WORLD_WIDTH);
        self.position.y = self.position.y.clamp(0.0, WORLD_HEIGHT);
    }

    /// Integrate acceleration then velocity over `dt` seconds.
    pub fn integrate(&mut self, dt: f64) {
        self.velocity += self.acceleration * dt;
        self.position += self.velocity * dt;
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

/// Outcome of an impulse resolution between two bodies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpulseResult {
    pub velocity_a: Vec2,
    pub velocity_b: Vec2,
}

/// Collision tests and impulse responses
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Circles overlap or touch
    pub fn collided(a: &Body, b: &Body) -> bool {
        let combined_radius = a.hitbox_radius + b.hitbox_radius;
        a.position.distance_squared(b.position) <= combined_radius * combined_radius
    }

    /// Closing speed along the normal pointing from `b` to `a`.
    /// Returns `None` when the bodies share a position.
    pub fn closing_speed(a: &Body, b: &Body) -> Option<(Vec2, f64)> {
        let normal = (a.position - b.position).normalized()?;
        let relative_velocity = b.velocity - a.velocity;
        Some((normal, relative_velocity.dot(normal)))
    }

    /// Impulse response when both bodies move.
    ///
    /// Velocities are untouched when the closing speed is non-negative.
    /// Returns `None` for coincident bodies.
    pub fn resolve_pair(a: &Body, b: &Body) -> Option<ImpulseResult> {
        let (normal, closing) = Self::closing_speed(a, b)?;
        if closing >= 0.0 {
            return Some(ImpulseResult {
                velocity_a: a.velocity,
                velocity_b: b.velocity,
            });
        }

        let impulse = 2.0 * closing / (a.mass + b.mass);
        Some(ImpulseResult {
            velocity_a: a.velocity + normal * (impulse * b.mass),
            velocity_b: b.velocity - normal * (impulse * a.mass),
        })
    }

    /// Impulse response against an immovable body `b`; only `a` changes.
    pub fn resolve_against_static(a: &Body, b: &Body) -> Option<Vec2> {
        let (normal, closing) = Self::closing_speed(a, b)?;
        if closing >= 0.0 {
            return Some(a.velocity);
        }

        let impulse = 2.0 * closing / (a.mass + b.mass);
        Some(a.velocity + normal * (impulse * b.mass))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn body_at(x: f64, y: f64, radius: f64) -> Body {
        Body::new(Vec2::new(x, y), 100.0, radius)
    }

    #[test]
    fn test_touching_circles_collide() {
        let a = body_at(0.0, 0.0, 5.0);
        let b = body_at(10.0, 0.0, 5.0);
        assert!(PhysicsSystem::collided(&a, &b));

        let c = body_at(10.5, 0.0, 5.0);
        assert!(!PhysicsSystem::collided(&a, &c));
    }

    #[test]
    fn test_negative_radius_clamped() {
        assert_eq!(body_at(0.0, 0.0, -3.0).hitbox_radius, 0.0);
    }

    #[test]
    fn test_bind_to_world() {
        let mut body = body_at(-50.0, WORLD_HEIGHT + 10.0, 1.0);
        assert!(!body.in_world());
        body.bind_to_world();
        assert_eq!(body.position, Vec2::new(0.0, WORLD_HEIGHT));
        assert!(body.in_world());
    }

    #[test]
    fn test_non_negative_closing_speed_leaves_velocities() {
        let a = body_at(0.0, 0.0, 10.0).with_velocity(Vec2::new(5.0, 1.0));
        let b = body_at(15.0, 0.0, 10.0).with_velocity(Vec2::new(-3.0, 2.0));
        // normal = (-1, 0), relative = (-8, 1), closing = 8
        let result = PhysicsSystem::resolve_pair(&a, &b).unwrap();
        assert_eq!(result.velocity_a, a.velocity);
        assert_eq!(result.velocity_b, b.velocity);
        assert_eq!(PhysicsSystem::resolve_against_static(&a, &b), Some(a.velocity));
    }

    #[test]
    fn test_mass_weighted_impulse() {
        let a = Body::new(Vec2::new(0.0, 0.0), 200.0, 10.0).with_velocity(Vec2::new(-4.0, 0.0));
        let b = Body::new(Vec2::new(15.0, 0.0), 300.0, 10.0).with_velocity(Vec2::new(6.0, 0.0));
        // normal = (-1, 0), relative = (10, 0), closing = -10
        let (normal, s) = PhysicsSystem::closing_speed(&a, &b).unwrap();
        assert_eq!(normal, Vec2::new(-1.0, 0.0));
        assert_eq!(s, -10.0);

        let impulse = 2.0 * s / (200.0 + 300.0);
        let result = PhysicsSystem::resolve_pair(&a, &b).unwrap();
        assert_eq!(result.velocity_a, a.velocity + normal * (impulse * 300.0));
        assert_eq!(result.velocity_b, b.velocity - normal * (impulse * 200.0));
        assert_eq!(result.velocity_a, Vec2::new(8.0, 0.0));
        assert_eq!(result.velocity_b, Vec2::new(-2.0, 0.0));
    }

    #[test]
    fn test_coincident_bodies_have_no_normal() {
        let a = body_at(5.0, 5.0, 1.0);
        let b = body_at(5.0, 5.0, 1.0);
        assert!(PhysicsSystem::resolve_pair(&a, &b).is_none());
    }

    proptest! {
        #[test]
        fn collided_matches_squared_distance(
            ax in -5000.0f64..5000.0, ay in -5000.0f64..5000.0,
            bx in -5000.0f64..5000.0, by in -5000.0f64..5000.0,
            ra in 0.0f64..500.0, rb in 0.0f64..500.0,
        ) {
            let a = body_at(ax, ay, ra);
            let b = body_at(bx, by, rb);
            let dx = ax - bx;
            let dy = ay - by;
            let expected = dx * dx + dy * dy <= (ra + rb) * (ra + rb);
            prop_assert_eq!(PhysicsSystem::collided(&a, &b), expected);
        }
    }
}
