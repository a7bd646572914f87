//! Combat capabilities shared by units, structures and projectiles

use serde::{Deserialize, Serialize};

use super::error::GameError;
use super::physics::Body;
use super::stats::ProjectileType;
use super::{EntityId, Team};

/// Something with health that combat can destroy.
pub trait Damageable {
    fn health(&self) -> f64;
    fn health_mut(&mut self) -> &mut f64;
    fn is_destroyed(&self) -> bool;
    fn mark_destroyed(&mut self);

    fn is_dead(&self) -> bool {
        self.health() <= 0.0
    }

    /// Subtract `amount` from health. Returns true if this hit killed it.
    ///
    /// The entity is flagged destroyed on death but stays in its
    /// collection until end-of-tick compaction.
    fn damage(&mut self, amount: f64) -> bool {
        let was_alive = !self.is_dead();
        *self.health_mut() -= amount;
        let killed = was_alive && self.is_dead();
        if killed {
            self.mark_destroyed();
        }
        killed
    }
}

/// Something that fires on a cooldown and is credited with kills.
pub trait Attacker {
    /// Whether the cooldown has elapsed at `now` (milliseconds).
    fn can_attack(&self, now: u64) -> Result<bool, GameError>;
    fn mark_fired(&mut self, now: u64);
    fn credit_kill(&mut self);
}

/// Something projectiles can be created from.
pub trait ProjectileSource {
    fn entity_id(&self) -> EntityId;
    fn team(&self) -> Team;
    fn body(&self) -> &Body;
    fn facing_angle(&self) -> f64;
    fn fired_projectile(&self) -> Option<ProjectileType>;
    fn describe(&self) -> String;
}

/// Combat events recorded during a tick and sent with the next snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum CombatEvent {
    Shot {
        source: EntityId,
        projectile: EntityId,
        projectile_type: ProjectileType,
    },
    Hit {
        source: Option<EntityId>,
        target: EntityId,
        damage: f64,
    },
    Detonation {
        projectile: EntityId,
        x: f64,
        y: f64,
        radius: f64,
    },
    Kill {
        killer: Option<EntityId>,
        victim: EntityId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        health: f64,
        destroyed: bool,
    }

    impl Damageable for Dummy {
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

    #[test]
    fn test_killing_blow_reported_once() {
        let mut target = Dummy {
            health: 50.0,
            destroyed: false,
        };
        assert!(!target.damage(30.0));
        assert!(target.damage(30.0));
        assert!(target.is_destroyed());
        assert_eq!(target.health(), -10.0);

        // already dead: further damage is not another kill
        assert!(!target.damage(5.0));
    }
}
