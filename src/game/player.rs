//! Per-connection economic agent

use serde::{Deserialize, Serialize};

use super::economy::{resource_rates, Resources, Tally};
use super::error::GameError;
use super::physics::{WORLD_HEIGHT, WORLD_WIDTH};
use super::stats::{StructureType, UnitType};
use super::structure::Structure;
use super::vector::Vec2;
use super::{ConnectionId, EntityId, InputState, InputUpdate, Team};

/// Camera pan speed in world units per second
pub const PAN_SPEED: f64 = 400.0;

/// Stock granted on join
pub const STARTING_RESOURCES: Resources = Resources::new(500, 300, 400, 200, 150);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedUnit {
    pub id: EntityId,
    pub unit_type: UnitType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedStructure {
    pub id: EntityId,
    pub structure_type: StructureType,
}

/// Construction or training paid for but not yet delivered
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pending {
    Structure {
        structure_type: StructureType,
        position: Vec2,
    },
    Unit {
        structure_id: EntityId,
        unit_type: UnitType,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingOrder {
    pub order: Pending,
    /// Match clock (ms) at which the order completes
    pub ready_at: u64,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub team: Team,
    pub position: Vec2,
    pub velocity: Vec2,
    pub owned_units: Vec<OwnedUnit>,
    pub owned_structures: Vec<OwnedStructure>,
    pub resources: Resources,
    pub resource_rate: Resources,
    /// Human-controlled unit, if alive
    pub avatar: Option<EntityId>,
    pub pending: Vec<PendingOrder>,
    input: InputState,
    composition_changed: bool,
}

impl Player {
    pub fn new(connection_id: ConnectionId, display_name: String, team: Team, position: Vec2) -> Self {
        Self {
            connection_id,
            display_name,
            team,
            position,
            velocity: Vec2::ZERO,
            owned_units: Vec::new(),
            owned_structures: Vec::new(),
            resources: STARTING_RESOURCES,
            resource_rate: Resources::ZERO,
            avatar: None,
            pending: Vec::new(),
            input: InputState::default(),
            composition_changed: true,
        }
    }

    /// Buffer client input until the next tick.
    pub fn buffer_input(&mut self, update: &InputUpdate) {
        self.input.merge(update);
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Apply buffered movement to the camera and integrate it.
    pub fn update(&mut self, dt: f64) {
        let flags = self.input.movement();
        let mut direction = Vec2::ZERO;
        if flags.up {
            direction.y -= 1.0;
        }
        if flags.down {
            direction.y += 1.0;
        }
        if flags.left {
            direction.x -= 1.0;
        }
        if flags.right {
            direction.x += 1.0;
        }
        self.velocity = direction
            .normalized()
            .map_or(Vec2::ZERO, |d| d * PAN_SPEED);

        self.position += self.velocity * dt;
        self.position.x = self.position.x.clamp(0.0, WORLD_WIDTH);
        self.position.y = self.position.y.clamp(0.0, WORLD_HEIGHT);
    }

    /// Recompute the rate if owned entities changed, then apply it.
    pub fn update_economy(&mut self) {
        if self.composition_changed {
            self.calculate_resource_rates();
            self.composition_changed = false;
        }
        self.update_resources();
    }

    pub fn tally(&self) -> Tally {
        Tally::from_types(
            self.owned_structures.iter().map(|s| s.structure_type),
            self.owned_units.iter().map(|u| u.unit_type),
        )
    }

    pub fn calculate_resource_rates(&mut self) {
        self.resource_rate = resource_rates(&self.tally());
    }

    /// Add one tick of `resource_rate` to the stock.
    ///
    /// Only applied while every channel of the rate is non-zero.
    pub fn update_resources(&mut self) {
        if self.resource_rate.all_non_zero() {
            let rate = self.resource_rate;
            self.resources.add(&rate);
        }
    }

    pub fn population(&self) -> usize {
        self.owned_units.len()
    }

    fn pay(&mut self, cost: &Resources) -> Result<(), GameError> {
        let shortfalls = cost.shortfalls(&self.resources);
        if !shortfalls.is_empty() {
            return Err(GameError::InsufficientResources { shortfalls });
        }
        self.resources.subtract(cost);
        Ok(())
    }

    /// Pay for a structure; it is delivered once its build time elapsed.
    pub fn build_structure(
        &mut self,
        structure_type: StructureType,
        position: Vec2,
        now: u64,
    ) -> Result<(), GameError> {
        let stats = structure_type.stats();
        self.pay(&stats.cost)?;
        self.pending.push(PendingOrder {
            order: Pending::Structure {
                structure_type,
                position,
            },
            ready_at: now + stats.build_time,
        });
        Ok(())
    }

    /// Pay for a unit trained at `structure`.
    pub fn train_unit(
        &mut self,
        structure: &Structure,
        unit_type: UnitType,
        now: u64,
    ) -> Result<(), GameError> {
        if structure.owner != Some(self.connection_id) {
            return Err(GameError::not_found("structure", structure.id));
        }
        if !structure.can_spawn(unit_type) {
            return Err(GameError::InvalidSpawn {
                structure: format!("{:?}", structure.structure_type),
                unit: format!("{:?}", unit_type),
            });
        }
        let stats = unit_type.stats();
        self.pay(&stats.cost)?;
        self.pending.push(PendingOrder {
            order: Pending::Unit {
                structure_id: structure.id,
                unit_type,
            },
            ready_at: now + stats.train_time,
        });
        Ok(())
    }

    /// Orders whose time has come, removed from the queue in order.
    pub fn take_completed(&mut self, now: u64) -> Vec<Pending> {
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.ready_at <= now);
        self.pending = waiting;
        ready.into_iter().map(|p| p.order).collect()
    }

    pub fn adopt_structure(&mut self, id: EntityId, structure_type: StructureType) {
        self.owned_structures.push(OwnedStructure { id, structure_type });
        self.composition_changed = true;
    }

    pub fn adopt_unit(&mut self, id: EntityId, unit_type: UnitType) {
        self.owned_units.push(OwnedUnit { id, unit_type });
        self.composition_changed = true;
    }

    /// Forget a destroyed entity. Returns true if it was owned.
    pub fn release(&mut self, id: EntityId) -> bool {
        let before = self.owned_units.len() + self.owned_structures.len();
        self.owned_units.retain(|u| u.id != id);
        self.owned_structures.retain(|s| s.id != id);
        if self.avatar == Some(id) {
            self.avatar = None;
        }
        let released = before != self.owned_units.len() + self.owned_structures.len();
        if released {
            self.composition_changed = true;
        }
        released
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::economy::Channel;
    use uuid::Uuid;

    fn player() -> Player {
        Player::new(Uuid::new_v4(), "tester".to_string(), 1, Vec2::new(500.0, 500.0))
    }

    #[test]
    fn test_no_entities_means_zero_rate() {
        let mut p = player();
        p.update_economy();
        assert_eq!(p.resource_rate, Resources::ZERO);
        assert_eq!(p.resources, STARTING_RESOURCES);
    }

    #[test]
    fn test_rate_applies_only_when_every_channel_non_zero() {
        let mut p = player();
        p.adopt_structure(EntityId(1), StructureType::MainBase);
        p.update_economy();
        assert!(p.resource_rate.all_non_zero());
        assert_eq!(p.resources, Resources::new(503, 302, 403, 202, 151));

        // infantry upkeep drives ammo to zero: stock freezes
        p.adopt_unit(EntityId(2), UnitType::Infantry);
        p.update_economy();
        assert_eq!(p.resource_rate.get(Channel::Ammo), 0);
        assert_eq!(p.resources, Resources::new(503, 302, 403, 202, 151));
    }

    #[test]
    fn test_rate_recomputed_after_release() {
        let mut p = player();
        p.adopt_structure(EntityId(1), StructureType::MainBase);
        p.update_economy();
        assert_ne!(p.resource_rate, Resources::ZERO);

        assert!(p.release(EntityId(1)));
        assert!(!p.release(EntityId(1)));
        p.update_economy();
        assert_eq!(p.resource_rate, Resources::ZERO);
    }

    #[test]
    fn test_build_is_paid_then_delayed() {
        let mut p = player();
        p.build_structure(StructureType::Barracks, Vec2::new(600.0, 600.0), 1_000)
            .unwrap();
        assert_eq!(p.resources.wood, 300);
        assert_eq!(p.resources.stone, 200);

        assert!(p.take_completed(15_999).is_empty());
        let done = p.take_completed(16_000);
        assert_eq!(
            done,
            vec![Pending::Structure {
                structure_type: StructureType::Barracks,
                position: Vec2::new(600.0, 600.0),
            }]
        );
        assert!(p.pending.is_empty());
    }

    #[test]
    fn test_unaffordable_build_reports_every_short_channel() {
        let mut p = player();
        let err = p
            .build_structure(StructureType::MainBase, Vec2::new(0.0, 0.0), 0)
            .unwrap_err();
        match err {
            GameError::InsufficientResources { shortfalls } => {
                let channels: Vec<_> = shortfalls.iter().map(|s| s.channel).collect();
                assert_eq!(channels, vec![Channel::Stone]);
                assert_eq!(shortfalls[0].missing(), 100);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(p.resources, STARTING_RESOURCES);
        assert!(p.pending.is_empty());
    }

    #[test]
    fn test_training_requires_owned_structure() {
        let mut p = player();
        let foreign = Structure::new(
            EntityId(5),
            StructureType::Barracks,
            2,
            Some(Uuid::new_v4()),
            Vec2::new(100.0, 100.0),
        );
        let err = p.train_unit(&foreign, UnitType::Archer, 0).unwrap_err();
        assert_eq!(err.code(), "not_found");

        let own = Structure::new(
            EntityId(6),
            StructureType::Barracks,
            1,
            Some(p.connection_id),
            Vec2::new(100.0, 100.0),
        );
        let err = p.train_unit(&own, UnitType::Cavalry, 0).unwrap_err();
        assert_eq!(err.code(), "invalid_spawn");
        p.train_unit(&own, UnitType::Archer, 0).unwrap();
        assert_eq!(p.pending.len(), 1);
    }

    #[test]
    fn test_camera_clamped_to_world() {
        let mut p = player();
        p.buffer_input(&InputUpdate {
            move_up: Some(true),
            move_left: Some(true),
            ..Default::default()
        });
        for _ in 0..100 {
            p.update(0.04);
        }
        assert_eq!(p.position, Vec2::ZERO);
    }
}
