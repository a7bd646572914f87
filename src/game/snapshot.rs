//! Per-viewer snapshot building

use serde::{Deserialize, Serialize};

use super::combat::CombatEvent;
use super::economy::Resources;
use super::player::Player;
use super::stats::{ProjectileType, StructureType, UnitType};
use super::world::Entities;
use super::{ConnectionId, EntityId, Team};

/// State sent to one connection after every tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "self")]
    pub self_state: SelfState,
    pub player_stats: PlayerStats,
    pub match_stats: MatchStats,
    pub events: Vec<CombatEvent>,
}

/// The viewer's own player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfState {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub team: Team,
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub avatar: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub resources: Resources,
    pub resource_rate: Resources,
    pub population: usize,
}

/// Every live entity of the match, shared by all viewers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchStats {
    pub structures: Vec<StructureView>,
    pub units: Vec<UnitView>,
    pub projectiles: Vec<ProjectileView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureView {
    pub id: EntityId,
    pub structure_type: StructureType,
    pub team: Team,
    pub owner: Option<ConnectionId>,
    pub x: f64,
    pub y: f64,
    pub health: f64,
    pub turret_angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitView {
    pub id: EntityId,
    pub unit_type: UnitType,
    pub team: Team,
    pub owner: Option<ConnectionId>,
    pub is_human: bool,
    pub x: f64,
    pub y: f64,
    pub health: f64,
    pub angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileView {
    pub id: EntityId,
    pub projectile_type: ProjectileType,
    pub team: Team,
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
}

impl MatchStats {
    pub fn collect(entities: &Entities) -> Self {
        Self {
            structures: entities
                .structures
                .iter()
                .map(|s| StructureView {
                    id: s.id,
                    structure_type: s.structure_type,
                    team: s.team,
                    owner: s.owner,
                    x: s.body.position.x,
                    y: s.body.position.y,
                    health: s.health,
                    turret_angle: s.turret_angle,
                })
                .collect(),
            units: entities
                .units
                .iter()
                .map(|u| UnitView {
                    id: u.id,
                    unit_type: u.unit_type,
                    team: u.team,
                    owner: u.owner,
                    is_human: u.is_human,
                    x: u.body.position.x,
                    y: u.body.position.y,
                    health: u.health,
                    angle: u.movement_angle,
                })
                .collect(),
            projectiles: entities
                .projectiles
                .iter()
                .map(|p| ProjectileView {
                    id: p.id,
                    projectile_type: p.projectile_type,
                    team: p.team,
                    x: p.body.position.x,
                    y: p.body.position.y,
                    vel_x: p.body.velocity.x,
                    vel_y: p.body.velocity.y,
                })
                .collect(),
        }
    }
}

/// Builds one snapshot per viewer from state collected once per tick
pub struct SnapshotBuilder {
    tick: u64,
    match_stats: MatchStats,
    events: Vec<CombatEvent>,
}

impl SnapshotBuilder {
    pub fn new(tick: u64, entities: &Entities, events: &[CombatEvent]) -> Self {
        Self {
            tick,
            match_stats: MatchStats::collect(entities),
            events: events.to_vec(),
        }
    }

    pub fn build(&self, viewer: &Player) -> Snapshot {
        Snapshot {
            tick: self.tick,
            self_state: SelfState {
                connection_id: viewer.connection_id,
                display_name: viewer.display_name.clone(),
                team: viewer.team,
                x: viewer.position.x,
                y: viewer.position.y,
                vel_x: viewer.velocity.x,
                vel_y: viewer.velocity.y,
                avatar: viewer.avatar,
            },
            player_stats: PlayerStats {
                resources: viewer.resources,
                resource_rate: viewer.resource_rate,
                population: viewer.population(),
            },
            match_stats: self.match_stats.clone(),
            events: self.events.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::stats::StructureType;
    use crate::game::structure::Structure;
    use crate::game::unit::Unit;
    use crate::game::vector::Vec2;
    use uuid::Uuid;

    fn sample() -> Snapshot {
        let mut entities = Entities::new();
        let id = entities.allocate_id();
        entities.structures.push(Structure::new(
            id,
            StructureType::MainBase,
            1,
            None,
            Vec2::new(600.0, 2000.0),
        ));
        let id = entities.allocate_id();
        let mut unit = Unit::new(id, UnitType::Archer, 1, None, Vec2::new(0.1 + 0.2, 1.0 / 3.0));
        unit.movement_angle = std::f64::consts::PI / 7.0;
        unit.health = 89.999_999_999_999_99;
        entities.units.push(unit);

        let mut viewer = Player::new(Uuid::new_v4(), "viewer".into(), 1, Vec2::new(123.456, 7.0e-5));
        viewer.velocity = Vec2::new(-282.842_712_474_619, 1e-300);
        viewer.calculate_resource_rates();
        let events = vec![CombatEvent::Hit {
            source: None,
            target: id,
            damage: 0.1 * 3.0,
        }];

        SnapshotBuilder::new(42, &entities, &events).build(&viewer)
    }

    #[test]
    fn test_round_trip_preserves_doubles() {
        let snapshot = sample();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
        assert_eq!(back.match_stats.units[0].x.to_bits(), (0.1f64 + 0.2).to_bits());
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("self").is_some());
        assert!(value.get("playerStats").is_some());
        assert_eq!(value["matchStats"]["structures"][0]["structure_type"], "main_base");
        assert_eq!(value["playerStats"]["population"], 0);
    }
}
