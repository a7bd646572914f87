//! Match state and authoritative tick pipeline

use std::collections::HashMap;
use std::f64::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::util::time::delta_seconds;
use crate::ws::protocol::ServerMsg;

use super::collision::{resolve_collisions, CollisionReport};
use super::combat::{Attacker, CombatEvent};
use super::error::{GameError, TickError};
use super::map::MapLayout;
use super::physics::{WORLD_HEIGHT, WORLD_WIDTH};
use super::player::{Pending, Player};
use super::projectile::Projectile;
use super::snapshot::SnapshotBuilder;
use super::stats::{StructureType, UnitType};
use super::structure::Structure;
use super::unit::Unit;
use super::vector::Vec2;
use super::world::{Entities, EntityRef};
use super::{ConnectionId, EntityId, InputUpdate, Team, NEUTRAL_TEAM};

/// Max angle deviation (radians) of shots fired by non-human entities
pub const FIRE_SPREAD: f64 = 0.05;

/// Gap left between a structure and a unit spawned next to it
const SPAWN_GAP: f64 = 4.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Skirmish,
    Teams,
}

/// One match: players, entity arenas and the per-connection outboxes
#[derive(Debug)]
pub struct Match {
    pub id: Uuid,
    pub token: String,
    pub mode: MatchMode,
    pub map_name: String,
    pub players: HashMap<ConnectionId, Player>,
    pub entities: Entities,
    pub start_positions: Vec<Vec2>,
    pub capacity: usize,
    /// True iff the match is full
    pub closed: bool,
    pub tick: u64,
    /// Clock (ms) of the last tick, used to schedule actions between ticks
    now: u64,
    last_tick_at: Option<u64>,
    outboxes: HashMap<ConnectionId, mpsc::Sender<ServerMsg>>,
    departures: Vec<ConnectionId>,
    events: Vec<CombatEvent>,
    rng: ChaCha8Rng,
}

impl Match {
    pub fn new(
        id: Uuid,
        token: String,
        mode: MatchMode,
        map: &MapLayout,
        capacity: usize,
        seed: u64,
    ) -> Self {
        let mut entities = Entities::new();
        for (structure_type, position) in map.neutral_structures {
            let entity_id = entities.allocate_id();
            entities.structures.push(Structure::new(
                entity_id,
                *structure_type,
                NEUTRAL_TEAM,
                None,
                *position,
            ));
        }

        Self {
            id,
            token,
            mode,
            map_name: map.name.to_string(),
            players: HashMap::new(),
            entities,
            start_positions: map.start_positions.to_vec(),
            capacity,
            closed: capacity == 0,
            tick: 0,
            now: 0,
            last_tick_at: None,
            outboxes: HashMap::new(),
            departures: Vec::new(),
            events: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Start position `connection_id` would get on `team`. Has no side
    /// effects; a connection already in the match keeps its seat.
    pub fn check_join(&self, connection_id: ConnectionId, team: Team) -> Result<Vec2, GameError> {
        let seated = usize::from(self.players.contains_key(&connection_id));
        if self.players.len() - seated >= self.capacity {
            return Err(GameError::Capacity {
                what: "match",
                capacity: self.capacity,
            });
        }
        team.checked_sub(1)
            .and_then(|index| self.start_positions.get(usize::from(index)))
            .copied()
            .ok_or_else(|| GameError::not_found("team", team))
    }

    /// Add a player on `team` with its main base and commander avatar.
    /// A connection already in the match is replaced once the join is
    /// known to succeed.
    pub fn join(
        &mut self,
        connection_id: ConnectionId,
        display_name: String,
        team: Team,
        outbox: mpsc::Sender<ServerMsg>,
    ) -> Result<&Player, GameError> {
        let start = self.check_join(connection_id, team)?;
        if self.players.contains_key(&connection_id) {
            self.departures.retain(|c| *c != connection_id);
            self.remove_player(connection_id);
        }

        let mut player = Player::new(connection_id, display_name, team, start);

        let base_id = self.entities.allocate_id();
        self.entities.structures.push(Structure::new(
            base_id,
            StructureType::MainBase,
            team,
            Some(connection_id),
            start,
        ));
        player.adopt_structure(base_id, StructureType::MainBase);

        let offset = StructureType::MainBase.stats().hitbox_radius
            + UnitType::Commander.stats().hitbox_radius
            + SPAWN_GAP;
        let mut avatar_position = start + Vec2::new(offset, 0.0);
        if avatar_position.x > WORLD_WIDTH {
            avatar_position.x = start.x - offset;
        }
        let avatar_id = self.entities.allocate_id();
        self.entities.units.push(Unit::new_human(
            avatar_id,
            UnitType::Commander,
            team,
            connection_id,
            avatar_position,
        ));
        player.adopt_unit(avatar_id, UnitType::Commander);
        player.avatar = Some(avatar_id);

        self.outboxes.insert(connection_id, outbox);
        self.closed = self.players.len() + 1 == self.capacity;

        info!(
            match_id = %self.id,
            connection_id = %connection_id,
            team,
            player_count = self.players.len() + 1,
            "Player joined match"
        );
        Ok(&*self.players.entry(connection_id).or_insert(player))
    }

    /// Buffer input for the next tick.
    pub fn apply_input(
        &mut self,
        connection_id: ConnectionId,
        update: &InputUpdate,
    ) -> Result<(), GameError> {
        self.players
            .get_mut(&connection_id)
            .ok_or_else(|| GameError::not_found("player", connection_id))?
            .buffer_input(update);
        Ok(())
    }

    /// Schedule removal of a player at the end of the next tick. Output
    /// to the connection stops immediately.
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> bool {
        if !self.players.contains_key(&connection_id) {
            return false;
        }
        self.outboxes.remove(&connection_id);
        if !self.departures.contains(&connection_id) {
            self.departures.push(connection_id);
        }
        true
    }

    pub fn build_structure(
        &mut self,
        connection_id: ConnectionId,
        structure_type: StructureType,
        position: Vec2,
    ) -> Result<(), GameError> {
        if !position.is_finite() {
            return Err(GameError::UnsupportedOperation {
                operation: "build",
                entity: format!("position ({}, {})", position.x, position.y),
            });
        }
        let position = Vec2::new(
            position.x.clamp(0.0, WORLD_WIDTH),
            position.y.clamp(0.0, WORLD_HEIGHT),
        );
        let now = self.now;
        self.players
            .get_mut(&connection_id)
            .ok_or_else(|| GameError::not_found("player", connection_id))?
            .build_structure(structure_type, position, now)
    }

    pub fn spawn_unit(
        &mut self,
        connection_id: ConnectionId,
        structure_id: EntityId,
        unit_type: UnitType,
    ) -> Result<(), GameError> {
        let now = self.now;
        let player = self
            .players
            .get_mut(&connection_id)
            .ok_or_else(|| GameError::not_found("player", connection_id))?;
        let structure = self
            .entities
            .structure_index(structure_id)
            .map(|index| &self.entities.structures[index])
            .filter(|s| !s.destroyed)
            .ok_or_else(|| GameError::not_found("structure", structure_id))?;
        player.train_unit(structure, unit_type, now)
    }

    /// Run one tick at clock `now` (ms): players, entities, collisions,
    /// then end-of-tick compaction.
    pub fn update(&mut self, now: u64) -> Result<CollisionReport, TickError> {
        let dt = self
            .last_tick_at
            .map_or(0.0, |previous| delta_seconds(previous, now));
        self.last_tick_at = Some(now);
        self.now = now;
        self.tick += 1;
        self.events.clear();

        self.update_players(dt, now);
        self.update_entities(dt, now);

        let report = resolve_collisions(&mut self.entities, &mut self.events);
        if report.skipped > 0 {
            debug!(match_id = %self.id, tick = self.tick, skipped = report.skipped, "Skipped collision pairs");
        }

        self.purge();
        self.check_finite()?;
        Ok(report)
    }

    fn update_players(&mut self, dt: f64, now: u64) {
        let mut ids: Vec<ConnectionId> = self.players.keys().copied().collect();
        ids.sort_unstable();

        for connection_id in ids {
            let Some(player) = self.players.get_mut(&connection_id) else {
                continue;
            };
            player.update(dt);
            let input = *player.input();
            let avatar = player.avatar.and_then(|id| self.entities.unit_index(id));

            if let Some(index) = avatar {
                self.entities.units[index].update_on_input(input.movement(), input.aim_angle());
                if input.mouse.left_pressed {
                    self.fire_logged(EntityRef::Unit(index), now, 0.0);
                }
            }
            if input.mouse.right_pressed {
                let target = input.mouse.absolute_coords;
                self.entities
                    .units
                    .iter_mut()
                    .filter(|u| u.owner == Some(connection_id) && !u.is_human && !u.destroyed)
                    .for_each(|u| u.order_move(target));
            }

            let Some(player) = self.players.get_mut(&connection_id) else {
                continue;
            };
            player.update_economy();
            let team = player.team;
            for order in player.take_completed(now) {
                self.deliver(connection_id, team, order);
            }
        }
    }

    fn deliver(&mut self, connection_id: ConnectionId, team: Team, order: Pending) {
        let id = self.entities.allocate_id();
        match order {
            Pending::Structure {
                structure_type,
                position,
            } => {
                self.entities.structures.push(Structure::new(
                    id,
                    structure_type,
                    team,
                    Some(connection_id),
                    position,
                ));
                if let Some(player) = self.players.get_mut(&connection_id) {
                    player.adopt_structure(id, structure_type);
                }
                debug!(match_id = %self.id, connection_id = %connection_id, ?structure_type, "Structure completed");
            }
            Pending::Unit {
                structure_id,
                unit_type,
            } => {
                let Some(structure) = self
                    .entities
                    .structure_index(structure_id)
                    .map(|index| &self.entities.structures[index])
                    .filter(|s| !s.destroyed)
                else {
                    warn!(match_id = %self.id, structure_id = %structure_id, ?unit_type, "Training structure gone, unit lost");
                    return;
                };
                let distance = structure.body.hitbox_radius
                    + unit_type.stats().hitbox_radius
                    + SPAWN_GAP;
                let spawn_point =
                    structure.body.position + Vec2::from_polar(distance, self.rng.gen_range(0.0..TAU));

                match Unit::create_from_structure(id, structure, unit_type, spawn_point) {
                    Ok(mut unit) => {
                        unit.body.bind_to_world();
                        self.entities.units.push(unit);
                        if let Some(player) = self.players.get_mut(&connection_id) {
                            player.adopt_unit(id, unit_type);
                        }
                    }
                    Err(err) => {
                        warn!(match_id = %self.id, structure_id = %structure_id, %err, "Unit training failed");
                    }
                }
            }
        }
    }

    fn update_entities(&mut self, dt: f64, now: u64) {
        for index in 0..self.entities.units.len() {
            let unit = &self.entities.units[index];
            if unit.destroyed {
                continue;
            }
            if !unit.is_human && unit.fired_projectile.is_some() {
                let target = nearest_enemy(
                    &self.entities,
                    unit.team,
                    unit.body.position,
                    unit.attack_range,
                );
                if let Some(target) = target {
                    self.entities.units[index].face(target);
                    let deviation = self.rng.gen_range(-FIRE_SPREAD..=FIRE_SPREAD);
                    self.fire_logged(EntityRef::Unit(index), now, deviation);
                }
            }
            self.entities.units[index].update(dt);
        }

        for index in 0..self.entities.structures.len() {
            let structure = &self.entities.structures[index];
            if structure.destroyed || !structure.is_attack_capable() {
                continue;
            }
            let target = nearest_enemy(
                &self.entities,
                structure.team,
                structure.body.position,
                structure.attack_range,
            );
            let structure = &mut self.entities.structures[index];
            structure.update(dt, target);
            if target.is_some_and(|t| structure.is_aimed_at(t)) {
                let deviation = self.rng.gen_range(-FIRE_SPREAD..=FIRE_SPREAD);
                self.fire_logged(EntityRef::Structure(index), now, deviation);
            }
        }

        for projectile in self.entities.projectiles.iter_mut().filter(|p| !p.destroyed) {
            projectile.update(dt);
        }
    }

    fn fire_logged(&mut self, shooter: EntityRef, now: u64, deviation: f64) {
        if let Err(err) = fire(&mut self.entities, shooter, now, deviation, &mut self.events) {
            warn!(match_id = %self.id, ?shooter, %err, "Firing failed");
        }
    }

    /// Drop destroyed entities, release them from their owners' rosters,
    /// then apply buffered departures.
    fn purge(&mut self) {
        let purged = self.entities.purge_destroyed();
        if !purged.units.is_empty() || !purged.structures.is_empty() {
            debug!(
                match_id = %self.id,
                tick = self.tick,
                units = purged.units.len(),
                structures = purged.structures.len(),
                projectiles = purged.projectiles,
                "Purged destroyed entities"
            );
        }
        let released = purged
            .units
            .iter()
            .map(|u| (u.owner, u.id))
            .chain(purged.structures.iter().map(|s| (s.owner, s.id)));
        for (owner, id) in released {
            if let Some(player) = owner.and_then(|owner| self.players.get_mut(&owner)) {
                player.release(id);
            }
        }

        for connection_id in std::mem::take(&mut self.departures) {
            self.remove_player(connection_id);
        }
    }

    /// Remove a player; its entities stay in the match without an owner.
    fn remove_player(&mut self, connection_id: ConnectionId) {
        if self.players.remove(&connection_id).is_none() {
            return;
        }
        self.outboxes.remove(&connection_id);

        for unit in self
            .entities
            .units
            .iter_mut()
            .filter(|u| u.owner == Some(connection_id))
        {
            unit.owner = None;
            unit.move_target = None;
            if unit.is_human {
                unit.body.velocity = Vec2::ZERO;
                unit.turn_rate = 0.0;
            }
        }
        for structure in self
            .entities
            .structures
            .iter_mut()
            .filter(|s| s.owner == Some(connection_id))
        {
            structure.owner = None;
        }

        self.closed = self.players.len() == self.capacity;
        info!(
            match_id = %self.id,
            connection_id = %connection_id,
            player_count = self.players.len(),
            "Player left match"
        );
    }

    /// Flag entities whose state went non-finite so the next purge drops them.
    fn check_finite(&mut self) -> Result<(), TickError> {
        let mut fault = None;
        for unit in self.entities.units.iter_mut().filter(|u| !u.body.is_finite()) {
            unit.destroyed = true;
            fault.get_or_insert(TickError::NonFiniteEntity(unit.id));
        }
        for structure in self
            .entities
            .structures
            .iter_mut()
            .filter(|s| !s.body.is_finite())
        {
            structure.destroyed = true;
            fault.get_or_insert(TickError::NonFiniteEntity(structure.id));
        }
        for projectile in self
            .entities
            .projectiles
            .iter_mut()
            .filter(|p| !p.body.is_finite())
        {
            projectile.destroyed = true;
            fault.get_or_insert(TickError::NonFiniteEntity(projectile.id));
        }
        for player in self.players.values_mut().filter(|p| !p.is_finite()) {
            player.position = Vec2::ZERO;
            player.velocity = Vec2::ZERO;
            fault.get_or_insert(TickError::NonFinitePlayer(player.connection_id.to_string()));
        }
        fault.map_or(Ok(()), Err)
    }

    /// Send every connected player its post-tick snapshot. Returns the
    /// number of snapshots queued.
    pub fn broadcast(&self) -> usize {
        let builder = SnapshotBuilder::new(self.tick, &self.entities, &self.events);
        let mut delivered = 0;
        for (connection_id, outbox) in &self.outboxes {
            let Some(player) = self.players.get(connection_id) else {
                continue;
            };
            match outbox.try_send(ServerMsg::Snapshot(Box::new(builder.build(player)))) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(match_id = %self.id, connection_id = %connection_id, "Outbox full, dropping snapshot");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(match_id = %self.id, connection_id = %connection_id, "Outbox closed");
                }
            }
        }
        delivered
    }
}

/// Position of the closest hostile unit or structure within `range`.
/// Neutral structures are never targeted.
fn nearest_enemy(entities: &Entities, team: Team, from: Vec2, range: f64) -> Option<Vec2> {
    let hostile = |other: Team| other != team && other != NEUTRAL_TEAM;
    let units = entities
        .units
        .iter()
        .filter(|u| !u.destroyed && hostile(u.team))
        .map(|u| u.body.position);
    let structures = entities
        .structures
        .iter()
        .filter(|s| !s.destroyed && hostile(s.team))
        .map(|s| s.body.position);

    units
        .chain(structures)
        .map(|position| (position, position.distance_squared(from)))
        .filter(|(_, distance_squared)| *distance_squared <= range * range)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(position, _)| position)
}

/// Fire from `shooter` if its cooldown elapsed. Returns whether it fired.
fn fire(
    entities: &mut Entities,
    shooter: EntityRef,
    now: u64,
    deviation: f64,
    events: &mut Vec<CombatEvent>,
) -> Result<bool, GameError> {
    let ready = match shooter {
        EntityRef::Unit(i) => entities.units.get(i).map(|u| u.can_attack(now)),
        EntityRef::Structure(i) => entities.structures.get(i).map(|s| s.can_attack(now)),
        EntityRef::Projectile(_) => None,
    };
    let Some(ready) = ready else {
        return Err(GameError::UnsupportedOperation {
            operation: "fire",
            entity: format!("{shooter:?}"),
        });
    };
    if !ready? {
        return Ok(false);
    }

    let id = entities.allocate_id();
    let (source, projectile) = match shooter {
        EntityRef::Unit(i) => {
            let unit = &mut entities.units[i];
            let projectile = Projectile::create_from_unit(id, unit, deviation)?;
            unit.mark_fired(now);
            (unit.id, projectile)
        }
        EntityRef::Structure(i) => {
            let structure = &mut entities.structures[i];
            let projectile = Projectile::create_from_structure(id, structure, deviation)?;
            structure.mark_fired(now);
            (structure.id, projectile)
        }
        EntityRef::Projectile(_) => return Ok(false),
    };
    events.push(CombatEvent::Shot {
        source,
        projectile: id,
        projectile_type: projectile.projectile_type,
    });
    entities.projectiles.push(projectile);
    Ok(true)
}
