//! Capacity-bounded registry of matches driven by one tick loop

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

use super::error::GameError;
use super::map;
use super::player::Player;
use super::r#match::{Match, MatchMode};
use super::stats::{StructureType, UnitType};
use super::vector::Vec2;
use super::{ConnectionId, EntityId, InputUpdate, Team};

const TOKEN_LEN: usize = 6;
const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Directory entry of an open match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub id: Uuid,
    pub mode: MatchMode,
    pub player_count: usize,
    pub token: String,
    pub map_name: String,
}

impl From<&Match> for MatchSummary {
    fn from(game: &Match) -> Self {
        Self {
            id: game.id,
            mode: game.mode,
            player_count: game.player_count(),
            token: game.token.clone(),
            map_name: game.map_name.clone(),
        }
    }
}

/// Outcome of one orchestrator tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    pub matches: usize,
    pub failed: usize,
    pub snapshots: usize,
}

pub struct Orchestrator {
    /// Registration order, which is also tick order
    matches: Vec<Match>,
    capacity: usize,
    default_match_capacity: usize,
    /// Match each connection currently plays in
    connections: HashMap<ConnectionId, Uuid>,
    rng: ChaCha8Rng,
}

impl Orchestrator {
    pub fn new(capacity: usize, default_match_capacity: usize) -> Self {
        Self::with_rng(capacity, default_match_capacity, ChaCha8Rng::from_entropy())
    }

    pub fn with_seed(capacity: usize, default_match_capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, default_match_capacity, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, default_match_capacity: usize, rng: ChaCha8Rng) -> Self {
        Self {
            matches: Vec::new(),
            capacity,
            default_match_capacity,
            connections: HashMap::new(),
            rng,
        }
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn player_count(&self) -> usize {
        self.matches.iter().map(Match::player_count).sum()
    }

    /// Create and register a match on `map_name`. `capacity` defaults to
    /// the configured players per match.
    pub fn add_new_match(
        &mut self,
        mode: MatchMode,
        map_name: &str,
        capacity: Option<usize>,
    ) -> Result<Uuid, GameError> {
        if self.matches.len() >= self.capacity {
            return Err(GameError::Capacity {
                what: "orchestrator",
                capacity: self.capacity,
            });
        }
        let layout = map::lookup(map_name)?;

        let id = Uuid::new_v4();
        let token = self.unique_token();
        let seed = self.rng.gen();
        let capacity = capacity.unwrap_or(self.default_match_capacity);
        self.matches
            .push(Match::new(id, token.clone(), mode, &layout, capacity, seed));

        info!(match_id = %id, %token, map = map_name, ?mode, capacity, "Match created");
        Ok(id)
    }

    fn unique_token(&mut self) -> String {
        loop {
            let token: String = (0..TOKEN_LEN)
                .map(|_| char::from(TOKEN_ALPHABET[self.rng.gen_range(0..TOKEN_ALPHABET.len())]))
                .collect();
            if self.matches.iter().all(|m| m.token != token) {
                return token;
            }
        }
    }

    pub fn get_match(&self, id: Uuid) -> Result<&Match, GameError> {
        self.matches
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| GameError::not_found("match", id))
    }

    pub fn get_match_mut(&mut self, id: Uuid) -> Result<&mut Match, GameError> {
        self.matches
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| GameError::not_found("match", id))
    }

    /// Unregister a match. Absent ids are ignored.
    pub fn remove_match(&mut self, id: Uuid) -> bool {
        let before = self.matches.len();
        self.matches.retain(|m| m.id != id);
        if self.matches.len() == before {
            return false;
        }
        self.connections.retain(|_, match_id| *match_id != id);
        info!(match_id = %id, "Match removed");
        true
    }

    /// Join `match_id`, leaving the connection's current match first.
    pub fn join_match(
        &mut self,
        match_id: Uuid,
        connection_id: ConnectionId,
        display_name: String,
        team: Team,
        outbox: mpsc::Sender<ServerMsg>,
    ) -> Result<&Player, GameError> {
        let index = self
            .matches
            .iter()
            .position(|m| m.id == match_id)
            .ok_or_else(|| GameError::not_found("match", match_id))?;
        self.matches[index].check_join(connection_id, team)?;

        if let Some(previous) = self.connections.remove(&connection_id) {
            if previous != match_id {
                if let Some(game) = self.matches.iter_mut().find(|m| m.id == previous) {
                    game.disconnect(connection_id);
                }
            }
        }

        let player = self.matches[index].join(connection_id, display_name, team, outbox)?;
        self.connections.insert(connection_id, match_id);
        Ok(player)
    }

    fn bound_match(&mut self, connection_id: ConnectionId) -> Result<&mut Match, GameError> {
        let match_id = *self
            .connections
            .get(&connection_id)
            .ok_or_else(|| GameError::not_found("connection", connection_id))?;
        self.get_match_mut(match_id)
    }

    pub fn apply_input(
        &mut self,
        connection_id: ConnectionId,
        update: &InputUpdate,
    ) -> Result<(), GameError> {
        self.bound_match(connection_id)?
            .apply_input(connection_id, update)
    }

    pub fn build_structure(
        &mut self,
        connection_id: ConnectionId,
        structure_type: StructureType,
        position: Vec2,
    ) -> Result<(), GameError> {
        self.bound_match(connection_id)?
            .build_structure(connection_id, structure_type, position)
    }

    pub fn spawn_unit(
        &mut self,
        connection_id: ConnectionId,
        structure_id: EntityId,
        unit_type: UnitType,
    ) -> Result<(), GameError> {
        self.bound_match(connection_id)?
            .spawn_unit(connection_id, structure_id, unit_type)
    }

    /// Leave the connection's match, if any.
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> bool {
        let Some(match_id) = self.connections.remove(&connection_id) else {
            return false;
        };
        self.matches
            .iter_mut()
            .find(|m| m.id == match_id)
            .is_some_and(|game| game.disconnect(connection_id))
    }

    /// Update then broadcast every match in registration order. A failed
    /// update is logged and skips only that match's broadcast.
    pub fn tick(&mut self, now: u64) -> TickStats {
        let mut stats = TickStats {
            matches: self.matches.len(),
            ..TickStats::default()
        };
        for game in &mut self.matches {
            match game.update(now) {
                Ok(_) => stats.snapshots += game.broadcast(),
                Err(err) => {
                    error!(match_id = %game.id, tick = game.tick, %err, "Match tick failed");
                    stats.failed += 1;
                }
            }
        }
        stats
    }

    /// Every match that still has room
    pub fn directory(&self) -> Vec<MatchSummary> {
        self.matches
            .iter()
            .filter(|m| !m.closed)
            .map(MatchSummary::from)
            .collect()
    }
}
