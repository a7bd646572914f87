//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::snapshot::Snapshot;
use crate::game::stats::{StructureType, UnitType};
use crate::game::{EntityId, GameError, InputUpdate, Team};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Join a match from the directory on the given team
    JoinMatch {
        match_id: Uuid,
        display_name: String,
        team: Team,
    },

    /// Control state; absent axes keep their previous value
    Input {
        #[serde(flatten)]
        update: InputUpdate,
    },

    /// Place a structure, paid immediately, built after its build time
    Build {
        structure_type: StructureType,
        x: f64,
        y: f64,
    },

    /// Train a unit at one of the player's structures
    Spawn {
        structure_id: EntityId,
        unit_type: UnitType,
    },

    /// Leave the current match
    Leave,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        connection_id: Uuid,
        server_time: u64,
    },

    /// Confirmation of match join
    MatchJoined {
        match_id: Uuid,
        team: Team,
        avatar: Option<EntityId>,
        x: f64,
        y: f64,
    },

    /// Post-tick state for this connection
    Snapshot(Box<Snapshot>),

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl From<&GameError> for ServerMsg {
    fn from(err: &GameError) -> Self {
        ServerMsg::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_is_flattened() {
        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"input","move_up":true,"move_left":false}"#).unwrap();
        match msg {
            ClientMsg::Input { update } => {
                assert_eq!(update.move_up, Some(true));
                assert_eq!(update.move_left, Some(false));
                assert_eq!(update.move_down, None);
                assert!(update.mouse.is_none());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_spawn_and_build_parse() {
        let msg: ClientMsg = serde_json::from_str(
            r#"{"type":"spawn","structure_id":12,"unit_type":"archer"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMsg::Spawn {
                structure_id: EntityId(12),
                unit_type: UnitType::Archer,
            }
        );

        let msg: ClientMsg = serde_json::from_str(
            r#"{"type":"build","structure_type":"watch_tower","x":10.5,"y":20}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMsg::Build {
                structure_type: StructureType::WatchTower,
                x: 10.5,
                y: 20.0,
            }
        );
    }

    #[test]
    fn test_error_carries_code() {
        let err = GameError::Capacity {
            what: "match",
            capacity: 2,
        };
        let json = serde_json::to_value(ServerMsg::from(&err)).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "capacity");
        assert_eq!(json["message"], "match is at capacity (2)");
    }
}
