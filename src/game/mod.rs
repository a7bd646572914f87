//! Game simulation modules

pub mod collision;
pub mod combat;
pub mod economy;
pub mod error;
pub mod map;
pub mod r#match;
pub mod orchestrator;
pub mod physics;
pub mod player;
pub mod projectile;
pub mod snapshot;
pub mod stats;
pub mod structure;
pub mod unit;
pub mod vector;
pub mod world;

pub use error::GameError;
pub use orchestrator::{MatchSummary, Orchestrator};

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vector::Vec2;

/// Identifier of one client connection
pub type ConnectionId = Uuid;

/// Team number; `NEUTRAL_TEAM` marks map-fixed structures
pub type Team = u8;

pub const NEUTRAL_TEAM: Team = 0;

/// Match-unique id of a unit, structure or projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Directional movement flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFlags {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// Mouse state as last reported by a client
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MouseState {
    pub left_pressed: bool,
    pub right_pressed: bool,
    /// Cursor in world coordinates
    pub absolute_coords: Vec2,
    /// Cursor relative to the player's avatar
    pub relative_coords: Vec2,
}

/// Buffered control state of one connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InputState {
    pub move_up: bool,
    pub move_down: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub mouse: MouseState,
}

impl InputState {
    pub fn movement(&self) -> MovementFlags {
        MovementFlags {
            up: self.move_up,
            down: self.move_down,
            left: self.move_left,
            right: self.move_right,
        }
    }

    /// Aim angle from the cursor offset relative to the avatar
    pub fn aim_angle(&self) -> f64 {
        self.mouse.relative_coords.angle()
    }

    /// Overwrite only the axes present in `update`.
    pub fn merge(&mut self, update: &InputUpdate) {
        if let Some(v) = update.move_up {
            self.move_up = v;
        }
        if let Some(v) = update.move_down {
            self.move_down = v;
        }
        if let Some(v) = update.move_left {
            self.move_left = v;
        }
        if let Some(v) = update.move_right {
            self.move_right = v;
        }
        if let Some(mouse) = update.mouse {
            self.mouse = mouse;
        }
    }
}

/// Partial input as received from a client; absent axes keep their value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InputUpdate {
    #[serde(default)]
    pub move_up: Option<bool>,
    #[serde(default)]
    pub move_down: Option<bool>,
    #[serde(default)]
    pub move_left: Option<bool>,
    #[serde(default)]
    pub move_right: Option<bool>,
    #[serde(default)]
    pub mouse: Option<MouseState>,
}
