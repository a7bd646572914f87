//! Error taxonomy for match actions and tick faults

use super::economy::Shortfall;
use super::EntityId;

/// Errors returned synchronously to the caller of a match action.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("{what} is at capacity ({capacity})")]
    Capacity { what: &'static str, capacity: usize },

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("{unit} cannot be spawned from {structure}")]
    InvalidSpawn { structure: String, unit: String },

    #[error("{operation} is not supported by {entity}")]
    UnsupportedOperation {
        operation: &'static str,
        entity: String,
    },

    #[error("insufficient resources: {}", format_shortfalls(.shortfalls))]
    InsufficientResources { shortfalls: Vec<Shortfall> },
}

impl GameError {
    pub fn not_found(what: &'static str, id: impl ToString) -> Self {
        GameError::NotFound {
            what,
            id: id.to_string(),
        }
    }

    /// Stable code for the structured error message sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            GameError::Capacity { .. } => "capacity",
            GameError::NotFound { .. } => "not_found",
            GameError::InvalidSpawn { .. } => "invalid_spawn",
            GameError::UnsupportedOperation { .. } => "unsupported_operation",
            GameError::InsufficientResources { .. } => "insufficient_resources",
        }
    }
}

fn format_shortfalls(shortfalls: &[Shortfall]) -> String {
    shortfalls
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A fault that aborts one match's tick.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TickError {
    #[error("entity {0} reached a non-finite state")]
    NonFiniteEntity(EntityId),

    #[error("player {0} reached a non-finite state")]
    NonFinitePlayer(String),
}

/// A pair skipped during collision resolution.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum PairFault {
    #[error("stale entity reference")]
    StaleReference,

    #[error("bodies share a position, no collision normal")]
    DegenerateNormal,
}
