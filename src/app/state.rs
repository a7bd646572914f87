//! Application state shared across routes

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::config::Config;
use crate::game::{ConnectionId, Orchestrator};
use crate::util::time::unix_millis;

/// What the transport layer knows about one live connection
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub connected_at: u64,
    pub display_name: Option<String>,
    pub match_id: Option<Uuid>,
}

impl SessionInfo {
    pub fn new() -> Self {
        Self {
            connected_at: unix_millis(),
            display_name: None,
            match_id: None,
        }
    }
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<Mutex<Orchestrator>>,
    pub sessions: Arc<DashMap<ConnectionId, SessionInfo>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let orchestrator = match config.rng_seed {
            Some(seed) => Orchestrator::with_seed(config.max_matches, config.match_capacity, seed),
            None => Orchestrator::new(config.max_matches, config.match_capacity),
        };

        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(Mutex::new(orchestrator)),
            sessions: Arc::new(DashMap::new()),
        }
    }
}
