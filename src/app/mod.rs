//! Shared context handle and the tick driver

pub mod state;
pub mod ticker;

pub use state::{AppState, SessionInfo};
