//! Per-connection WebSocket adapter

pub mod handler;
pub mod protocol;
