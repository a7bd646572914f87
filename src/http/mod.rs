//! HTTP surface: health, match directory and the WebSocket upgrade

pub mod routes;

pub use routes::build_router;
