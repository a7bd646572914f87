//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::r#match::MatchMode;
use crate::game::{GameError, MatchSummary};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_origin);

    Router::new()
        .route("/health", get(health_handler))
        .route("/matches", get(list_matches_handler).post(create_match_handler))
        .route(
            "/matches/:id",
            get(get_match_handler).delete(delete_match_handler),
        )
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `*` allows any origin without credentials; otherwise a comma separated list.
fn cors_layer(client_origin: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if client_origin.trim() == "*" {
        return base.allow_origin(Any);
    }

    let allowed_origins: Vec<HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();

    base.allow_origin(allowed_origins).allow_credentials(true)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_matches: usize,
    active_players: usize,
    connections: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let (active_matches, active_players) = {
        let orchestrator = state.orchestrator.lock();
        (orchestrator.match_count(), orchestrator.player_count())
    };

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_matches,
        active_players,
        connections: state.sessions.len(),
    })
}

// ============================================================================
// Match directory
// ============================================================================

async fn list_matches_handler(State(state): State<AppState>) -> Json<Vec<MatchSummary>> {
    Json(state.orchestrator.lock().directory())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateMatchRequest {
    #[serde(default)]
    mode: MatchMode,
    #[serde(default = "default_map_name")]
    map_name: String,
    #[serde(default)]
    capacity: Option<usize>,
}

fn default_map_name() -> String {
    "plains".to_string()
}

async fn create_match_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<MatchSummary>), AppError> {
    if req.capacity == Some(0) {
        return Err(AppError::BadRequest(
            "capacity must be at least 1".to_string(),
        ));
    }

    let mut orchestrator = state.orchestrator.lock();
    let id = orchestrator.add_new_match(req.mode, &req.map_name, req.capacity)?;
    let summary = MatchSummary::from(orchestrator.get_match(id)?);

    Ok((StatusCode::CREATED, Json(summary)))
}

async fn get_match_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSummary>, AppError> {
    let orchestrator = state.orchestrator.lock();
    let summary = MatchSummary::from(orchestrator.get_match(id)?);
    Ok(Json(summary))
}

async fn delete_match_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.orchestrator.lock().remove_match(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("match not found: {id}")))
    }
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<GameError> for AppError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::NotFound { .. } => AppError::NotFound(err.to_string()),
            GameError::Capacity { .. } => AppError::Conflict(err.to_string()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::Config;

    fn state_with(pairs: &'static [(&'static str, &'static str)]) -> AppState {
        let config = Config::from_lookup(|key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap();
        AppState::new(config)
    }

    async fn call(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_counts() {
        let state = state_with(&[]);
        state
            .orchestrator
            .lock()
            .add_new_match(MatchMode::Skirmish, "plains", None)
            .unwrap();

        let (status, body) = call(
            build_router(state),
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_matches"], 1);
        assert_eq!(body["active_players"], 0);
    }

    #[tokio::test]
    async fn test_create_list_and_delete_match() {
        let state = state_with(&[]);
        let router = build_router(state.clone());

        let (status, created) = call(
            router.clone(),
            post_json("/matches", r#"{"mode":"teams","mapName":"crossroads","capacity":4}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["mode"], "teams");
        assert_eq!(created["mapName"], "crossroads");
        assert_eq!(created["playerCount"], 0);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, listed) = call(
            router.clone(),
            Request::get("/matches").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, _) = call(
            router.clone(),
            Request::delete(format!("/matches/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(state.orchestrator.lock().match_count(), 0);

        let (status, body) = call(
            router,
            Request::get(format!("/matches/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("match"));
    }

    #[tokio::test]
    async fn test_create_match_errors() {
        let state = state_with(&[("MAX_MATCHES", "1")]);
        let router = build_router(state);

        let (status, _) = call(router.clone(), post_json("/matches", r#"{"mapName":"atlantis"}"#)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(router.clone(), post_json("/matches", r#"{"capacity":0}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, created) = call(router.clone(), post_json("/matches", "{}")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["mapName"], "plains");
        assert_eq!(created["mode"], "skirmish");

        let (status, body) = call(router, post_json("/matches", "{}")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("capacity"));
    }

    #[test]
    fn test_game_error_status_mapping() {
        let not_found = AppError::from(GameError::not_found("map", "atlantis"));
        assert!(matches!(not_found, AppError::NotFound(_)));

        let full = AppError::from(GameError::Capacity {
            what: "match",
            capacity: 2,
        });
        assert!(matches!(full, AppError::Conflict(_)));
    }
}
