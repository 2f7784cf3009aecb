//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::SessionHandle;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CLIENT_ORIGIN may list several origins, comma separated
    let allowed_origins: Vec<HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/sessions", get(sessions_handler))
        .route("/sessions/:id", get(session_handler))
        .route("/catalog", get(catalog_handler))
        .route("/catalog/reload", post(reload_catalog_handler))
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_sessions: usize,
    active_players: usize,
    tick_rate: u32,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_sessions: state.registry.active_sessions(),
        active_players: state.registry.total_players(),
        tick_rate: state.config.simulation_tps,
    })
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Serialize)]
struct SessionSummary {
    session_id: Uuid,
    players: usize,
    max_players: usize,
    created_at: DateTime<Utc>,
}

impl SessionSummary {
    fn new(handle: &SessionHandle, max_players: usize) -> Self {
        Self {
            session_id: handle.id,
            players: handle.player_count(),
            max_players,
            created_at: handle.created_at,
        }
    }
}

async fn sessions_handler(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    let max_players = state.config.max_players;
    Json(
        state
            .registry
            .handles()
            .iter()
            .map(|h| SessionSummary::new(h, max_players))
            .collect(),
    )
}

async fn session_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    state
        .registry
        .get(&id)
        .map(|h| Json(SessionSummary::new(&h, state.config.max_players)))
        .ok_or_else(|| AppError::NotFound(format!("session {id}")))
}

// ============================================================================
// Weapon catalog
// ============================================================================

#[derive(Serialize)]
struct CatalogItem {
    catalog_id: i32,
    name: String,
    selectable: bool,
}

async fn catalog_handler(State(state): State<AppState>) -> Json<Vec<CatalogItem>> {
    let catalog = state.catalog();
    Json(
        catalog
            .ids()
            .into_iter()
            .filter_map(|id| {
                catalog.get(id).ok().map(|behavior| CatalogItem {
                    catalog_id: id,
                    name: behavior.name().to_string(),
                    selectable: behavior.selectable(),
                })
            })
            .collect(),
    )
}

#[derive(Serialize)]
struct ReloadResponse {
    weapons: usize,
}

async fn reload_catalog_handler(State(state): State<AppState>) -> Result<Json<ReloadResponse>, AppError> {
    let weapons = state
        .reload_catalog()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(Json(ReloadResponse { weapons }))
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
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
