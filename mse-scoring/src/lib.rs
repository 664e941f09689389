//! mse-scoring library - Dynamic Scoring Engine
//!
//! Turns judge-entered raw values into canonical, persisted competition
//! results under a per-modality rule model, with heat-scoped results and
//! atomic team fan-out.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod heats;
pub mod model;
pub mod normalizer;
pub mod row_edit;
pub mod service;

pub use error::{Result, ScoringError};
pub use service::{ScoreSubmission, ScoringService, SubmitOutcome};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: ScoringService,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            service: ScoringService::new(db),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let scoring = Router::new()
        .route("/api/scores", post(api::submit_score).get(api::existing_scores))
        .route(
            "/api/modalities/:id/heats",
            get(api::list_heats).post(api::create_heat),
        )
        .route("/api/modalities/:id/heats/final", post(api::create_final_heat))
        .route("/api/modalities/:id/model", get(api::get_scoring_model));

    Router::new()
        .merge(scoring)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
