pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod workers;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::EngineConfig;
use crate::db::DatabaseProxy;
use crate::state::AppState;
use crate::workers::JobConfig;

/// Full HTTP application over an already-connected database.
pub fn create_app(db: DatabaseProxy, engine: EngineConfig, jobs: JobConfig) -> axum::Router {
    let state = AppState::new(db, engine, jobs);
    app_with_state(state)
}

pub fn app_with_state(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
