//! Employee Attrition Prediction API
//!
//! Serves a pre-trained binary attrition classifier over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   ATTRITION API                          │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │  API      │  │  Validation  │  │  Inference       │  │
//! │  │  Gateway  │  │  + Feature   │  │  (ONNX pipeline  │  │
//! │  │  (Axum)   │  │  Assembly    │  │   + threshold)   │  │
//! │  └─────┬─────┘  └──────┬───────┘  └────────┬─────────┘  │
//! │        └───────────────┼───────────────────┘            │
//! │                        ▼                                │
//! │                 ┌─────────────┐                         │
//! │                 │ PostgreSQL  │                         │
//! │                 └─────────────┘                         │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod error;
mod handlers;
mod ml;
mod models;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ml::ModelContext;

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "attrition_api=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("Attrition API starting...");
    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

    // Initialize database pool
    let pool = db::create_pool(&config.database_url).await
        .expect("Failed to create database pool");

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await
        .expect("Failed to run migrations");

    // Load model artifacts; requests retry on demand if this fails
    let model = Arc::new(ModelContext::new(config.model_dir.clone()));
    if model.load() {
        tracing::info!("Model artifacts loaded");
    } else {
        tracing::warn!("Model artifacts not loaded; predictions unavailable until a load succeeds");
    }

    // Build application state
    let state = AppState {
        pool,
        config: config.clone(),
        model,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub config: config::Config,
    pub model: Arc<ModelContext>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/model/status", get(handlers::health::model_status))
        .route("/predict/attrition", post(handlers::predict::predict_attrition))
        .route("/predict/attrition/batch", post(handlers::predict::predict_attrition_batch))
        .route("/predict/history", get(handlers::predict::prediction_history))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
