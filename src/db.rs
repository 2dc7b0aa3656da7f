//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create tables if not exist
    sqlx::query(SCHEMA_SQL)
        .execute(pool)
        .await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Persisted predictions (append-only)
CREATE TABLE IF NOT EXISTS predictions (
    id BIGSERIAL PRIMARY KEY,
    employee_id BIGINT,
    input_data JSONB NOT NULL,
    prediction INT NOT NULL,
    probability DOUBLE PRECISION NOT NULL,
    class_name VARCHAR(50) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    model_version VARCHAR(50) NOT NULL DEFAULT '1.0.0'
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_predictions_employee ON predictions(employee_id);
CREATE INDEX IF NOT EXISTS idx_predictions_created ON predictions(created_at);
"#;
