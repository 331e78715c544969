use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Creates the `analysis_cache` table if it does not exist.
/// The unique constraint on (job_id, candidate_id) is what the cache upsert relies on.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analysis_cache (
            id SERIAL PRIMARY KEY,
            job_id INTEGER NOT NULL,
            candidate_id INTEGER NOT NULL,
            job_title VARCHAR(255) NOT NULL,
            candidate_name VARCHAR(255) NOT NULL,
            analysis_json TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ,
            CONSTRAINT uix_job_candidate UNIQUE (job_id, candidate_id)
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create analysis_cache table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_job_candidate ON analysis_cache (job_id, candidate_id)",
    )
    .execute(pool)
    .await
    .context("Failed to create analysis_cache index")?;

    info!("analysis_cache schema ready");
    Ok(())
}
