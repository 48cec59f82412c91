//! Database access for picta-ai
//!
//! Tables are created on startup; the pool itself comes from `picta_common::db`.

pub mod analyses;

pub use analyses::SqliteRecordStore;

use sqlx::SqlitePool;

/// Create picta-ai tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analyses (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            width INTEGER NOT NULL,
            height INTEGER NOT NULL,
            dominant_colors TEXT NOT NULL DEFAULT '[]',
            object_recognition TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_analyses_created_at ON analyses(created_at)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized (analyses)");

    Ok(())
}
