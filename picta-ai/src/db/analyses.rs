//! Analysis record persistence
//!
//! One row per analyzed image. List fields are stored as JSON arrays.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::AnalysisError;
use crate::types::{AnalysisRecord, Dimensions, NewAnalysisRecord, RecordStore};

/// `RecordStore` backed by the shared SQLite database
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Number of stored analyses
    pub async fn count(&self) -> Result<i64, AnalysisError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analyses")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn save(&self, record: NewAnalysisRecord) -> Result<AnalysisRecord, AnalysisError> {
        let id = Uuid::new_v4();
        let dominant_colors = serde_json::to_string(&record.dominant_colors)
            .map_err(|e| AnalysisError::Persistence(e.to_string()))?;
        let object_recognition = serde_json::to_string(&record.object_recognition)
            .map_err(|e| AnalysisError::Persistence(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO analyses (id, filename, width, height, dominant_colors, object_recognition, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&record.filename)
        .bind(i64::from(record.dimensions.width))
        .bind(i64::from(record.dimensions.height))
        .bind(dominant_colors)
        .bind(object_recognition)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(id = %id, filename = %record.filename, "Analysis record saved");

        Ok(record.with_id(id))
    }

    async fn get(&self, id: Uuid) -> Result<Option<AnalysisRecord>, AnalysisError> {
        let row = sqlx::query(
            r#"
            SELECT id, filename, width, height, dominant_colors, object_recognition
            FROM analyses
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let width: i64 = row.get("width");
        let height: i64 = row.get("height");
        let dimensions = u32::try_from(width)
            .ok()
            .zip(u32::try_from(height).ok())
            .and_then(|(w, h)| Dimensions::new(w, h))
            .ok_or_else(|| {
                AnalysisError::Persistence(format!(
                    "stored dimensions {}x{} are invalid for {}",
                    width, height, id
                ))
            })?;

        let dominant_colors_json: String = row.get("dominant_colors");
        let object_recognition_json: String = row.get("object_recognition");

        Ok(Some(AnalysisRecord {
            id,
            filename: row.get("filename"),
            dimensions,
            dominant_colors: serde_json::from_str(&dominant_colors_json)
                .map_err(|e| AnalysisError::Persistence(e.to_string()))?,
            object_recognition: serde_json::from_str(&object_recognition_json)
                .map_err(|e| AnalysisError::Persistence(e.to_string()))?,
        }))
    }
}
