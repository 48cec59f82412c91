//! Mock capabilities for orchestrator and API tests

use async_trait::async_trait;
use picta_ai::db::SqliteRecordStore;
use picta_ai::error::AnalysisError;
use picta_ai::types::{
    AnalysisRecord, AnalysisStage, Dimensions, MetadataExtractor, NewAnalysisRecord,
    PaletteExtractor, PaletteResult, RecognitionCandidate, RecognitionResult, Recognizer, RecordStore,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Answers every call with the same candidates
pub struct FixedRecognizer {
    candidates: RecognitionResult,
    calls: AtomicUsize,
}

impl FixedRecognizer {
    pub fn new(candidates: &[(&str, f32)]) -> Self {
        Self {
            candidates: candidates
                .iter()
                .map(|(label, confidence)| RecognitionCandidate::new(*label, *confidence))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Recognizer for FixedRecognizer {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn recognize(
        &self,
        _image: &[u8],
        _timeout: Duration,
    ) -> Result<RecognitionResult, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.candidates.clone())
    }
}

/// Always reports the service as unavailable
pub struct FailingRecognizer;

#[async_trait]
impl Recognizer for FailingRecognizer {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn recognize(
        &self,
        _image: &[u8],
        _timeout: Duration,
    ) -> Result<RecognitionResult, AnalysisError> {
        Err(AnalysisError::RecognitionUnavailable(
            "service returned 503".to_string(),
        ))
    }
}

/// Never answers and ignores the timeout it is given
pub struct HangingRecognizer;

#[async_trait]
impl Recognizer for HangingRecognizer {
    fn name(&self) -> &'static str {
        "hanging"
    }

    async fn recognize(
        &self,
        _image: &[u8],
        _timeout: Duration,
    ) -> Result<RecognitionResult, AnalysisError> {
        std::future::pending().await
    }
}

/// Metadata extractor that rejects every header, even for valid images
pub struct FailingMetadata;

impl MetadataExtractor for FailingMetadata {
    fn extract_dimensions(&self, _image: &[u8]) -> Result<Dimensions, AnalysisError> {
        Err(AnalysisError::decode(
            AnalysisStage::Metadata,
            "truncated image header",
        ))
    }
}

/// Palette extractor that cannot read anything
pub struct FailingPalette;

impl PaletteExtractor for FailingPalette {
    fn extract_palette(&self, _image: &[u8]) -> Result<PaletteResult, AnalysisError> {
        Err(AnalysisError::decode(
            AnalysisStage::Palette,
            "unsupported pixel layout",
        ))
    }
}

/// Palette extractor whose blocking task panics
pub struct PanickingPalette;

impl PaletteExtractor for PanickingPalette {
    fn extract_palette(&self, _image: &[u8]) -> Result<PaletteResult, AnalysisError> {
        panic!("palette worker crashed");
    }
}

/// In-memory store that counts writes
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<Uuid, AnalysisRecord>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<AnalysisRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn save(&self, record: NewAnalysisRecord) -> Result<AnalysisRecord, AnalysisError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let record = record.with_id(Uuid::new_v4());
        self.records
            .lock()
            .unwrap()
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<AnalysisRecord>, AnalysisError> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }
}

/// Store that rejects every write
pub struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    async fn save(&self, _record: NewAnalysisRecord) -> Result<AnalysisRecord, AnalysisError> {
        Err(AnalysisError::Persistence("database is locked".to_string()))
    }

    async fn get(&self, _id: Uuid) -> Result<Option<AnalysisRecord>, AnalysisError> {
        Ok(None)
    }
}

/// SQLite-backed store on a fresh in-memory database
pub async fn create_test_store() -> SqliteRecordStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    picta_ai::db::init_tables(&pool)
        .await
        .expect("Failed to initialize database schema");
    SqliteRecordStore::new(pool)
}
