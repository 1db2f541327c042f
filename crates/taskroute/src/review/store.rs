//! Persistence for feedback records.

use super::FeedbackRecord;
use crate::error::Result;
use crate::sink::SinkFuture;
use crate::sink::firestore::{FirestoreClient, to_object};
use crate::sink::jsonl::JsonlFile;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Keyed store of feedback records.
pub trait FeedbackStore: Send + Sync {
    /// Every stored record. A store that does not exist yet is empty.
    fn load(&self) -> SinkFuture<'_, Vec<FeedbackRecord>>;

    /// Insert or replace the record with `record.id`.
    fn save<'a>(&'a self, record: &'a FeedbackRecord) -> SinkFuture<'a, ()>;
}

// ── JSONL ──────────────────────────────────────────────────────────

/// Id given to a record stored without one, derived from its line.
fn line_id(line_no: usize) -> String {
    format!("line-{line_no}")
}

/// [`FeedbackStore`] over a JSON-lines file, one record per line.
///
/// Lines written before ids existed are addressed as `line-{n}`; saving such
/// a record rewrites that line with the id filled in.
#[derive(Debug)]
pub struct JsonlFeedbackStore {
    file: JsonlFile,
}

impl JsonlFeedbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonlFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl FeedbackStore for JsonlFeedbackStore {
    fn load(&self) -> SinkFuture<'_, Vec<FeedbackRecord>> {
        Box::pin(async move {
            let rows = self.file.read_numbered::<FeedbackRecord>()?;
            Ok(rows
                .into_iter()
                .map(|(line_no, mut record)| {
                    if record.id.is_empty() {
                        record.id = line_id(line_no);
                    }
                    record
                })
                .collect())
        })
    }

    fn save<'a>(&'a self, record: &'a FeedbackRecord) -> SinkFuture<'a, ()> {
        Box::pin(async move {
            let replaced = self.file.upsert(record, |line_no, existing: &FeedbackRecord| {
                if existing.id.is_empty() {
                    line_id(line_no) == record.id
                } else {
                    existing.id == record.id
                }
            })?;
            debug!(
                "{} feedback {} in {}",
                if replaced { "Replaced" } else { "Appended" },
                record.id,
                self.file.path().display()
            );
            Ok(())
        })
    }
}

// ── Firestore ──────────────────────────────────────────────────────

/// [`FeedbackStore`] keeping each record as a document named by its id.
pub struct FirestoreFeedbackStore {
    client: Arc<FirestoreClient>,
    collection: String,
}

impl FirestoreFeedbackStore {
    pub fn new(client: Arc<FirestoreClient>, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
        }
    }
}

impl FeedbackStore for FirestoreFeedbackStore {
    fn load(&self) -> SinkFuture<'_, Vec<FeedbackRecord>> {
        Box::pin(async move {
            let docs = self.client.query(&self.collection, None, None).await?;
            Ok(docs
                .into_iter()
                .filter_map(|(doc_id, fields)| {
                    match serde_json::from_value::<FeedbackRecord>(Value::Object(fields)) {
                        Ok(mut record) => {
                            record.id = doc_id;
                            Some(record)
                        }
                        Err(e) => {
                            warn!("Skipping malformed feedback document {doc_id}: {e}");
                            None
                        }
                    }
                })
                .collect())
        })
    }

    fn save<'a>(&'a self, record: &'a FeedbackRecord) -> SinkFuture<'a, ()> {
        Box::pin(async move {
            let data = to_object(record)?;
            self.client
                .set_document(&self.collection, &record.id, &data)
                .await
        })
    }
}
