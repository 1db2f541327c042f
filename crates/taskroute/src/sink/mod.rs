//! Durable interaction log.
//!
//! Every router dispatch produces one [`InteractionRecord`], appended to a
//! [`LogSink`]. Two backends implement the trait:
//!
//! - [`jsonl::JsonlLogSink`]: one JSON object per line in a local file.
//! - [`firestore::FirestoreLogSink`]: one document per record in a Firestore
//!   collection, read back with a descending-timestamp query.
//!
//! Both return `recent(n)` newest first and treat a store that does not exist
//! yet as empty. [`open_stores`] picks the backend from configuration once at
//! startup, so callers only ever see `Arc<dyn LogSink>`.

pub mod firestore;
pub mod jsonl;

use crate::config::{StorageBackend, StorageSettings};
use crate::error::Result;
use crate::review::store::{FeedbackStore, FirestoreFeedbackStore, JsonlFeedbackStore};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::info;

/// Boxed future returned by storage traits.
pub type SinkFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Audit entry for one router dispatch.
///
/// Serialized keys match the line format of the log file and the fields of
/// the Firestore documents.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InteractionRecord {
    /// RFC 3339 UTC creation time.
    pub timestamp: String,
    pub task: String,
    pub model: String,
    pub prompt: String,
    #[serde(default)]
    pub prompt_version: Option<String>,
    /// Empty when `error` is set.
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub error: Option<String>,
    /// The task arguments as supplied by the caller.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl InteractionRecord {
    pub fn success(
        task: impl Into<String>,
        model: impl Into<String>,
        prompt: impl Into<String>,
        prompt_version: impl Into<String>,
        response: impl Into<String>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            timestamp: now_timestamp(),
            task: task.into(),
            model: model.into(),
            prompt: prompt.into(),
            prompt_version: Some(prompt_version.into()),
            response: response.into(),
            error: None,
            metadata,
        }
    }

    pub fn failure(
        task: impl Into<String>,
        model: impl Into<String>,
        prompt: impl Into<String>,
        prompt_version: Option<String>,
        error: impl Into<String>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            timestamp: now_timestamp(),
            task: task.into(),
            model: model.into(),
            prompt: prompt.into(),
            prompt_version,
            response: String::new(),
            error: Some(error.into()),
            metadata,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Current time as RFC 3339 UTC with microseconds.
///
/// Fixed width, so lexicographic order equals chronological order.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Append-only store of interaction records.
pub trait LogSink: Send + Sync {
    /// Persist one record. Fails only with `SinkUnavailable`.
    fn append<'a>(&'a self, record: &'a InteractionRecord) -> SinkFuture<'a, ()>;

    /// Up to `limit` records, newest first.
    fn recent(&self, limit: usize) -> SinkFuture<'_, Vec<InteractionRecord>>;
}

/// The log sink and feedback store for the configured backend.
#[derive(Clone)]
pub struct Stores {
    pub logs: Arc<dyn LogSink>,
    pub feedback: Arc<dyn FeedbackStore>,
}

/// Build both stores for the configured backend.
///
/// The Firestore backend shares a single explicitly constructed client
/// between the two stores.
pub fn open_stores(settings: &StorageSettings) -> Result<Stores> {
    match settings.backend {
        StorageBackend::Jsonl => {
            info!(
                "Using JSONL storage: logs={}, feedback={}",
                settings.log_path.display(),
                settings.feedback_path.display()
            );
            Ok(Stores {
                logs: Arc::new(jsonl::JsonlLogSink::new(&settings.log_path)),
                feedback: Arc::new(JsonlFeedbackStore::new(&settings.feedback_path)),
            })
        }
        StorageBackend::Firestore => {
            let fs = &settings.firestore;
            let client = Arc::new(firestore::FirestoreClient::from_settings(fs)?);
            info!(
                "Using Firestore storage: project={}, database={}",
                fs.project_id, fs.database
            );
            Ok(Stores {
                logs: Arc::new(firestore::FirestoreLogSink::new(
                    client.clone(),
                    &fs.logs_collection,
                )),
                feedback: Arc::new(FirestoreFeedbackStore::new(
                    client,
                    &fs.feedback_collection,
                )),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_record_has_empty_response() {
        let rec = InteractionRecord::failure(
            "moderator",
            "gpt-4",
            "prompt",
            Some("v1.0".into()),
            "boom",
            serde_json::Map::new(),
        );
        assert!(rec.is_failure());
        assert_eq!(rec.response, "");
        assert_eq!(rec.error.as_deref(), Some("boom"));
    }

    #[test]
    fn record_serializes_with_log_keys() {
        let rec = InteractionRecord::success(
            "translator",
            "gpt-3.5-turbo",
            "p",
            "v1.0",
            "r",
            serde_json::Map::new(),
        );
        let json = serde_json::to_value(&rec).unwrap();
        let keys: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        for key in [
            "timestamp",
            "task",
            "model",
            "prompt",
            "prompt_version",
            "response",
            "error",
            "metadata",
        ] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert!(json["error"].is_null());
    }

    #[test]
    fn legacy_line_without_optional_fields_parses() {
        let line = r#"{"timestamp":"2024-05-01T10:00:00.000001","task":"moderator","model":"gpt-4","prompt":"p","response":"r"}"#;
        let rec: InteractionRecord = serde_json::from_str(line).unwrap();
        assert!(rec.prompt_version.is_none());
        assert!(rec.error.is_none());
        assert!(rec.metadata.is_empty());
    }

    #[test]
    fn timestamps_are_fixed_width_utc() {
        let a = now_timestamp();
        let b = now_timestamp();
        assert!(a.ends_with('Z'));
        assert_eq!(a.len(), b.len());
        assert!(a <= b);
    }

    #[test]
    fn jsonl_backend_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = StorageSettings {
            log_path: dir.path().join("logs.jsonl"),
            feedback_path: dir.path().join("feedback.jsonl"),
            ..Default::default()
        };
        assert!(open_stores(&settings).is_ok());
    }

    #[test]
    fn firestore_backend_requires_project() {
        let settings = StorageSettings {
            backend: StorageBackend::Firestore,
            ..Default::default()
        };
        assert!(open_stores(&settings).is_err());
    }
}
