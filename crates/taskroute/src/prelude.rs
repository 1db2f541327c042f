//! Convenience re-exports for common `taskroute` types.
//!
//! ```ignore
//! use taskroute::prelude::*;
//! ```
//!
//! Backend-specific types (the Firestore client, the JSONL file primitive,
//! the validator report) are left out; import those from their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::error::{Error, Result};
pub use crate::task::{TaskArgs, TaskKind};

// ── Configuration ───────────────────────────────────────────────────
pub use crate::config::{Catalog, Settings, StorageBackend};
pub use crate::prompts::{PromptRegistry, PromptTemplate};

// ── Dispatch ────────────────────────────────────────────────────────
pub use crate::completion::{ChatClient, CompletionApi, CompletionRequest};
pub use crate::router::TaskRouter;

// ── Storage ─────────────────────────────────────────────────────────
pub use crate::sink::{InteractionRecord, LogSink, Stores, open_stores};

// ── Review ──────────────────────────────────────────────────────────
pub use crate::review::store::FeedbackStore;
pub use crate::review::{
    Annotation, FeedbackFilter, FeedbackReason, FeedbackRecord, LogFilter, ReviewService,
};
