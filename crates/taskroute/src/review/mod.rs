//! Human review of logged interactions.
//!
//! The review layer reads the interaction log, lets a reviewer flag an
//! interaction with a [`FeedbackReason`], and keeps those flags as a second
//! stream of [`FeedbackRecord`]s that can be filtered, annotated, and
//! exported. It never dispatches tasks itself.

pub mod export;
pub mod store;
pub mod validate;

use crate::error::{Error, Result};
use crate::sink::{InteractionRecord, LogSink};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use store::FeedbackStore;
use tracing::info;

/// Fixed reviewer categories. Serialized as their display labels.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeedbackReason {
    #[serde(rename = "Vague response")]
    VagueResponse,
    #[serde(rename = "Poor follow-up")]
    PoorFollowUp,
    #[serde(rename = "Incorrect information")]
    IncorrectInformation,
    #[serde(rename = "Other")]
    Other,
}

impl FeedbackReason {
    pub const ALL: [FeedbackReason; 4] = [
        FeedbackReason::VagueResponse,
        FeedbackReason::PoorFollowUp,
        FeedbackReason::IncorrectInformation,
        FeedbackReason::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FeedbackReason::VagueResponse => "Vague response",
            FeedbackReason::PoorFollowUp => "Poor follow-up",
            FeedbackReason::IncorrectInformation => "Incorrect information",
            FeedbackReason::Other => "Other",
        }
    }
}

impl fmt::Display for FeedbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FeedbackReason {
    type Err = String;

    /// Accepts the label in any case, with `-`, `_`, or spaces between words.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalize = |text: &str| -> String {
            text.chars()
                .map(|c| if c == '_' || c == '-' { ' ' } else { c })
                .collect::<String>()
                .to_lowercase()
        };
        let wanted = normalize(s.trim());
        Self::ALL
            .into_iter()
            .find(|r| normalize(r.label()) == wanted)
            .ok_or_else(|| {
                let labels: Vec<&str> = Self::ALL.iter().map(|r| r.label()).collect();
                format!("unknown reason '{s}' (expected one of: {})", labels.join(", "))
            })
    }
}

/// A reviewer's flag on one logged interaction.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FeedbackRecord {
    /// Stable identity used for in-place updates.
    #[serde(default)]
    pub id: String,
    pub log: InteractionRecord,
    pub reason: FeedbackReason,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub reviewed: bool,
}

impl FeedbackRecord {
    /// A new, unreviewed record with a fresh id.
    pub fn new(log: InteractionRecord, reason: FeedbackReason, comment: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            log,
            reason,
            comment: comment.into(),
            reviewed: false,
        }
    }
}

// ── Filters ────────────────────────────────────────────────────────

fn selected(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Equality filter over the log window. Unset or empty fields match all.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct LogFilter {
    pub task: Option<String>,
    pub model: Option<String>,
    pub prompt_version: Option<String>,
}

impl LogFilter {
    pub fn matches(&self, record: &InteractionRecord) -> bool {
        selected(&self.task).is_none_or(|t| record.task == t)
            && selected(&self.model).is_none_or(|m| record.model == m)
            && selected(&self.prompt_version)
                .is_none_or(|v| record.prompt_version.as_deref() == Some(v))
    }
}

/// Filter over feedback records. All set fields must match.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct FeedbackFilter {
    pub task: Option<String>,
    /// A blank label selects every reason.
    #[serde(deserialize_with = "blank_reason_as_none")]
    pub reason: Option<FeedbackReason>,
    /// Case-insensitive substring of the prompt or the response.
    pub keyword: Option<String>,
}

fn blank_reason_as_none<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<FeedbackReason>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match selected(&raw) {
        Some(label) => label.parse().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

impl FeedbackFilter {
    pub fn matches(&self, record: &FeedbackRecord) -> bool {
        if let Some(task) = selected(&self.task)
            && record.log.task != task
        {
            return false;
        }
        if let Some(reason) = self.reason
            && record.reason != reason
        {
            return false;
        }
        match selected(&self.keyword) {
            Some(keyword) => {
                let keyword = keyword.to_lowercase();
                record.log.prompt.to_lowercase().contains(&keyword)
                    || record.log.response.to_lowercase().contains(&keyword)
            }
            None => true,
        }
    }
}

/// Distinct values present in the log window, for building filter choices.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LogFacets {
    pub tasks: Vec<String>,
    pub models: Vec<String>,
    pub prompt_versions: Vec<String>,
}

/// Reviewer edits. `None` leaves a field untouched.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Annotation {
    pub comment: Option<String>,
    pub reviewed: Option<bool>,
}

// ── Service ────────────────────────────────────────────────────────

/// Review operations over a log sink and a feedback store.
pub struct ReviewService {
    logs: Arc<dyn LogSink>,
    feedback: Arc<dyn FeedbackStore>,
    log_window: usize,
}

impl ReviewService {
    pub fn new(logs: Arc<dyn LogSink>, feedback: Arc<dyn FeedbackStore>, log_window: usize) -> Self {
        Self {
            logs,
            feedback,
            log_window,
        }
    }

    /// The most recent `log_window` interactions that pass `filter`, newest first.
    pub async fn logs(&self, filter: &LogFilter) -> Result<Vec<InteractionRecord>> {
        let records = self.logs.recent(self.log_window).await?;
        Ok(records.into_iter().filter(|r| filter.matches(r)).collect())
    }

    pub async fn facets(&self) -> Result<LogFacets> {
        let records = self.logs.recent(self.log_window).await?;
        let mut tasks = BTreeSet::new();
        let mut models = BTreeSet::new();
        let mut versions = BTreeSet::new();
        for record in records {
            tasks.insert(record.task);
            models.insert(record.model);
            if let Some(version) = record.prompt_version {
                versions.insert(version);
            }
        }
        Ok(LogFacets {
            tasks: tasks.into_iter().collect(),
            models: models.into_iter().collect(),
            prompt_versions: versions.into_iter().collect(),
        })
    }

    /// Flag an interaction and persist the new feedback record.
    pub async fn flag(
        &self,
        log: InteractionRecord,
        reason: FeedbackReason,
        comment: impl Into<String>,
    ) -> Result<FeedbackRecord> {
        let record = FeedbackRecord::new(log, reason, comment);
        self.feedback.save(&record).await?;
        info!(
            "Flagged {} interaction from {} as '{}' ({})",
            record.log.task, record.log.timestamp, record.reason, record.id
        );
        Ok(record)
    }

    /// Stored feedback that passes `filter`, in store order.
    pub async fn list(&self, filter: &FeedbackFilter) -> Result<Vec<FeedbackRecord>> {
        let records = self.feedback.load().await?;
        Ok(records.into_iter().filter(|r| filter.matches(r)).collect())
    }

    /// Overwrite the comment and/or reviewed flag of the record with `id`.
    pub async fn annotate(&self, id: &str, annotation: Annotation) -> Result<FeedbackRecord> {
        let mut record = self
            .feedback
            .load()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::FeedbackNotFound(id.to_string()))?;

        if let Some(comment) = annotation.comment {
            record.comment = comment;
        }
        if let Some(reviewed) = annotation.reviewed {
            record.reviewed = reviewed;
        }
        self.feedback.save(&record).await?;
        info!("Updated feedback {id} (reviewed={})", record.reviewed);
        Ok(record)
    }

    /// Filtered feedback rendered as CSV.
    pub async fn export_csv(&self, filter: &FeedbackFilter) -> Result<String> {
        let records = self.list(filter).await?;
        Ok(export::to_csv(&records))
    }
}
