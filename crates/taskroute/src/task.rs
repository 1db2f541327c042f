//! Typed task arguments.
//!
//! Each task kind accepts one argument structure. The structure supplies the
//! named values used to render the task's prompt template and the `metadata`
//! map written into the interaction record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The family a configured task belongs to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Moderation,
    Theme,
    Translation,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Moderation => "moderation",
            TaskKind::Theme => "theme",
            TaskKind::Translation => "translation",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ModerationArgs {
    pub content: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ThemeArgs {
    pub requirements: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TranslationArgs {
    pub source_language: String,
    pub target_language: String,
    pub text: String,
}

/// Arguments for a single router invocation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskArgs {
    Moderation(ModerationArgs),
    Theme(ThemeArgs),
    Translation(TranslationArgs),
}

impl TaskArgs {
    pub fn moderation(content: impl Into<String>) -> Self {
        TaskArgs::Moderation(ModerationArgs {
            content: content.into(),
        })
    }

    pub fn theme(requirements: impl Into<String>) -> Self {
        TaskArgs::Theme(ThemeArgs {
            requirements: requirements.into(),
        })
    }

    pub fn translation(
        source_language: impl Into<String>,
        target_language: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        TaskArgs::Translation(TranslationArgs {
            source_language: source_language.into(),
            target_language: target_language.into(),
            text: text.into(),
        })
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            TaskArgs::Moderation(_) => TaskKind::Moderation,
            TaskArgs::Theme(_) => TaskKind::Theme,
            TaskArgs::Translation(_) => TaskKind::Translation,
        }
    }

    /// Named values available to the prompt template.
    pub fn named_values(&self) -> BTreeMap<String, String> {
        let pairs: Vec<(&str, &str)> = match self {
            TaskArgs::Moderation(a) => vec![("content", a.content.as_str())],
            TaskArgs::Theme(a) => vec![("requirements", a.requirements.as_str())],
            TaskArgs::Translation(a) => vec![
                ("source_language", a.source_language.as_str()),
                ("target_language", a.target_language.as_str()),
                ("text", a.text.as_str()),
            ],
        };
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// The original arguments as a flat JSON object, without the `kind` tag.
    pub fn metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        self.named_values()
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect()
    }
}
