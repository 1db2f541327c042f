//! Task, model, and runtime configuration.
//!
//! The [`Catalog`] answers "which model serves this task, and with what
//! parameters". [`Settings`] bundles the catalog with the prompt registry,
//! completion endpoint, and storage backend, loaded once at startup from an
//! optional TOML file layered over built-in defaults:
//!
//! ```toml
//! [completion]
//! base_url = "https://api.openai.com/v1"
//! api_key_env = "OPENAI_API_KEY"
//!
//! [storage]
//! backend = "jsonl"
//! log_path = "llm_interactions.jsonl"
//!
//! [models."gpt-4o-mini"]
//! name = "gpt-4o-mini"
//! max_tokens = 800
//! temperature = 0.2
//!
//! [tasks.moderator]
//! model = "gpt-4o-mini"
//! kind = "moderation"
//! description = "Content moderation and safety checks"
//! ```
//!
//! Secrets never live in the file; only the names of the environment
//! variables that hold them.

use crate::error::{Error, Result};
use crate::prompts::{PromptRegistry, PromptTemplate};
use crate::task::TaskKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file read when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "taskroute.toml";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_LOG_FILE: &str = "llm_interactions.jsonl";
pub const DEFAULT_FEEDBACK_FILE: &str = "feedback_queue.jsonl";
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

// ── Catalog ────────────────────────────────────────────────────────

/// Routing entry for a single task.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TaskConfig {
    pub task_id: String,
    /// Key into the catalog's models.
    pub model: String,
    pub description: String,
    pub kind: TaskKind,
}

/// Invocation parameters for a model.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelConfig {
    pub model_id: String,
    /// Name sent to the completion API.
    pub name: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Static task → model → parameters lookup.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tasks: HashMap<String, TaskConfig>,
    models: HashMap<String, ModelConfig>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stock models (`gpt-4`, `gpt-3.5-turbo`) and tasks (`moderator`,
    /// `theme_coder`, `translator`).
    pub fn builtin() -> Self {
        Self::new()
            .with_model("gpt-4", "gpt-4", 2000, 0.7)
            .with_model("gpt-3.5-turbo", "gpt-3.5-turbo", 1000, 0.7)
            .with_task(
                "moderator",
                "gpt-4",
                TaskKind::Moderation,
                "Content moderation and safety checks",
            )
            .with_task(
                "theme_coder",
                "gpt-4",
                TaskKind::Theme,
                "Theme extraction from user feedback",
            )
            .with_task(
                "translator",
                "gpt-3.5-turbo",
                TaskKind::Translation,
                "Text translation (stub implementation)",
            )
    }

    pub fn with_model(
        mut self,
        model_id: impl Into<String>,
        name: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        let model_id = model_id.into();
        self.models.insert(
            model_id.clone(),
            ModelConfig {
                model_id,
                name: name.into(),
                max_tokens,
                temperature,
            },
        );
        self
    }

    pub fn with_task(
        mut self,
        task_id: impl Into<String>,
        model: impl Into<String>,
        kind: TaskKind,
        description: impl Into<String>,
    ) -> Self {
        let task_id = task_id.into();
        self.tasks.insert(
            task_id.clone(),
            TaskConfig {
                task_id,
                model: model.into(),
                description: description.into(),
                kind,
            },
        );
        self
    }

    pub fn resolve_task(&self, task_id: &str) -> Result<&TaskConfig> {
        self.tasks
            .get(task_id)
            .ok_or_else(|| Error::UnknownTask(task_id.to_string()))
    }

    pub fn resolve_model(&self, model_id: &str) -> Result<&ModelConfig> {
        self.models
            .get(model_id)
            .ok_or_else(|| Error::UnknownModel(model_id.to_string()))
    }

    /// Task ids in sorted order.
    pub fn task_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Check cross references and parameter ranges.
    pub fn validate(&self, prompts: &PromptRegistry) -> Result<()> {
        for model in self.models.values() {
            if model.max_tokens == 0 {
                return Err(Error::Config(format!(
                    "model '{}' must allow at least one output token",
                    model.model_id
                )));
            }
            if !(0.0..=2.0).contains(&model.temperature) {
                return Err(Error::Config(format!(
                    "model '{}' temperature {} is outside 0.0..=2.0",
                    model.model_id, model.temperature
                )));
            }
        }
        for task in self.tasks.values() {
            if !self.models.contains_key(&task.model) {
                return Err(Error::Config(format!(
                    "task '{}' references unknown model '{}'",
                    task.task_id, task.model
                )));
            }
            if !prompts.contains(&task.task_id) {
                return Err(Error::Config(format!(
                    "task '{}' has no prompt template",
                    task.task_id
                )));
            }
        }
        Ok(())
    }
}

// ── Runtime settings ───────────────────────────────────────────────

/// Completion endpoint settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CompletionSettings {
    /// Base URL of an OpenAI-compatible API; `/chat/completions` is appended.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: 120,
        }
    }
}

impl CompletionSettings {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "{} not found in environment; set it or add it to .env",
                    self.api_key_env
                ))
            })
    }
}

/// Which persistence backend holds logs and feedback.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Jsonl,
    Firestore,
}

/// Firestore REST connection settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct FirestoreSettings {
    pub project_id: String,
    pub database: String,
    /// Point at the emulator (e.g. `http://localhost:8080/v1`) for local runs.
    pub base_url: String,
    /// Environment variable holding an OAuth access token. Unset means
    /// unauthenticated requests, which only the emulator accepts.
    pub token_env: String,
    pub logs_collection: String,
    pub feedback_collection: String,
}

impl Default for FirestoreSettings {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            database: "(default)".to_string(),
            base_url: DEFAULT_FIRESTORE_URL.to_string(),
            token_env: "FIRESTORE_TOKEN".to_string(),
            logs_collection: "logs".to_string(),
            feedback_collection: "feedback".to_string(),
        }
    }
}

impl FirestoreSettings {
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub log_path: PathBuf,
    pub feedback_path: PathBuf,
    pub firestore: FirestoreSettings,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Jsonl,
            log_path: PathBuf::from(DEFAULT_LOG_FILE),
            feedback_path: PathBuf::from(DEFAULT_FEEDBACK_FILE),
            firestore: FirestoreSettings::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ReviewSettings {
    /// How many recent interactions the review layer loads.
    pub log_window: usize,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self { log_window: 500 }
    }
}

#[derive(Deserialize, Debug)]
struct ModelEntry {
    name: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct TaskEntry {
    model: String,
    kind: TaskKind,
    #[serde(default)]
    description: String,
}

/// On-disk shape of the config file. Every section is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(default, deny_unknown_fields)]
struct SettingsFile {
    completion: CompletionSettings,
    storage: StorageSettings,
    review: ReviewSettings,
    models: BTreeMap<String, ModelEntry>,
    tasks: BTreeMap<String, TaskEntry>,
    prompts: BTreeMap<String, PromptTemplate>,
}

/// Everything the binaries need, fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Settings {
    pub completion: CompletionSettings,
    pub storage: StorageSettings,
    pub review: ReviewSettings,
    pub catalog: Catalog,
    pub prompts: PromptRegistry,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            completion: CompletionSettings::default(),
            storage: StorageSettings::default(),
            review: ReviewSettings::default(),
            catalog: Catalog::builtin(),
            prompts: PromptRegistry::builtin(),
        }
    }
}

impl Settings {
    /// Load settings.
    ///
    /// With an explicit path the file must exist. Without one,
    /// [`DEFAULT_CONFIG_FILE`] is read if present, otherwise built-in defaults
    /// are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !path.exists() {
            if required {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            debug!("No {} found, using built-in defaults", path.display());
            let settings = Self::default();
            settings.catalog.validate(&settings.prompts)?;
            return Ok(settings);
        }

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&contents)
    }

    /// Parse a TOML document, layering its entries over the defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: SettingsFile = toml::from_str(contents)
            .map_err(|e| Error::Config(format!("failed to parse config: {e}")))?;

        let mut catalog = Catalog::builtin();
        for (model_id, entry) in file.models {
            let name = entry.name.unwrap_or_else(|| model_id.clone());
            catalog = catalog.with_model(model_id, name, entry.max_tokens, entry.temperature);
        }
        for (task_id, entry) in file.tasks {
            catalog = catalog.with_task(task_id, entry.model, entry.kind, entry.description);
        }

        let mut prompts = PromptRegistry::builtin();
        for (task_id, template) in file.prompts {
            prompts = prompts.with_template(task_id, template);
        }

        catalog.validate(&prompts)?;

        Ok(Self {
            completion: file.completion,
            storage: file.storage,
            review: file.review,
            catalog,
            prompts,
        })
    }
}
