//! Task dispatch.
//!
//! [`TaskRouter::run_task`] resolves a task to its model, renders the task's
//! prompt, calls the completion API (or the translation stub), and appends
//! exactly one [`InteractionRecord`] describing what happened.

use crate::completion::{CompletionApi, CompletionRequest};
use crate::config::Catalog;
use crate::error::{Error, Result};
use crate::prompts::PromptRegistry;
use crate::sink::{InteractionRecord, LogSink};
use crate::task::TaskArgs;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Routes task requests to models and records every dispatch.
pub struct TaskRouter {
    catalog: Catalog,
    prompts: PromptRegistry,
    completion: Arc<dyn CompletionApi>,
    sink: Arc<dyn LogSink>,
}

impl TaskRouter {
    pub fn new(
        catalog: Catalog,
        prompts: PromptRegistry,
        completion: Arc<dyn CompletionApi>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            catalog,
            prompts,
            completion,
            sink,
        }
    }

    /// Run `task_id` with `args` and return the model's response.
    ///
    /// Lookup, argument, and template errors return before anything is sent
    /// or logged. Once dispatched, one record is appended whether the call
    /// succeeded or not; a failing sink is reported through `tracing` and
    /// never changes the returned value.
    pub async fn run_task(&self, task_id: &str, args: &TaskArgs) -> Result<String> {
        let task = self.catalog.resolve_task(task_id)?;
        if args.kind() != task.kind {
            return Err(Error::InvalidArguments {
                task: task_id.to_string(),
                expected: task.kind.as_str(),
                actual: args.kind().as_str(),
            });
        }
        let (prompt, version) = self.prompts.render(task_id, &args.named_values())?;
        let model = self.catalog.resolve_model(&task.model)?;

        debug!(
            "Dispatching {task_id} to {} (prompt {version}, {} chars)",
            model.model_id,
            prompt.len()
        );
        let start = Instant::now();

        let outcome = match args {
            TaskArgs::Translation(t) => Ok(format!(
                "[Dummy Translation] Translated from {} to {}: {}",
                t.source_language, t.target_language, t.text
            )),
            _ => {
                let request = CompletionRequest {
                    model: model.name.clone(),
                    prompt: prompt.clone(),
                    max_tokens: model.max_tokens,
                    temperature: model.temperature,
                };
                self.completion.complete(&request).await
            }
        };

        let record = match &outcome {
            Ok(response) => {
                info!(
                    "Task {task_id} completed with {} in {:.2}s",
                    model.model_id,
                    start.elapsed().as_secs_f64()
                );
                InteractionRecord::success(
                    task_id,
                    &model.model_id,
                    prompt,
                    version,
                    response.as_str(),
                    args.metadata(),
                )
            }
            Err(e) => {
                warn!("Task {task_id} failed on {}: {e}", model.model_id);
                InteractionRecord::failure(
                    task_id,
                    &model.model_id,
                    prompt,
                    Some(version),
                    e.to_string(),
                    args.metadata(),
                )
            }
        };

        if let Err(e) = self.sink.append(&record).await {
            error!(
                "Dropped interaction record for {task_id} at {}: {e}",
                record.timestamp
            );
        }

        outcome
    }
}
