//! Task routing, prompt versioning, and interaction logging for LLM calls.
//!
//! `taskroute` sends named tasks (content moderation, theme extraction,
//! translation) to the model configured for each task, using a versioned
//! prompt template, and appends an audit record of every dispatch to a
//! durable log. A separate review layer lets humans flag logged interactions
//! and keeps those flags as a second, annotatable stream.
//!
//! # Getting started
//!
//! ```ignore
//! use std::sync::Arc;
//! use taskroute::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> taskroute::Result<()> {
//!     let settings = Settings::load(None)?;
//!     let stores = open_stores(&settings.storage)?;
//!     let client = ChatClient::from_settings(&settings.completion)?;
//!
//!     let router = TaskRouter::new(
//!         settings.catalog,
//!         settings.prompts,
//!         Arc::new(client),
//!         stores.logs,
//!     );
//!
//!     let verdict = router
//!         .run_task("moderator", &TaskArgs::moderation("Buy cheap watches!!!"))
//!         .await?;
//!     println!("{verdict}");
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **Add or re-route a task:** [`config::Catalog`] holds task → model →
//!   parameters; [`config::Settings`] layers a `taskroute.toml` over the
//!   built-in catalog.
//!
//! - **Change a prompt:** [`prompts::PromptRegistry`] maps each task to a
//!   [`PromptTemplate`](prompts::PromptTemplate) and its version tag. The
//!   version is written into every record so output changes can be traced
//!   back to prompt changes.
//!
//! - **Swap the model provider:** implement
//!   [`CompletionApi`](completion::CompletionApi). [`ChatClient`](completion::ChatClient)
//!   covers any OpenAI-compatible endpoint.
//!
//! - **Store logs somewhere else:** implement [`LogSink`](sink::LogSink).
//!   JSONL and Firestore backends live in [`sink`].
//!
//! - **Review outputs:** [`review::ReviewService`] filters the log, flags
//!   interactions, annotates flags by id, and exports CSV.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`router`] | [`TaskRouter`](router::TaskRouter): resolve, render, call, record |
//! | [`config`] | Catalog of tasks and models, runtime settings, TOML loading |
//! | [`prompts`] | Versioned templates with `{name}` placeholders |
//! | [`task`] | Typed per-kind task arguments |
//! | [`completion`] | Completion trait and OpenAI-compatible HTTP client |
//! | [`sink`] | Interaction records and the JSONL / Firestore log sinks |
//! | [`review`] | Feedback records, filters, stores, CSV export, file validation |

pub mod completion;
pub mod config;
pub mod error;
pub mod prelude;
pub mod prompts;
pub mod review;
pub mod router;
pub mod sink;
pub mod task;

pub use error::{Error, Result};
