//! Review API server.
//!
//! Serves the interaction log and feedback queue configured in
//! `taskroute.toml` (JSONL files or Firestore) over HTTP.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p taskroute-web
//! cargo run -p taskroute-web -- --port 8080
//! cargo run -p taskroute-web -- --config review.toml --static-dir web/out
//! ```
//!
//! Then, for example:
//!
//! ```bash
//! curl 'http://127.0.0.1:3001/api/logs?task=moderator'
//! curl -X POST http://127.0.0.1:3001/api/feedback \
//!   -H 'content-type: application/json' \
//!   -d '{"log": {...}, "reason": "Vague response", "comment": "too generic"}'
//! ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use taskroute::config::Settings;
use taskroute::review::ReviewService;
use taskroute::sink::open_stores;
use taskroute_web::{WebConfig, spawn_web};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// HTTP review API for taskroute logs and feedback.
#[derive(Parser)]
#[command(name = "taskroute-web", version)]
struct Args {
    /// Config file (default: taskroute.toml in the working directory, if present)
    #[arg(long, env = "TASKROUTE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to.
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port for the API server.
    #[arg(long, default_value_t = 3001)]
    port: u16,

    /// Serve a static front-end build from this directory.
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

async fn run(args: Args) -> Result<(), String> {
    let settings = Settings::load(args.config.as_deref()).map_err(|e| e.to_string())?;
    let stores = open_stores(&settings.storage).map_err(|e| e.to_string())?;
    let service = Arc::new(ReviewService::new(
        stores.logs,
        stores.feedback,
        settings.review.log_window,
    ));

    let config = WebConfig {
        bind_addr: (args.host, args.port).into(),
        static_dir: args.static_dir,
    };
    let addr = spawn_web(service, config)
        .await
        .map_err(|e| format!("failed to bind {}:{}: {e}", args.host, args.port))?;
    println!("Review API: http://{addr}/api/logs");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to wait for shutdown signal: {e}"))?;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(Args::parse()).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
