//! Integration tests for the review API server.
//!
//! These tests start a real axum server on a random port, backed by JSONL
//! stores in a temp directory, and exercise the REST endpoints.

use std::sync::Arc;

use serde_json::{Value, json};
use taskroute::Error;
use taskroute::review::ReviewService;
use taskroute::review::store::JsonlFeedbackStore;
use taskroute::sink::jsonl::JsonlLogSink;
use taskroute::sink::{InteractionRecord, LogSink, SinkFuture};
use taskroute_web::{WebConfig, spawn_web};

fn record(task: &str, model: &str, prompt: &str, response: &str) -> InteractionRecord {
    InteractionRecord::success(task, model, prompt, "v1.0", response, serde_json::Map::new())
}

/// Helper: spawn a test server on port 0 with three logged interactions.
async fn spawn_test_server() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let logs = JsonlLogSink::new(dir.path().join("llm_interactions.jsonl"));
    for rec in [
        record("moderator", "gpt-4", "Is this safe?", "Looks fine"),
        record("theme_coder", "gpt-4", "Onboarding, pricing", "Themes: confusion"),
        record("translator", "gpt-3.5-turbo", "Hello", "[Dummy Translation] Hola"),
    ] {
        logs.append(&rec).await.unwrap();
    }
    let feedback = JsonlFeedbackStore::new(dir.path().join("feedback_queue.jsonl"));
    let service = Arc::new(ReviewService::new(Arc::new(logs), Arc::new(feedback), 500));

    let config = WebConfig {
        bind_addr: ([127, 0, 0, 1], 0).into(),
        ..Default::default()
    };
    let addr = spawn_web(service, config).await.unwrap();
    (dir, format!("http://{addr}"))
}

async fn first_log(base: &str) -> Value {
    let logs: Vec<Value> = reqwest::get(format!("{base}/api/logs"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    logs[0].clone()
}

async fn flag(base: &str, log: Value, reason: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{base}/api/feedback"))
        .json(&json!({ "log": log, "reason": reason, "comment": "needs work" }))
        .send()
        .await
        .unwrap()
}

// ── Logs ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_logs_returns_newest_first() {
    let (_dir, base) = spawn_test_server().await;

    let resp = reqwest::get(format!("{base}/api/logs")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let logs: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0]["task"], "translator");
    assert_eq!(logs[2]["task"], "moderator");
}

#[tokio::test]
async fn get_logs_applies_filters() {
    let (_dir, base) = spawn_test_server().await;

    let logs: Vec<Value> = reqwest::get(format!("{base}/api/logs?model=gpt-4&task=theme_coder"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["prompt"], "Onboarding, pricing");
}

#[tokio::test]
async fn facets_list_distinct_values() {
    let (_dir, base) = spawn_test_server().await;

    let facets: Value = reqwest::get(format!("{base}/api/logs/facets"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        facets["tasks"],
        json!(["moderator", "theme_coder", "translator"])
    );
    assert_eq!(facets["models"], json!(["gpt-3.5-turbo", "gpt-4"]));
    assert_eq!(facets["prompt_versions"], json!(["v1.0"]));
}

// ── Feedback ─────────────────────────────────────────────────────────

#[tokio::test]
async fn post_feedback_creates_record() {
    let (_dir, base) = spawn_test_server().await;
    let log = first_log(&base).await;

    let resp = flag(&base, log.clone(), "Vague response").await;
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    assert!(!created["id"].as_str().unwrap().is_empty());
    assert_eq!(created["reason"], "Vague response");
    assert_eq!(created["reviewed"], false);
    assert_eq!(created["log"], log);

    let listed: Vec<Value> = reqwest::get(format!("{base}/api/feedback"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], created["id"]);
}

#[tokio::test]
async fn post_feedback_rejects_unknown_reason() {
    let (_dir, base) = spawn_test_server().await;
    let log = first_log(&base).await;

    let resp = flag(&base, log, "Too spicy").await;
    assert_eq!(resp.status(), 422);

    let listed: Vec<Value> = reqwest::get(format!("{base}/api/feedback"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn get_feedback_filters_by_reason_and_keyword() {
    let (_dir, base) = spawn_test_server().await;
    let logs: Vec<Value> = reqwest::get(format!("{base}/api/logs"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    flag(&base, logs[0].clone(), "Other").await;
    flag(&base, logs[1].clone(), "Incorrect information").await;
    flag(&base, logs[2].clone(), "Other").await;

    let listed: Vec<Value> = reqwest::get(format!("{base}/api/feedback?reason=Other&keyword=SAFE"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["log"]["task"], "moderator");
}

#[tokio::test]
async fn get_feedback_treats_blank_filters_as_all() {
    let (_dir, base) = spawn_test_server().await;
    let logs: Vec<Value> = reqwest::get(format!("{base}/api/logs"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    flag(&base, logs[0].clone(), "Other").await;
    flag(&base, logs[1].clone(), "Vague response").await;

    let resp = reqwest::get(format!("{base}/api/feedback?task=&reason=&keyword="))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let listed: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(listed.len(), 2);

    let resp = reqwest::get(format!("{base}/api/feedback?reason=Too%20spicy"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn patch_feedback_updates_in_place() {
    let (_dir, base) = spawn_test_server().await;
    let log = first_log(&base).await;
    let created: Value = flag(&base, log, "Poor follow-up").await.json().await.unwrap();
    let id = created["id"].as_str().unwrap();

    let client = reqwest::Client::new();
    for comment in ["first pass", "second pass"] {
        let resp = client
            .patch(format!("{base}/api/feedback/{id}"))
            .json(&json!({ "comment": comment, "reviewed": true }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let updated: Value = resp.json().await.unwrap();
        assert_eq!(updated["comment"], comment);
        assert_eq!(updated["reviewed"], true);
    }

    let listed: Vec<Value> = reqwest::get(format!("{base}/api/feedback"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["comment"], "second pass");
}

#[tokio::test]
async fn patch_unknown_feedback_returns_404() {
    let (_dir, base) = spawn_test_server().await;

    let resp = reqwest::Client::new()
        .patch(format!("{base}/api/feedback/does-not-exist"))
        .json(&json!({ "reviewed": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("does-not-exist"));
}

#[tokio::test]
async fn export_returns_csv_attachment() {
    let (_dir, base) = spawn_test_server().await;
    let logs: Vec<Value> = reqwest::get(format!("{base}/api/logs"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    for log in &logs {
        flag(&base, log.clone(), "Other").await;
    }

    let resp = reqwest::get(format!("{base}/api/feedback/export?task=theme_coder"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/csv"));
    assert!(
        resp.headers()["content-disposition"]
            .to_str()
            .unwrap()
            .contains("attachment")
    );

    let body = resp.text().await.unwrap();
    let rows: Vec<&str> = body.split("\r\n").filter(|r| !r.is_empty()).collect();
    assert_eq!(rows[0], "timestamp,task,reason,prompt,response,comment,reviewed");
    assert_eq!(rows.len(), 2);
    assert!(rows[1].contains(",theme_coder,Other,\"Onboarding, pricing\","));
    assert!(rows[1].ends_with(",needs work,false"));
}

// ── Store outages ────────────────────────────────────────────────────

struct DownSink;

impl LogSink for DownSink {
    fn append<'a>(&'a self, _record: &'a InteractionRecord) -> SinkFuture<'a, ()> {
        Box::pin(async { Err(Error::SinkUnavailable("connection refused".into())) })
    }

    fn recent(&self, _limit: usize) -> SinkFuture<'_, Vec<InteractionRecord>> {
        Box::pin(async { Err(Error::SinkUnavailable("connection refused".into())) })
    }
}

#[tokio::test]
async fn sink_outage_returns_503() {
    let dir = tempfile::tempdir().unwrap();
    let feedback = JsonlFeedbackStore::new(dir.path().join("feedback.jsonl"));
    let service = Arc::new(ReviewService::new(Arc::new(DownSink), Arc::new(feedback), 50));
    let config = WebConfig {
        bind_addr: ([127, 0, 0, 1], 0).into(),
        ..Default::default()
    };
    let addr = spawn_web(service, config).await.unwrap();

    let resp = reqwest::get(format!("http://{addr}/api/logs")).await.unwrap();
    assert_eq!(resp.status(), 503);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}
