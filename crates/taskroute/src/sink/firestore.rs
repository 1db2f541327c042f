//! Firestore document-store backend over the REST API.
//!
//! Records are stored one document per record. Firestore wraps every field
//! in a typed value object (`{"stringValue": "..."}`), so this module carries
//! a small codec between plain `serde_json::Value`s and that encoding.
//!
//! Only three endpoints are used:
//!
//! - `POST {documents}/{collection}` to create a document with a generated id
//! - `PATCH {documents}/{collection}/{id}` to create or replace a keyed document
//! - `POST {documents}:runQuery` for ordered, capped reads
//!
//! The client works against production (OAuth bearer token) or the local
//! emulator (no token).

use super::{InteractionRecord, LogSink, SinkFuture};
use crate::config::FirestoreSettings;
use crate::error::{Error, Result};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Thin REST client scoped to one database.
pub struct FirestoreClient {
    http: reqwest::Client,
    documents_url: String,
    token: Option<String>,
}

impl FirestoreClient {
    /// Build a client from configuration, reading the token from its env var.
    pub fn from_settings(settings: &FirestoreSettings) -> Result<Self> {
        Self::new(
            &settings.base_url,
            &settings.project_id,
            &settings.database,
            settings.token(),
        )
    }

    pub fn new(
        base_url: &str,
        project_id: &str,
        database: &str,
        token: Option<String>,
    ) -> Result<Self> {
        if project_id.trim().is_empty() {
            return Err(Error::Config(
                "storage.firestore.project_id must be set for the firestore backend".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .user_agent("taskroute/0.1")
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            documents_url: format!(
                "{}/projects/{project_id}/databases/{database}/documents",
                base_url.trim_end_matches('/')
            ),
            token,
        })
    }

    pub fn documents_url(&self) -> &str {
        &self.documents_url
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder, what: &str) -> Result<String> {
        let start = Instant::now();
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| Error::sink(&format!("Firestore {what} request failed"), e))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::sink(&format!("failed to read Firestore {what} response"), e))?;
        debug!(
            "Firestore {what}: HTTP {status} in {:.2}s ({} bytes)",
            start.elapsed().as_secs_f64(),
            text.len()
        );
        if !status.is_success() {
            return Err(Error::SinkUnavailable(format!(
                "Firestore {what} HTTP {status}: {text}"
            )));
        }
        Ok(text)
    }

    /// Create a document with a server-generated id.
    pub async fn create_document(&self, collection: &str, data: &Map<String, Value>) -> Result<()> {
        let url = format!("{}/{collection}", self.documents_url);
        let body = json!({ "fields": encode_fields(data) });
        self.send(self.http.post(url).json(&body), "create").await?;
        Ok(())
    }

    /// Create or fully replace the document `collection/id`.
    pub async fn set_document(
        &self,
        collection: &str,
        id: &str,
        data: &Map<String, Value>,
    ) -> Result<()> {
        let url = format!("{}/{collection}/{id}", self.documents_url);
        let body = json!({ "fields": encode_fields(data) });
        self.send(self.http.patch(url).json(&body), "write").await?;
        Ok(())
    }

    /// Query a collection, optionally ordered descending by `order_desc` and
    /// capped at `limit`. Returns `(document id, decoded fields)` pairs.
    ///
    /// A collection that does not exist yields no documents.
    pub async fn query(
        &self,
        collection: &str,
        order_desc: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<(String, Map<String, Value>)>> {
        let url = format!("{}:runQuery", self.documents_url);
        let body = json!({ "structuredQuery": structured_query(collection, order_desc, limit) });
        let text = self.send(self.http.post(url).json(&body), "query").await?;

        let rows: Vec<Value> = serde_json::from_str(&text)
            .map_err(|e| Error::sink("failed to parse Firestore query response", e))?;

        Ok(rows
            .iter()
            .filter_map(|row| row.get("document"))
            .map(|doc| {
                let id = doc
                    .get("name")
                    .and_then(Value::as_str)
                    .and_then(|name| name.rsplit('/').next())
                    .unwrap_or_default()
                    .to_string();
                let fields = doc.get("fields").map(decode_fields).unwrap_or_default();
                (id, fields)
            })
            .collect())
    }
}

/// Body of a `runQuery` request.
pub fn structured_query(collection: &str, order_desc: Option<&str>, limit: Option<usize>) -> Value {
    let mut query = json!({ "from": [{ "collectionId": collection }] });
    if let Some(field) = order_desc {
        query["orderBy"] = json!([{ "field": { "fieldPath": field }, "direction": "DESCENDING" }]);
    }
    if let Some(limit) = limit {
        query["limit"] = json!(limit);
    }
    query
}

// ── Value codec ────────────────────────────────────────────────────

/// Encode a JSON value as a Firestore typed value.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encode an object's entries as a Firestore `fields` map.
pub fn encode_fields(map: &Map<String, Value>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

/// Decode a Firestore typed value. Unrecognised types decode to `null`.
pub fn decode_value(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return Value::Null;
    };
    if let Some(b) = obj.get("booleanValue") {
        return Value::Bool(b.as_bool().unwrap_or(false));
    }
    if let Some(i) = obj.get("integerValue") {
        let parsed = match i {
            Value::String(s) => s.parse::<i64>().ok(),
            other => other.as_i64(),
        };
        return parsed.map(Value::from).unwrap_or(Value::Null);
    }
    if let Some(d) = obj.get("doubleValue") {
        return d
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    for key in ["stringValue", "timestampValue", "referenceValue", "bytesValue"] {
        if let Some(s) = obj.get(key) {
            return s.clone();
        }
    }
    if let Some(array) = obj.get("arrayValue") {
        let items = array
            .get("values")
            .and_then(Value::as_array)
            .map(|vals| vals.iter().map(decode_value).collect())
            .unwrap_or_default();
        return Value::Array(items);
    }
    if let Some(map) = obj.get("mapValue") {
        let fields = map.get("fields").map(decode_fields).unwrap_or_default();
        return Value::Object(fields);
    }
    Value::Null
}

/// Decode a Firestore `fields` map into a plain JSON object.
pub fn decode_fields(fields: &Value) -> Map<String, Value> {
    fields
        .as_object()
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| (k.clone(), decode_value(v)))
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn to_object<T: serde::Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::SinkUnavailable(
            "record did not serialize to an object".into(),
        )),
        Err(e) => Err(Error::sink("failed to serialize record", e)),
    }
}

// ── Log sink ───────────────────────────────────────────────────────

/// [`LogSink`] storing each record as a document in a collection.
pub struct FirestoreLogSink {
    client: Arc<FirestoreClient>,
    collection: String,
}

impl FirestoreLogSink {
    pub fn new(client: Arc<FirestoreClient>, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
        }
    }
}

impl LogSink for FirestoreLogSink {
    fn append<'a>(&'a self, record: &'a InteractionRecord) -> SinkFuture<'a, ()> {
        Box::pin(async move {
            let data = to_object(record)?;
            self.client.create_document(&self.collection, &data).await
        })
    }

    fn recent(&self, limit: usize) -> SinkFuture<'_, Vec<InteractionRecord>> {
        Box::pin(async move {
            if limit == 0 {
                return Ok(Vec::new());
            }
            let docs = self
                .client
                .query(&self.collection, Some("timestamp"), Some(limit))
                .await?;
            Ok(docs
                .into_iter()
                .filter_map(|(id, fields)| {
                    serde_json::from_value::<InteractionRecord>(Value::Object(fields))
                        .inspect_err(|e| warn!("Skipping malformed log document {id}: {e}"))
                        .ok()
                })
                .collect())
        })
    }
}
