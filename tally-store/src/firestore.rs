//! Cloud document store over the Firestore REST API.
//!
//! Documents live in the `transactions` collection. Firestore wraps every
//! field in a typed value (`{"stringValue": "..."}`), so records are
//! flattened to plain JSON before they reach serde.

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::header::AUTHORIZATION;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use tally_core::{NewTransaction, RecordDate, TransactionRecord, UserId};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::TransactionStore;

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const COLLECTION: &str = "transactions";
/// Firestore's cap on writes in one commit.
pub const MAX_BATCH_WRITES: usize = 500;

pub struct FirestoreStore {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    document: Option<FsDocument>,
}

#[derive(Debug, Deserialize)]
struct FsDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreStore {
    pub fn new(project_id: impl Into<String>, id_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            project_id: project_id.into(),
            id_token,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn documents_url(&self) -> String {
        format!("{}/{}", self.base_url, self.documents_path())
    }

    fn documents_path(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    /// One `:commit` request creating a document per transaction. Creation
    /// is guarded by `exists: false`, so the commit fails whole rather than
    /// overwriting.
    fn commit_body(&self, user: &UserId, txs: &[NewTransaction], ids: &[String]) -> Result<Value> {
        if txs.len() > MAX_BATCH_WRITES {
            return Err(StoreError::BatchTooLarge {
                len: txs.len(),
                max: MAX_BATCH_WRITES,
            });
        }

        let documents = self.documents_path();
        let writes = txs
            .iter()
            .zip(ids)
            .map(|(tx, id)| {
                let record = tx.to_record(id.clone(), user);
                Ok(json!({
                    "update": {
                        "name": format!("{documents}/{COLLECTION}/{id}"),
                        "fields": encode_fields(&record)?,
                    },
                    "currentDocument": { "exists": false },
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(json!({ "writes": writes }))
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self.client.post(url);
        match &self.id_token {
            Some(token) => req.header(AUTHORIZATION, format!("Bearer {token}")),
            None => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl TransactionStore for FirestoreStore {
    async fn fetch_transactions(&self, user: &UserId) -> Result<Vec<TransactionRecord>> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": COLLECTION }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": "userId" },
                        "op": "EQUAL",
                        "value": { "stringValue": user.as_str() }
                    }
                }
            }
        });

        let url = format!("{}:runQuery", self.documents_url());
        let resp = self.send(self.post(&url).json(&body)).await?;
        let items: Vec<RunQueryItem> = resp.json().await?;

        items
            .into_iter()
            .filter_map(|item| item.document)
            .map(decode_document)
            .collect()
    }

    async fn add_transaction(&self, user: &UserId, tx: &NewTransaction) -> Result<String> {
        let record = tx.to_record(String::new(), user);
        let body = json!({ "fields": encode_fields(&record)? });

        let url = format!("{}/{}", self.documents_url(), COLLECTION);
        let resp = self.send(self.post(&url).json(&body)).await?;
        let created: FsDocument = resp.json().await?;

        let id = document_id(&created.name).to_string();
        tracing::debug!(project = %self.project_id, id = %id, "created transaction document");
        Ok(id)
    }

    async fn add_transactions(&self, user: &UserId, txs: &[NewTransaction]) -> Result<Vec<String>> {
        if txs.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = txs.iter().map(|_| Uuid::new_v4().simple().to_string()).collect();
        let body = self.commit_body(user, txs, &ids)?;

        let url = format!("{}:commit", self.documents_url());
        self.send(self.post(&url).json(&body)).await?;

        tracing::debug!(project = %self.project_id, count = ids.len(), "committed transaction batch");
        Ok(ids)
    }
}

fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn decode_document(doc: FsDocument) -> Result<TransactionRecord> {
    let mut plain = Map::new();
    for (key, value) in &doc.fields {
        plain.insert(key.clone(), unwrap_value(value).map_err(|e| decode_err(&doc.name, key, e))?);
    }
    plain.insert("id".to_string(), Value::String(document_id(&doc.name).to_string()));

    serde_json::from_value(Value::Object(plain))
        .map_err(|e| StoreError::Decode(format!("{}: {e}", doc.name)))
}

fn decode_err(doc: &str, field: &str, reason: String) -> StoreError {
    StoreError::Decode(format!("{doc}: field {field}: {reason}"))
}

/// Strip Firestore's type wrapper from one value.
fn unwrap_value(value: &Value) -> std::result::Result<Value, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| format!("expected typed value, got {value}"))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| "empty typed value".to_string())?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "stringValue" | "booleanValue" | "doubleValue" | "timestampValue" => Ok(inner.clone()),
        "integerValue" => {
            // int64 travels as a JSON string
            let n: i64 = match inner {
                Value::String(s) => s.parse().map_err(|_| format!("bad integer {s:?}"))?,
                Value::Number(n) => n.as_i64().ok_or_else(|| format!("bad integer {n}"))?,
                other => return Err(format!("bad integer {other}")),
            };
            Ok(Value::from(n))
        }
        "mapValue" => {
            let mut out = Map::new();
            if let Some(fields) = inner.get("fields").and_then(Value::as_object) {
                for (k, v) in fields {
                    out.insert(k.clone(), unwrap_value(v)?);
                }
            }
            Ok(Value::Object(out))
        }
        "arrayValue" => {
            let values = match inner.get("values").and_then(Value::as_array) {
                Some(values) => values.iter().map(unwrap_value).collect::<std::result::Result<_, _>>()?,
                None => Vec::new(),
            };
            Ok(Value::Array(values))
        }
        other => Err(format!("unsupported value type {other}")),
    }
}

fn timestamp_value(date: &RecordDate) -> Result<Value> {
    let utc = date.to_utc().map_err(StoreError::Decode)?;
    Ok(json!({ "timestampValue": utc.to_rfc3339_opts(SecondsFormat::Millis, true) }))
}

fn string_value(s: &str) -> Value {
    json!({ "stringValue": s })
}

/// Typed Firestore fields for a record. The id is the document name, so it
/// is not written as a field.
fn encode_fields(record: &TransactionRecord) -> Result<Map<String, Value>> {
    let mut fields = Map::new();

    if let Some(user) = &record.user_id {
        fields.insert("userId".into(), string_value(user));
    }
    if let Some(description) = &record.description {
        fields.insert("description".into(), string_value(description));
    }
    if let Some(amount) = record.amount {
        let amount = amount
            .to_f64()
            .ok_or_else(|| StoreError::Decode(format!("amount not representable: {amount}")))?;
        fields.insert("amount".into(), json!({ "doubleValue": amount }));
    }
    if let Some(date) = &record.date {
        fields.insert("date".into(), timestamp_value(date)?);
    }
    if let Some(category) = &record.category {
        fields.insert("category".into(), string_value(category));
    }
    if let Some(status) = record.status {
        let status = serde_json::to_value(status)?;
        fields.insert("status".into(), json!({ "stringValue": status }));
    }
    if let Some(future) = record.is_future_payment {
        fields.insert("isFuturePayment".into(), json!({ "booleanValue": future }));
    }
    if let Some(due) = &record.due_date {
        fields.insert("dueDate".into(), timestamp_value(due)?);
    }
    if let Some(detail) = &record.detailed_description {
        fields.insert("detailedDescription".into(), string_value(detail));
    }

    Ok(fields)
}
