use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::bulk::instruction::{BulkActionKind, BulkRequest};
use crate::script::PainlessScript;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document not found")]
    NotFound,
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// How an update-by-query reacts to version conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    Proceed,
    Abort,
}

/// Index one document under an explicit id.
#[derive(Debug, Clone, Serialize)]
pub struct IndexRequest {
    pub index: String,
    pub id: String,
    pub document: Value,
}

/// Delete one document by id.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteRequest {
    pub index: String,
    pub id: String,
}

/// Apply a script to every document matching a query.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateByQueryRequest {
    pub index: String,
    pub query: Value,
    pub script: PainlessScript,
    pub scroll_size: u64,
    pub wait_for_completion: bool,
    pub conflicts: ConflictPolicy,
}

/// Per-item outcome inside a bulk response.
#[derive(Debug, Clone)]
pub struct BulkItemResult {
    pub action: BulkActionKind,
    pub index: String,
    pub id: String,
    pub status: u16,
    pub error: Option<Value>,
}

impl BulkItemResult {
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The item payload in the store's response shape, e.g.
    /// `{"update": {"_index": ..., "_id": ..., "status": ..., "error": ...}}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut body = Map::new();
        body.insert("_index".to_string(), Value::String(self.index.clone()));
        body.insert("_id".to_string(), Value::String(self.id.clone()));
        body.insert("status".to_string(), Value::from(self.status));
        if let Some(error) = &self.error {
            body.insert("error".to_string(), error.clone());
        }
        let mut item = Map::new();
        item.insert(self.action.as_str().to_string(), Value::Object(body));
        Value::Object(item)
    }
}

/// Response to a bulk request, with one result per submitted instruction,
/// in submission order.
#[derive(Debug, Clone)]
pub struct BulkResponse {
    pub took: u64,
    pub errors: bool,
    pub items: Vec<BulkItemResult>,
}

/// Write surface of the external search store.
///
/// Implementations own connection management and transport retries; the
/// core treats every call as a single attempt.
#[async_trait]
pub trait SearchStore: Send + Sync {
    /// Submit a batch of instructions in one network call. Items are
    /// processed in submission order and reported individually.
    async fn bulk(&self, request: BulkRequest) -> Result<BulkResponse, StoreError>;

    /// Apply a script to all documents matching a query. Completion is not
    /// awaited by the store; acceptance is enough.
    async fn update_by_query(&self, request: UpdateByQueryRequest) -> Result<(), StoreError>;

    async fn index(&self, request: IndexRequest) -> Result<(), StoreError>;

    async fn delete(&self, request: DeleteRequest) -> Result<(), StoreError>;
}
