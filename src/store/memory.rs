use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;

use crate::bulk::instruction::{BulkInstruction, BulkRequest};
use crate::script::PainlessScript;
use super::traits::{
    BulkItemResult, BulkResponse, DeleteRequest, IndexRequest, SearchStore, StoreError,
    UpdateByQueryRequest,
};

/// In-memory search store for tests and examples.
///
/// Applies index/delete instructions to a document map, records submitted
/// bulk requests, scripts and update-by-query requests for inspection, and
/// supports injected failures: per-item errors (keyed by document id) and a
/// one-shot request-level failure.
///
/// Scripts are recorded, not evaluated.
#[derive(Default)]
pub struct MemoryStore {
    documents: DashMap<(String, String), Value>,
    bulk_log: Mutex<Vec<BulkRequest>>,
    update_by_query_log: Mutex<Vec<UpdateByQueryRequest>>,
    script_log: Mutex<Vec<(String, PainlessScript)>>,
    item_errors: DashMap<String, Value>,
    fail_next_bulk: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current document count across all indices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Fetch a stored document.
    #[must_use]
    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        self.documents
            .get(&(index.to_string(), id.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Number of bulk requests received.
    #[must_use]
    pub fn bulk_calls(&self) -> usize {
        self.bulk_log.lock().len()
    }

    /// All bulk requests received so far.
    #[must_use]
    pub fn bulk_log(&self) -> Vec<BulkRequest> {
        self.bulk_log.lock().clone()
    }

    /// All update-by-query requests received so far.
    #[must_use]
    pub fn update_by_query_log(&self) -> Vec<UpdateByQueryRequest> {
        self.update_by_query_log.lock().clone()
    }

    /// Scripts submitted through bulk update instructions, by document id.
    #[must_use]
    pub fn script_log(&self) -> Vec<(String, PainlessScript)> {
        self.script_log.lock().clone()
    }

    /// Make the next instruction touching `id` report `error` in its item
    /// result.
    pub fn fail_item(&self, id: &str, error: Value) {
        self.item_errors.insert(id.to_string(), error);
    }

    /// Make the next bulk request fail at the request level.
    pub fn fail_next_bulk(&self) {
        self.fail_next_bulk.store(true, Ordering::SeqCst);
    }

    fn apply(&self, instruction: &BulkInstruction) {
        match instruction {
            BulkInstruction::Index {
                index,
                id,
                document,
            } => {
                self.documents
                    .insert((index.clone(), id.clone()), document.clone());
            }
            BulkInstruction::Update { index, id, body } => {
                let key = (index.clone(), id.clone());
                match &body.upsert {
                    Some(upsert) if !self.documents.contains_key(&key) => {
                        self.documents.insert(key, upsert.clone());
                    }
                    _ => {
                        self.script_log.lock().push((id.clone(), body.script.clone()));
                    }
                }
            }
            BulkInstruction::Delete { index, id } => {
                self.documents.remove(&(index.clone(), id.clone()));
            }
        }
    }
}

#[async_trait]
impl SearchStore for MemoryStore {
    async fn bulk(&self, request: BulkRequest) -> Result<BulkResponse, StoreError> {
        if self.fail_next_bulk.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected bulk failure".to_string()));
        }

        let mut items = Vec::with_capacity(request.operations.len());
        for instruction in &request.operations {
            let error = self
                .item_errors
                .remove(instruction.id())
                .map(|(_, error)| error);
            if error.is_none() {
                self.apply(instruction);
            }
            items.push(BulkItemResult {
                action: instruction.action(),
                index: instruction.index().to_string(),
                id: instruction.id().to_string(),
                status: if error.is_some() { 400 } else { 200 },
                error,
            });
        }

        self.bulk_log.lock().push(request);
        let errors = items.iter().any(BulkItemResult::is_error);
        Ok(BulkResponse {
            took: 0,
            errors,
            items,
        })
    }

    async fn update_by_query(&self, request: UpdateByQueryRequest) -> Result<(), StoreError> {
        self.update_by_query_log.lock().push(request);
        Ok(())
    }

    async fn index(&self, request: IndexRequest) -> Result<(), StoreError> {
        self.documents
            .insert((request.index, request.id), request.document);
        Ok(())
    }

    async fn delete(&self, request: DeleteRequest) -> Result<(), StoreError> {
        self.documents.remove(&(request.index, request.id));
        Ok(())
    }
}
