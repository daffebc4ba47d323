// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Update routing.
//!
//! The [`UpdatePipeline`] connects the translators to the store: a
//! filter + update-document pair is translated into a script and either
//! queued as a single-document bulk update (when the filter is
//! primary-key-capable and exactly one document was touched) or submitted
//! as an update-by-query request. Document index/delete operations route
//! through the bulk buffer when one is configured, directly to the store
//! otherwise.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::bulk::{BulkScheduler, ErrorSink, IndexBinding, UpdateBody};
use crate::config::SyncConfig;
use crate::script::{ScriptGenerator, UpdateDocument};
use crate::search::{condition_to_query, flatten_conditions, supports_direct_lookup};
use crate::store::traits::{
    ConflictPolicy, DeleteRequest, IndexRequest, SearchStore, StoreError, UpdateByQueryRequest,
};

/// What the document database reported for the triggering update.
///
/// Field names mirror the database's update result
/// (`modifiedCount`/`upsertedCount`/`upsertedId`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
    pub upserted: u64,
    pub upserted_id: Option<String>,
}

impl UpdateOutcome {
    /// An update that modified `count` existing documents.
    #[must_use]
    pub fn modified(count: u64) -> Self {
        Self {
            matched: count,
            modified: count,
            ..Self::default()
        }
    }

    /// An update that inserted one document.
    #[must_use]
    pub fn upserted(id: impl Into<String>) -> Self {
        Self {
            upserted: 1,
            upserted_id: Some(id.into()),
            ..Self::default()
        }
    }
}

/// Routes translated updates and document lifecycle operations to the
/// bulk buffer or the store.
pub struct UpdatePipeline {
    store: Arc<dyn SearchStore>,
    scheduler: Option<Arc<BulkScheduler>>,
}

impl UpdatePipeline {
    /// Build a pipeline; a scheduler is created only when `config.bulk` is
    /// present, otherwise every operation goes directly to the store.
    pub fn new(store: Arc<dyn SearchStore>, config: SyncConfig, errors: ErrorSink) -> Self {
        let scheduler = config
            .bulk
            .map(|bulk| Arc::new(BulkScheduler::new(Arc::clone(&store), bulk, errors)));
        Self { store, scheduler }
    }

    /// The bulk scheduler, when bulk buffering is configured.
    #[must_use]
    pub fn scheduler(&self) -> Option<&Arc<BulkScheduler>> {
        self.scheduler.as_ref()
    }

    /// Translate one update and route it.
    ///
    /// The single-document bulk path applies when bulk buffering is
    /// configured, the conditions are primary-key-capable and carry an
    /// `_id`, and the outcome shows exactly one modified or one upserted
    /// document. An insert submits the merged upsert document with an empty
    /// script; a modification submits the generated script. Everything else
    /// becomes an update-by-query against the translated conditions.
    #[tracing::instrument(skip(self, conditions, update, outcome), fields(index = %binding.index))]
    pub async fn apply_update(
        &self,
        binding: &IndexBinding,
        conditions: &Map<String, Value>,
        update: &Value,
        outcome: &UpdateOutcome,
    ) -> Result<(), StoreError> {
        let document = UpdateDocument::decode(update);
        let mut generator = ScriptGenerator::new();
        generator.apply(&document);

        let flat = flatten_conditions(conditions);
        let document_id = flat.get("_id").and_then(value_to_id);

        if let Some(scheduler) = &self.scheduler {
            let single_document =
                outcome.modified == 1 || (outcome.upserted_id.is_some() && outcome.upserted == 1);

            if single_document && supports_direct_lookup(&flat) {
                if let Some(id) = document_id {
                    let body = if outcome.upserted > 0 {
                        UpdateBody::with_upsert(Value::Object(generator.upsert()))
                    } else {
                        UpdateBody::with_script(generator.build())
                    };
                    debug!(id = %id, "routing update through bulk buffer");
                    crate::metrics::record_update_route("bulk");
                    scheduler.enqueue_update(binding, &id, body).await;
                    return Ok(());
                }
            }
        }

        let query = condition_to_query(&flat).to_value();
        debug!(modified = outcome.modified, "routing update by query");
        crate::metrics::record_update_route("query");
        self.store
            .update_by_query(UpdateByQueryRequest {
                index: binding.index.clone(),
                query,
                script: generator.build(),
                scroll_size: outcome.modified,
                wait_for_completion: false,
                conflicts: ConflictPolicy::Proceed,
            })
            .await
    }

    /// Index one document: buffered when bulk is configured, direct
    /// otherwise.
    #[tracing::instrument(skip(self, document), fields(index = %binding.index, id = %id))]
    pub async fn index_document(
        &self,
        binding: &IndexBinding,
        id: &str,
        document: Value,
    ) -> Result<(), StoreError> {
        if let Some(scheduler) = &self.scheduler {
            crate::metrics::record_update_route("bulk");
            scheduler.enqueue_index(binding, id, document).await;
            return Ok(());
        }
        crate::metrics::record_update_route("direct");
        self.store
            .index(IndexRequest {
                index: binding.index.clone(),
                id: id.to_string(),
                document,
            })
            .await
    }

    /// Remove one document: buffered when bulk is configured, direct
    /// otherwise.
    #[tracing::instrument(skip(self), fields(index = %binding.index, id = %id))]
    pub async fn delete_document(&self, binding: &IndexBinding, id: &str) -> Result<(), StoreError> {
        if let Some(scheduler) = &self.scheduler {
            crate::metrics::record_update_route("bulk");
            scheduler.enqueue_delete(binding, id).await;
            return Ok(());
        }
        crate::metrics::record_update_route("direct");
        self.store
            .delete(DeleteRequest {
                index: binding.index.clone(),
                id: id.to_string(),
            })
            .await
    }
}

/// Document ids arrive as strings or numbers; anything else has no direct
/// lookup form.
fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
