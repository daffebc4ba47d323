//! # Search Sync
//!
//! Synchronizes a document database's collections into a search-engine
//! index by translating document lifecycle events and partial-update
//! operations into search-engine-native operations.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Update Pipeline                         │
//! │  • Decodes $set / $unset / $addToSet / $setOnInsert        │
//! │  • Routes: single-document bulk vs. update-by-query        │
//! └─────────────────────────────────────────────────────────────┘
//!            │                                    │
//!            ▼                                    ▼
//! ┌───────────────────────┐          ┌───────────────────────┐
//! │   Script Generator    │          │  Condition Translator │
//! │  • Path flattening    │          │  • Closed predicate   │
//! │  • Null-guard prologue│          │    variants           │
//! │  • Parameter binding  │          │  • bool filter/       │
//! │                       │          │    must_not clauses   │
//! └───────────────────────┘          └───────────────────────┘
//!            │                                    │
//!            ▼                                    ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Batch Scheduler                         │
//! │  • One buffer per entity type (schema id)                  │
//! │  • Flush on size threshold or delay timer                  │
//! │  • Per-item / request errors → caller's error sink         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │               SearchStore (external collaborator)           │
//! │  • bulk / update_by_query / index / delete                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use search_sync::{
//!     error_channel, BulkConfig, IndexBinding, MemoryStore, SearchStore, SyncConfig,
//!     UpdateOutcome, UpdatePipeline,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let store: Arc<dyn SearchStore> = Arc::new(MemoryStore::new());
//!     let (errors, mut error_events) = error_channel();
//!
//!     let pipeline = UpdatePipeline::new(
//!         store,
//!         SyncConfig::with_bulk(BulkConfig { size: 100, delay_ms: 50 }),
//!         errors,
//!     );
//!
//!     let tweets = IndexBinding::new("tweet-schema-v1", "tweets");
//!
//!     // A single-document update: buffered as a bulk script update.
//!     pipeline
//!         .apply_update(
//!             &tweets,
//!             &serde_json::from_value(json!({ "_id": "42" })).unwrap(),
//!             &json!({ "$set": { "message": "Hello world" } }),
//!             &UpdateOutcome::modified(1),
//!         )
//!         .await
//!         .expect("update failed");
//!
//!     // Bulk failures arrive on the error channel, not as panics.
//!     if let Ok(event) = error_events.try_recv() {
//!         eprintln!("bulk failure: {event:?}");
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`path`]: field paths, flattening, dotted-key expansion
//! - [`script`]: update-operation decoding and painless script generation
//! - [`search`]: filter-predicate → boolean-query translation
//! - [`bulk`]: per-entity-type buffering and bulk submission
//! - [`store`]: the search store collaborator trait and memory impl
//! - [`pipeline`]: routing between the bulk and query paths
//! - [`config`]: bulk thresholds and per-collection options
//! - [`metrics`]: backend-agnostic instrumentation

pub mod bulk;
pub mod config;
pub mod metrics;
pub mod path;
pub mod pipeline;
pub mod script;
pub mod search;
pub mod store;

pub use bulk::{
    error_channel, BulkActionKind, BulkError, BulkInstruction, BulkRequest, BulkScheduler,
    ErrorSink, FlushReason, IndexBinding, UpdateBody,
};
pub use config::{BulkConfig, SyncConfig};
pub use path::FieldPath;
pub use pipeline::{UpdateOutcome, UpdatePipeline};
pub use script::{PainlessScript, ScriptGenerator, UpdateDocument};
pub use search::{condition_to_query, flatten_conditions, supports_direct_lookup, ConditionQuery};
pub use store::memory::MemoryStore;
pub use store::traits::{
    BulkItemResult, BulkResponse, ConflictPolicy, DeleteRequest, IndexRequest, SearchStore,
    StoreError, UpdateByQueryRequest,
};
