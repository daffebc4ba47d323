//! Bulk write batching.
//!
//! Coalesces single-document index/update/delete operations into size- and
//! time-bounded bulk requests. Each entity type (identified by a stable
//! schema id) gets its own buffer inside the [`BulkScheduler`]; a buffer
//! flushes when it reaches the configured size threshold or when its delay
//! timer fires, whichever comes first.
//!
//! Failures never propagate to the enqueueing caller: per-item errors and
//! request-level failures are reported through the caller-supplied
//! [`ErrorSink`], and the buffer is cleared either way (at-most-once
//! delivery).

pub mod instruction;
pub mod scheduler;

pub use instruction::{BulkActionKind, BulkInstruction, BulkRequest, UpdateBody};
pub use scheduler::{BulkScheduler, FlushReason};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::store::traits::StoreError;

/// Pairing of a document collection with its target search index.
///
/// `schema_id` is the buffer-registry key; unrelated entity types sharing a
/// schema id would share a buffer, so it must be unique per logical
/// document type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexBinding {
    pub schema_id: String,
    pub index: String,
}

impl IndexBinding {
    pub fn new(schema_id: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            schema_id: schema_id.into(),
            index: index.into(),
        }
    }
}

/// A bulk failure reported through the error channel.
#[derive(Debug)]
pub enum BulkError {
    /// One instruction inside an otherwise successful bulk response failed;
    /// `item` is that item's result payload, including its error.
    Item { item: Value },
    /// The whole bulk request failed (transport level); no per-item detail
    /// is available.
    Request { error: StoreError },
}

/// Caller-supplied sink for bulk failures.
pub type ErrorSink = mpsc::UnboundedSender<BulkError>;

/// Create an error channel; hand the sink to the scheduler and consume
/// events from the receiver.
#[must_use]
pub fn error_channel() -> (ErrorSink, mpsc::UnboundedReceiver<BulkError>) {
    mpsc::unbounded_channel()
}
