// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-entity-type bulk buffering with size/delay flush.
//!
//! The [`BulkScheduler`] owns a registry of buffers keyed by schema id.
//! Each buffer is a small state machine: it idles while empty, holds a
//! pending delay timer while partially filled, and transitions to flushing
//! when the size threshold is crossed, the timer fires, or a manual flush
//! is requested. Buffer contents are captured by value at that transition,
//! so appends racing a flush start a fresh buffer and are never merged into
//! the in-flight request.
//!
//! Only the size-threshold flush is awaited by the enqueueing caller
//! (back-pressure at threshold crossing); timer flushes run on spawned
//! tasks and manual flushes are explicit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::BulkConfig;
use crate::store::traits::SearchStore;
use super::instruction::{BulkInstruction, BulkRequest, UpdateBody};
use super::{BulkError, ErrorSink, IndexBinding};

/// What triggered a buffer flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// Size threshold reached on enqueue.
    Size,
    /// Delay timer fired.
    Delay,
    /// Explicit flush request.
    Manual,
}

impl FlushReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Delay => "delay",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for FlushReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Buffer {
    pending: Vec<BulkInstruction>,
    timer: Option<Timer>,
}

impl Buffer {
    /// Capture the buffer contents and cancel any pending timer.
    fn take(&mut self) -> Vec<BulkInstruction> {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
        std::mem::take(&mut self.pending)
    }

    /// Capture from inside the timer task itself; the timer slot is cleared
    /// without aborting the running task.
    fn take_for_timer(&mut self) -> Vec<BulkInstruction> {
        self.timer = None;
        std::mem::take(&mut self.pending)
    }
}

/// Buffers single-document instructions per entity type and submits them as
/// bulk requests.
///
/// All buffer mutations go through one mutex per schema id; the mutex is
/// never held across the store submission await.
pub struct BulkScheduler {
    store: Arc<dyn SearchStore>,
    config: BulkConfig,
    buffers: DashMap<String, Arc<Mutex<Buffer>>>,
    errors: ErrorSink,
    generations: AtomicU64,
}

impl BulkScheduler {
    pub fn new(store: Arc<dyn SearchStore>, config: BulkConfig, errors: ErrorSink) -> Self {
        Self {
            store,
            config,
            buffers: DashMap::new(),
            errors,
            generations: AtomicU64::new(0),
        }
    }

    /// Buffer an index instruction for `id`.
    pub async fn enqueue_index(&self, binding: &IndexBinding, id: &str, document: Value) {
        self.enqueue(
            binding,
            BulkInstruction::Index {
                index: binding.index.clone(),
                id: id.to_string(),
                document,
            },
        )
        .await;
    }

    /// Buffer an update instruction for `id`.
    pub async fn enqueue_update(&self, binding: &IndexBinding, id: &str, body: UpdateBody) {
        self.enqueue(
            binding,
            BulkInstruction::Update {
                index: binding.index.clone(),
                id: id.to_string(),
                body,
            },
        )
        .await;
    }

    /// Buffer a delete instruction for `id`.
    pub async fn enqueue_delete(&self, binding: &IndexBinding, id: &str) {
        self.enqueue(
            binding,
            BulkInstruction::Delete {
                index: binding.index.clone(),
                id: id.to_string(),
            },
        )
        .await;
    }

    /// Append one instruction to the binding's buffer.
    ///
    /// Crossing the size threshold flushes immediately (awaited) and
    /// cancels the pending timer; otherwise a timer is started if none is
    /// pending.
    pub async fn enqueue(&self, binding: &IndexBinding, instruction: BulkInstruction) {
        let buffer = self.buffer(&binding.schema_id);

        let ready = {
            let mut state = buffer.lock();
            state.pending.push(instruction);

            if state.pending.len() >= self.config.size {
                Some(state.take())
            } else {
                if state.timer.is_none() {
                    let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
                    let handle = self.spawn_timer(Arc::clone(&buffer), generation);
                    state.timer = Some(Timer { generation, handle });
                    debug!(schema_id = %binding.schema_id, "flush timer started");
                }
                None
            }
        };

        if let Some(batch) = ready {
            Self::submit(
                Arc::clone(&self.store),
                self.errors.clone(),
                batch,
                FlushReason::Size,
            )
            .await;
        }
    }

    /// Flush the binding's buffer now, if it holds anything.
    pub async fn flush(&self, schema_id: &str) {
        let Some(buffer) = self.buffers.get(schema_id).map(|entry| Arc::clone(entry.value()))
        else {
            return;
        };
        let batch = buffer.lock().take();
        if !batch.is_empty() {
            Self::submit(
                Arc::clone(&self.store),
                self.errors.clone(),
                batch,
                FlushReason::Manual,
            )
            .await;
        }
    }

    /// Flush every buffer, one bulk request per entity type.
    pub async fn flush_all(&self) {
        let schema_ids: Vec<String> = self
            .buffers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for schema_id in schema_ids {
            self.flush(&schema_id).await;
        }
    }

    /// Number of instructions currently buffered for a schema id.
    #[must_use]
    pub fn pending_len(&self, schema_id: &str) -> usize {
        self.buffers
            .get(schema_id)
            .map_or(0, |entry| entry.value().lock().pending.len())
    }

    /// Whether a delay timer is pending for a schema id.
    #[must_use]
    pub fn has_pending_timer(&self, schema_id: &str) -> bool {
        self.buffers
            .get(schema_id)
            .is_some_and(|entry| entry.value().lock().timer.is_some())
    }

    fn buffer(&self, schema_id: &str) -> Arc<Mutex<Buffer>> {
        self.buffers
            .entry(schema_id.to_string())
            .or_default()
            .clone()
    }

    /// Spawn the delay timer for a partially filled buffer. The generation
    /// check makes a stale timer a no-op when a threshold or manual flush
    /// already drained (and possibly repopulated) the buffer.
    fn spawn_timer(&self, buffer: Arc<Mutex<Buffer>>, generation: u64) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let errors = self.errors.clone();
        let delay = Duration::from_millis(self.config.delay_ms);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let batch = {
                let mut state = buffer.lock();
                let current = state
                    .timer
                    .as_ref()
                    .is_some_and(|timer| timer.generation == generation);
                if !current {
                    return;
                }
                state.take_for_timer()
            };

            if !batch.is_empty() {
                Self::submit(store, errors, batch, FlushReason::Delay).await;
            }
        })
    }

    /// Submit one captured batch and report failures to the error sink.
    /// The buffer was already cleared at capture time, success or not.
    async fn submit(
        store: Arc<dyn SearchStore>,
        errors: ErrorSink,
        operations: Vec<BulkInstruction>,
        reason: FlushReason,
    ) {
        let count = operations.len();
        let start = Instant::now();
        debug!(count, reason = %reason, "submitting bulk request");
        crate::metrics::record_flush(reason.as_str(), count);

        match store.bulk(BulkRequest::new(operations)).await {
            Ok(response) => {
                for item in response.items {
                    if item.is_error() {
                        warn!(id = %item.id, action = %item.action, "bulk item failed");
                        crate::metrics::record_item_error();
                        let _ = errors.send(BulkError::Item {
                            item: item.to_value(),
                        });
                    }
                }
            }
            Err(store_error) => {
                error!(error = %store_error, count, "bulk request failed");
                crate::metrics::record_request_error();
                let _ = errors.send(BulkError::Request { error: store_error });
            }
        }

        crate::metrics::record_flush_seconds(reason.as_str(), start.elapsed());
    }
}
