//! End-to-end tests for the update pipeline.
//!
//! These run entirely against [`MemoryStore`]; no external backends are
//! required. They exercise the whole data flow: condition translation →
//! script generation → bulk buffering or update-by-query submission.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};

use search_sync::{
    error_channel, BulkConfig, BulkError, BulkInstruction, IndexBinding, MemoryStore, SearchStore,
    SyncConfig, UpdateOutcome, UpdatePipeline,
};

fn conditions(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object literal")
}

fn tweets() -> IndexBinding {
    IndexBinding::new("tweet-schema-v1", "tweets")
}

fn pipeline_with_bulk(
    store: &Arc<MemoryStore>,
    size: usize,
    delay_ms: u64,
) -> (
    UpdatePipeline,
    tokio::sync::mpsc::UnboundedReceiver<BulkError>,
) {
    let (sink, events) = error_channel();
    let store: Arc<dyn SearchStore> = store.clone();
    let pipeline = UpdatePipeline::new(
        store,
        SyncConfig::with_bulk(BulkConfig { size, delay_ms }),
        sink,
    );
    (pipeline, events)
}

#[tokio::test]
async fn single_document_update_submits_generated_script() {
    let store = Arc::new(MemoryStore::new());
    let (pipeline, _events) = pipeline_with_bulk(&store, 100, 60_000);

    pipeline
        .apply_update(
            &tweets(),
            &conditions(json!({ "_id": "42", "user": "john" })),
            &json!({ "$set": { "message": "Hello world", "meta": { "lang": "en" } } }),
            &UpdateOutcome::modified(1),
        )
        .await
        .unwrap();

    let scheduler = pipeline.scheduler().unwrap();
    assert_eq!(scheduler.pending_len("tweet-schema-v1"), 1);
    scheduler.flush("tweet-schema-v1").await;

    let log = store.bulk_log();
    assert_eq!(log.len(), 1);
    let operation = &log[0].operations[0];
    assert_eq!(operation.id(), "42");
    assert_eq!(operation.index(), "tweets");

    match operation {
        BulkInstruction::Update { body, .. } => {
            assert!(body.upsert.is_none());
            assert!(body
                .script
                .source
                .contains("ctx._source['message'] = params['message'];"));
            assert!(body
                .script
                .source
                .starts_with("if (ctx._source['meta'] == null)"));
            assert_eq!(body.script.params["message"], json!("Hello world"));
        }
        other => panic!("expected update instruction, got {other:?}"),
    }
}

#[tokio::test]
async fn upsert_submits_merged_document_with_empty_script() {
    let store = Arc::new(MemoryStore::new());
    let (pipeline, _events) = pipeline_with_bulk(&store, 100, 60_000);

    pipeline
        .apply_update(
            &tweets(),
            &conditions(json!({ "_id": "42" })),
            &json!({
                "$set": { "message": "hello" },
                "$setOnInsert": { "created": "2026-08-06" },
            }),
            &UpdateOutcome::upserted("42"),
        )
        .await
        .unwrap();

    pipeline.scheduler().unwrap().flush("tweet-schema-v1").await;

    match &store.bulk_log()[0].operations[0] {
        BulkInstruction::Update { body, .. } => {
            assert_eq!(
                body.upsert,
                Some(json!({ "message": "hello", "created": "2026-08-06" }))
            );
            assert!(body.script.source.is_empty());
        }
        other => panic!("expected update instruction, got {other:?}"),
    }

    // The memory store seeds the missing document from the upsert body.
    assert_eq!(
        store.document("tweets", "42"),
        Some(json!({ "message": "hello", "created": "2026-08-06" }))
    );
}

#[tokio::test]
async fn range_conditions_force_update_by_query() {
    let store = Arc::new(MemoryStore::new());
    let (pipeline, _events) = pipeline_with_bulk(&store, 100, 60_000);

    pipeline
        .apply_update(
            &tweets(),
            &conditions(json!({ "view_count": { "$gte": 100, "$lte": 1000 } })),
            &json!({ "$set": { "archived": true } }),
            &UpdateOutcome::modified(7),
        )
        .await
        .unwrap();

    assert_eq!(pipeline.scheduler().unwrap().pending_len("tweet-schema-v1"), 0);

    let log = store.update_by_query_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].index, "tweets");
    assert_eq!(log[0].scroll_size, 7);
    assert_eq!(
        log[0].query,
        json!({
            "bool": {
                "filter": [ { "range": { "view_count": { "gte": 100, "lte": 1000 } } } ]
            }
        })
    );
    assert!(log[0]
        .script
        .source
        .contains("ctx._source['archived'] = params['archived'];"));
}

#[tokio::test]
async fn nested_condition_documents_flatten_to_dotted_fields() {
    let store = Arc::new(MemoryStore::new());
    let (pipeline, _events) = pipeline_with_bulk(&store, 100, 60_000);

    pipeline
        .apply_update(
            &tweets(),
            &conditions(json!({ "author": { "name": "john" } })),
            &json!({ "$unset": { "draft": true } }),
            &UpdateOutcome::modified(2),
        )
        .await
        .unwrap();

    let log = store.update_by_query_log();
    assert_eq!(
        log[0].query,
        json!({ "bool": { "filter": [ { "term": { "author.name": "john" } } ] } })
    );
    assert!(log[0].script.source.contains("ctx._source.remove('draft');"));
}

#[tokio::test]
async fn threshold_flush_applies_buffered_documents() {
    let store = Arc::new(MemoryStore::new());
    let (pipeline, _events) = pipeline_with_bulk(&store, 2, 60_000);

    pipeline
        .index_document(&tweets(), "1", json!({ "message": "a" }))
        .await
        .unwrap();
    assert_eq!(store.bulk_calls(), 0);

    pipeline
        .index_document(&tweets(), "2", json!({ "message": "b" }))
        .await
        .unwrap();

    assert_eq!(store.bulk_calls(), 1);
    assert_eq!(store.document("tweets", "1"), Some(json!({ "message": "a" })));
    assert_eq!(store.document("tweets", "2"), Some(json!({ "message": "b" })));
}

#[tokio::test]
async fn delay_timer_flushes_partial_buffer() {
    let store = Arc::new(MemoryStore::new());
    let (pipeline, _events) = pipeline_with_bulk(&store, 100, 50);

    pipeline
        .index_document(&tweets(), "1", json!({ "message": "a" }))
        .await
        .unwrap();
    pipeline.delete_document(&tweets(), "gone").await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(store.bulk_calls(), 1);
    assert_eq!(store.bulk_log()[0].len(), 2);
    assert_eq!(pipeline.scheduler().unwrap().pending_len("tweet-schema-v1"), 0);
}

#[tokio::test]
async fn per_item_failures_reach_the_error_channel() {
    let store = Arc::new(MemoryStore::new());
    let (pipeline, mut events) = pipeline_with_bulk(&store, 2, 60_000);
    store.fail_item("bad", json!({ "type": "version_conflict_engine_exception" }));

    pipeline
        .index_document(&tweets(), "good", json!({}))
        .await
        .unwrap();
    pipeline
        .index_document(&tweets(), "bad", json!({}))
        .await
        .unwrap();

    match events.try_recv().unwrap() {
        BulkError::Item { item } => {
            assert_eq!(item["index"]["_id"], "bad");
            assert_eq!(
                item["index"]["error"]["type"],
                "version_conflict_engine_exception"
            );
        }
        BulkError::Request { .. } => panic!("expected per-item error"),
    }
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn request_failure_reports_once_and_drops_batch() {
    let store = Arc::new(MemoryStore::new());
    let (pipeline, mut events) = pipeline_with_bulk(&store, 1, 60_000);
    store.fail_next_bulk();

    pipeline
        .index_document(&tweets(), "1", json!({}))
        .await
        .unwrap();

    assert!(matches!(
        events.try_recv().unwrap(),
        BulkError::Request { .. }
    ));
    assert!(events.try_recv().is_err());
    assert!(store.document("tweets", "1").is_none());

    // At-most-once: the dropped batch is gone, later writes proceed.
    pipeline
        .index_document(&tweets(), "2", json!({}))
        .await
        .unwrap();
    assert!(store.document("tweets", "2").is_some());
}

#[tokio::test]
async fn direct_path_without_bulk_config() {
    let store = Arc::new(MemoryStore::new());
    let (sink, _events) = error_channel();
    let dyn_store: Arc<dyn SearchStore> = store.clone();
    let pipeline = UpdatePipeline::new(dyn_store, SyncConfig::default(), sink);

    pipeline
        .index_document(&tweets(), "1", json!({ "message": "hi" }))
        .await
        .unwrap();
    assert_eq!(store.bulk_calls(), 0);
    assert_eq!(store.document("tweets", "1"), Some(json!({ "message": "hi" })));

    pipeline.delete_document(&tweets(), "1").await.unwrap();
    assert!(store.is_empty());

    // Updates always go by query without a scheduler.
    pipeline
        .apply_update(
            &tweets(),
            &conditions(json!({ "_id": "42" })),
            &json!({ "$set": { "a": 1 } }),
            &UpdateOutcome::modified(1),
        )
        .await
        .unwrap();
    assert_eq!(store.update_by_query_log().len(), 1);
}

#[tokio::test]
async fn add_to_set_update_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let (pipeline, _events) = pipeline_with_bulk(&store, 1, 60_000);

    pipeline
        .apply_update(
            &tweets(),
            &conditions(json!({ "_id": "42" })),
            &json!({ "$addToSet": { "tags": { "$each": ["rust", "search"] } } }),
            &UpdateOutcome::modified(1),
        )
        .await
        .unwrap();

    // size = 1, so the enqueue flushed immediately.
    let scripts = store.script_log();
    assert_eq!(scripts.len(), 1);
    let (id, script) = &scripts[0];
    assert_eq!(id, "42");
    assert!(script.source.contains("ctx._source['tags'].add(value)"));
    assert!(script.source.contains("contains(value)"));

    let batch_key = script.params.keys().next().unwrap();
    assert_eq!(script.params[batch_key], json!(["rust", "search"]));
}
