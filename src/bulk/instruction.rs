// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bulk instructions and their wire form.
//!
//! A [`BulkRequest`] carries an ordered list of [`BulkInstruction`]s; the
//! store processes them in submission order. Each instruction serializes to
//! an action/metadata header line, followed by its payload line where the
//! action takes one.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::script::PainlessScript;

/// The three bulk actions the store understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkActionKind {
    Index,
    Update,
    Delete,
}

impl BulkActionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for BulkActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload of a bulk update: a script to run against the existing document
/// and, for updates that may have to insert, the document to seed with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateBody {
    pub script: PainlessScript,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upsert: Option<Value>,
}

impl UpdateBody {
    /// Script-only body: the update targets an existing document.
    #[must_use]
    pub fn with_script(script: PainlessScript) -> Self {
        Self {
            script,
            upsert: None,
        }
    }

    /// Upsert body: the update created the document, so the merged upsert
    /// document is submitted with an empty script.
    #[must_use]
    pub fn with_upsert(upsert: Value) -> Self {
        Self {
            script: PainlessScript::empty(),
            upsert: Some(upsert),
        }
    }
}

/// One buffered operation against a single document.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkInstruction {
    Index {
        index: String,
        id: String,
        document: Value,
    },
    Update {
        index: String,
        id: String,
        body: UpdateBody,
    },
    Delete {
        index: String,
        id: String,
    },
}

impl BulkInstruction {
    #[must_use]
    pub fn action(&self) -> BulkActionKind {
        match self {
            Self::Index { .. } => BulkActionKind::Index,
            Self::Update { .. } => BulkActionKind::Update,
            Self::Delete { .. } => BulkActionKind::Delete,
        }
    }

    #[must_use]
    pub fn index(&self) -> &str {
        match self {
            Self::Index { index, .. } | Self::Update { index, .. } | Self::Delete { index, .. } => {
                index
            }
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Index { id, .. } | Self::Update { id, .. } | Self::Delete { id, .. } => id,
        }
    }

    /// Append this instruction's wire lines: the action header, then the
    /// payload for index/update.
    pub fn append_lines(&self, lines: &mut Vec<Value>) {
        lines.push(action_header(self.action(), self.index(), self.id()));
        match self {
            Self::Index { document, .. } => lines.push(document.clone()),
            Self::Update { body, .. } => {
                lines.push(serde_json::to_value(body).unwrap_or(Value::Null));
            }
            Self::Delete { .. } => {}
        }
    }
}

fn action_header(action: BulkActionKind, index: &str, id: &str) -> Value {
    let mut meta = Map::new();
    meta.insert("_index".to_string(), Value::String(index.to_string()));
    meta.insert("_id".to_string(), Value::String(id.to_string()));
    let mut header = Map::new();
    header.insert(action.as_str().to_string(), Value::Object(meta));
    Value::Object(header)
}

/// One network call batching multiple instructions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkRequest {
    pub operations: Vec<BulkInstruction>,
}

impl BulkRequest {
    #[must_use]
    pub fn new(operations: Vec<BulkInstruction>) -> Self {
        Self { operations }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// The request body as an ordered sequence of header/payload lines.
    #[must_use]
    pub fn body(&self) -> Vec<Value> {
        let mut lines = Vec::new();
        for operation in &self.operations {
            operation.append_lines(&mut lines);
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_index_instruction_lines() {
        let request = BulkRequest::new(vec![BulkInstruction::Index {
            index: "tweets".to_string(),
            id: "1".to_string(),
            document: json!({ "message": "hello" }),
        }]);

        assert_eq!(
            request.body(),
            vec![
                json!({ "index": { "_index": "tweets", "_id": "1" } }),
                json!({ "message": "hello" }),
            ]
        );
    }

    #[test]
    fn test_delete_instruction_has_no_payload() {
        let request = BulkRequest::new(vec![BulkInstruction::Delete {
            index: "tweets".to_string(),
            id: "1".to_string(),
        }]);

        assert_eq!(
            request.body(),
            vec![json!({ "delete": { "_index": "tweets", "_id": "1" } })]
        );
    }

    #[test]
    fn test_update_script_body() {
        let mut script = PainlessScript::empty();
        script.source = "ctx._source['a'] = params['a'];".to_string();
        script.params.insert("a".to_string(), json!(1));

        let request = BulkRequest::new(vec![BulkInstruction::Update {
            index: "tweets".to_string(),
            id: "1".to_string(),
            body: UpdateBody::with_script(script),
        }]);

        assert_eq!(
            request.body(),
            vec![
                json!({ "update": { "_index": "tweets", "_id": "1" } }),
                json!({
                    "script": {
                        "lang": "painless",
                        "source": "ctx._source['a'] = params['a'];",
                        "params": { "a": 1 },
                    }
                }),
            ]
        );
    }

    #[test]
    fn test_update_upsert_body_carries_empty_script() {
        let request = BulkRequest::new(vec![BulkInstruction::Update {
            index: "tweets".to_string(),
            id: "1".to_string(),
            body: UpdateBody::with_upsert(json!({ "created": true })),
        }]);

        assert_eq!(
            request.body()[1],
            json!({
                "script": { "lang": "painless", "source": "" },
                "upsert": { "created": true },
            })
        );
    }

    #[test]
    fn test_lines_preserve_submission_order() {
        let request = BulkRequest::new(vec![
            BulkInstruction::Delete {
                index: "a".to_string(),
                id: "1".to_string(),
            },
            BulkInstruction::Index {
                index: "b".to_string(),
                id: "2".to_string(),
                document: json!({}),
            },
        ]);

        let body = request.body();
        assert_eq!(body.len(), 3);
        assert!(body[0].get("delete").is_some());
        assert!(body[1].get("index").is_some());
    }
}
