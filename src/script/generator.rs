// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Painless script generation.
//!
//! The [`ScriptGenerator`] accumulates one source fragment per update
//! operation plus a parameter table, and assembles everything at
//! [`build`](ScriptGenerator::build) into a single script whose prologue
//! null-guards every intermediate container before it is dereferenced.
//!
//! # Painless constructs emitted
//!
//! ```text
//! if (ctx._source['a'] == null) { ctx._source['a'] = [:] }   - null guard
//! ctx._source['a']['b'] = params['a']['b'];                  - $set
//! if (ctx._source['a'] != null) { ctx._source['a'].remove('b'); }  - $unset
//! for (value in params['<key>']) {                           - $addToSet $each
//!   if (!ctx._source['tags'].contains(value)) { ctx._source['tags'].add(value) }
//! }
//! ctx._source['tags'].addAll(params['<key>']);               - $addToSet bare
//! ```
//!
//! # Example
//!
//! ```
//! use search_sync::script::{ScriptGenerator, UpdateDocument};
//! use serde_json::json;
//!
//! let update = UpdateDocument::decode(&json!({
//!     "$set": { "title": "hello", "meta": { "lang": "en" } }
//! }));
//!
//! let mut generator = ScriptGenerator::new();
//! generator.apply(&update);
//! let script = generator.build();
//!
//! assert!(script.source.starts_with("if (ctx._source['meta'] == null)"));
//! assert!(script.source.contains("ctx._source['title'] = params['title'];"));
//! assert_eq!(script.params["meta"]["lang"], json!("en"));
//! ```

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::path::{self, FieldPath};
use super::update::UpdateDocument;

/// A generated server-side update script with its bound parameters.
///
/// Passed opaquely to the store's update APIs; the `lang` tag is fixed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PainlessScript {
    pub lang: String,
    pub source: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl PainlessScript {
    /// A script with no source and no parameters (the upsert-only body).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            lang: "painless".to_string(),
            source: String::new(),
            params: Map::new(),
        }
    }
}

/// A resolved `$addToSet` target: the batch of values to add and whether
/// membership must be checked per value.
#[derive(Debug, Clone)]
struct AddToSetBatch {
    values: Vec<Value>,
    deduplicate: bool,
}

impl AddToSetBatch {
    fn decode(raw: &Value) -> Self {
        if let Value::Object(map) = raw {
            if let Some(each) = map.get("$each") {
                // $each with anything but an array adds nothing
                return match each {
                    Value::Array(values) => Self {
                        values: values.clone(),
                        deduplicate: true,
                    },
                    _ => Self {
                        values: Vec::new(),
                        deduplicate: false,
                    },
                };
            }
        }
        Self {
            values: vec![raw.clone()],
            deduplicate: false,
        }
    }
}

/// Stateful builder translating update operations into one painless script.
///
/// Operations are emitted in the order the caller declares them. Every path
/// touched by `$set` or `$addToSet` is recorded so that `build()` can emit
/// null guards for all of its strict ancestors, deduplicated and ordered
/// ancestors-before-descendants.
#[derive(Debug, Default)]
pub struct ScriptGenerator {
    asserted: Vec<FieldPath>,
    params: Map<String, Value>,
    fragments: Vec<String>,
    upsert_doc: Map<String, Value>,
}

impl ScriptGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply all clauses of a decoded update document, in the canonical
    /// `$set`, `$unset`, `$addToSet`, `$setOnInsert` order.
    pub fn apply(&mut self, update: &UpdateDocument) {
        self.apply_set(&update.set);
        self.apply_unset(&update.unset);
        self.apply_add_to_set(&update.add_to_set);
        self.apply_set_on_insert(&update.set_on_insert);
    }

    /// `$set`: assign each leaf path from an identically-shaped parameter.
    ///
    /// Raw keys are single segments — a dotted key like `"a.b.c"` addresses
    /// the literal field `a.b.c`, while the bound parameters carry the
    /// dotted-expanded form of the input.
    pub fn apply_set(&mut self, fields: &Map<String, Value>) {
        if fields.is_empty() {
            return;
        }

        for (field_path, _) in path::flatten(fields) {
            let bracket = field_path.bracket();
            self.fragments
                .push(format!("ctx._source{bracket} = params{bracket};"));
            self.asserted.push(field_path);
        }

        let expanded = path::expand_dotted(fields);
        path::deep_merge(&mut self.params, &expanded);
        path::deep_merge(&mut self.upsert_doc, &expanded);
    }

    /// `$setOnInsert`: contributes to the upsert document only.
    pub fn apply_set_on_insert(&mut self, fields: &Map<String, Value>) {
        if fields.is_empty() {
            return;
        }
        let expanded = path::expand_dotted(fields);
        path::deep_merge(&mut self.upsert_doc, &expanded);
    }

    /// `$unset`: remove each leaf from its parent container.
    ///
    /// Nested removals are guarded by an existence check on every strict
    /// ancestor; a root-level removal runs unconditionally.
    pub fn apply_unset(&mut self, fields: &Map<String, Value>) {
        if fields.is_empty() {
            return;
        }

        let expanded = path::expand_dotted(fields);
        for (field_path, _) in path::flatten(&expanded) {
            let (Some(leaf), Some(parent)) = (field_path.leaf(), field_path.parent()) else {
                continue;
            };
            let removal = format!("ctx._source{}.remove('{leaf}');", parent.bracket());

            let guards: Vec<String> = field_path
                .ancestors()
                .map(|ancestor| format!("ctx._source{} != null", ancestor.bracket()))
                .collect();

            if guards.is_empty() {
                self.fragments.push(removal);
            } else {
                self.fragments
                    .push(format!("if ({}) {{ {removal} }}", guards.join(" && ")));
            }
        }
    }

    /// `$addToSet`: add a batch of values to a target array field.
    ///
    /// The target is the first prefix of each flattened path whose dotted
    /// form is a key of the raw input map — this separates the array field
    /// itself from nested keys inside its operand. The `$each` form adds
    /// each value only if not already present (value equality); a bare
    /// operand is appended without a membership test.
    pub fn apply_add_to_set(&mut self, fields: &Map<String, Value>) {
        if fields.is_empty() {
            return;
        }

        let expanded = path::expand_dotted(fields);
        let mut pending: Vec<(FieldPath, AddToSetBatch)> = Vec::new();

        for (field_path, _) in path::flatten(&expanded) {
            let target = (1..=field_path.len())
                .map(|n| field_path.prefix(n))
                .find(|prefix| fields.contains_key(&prefix.dotted()));
            let Some(target) = target else {
                continue;
            };
            let Some(raw) = fields.get(&target.dotted()) else {
                continue;
            };

            let batch = AddToSetBatch::decode(raw);
            match pending.iter().position(|(existing, _)| *existing == target) {
                Some(at) => pending[at].1 = batch,
                None => pending.push((target, batch)),
            }

            self.asserted.push(field_path);
        }

        for (target, batch) in pending {
            let key = Uuid::new_v4().to_string();
            let bracket = target.bracket();

            if batch.deduplicate {
                self.fragments.push(format!(
                    "for (value in params['{key}']) {{ \
                     if (!ctx._source{bracket}.contains(value)) {{ \
                     ctx._source{bracket}.add(value) }} }}"
                ));
            } else {
                self.fragments
                    .push(format!("ctx._source{bracket}.addAll(params['{key}']);"));
            }

            path::insert_at(&mut self.upsert_doc, &target, Value::Array(batch.values.clone()));
            self.params.insert(key, Value::Array(batch.values));
        }
    }

    /// Assemble the final script: null-guard prologue, then all fragments in
    /// emission order, joined by single spaces.
    #[must_use]
    pub fn build(&self) -> PainlessScript {
        let prologue = self.null_guard_prologue();
        let body = self.fragments.join(" ");
        let source = match (prologue.is_empty(), body.is_empty()) {
            (true, _) => body,
            (false, true) => prologue,
            (false, false) => format!("{prologue} {body}"),
        };

        PainlessScript {
            lang: "painless".to_string(),
            source,
            params: self.params.clone(),
        }
    }

    /// The merged `$set` + `$setOnInsert` document, used when the update
    /// turned out to be an insert.
    #[must_use]
    pub fn upsert(&self) -> Map<String, Value> {
        self.upsert_doc.clone()
    }

    /// One `if (== null) { = [:] }` statement per distinct strict ancestor
    /// of every asserted path, ancestors before descendants.
    fn null_guard_prologue(&self) -> String {
        let mut seen: HashSet<String> = HashSet::new();
        let mut guards: Vec<String> = Vec::new();

        for field_path in &self.asserted {
            for ancestor in field_path.ancestors() {
                let bracket = ancestor.bracket();
                if seen.insert(bracket.clone()) {
                    guards.push(format!(
                        "if (ctx._source{bracket} == null) {{ ctx._source{bracket} = [:] }}"
                    ));
                }
            }
        }

        guards.join(" ")
    }
}
