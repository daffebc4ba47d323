// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Condition-to-query translation.
//!
//! [`condition_to_query`] is a pure, total function: it never fails, and
//! unrecognized or malformed operators are silently ignored in favor of
//! forward compatibility. Each field's operator object is decoded once into
//! closed [`FieldPredicate`] variants; clauses are then emitted in a fixed
//! evaluation order — `$in`, `$exists`, `$nin`, range, `$ne`, `$eq` — into
//! the `filter` (positive) and `must_not` (negative) slots.
//!
//! # Example
//!
//! ```
//! use search_sync::search::condition_to_query;
//! use serde_json::{json, Map, Value};
//!
//! let conditions: Map<String, Value> = serde_json::from_value(json!({
//!     "article_id": { "$in": ["a", "b", "c"], "$nin": ["c"] }
//! })).unwrap();
//!
//! assert_eq!(condition_to_query(&conditions).to_value(), json!({
//!     "bool": {
//!         "must_not": [ { "terms": { "article_id": ["c"] } } ],
//!         "filter": [ { "terms": { "article_id": ["a", "b", "c"] } } ],
//!     }
//! }));
//! ```

use serde_json::{Map, Value};

/// Range bounds collected off one operator object, merged into one clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeBounds {
    pub gte: Option<Value>,
    pub gt: Option<Value>,
    pub lte: Option<Value>,
    pub lt: Option<Value>,
}

impl RangeBounds {
    fn is_empty(&self) -> bool {
        self.gte.is_none() && self.gt.is_none() && self.lte.is_none() && self.lt.is_none()
    }

    fn to_value(&self) -> Value {
        let mut bounds = Map::new();
        if let Some(gte) = &self.gte {
            bounds.insert("gte".to_string(), gte.clone());
        }
        if let Some(gt) = &self.gt {
            bounds.insert("gt".to_string(), gt.clone());
        }
        if let Some(lte) = &self.lte {
            bounds.insert("lte".to_string(), lte.clone());
        }
        if let Some(lt) = &self.lt {
            bounds.insert("lt".to_string(), lt.clone());
        }
        Value::Object(bounds)
    }
}

/// One decoded predicate on a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPredicate {
    /// `$in` — term-set membership, positive.
    In(Vec<Value>),
    /// `$exists` — field presence, positive.
    Exists,
    /// `$nin` — term-set membership, negative.
    NotIn(Vec<Value>),
    /// Any of `$gte`/`$gt`/`$lte`/`$lt`, merged into one range clause.
    Range(RangeBounds),
    /// `$ne` — negative equality.
    NotEqual(Value),
    /// `$eq` — explicit positive equality.
    Equal(Value),
    /// No named operator present: the whole value is an implicit equality.
    Bare(Value),
}

impl FieldPredicate {
    /// Decode a field's condition value into its predicates, in evaluation
    /// order. A scalar (or an operator object with no recognized operator)
    /// decodes to a single [`FieldPredicate::Bare`].
    #[must_use]
    pub fn decode(value: &Value) -> Vec<FieldPredicate> {
        let Value::Object(operators) = value else {
            return vec![FieldPredicate::Bare(value.clone())];
        };

        let mut predicates = Vec::new();

        if let Some(Value::Array(values)) = operators.get("$in") {
            predicates.push(FieldPredicate::In(values.clone()));
        }
        if operators.contains_key("$exists") {
            predicates.push(FieldPredicate::Exists);
        }
        if let Some(Value::Array(values)) = operators.get("$nin") {
            predicates.push(FieldPredicate::NotIn(values.clone()));
        }

        let bounds = RangeBounds {
            gte: operators.get("$gte").cloned(),
            gt: operators.get("$gt").cloned(),
            lte: operators.get("$lte").cloned(),
            lt: operators.get("$lt").cloned(),
        };
        if !bounds.is_empty() {
            predicates.push(FieldPredicate::Range(bounds));
        }

        if let Some(value) = operators.get("$ne") {
            predicates.push(FieldPredicate::NotEqual(value.clone()));
        }
        if let Some(value) = operators.get("$eq") {
            predicates.push(FieldPredicate::Equal(value.clone()));
        }

        if predicates.is_empty() {
            predicates.push(FieldPredicate::Bare(value.clone()));
        }
        predicates
    }

    /// True when this predicate rules out a direct primary-key lookup.
    fn blocks_direct_lookup(&self) -> bool {
        matches!(
            self,
            FieldPredicate::NotEqual(_) | FieldPredicate::NotIn(_) | FieldPredicate::Range(_)
        )
    }
}

/// A boolean query with positive (`filter`) and negative (`must_not`)
/// clause lists. Empty slots are omitted from the serialized form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionQuery {
    pub filter: Vec<Value>,
    pub must_not: Vec<Value>,
}

impl ConditionQuery {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filter.is_empty() && self.must_not.is_empty()
    }

    /// The `{"bool": {...}}` wire form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut body = Map::new();
        if !self.must_not.is_empty() {
            body.insert("must_not".to_string(), Value::Array(self.must_not.clone()));
        }
        if !self.filter.is_empty() {
            body.insert("filter".to_string(), Value::Array(self.filter.clone()));
        }
        let mut query = Map::new();
        query.insert("bool".to_string(), Value::Object(body));
        Value::Object(query)
    }
}

impl From<ConditionQuery> for Value {
    fn from(query: ConditionQuery) -> Self {
        query.to_value()
    }
}

/// `{"<kind>": {"<field>": <value>}}`
fn clause(kind: &str, field: &str, value: Value) -> Value {
    let mut inner = Map::new();
    inner.insert(field.to_string(), value);
    let mut outer = Map::new();
    outer.insert(kind.to_string(), Value::Object(inner));
    Value::Object(outer)
}

/// Translate a flattened condition map into a boolean query.
#[must_use]
pub fn condition_to_query(conditions: &Map<String, Value>) -> ConditionQuery {
    let mut query = ConditionQuery::default();

    for (field, raw) in conditions {
        for predicate in FieldPredicate::decode(raw) {
            match predicate {
                FieldPredicate::In(values) => {
                    query.filter.push(clause("terms", field, Value::Array(values)));
                }
                FieldPredicate::Exists => {
                    query
                        .filter
                        .push(clause("exists", "field", Value::String(field.clone())));
                }
                FieldPredicate::NotIn(values) => {
                    query
                        .must_not
                        .push(clause("terms", field, Value::Array(values)));
                }
                FieldPredicate::Range(bounds) => {
                    query.filter.push(clause("range", field, bounds.to_value()));
                }
                FieldPredicate::NotEqual(value) => {
                    query.must_not.push(clause("term", field, value));
                }
                FieldPredicate::Equal(value) | FieldPredicate::Bare(value) => {
                    query.filter.push(clause("term", field, value));
                }
            }
        }
    }

    query
}

/// True when every field is satisfiable by a direct single-document lookup:
/// `$ne`, `$nin` and range bounds force the query-based path.
#[must_use]
pub fn supports_direct_lookup(conditions: &Map<String, Value>) -> bool {
    conditions.values().all(|raw| {
        FieldPredicate::decode(raw)
            .iter()
            .all(|predicate| !predicate.blocks_direct_lookup())
    })
}

/// Flatten a nested condition document into dotted field names, without
/// descending into operator objects (any object carrying a `$`-prefixed
/// key stays intact as that field's condition value).
#[must_use]
pub fn flatten_conditions(conditions: &Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    flatten_level(None, conditions, &mut flat);
    flat
}

fn flatten_level(prefix: Option<&str>, map: &Map<String, Value>, out: &mut Map<String, Value>) {
    for (key, value) in map {
        let field = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner)
                if !inner.is_empty() && !inner.keys().any(|k| k.starts_with('$')) =>
            {
                flatten_level(Some(&field), inner, out);
            }
            other => {
                out.insert(field, other.clone());
            }
        }
    }
}
