//! Update-document decoding.

use serde_json::{Map, Value};

/// An update document decoded into its supported operator clauses.
///
/// Decoding happens once at the boundary; downstream code never probes raw
/// JSON for operator keys. Unrecognized top-level operators are ignored, and
/// a missing clause decodes to an empty map — every consumer treats an empty
/// clause as a no-op.
///
/// # Example
///
/// ```
/// use search_sync::script::UpdateDocument;
/// use serde_json::json;
///
/// let update = UpdateDocument::decode(&json!({
///     "$set": { "message": "hello" },
///     "$unset": { "draft": true },
///     "$currentDate": { "updated_at": true },  // unsupported, ignored
/// }));
///
/// assert_eq!(update.set.len(), 1);
/// assert_eq!(update.unset.len(), 1);
/// assert!(update.add_to_set.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDocument {
    pub set: Map<String, Value>,
    pub unset: Map<String, Value>,
    pub add_to_set: Map<String, Value>,
    pub set_on_insert: Map<String, Value>,
}

impl UpdateDocument {
    /// Decode the supported operator clauses out of a raw update document.
    #[must_use]
    pub fn decode(update: &Value) -> Self {
        let Value::Object(map) = update else {
            return Self::default();
        };
        let clause = |operator: &str| {
            map.get(operator)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default()
        };
        Self {
            set: clause("$set"),
            unset: clause("$unset"),
            add_to_set: clause("$addToSet"),
            set_on_insert: clause("$setOnInsert"),
        }
    }

    /// True when no supported clause carries any field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.unset.is_empty()
            && self.add_to_set.is_empty()
            && self.set_on_insert.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_all_clauses() {
        let update = UpdateDocument::decode(&json!({
            "$set": { "a": 1 },
            "$unset": { "b": true },
            "$addToSet": { "tags": "x" },
            "$setOnInsert": { "created": "now" },
        }));

        assert_eq!(update.set.get("a"), Some(&json!(1)));
        assert_eq!(update.unset.get("b"), Some(&json!(true)));
        assert_eq!(update.add_to_set.get("tags"), Some(&json!("x")));
        assert_eq!(update.set_on_insert.get("created"), Some(&json!("now")));
        assert!(!update.is_empty());
    }

    #[test]
    fn test_decode_ignores_unknown_operators() {
        let update = UpdateDocument::decode(&json!({
            "$inc": { "count": 1 },
            "$rename": { "a": "b" },
        }));
        assert!(update.is_empty());
    }

    #[test]
    fn test_decode_non_object_is_empty() {
        assert!(UpdateDocument::decode(&json!(null)).is_empty());
        assert!(UpdateDocument::decode(&json!([1, 2])).is_empty());
        assert!(UpdateDocument::decode(&json!({ "$set": 5 })).is_empty());
    }
}
