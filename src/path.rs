//! Field paths and document flattening.
//!
//! A [`FieldPath`] names a location inside a document tree as an ordered
//! list of segments. Paths render in bracket notation, which is
//! delimiter-proof: a field name containing dots stays a single segment.
//!
//! # Example
//!
//! ```
//! use search_sync::path::FieldPath;
//!
//! let path = FieldPath::from_segments(["d", "e", "value"]);
//! assert_eq!(path.bracket(), "['d']['e']['value']");
//! assert_eq!(path.dotted(), "d.e.value");
//!
//! let ancestors: Vec<String> = path.ancestors().map(|a| a.bracket()).collect();
//! assert_eq!(ancestors, vec!["['d']", "['d']['e']"]);
//! ```

use serde_json::{Map, Value};

/// An ordered sequence of segments identifying a location in a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// The document root (no segments).
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from an iterator of segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Extend this path with one more segment.
    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }

    /// The first `len` segments of this path.
    #[must_use]
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, if any.
    #[must_use]
    pub fn leaf(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Everything but the last segment. `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            Some(self.prefix(self.segments.len() - 1))
        }
    }

    /// Strict prefixes of this path (excluding the root and the path
    /// itself), in increasing depth order.
    pub fn ancestors(&self) -> impl Iterator<Item = FieldPath> + '_ {
        (1..self.segments.len()).map(|n| self.prefix(n))
    }

    /// Bracket notation: `['a']['b']['c']`. The root renders as "".
    #[must_use]
    pub fn bracket(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push_str("['");
            out.push_str(segment);
            out.push_str("']");
        }
        out
    }

    /// Dotted notation: `a.b.c`. The root renders as "".
    #[must_use]
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dotted())
    }
}

/// Flatten a nested mapping into root-to-leaf paths.
///
/// Recurses into nested objects only: arrays and scalars are leaves, and
/// each object key contributes exactly one segment — a raw key like
/// `"a.b.c"` is *not* split. Insertion order is preserved.
#[must_use]
pub fn flatten(map: &Map<String, Value>) -> Vec<(FieldPath, Value)> {
    let mut out = Vec::new();
    flatten_into(&FieldPath::root(), map, &mut out);
    out
}

fn flatten_into(prefix: &FieldPath, map: &Map<String, Value>, out: &mut Vec<(FieldPath, Value)>) {
    for (key, value) in map {
        let path = prefix.child(key);
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(&path, inner, out),
            other => out.push((path, other.clone())),
        }
    }
}

/// Expand dotted keys into nested objects: `{"a.b.c": v}` becomes
/// `{"a": {"b": {"c": v}}}`.
///
/// Shorter keys are applied first, so `{"d": {"e": 1}, "d.f": 2}` merges
/// into one `d` object. A key is dropped when an intermediate segment would
/// have to write through an existing non-container value (`{"a": true,
/// "a.b": 1}` keeps only `a: true`). Object values are expanded
/// recursively.
#[must_use]
pub fn expand_dotted(map: &Map<String, Value>) -> Map<String, Value> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort_by_key(|key| key.len());

    let mut out = Map::new();
    'keys: for key in keys {
        let Some(value) = map.get(key.as_str()) else {
            continue;
        };
        let segments: Vec<&str> = key.split('.').collect();
        let (leaf, parents) = match segments.split_last() {
            Some(split) => split,
            None => continue,
        };

        let mut cursor = &mut out;
        for segment in parents {
            let slot = cursor
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match slot.as_object_mut() {
                Some(next) => cursor = next,
                None => continue 'keys,
            }
        }

        let expanded = match value {
            Value::Object(inner) => Value::Object(expand_dotted(inner)),
            other => other.clone(),
        };
        cursor.insert((*leaf).to_string(), expanded);
    }
    out
}

/// Recursively merge `src` into `dst`; `src` wins on non-object conflicts.
pub fn deep_merge(dst: &mut Map<String, Value>, src: &Map<String, Value>) {
    for (key, value) in src {
        match value {
            Value::Object(incoming) if dst.get(key).is_some_and(Value::is_object) => {
                if let Some(Value::Object(existing)) = dst.get_mut(key) {
                    deep_merge(existing, incoming);
                }
            }
            _ => {
                dst.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Set `value` at `path`, creating (or replacing) intermediate objects.
pub fn insert_at(map: &mut Map<String, Value>, path: &FieldPath, value: Value) {
    let Some((leaf, parents)) = path.segments().split_last() else {
        return;
    };
    let mut cursor = map;
    for segment in parents {
        let slot = cursor
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Some(next) = slot.as_object_mut() else {
            return;
        };
        cursor = next;
    }
    cursor.insert(leaf.clone(), value);
}
