//! Filter-predicate translation.
//!
//! Maps document-database filter predicates (equality, `$in`/`$nin`,
//! `$exists`, range bounds, `$ne`/`$eq`) onto the search engine's boolean
//! query, and decides when a predicate can be satisfied by a direct
//! single-document lookup instead of a query.

mod condition;

pub use condition::{
    condition_to_query, flatten_conditions, supports_direct_lookup, ConditionQuery,
    FieldPredicate, RangeBounds,
};
