//! Configuration for the sync core.
//!
//! # Example
//!
//! ```
//! use search_sync::config::{BulkConfig, SyncConfig};
//!
//! // Defaults
//! let bulk = BulkConfig::default();
//! assert_eq!(bulk.size, 1000);
//! assert_eq!(bulk.delay_ms, 100);
//!
//! // No bulk section: single-document operations go directly to the store.
//! let config: SyncConfig = serde_json::from_str("{}").unwrap();
//! assert!(config.bulk.is_none());
//!
//! // With bulk buffering
//! let config: SyncConfig = serde_json::from_str(r#"{ "bulk": { "size": 50 } }"#).unwrap();
//! assert_eq!(config.bulk.unwrap().size, 50);
//! ```

use serde::Deserialize;

/// Bulk buffering thresholds.
///
/// A buffer flushes when it holds `size` instructions or when `delay_ms`
/// has elapsed since its timer was started, whichever comes first.
/// `size` must be positive; a buffer of size 1 flushes on every enqueue.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkConfig {
    /// Flush after this many buffered instructions.
    #[serde(default = "default_bulk_size")]
    pub size: usize,

    /// Flush this many milliseconds after the first buffered instruction.
    #[serde(default = "default_bulk_delay_ms")]
    pub delay_ms: u64,
}

fn default_bulk_size() -> usize {
    1000
}
fn default_bulk_delay_ms() -> u64 {
    100
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            size: default_bulk_size(),
            delay_ms: default_bulk_delay_ms(),
        }
    }
}

/// Per-collection sync options consumed by the core.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfig {
    /// Bulk buffering; absent selects the direct single-document write
    /// path.
    #[serde(default)]
    pub bulk: Option<BulkConfig>,
}

impl SyncConfig {
    /// Enable bulk buffering with the given thresholds.
    #[must_use]
    pub fn with_bulk(bulk: BulkConfig) -> Self {
        Self { bulk: Some(bulk) }
    }
}
