//! Bulk load outcome

use serde::{Deserialize, Serialize};

/// Outcome of one bulk load call
///
/// `succeeded == false` is a normal outcome reported by the warehouse. Conditions
/// that leave the outcome unknown are surfaced as errors instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadResult {
    /// Whether every chunk was written
    pub succeeded: bool,

    /// Rows confirmed written by the warehouse
    pub rows_written: u64,

    /// Number of chunks sent
    pub chunk_count: usize,

    /// Fully qualified destination table
    pub target_identifier: String,

    /// Warehouse message for the chunk that failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl LoadResult {
    /// A load where every chunk was accepted
    pub fn success(target: impl Into<String>, rows_written: u64, chunk_count: usize) -> Self {
        Self {
            succeeded: true,
            rows_written,
            chunk_count,
            target_identifier: target.into(),
            failure: None,
        }
    }

    /// A load stopped by a rejected chunk
    pub fn failed(
        target: impl Into<String>,
        rows_written: u64,
        chunk_count: usize,
        failure: impl Into<String>,
    ) -> Self {
        Self {
            succeeded: false,
            rows_written,
            chunk_count,
            target_identifier: target.into(),
            failure: Some(failure.into()),
        }
    }
}
