//! Structured logging field name constants for pagematch.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query the same names across every stage.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Run-level failure surfaced to the caller |
//! | WARN  | Candidate dropped, recoverable store failure |
//! | INFO  | Lifecycle events, search completions |
//! | DEBUG | Stage boundaries, funnel sizes, tuning choices |
//! | TRACE | Per-candidate and per-chunk-pair detail |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "search", "db"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "prefilter", "refine", "alignment", "orchestrator"
pub const COMPONENT: &str = "component";

/// Logical operation name.
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Source document UUID of a search.
pub const SOURCE_ID: &str = "source_id";

/// Candidate or target document UUID.
pub const DOCUMENT_ID: &str = "document_id";

/// Embedding model tag.
pub const MODEL: &str = "model";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of candidates entering or leaving a stage.
pub const CANDIDATE_COUNT: &str = "candidate_count";

/// Number of results returned by a search.
pub const RESULT_COUNT: &str = "result_count";

/// Number of chunks processed.
pub const CHUNK_COUNT: &str = "chunk_count";

/// HNSW ef_search value used for the centroid scan.
pub const EF_SEARCH: &str = "ef_search";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Every field name above, for schema checks.
pub const ALL_FIELDS: &[&str] = &[
    SUBSYSTEM,
    COMPONENT,
    OPERATION,
    SOURCE_ID,
    DOCUMENT_ID,
    MODEL,
    DURATION_MS,
    CANDIDATE_COUNT,
    RESULT_COUNT,
    CHUNK_COUNT,
    EF_SEARCH,
    ERROR_MSG,
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_field_names_are_unique_snake_case() {
        let unique: HashSet<&str> = ALL_FIELDS.iter().copied().collect();
        assert_eq!(unique.len(), ALL_FIELDS.len());
        for name in ALL_FIELDS {
            assert!(name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }
}
