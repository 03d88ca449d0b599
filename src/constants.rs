//! Application-wide constants
//!
//! Stage names, defaults and structured-logging event names live here so the
//! stage graph, the report writer and the statistics agree on one spelling.

/// Canonical stage names. Each name is also the key of the stage output in
/// the composed report.
pub mod stages {
    pub const LISTING_REASON: &str = "listing_reason_analysis";
    pub const OVERALL_ASSESSMENT: &str = "overall_assessment";
    pub const KEY_FORCES: &str = "key_forces";
    pub const BUYER_ANALYSIS: &str = "buyer_analysis";
    pub const SELLER_ANALYSIS: &str = "seller_analysis";
    pub const HISTORICAL_CONTEXT: &str = "historical_context";
    pub const FINAL_VERDICT: &str = "final_verdict";

    pub const ALL: [&str; 7] = [
        LISTING_REASON,
        OVERALL_ASSESSMENT,
        KEY_FORCES,
        BUYER_ANALYSIS,
        SELLER_ANALYSIS,
        HISTORICAL_CONTEXT,
        FINAL_VERDICT,
    ];
}

/// Pipeline defaults
pub mod pipeline {
    /// Total attempts per stage when the response is schema-invalid
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

    /// Independent stages of one stock allowed in flight at once
    pub const DEFAULT_STAGE_FANOUT: usize = 2;

    /// Reason recorded when a run is stopped by the shutdown signal
    pub const CANCELLED_REASON: &str = "cancelled";
}

/// Batch defaults
pub mod batch {
    pub const DEFAULT_CONCURRENCY: usize = 4;
    pub const DEFAULT_CALL_FAILED_RETRY_PASSES: usize = 1;
}

/// LLM defaults
pub mod llm {
    pub const DEFAULT_QUEUE_SIZE: usize = 64;
    pub const DEFAULT_MAX_CONCURRENT: usize = 8;
    pub const DEFAULT_MAX_TOKENS: u32 = 16384;
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;
}

/// Report file naming
pub mod files {
    pub const SUMMARY_FILE: &str = "summary.json";
    pub const ANALYSIS_SUFFIX: &str = "_analysis.json";
    pub const FAILURE_SUFFIX: &str = "_failure.json";
}

/// Logging event names for structured logging
pub mod events {
    pub const STAGE_STARTED: &str = "stage_started";
    pub const STAGE_SUCCEEDED: &str = "stage_succeeded";
    pub const STAGE_SCHEMA_INVALID: &str = "stage_schema_invalid";
    pub const STAGE_CALL_FAILED: &str = "stage_call_failed";
    pub const STAGE_ABORTED: &str = "stage_aborted_dependency";
    pub const STAGE_RETRY: &str = "stage_retry";
    pub const STAGE_SKIPPED: &str = "stage_skipped";
    pub const PIPELINE_COMPLETED: &str = "pipeline_completed";
    pub const PIPELINE_FAILED: &str = "pipeline_failed";
    pub const BATCH_SUMMARY: &str = "batch_summary";
}
