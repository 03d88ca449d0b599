//! The canonical seven-stage dragon-tiger analysis.
//!
//! Layering produced by the dependencies:
//!
//! 1. `listing_reason_analysis`, `key_forces`, `historical_context`
//! 2. `overall_assessment`, `buyer_analysis`, `seller_analysis`
//! 3. `final_verdict`

pub mod buyer_analysis;
pub mod final_verdict;
pub mod historical_context;
pub mod key_forces;
pub mod listing_reason;
pub mod overall_assessment;
pub mod seller_analysis;


use crate::error::GraphError;
use crate::pipeline::{PromptRenderer, StageDefinition, StageGraph};

/// Stage definitions in declaration order.
pub fn canonical_stages() -> Vec<StageDefinition> {
    vec![
        listing_reason::definition(),
        overall_assessment::definition(),
        key_forces::definition(),
        buyer_analysis::definition(),
        seller_analysis::definition(),
        historical_context::definition(),
        final_verdict::definition(),
    ]
}

pub fn canonical_graph(renderer: &PromptRenderer) -> Result<StageGraph, GraphError> {
    StageGraph::new(canonical_stages(), renderer)
}
