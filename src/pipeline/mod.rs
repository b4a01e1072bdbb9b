// src/pipeline/mod.rs
//
// Per-frame loop: scheduler → detect/refine → track → arrows → overlay.

pub mod metrics;
pub mod orchestrator;
pub mod tracking_state;

pub use orchestrator::FlowPipeline;
