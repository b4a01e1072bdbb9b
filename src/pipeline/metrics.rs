// src/pipeline/metrics.rs
//
// Run counters for the frame loop, summarised once at exit.

use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub iterations: u64,
    pub reset_iterations: u64,
    pub frames_read: u64,
    pub tracked_frames: u64,
    pub aggregates_rendered: u64,
    pub frames_without_arrows: u64,
    pub short_selections: u64,
    pub started_at: Instant,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            iterations: 0,
            reset_iterations: 0,
            frames_read: 0,
            tracked_frames: 0,
            aggregates_rendered: 0,
            frames_without_arrows: 0,
            short_selections: 0,
            started_at: Instant::now(),
        }
    }

    pub fn fps(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            self.frames_read as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            iterations: self.iterations,
            reset_iterations: self.reset_iterations,
            frames_read: self.frames_read,
            tracked_frames: self.tracked_frames,
            aggregates_rendered: self.aggregates_rendered,
            frames_without_arrows: self.frames_without_arrows,
            short_selections: self.short_selections,
            fps: self.fps(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub iterations: u64,
    pub reset_iterations: u64,
    pub frames_read: u64,
    pub tracked_frames: u64,
    pub aggregates_rendered: u64,
    pub frames_without_arrows: u64,
    pub short_selections: u64,
    pub fps: f64,
    pub elapsed_secs: f64,
}
