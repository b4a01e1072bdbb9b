// src/types.rs

use opencv::core::Point;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub features: FeatureConfig,
    pub flow: FlowConfig,
    pub termination: TerminationConfig,
    pub arrows: ArrowConfig,
    pub reinit: ReinitConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

/// Corner detection and sub-pixel refinement parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub max_features: i32,
    pub quality_level: f64,
    pub min_distance: f64,
    pub block_size: i32,
    pub gradient_size: i32,
    pub use_harris: bool,
    pub harris_k: f64,
    /// Half-size of the sub-pixel search window (3 → 7x7)
    pub subpix_window: i32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            max_features: 800,
            quality_level: 0.001,
            min_distance: 1.0,
            block_size: 3,
            gradient_size: 3,
            use_harris: true,
            harris_k: 0.04,
            subpix_window: 3,
        }
    }
}

/// Pyramidal Lucas-Kanade parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub window_size: i32,
    pub max_pyramid_level: i32,
    pub flags: i32,
    pub min_eig_threshold: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            max_pyramid_level: 3,
            flags: 0,
            min_eig_threshold: 0.001,
        }
    }
}

/// Iteration limits shared by sub-pixel refinement and optical flow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationConfig {
    pub max_iterations: i32,
    pub epsilon: f64,
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            epsilon: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrowConfig {
    /// Displacements at or above this magnitude (px) are treated as mismatches
    pub shift_acceptance_threshold: f64,
    /// How many of the largest accepted displacements feed the average
    pub top_n_arrows: usize,
    /// Drawn length of the aggregate arrow (px), independent of measured motion
    pub display_length: f64,
    pub anchor: Anchor,
}

impl Default for ArrowConfig {
    fn default() -> Self {
        Self {
            shift_acceptance_threshold: 15.0,
            top_n_arrows: 5,
            display_length: 150.0,
            anchor: Anchor::FrameCenter,
        }
    }
}

/// Where the aggregate arrow starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Anchor {
    FrameCenter,
    Fixed { x: i32, y: i32 },
}

impl Anchor {
    pub fn resolve(&self, width: i32, height: i32) -> Point {
        match *self {
            Anchor::FrameCenter => Point::new(width / 2, height / 2),
            Anchor::Fixed { x, y } => Point::new(x, y),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReinitConfig {
    pub frames_between_reinit: u64,
}

impl Default for ReinitConfig {
    fn default() -> Self {
        Self {
            frames_between_reinit: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub window_name: String,
    pub key_poll_ms: i32,
    pub quit_key: i32,
    /// BGR
    pub arrow_color: [f64; 3],
    pub arrow_thickness: i32,
    pub tip_length: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            window_name: "LK Demo".to_string(),
            key_poll_ms: 10,
            quit_key: 27,
            arrow_color: [0.0, 255.0, 0.0],
            arrow_thickness: 3,
            tip_length: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Displacement of one tracked point between two consecutive frames.
///
/// `angle` is measured from `end` back toward `start`, so it points
/// against the observed motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrow {
    pub start: Point,
    pub end: Point,
    pub angle: f64,
    pub length: f64,
}

/// The single direction indicator drawn per frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateArrow {
    pub start: Point,
    pub end: Point,
    pub angle: f64,
    pub length: f64,
    /// Number of arrows averaged into `angle`
    pub sample_count: usize,
}

/// Output of the optical-flow tracker, one entry per previous point
#[derive(Debug, Clone, Default)]
pub struct TrackOutput {
    pub points: Vec<opencv::core::Point2f>,
    pub found: Vec<bool>,
    pub errors: Vec<f32>,
}
