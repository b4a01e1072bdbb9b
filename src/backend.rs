// src/backend.rs
//
// Seams between the frame loop and the vision library. The OpenCV
// implementations live in video_processor.rs, features.rs and overlay.rs.

use crate::types::{AggregateArrow, TrackOutput};
use anyhow::Result;
use opencv::core::Point2f;

/// A colour frame with known pixel dimensions
pub trait Raster {
    /// (width, height)
    fn dimensions(&self) -> (i32, i32);
}

pub trait FrameSource {
    type Frame: Raster;

    /// `None` signals end-of-stream
    fn next_frame(&mut self) -> Result<Option<Self::Frame>>;
}

pub trait FeatureTracker {
    type Frame;
    type Gray;

    fn to_gray(&mut self, frame: &Self::Frame) -> Result<Self::Gray>;

    fn duplicate_gray(&mut self, gray: &Self::Gray) -> Result<Self::Gray>;

    /// Up to `max_features` trackable corners
    fn detect(&mut self, gray: &Self::Gray) -> Result<Vec<Point2f>>;

    /// Sub-pixel refinement, in place
    fn refine(&mut self, gray: &Self::Gray, points: &mut Vec<Point2f>) -> Result<()>;

    /// Follow `previous_points` from `previous` into `current`. `expected` is
    /// the current detection; the output has one entry per previous point.
    fn track(
        &mut self,
        previous: &Self::Gray,
        current: &Self::Gray,
        previous_points: &[Point2f],
        expected: &[Point2f],
    ) -> Result<TrackOutput>;
}

pub trait Display {
    type Frame;

    fn draw_arrow(&mut self, frame: &mut Self::Frame, arrow: &AggregateArrow) -> Result<()>;

    fn show(&mut self, frame: &Self::Frame) -> Result<()>;

    /// Waits at most the configured poll interval
    fn poll_key(&mut self) -> Result<Option<i32>>;
}
