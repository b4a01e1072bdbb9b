// src/pipeline/tracking_state.rs
//
// The two live generations of tracking data. Only `previous` and
// `current` ever exist; advancing moves current into previous and drops
// whatever previous held.

use opencv::core::Point2f;
use std::mem;

#[derive(Debug)]
pub struct Generation<G> {
    pub points: Vec<Point2f>,
    pub gray: Option<G>,
}

impl<G> Default for Generation<G> {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            gray: None,
        }
    }
}

#[derive(Debug)]
pub struct TrackingState<G> {
    pub previous: Generation<G>,
    pub current: Generation<G>,
}

impl<G> Default for TrackingState<G> {
    fn default() -> Self {
        Self {
            previous: Generation::default(),
            current: Generation::default(),
        }
    }
}

impl<G> TrackingState<G> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reinitialisation: forget both point sets. Grayscale frames are kept.
    pub fn clear_points(&mut self) {
        self.previous.points.clear();
        self.current.points.clear();
    }

    pub fn has_previous_points(&self) -> bool {
        !self.previous.points.is_empty()
    }

    /// Current becomes previous; the old previous generation is dropped.
    pub fn advance(&mut self) {
        mem::swap(&mut self.previous, &mut self.current);
        self.current.points.clear();
        self.current.gray = None;
    }
}
