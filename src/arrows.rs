// src/arrows.rs
//
// Turns matched point pairs into displacement arrows and collapses the
// strongest of them into one direction indicator.
//
//   matched pairs → filter (< threshold) → rank by length → top N
//                 → mean angle → aggregate arrow at the anchor
//
// The angle average is a plain arithmetic mean, not a circular one.
// Arrows pointing near ±π average to something close to 0 instead of π.

use crate::types::{AggregateArrow, Arrow, ArrowConfig};
use opencv::core::{Point, Point2f};

// ============================================================================
// SELECTION
// ============================================================================

/// Arrows that made it through filtering and ranking for one frame
#[derive(Debug, Clone)]
pub struct ArrowSelection {
    /// Longest first, at most `top_n_arrows` long
    pub arrows: Vec<Arrow>,
    /// How many arrows passed the threshold before truncation
    pub accepted: usize,
}

impl ArrowSelection {
    /// True when fewer arrows survived than the configured top N
    pub fn is_short(&self, top_n: usize) -> bool {
        self.arrows.len() < top_n
    }
}

// ============================================================================
// BUILDER
// ============================================================================

pub struct ArrowBuilder {
    config: ArrowConfig,
}

impl ArrowBuilder {
    pub fn new(config: ArrowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ArrowConfig {
        &self.config
    }

    /// Build one arrow per found point whose shift is below the acceptance
    /// threshold. Point coordinates are truncated to whole pixels first.
    pub fn build_arrows(
        &self,
        previous: &[Point2f],
        current: &[Point2f],
        found: &[bool],
    ) -> Vec<Arrow> {
        previous
            .iter()
            .zip(current)
            .zip(found)
            .filter(|(_, found)| **found)
            .map(|((prev, cur), _)| arrow_between(*prev, *cur))
            .filter(|arrow| arrow.length < self.config.shift_acceptance_threshold)
            .collect()
    }

    /// Rank longest first and keep at most `top_n_arrows`
    pub fn select(&self, mut arrows: Vec<Arrow>) -> ArrowSelection {
        let accepted = arrows.len();
        arrows.sort_by(|a, b| b.length.total_cmp(&a.length));
        arrows.truncate(self.config.top_n_arrows.min(accepted));
        ArrowSelection { arrows, accepted }
    }

    /// Aggregate arrow anchored at `start`, or `None` when nothing survived
    pub fn aggregate(&self, selection: &ArrowSelection, start: Point) -> Option<AggregateArrow> {
        let angle = mean_angle(&selection.arrows)?;
        let length = self.config.display_length;
        Some(AggregateArrow {
            start,
            end: polar_end(start, length, angle),
            angle,
            length,
            sample_count: selection.arrows.len(),
        })
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

fn arrow_between(prev: Point2f, cur: Point2f) -> Arrow {
    let start = Point::new(prev.x as i32, prev.y as i32);
    let end = Point::new(cur.x as i32, cur.y as i32);
    let dx = (start.x - end.x) as f64;
    let dy = (start.y - end.y) as f64;
    Arrow {
        start,
        end,
        angle: dy.atan2(dx),
        length: dx.hypot(dy),
    }
}

/// Arithmetic mean of the arrow angles; `None` for an empty slice
pub fn mean_angle(arrows: &[Arrow]) -> Option<f64> {
    if arrows.is_empty() {
        return None;
    }
    let sum: f64 = arrows.iter().map(|a| a.angle).sum();
    Some(sum / arrows.len() as f64)
}

/// `start - length * (cos, sin)`, rounded to the nearest pixel
pub fn polar_end(start: Point, length: f64, angle: f64) -> Point {
    Point::new(
        (start.x as f64 - length * angle.cos()).round() as i32,
        (start.y as f64 - length * angle.sin()).round() as i32,
    )
}
