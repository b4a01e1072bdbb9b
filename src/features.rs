// src/features.rs
//
// Corner detection, sub-pixel refinement and pyramidal Lucas-Kanade
// tracking, all delegated to OpenCV.

use crate::backend::FeatureTracker;
use crate::types::{Config, FeatureConfig, FlowConfig, TrackOutput};
use anyhow::{Context, Result};
use opencv::{
    core::{self, Mat, Point2f, Size, TermCriteria, Vector},
    imgproc,
    prelude::*,
    video,
};
use tracing::debug;

pub struct OpenCvFeatureTracker {
    features: FeatureConfig,
    flow: FlowConfig,
    criteria: TermCriteria,
}

impl OpenCvFeatureTracker {
    pub fn new(config: &Config) -> Result<Self> {
        let criteria = TermCriteria::new(
            core::TermCriteria_Type::COUNT as i32 | core::TermCriteria_Type::EPS as i32,
            config.termination.max_iterations,
            config.termination.epsilon,
        )
        .context("Invalid termination criteria")?;

        Ok(Self {
            features: config.features.clone(),
            flow: config.flow.clone(),
            criteria,
        })
    }
}

impl FeatureTracker for OpenCvFeatureTracker {
    type Frame = Mat;
    type Gray = Mat;

    fn to_gray(&mut self, frame: &Mat) -> Result<Mat> {
        let mut gray = Mat::default();
        imgproc::cvt_color(frame, &mut gray, imgproc::COLOR_BGR2GRAY, 0)
            .context("Grayscale conversion failed")?;
        Ok(gray)
    }

    fn duplicate_gray(&mut self, gray: &Mat) -> Result<Mat> {
        gray.try_clone().context("Failed to copy grayscale frame")
    }

    fn detect(&mut self, gray: &Mat) -> Result<Vec<Point2f>> {
        let cfg = &self.features;
        let mut corners = Vector::<Point2f>::new();
        imgproc::good_features_to_track_with_gradient(
            gray,
            &mut corners,
            cfg.max_features,
            cfg.quality_level,
            cfg.min_distance,
            &core::no_array(),
            cfg.block_size,
            cfg.gradient_size,
            cfg.use_harris,
            cfg.harris_k,
        )
        .context("Feature detection failed")?;
        Ok(corners.to_vec())
    }

    fn refine(&mut self, gray: &Mat, points: &mut Vec<Point2f>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let half = self.features.subpix_window;
        let mut corners = Vector::<Point2f>::from_slice(points.as_slice());
        imgproc::corner_sub_pix(
            gray,
            &mut corners,
            Size::new(half, half),
            Size::new(-1, -1),
            self.criteria,
        )
        .context("Sub-pixel refinement failed")?;

        *points = corners.to_vec();
        Ok(())
    }

    fn track(
        &mut self,
        previous: &Mat,
        current: &Mat,
        previous_points: &[Point2f],
        expected: &[Point2f],
    ) -> Result<TrackOutput> {
        let prev_pts = Vector::<Point2f>::from_slice(previous_points);
        let mut next_pts = Vector::<Point2f>::from_slice(expected);
        let mut status = Vector::<u8>::new();
        let mut err = Vector::<f32>::new();

        video::calc_optical_flow_pyr_lk(
            previous,
            current,
            &prev_pts,
            &mut next_pts,
            &mut status,
            &mut err,
            Size::new(self.flow.window_size, self.flow.window_size),
            self.flow.max_pyramid_level,
            self.criteria,
            self.flow.flags,
            self.flow.min_eig_threshold,
        )
        .context("Optical flow tracking failed")?;

        let found: Vec<bool> = status.iter().map(|s| s != 0).collect();
        debug!(
            "LK tracked {}/{} points",
            found.iter().filter(|f| **f).count(),
            found.len()
        );

        Ok(TrackOutput {
            points: next_pts.to_vec(),
            found,
            errors: err.to_vec(),
        })
    }
}
