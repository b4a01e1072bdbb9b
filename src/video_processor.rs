// src/video_processor.rs

use crate::backend::{FrameSource, Raster};
use anyhow::{Context, Result};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst},
};
use tracing::info;

impl Raster for Mat {
    fn dimensions(&self) -> (i32, i32) {
        (self.cols(), self.rows())
    }
}

pub struct VideoSource {
    cap: VideoCapture,
    frames_read: u64,
}

impl VideoSource {
    /// Open a camera when `source` is an integer device index, otherwise
    /// treat it as a file path or stream URL.
    pub fn open(source: &str) -> Result<Self> {
        let cap = match source.trim().parse::<i32>() {
            Ok(index) => {
                info!("Opening camera device {}", index);
                VideoCapture::new(index, videoio::CAP_ANY)
                    .with_context(|| format!("Failed to open camera {}", index))?
            }
            Err(_) => {
                info!("Opening video: {}", source);
                VideoCapture::from_file(source, videoio::CAP_ANY)
                    .with_context(|| format!("Failed to open video {}", source))?
            }
        };

        if !cap.is_opened()? {
            anyhow::bail!("Capture source {} did not open", source);
        }

        let fps = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FPS)?;
        let total_frames = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_COUNT)? as i32;
        let width = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_HEIGHT)? as i32;

        info!(
            "Video properties: {}x{} @ {:.1} FPS, {} frames",
            width, height, fps, total_frames
        );

        Ok(Self {
            cap,
            frames_read: 0,
        })
    }
}

impl FrameSource for VideoSource {
    type Frame = Mat;

    fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut mat = Mat::default();

        if !VideoCaptureTrait::read(&mut self.cap, &mut mat).context("Frame read failed")?
            || mat.empty()
        {
            info!("End of stream after {} frames", self.frames_read);
            return Ok(None);
        }

        self.frames_read += 1;
        Ok(Some(mat))
    }
}
