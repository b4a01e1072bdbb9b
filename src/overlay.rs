// src/overlay.rs

use crate::backend::Display;
use crate::types::{AggregateArrow, DisplayConfig};
use anyhow::{Context, Result};
use opencv::{
    core::{self, Mat},
    highgui, imgproc,
};

pub struct HighGuiDisplay {
    config: DisplayConfig,
    color: core::Scalar,
}

impl HighGuiDisplay {
    pub fn new(config: &DisplayConfig) -> Result<Self> {
        highgui::named_window(&config.window_name, highgui::WINDOW_AUTOSIZE)
            .with_context(|| format!("Failed to create window '{}'", config.window_name))?;

        let [b, g, r] = config.arrow_color;
        Ok(Self {
            config: config.clone(),
            color: core::Scalar::new(b, g, r, 0.0),
        })
    }
}

impl Display for HighGuiDisplay {
    type Frame = Mat;

    fn draw_arrow(&mut self, frame: &mut Mat, arrow: &AggregateArrow) -> Result<()> {
        imgproc::arrowed_line(
            frame,
            arrow.start,
            arrow.end,
            self.color,
            self.config.arrow_thickness,
            imgproc::LINE_8,
            0,
            self.config.tip_length,
        )
        .context("Failed to draw aggregate arrow")?;
        Ok(())
    }

    fn show(&mut self, frame: &Mat) -> Result<()> {
        highgui::imshow(&self.config.window_name, frame).context("Failed to present frame")?;
        Ok(())
    }

    fn poll_key(&mut self) -> Result<Option<i32>> {
        let key = highgui::wait_key(self.config.key_poll_ms)?;
        // wait_key reports -1 on timeout
        Ok((key >= 0).then_some(key))
    }
}

impl Drop for HighGuiDisplay {
    fn drop(&mut self) {
        let _ = highgui::destroy_window(&self.config.window_name);
    }
}
