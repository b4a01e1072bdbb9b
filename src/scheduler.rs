// src/scheduler.rs

use crate::types::ReinitConfig;

/// What the frame loop should do on this iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Clear both point sets; no frame is read
    Reset,
    Track,
}

/// Forces fresh feature detection every `frames_between_reinit` iterations.
///
/// The counter is checked before it is incremented, so iteration 0 is
/// always a reset.
pub struct ReinitScheduler {
    counter: u64,
    interval: u64,
}

impl ReinitScheduler {
    pub fn new(config: &ReinitConfig) -> Self {
        Self {
            counter: 0,
            interval: config.frames_between_reinit.max(1),
        }
    }

    pub fn tick(&mut self) -> Phase {
        let phase = if self.counter % self.interval == 0 {
            Phase::Reset
        } else {
            Phase::Track
        };
        self.counter += 1;
        phase
    }

    /// Iterations started so far
    pub fn counter(&self) -> u64 {
        self.counter
    }
}
