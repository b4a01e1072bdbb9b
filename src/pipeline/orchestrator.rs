// src/pipeline/orchestrator.rs
//
// Drives one iteration at a time:
//
//   Reset  → clear both point sets, read nothing
//   Track  → read → gray → detect → refine
//            → (previous points?) track → arrows → aggregate → draw
//            → show → poll key → swap generations
//
// A frame with no previous point set is only detected and shown; no
// arrow is drawn on it.

use crate::arrows::ArrowBuilder;
use crate::backend::{Display, FeatureTracker, FrameSource, Raster};
use crate::pipeline::metrics::{MetricsSummary, PipelineMetrics};
use crate::pipeline::tracking_state::TrackingState;
use crate::scheduler::{Phase, ReinitScheduler};
use crate::types::{AggregateArrow, Anchor, Config, TrackOutput};
use anyhow::Result;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    Reset,
    Tracked { aggregate: Option<AggregateArrow> },
    EndOfStream,
    Quit,
}

impl StepOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepOutcome::EndOfStream | StepOutcome::Quit)
    }
}

pub struct FlowPipeline<S, T, D>
where
    S: FrameSource,
    T: FeatureTracker<Frame = S::Frame>,
    D: Display<Frame = S::Frame>,
{
    source: S,
    tracker: T,
    display: D,
    scheduler: ReinitScheduler,
    builder: ArrowBuilder,
    state: TrackingState<T::Gray>,
    metrics: PipelineMetrics,
    anchor: Anchor,
    quit_key: i32,
}

impl<S, T, D> FlowPipeline<S, T, D>
where
    S: FrameSource,
    T: FeatureTracker<Frame = S::Frame>,
    D: Display<Frame = S::Frame>,
{
    pub fn new(source: S, tracker: T, display: D, config: &Config) -> Self {
        Self {
            source,
            tracker,
            display,
            scheduler: ReinitScheduler::new(&config.reinit),
            builder: ArrowBuilder::new(config.arrows.clone()),
            state: TrackingState::new(),
            metrics: PipelineMetrics::new(),
            anchor: config.arrows.anchor,
            quit_key: config.display.quit_key,
        }
    }

    /// Loop until end-of-stream or the quit key
    pub fn run(&mut self) -> Result<MetricsSummary> {
        loop {
            if self.step()?.is_terminal() {
                break;
            }
        }
        Ok(self.metrics.summary())
    }

    pub fn step(&mut self) -> Result<StepOutcome> {
        self.metrics.iterations += 1;

        match self.scheduler.tick() {
            Phase::Reset => {
                self.state.clear_points();
                self.metrics.reset_iterations += 1;
                debug!("Iteration {}: reinitialising features", self.scheduler.counter() - 1);
                Ok(StepOutcome::Reset)
            }
            Phase::Track => self.track_frame(),
        }
    }

    fn track_frame(&mut self) -> Result<StepOutcome> {
        let mut frame = match self.source.next_frame()? {
            Some(frame) => frame,
            None => return Ok(StepOutcome::EndOfStream),
        };
        self.metrics.frames_read += 1;

        let gray = self.tracker.to_gray(&frame)?;
        let mut points = self.tracker.detect(&gray)?;
        self.tracker.refine(&gray, &mut points)?;
        self.state.current.points = points;

        let mut aggregate = None;
        if self.state.has_previous_points() {
            self.metrics.tracked_frames += 1;

            let previous_gray = match self.state.previous.gray.take() {
                Some(previous_gray) => previous_gray,
                None => self.tracker.duplicate_gray(&gray)?,
            };
            let output = self.tracker.track(
                &previous_gray,
                &gray,
                &self.state.previous.points,
                &self.state.current.points,
            )?;
            debug!(
                "Frame {}: mean tracking error {:.3}",
                self.metrics.frames_read,
                mean_found_error(&output)
            );
            self.state.current.points = output.points;

            let arrows = self.builder.build_arrows(
                &self.state.previous.points,
                &self.state.current.points,
                &output.found,
            );
            let selection = self.builder.select(arrows);
            if selection.is_short(self.builder.config().top_n_arrows) {
                self.metrics.short_selections += 1;
            }

            let (width, height) = frame.dimensions();
            aggregate = self
                .builder
                .aggregate(&selection, self.anchor.resolve(width, height));

            match &aggregate {
                Some(arrow) => {
                    debug!(
                        "Frame {}: {} accepted, {} averaged, angle {:.3} rad",
                        self.metrics.frames_read, selection.accepted, arrow.sample_count, arrow.angle
                    );
                    self.display.draw_arrow(&mut frame, arrow)?;
                    self.metrics.aggregates_rendered += 1;
                }
                None => {
                    debug!("Frame {}: no arrows survived filtering", self.metrics.frames_read);
                    self.metrics.frames_without_arrows += 1;
                }
            }
        }
        self.state.current.gray = Some(gray);

        self.display.show(&frame)?;
        let quit = matches!(self.display.poll_key()?, Some(key) if key & 0xFF == self.quit_key);

        self.state.advance();

        if quit {
            Ok(StepOutcome::Quit)
        } else {
            Ok(StepOutcome::Tracked { aggregate })
        }
    }
}

fn mean_found_error(output: &TrackOutput) -> f32 {
    let (sum, count) = output
        .errors
        .iter()
        .zip(&output.found)
        .filter(|(_, found)| **found)
        .fold((0.0f32, 0usize), |(sum, count), (err, _)| (sum + err, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Point, Point2f};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Read,
        Gray(u32),
        Duplicate(u32),
        Detect(u32),
        Refine(u32),
        Track { previous: u32, current: u32 },
        Draw,
        Show(u32),
        Poll,
    }

    type Log = Rc<RefCell<Vec<Call>>>;

    #[derive(Debug, Clone)]
    struct FakeFrame {
        id: u32,
    }

    impl Raster for FakeFrame {
        fn dimensions(&self) -> (i32, i32) {
            (1280, 720)
        }
    }

    struct FakeSource {
        remaining: u32,
        next_id: u32,
        log: Log,
    }

    impl FrameSource for FakeSource {
        type Frame = FakeFrame;

        fn next_frame(&mut self) -> Result<Option<FakeFrame>> {
            self.log.borrow_mut().push(Call::Read);
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            self.next_id += 1;
            Ok(Some(FakeFrame { id: self.next_id }))
        }
    }

    /// Every detected point moves `shift` pixels to the right per frame
    struct FakeTracker {
        detections: Vec<Point2f>,
        shift: f32,
        log: Log,
    }

    impl FeatureTracker for FakeTracker {
        type Frame = FakeFrame;
        type Gray = u32;

        fn to_gray(&mut self, frame: &FakeFrame) -> Result<u32> {
            self.log.borrow_mut().push(Call::Gray(frame.id));
            Ok(frame.id)
        }

        fn duplicate_gray(&mut self, gray: &u32) -> Result<u32> {
            self.log.borrow_mut().push(Call::Duplicate(*gray));
            Ok(*gray)
        }

        fn detect(&mut self, gray: &u32) -> Result<Vec<Point2f>> {
            self.log.borrow_mut().push(Call::Detect(*gray));
            Ok(self.detections.clone())
        }

        fn refine(&mut self, gray: &u32, _points: &mut Vec<Point2f>) -> Result<()> {
            self.log.borrow_mut().push(Call::Refine(*gray));
            Ok(())
        }

        fn track(
            &mut self,
            previous: &u32,
            current: &u32,
            previous_points: &[Point2f],
            _expected: &[Point2f],
        ) -> Result<TrackOutput> {
            self.log.borrow_mut().push(Call::Track {
                previous: *previous,
                current: *current,
            });
            Ok(TrackOutput {
                points: previous_points
                    .iter()
                    .map(|p| Point2f::new(p.x + self.shift, p.y))
                    .collect(),
                found: vec![true; previous_points.len()],
                errors: vec![0.0; previous_points.len()],
            })
        }
    }

    struct FakeDisplay {
        keys: VecDeque<i32>,
        drawn: Rc<RefCell<Vec<AggregateArrow>>>,
        log: Log,
    }

    impl Display for FakeDisplay {
        type Frame = FakeFrame;

        fn draw_arrow(&mut self, _frame: &mut FakeFrame, arrow: &AggregateArrow) -> Result<()> {
            self.log.borrow_mut().push(Call::Draw);
            self.drawn.borrow_mut().push(*arrow);
            Ok(())
        }

        fn show(&mut self, frame: &FakeFrame) -> Result<()> {
            self.log.borrow_mut().push(Call::Show(frame.id));
            Ok(())
        }

        fn poll_key(&mut self) -> Result<Option<i32>> {
            self.log.borrow_mut().push(Call::Poll);
            Ok(self.keys.pop_front())
        }
    }

    struct Harness {
        pipeline: FlowPipeline<FakeSource, FakeTracker, FakeDisplay>,
        log: Log,
        drawn: Rc<RefCell<Vec<AggregateArrow>>>,
    }

    fn harness(frames: u32, shift: f32, keys: Vec<i32>, config: &Config) -> Harness {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let drawn = Rc::new(RefCell::new(Vec::new()));
        let source = FakeSource {
            remaining: frames,
            next_id: 0,
            log: log.clone(),
        };
        let tracker = FakeTracker {
            detections: vec![
                Point2f::new(100.0, 100.0),
                Point2f::new(200.0, 150.0),
                Point2f::new(300.0, 400.0),
            ],
            shift,
            log: log.clone(),
        };
        let display = FakeDisplay {
            keys: keys.into(),
            drawn: drawn.clone(),
            log: log.clone(),
        };
        Harness {
            pipeline: FlowPipeline::new(source, tracker, display, config),
            log,
            drawn,
        }
    }

    fn take_log(log: &Log) -> Vec<Call> {
        std::mem::take(&mut *log.borrow_mut())
    }

    #[test]
    fn test_reset_iteration_touches_nothing() {
        let mut h = harness(5, 4.0, vec![], &Config::default());

        assert_eq!(h.pipeline.step().unwrap(), StepOutcome::Reset);
        assert!(take_log(&h.log).is_empty(), "reset must not read, detect or render");
    }

    #[test]
    fn test_first_tracked_frame_detects_without_arrow() {
        let mut h = harness(5, 4.0, vec![], &Config::default());
        h.pipeline.step().unwrap();

        let outcome = h.pipeline.step().unwrap();

        assert_eq!(outcome, StepOutcome::Tracked { aggregate: None });
        assert_eq!(
            take_log(&h.log),
            vec![
                Call::Read,
                Call::Gray(1),
                Call::Detect(1),
                Call::Refine(1),
                Call::Show(1),
                Call::Poll,
            ]
        );
        assert!(h.drawn.borrow().is_empty());
    }

    #[test]
    fn test_second_tracked_frame_matches_against_previous_gray() {
        let mut h = harness(5, 4.0, vec![], &Config::default());
        h.pipeline.step().unwrap();
        h.pipeline.step().unwrap();
        take_log(&h.log);

        let outcome = h.pipeline.step().unwrap();

        assert_eq!(
            take_log(&h.log),
            vec![
                Call::Read,
                Call::Gray(2),
                Call::Detect(2),
                Call::Refine(2),
                Call::Track {
                    previous: 1,
                    current: 2
                },
                Call::Draw,
                Call::Show(2),
                Call::Poll,
            ]
        );

        // Motion to the right → arrow from the frame center pointing right
        let aggregate = match outcome {
            StepOutcome::Tracked {
                aggregate: Some(aggregate),
            } => aggregate,
            other => panic!("expected an aggregate arrow, got {:?}", other),
        };
        assert_eq!(aggregate.start, Point::new(640, 360));
        assert_eq!(aggregate.end, Point::new(790, 360));
        assert_eq!(aggregate.sample_count, 3);
        assert_eq!(h.drawn.borrow().len(), 1);
    }

    #[test]
    fn test_large_jumps_leave_frame_without_arrow() {
        let mut h = harness(5, 40.0, vec![], &Config::default());
        for _ in 0..3 {
            h.pipeline.step().unwrap();
        }

        assert!(h.drawn.borrow().is_empty());
        let summary = h.pipeline.metrics.summary();
        assert_eq!(summary.tracked_frames, 1);
        assert_eq!(summary.frames_without_arrows, 1);
        assert_eq!(summary.aggregates_rendered, 0);
    }

    #[test]
    fn test_reinit_drops_one_iteration_per_interval() {
        let mut config = Config::default();
        config.reinit.frames_between_reinit = 4;
        let mut h = harness(100, 2.0, vec![], &config);

        let outcomes: Vec<StepOutcome> = (0..9).map(|_| h.pipeline.step().unwrap()).collect();
        let resets: Vec<usize> = outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| **o == StepOutcome::Reset)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(resets, vec![0, 4, 8]);

        // After each reset the next frame has no previous points
        assert_eq!(outcomes[5], StepOutcome::Tracked { aggregate: None });
        assert!(matches!(
            outcomes[6],
            StepOutcome::Tracked {
                aggregate: Some(_)
            }
        ));

        let summary = h.pipeline.metrics.summary();
        assert_eq!(summary.iterations, 9);
        assert_eq!(summary.reset_iterations, 3);
        assert_eq!(summary.frames_read, 6);
    }

    #[test]
    fn test_short_selection_is_counted() {
        // Three detections, top five requested
        let mut h = harness(5, 3.0, vec![], &Config::default());
        for _ in 0..3 {
            h.pipeline.step().unwrap();
        }
        assert_eq!(h.pipeline.metrics.summary().short_selections, 1);
    }

    #[test]
    fn test_quit_key_stops_after_presenting_frame() {
        let mut h = harness(10, 2.0, vec![-1, 27 | 0x100000], &Config::default());

        let summary = h.pipeline.run().unwrap();

        assert_eq!(summary.frames_read, 2);
        let log = take_log(&h.log);
        assert_eq!(log.last(), Some(&Call::Poll));
        assert_eq!(log.iter().filter(|c| **c == Call::Read).count(), 2);
    }

    #[test]
    fn test_end_of_stream_terminates_cleanly() {
        let mut h = harness(3, 2.0, vec![], &Config::default());

        let summary = h.pipeline.run().unwrap();

        assert_eq!(summary.frames_read, 3);
        assert_eq!(summary.iterations, 5);
        assert_eq!(summary.aggregates_rendered, 2);
    }

    #[test]
    fn test_missing_previous_gray_is_seeded_from_current() {
        let mut h = harness(5, 2.0, vec![], &Config::default());
        h.pipeline.step().unwrap();
        h.pipeline
            .state
            .previous
            .points
            .push(Point2f::new(10.0, 10.0));
        take_log(&h.log);

        h.pipeline.step().unwrap();

        let log = take_log(&h.log);
        assert!(log.contains(&Call::Duplicate(1)));
        assert!(log.contains(&Call::Track {
            previous: 1,
            current: 1
        }));
    }
}
