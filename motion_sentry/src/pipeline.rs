// THEORY:
// The `pipeline` module is the top-level API of the engine. A `PipelineDriver`
// owns the rolling frame window, the motion scorer and the blob filter, and turns
// a stream of grayscale frames into one moving-object count per frame.
//
// Lifecycle:
// 1.  **Warm-up**: while fewer than N frames are buffered a frame is only pushed.
//     Nothing is scored, nothing is counted.
// 2.  **Steady**: the push that fills the window (and every push after it, each
//     evicting the oldest frame first) runs the full chain:
//     background -> score -> threshold -> opening -> contour count.
// 3.  **Stop**: `run` ends the loop on an empty read from the source, on a quit
//     request (key press or interrupt), or once `max_frames` frames were analyzed.
//     A stop is final; the session is not resumed.
//
// Every stage is timed. The per-frame report printed by `run` is diagnostic
// console output; nothing downstream parses it.

use crate::collaborators::{DETECTION_WINDOW, INPUT_WINDOW, OPENING_WINDOW};
use crate::config::SessionConfig;
use crate::core_modules::blob_filter::{BlobFilter, BlobReport};
use crate::core_modules::frame::{BackgroundEstimate, Frame, MotionMask, MotionScore};
use crate::core_modules::frame_window::FrameWindow;
use crate::core_modules::motion_scorer::MotionScorer;
use crate::error::MotionResult;
use crate::session::Session;
use std::fmt;
use std::time::{Duration, Instant};

/// Where the driver is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    WarmUp { buffered: usize, capacity: usize },
    Steady,
}

/// Wall-clock time spent in each stage of one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    /// Blocking read from the source. Only known to `run`.
    pub acquisition: Duration,
    /// Background estimate, score and threshold.
    pub detection: Duration,
    pub opening: Duration,
    /// Contour tracing and the size gate.
    pub counting: Duration,
}

/// Everything computed for one frame once the window is full.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// Zero-based position of the frame in the stream.
    pub frame_index: u64,
    pub strategy: &'static str,
    pub background: BackgroundEstimate,
    pub score: MotionScore,
    /// Raw thresholded mask, before opening.
    pub mask: MotionMask,
    pub blobs: BlobReport,
    pub timings: StageTimings,
}

impl FrameAnalysis {
    pub fn component_count(&self) -> usize {
        self.blobs.component_count
    }
}

impl fmt::Display for FrameAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.timings;
        writeln!(f, "Frame {}: acquisition exec time : {} us", self.frame_index, t.acquisition.as_micros())?;
        writeln!(f, "Frame {}: {} detection exec time : {} us", self.frame_index, self.strategy, t.detection.as_micros())?;
        writeln!(f, "Frame {}: opening exec time : {} us", self.frame_index, t.opening.as_micros())?;
        writeln!(f, "Frame {}: counting exec time : {} us", self.frame_index, t.counting.as_micros())?;
        write!(f, "Frame {}: moving objects : {}", self.frame_index, self.blobs.component_count)
    }
}

/// Result of feeding one frame to the driver.
#[derive(Debug, Clone)]
pub enum FrameOutcome {
    WarmingUp { buffered: usize, capacity: usize },
    Analyzed(FrameAnalysis),
}

/// Why `run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source returned an empty frame.
    EndOfStream,
    /// The preview or an interrupt asked to stop.
    QuitRequested,
    /// `max_frames` frames were analyzed.
    FrameLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_seen: u64,
    pub frames_analyzed: u64,
    /// Count reported for the last analyzed frame.
    pub last_component_count: Option<usize>,
    pub stop: StopReason,
}

pub struct PipelineDriver {
    config: SessionConfig,
    window: FrameWindow,
    scorer: MotionScorer,
    blob_filter: BlobFilter,
    frames_seen: u64,
    frames_analyzed: u64,
}

impl PipelineDriver {
    /// A driver on the pure-Rust `imageproc` blob filter.
    pub fn new(config: SessionConfig) -> MotionResult<Self> {
        let blob_filter = BlobFilter::with_imageproc(&config);
        Self::with_blob_filter(config, blob_filter)
    }

    /// A driver on a caller-provided blob filter (e.g. OpenCV-backed).
    pub fn with_blob_filter(config: SessionConfig, blob_filter: BlobFilter) -> MotionResult<Self> {
        config.validate()?;
        let window = FrameWindow::new(config.window_size)?;
        let scorer = MotionScorer::new(&config)?;
        log::info!(
            "Pipeline ready: window {} frames, sensitivity {}, {} strategy",
            config.window_size,
            config.sensitivity,
            scorer.strategy_name()
        );
        Ok(Self {
            config,
            window,
            scorer,
            blob_filter,
            frames_seen: 0,
            frames_analyzed: 0,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn window(&self) -> &FrameWindow {
        &self.window
    }

    pub fn state(&self) -> PipelineState {
        if self.window.is_full() {
            PipelineState::Steady
        } else {
            PipelineState::WarmUp {
                buffered: self.window.len(),
                capacity: self.window.capacity(),
            }
        }
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    pub fn frames_analyzed(&self) -> u64 {
        self.frames_analyzed
    }

    /// Pushes `frame` into the window and, once the window is full, analyzes it.
    pub fn process_frame(&mut self, frame: Frame) -> MotionResult<FrameOutcome> {
        self.window.push(frame)?;
        let frame_index = self.frames_seen;
        self.frames_seen += 1;

        if let PipelineState::WarmUp { buffered, capacity } = self.state() {
            log::debug!("Warming up: {}/{} frames buffered", buffered, capacity);
            return Ok(FrameOutcome::WarmingUp { buffered, capacity });
        }

        let mut timings = StageTimings::default();

        let started = Instant::now();
        let detection = self.scorer.detect(&self.window)?;
        timings.detection = started.elapsed();

        let started = Instant::now();
        let filtered = self.blob_filter.open(&detection.mask)?;
        timings.opening = started.elapsed();

        let started = Instant::now();
        let (component_count, contour_lengths) = self.blob_filter.count_components(&filtered)?;
        timings.counting = started.elapsed();

        self.frames_analyzed += 1;
        Ok(FrameOutcome::Analyzed(FrameAnalysis {
            frame_index,
            strategy: self.scorer.strategy_name(),
            background: detection.background,
            score: detection.score,
            mask: detection.mask,
            blobs: BlobReport {
                filtered,
                component_count,
                contour_lengths,
            },
            timings,
        }))
    }

    /// The acquisition loop. Returns once the session stops; the caller drops the
    /// session afterwards to release the device and close the previews.
    pub fn run(&mut self, session: &mut Session) -> MotionResult<RunSummary> {
        log::info!("Reading frames from {}", session.describe());
        let mut last_component_count = None;
        let analyzed_at_start = self.frames_analyzed;
        let seen_at_start = self.frames_seen;

        let stop = loop {
            if session.interrupted() {
                break StopReason::QuitRequested;
            }

            let started = Instant::now();
            let Some(frame) = session.next_frame()? else {
                log::info!("Empty frame, stopping");
                break StopReason::EndOfStream;
            };
            let acquisition = started.elapsed();

            session.show(INPUT_WINDOW, frame.as_image());

            if let FrameOutcome::Analyzed(mut analysis) = self.process_frame(frame)? {
                analysis.timings.acquisition = acquisition;
                println!("{analysis}");
                session.show(DETECTION_WINDOW, analysis.mask.as_image());
                session.show(OPENING_WINDOW, analysis.blobs.filtered.as_image());
                last_component_count = Some(analysis.component_count());
            }

            if session.quit_requested() {
                log::info!("Quit requested, stopping");
                break StopReason::QuitRequested;
            }
            if let Some(limit) = self.config.max_frames {
                if self.frames_analyzed - analyzed_at_start >= limit {
                    log::info!("Analyzed {} frames, stopping", limit);
                    break StopReason::FrameLimit;
                }
            }
        };

        Ok(RunSummary {
            frames_seen: self.frames_seen - seen_at_start,
            frames_analyzed: self.frames_analyzed - analyzed_at_start,
            last_component_count,
            stop,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MotionError;

    fn small_config(window_size: usize) -> SessionConfig {
        SessionConfig {
            window_size,
            ..Default::default()
        }
    }

    #[test]
    fn first_analysis_happens_when_the_window_fills() {
        let mut driver = PipelineDriver::new(small_config(3)).unwrap();
        assert_eq!(driver.state(), PipelineState::WarmUp { buffered: 0, capacity: 3 });

        for expected in 1..3 {
            match driver.process_frame(Frame::filled(8, 8, 0)).unwrap() {
                FrameOutcome::WarmingUp { buffered, capacity } => {
                    assert_eq!((buffered, capacity), (expected, 3));
                }
                FrameOutcome::Analyzed(_) => panic!("scored before the window was full"),
            }
        }

        let outcome = driver.process_frame(Frame::filled(8, 8, 0)).unwrap();
        assert!(matches!(outcome, FrameOutcome::Analyzed(ref a) if a.frame_index == 2));
        assert_eq!(driver.state(), PipelineState::Steady);
        assert_eq!(driver.frames_analyzed(), 1);
    }

    #[test]
    fn every_frame_after_warm_up_is_analyzed() {
        let mut driver = PipelineDriver::new(small_config(2)).unwrap();
        let analyzed = (0..6)
            .filter(|_| {
                matches!(
                    driver.process_frame(Frame::filled(4, 4, 9)).unwrap(),
                    FrameOutcome::Analyzed(_)
                )
            })
            .count();
        assert_eq!(analyzed, 5);
        assert_eq!(driver.window().len(), 2);
    }

    #[test]
    fn invalid_configuration_is_refused() {
        let config = SessionConfig {
            sensitivity: -3.0,
            ..Default::default()
        };
        assert!(matches!(
            PipelineDriver::new(config),
            Err(MotionError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn wrong_size_frame_is_an_error() {
        let mut driver = PipelineDriver::new(small_config(2)).unwrap();
        driver.process_frame(Frame::filled(4, 4, 0)).unwrap();
        assert!(matches!(
            driver.process_frame(Frame::filled(5, 4, 0)),
            Err(MotionError::DimensionMismatch { .. })
        ));
        assert_eq!(driver.frames_seen(), 1);
    }

    #[test]
    fn frame_without_pixels_is_refused() {
        for strategy in [crate::config::Strategy::Reference, crate::config::Strategy::Optimized] {
            let mut driver = PipelineDriver::new(small_config(2).with_strategy(strategy)).unwrap();
            for value in [0, 255] {
                assert!(matches!(
                    driver.process_frame(Frame::filled(0, 0, value)),
                    Err(MotionError::ZeroSizedFrame { .. })
                ));
            }
            assert_eq!(driver.frames_seen(), 0);

            driver.process_frame(Frame::filled(1, 7, 0)).unwrap();
            let outcome = driver.process_frame(Frame::filled(1, 7, 255)).unwrap();
            assert!(matches!(outcome, FrameOutcome::Analyzed(ref a) if a.component_count() == 0));
        }
    }

    #[test]
    fn report_lists_every_stage_and_the_count() {
        let mut driver = PipelineDriver::new(small_config(1)).unwrap();
        let FrameOutcome::Analyzed(analysis) = driver.process_frame(Frame::filled(4, 4, 0)).unwrap() else {
            panic!("a one-frame window is full after one push");
        };
        let report = analysis.to_string();
        assert!(report.contains("reference detection exec time"));
        assert!(report.contains("opening exec time"));
        assert!(report.ends_with("moving objects : 0"));
        assert_eq!(report.lines().count(), 5);
    }
}
