// THEORY:
// The `MotionScorer` turns a full frame window into a binary motion mask. It is
// the only stage with a real numeric contract, and the only one worth optimizing.
//
// Pipeline inside one call to `detect`:
// 1.  **Background**: per-pixel temporal mean of the window (a full-frame grid,
//     computed before any score is read).
// 2.  **Score**: per-pixel deviation of the window's samples around that mean.
// 3.  **Threshold**: score >= σ is foreground, anything below is background.
//
// Steps 1 and 2 are delegated to a `ScoringStrategy`, of which there are two:
//
// - `ReferenceScorer`: the textbook population standard deviation. For each of the
//   N samples square `(sample - mean)`, average with a precomputed `1/N`, take the
//   square root. Rows are processed sequentially.
//
// - `OptimizedScorer`: reads the window's integer running moments instead of
//   walking the frames. With `S = Σx` and `Q = Σx²`,
//
//       N² · variance = N·Q - S²
//
//   is an exact integer (it fits easily in a `u64`), so the score is one integer
//   multiply-subtract and one square root per pixel, independent of N. The grid
//   is split into rows on a rayon pool. The result equals the reference score up
//   to `f64` rounding; it never changes which side of σ a pixel lands on except
//   for scores within a few ULPs of σ.

use crate::config::{SessionConfig, Strategy};
use crate::core_modules::background::{BackgroundEstimator, MeanSource};
use crate::core_modules::frame::{BackgroundEstimate, MotionMask, MotionScore, BACKGROUND, FOREGROUND};
use crate::core_modules::frame_window::FrameWindow;
use crate::core_modules::grid_pass::GridPass;
use crate::error::MotionResult;
use image::GrayImage;

/// A per-pixel deviation formula plus the way its grid pass is executed.
pub trait ScoringStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// How this strategy obtains the background mean.
    fn mean_source(&self) -> MeanSource {
        MeanSource::Bulk
    }

    /// How full-frame passes are executed.
    fn grid_pass(&self) -> &GridPass;

    /// Non-negative deviation of the pixel at `offset` around `background`.
    fn score(&self, window: &FrameWindow, offset: usize, background: f64) -> f64;

    /// Full-frame score grid. Requires a full window and its background estimate.
    fn score_grid(
        &self,
        window: &FrameWindow,
        background: &BackgroundEstimate,
    ) -> MotionResult<MotionScore> {
        let (width, height) = window.full_dimensions()?;
        Ok(self.grid_pass().map(width, height, |offset| {
            self.score(window, offset, background.at_offset(offset))
        }))
    }
}

/// Exact floating-point RMS deviation, sequential rows.
pub struct ReferenceScorer {
    pass: GridPass,
}

impl ReferenceScorer {
    pub fn new() -> Self {
        Self {
            pass: GridPass::Sequential,
        }
    }
}

impl Default for ReferenceScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringStrategy for ReferenceScorer {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn grid_pass(&self) -> &GridPass {
        &self.pass
    }

    fn score(&self, window: &FrameWindow, offset: usize, background: f64) -> f64 {
        let inverse_n = 1.0 / window.len() as f64;
        let squared: f64 = window
            .samples_at(offset)
            .map(|sample| {
                let deviation = sample as f64 - background;
                deviation * deviation
            })
            .sum();
        (inverse_n * squared).sqrt()
    }
}

/// Integer-moment deviation, row-parallel.
pub struct OptimizedScorer {
    pass: GridPass,
}

impl OptimizedScorer {
    pub fn new(pass: GridPass) -> Self {
        Self { pass }
    }

    /// Row-parallel scorer on a pool of `threads` workers (`None`: one per CPU).
    pub fn with_threads(threads: Option<usize>) -> MotionResult<Self> {
        Ok(Self::new(GridPass::parallel(threads)?))
    }
}

impl ScoringStrategy for OptimizedScorer {
    fn name(&self) -> &'static str {
        "optimized"
    }

    fn mean_source(&self) -> MeanSource {
        MeanSource::Incremental
    }

    fn grid_pass(&self) -> &GridPass {
        &self.pass
    }

    /// `background` is implied by the running sum and is not read.
    fn score(&self, window: &FrameWindow, offset: usize, _background: f64) -> f64 {
        let n = window.len() as u64;
        let moments = window.moments()[offset];
        let sum = moments.sum as u64;
        // Cauchy-Schwarz guarantees N·Q >= S².
        let scaled_variance = n * moments.sum_sq as u64 - sum * sum;
        (scaled_variance as f64).sqrt() / n as f64
    }
}

/// Flat global cutoff: score >= σ is foreground.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholder {
    sensitivity: f64,
}

impl Thresholder {
    pub fn new(sensitivity: f64) -> Self {
        Self { sensitivity }
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    #[inline]
    pub fn is_foreground(&self, score: f64) -> bool {
        score >= self.sensitivity
    }

    /// A freshly allocated mask; never aliases any frame.
    pub fn apply(&self, score: &MotionScore) -> MotionMask {
        let samples = score
            .cells()
            .iter()
            .map(|&s| if self.is_foreground(s) { FOREGROUND } else { BACKGROUND })
            .collect();
        // Same cell count as the score grid, so `from_raw` cannot fail.
        let image = GrayImage::from_raw(score.width(), score.height(), samples)
            .unwrap_or_else(|| GrayImage::new(score.width(), score.height()));
        MotionMask::from_image(image)
    }
}

/// All per-pixel products of one detection pass.
#[derive(Debug, Clone)]
pub struct MotionDetection {
    pub background: BackgroundEstimate,
    pub score: MotionScore,
    pub mask: MotionMask,
}

/// Background + score + threshold behind a selectable strategy.
pub struct MotionScorer {
    strategy: Box<dyn ScoringStrategy>,
    thresholder: Thresholder,
}

impl MotionScorer {
    pub fn new(config: &SessionConfig) -> MotionResult<Self> {
        let strategy: Box<dyn ScoringStrategy> = match config.strategy {
            Strategy::Reference => Box::new(ReferenceScorer::new()),
            Strategy::Optimized => Box::new(OptimizedScorer::with_threads(config.worker_threads)?),
        };
        Ok(Self::with_strategy(strategy, config.sensitivity))
    }

    pub fn with_strategy(strategy: Box<dyn ScoringStrategy>, sensitivity: f64) -> Self {
        Self {
            strategy,
            thresholder: Thresholder::new(sensitivity),
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn thresholder(&self) -> &Thresholder {
        &self.thresholder
    }

    pub fn estimate_background(&self, window: &FrameWindow) -> MotionResult<BackgroundEstimate> {
        BackgroundEstimator::estimate(window, self.strategy.mean_source(), self.strategy.grid_pass())
    }

    pub fn score_grid(
        &self,
        window: &FrameWindow,
        background: &BackgroundEstimate,
    ) -> MotionResult<MotionScore> {
        self.strategy.score_grid(window, background)
    }

    /// Runs the three stages over a full window.
    pub fn detect(&self, window: &FrameWindow) -> MotionResult<MotionDetection> {
        let background = self.estimate_background(window)?;
        let score = self.score_grid(window, &background)?;
        let mask = self.thresholder.apply(&score);
        Ok(MotionDetection {
            background,
            score,
            mask,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::frame::{Frame, Grid};
    use assert_approx_eq::assert_approx_eq;

    fn window_of(values: &[u8]) -> FrameWindow {
        let mut window = FrameWindow::new(values.len()).unwrap();
        for &v in values {
            window.push(Frame::filled(4, 4, v)).unwrap();
        }
        window
    }

    /// `n - 1` copies of `a` followed by one `b`.
    fn closed_form(a: f64, b: f64, n: usize) -> (f64, f64) {
        let n = n as f64;
        let mean = ((n - 1.0) * a + b) / n;
        let variance = ((n - 1.0) * (a - mean).powi(2) + (b - mean).powi(2)) / n;
        (mean, variance.sqrt())
    }

    fn strategies() -> Vec<Box<dyn ScoringStrategy>> {
        vec![
            Box::new(ReferenceScorer::new()),
            Box::new(OptimizedScorer::with_threads(Some(2)).unwrap()),
        ]
    }

    #[test]
    fn constant_window_scores_zero() {
        let window = window_of(&[137; 10]);
        let scorer = MotionScorer::with_strategy(Box::new(ReferenceScorer::new()), 3.0);
        let detection = scorer.detect(&window).unwrap();
        assert!(detection.background.cells().iter().all(|&b| b == 137.0));
        assert!(detection.score.cells().iter().all(|&s| s == 0.0));
        assert_eq!(detection.mask.foreground_count(), 0);
    }

    #[test]
    fn single_outlier_matches_the_closed_form() {
        for (a, b) in [(0u8, 255u8), (10, 20), (100, 50), (200, 0)] {
            let mut values = vec![a; 9];
            values.push(b);
            let window = window_of(&values);
            let (mean, rms) = closed_form(a as f64, b as f64, 10);

            let background = BackgroundEstimator::estimate_pixel(&window, 5);
            assert_approx_eq!(background, mean, 1e-9);
            assert_approx_eq!(ReferenceScorer::new().score(&window, 5, background), rms, 1e-9);
        }
    }

    #[test]
    fn zero_and_full_scale_gives_the_textbook_numbers() {
        let mut values = vec![0u8; 9];
        values.push(255);
        let window = window_of(&values);
        for strategy in strategies() {
            let scorer = MotionScorer::with_strategy(strategy, 3.0);
            let detection = scorer.detect(&window).unwrap();
            assert_approx_eq!(detection.background.get(1, 2), 25.5, 1e-9);
            assert_approx_eq!(detection.score.get(1, 2), 76.5, 1e-9);
            assert_eq!(detection.mask.foreground_count(), 16);
        }
    }

    #[test]
    fn optimized_tracks_reference_on_noisy_windows() {
        let mut window = FrameWindow::new(10).unwrap();
        for i in 0..25u32 {
            let samples = (0..64).map(|p| ((i * 53 + p * p * 7) % 256) as u8).collect();
            window.push(Frame::from_raw(8, 8, samples).unwrap()).unwrap();
        }
        let reference = MotionScorer::with_strategy(Box::new(ReferenceScorer::new()), 3.0);
        let optimized = MotionScorer::with_strategy(Box::new(OptimizedScorer::with_threads(Some(3)).unwrap()), 3.0);
        let reference = reference.detect(&window).unwrap();
        let optimized = optimized.detect(&window).unwrap();

        assert_eq!(reference.background, optimized.background);
        for (r, o) in reference.score.cells().iter().zip(optimized.score.cells()) {
            assert_approx_eq!(r, o, 1e-9);
        }
    }

    #[test]
    fn strategies_agree_on_which_pixels_move() {
        // Left half static, right half alternates between two levels.
        let mut window = FrameWindow::new(10).unwrap();
        for i in 0..10u32 {
            let samples = (0..64)
                .map(|p| if p % 8 < 4 { 80 } else if i % 2 == 0 { 60 } else { 140 })
                .collect();
            window.push(Frame::from_raw(8, 8, samples).unwrap()).unwrap();
        }
        let masks: Vec<MotionMask> = strategies()
            .into_iter()
            .map(|s| MotionScorer::with_strategy(s, 3.0).detect(&window).unwrap().mask)
            .collect();
        assert_eq!(masks[0], masks[1]);
        assert_eq!(masks[0].foreground_count(), 32);
        assert!(masks[0].is_foreground(7, 0));
        assert!(!masks[0].is_foreground(0, 0));
    }

    #[test]
    fn threshold_is_inclusive() {
        let thresholder = Thresholder::new(3.0);
        assert!(thresholder.is_foreground(3.0));
        assert!(!thresholder.is_foreground(2.999_999));

        let score = Grid::from_cells(3, 1, vec![2.5, 3.0, 7.0]);
        let mask = thresholder.apply(&score);
        assert!(!mask.is_foreground(0, 0));
        assert!(mask.is_foreground(1, 0));
        assert!(mask.is_foreground(2, 0));
    }

    #[test]
    fn a_score_of_exactly_sigma_from_real_frames_is_foreground() {
        // Nine 10s and one 20: mean 11, RMS deviation exactly 3.
        let mut values = vec![10u8; 9];
        values.push(20);
        let window = window_of(&values);
        let optimized = MotionScorer::with_strategy(Box::new(OptimizedScorer::new(GridPass::Sequential)), 3.0);
        let detection = optimized.detect(&window).unwrap();
        assert_eq!(detection.score.get(0, 0), 3.0);
        assert_eq!(detection.mask.foreground_count(), 16);
    }

    #[test]
    fn warming_window_is_not_scored() {
        let mut window = FrameWindow::new(10).unwrap();
        window.push(Frame::filled(4, 4, 0)).unwrap();
        let scorer = MotionScorer::with_strategy(Box::new(ReferenceScorer::new()), 3.0);
        assert!(scorer.detect(&window).is_err());
    }

    #[test]
    fn config_selects_the_strategy() {
        let config = SessionConfig::default().with_strategy(Strategy::Optimized);
        let scorer = MotionScorer::new(&config).unwrap();
        assert_eq!(scorer.strategy_name(), "optimized");
        assert_eq!(scorer.thresholder().sensitivity(), 3.0);
        let scorer = MotionScorer::new(&SessionConfig::default()).unwrap();
        assert_eq!(scorer.strategy_name(), "reference");
    }
}
