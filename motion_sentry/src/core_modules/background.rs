//! Per-pixel temporal mean of the frame window.
//!
//! Two ways to get the same number: walk the N buffered samples (`bulk`), or read
//! the window's running integer sum (`incremental`). Both add exact integers in
//! `f64` and multiply by the same precomputed `1/N`, so they agree bit for bit.

use crate::core_modules::frame::BackgroundEstimate;
use crate::core_modules::frame_window::FrameWindow;
use crate::core_modules::grid_pass::GridPass;
use crate::error::MotionResult;

/// How the mean of a pixel is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeanSource {
    /// Re-sum every buffered sample.
    Bulk,
    /// Use the window's running sums.
    Incremental,
}

pub struct BackgroundEstimator;

impl BackgroundEstimator {
    /// Mean of one pixel across the window by summing all buffered samples.
    pub fn estimate_pixel(window: &FrameWindow, offset: usize) -> f64 {
        let inverse_n = 1.0 / window.len() as f64;
        Self::bulk_mean(window, offset, inverse_n)
    }

    /// Mean of one pixel from the window's running sum.
    pub fn estimate_pixel_incremental(window: &FrameWindow, offset: usize) -> f64 {
        let inverse_n = 1.0 / window.len() as f64;
        window.moments()[offset].sum as f64 * inverse_n
    }

    /// Full-frame background. Requires a full window.
    pub fn estimate(
        window: &FrameWindow,
        source: MeanSource,
        pass: &GridPass,
    ) -> MotionResult<BackgroundEstimate> {
        let (width, height) = window.full_dimensions()?;
        let inverse_n = 1.0 / window.len() as f64;

        let estimate = match source {
            MeanSource::Bulk => pass.map(width, height, |offset| {
                Self::bulk_mean(window, offset, inverse_n)
            }),
            MeanSource::Incremental => {
                let moments = window.moments();
                pass.map(width, height, |offset| moments[offset].sum as f64 * inverse_n)
            }
        };
        Ok(estimate)
    }

    #[inline]
    fn bulk_mean(window: &FrameWindow, offset: usize, inverse_n: f64) -> f64 {
        let sum: f64 = window.samples_at(offset).map(f64::from).sum();
        sum * inverse_n
    }
}
