// THEORY:
// The `BlobFilter` turns a raw motion mask into a single number: how many
// moving objects are in view.
//
// A thresholded mask is noisy. Sensor grain and compression flicker light up
// isolated pixels and thin slivers that are not objects. Two passes clean that up:
// 1.  **Opening**: erode then dilate with an elliptical structuring element.
//     Anything thinner than the element disappears during the erosions and does
//     not come back; real blobs shrink and grow back to roughly their shape.
// 2.  **Size gate**: trace the outer boundary of every remaining region and keep
//     only those whose boundary has at least `min_contour_points` pixels. Holes
//     and regions nested inside another region are never counted separately.
//
// The filter owns no image-processing code of its own. Opening and tracing are
// collaborators (`Morphology`, `ContourFinder`) so the same gate runs on top of
// `imageproc` in the replay binary and on top of OpenCV in the live tester.

use crate::collaborators::{
    ContourFinder, ImageprocContours, ImageprocMorphology, Morphology, StructuringElement,
};
use crate::config::SessionConfig;
use crate::core_modules::frame::MotionMask;
use crate::error::MotionResult;

/// Number of contours whose length reaches `min_points`. The bound is inclusive.
pub fn count_surviving(lengths: &[usize], min_points: usize) -> usize {
    lengths.iter().filter(|&&len| len >= min_points).count()
}

/// Outcome of filtering one mask.
#[derive(Debug, Clone)]
pub struct BlobReport {
    /// The mask after opening.
    pub filtered: MotionMask,
    /// Outer contours of `filtered` that passed the size gate.
    pub component_count: usize,
    /// Point count of every outer contour, passed or not, in tracing order.
    pub contour_lengths: Vec<usize>,
}

pub struct BlobFilter {
    morphology: Box<dyn Morphology>,
    contours: Box<dyn ContourFinder>,
    element: StructuringElement,
    iterations: u32,
    min_contour_points: usize,
}

impl BlobFilter {
    pub fn new(
        config: &SessionConfig,
        morphology: Box<dyn Morphology>,
        contours: Box<dyn ContourFinder>,
    ) -> Self {
        Self {
            morphology,
            contours,
            element: StructuringElement::ellipse(config.kernel_width, config.kernel_height),
            iterations: config.opening_iterations,
            min_contour_points: config.min_contour_points,
        }
    }

    /// A filter backed by the pure-Rust `imageproc` operators.
    pub fn with_imageproc(config: &SessionConfig) -> Self {
        Self::new(
            config,
            Box::new(ImageprocMorphology),
            Box::new(ImageprocContours),
        )
    }

    /// Morphological opening only.
    pub fn open(&self, mask: &MotionMask) -> MotionResult<MotionMask> {
        self.morphology.open(mask, &self.element, self.iterations)
    }

    /// Size-gated outer contour count of `mask`, without opening it first.
    pub fn count_components(&self, mask: &MotionMask) -> MotionResult<(usize, Vec<usize>)> {
        let lengths: Vec<usize> = self
            .contours
            .find_outer_contours(mask)?
            .iter()
            .map(|contour| contour.len())
            .collect();
        Ok((count_surviving(&lengths, self.min_contour_points), lengths))
    }

    /// Opening followed by the size-gated count.
    pub fn filter(&self, mask: &MotionMask) -> MotionResult<BlobReport> {
        let filtered = self.open(mask)?;
        let (component_count, contour_lengths) = self.count_components(&filtered)?;
        log::trace!(
            "{} of {} outer contours reach {} points",
            component_count,
            contour_lengths.len(),
            self.min_contour_points
        );
        Ok(BlobReport {
            filtered,
            component_count,
            contour_lengths,
        })
    }
}
