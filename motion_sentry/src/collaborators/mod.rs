// THEORY:
// The engine only owns the statistics. Everything around it (getting frames,
// making them gray, cleaning the mask, tracing blobs, showing windows) is an
// external collaborator reached through one of the narrow traits below.
//
// This keeps the core testable on synthetic data and lets each front-end plug
// in whatever image library it has: the replay CLI uses `image` + `imageproc`,
// the live camera tester uses OpenCV for the same contracts.
//
// All collaborators are `Send` so a whole session can be moved onto a blocking
// worker thread.

pub mod imageproc_ops;
pub mod preview;
pub mod replay;

use crate::core_modules::frame::{Frame, MotionMask};
use crate::error::MotionResult;
use image::{DynamicImage, GrayImage};

pub use imageproc_ops::{ImageprocContours, ImageprocMorphology};
pub use preview::{NullPreview, PngDumpPreview};
pub use replay::{ImageSequenceSource, InMemorySource, LumaGrayscale};

/// Preview window showing the raw camera frame.
pub const INPUT_WINDOW: &str = "Video Input";
/// Preview window showing the thresholded mask.
pub const DETECTION_WINDOW: &str = "Motion Detection";
/// Preview window showing the mask after morphological opening.
pub const OPENING_WINDOW: &str = "Opening Filter";

/// Blocking producer of frames.
pub trait FrameSource: Send {
    /// Short human-readable name of the device or location.
    fn describe(&self) -> String;

    /// The next grayscale frame, or `None` once the stream is exhausted or a read
    /// comes back empty. Called once per pipeline iteration.
    fn next_frame(&mut self) -> MotionResult<Option<Frame>>;
}

/// Pure color-to-gray conversion.
pub trait Grayscale: Send {
    fn to_grayscale(&self, image: &DynamicImage) -> Frame;
}

/// Morphological opening with a fixed structuring element.
pub trait Morphology: Send {
    /// `iterations` erosions followed by `iterations` dilations. Pixels outside the
    /// image never contribute.
    fn open(
        &self,
        mask: &MotionMask,
        element: &StructuringElement,
        iterations: u32,
    ) -> MotionResult<MotionMask>;
}

/// Outer boundary tracing of foreground regions.
pub trait ContourFinder: Send {
    /// One contour per outermost region, listing every boundary pixel.
    fn find_outer_contours(&self, mask: &MotionMask) -> MotionResult<Vec<Contour>>;
}

/// Fire-and-forget display plus the user's quit key.
pub trait Preview: Send {
    fn show(&mut self, window: &str, image: &GrayImage);

    /// Polled once per iteration after the windows are refreshed.
    fn quit_requested(&mut self) -> bool {
        false
    }
}

/// A pixel coordinate on a contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// An ordered sequence of boundary pixels.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Contour {
    pub points: Vec<Point>,
}

impl Contour {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A binary structuring element with an anchor, as used by the opening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    width: u32,
    height: u32,
    anchor: (u32, u32),
    cells: Vec<bool>,
}

impl StructuringElement {
    /// Filled ellipse inscribed in `width`×`height`, rasterized row by row the way
    /// OpenCV's `MORPH_ELLIPSE` does, anchored at `(width / 2, height / 2)`.
    pub fn ellipse(width: u32, height: u32) -> Self {
        let r = (height / 2) as i64;
        let c = (width / 2) as i64;
        let inverse_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };
        let mut cells = vec![false; width as usize * height as usize];

        for row in 0..height as i64 {
            let dy = row - r;
            if dy.abs() > r {
                continue;
            }
            let dx = (c as f64 * (((r * r - dy * dy) as f64) * inverse_r2).sqrt()).round() as i64;
            let start = (c - dx).max(0);
            let end = (c + dx + 1).min(width as i64);
            for col in start..end {
                cells[row as usize * width as usize + col as usize] = true;
            }
        }

        Self {
            width,
            height,
            anchor: (width / 2, height / 2),
            cells,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn anchor(&self) -> (u32, u32) {
        self.anchor
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.cells[y as usize * self.width as usize + x as usize]
    }

    pub fn active_cells(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// The element as an image, 255 where set.
    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([if self.contains(x, y) { 255 } else { 0 }])
        })
    }
}
