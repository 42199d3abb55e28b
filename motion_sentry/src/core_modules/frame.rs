// THEORY:
// The `frame` module holds the "dumb" data containers every other stage passes
// around. None of them know how to analyze themselves.
//
// - `Frame` is one captured grayscale image. It is immutable once built: the
//   pixel buffer is private and only ever handed out by shared reference, so a
//   frame sitting in the rolling window cannot be edited behind the window's back.
// - `Grid<T>` is a flat, row-major H×W grid of per-pixel values. The background
//   estimate and the motion score are both `Grid<f64>`.
// - `MotionMask` is the binary output of the thresholder (0 or 255 per pixel).
//   It is backed by a `GrayImage` so the morphology, contour and display
//   collaborators can consume it without conversion.
//
// Pixels are addressed by their row-major offset (`y * width + x`) on the hot
// paths; `(x, y)` accessors exist for callers and tests.

use crate::error::{MotionError, MotionResult};
use image::{GrayImage, Luma};

/// Mask value for a moving pixel.
pub const FOREGROUND: u8 = 255;
/// Mask value for a static pixel.
pub const BACKGROUND: u8 = 0;

/// A single 8-bit grayscale frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: GrayImage,
}

impl Frame {
    pub fn new(image: GrayImage) -> Self {
        Self { image }
    }

    /// Builds a frame from row-major samples. Fails when the buffer length does not
    /// match the dimensions.
    pub fn from_raw(width: u32, height: u32, samples: Vec<u8>) -> MotionResult<Self> {
        let expected = width as usize * height as usize;
        let actual = samples.len();
        GrayImage::from_raw(width, height, samples)
            .map(Self::new)
            .ok_or_else(|| {
                MotionError::invalid_configuration(format!(
                    "{width}x{height} frame needs {expected} samples, got {actual}"
                ))
            })
    }

    /// A frame where every pixel has the same intensity.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self::new(GrayImage::from_pixel(width, height, Luma([value])))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Row-major intensity samples.
    pub fn samples(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn sample(&self, x: u32, y: u32) -> u8 {
        self.image.get_pixel(x, y)[0]
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

}

impl From<GrayImage> for Frame {
    fn from(image: GrayImage) -> Self {
        Self::new(image)
    }
}

/// A flat, row-major grid of per-pixel values.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    width: u32,
    height: u32,
    cells: Vec<T>,
}

/// Per-pixel temporal mean of the frame window.
pub type BackgroundEstimate = Grid<f64>;
/// Per-pixel deviation of the frame window around its background.
pub type MotionScore = Grid<f64>;

impl<T: Copy> Grid<T> {
    pub(crate) fn from_cells(width: u32, height: u32, cells: Vec<T>) -> Self {
        debug_assert_eq!(cells.len(), width as usize * height as usize);
        Self { width, height, cells }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> T {
        self.cells[y as usize * self.width as usize + x as usize]
    }

    pub fn at_offset(&self, offset: usize) -> T {
        self.cells[offset]
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Binary foreground/background classification of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionMask {
    image: GrayImage,
}

impl MotionMask {
    /// An all-background mask.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    /// Wraps an image as a mask. Any non-zero pixel is foreground.
    pub fn from_image(image: GrayImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y)[0] != BACKGROUND
    }

    pub fn set(&mut self, x: u32, y: u32, foreground: bool) {
        let value = if foreground { FOREGROUND } else { BACKGROUND };
        self.image.put_pixel(x, y, Luma([value]));
    }

    /// Paints an axis-aligned rectangle of foreground pixels, clipped to the mask.
    pub fn fill_rect(&mut self, left: u32, top: u32, width: u32, height: u32) {
        let right = (left + width).min(self.width());
        let bottom = (top + height).min(self.height());
        for y in top..bottom {
            for x in left..right {
                self.image.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
    }

    pub fn foreground_count(&self) -> usize {
        self.image.as_raw().iter().filter(|&&v| v != BACKGROUND).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }
}
