//! Pure-Rust opening and contour tracing backed by `imageproc`.

use crate::collaborators::{Contour, ContourFinder, Morphology, Point, StructuringElement};
use crate::core_modules::frame::MotionMask;
use crate::error::{MotionError, MotionResult};
use imageproc::contours::{find_contours, BorderType};
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};

/// Opening via `imageproc`'s grayscale erosion/dilation. On a 0/255 mask these are
/// the binary operators; out-of-image pixels are skipped rather than padded.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageprocMorphology;

impl ImageprocMorphology {
    fn mask_for(element: &StructuringElement) -> MotionResult<Mask> {
        let (anchor_x, anchor_y) = element.anchor();
        let anchor_x = u8::try_from(anchor_x)
            .map_err(|_| MotionError::collaborator("morphological opening", "anchor does not fit in a byte"))?;
        let anchor_y = u8::try_from(anchor_y)
            .map_err(|_| MotionError::collaborator("morphological opening", "anchor does not fit in a byte"))?;
        Ok(Mask::from_image(&element.to_image(), anchor_x, anchor_y))
    }
}

impl Morphology for ImageprocMorphology {
    fn open(
        &self,
        mask: &MotionMask,
        element: &StructuringElement,
        iterations: u32,
    ) -> MotionResult<MotionMask> {
        let kernel = Self::mask_for(element)?;
        let mut image = mask.as_image().clone();
        for _ in 0..iterations {
            image = grayscale_erode(&image, &kernel);
        }
        for _ in 0..iterations {
            image = grayscale_dilate(&image, &kernel);
        }
        Ok(MotionMask::from_image(image))
    }
}

/// Suzuki-Abe border following, outermost borders only.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageprocContours;

impl ContourFinder for ImageprocContours {
    fn find_outer_contours(&self, mask: &MotionMask) -> MotionResult<Vec<Contour>> {
        let contours = find_contours::<u32>(mask.as_image())
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| Contour {
                points: c.points.into_iter().map(|p| Point { x: p.x, y: p.y }).collect(),
            })
            .collect();
        Ok(contours)
    }
}
