//! OpenCV implementations of the opening and the outer contour tracing.

use crate::mat_convert::{gray_to_mat, mat_to_gray};
use motion_sentry::collaborators::{Contour, ContourFinder, Morphology, Point, StructuringElement};
use motion_sentry::{MotionError, MotionMask, MotionResult};
use opencv::{
    core::{self, Mat, Vector},
    imgproc,
};

pub struct OpencvMorphology;

impl Morphology for OpencvMorphology {
    fn open(
        &self,
        mask: &MotionMask,
        element: &StructuringElement,
        iterations: u32,
    ) -> MotionResult<MotionMask> {
        let opened = (|| -> opencv::Result<Option<image::GrayImage>> {
            let src = gray_to_mat(mask.as_image())?;
            let kernel = gray_to_mat(&element.to_image())?;
            let (anchor_x, anchor_y) = element.anchor();
            let mut dst = Mat::default();
            imgproc::morphology_ex(
                &src,
                &mut dst,
                imgproc::MORPH_OPEN,
                &kernel,
                core::Point::new(anchor_x as i32, anchor_y as i32),
                iterations as i32,
                core::BORDER_CONSTANT,
                imgproc::morphology_default_border_value()?,
            )?;
            mat_to_gray(&dst)
        })()
        .map_err(|e| MotionError::collaborator("morphological opening", e))?;

        opened
            .map(MotionMask::from_image)
            .ok_or_else(|| MotionError::collaborator("morphological opening", "unexpected matrix layout"))
    }
}

pub struct OpencvContours;

impl ContourFinder for OpencvContours {
    fn find_outer_contours(&self, mask: &MotionMask) -> MotionResult<Vec<Contour>> {
        let traced = (|| -> opencv::Result<Vector<Vector<core::Point>>> {
            let src = gray_to_mat(mask.as_image())?;
            let mut contours = Vector::<Vector<core::Point>>::new();
            imgproc::find_contours(
                &src,
                &mut contours,
                imgproc::RETR_EXTERNAL,
                imgproc::CHAIN_APPROX_NONE,
                core::Point::new(0, 0),
            )?;
            Ok(contours)
        })()
        .map_err(|e| MotionError::collaborator("contour tracing", e))?;

        Ok(traced
            .iter()
            .map(|contour| Contour {
                points: contour
                    .iter()
                    .map(|p| Point {
                        x: p.x as u32,
                        y: p.y as u32,
                    })
                    .collect(),
            })
            .collect())
    }
}
