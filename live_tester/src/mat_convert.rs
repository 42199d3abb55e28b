//! Copies between `image::GrayImage` and single-channel OpenCV matrices.

use image::GrayImage;
use opencv::{
    core::{self, Mat, Scalar},
    prelude::*,
};

pub fn gray_to_mat(image: &GrayImage) -> opencv::Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        image.height() as i32,
        image.width() as i32,
        core::CV_8UC1,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(image.as_raw());
    Ok(mat)
}

/// `None` when `mat` is not a continuous 8-bit single-channel matrix.
pub fn mat_to_gray(mat: &Mat) -> opencv::Result<Option<GrayImage>> {
    if mat.typ() != core::CV_8UC1 || !mat.is_continuous() {
        return Ok(None);
    }
    let bytes = mat.data_bytes()?.to_vec();
    Ok(GrayImage::from_raw(mat.cols() as u32, mat.rows() as u32, bytes))
}
