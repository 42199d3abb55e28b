use image::codecs::png::PngEncoder;
use image::{GrayImage, ImageEncoder};
use std::path::Path;

/// Writes an 8-bit grayscale image as PNG.
pub fn save_luma(path: impl AsRef<Path>, image: &GrayImage) -> Result<(), image::error::ImageError> {
    let output = std::io::BufWriter::new(std::fs::File::create(path)?);
    let encoder = PngEncoder::new(output);

    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::L8,
    )?;

    Ok(())
}

/// File-system safe version of a preview window title: `"Motion Detection"` → `motion_detection`.
pub fn file_stem_for(window: &str) -> String {
    let stem: String = window
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if stem.is_empty() { String::from("window") } else { stem }
}
