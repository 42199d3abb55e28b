//! Headless previews for the replay binary and tests.

use crate::collaborators::Preview;
use crate::core_modules::utils::image_helper::{file_stem_for, save_luma};
use crate::error::MotionResult;
use image::GrayImage;
use std::path::{Path, PathBuf};

/// Discards everything and never asks to quit.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPreview;

impl Preview for NullPreview {
    fn show(&mut self, _window: &str, _image: &GrayImage) {}
}

/// Keeps the latest image of every window on disk as `<window>.png`.
#[derive(Debug)]
pub struct PngDumpPreview {
    directory: PathBuf,
    written: u64,
}

impl PngDumpPreview {
    pub fn create(directory: impl AsRef<Path>) -> MotionResult<Self> {
        let directory = directory.as_ref().to_path_buf();
        std::fs::create_dir_all(&directory)?;
        log::info!("Preview images go to {}", directory.display());
        Ok(Self {
            directory,
            written: 0,
        })
    }

    pub fn path_for(&self, window: &str) -> PathBuf {
        self.directory.join(format!("{}.png", file_stem_for(window)))
    }

    /// Images successfully written so far.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Preview for PngDumpPreview {
    fn show(&mut self, window: &str, image: &GrayImage) {
        let path = self.path_for(window);
        match save_luma(&path, image) {
            Ok(()) => self.written += 1,
            Err(e) => log::warn!("Could not write preview {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::DETECTION_WINDOW;
    use image::Luma;

    #[test]
    fn latest_image_per_window_is_kept() {
        let dir = std::env::temp_dir().join(format!("motion_sentry_preview_{}", std::process::id()));
        let mut preview = PngDumpPreview::create(&dir).unwrap();

        preview.show(DETECTION_WINDOW, &GrayImage::from_pixel(3, 3, Luma([10])));
        preview.show(DETECTION_WINDOW, &GrayImage::from_pixel(3, 3, Luma([200])));
        let path = preview.path_for(DETECTION_WINDOW);
        let stored = image::open(&path).unwrap().to_luma8();
        std::fs::remove_dir_all(&dir).ok();

        assert!(path.ends_with("motion_detection.png"));
        assert_eq!(preview.written(), 2);
        assert_eq!(stored.get_pixel(1, 1)[0], 200);
        assert!(!preview.quit_requested());
    }
}
