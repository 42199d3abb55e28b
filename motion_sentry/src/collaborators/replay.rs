// THEORY:
// Replay sources feed the pipeline from something other than a live camera:
// - `ImageSequenceSource` walks a directory of still images in file-name order,
//   one image per frame. It is what the `motion_sentry` binary runs on, and it
//   makes a recorded scene reproducible bit for bit.
// - `InMemorySource` hands out pre-built frames and is what the tests drive.
//
// Both behave like a camera at the edges: a source that cannot be opened at all is
// `AcquisitionUnavailable`, and running out of frames (or hitting an unreadable
// one mid-stream) is an empty read, i.e. `Ok(None)`.

use crate::collaborators::{FrameSource, Grayscale};
use crate::core_modules::frame::Frame;
use crate::error::{MotionError, MotionResult};
use image::{DynamicImage, ImageFormat};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Rec. 601 luma via `image`'s own conversion.
#[derive(Debug, Default, Clone, Copy)]
pub struct LumaGrayscale;

impl Grayscale for LumaGrayscale {
    fn to_grayscale(&self, image: &DynamicImage) -> Frame {
        Frame::new(image.to_luma8())
    }
}

/// Frames decoded from the image files of one directory, sorted by file name.
pub struct ImageSequenceSource {
    directory: PathBuf,
    pending: VecDeque<PathBuf>,
    grayscale: Box<dyn Grayscale>,
}

impl ImageSequenceSource {
    pub fn open(directory: impl AsRef<Path>) -> MotionResult<Self> {
        Self::with_grayscale(directory, Box::new(LumaGrayscale))
    }

    pub fn with_grayscale(
        directory: impl AsRef<Path>,
        grayscale: Box<dyn Grayscale>,
    ) -> MotionResult<Self> {
        let directory = directory.as_ref().to_path_buf();
        let name = directory.display().to_string();

        let entries = std::fs::read_dir(&directory)
            .map_err(|e| MotionError::acquisition_unavailable(&name, e.to_string()))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| MotionError::acquisition_unavailable(&name, e.to_string()))?
                .path();
            if path.is_file() && ImageFormat::from_path(&path).is_ok() {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(MotionError::acquisition_unavailable(
                name,
                "directory contains no readable image files",
            ));
        }
        files.sort();

        log::info!("Replaying {} frames from {}", files.len(), directory.display());
        Ok(Self {
            directory,
            pending: files.into(),
            grayscale,
        })
    }

    /// Frames not yet handed out.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FrameSource for ImageSequenceSource {
    fn describe(&self) -> String {
        self.directory.display().to_string()
    }

    fn next_frame(&mut self) -> MotionResult<Option<Frame>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        match image::open(&path) {
            Ok(image) => Ok(Some(self.grayscale.to_grayscale(&image))),
            Err(e) => {
                log::warn!("Unreadable frame {}: {}", path.display(), e);
                self.pending.clear();
                Ok(None)
            }
        }
    }
}

/// A fixed list of frames, handed out in order.
#[derive(Debug, Default)]
pub struct InMemorySource {
    frames: VecDeque<Frame>,
}

impl InMemorySource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for InMemorySource {
    fn describe(&self) -> String {
        format!("in-memory ({} frames left)", self.frames.len())
    }

    fn next_frame(&mut self) -> MotionResult<Option<Frame>> {
        Ok(self.frames.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::utils::image_helper::save_luma;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("motion_sentry_replay_{}_{}", std::process::id(), name));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn grayscale_of_a_gray_color_is_that_gray() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, Rgb([90, 90, 90])));
        let frame = LumaGrayscale.to_grayscale(&rgb);
        assert_eq!(frame.dimensions(), (3, 2));
        assert!(frame.samples().iter().all(|&s| s == 90));
    }

    #[test]
    fn frames_come_back_in_file_name_order() {
        let dir = scratch_dir("order");
        for (name, value) in [("frame_002.png", 2u8), ("frame_000.png", 0), ("frame_001.png", 1)] {
            save_luma(dir.join(name), &GrayImage::from_pixel(4, 4, Luma([value]))).unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let mut source = ImageSequenceSource::open(&dir).unwrap();
        assert_eq!(source.remaining(), 3);
        let mut seen = Vec::new();
        while let Some(frame) = source.next_frame().unwrap() {
            seen.push(frame.sample(0, 0));
        }
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(seen, vec![0, 1, 2]);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn missing_directory_is_unavailable() {
        let dir = std::env::temp_dir().join("motion_sentry_replay_does_not_exist");
        let err = ImageSequenceSource::open(&dir).err().unwrap();
        assert!(err.is_acquisition_unavailable());
    }

    #[test]
    fn directory_without_images_is_unavailable() {
        let dir = scratch_dir("empty");
        let result = ImageSequenceSource::open(&dir);
        std::fs::remove_dir_all(&dir).ok();
        assert!(result.err().unwrap().is_acquisition_unavailable());
    }

    #[test]
    fn corrupt_frame_ends_the_stream() {
        let dir = scratch_dir("corrupt");
        save_luma(dir.join("a.png"), &GrayImage::new(2, 2)).unwrap();
        std::fs::write(dir.join("b.png"), b"garbage").unwrap();
        save_luma(dir.join("c.png"), &GrayImage::new(2, 2)).unwrap();

        let mut source = ImageSequenceSource::open(&dir).unwrap();
        let first = source.next_frame().unwrap();
        let second = source.next_frame().unwrap();
        let third = source.next_frame().unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert!(first.is_some());
        assert!(second.is_none());
        assert!(third.is_none());
    }

    #[test]
    fn in_memory_source_drains_in_order() {
        let mut source = InMemorySource::new((0..3).map(|v| Frame::filled(1, 1, v)));
        assert_eq!(source.next_frame().unwrap().unwrap().sample(0, 0), 0);
        assert_eq!(source.next_frame().unwrap().unwrap().sample(0, 0), 1);
        assert_eq!(source.next_frame().unwrap().unwrap().sample(0, 0), 2);
        assert!(source.next_frame().unwrap().is_none());
    }
}
