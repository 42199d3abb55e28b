use crate::mat_convert::mat_to_gray;
use motion_sentry::collaborators::FrameSource;
use motion_sentry::{Frame, MotionError, MotionResult};
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};

/// A V4L/DirectShow/AVFoundation camera, converted to gray on every read.
pub struct CameraSource {
    index: i32,
    capture: VideoCapture,
    bgr: Mat,
    gray: Mat,
}

impl CameraSource {
    pub fn open(index: i32) -> MotionResult<Self> {
        let name = format!("camera {index}");
        let capture = VideoCapture::new(index, videoio::CAP_ANY)
            .map_err(|e| MotionError::acquisition_unavailable(&name, e.to_string()))?;
        let opened = capture
            .is_opened()
            .map_err(|e| MotionError::acquisition_unavailable(&name, e.to_string()))?;
        if !opened {
            return Err(MotionError::acquisition_unavailable(name, "device did not open"));
        }
        log::info!("Opened {}", name);
        Ok(Self {
            index,
            capture,
            bgr: Mat::default(),
            gray: Mat::default(),
        })
    }
}

impl FrameSource for CameraSource {
    fn describe(&self) -> String {
        format!("camera {}", self.index)
    }

    fn next_frame(&mut self) -> MotionResult<Option<Frame>> {
        let read = self.capture.read(&mut self.bgr);
        if !frame_grabbed(read, self.bgr.empty()) {
            return Ok(None);
        }

        imgproc::cvt_color(&self.bgr, &mut self.gray, imgproc::COLOR_BGR2GRAY, 0)
            .map_err(|e| MotionError::collaborator("grayscale conversion", e))?;
        let image = mat_to_gray(&self.gray)
            .map_err(|e| MotionError::collaborator("grayscale conversion", e))?;
        if image.is_none() {
            log::warn!("Camera {} delivered a frame in an unexpected layout, stopping", self.index);
        }
        Ok(image.map(Frame::new))
    }
}

/// Whether a capture read left a frame to convert. A failed read ends the
/// stream the same way an empty one does.
fn frame_grabbed(read: opencv::Result<bool>, empty: bool) -> bool {
    match read {
        Ok(grabbed) => grabbed && !empty,
        Err(e) => {
            log::warn!("Camera read failed, stopping: {}", e);
            false
        }
    }
}
