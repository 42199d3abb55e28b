//! One detection session: the frame source, the preview, and the interrupt flag.
//!
//! Dropping the session releases the source and the preview. Front-ends build it
//! once, hand it to `PipelineDriver::run`, and drop it when `run` returns.

use crate::collaborators::{FrameSource, Preview};
use crate::core_modules::frame::Frame;
use crate::error::MotionResult;
use image::GrayImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct Session {
    source: Box<dyn FrameSource>,
    preview: Box<dyn Preview>,
    interrupt: Arc<AtomicBool>,
}

impl Session {
    pub fn new(source: Box<dyn FrameSource>, preview: Box<dyn Preview>) -> Self {
        Self::with_interrupt(source, preview, Arc::new(AtomicBool::new(false)))
    }

    /// A session that also stops when `interrupt` is set from another thread.
    pub fn with_interrupt(
        source: Box<dyn FrameSource>,
        preview: Box<dyn Preview>,
        interrupt: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source,
            preview,
            interrupt,
        }
    }

    /// A handle that stops the session when set.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn describe(&self) -> String {
        self.source.describe()
    }

    pub fn next_frame(&mut self) -> MotionResult<Option<Frame>> {
        self.source.next_frame()
    }

    pub fn show(&mut self, window: &str, image: &GrayImage) {
        self.preview.show(window, image);
    }

    /// True once the interrupt flag is set. Does not poll the preview.
    pub fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    /// Polls the preview for a quit key, then checks the interrupt flag.
    pub fn quit_requested(&mut self) -> bool {
        let key = self.preview.quit_requested();
        key || self.interrupted()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        log::info!("Releasing {}", self.source.describe());
    }
}
