// THEORY:
// The `FrameWindow` is the temporal memory of the engine: the last N grayscale
// frames, oldest first. Everything the background estimator and the motion
// scorers know about the scene comes from here.
//
// Key principles:
// 1.  **FIFO with a hard cap**: pushing into a full window evicts exactly the
//     oldest frame first, so the length never exceeds N. Below N the window is
//     "warming up" and callers must not score it.
// 2.  **Owned frames**: frames are moved in. Nothing outside the window can
//     mutate a buffered frame.
// 3.  **Fixed geometry**: the first frame pushed fixes the session's width and
//     height. A frame of any other size, or one without pixels, is rejected
//     before anything is evicted, so a bad frame never leaves the window
//     half-updated.
// 4.  **Running moments**: alongside the frames the window keeps, per pixel, the
//     integer sum and sum of squares of the buffered samples. They are updated in
//     O(1) per pixel on every push/evict and let the optimized scorer skip the
//     walk over all N frames. Integer sums are exact, so the mean derived from
//     them is bit-identical to a full recomputation.

use crate::core_modules::frame::Frame;
use crate::error::{MotionError, MotionResult};
use std::collections::VecDeque;

/// Integer running moments of one pixel over the buffered frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelMoments {
    /// Σ x
    pub sum: u32,
    /// Σ x²
    pub sum_sq: u32,
}

impl PixelMoments {
    #[inline]
    fn add(&mut self, sample: u8) {
        let s = sample as u32;
        self.sum += s;
        self.sum_sq += s * s;
    }

    #[inline]
    fn remove(&mut self, sample: u8) {
        let s = sample as u32;
        self.sum -= s;
        self.sum_sq -= s * s;
    }
}

/// Rolling buffer of the most recent grayscale frames.
pub struct FrameWindow {
    capacity: usize,
    frames: VecDeque<Frame>,
    dimensions: Option<(u32, u32)>,
    moments: Vec<PixelMoments>,
}

impl FrameWindow {
    pub fn new(capacity: usize) -> MotionResult<Self> {
        if capacity == 0 {
            return Err(MotionError::invalid_configuration(
                "frame window capacity must be at least 1",
            ));
        }
        Ok(Self {
            capacity,
            frames: VecDeque::with_capacity(capacity + 1),
            dimensions: None,
            moments: Vec::new(),
        })
    }

    /// Appends `frame`, evicting and returning the oldest one when the window is full.
    pub fn push(&mut self, frame: Frame) -> MotionResult<Option<Frame>> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(MotionError::ZeroSizedFrame { width, height });
        }
        match self.dimensions {
            Some((expected_width, expected_height)) => {
                if (width, height) != (expected_width, expected_height) {
                    return Err(MotionError::DimensionMismatch {
                        expected_width,
                        expected_height,
                        actual_width: width,
                        actual_height: height,
                    });
                }
            }
            None => {
                self.dimensions = Some((width, height));
                self.moments = vec![PixelMoments::default(); width as usize * height as usize];
            }
        }

        let evicted = if self.frames.len() == self.capacity {
            self.frames.pop_front()
        } else {
            None
        };

        if let Some(old) = &evicted {
            for (moments, &sample) in self.moments.iter_mut().zip(old.samples()) {
                moments.remove(sample);
            }
        }
        for (moments, &sample) in self.moments.iter_mut().zip(frame.samples()) {
            moments.add(sample);
        }

        self.frames.push_back(frame);
        Ok(evicted)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// True once N frames are buffered; only then may the window be scored.
    pub fn is_full(&self) -> bool {
        self.frames.len() == self.capacity
    }

    /// Session geometry, known after the first push.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    /// Buffered frames, oldest first.
    pub fn frames(&self) -> impl ExactSizeIterator<Item = &Frame> + '_ {
        self.frames.iter()
    }

    pub fn oldest(&self) -> Option<&Frame> {
        self.frames.front()
    }

    pub fn newest(&self) -> Option<&Frame> {
        self.frames.back()
    }

    /// Samples of one pixel across the window, oldest first.
    pub fn samples_at(&self, offset: usize) -> impl Iterator<Item = u8> + '_ {
        self.frames.iter().map(move |frame| frame.samples()[offset])
    }

    /// Row-major running moments, one entry per pixel.
    pub fn moments(&self) -> &[PixelMoments] {
        &self.moments
    }

    /// Session geometry of a full window; the scoring passes start from here.
    pub fn full_dimensions(&self) -> MotionResult<(u32, u32)> {
        match self.dimensions {
            Some(dimensions) if self.is_full() => Ok(dimensions),
            _ => Err(MotionError::WindowNotReady {
                buffered: self.frames.len(),
                capacity: self.capacity,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: u8) -> Frame {
        Frame::filled(4, 3, value)
    }

    fn buffered_values(window: &FrameWindow) -> Vec<u8> {
        window.frames().map(|f| f.sample(0, 0)).collect()
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            FrameWindow::new(0),
            Err(MotionError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn warms_up_before_evicting() {
        let mut window = FrameWindow::new(3).unwrap();
        assert!(window.is_empty());
        assert!(window.push(frame(1)).unwrap().is_none());
        assert!(window.push(frame(2)).unwrap().is_none());
        assert!(!window.is_full());
        assert!(matches!(
            window.full_dimensions(),
            Err(MotionError::WindowNotReady { buffered: 2, capacity: 3 })
        ));
        assert!(window.push(frame(3)).unwrap().is_none());
        assert!(window.is_full());
        assert_eq!(window.full_dimensions().unwrap(), (4, 3));
    }

    #[test]
    fn keeps_the_most_recent_frames_in_push_order() {
        let capacity = 10;
        let mut window = FrameWindow::new(capacity).unwrap();
        for value in 0..capacity as u8 {
            window.push(frame(value)).unwrap();
        }
        for k in 1..=5u8 {
            let newest = capacity as u8 - 1 + k;
            let evicted = window.push(frame(newest)).unwrap().expect("full window evicts");
            assert_eq!(evicted.sample(0, 0), k - 1, "oldest frame goes first");
            assert_eq!(window.len(), capacity);
            let expected: Vec<u8> = (k..=newest).collect();
            assert_eq!(buffered_values(&window), expected);
        }
        assert_eq!(window.oldest().unwrap().sample(0, 0), 5);
        assert_eq!(window.newest().unwrap().sample(0, 0), 14);
    }

    #[test]
    fn mismatched_frame_leaves_the_window_untouched() {
        let mut window = FrameWindow::new(2).unwrap();
        window.push(frame(7)).unwrap();
        window.push(frame(8)).unwrap();
        let before = window.moments().to_vec();

        let err = window.push(Frame::filled(5, 3, 9)).unwrap_err();
        assert!(matches!(
            err,
            MotionError::DimensionMismatch { expected_width: 4, actual_width: 5, .. }
        ));
        assert_eq!(buffered_values(&window), vec![7, 8]);
        assert_eq!(window.moments(), &before[..]);
    }

    #[test]
    fn frames_without_pixels_are_rejected() {
        let mut window = FrameWindow::new(2).unwrap();
        for (width, height) in [(0, 0), (0, 7), (7, 0)] {
            assert!(matches!(
                window.push(Frame::filled(width, height, 0)),
                Err(MotionError::ZeroSizedFrame { .. })
            ));
        }
        assert!(window.is_empty());
        assert_eq!(window.dimensions(), None);

        window.push(frame(1)).unwrap();
        assert!(matches!(
            window.push(Frame::filled(0, 3, 1)),
            Err(MotionError::ZeroSizedFrame { width: 0, height: 3 })
        ));
        assert_eq!(buffered_values(&window), vec![1]);
    }

    #[test]
    fn running_moments_match_a_recount_after_evictions() {
        let mut window = FrameWindow::new(4).unwrap();
        let values = [3u8, 250, 17, 0, 99, 255, 128, 64, 1];
        for (i, &v) in values.iter().enumerate() {
            let samples = (0..12).map(|p| v.wrapping_add(p as u8 * (i as u8 + 1))).collect();
            window.push(Frame::from_raw(4, 3, samples).unwrap()).unwrap();
        }
        for offset in 0..12 {
            let sum: u32 = window.samples_at(offset).map(u32::from).sum();
            let sum_sq: u32 = window.samples_at(offset).map(|s| u32::from(s) * u32::from(s)).sum();
            assert_eq!(window.moments()[offset], PixelMoments { sum, sum_sq });
        }
    }
}
