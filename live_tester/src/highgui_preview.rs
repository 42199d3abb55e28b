use crate::mat_convert::gray_to_mat;
use image::GrayImage;
use motion_sentry::collaborators::{Preview, DETECTION_WINDOW, INPUT_WINDOW, OPENING_WINDOW};
use opencv::highgui;

/// Milliseconds the key poll waits for the GUI event loop.
const KEY_WAIT_MS: i32 = 5;

/// Fixed screen positions so the three windows never stack on top of each other.
const LAYOUT: [(&str, i32, i32); 3] = [
    (INPUT_WINDOW, 10, 30),
    (DETECTION_WINDOW, 400, 500),
    (OPENING_WINDOW, 10, 500),
];

/// Resizable windows, so a large camera frame can be scaled down by hand.
const WINDOW_FLAGS: i32 = highgui::WINDOW_NORMAL;

pub struct HighguiPreview;

impl HighguiPreview {
    pub fn open() -> opencv::Result<Self> {
        for (name, x, y) in LAYOUT {
            highgui::named_window(name, WINDOW_FLAGS)?;
            highgui::move_window(name, x, y)?;
        }
        Ok(Self)
    }
}

impl Preview for HighguiPreview {
    fn show(&mut self, window: &str, image: &GrayImage) {
        let shown = gray_to_mat(image).and_then(|mat| highgui::imshow(window, &mat));
        if let Err(e) = shown {
            log::warn!("Could not refresh {}: {}", window, e);
        }
    }

    fn quit_requested(&mut self) -> bool {
        match highgui::wait_key(KEY_WAIT_MS) {
            Ok(key) => key == 'q' as i32 || key == 'Q' as i32,
            Err(e) => {
                log::warn!("Key poll failed: {}", e);
                false
            }
        }
    }
}

impl Drop for HighguiPreview {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_all_windows() {
            log::warn!("Could not close preview windows: {}", e);
        }
    }
}
