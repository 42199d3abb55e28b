pub mod background;
pub mod blob_filter;
pub mod frame;
pub mod frame_window;
pub mod grid_pass;
pub mod motion_scorer;
pub mod utils;
