pub mod logging;
pub mod render_process;
pub mod save_utils;
pub mod scene_utils;
