use crate::core::frame_buffer::FrameBuffer;
use crate::io::render_settings::RenderSettings;
use log::info;
use std::path::PathBuf;

/// `{output_dir}/{output}_{index:03}.png`
pub fn frame_path(settings: &RenderSettings, index: usize) -> PathBuf {
    PathBuf::from(&settings.output_dir).join(format!("{}_{:03}.png", settings.output, index))
}

/// Creates the output directory if needed.
pub fn ensure_output_dir(settings: &RenderSettings) -> Result<(), String> {
    std::fs::create_dir_all(&settings.output_dir)
        .map_err(|e| format!("failed to create output directory {}: {}", settings.output_dir, e))
}

pub fn save_frame(
    frame: &FrameBuffer,
    settings: &RenderSettings,
    index: usize,
) -> Result<PathBuf, String> {
    let path = frame_path(settings, index);
    frame.save_png(&path)?;
    info!("saved {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_names_are_zero_padded() {
        let settings = RenderSettings {
            output: "shot".to_string(),
            output_dir: "renders".to_string(),
            ..Default::default()
        };
        assert_eq!(frame_path(&settings, 7), PathBuf::from("renders/shot_007.png"));
        assert_eq!(frame_path(&settings, 1234), PathBuf::from("renders/shot_1234.png"));
    }
}
