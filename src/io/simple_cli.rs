use crate::io::config_loader::TomlConfigLoader;
use crate::io::render_settings::RenderSettings;
use clap::Parser;
use log::info;

/// Command line. Flags given here override the config file.
#[derive(Parser, Debug, Default)]
#[command(name = "painter3d")]
#[command(about = "Painter's-algorithm software renderer for lines, meshes and particles")]
pub struct SimpleCli {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Model file to render instead of the built-in demo
    #[arg(short, long, value_name = "FILE")]
    pub model: Option<String>,

    /// Base name of the output images
    #[arg(short, long, value_name = "NAME")]
    pub output: Option<String>,

    #[arg(long)]
    pub width: Option<usize>,

    #[arg(long)]
    pub height: Option<usize>,

    /// Number of frames to render
    #[arg(long)]
    pub frames: Option<usize>,

    /// Write a config file with all defaults and exit
    #[arg(long, value_name = "FILE")]
    pub write_example_config: Option<String>,

    /// Write the built-in demo model in binary form and exit
    #[arg(long, value_name = "FILE")]
    pub export_demo: Option<String>,
}

impl SimpleCli {
    /// Loads the config file (or defaults) and applies the overrides.
    pub fn settings(&self) -> Result<RenderSettings, String> {
        let mut settings = match &self.config {
            Some(path) => {
                info!("loading config {}", path);
                TomlConfigLoader::load_from_file(path)?
            }
            None => RenderSettings::default(),
        };
        self.apply_overrides(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    fn apply_overrides(&self, settings: &mut RenderSettings) {
        if let Some(model) = &self.model {
            settings.model = Some(model.clone());
        }
        if let Some(output) = &self.output {
            settings.output = output.clone();
        }
        if let Some(width) = self.width {
            settings.width = width;
        }
        if let Some(height) = self.height {
            settings.height = height;
        }
        if let Some(frames) = self.frames {
            settings.frames = frames;
        }
    }
}
