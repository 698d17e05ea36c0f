use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::info;
use painter3d::io::config_loader::TomlConfigLoader;
use painter3d::io::model_writer::ModelWriter;
use painter3d::io::simple_cli::SimpleCli;
use painter3d::utils::logging::{LoggingConfig, init_logging};
use painter3d::utils::render_process;
use painter3d::utils::scene_utils::demo_model;
use std::fs::File;
use std::io::BufWriter;
use std::time::Instant;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());
    let cli = SimpleCli::parse();

    if let Some(path) = &cli.write_example_config {
        TomlConfigLoader::create_example_config(path).map_err(|e| anyhow!(e))?;
        info!("wrote example config to {}", path);
        return Ok(());
    }

    if let Some(path) = &cli.export_demo {
        let file = File::create(path).with_context(|| format!("failed to create {}", path))?;
        ModelWriter::write(&demo_model(false), BufWriter::new(file))
            .with_context(|| format!("failed to write demo model to {}", path))?;
        info!("wrote demo model to {}", path);
        return Ok(());
    }

    let settings = cli.settings().map_err(|e| anyhow!(e))?;
    let started = Instant::now();
    let written = render_process::run(&settings)?;
    info!("rendered {} frames in {:?}", written.len(), started.elapsed());
    Ok(())
}
