pub mod config_loader;
pub mod model_loader;
pub mod model_writer;
pub mod render_settings;
pub mod simple_cli;
