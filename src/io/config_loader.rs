use crate::io::render_settings::RenderSettings;
use log::warn;
use std::path::Path;
use toml::{Table, Value};

/// TOML configuration reader and writer for [`RenderSettings`].
///
/// Unknown keys are ignored. Known keys holding a value of the wrong type are
/// skipped with a warning and keep their default.
pub struct TomlConfigLoader;

impl TomlConfigLoader {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<RenderSettings, String> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file {}: {}", path.display(), e))?;
        Self::load_from_content(&content)
    }

    pub fn load_from_content(content: &str) -> Result<RenderSettings, String> {
        let toml_value: Value =
            toml::from_str(content).map_err(|e| format!("failed to parse TOML: {}", e))?;
        Self::parse_toml_to_settings(&toml_value)
    }

    pub fn save_to_file<P: AsRef<Path>>(settings: &RenderSettings, path: P) -> Result<(), String> {
        let path = path.as_ref();
        std::fs::write(path, Self::settings_to_toml(settings))
            .map_err(|e| format!("failed to write config file {}: {}", path.display(), e))
    }

    /// Writes the default settings as a commented starting point.
    pub fn create_example_config<P: AsRef<Path>>(path: P) -> Result<(), String> {
        Self::save_to_file(&RenderSettings::default(), path)
            .map_err(|e| format!("failed to create example config: {}", e))
    }

    // ===== TOML -> RenderSettings =====

    fn parse_toml_to_settings(toml: &Value) -> Result<RenderSettings, String> {
        let mut settings = RenderSettings::default();

        if let Some(files) = Self::section(toml, "files") {
            Self::parse_files_section(&mut settings, files);
        }
        if let Some(render) = Self::section(toml, "render") {
            Self::parse_render_section(&mut settings, render);
        }
        if let Some(camera) = Self::section(toml, "camera") {
            Self::parse_camera_section(&mut settings, camera);
        }
        if let Some(object) = Self::section(toml, "object") {
            Self::parse_object_section(&mut settings, object);
        }
        if let Some(lighting) = Self::section(toml, "lighting") {
            Self::parse_lighting_section(&mut settings, lighting);
        }
        if let Some(effects) = Self::section(toml, "effects") {
            Self::parse_effects_section(&mut settings, effects);
        }
        if let Some(grid) = Self::section(toml, "grid") {
            Self::parse_grid_section(&mut settings, grid);
        }
        if let Some(mounts) = Self::section(toml, "mounts") {
            Self::parse_mounts_section(&mut settings, mounts);
        }
        if let Some(particles) = Self::section(toml, "particles") {
            Self::parse_particles_section(&mut settings, particles);
        }

        settings.validate()?;
        Ok(settings)
    }

    fn section<'a>(toml: &'a Value, name: &str) -> Option<&'a Table> {
        let value = toml.get(name)?;
        if value.as_table().is_none() {
            warn!("[{}] is not a table, ignored", name);
        }
        value.as_table()
    }

    // ===== typed getters =====

    fn get_string(table: &Table, key: &str) -> Option<String> {
        let value = table.get(key)?;
        match value.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                warn!("'{}' should be a string, got {}", key, value.type_str());
                None
            }
        }
    }

    fn get_float(table: &Table, key: &str) -> Option<f32> {
        let value = table.get(key)?;
        match value {
            Value::Float(f) => Some(*f as f32),
            Value::Integer(i) => Some(*i as f32),
            _ => {
                warn!("'{}' should be a number, got {}", key, value.type_str());
                None
            }
        }
    }

    /// Non-negative integer that fits `T`.
    fn get_unsigned<T: TryFrom<i64>>(table: &Table, key: &str) -> Option<T> {
        let value = table.get(key)?;
        let parsed = value.as_integer().and_then(|i| T::try_from(i).ok());
        if parsed.is_none() {
            warn!("'{}' should be a non-negative integer in range, got {}", key, value);
        }
        parsed
    }

    fn get_bool(table: &Table, key: &str) -> Option<bool> {
        let value = table.get(key)?;
        let parsed = value.as_bool();
        if parsed.is_none() {
            warn!("'{}' should be a boolean, got {}", key, value.type_str());
        }
        parsed
    }

    // ===== sections =====

    fn parse_files_section(settings: &mut RenderSettings, files: &Table) {
        if let Some(model) = Self::get_string(files, "model") {
            settings.model = Some(model);
        }
        if let Some(output) = Self::get_string(files, "output") {
            settings.output = output;
        }
        if let Some(output_dir) = Self::get_string(files, "output_dir") {
            settings.output_dir = output_dir;
        }
    }

    fn parse_render_section(settings: &mut RenderSettings, render: &Table) {
        if let Some(width) = Self::get_unsigned(render, "width") {
            settings.width = width;
        }
        if let Some(height) = Self::get_unsigned(render, "height") {
            settings.height = height;
        }
        if let Some(background) = Self::get_string(render, "background") {
            settings.background = background;
        }
        if let Some(frames) = Self::get_unsigned(render, "frames") {
            settings.frames = frames;
        }
        if let Some(colorize) = Self::get_bool(render, "colorize") {
            settings.colorize = colorize;
        }
    }

    fn parse_camera_section(settings: &mut RenderSettings, camera: &Table) {
        if let Some(from) = Self::get_string(camera, "from") {
            settings.camera_from = from;
        }
        if let Some(at) = Self::get_string(camera, "at") {
            settings.camera_at = at;
        }
        if let Some(up) = Self::get_string(camera, "up") {
            settings.camera_up = up;
        }
        if let Some(fov) = Self::get_float(camera, "fov") {
            settings.camera_fov = fov;
        }
        if let Some(near) = Self::get_float(camera, "near") {
            settings.camera_near = near;
        }
        if let Some(far) = Self::get_float(camera, "far") {
            settings.camera_far = far;
        }
        if let Some(orbit) = Self::get_float(camera, "orbit") {
            settings.camera_orbit = orbit;
        }
    }

    fn parse_object_section(settings: &mut RenderSettings, object: &Table) {
        if let Some(position) = Self::get_string(object, "position") {
            settings.object_position = position;
        }
        if let Some(rotation) = Self::get_string(object, "rotation") {
            settings.object_rotation = rotation;
        }
        if let Some(scale) = Self::get_float(object, "scale") {
            settings.object_scale = scale;
        }
        if let Some(spin) = Self::get_float(object, "spin") {
            settings.spin = spin;
        }
    }

    fn parse_lighting_section(settings: &mut RenderSettings, lighting: &Table) {
        if let Some(ambient) = Self::get_float(lighting, "ambient") {
            settings.ambient = ambient;
        }
        if let Some(diffuse) = Self::get_float(lighting, "diffuse") {
            settings.diffuse = diffuse;
        }
        if let Some(light_dir) = Self::get_string(lighting, "light_dir") {
            settings.light_dir = light_dir;
        }
    }

    fn parse_effects_section(settings: &mut RenderSettings, effects: &Table) {
        if let Some(grayscale) = Self::get_float(effects, "grayscale") {
            settings.grayscale = grayscale;
        }
        if let Some(tint) = Self::get_string(effects, "grayscale_tint") {
            settings.grayscale_tint = tint;
        }
        if let Some(brightness) = Self::get_float(effects, "brightness") {
            settings.brightness = brightness;
        }
    }

    fn parse_grid_section(settings: &mut RenderSettings, grid: &Table) {
        if let Some(show) = Self::get_bool(grid, "show") {
            settings.show_grid = show;
        }
        if let Some(color) = Self::get_string(grid, "grid_color") {
            settings.grid_color = color;
        }
    }

    fn parse_mounts_section(settings: &mut RenderSettings, mounts: &Table) {
        if let Some(id) = Self::get_unsigned(mounts, "mount_id") {
            settings.mount_id = id;
        }
        if let Some(count) = Self::get_unsigned(mounts, "mount_count") {
            settings.mount_count = count;
        }
        if let Some(size) = Self::get_float(mounts, "mount_size") {
            settings.mount_size = size;
        }
        if let Some(color) = Self::get_string(mounts, "mount_color") {
            settings.mount_color = color;
        }
    }

    fn parse_particles_section(settings: &mut RenderSettings, particles: &Table) {
        if let Some(count) = Self::get_unsigned(particles, "particle_count") {
            settings.particle_count = count;
        }
        if let Some(seed) = Self::get_unsigned(particles, "particle_seed") {
            settings.particle_seed = seed;
        }
        if let Some(size) = Self::get_float(particles, "particle_size") {
            settings.particle_size = size;
        }
        if let Some(alpha) = Self::get_unsigned(particles, "particle_alpha") {
            settings.particle_alpha = alpha;
        }
        if let Some(colors) = Self::get_string(particles, "particle_colors") {
            settings.particle_colors = colors;
        }
    }

    // ===== RenderSettings -> TOML =====

    fn settings_to_toml(settings: &RenderSettings) -> String {
        let mut content = String::new();
        content.push_str("# painter3d configuration\n");
        content.push_str("# Vectors are \"x,y,z\" strings, colors \"r,g,b\" or \"r,g,b,a\" (0-255).\n\n");

        content.push_str("[files]\n");
        match &settings.model {
            Some(model) => content.push_str(&format!("model = {}\n", quoted(model))),
            None => content.push_str("# model = \"path/to/model.bin\"  # built-in demo model when unset\n"),
        }
        content.push_str(&format!("output = {}\n", quoted(&settings.output)));
        content.push_str(&format!("output_dir = {}\n\n", quoted(&settings.output_dir)));

        content.push_str("[render]\n");
        content.push_str(&format!("width = {}\n", settings.width));
        content.push_str(&format!("height = {}\n", settings.height));
        content.push_str(&format!("background = {}\n", quoted(&settings.background)));
        content.push_str(&format!("frames = {}\n", settings.frames));
        content.push_str(&format!("colorize = {}\n\n", settings.colorize));

        content.push_str("[camera]\n");
        content.push_str(&format!("from = {}\n", quoted(&settings.camera_from)));
        content.push_str(&format!("at = {}\n", quoted(&settings.camera_at)));
        content.push_str(&format!("up = {}\n", quoted(&settings.camera_up)));
        content.push_str(&format!("fov = {:?}\n", settings.camera_fov));
        content.push_str(&format!("near = {:?}\n", settings.camera_near));
        content.push_str(&format!("far = {:?}  # <= 0 for an infinite far plane\n", settings.camera_far));
        content.push_str(&format!("orbit = {:?}  # degrees per frame around the target\n\n", settings.camera_orbit));

        content.push_str("[object]\n");
        content.push_str(&format!("position = {}\n", quoted(&settings.object_position)));
        content.push_str(&format!("rotation = {}  # degrees\n", quoted(&settings.object_rotation)));
        content.push_str(&format!("scale = {:?}\n", settings.object_scale));
        content.push_str(&format!("spin = {:?}  # degrees per frame\n\n", settings.spin));

        content.push_str("[lighting]\n");
        content.push_str(&format!("ambient = {:?}\n", settings.ambient));
        content.push_str(&format!("diffuse = {:?}\n", settings.diffuse));
        content.push_str(&format!("light_dir = {}\n\n", quoted(&settings.light_dir)));

        content.push_str("[effects]\n");
        content.push_str(&format!("grayscale = {:?}\n", settings.grayscale));
        content.push_str(&format!("grayscale_tint = {}\n", quoted(&settings.grayscale_tint)));
        content.push_str(&format!("brightness = {:?}\n\n", settings.brightness));

        content.push_str("[grid]\n");
        content.push_str(&format!("show = {}\n", settings.show_grid));
        content.push_str(&format!("grid_color = {}\n\n", quoted(&settings.grid_color)));

        content.push_str("[mounts]\n");
        content.push_str(&format!("mount_id = {}\n", settings.mount_id));
        content.push_str(&format!("mount_count = {}\n", settings.mount_count));
        content.push_str(&format!("mount_size = {:?}\n", settings.mount_size));
        content.push_str(&format!("mount_color = {}\n\n", quoted(&settings.mount_color)));

        content.push_str("[particles]\n");
        content.push_str(&format!("particle_count = {}\n", settings.particle_count));
        content.push_str(&format!("particle_seed = {}\n", settings.particle_seed));
        content.push_str(&format!("particle_size = {:?}\n", settings.particle_size));
        content.push_str(&format!("particle_alpha = {}\n", settings.particle_alpha));
        content.push_str(&format!("particle_colors = {}\n", quoted(&settings.particle_colors)));

        content
    }
}

/// TOML string literal for `s`, escaped as needed.
fn quoted(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_gives_defaults() {
        assert_eq!(
            TomlConfigLoader::load_from_content("").unwrap(),
            RenderSettings::default()
        );
    }

    #[test]
    fn written_config_reads_back() {
        let settings = RenderSettings {
            model: Some("ships/cruiser.bin".to_string()),
            width: 320,
            camera_far: 0.0,
            grayscale: 0.25,
            mount_id: 7,
            particle_seed: 9000,
            ..Default::default()
        };
        let toml = TomlConfigLoader::settings_to_toml(&settings);
        assert_eq!(TomlConfigLoader::load_from_content(&toml).unwrap(), settings);
    }

    #[test]
    fn strings_needing_escapes_read_back() {
        let settings = RenderSettings {
            model: Some(r#"C:\models\"odd" ship.bin"#.to_string()),
            output: "it's".to_string(),
            output_dir: "out\tab".to_string(),
            camera_orbit: 12.5,
            ..Default::default()
        };
        let toml = TomlConfigLoader::settings_to_toml(&settings);
        assert_eq!(TomlConfigLoader::load_from_content(&toml).unwrap(), settings);
    }

    #[test]
    fn wrong_types_and_unknown_keys_are_ignored() {
        let content = r#"
            [render]
            width = "wide"
            height = 240
            mystery = true

            [camera]
            fov = 60

            [mounts]
            mount_id = -3
        "#;
        let settings = TomlConfigLoader::load_from_content(content).unwrap();
        assert_eq!(settings.width, RenderSettings::default().width);
        assert_eq!(settings.height, 240);
        assert_eq!(settings.camera_fov, 60.0);
        assert_eq!(settings.mount_id, RenderSettings::default().mount_id);
    }

    #[test]
    fn malformed_vectors_are_errors() {
        let err = TomlConfigLoader::load_from_content("[camera]\nfrom = \"1,2\"\n").unwrap_err();
        assert!(err.contains("camera.from"));
        assert!(TomlConfigLoader::load_from_content("[render\n").is_err());
    }
}
