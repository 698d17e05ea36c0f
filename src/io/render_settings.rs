use crate::geometry::camera::Camera;
use crate::geometry::vec_math::{Mat4f, Vec3f};
use crate::material_system::color::{Color, parse_color};
use crate::material_system::color_transformation::{ColorTransformation, REC601};
use crate::material_system::light::Lighting;
use log::warn;

/// Plain data: every render parameter that can be set from TOML or the CLI.
///
/// Vectors and colors are kept as strings ("x,y,z", "r,g,b[,a]") so they
/// round-trip through the config file unchanged; the getters below parse
/// them on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    // ===== files =====
    /// Model file; `None` renders the built-in demo model.
    pub model: Option<String>,
    /// Base name of the output images.
    pub output: String,
    pub output_dir: String,

    // ===== render =====
    pub width: usize,
    pub height: usize,
    /// Clear color, "r,g,b[,a]".
    pub background: String,
    /// Number of frames to render.
    pub frames: usize,
    /// Replace vertex colors of the demo model with per-face random colors.
    pub colorize: bool,

    // ===== camera =====
    pub camera_from: String,
    pub camera_at: String,
    pub camera_up: String,
    /// Vertical field of view, degrees.
    pub camera_fov: f32,
    pub camera_near: f32,
    /// Far plane; `<= 0` selects an infinite far plane.
    pub camera_far: f32,
    /// Rotation of the eye about the target's Y axis per frame, degrees.
    pub camera_orbit: f32,

    // ===== object =====
    pub object_position: String,
    /// Euler angles in degrees, "x,y,z".
    pub object_rotation: String,
    pub object_scale: f32,
    /// Extra rotation about Y per frame, degrees.
    pub spin: f32,

    // ===== lighting =====
    pub ambient: f32,
    pub diffuse: f32,
    /// Direction towards the light in view space, "x,y,z".
    pub light_dir: String,

    // ===== effects =====
    /// 0 keeps colors, 1 is fully grayscale.
    pub grayscale: f32,
    /// Color the grayscale luminance is mapped onto.
    pub grayscale_tint: String,
    pub brightness: f32,

    // ===== grid =====
    pub show_grid: bool,
    pub grid_color: String,

    // ===== mounts =====
    /// Position-list id the mount markers are placed along.
    pub mount_id: u16,
    pub mount_count: usize,
    pub mount_size: f32,
    pub mount_color: String,

    // ===== particles =====
    pub particle_count: usize,
    pub particle_seed: u64,
    pub particle_size: f32,
    pub particle_alpha: u8,
    /// Ring colors from the inside out, separated by ';'.
    pub particle_colors: String,
}

/// Smallest far/near separation accepted, relative to the far distance.
const DEPTH_RANGE_EPSILON: f32 = 1e-4;

/// Parses comma separated floats.
pub fn parse_vec3(s: &str) -> Result<Vec3f, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("expected 3 comma separated values, got '{}'", s));
    }
    let mut v = Vec3f::zeros();
    for (i, part) in parts.iter().enumerate() {
        v[i] = part
            .trim()
            .parse::<f32>()
            .map_err(|e| format!("invalid number '{}': {}", part, e))?;
    }
    Ok(v)
}

/// Parses a ';'-separated list of colors.
pub fn parse_color_list(s: &str) -> Result<Vec<Color>, String> {
    s.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_color)
        .collect()
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            model: None,
            output: "frame".to_string(),
            output_dir: "output".to_string(),

            width: 800,
            height: 600,
            background: "16,16,24".to_string(),
            frames: 1,
            colorize: false,

            camera_from: "0,1.5,4".to_string(),
            camera_at: "0,0,0".to_string(),
            camera_up: "0,1,0".to_string(),
            camera_fov: 45.0,
            camera_near: 0.1,
            camera_far: 100.0,
            camera_orbit: 0.0,

            object_position: "0,0,0".to_string(),
            object_rotation: "0,30,0".to_string(),
            object_scale: 1.0,
            spin: 10.0,

            ambient: 0.3,
            diffuse: 0.7,
            light_dir: "0.3,0.5,1.0".to_string(),

            grayscale: 0.0,
            grayscale_tint: "255,255,255".to_string(),
            brightness: 1.0,

            show_grid: true,
            grid_color: "90,90,110".to_string(),

            mount_id: 1,
            mount_count: 5,
            mount_size: 0.15,
            mount_color: "255,220,120".to_string(),

            particle_count: 200,
            particle_seed: 42,
            particle_size: 0.05,
            particle_alpha: 200,
            particle_colors: "255,255,255;255,200,80;200,60,20".to_string(),
        }
    }
}

impl RenderSettings {
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn camera(&self) -> Result<Camera, String> {
        let far = (self.camera_far > 0.0).then_some(self.camera_far);
        Ok(Camera::new(
            parse_vec3(&self.camera_from)?,
            parse_vec3(&self.camera_at)?,
            parse_vec3(&self.camera_up)?,
            self.camera_fov,
            self.aspect_ratio(),
            self.camera_near,
            far,
        ))
    }

    /// Camera for `frame`, orbited by `camera_orbit` degrees per frame.
    pub fn camera_for_frame(&self, frame: usize) -> Result<Camera, String> {
        let mut camera = self.camera()?;
        if self.camera_orbit != 0.0 {
            camera.orbit_y(self.camera_orbit * frame as f32);
        }
        Ok(camera)
    }

    /// Object placement for `frame`: scale, then rotate, then move, with the
    /// per-frame spin added to the Y rotation.
    pub fn object_transform(&self, frame: usize) -> Mat4f {
        let position = parse_vec3(&self.object_position).unwrap_or_else(|_| Vec3f::zeros());
        let rotation = parse_vec3(&self.object_rotation).unwrap_or_else(|_| Vec3f::zeros());
        let spin = self.spin * frame as f32;

        let mut m = Mat4f::identity();
        m.translate(&position)
            .rotate_y((rotation.y + spin).to_radians())
            .rotate_x(rotation.x.to_radians())
            .rotate_z(rotation.z.to_radians())
            .scale_uniform(self.object_scale);
        m
    }

    pub fn lighting(&self) -> Lighting {
        let direction = parse_vec3(&self.light_dir).unwrap_or_else(|_| {
            warn!("invalid light direction '{}', using the default", self.light_dir);
            Lighting::default().direction
        });
        Lighting::new(self.ambient, self.diffuse, direction)
    }

    /// Combined color effect: grayscale blend first, then brightness.
    pub fn color_transformation(&self) -> ColorTransformation {
        let tint = parse_color(&self.grayscale_tint).unwrap_or(Color::WHITE);
        let gray = ColorTransformation::to_grayscale(tint, REC601);
        let blended = ColorTransformation::mix(
            &ColorTransformation::identity(),
            &gray,
            self.grayscale.clamp(0.0, 1.0),
        );
        blended * ColorTransformation::brightness(self.brightness)
    }

    pub fn background_color(&self) -> Color {
        parse_color(&self.background).unwrap_or(Color::BLACK)
    }

    /// Grid and mount colors pass through the same effects as the meshes.
    pub fn grid_color(&self) -> Color {
        let color = parse_color(&self.grid_color).unwrap_or(Color::rgb(90, 90, 110));
        self.color_transformation().transform(color)
    }

    pub fn mount_color(&self) -> Color {
        let color = parse_color(&self.mount_color).unwrap_or(Color::WHITE);
        self.color_transformation().transform(color)
    }

    pub fn particle_colors(&self) -> Vec<Color> {
        let effects = self.color_transformation();
        parse_color_list(&self.particle_colors)
            .unwrap_or_else(|_| vec![Color::WHITE])
            .into_iter()
            .map(|c| effects.transform(c))
            .collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("image width and height must be greater than 0".to_string());
        }
        if self.output.trim().is_empty() {
            return Err("output name must not be empty".to_string());
        }
        if self.output_dir.trim().is_empty() {
            return Err("output directory must not be empty".to_string());
        }
        if !(self.camera_fov > 0.0 && self.camera_fov < 180.0) {
            return Err(format!("camera fov {} is outside (0, 180)", self.camera_fov));
        }
        if self.camera_near <= 0.0 {
            return Err("camera near plane must be positive".to_string());
        }
        // nalgebra rejects near/far pairs that are approximately equal
        let depth_range = self.camera_far - self.camera_near;
        if self.camera_far > 0.0 && depth_range <= self.camera_far * DEPTH_RANGE_EPSILON {
            return Err("camera far plane must lie beyond the near plane".to_string());
        }
        if !self.camera_orbit.is_finite() {
            return Err("camera orbit must be a finite angle".to_string());
        }

        for (name, value) in [
            ("camera.from", &self.camera_from),
            ("camera.at", &self.camera_at),
            ("camera.up", &self.camera_up),
            ("object.position", &self.object_position),
            ("object.rotation", &self.object_rotation),
            ("lighting.light_dir", &self.light_dir),
        ] {
            parse_vec3(value).map_err(|e| format!("{}: {}", name, e))?;
        }
        for (name, value) in [
            ("render.background", &self.background),
            ("effects.grayscale_tint", &self.grayscale_tint),
            ("grid.grid_color", &self.grid_color),
            ("mounts.mount_color", &self.mount_color),
        ] {
            parse_color(value).map_err(|e| format!("{}: {}", name, e))?;
        }
        parse_color_list(&self.particle_colors)
            .map_err(|e| format!("particles.particle_colors: {}", e))?;

        Ok(())
    }
}
