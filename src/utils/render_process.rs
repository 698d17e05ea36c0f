use crate::core::canvas::{SharedCanvas, Viewport};
use crate::core::frame_buffer::FrameBuffer;
use crate::core::renderer::{Context, LineRenderer, ParticleRenderer, TriangleRenderer};
use crate::core::software_context::SoftwareContext;
use crate::geometry::camera::Camera;
use crate::io::model_loader::Model;
use crate::io::render_settings::RenderSettings;
use crate::utils::save_utils::{ensure_output_dir, save_frame};
use crate::utils::scene_utils::{billboard_axes, demo_model, particle_cloud};
use anyhow::{Context as _, Result, anyhow};
use log::{info, warn};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

/// Renderers filled once and replayed every frame.
pub struct SceneRenderers {
    pub meshes: Box<dyn TriangleRenderer>,
    pub grid: Option<Box<dyn LineRenderer>>,
    pub mounts: Box<dyn ParticleRenderer>,
    pub cloud: Box<dyn ParticleRenderer>,
}

impl SceneRenderers {
    pub fn build(context: &SoftwareContext, model: &Model, settings: &RenderSettings) -> Self {
        let mut meshes = context.create_triangle_renderer();
        model.feed_triangles(meshes.as_mut(), &settings.color_transformation());

        let grid = settings.show_grid.then(|| {
            let mut lines = context.create_line_renderer();
            model.feed_lines(lines.as_mut(), settings.grid_color());
            lines
        });

        let mut mounts = context.create_particle_renderer();
        mounts.set_colors(&[settings.mount_color()]);
        let points = model
            .positions()
            .find_points(settings.mount_id, settings.mount_count);
        if points.is_empty() && settings.mount_count > 0 {
            warn!("model has no mount points with id {}", settings.mount_id);
        }
        for point in points {
            mounts.add_particle(point, settings.mount_size, 255);
        }

        let mut cloud = context.create_particle_renderer();
        cloud.set_colors(&settings.particle_colors());
        for p in particle_cloud(
            settings.particle_count,
            settings.particle_seed,
            settings.particle_size,
            settings.particle_alpha,
        ) {
            cloud.add_particle(p.position, p.size, p.alpha);
        }

        SceneRenderers {
            meshes,
            grid,
            mounts,
            cloud,
        }
    }

    /// Submits everything for one frame. Must run between `start` and `finish`.
    pub fn render(&mut self, camera: &Camera, settings: &RenderSettings, index: usize) {
        let proj = camera.projection_matrix();
        let view = camera.view_matrix();
        let object_view = &view * &settings.object_transform(index);

        if let Some(grid) = &self.grid {
            grid.render(&proj, &object_view);
        }
        self.meshes.render(&proj, &object_view);

        let (x_axis, y_axis) = billboard_axes(&object_view);
        self.mounts.set_axes(x_axis, y_axis);
        self.mounts.render(&proj, &object_view);

        let (x_axis, y_axis) = billboard_axes(&view);
        self.cloud.set_axes(x_axis, y_axis);
        self.cloud.render(&proj, &view);
    }
}

/// The configured model file, or the built-in demo when none is set.
pub fn load_model(settings: &RenderSettings) -> Result<Model> {
    match &settings.model {
        Some(path) => {
            let model = Model::from_file(path)
                .with_context(|| format!("failed to load model {}", path))?;
            if model.is_empty() {
                warn!("{} contains no geometry", path);
            }
            Ok(model)
        }
        None => {
            info!("no model configured, using the built-in demo");
            Ok(demo_model(settings.colorize))
        }
    }
}

/// Renders one frame into `frame`.
pub fn render_frame(
    context: &mut SoftwareContext,
    renderers: &mut SceneRenderers,
    camera: &Camera,
    settings: &RenderSettings,
    frame: &Rc<RefCell<FrameBuffer>>,
    index: usize,
) {
    let (width, height) = {
        let mut fb = frame.borrow_mut();
        fb.clear(settings.background_color());
        (fb.width, fb.height)
    };

    let canvas: SharedCanvas = frame.clone();
    context.start(Viewport::full(width, height), canvas);
    renderers.render(camera, settings, index);
    context.finish();
}

/// Full run: load, render every frame and save it. Returns the written paths.
pub fn run(settings: &RenderSettings) -> Result<Vec<PathBuf>> {
    settings.validate().map_err(|e| anyhow!(e)).context("invalid settings")?;
    let model = load_model(settings)?;

    let mut context = SoftwareContext::with_lighting(settings.lighting());
    let mut renderers = SceneRenderers::build(&context, &model, settings);
    let frame = Rc::new(RefCell::new(FrameBuffer::new(settings.width, settings.height)));

    ensure_output_dir(settings).map_err(|e| anyhow!(e))?;

    let mut written = Vec::with_capacity(settings.frames);
    for index in 0..settings.frames {
        let started = Instant::now();
        let camera = settings.camera_for_frame(index).map_err(|e| anyhow!(e))?;
        render_frame(&mut context, &mut renderers, &camera, settings, &frame, index);
        let stats = context.last_stats();
        info!(
            "frame {}: {} primitives in {:?}",
            index,
            stats.primitives,
            started.elapsed()
        );

        let path = save_frame(&frame.borrow(), settings, index)
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("failed to save frame {}", index))?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_settings() -> RenderSettings {
        RenderSettings {
            width: 96,
            height: 64,
            particle_count: 30,
            ..Default::default()
        }
    }

    #[test]
    fn demo_frame_draws_over_the_background() {
        let settings = small_settings();
        let model = load_model(&settings).unwrap();
        let camera = settings.camera().unwrap();
        let mut context = SoftwareContext::with_lighting(settings.lighting());
        let mut renderers = SceneRenderers::build(&context, &model, &settings);
        let frame = Rc::new(RefCell::new(FrameBuffer::new(96, 64)));

        render_frame(&mut context, &mut renderers, &camera, &settings, &frame, 0);

        assert!(context.last_stats().primitives > 0);
        let fb = frame.borrow();
        let center = fb.pixel(48, 32).unwrap();
        assert_ne!(center, settings.background_color());
        assert!(!context.is_recording());
    }

    #[test]
    fn hidden_grid_submits_fewer_instances() {
        let with_grid = small_settings();
        let without_grid = RenderSettings {
            show_grid: false,
            ..small_settings()
        };
        let count = |settings: &RenderSettings| {
            let model = load_model(settings).unwrap();
            let camera = settings.camera().unwrap();
            let mut context = SoftwareContext::new();
            let mut renderers = SceneRenderers::build(&context, &model, settings);
            let frame = Rc::new(RefCell::new(FrameBuffer::new(96, 64)));
            render_frame(&mut context, &mut renderers, &camera, settings, &frame, 0);
            context.last_stats().instances
        };
        assert_eq!(count(&with_grid), 4);
        assert_eq!(count(&without_grid), 3);
    }

    #[test]
    fn missing_model_file_is_reported() {
        let settings = RenderSettings {
            model: Some("/nonexistent/model.bin".to_string()),
            ..small_settings()
        };
        let err = load_model(&settings).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to load model"));
    }
}
