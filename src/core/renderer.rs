//! Backend-independent renderer contracts.
//!
//! Callers accumulate model-space geometry in a renderer once, then place it
//! any number of times per frame with `render(proj, model_view)` between
//! [`Context::start`] and [`Context::finish`]. Buffered geometry survives
//! across frames until `clear()`.

use crate::core::canvas::{SharedCanvas, Viewport};
use crate::geometry::vec_math::{Mat4f, Vec3f};
use crate::material_system::color::Color;

/// Most ring colors a particle renderer keeps.
pub const MAX_PARTICLE_COLORS: usize = 5;

pub trait LineRenderer {
    fn clear(&mut self);

    fn add_line(&mut self, from: Vec3f, to: Vec3f, color: Color);

    /// Adds one segment per consecutive pair of `points`.
    fn add_polyline(&mut self, points: &[Vec3f], color: Color) {
        for pair in points.windows(2) {
            self.add_line(pair[0], pair[1], color);
        }
    }

    fn render(&self, proj: &Mat4f, model_view: &Mat4f);
}

pub trait TriangleRenderer {
    fn clear(&mut self);

    /// Adds a vertex and returns its index for [`TriangleRenderer::add_triangle`].
    fn add_vertex(&mut self, position: Vec3f, normal: Vec3f, color: Color) -> u32;

    /// Adds a triangle over previously added vertices. Counter-clockwise on
    /// screen is the front face. Panics on an out-of-range index.
    fn add_triangle(&mut self, a: u32, b: u32, c: u32);

    fn render(&self, proj: &Mat4f, model_view: &Mat4f);
}

pub trait ParticleRenderer {
    fn clear(&mut self);

    /// Model-space vectors spanning the camera-facing billboard plane.
    fn set_axes(&mut self, x_axis: Vec3f, y_axis: Vec3f);

    /// Ring colors from the inside out. At most [`MAX_PARTICLE_COLORS`] are
    /// kept; an empty slice resets to a single white ring.
    fn set_colors(&mut self, colors: &[Color]);

    fn add_particle(&mut self, position: Vec3f, size: f32, alpha: u8);

    fn render(&self, proj: &Mat4f, model_view: &Mat4f);
}

/// A rendering backend.
pub trait Context {
    /// Begins recording a frame onto `canvas`.
    fn start(&mut self, viewport: Viewport, canvas: SharedCanvas);

    /// Sorts everything recorded since `start` and draws it.
    fn finish(&mut self);

    fn create_line_renderer(&self) -> Box<dyn LineRenderer>;

    fn create_triangle_renderer(&self) -> Box<dyn TriangleRenderer>;

    fn create_particle_renderer(&self) -> Box<dyn ParticleRenderer>;
}
