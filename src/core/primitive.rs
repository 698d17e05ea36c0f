use crate::core::canvas::Canvas;
use crate::core::renderer::MAX_PARTICLE_COLORS;
use crate::material_system::color::Color;
use nalgebra::Point2;

/// A projected line piece, ready to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenLine {
    pub from: Point2<f32>,
    pub to: Point2<f32>,
    pub color: Color,
    pub depth: f32,
}

/// A projected, shaded triangle piece.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenTriangle {
    pub points: [Point2<f32>; 3],
    pub color: Color,
    pub depth: f32,
}

/// A projected particle disk with its concentric ring colors, innermost
/// first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenParticle {
    pub center: Point2<f32>,
    pub radius: f32,
    pub rings: [Color; MAX_PARTICLE_COLORS],
    pub ring_count: u8,
    pub depth: f32,
}

/// Everything one `render()` call produced, stored by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Instance {
    Lines(Vec<ScreenLine>),
    Triangles(Vec<ScreenTriangle>),
    Particles(Vec<ScreenParticle>),
}

/// Sort handle into the instance arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primitive {
    pub depth: f32,
    pub instance: u16,
    pub local: u32,
}

impl Instance {
    pub fn len(&self) -> usize {
        match self {
            Instance::Lines(v) => v.len(),
            Instance::Triangles(v) => v.len(),
            Instance::Particles(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn depth(&self, local: u32) -> f32 {
        let i = local as usize;
        match self {
            Instance::Lines(v) => v[i].depth,
            Instance::Triangles(v) => v[i].depth,
            Instance::Particles(v) => v[i].depth,
        }
    }

    /// Draws one primitive of this instance.
    pub fn draw(&self, local: u32, canvas: &mut dyn Canvas) {
        let i = local as usize;
        match self {
            Instance::Lines(v) => {
                let line = &v[i];
                let pixel = canvas.quantize(line.color);
                canvas.draw_line(line.from, line.to, pixel);
            }
            Instance::Triangles(v) => {
                let tri = &v[i];
                let pixel = canvas.quantize(tri.color);
                canvas.fill_polygon(&tri.points, pixel);
            }
            Instance::Particles(v) => draw_particle(&v[i], canvas),
        }
    }
}

/// Outer ring first, each inner ring painted over the previous one.
/// Sub-pixel particles collapse to a single pixel in the innermost color.
fn draw_particle(particle: &ScreenParticle, canvas: &mut dyn Canvas) {
    let n = particle.ring_count.max(1) as usize;
    if particle.radius < 1.0 {
        let pixel = canvas.quantize(particle.rings[0]);
        canvas.fill_rect(
            particle.center.x.floor() as i32,
            particle.center.y.floor() as i32,
            1,
            1,
            pixel,
        );
        return;
    }
    for ring in (0..n).rev() {
        let radius = particle.radius * (ring + 1) as f32 / n as f32;
        let pixel = canvas.quantize(particle.rings[ring]);
        canvas.fill_circle(particle.center, radius, pixel);
    }
}
