use crate::geometry::vec_math::Vec3f;
use crate::material_system::color::Color;
use nalgebra::Point2;
use std::cell::RefCell;
use std::rc::Rc;

/// Opaque 2-D drawing surface the rasterizer replays its primitives onto.
///
/// Coordinates are pixels with the origin at the top-left. Pixel values are
/// whatever [`Canvas::quantize`] produced for this canvas.
pub trait Canvas {
    /// Maps an RGBA quad to the canvas' native pixel representation.
    fn quantize(&self, color: Color) -> u32;

    fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, pixel: u32);

    fn draw_line(&mut self, from: Point2<f32>, to: Point2<f32>, pixel: u32);

    fn fill_polygon(&mut self, points: &[Point2<f32>], pixel: u32);

    fn fill_circle(&mut self, center: Point2<f32>, radius: f32, pixel: u32);
}

/// Canvas handle shared between the caller and a recording context.
pub type SharedCanvas = Rc<RefCell<dyn Canvas>>;

/// Pixel rectangle NDC is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Viewport {
            x,
            y,
            width,
            height,
        }
    }

    /// Viewport covering a whole `width` x `height` surface.
    pub fn full(width: usize, height: usize) -> Self {
        Viewport::new(0.0, 0.0, width as f32, height as f32)
    }

    /// NDC x/y to pixel coordinates. NDC +1 is the top edge, so Y flips.
    pub fn ndc_to_pixel(&self, ndc: &Vec3f) -> Point2<f32> {
        Point2::new(
            self.x + (ndc.x + 1.0) * 0.5 * self.width,
            self.y + (1.0 - ndc.y) * 0.5 * self.height,
        )
    }

    /// True when a disk of `radius` pixels around `center` touches the
    /// viewport.
    pub fn touches_disk(&self, center: &Point2<f32>, radius: f32) -> bool {
        center.x + radius >= self.x
            && center.x - radius <= self.x + self.width
            && center.y + radius >= self.y
            && center.y - radius <= self.y + self.height
    }
}
