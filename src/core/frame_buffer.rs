use crate::core::canvas::Canvas;
use crate::material_system::color::Color;
use image::ColorType;
use nalgebra::Point2;
use std::path::Path;

/// RGBA8 canvas. Every write is opaque: translucency has already been folded
/// into the colors before they get here.
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pixels: Vec<u8>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        FrameBuffer {
            width,
            height,
            pixels: vec![0; width * height * 4],
        }
    }

    pub fn clear(&mut self, color: Color) {
        let bytes = color.to_bytes();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        Some(Color::rgba(
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ))
    }

    /// Row-major RGBA8, top row first.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let path = path.as_ref();
        image::save_buffer(
            path,
            self.as_bytes(),
            self.width as u32,
            self.height as u32,
            ColorType::Rgba8,
        )
        .map_err(|e| format!("failed to save image {}: {}", path.display(), e))
    }

    #[inline]
    fn put(&mut self, x: i32, y: i32, pixel: u32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let i = (y as usize * self.width + x as usize) * 4;
        self.pixels[i..i + 4].copy_from_slice(&pixel.to_be_bytes());
    }

    /// Horizontal span, both ends inclusive, clipped to the buffer.
    fn hline(&mut self, x1: i32, x2: i32, y: i32, pixel: u32) {
        if y < 0 || y >= self.height as i32 {
            return;
        }
        let (x1, x2) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let start = x1.max(0);
        let end = x2.min(self.width as i32 - 1);
        if start > end {
            return;
        }
        let bytes = pixel.to_be_bytes();
        let row = y as usize * self.width;
        for x in start as usize..=end as usize {
            let i = (row + x) * 4;
            self.pixels[i..i + 4].copy_from_slice(&bytes);
        }
    }

    /// Liang-Barsky clip of a segment against the buffer rectangle.
    fn clip_segment(&self, from: Point2<f32>, to: Point2<f32>) -> Option<(Point2<f32>, Point2<f32>)> {
        let (xmin, ymin) = (0.0, 0.0);
        let (xmax, ymax) = (self.width as f32 - 0.5, self.height as f32 - 0.5);
        let d = to - from;
        let mut t0 = 0.0f32;
        let mut t1 = 1.0f32;

        for (p, q) in [
            (-d.x, from.x - xmin),
            (d.x, xmax - from.x),
            (-d.y, from.y - ymin),
            (d.y, ymax - from.y),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
            if t0 > t1 {
                return None;
            }
        }
        Some((from + d * t0, from + d * t1))
    }
}

impl Canvas for FrameBuffer {
    fn quantize(&self, color: Color) -> u32 {
        u32::from_be_bytes(color.to_bytes())
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, pixel: u32) {
        if width <= 0 || height <= 0 {
            return;
        }
        for row in y.max(0)..(y.saturating_add(height)).min(self.height as i32) {
            self.hline(x, x.saturating_add(width - 1), row, pixel);
        }
    }

    /// Bresenham over the clipped segment.
    fn draw_line(&mut self, from: Point2<f32>, to: Point2<f32>, pixel: u32) {
        if !(from.x.is_finite() && from.y.is_finite() && to.x.is_finite() && to.y.is_finite()) {
            return;
        }
        let Some((from, to)) = self.clip_segment(from, to) else {
            return;
        };

        let (x0, y0) = (from.x.floor() as i32, from.y.floor() as i32);
        let (x1, y1) = (to.x.floor() as i32, to.y.floor() as i32);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);

        loop {
            self.put(x, y, pixel);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Even-odd scanline fill sampled at pixel centers.
    fn fill_polygon(&mut self, points: &[Point2<f32>], pixel: u32) {
        if points.len() < 3 || points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return;
        }

        let (min_y, max_y) = points
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
        let min_y = (min_y.floor() as i32).max(0);
        let max_y = (max_y.ceil() as i32).min(self.height as i32 - 1);

        let n = points.len();
        let mut crossings: Vec<f32> = Vec::with_capacity(n);
        for y in min_y..=max_y {
            crossings.clear();
            let yf = y as f32 + 0.5;
            for i in 0..n {
                let a = points[i];
                let b = points[(i + 1) % n];
                if (a.y <= yf && b.y > yf) || (b.y <= yf && a.y > yf) {
                    crossings.push(a.x + (yf - a.y) / (b.y - a.y) * (b.x - a.x));
                }
            }
            crossings.sort_unstable_by(f32::total_cmp);
            for pair in crossings.chunks_exact(2) {
                // pixels whose centers lie inside [left, right)
                let left = (pair[0] - 0.5).ceil() as i32;
                let right = (pair[1] - 0.5).ceil() as i32 - 1;
                if left <= right {
                    self.hline(left, right, y, pixel);
                }
            }
        }
    }

    /// Circle as one horizontal span per row, limited to the rows of the
    /// buffer. Center and radius are clamped so the span math stays in i64.
    fn fill_circle(&mut self, center: Point2<f32>, radius: f32, pixel: u32) {
        if !(center.x.is_finite() && center.y.is_finite() && radius.is_finite()) {
            return;
        }
        const LIMIT: i64 = 1 << 40;
        let cx = (center.x.floor() as i64).clamp(-LIMIT, LIMIT);
        let cy = (center.y.floor() as i64).clamp(-LIMIT, LIMIT);
        let radius = (radius.round() as i64).min(1 << 30);
        if radius < 0 {
            return;
        }

        let clamp = |v: i64| v.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        let r_sq = radius * radius;
        let first = (cy - radius).max(0);
        let last = (cy + radius).min(self.height as i64 - 1);
        for row in first..=last {
            let dy = row - cy;
            let half = ((r_sq - dy * dy) as f64).sqrt().floor() as i64;
            self.hline(clamp(cx - half), clamp(cx + half), row as i32, pixel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(255, 0, 0);

    fn filled(fb: &FrameBuffer) -> usize {
        (0..fb.height)
            .flat_map(|y| (0..fb.width).map(move |x| (x, y)))
            .filter(|&(x, y)| fb.pixel(x, y) == Some(RED))
            .count()
    }

    #[test]
    fn clear_and_rect() {
        let mut fb = FrameBuffer::new(8, 4);
        fb.clear(Color::BLACK);
        assert_eq!(fb.pixel(7, 3), Some(Color::BLACK));
        let red = fb.quantize(RED);
        fb.fill_rect(-2, 1, 4, 2, red);
        assert_eq!(filled(&fb), 4);
        assert_eq!(fb.pixel(1, 2), Some(RED));
        assert_eq!(fb.pixel(2, 2), Some(Color::BLACK));
        assert_eq!(fb.pixel(8, 0), None);
        assert_eq!(&fb.as_bytes()[..4], &[0, 0, 0, 255]);
        assert_eq!(&fb.as_bytes()[(2 * 8 + 1) * 4..][..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn line_covers_both_endpoints() {
        let mut fb = FrameBuffer::new(10, 10);
        let red = fb.quantize(RED);
        fb.draw_line(Point2::new(1.5, 1.5), Point2::new(6.5, 1.5), red);
        assert_eq!(filled(&fb), 6);
        assert_eq!(fb.pixel(1, 1), Some(RED));
        assert_eq!(fb.pixel(6, 1), Some(RED));
    }

    #[test]
    fn far_off_line_is_clipped() {
        let mut fb = FrameBuffer::new(10, 10);
        let red = fb.quantize(RED);
        fb.draw_line(Point2::new(-1.0e4, 5.5), Point2::new(1.0e4, 5.5), red);
        assert_eq!(filled(&fb), 10);
        fb.draw_line(Point2::new(-5.0, -5.0), Point2::new(-1.0, 20.0), red);
        assert_eq!(filled(&fb), 10);
    }

    #[test]
    fn square_polygon_fills_exactly() {
        let mut fb = FrameBuffer::new(10, 10);
        let red = fb.quantize(RED);
        let square = [
            Point2::new(2.0, 2.0),
            Point2::new(6.0, 2.0),
            Point2::new(6.0, 5.0),
            Point2::new(2.0, 5.0),
        ];
        fb.fill_polygon(&square, red);
        assert_eq!(filled(&fb), 12);
        assert_eq!(fb.pixel(2, 2), Some(RED));
        assert_eq!(fb.pixel(6, 2), Some(Color::TRANSPARENT));
    }

    #[test]
    fn circle_is_symmetric() {
        let mut fb = FrameBuffer::new(21, 21);
        let red = fb.quantize(RED);
        fb.fill_circle(Point2::new(10.5, 10.5), 4.0, red);
        assert_eq!(fb.pixel(10, 10), Some(RED));
        assert_eq!(fb.pixel(14, 10), Some(RED));
        assert_eq!(fb.pixel(6, 10), Some(RED));
        assert_eq!(fb.pixel(15, 10), Some(Color::TRANSPARENT));
        assert_eq!(fb.pixel(10, 14), Some(RED));
        assert_eq!(fb.pixel(10, 5), Some(Color::TRANSPARENT));
    }

    #[test]
    fn extreme_circle_centers_do_not_overflow() {
        let mut fb = FrameBuffer::new(8, 8);
        let red = fb.quantize(RED);
        fb.fill_circle(Point2::new(4.0, -1.0e30), 3.0e30, red);
        fb.fill_circle(Point2::new(1.0e30, 1.0e30), 3.0e30, red);
        assert_eq!(filled(&fb), 0);

        // Far center, radius big enough to reach back into the buffer.
        fb.fill_circle(Point2::new(4.0, -1.0e9), 1.0e9 + 100.0, red);
        assert_eq!(filled(&fb), 64);
    }
}
