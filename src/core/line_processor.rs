use crate::core::canvas::Viewport;
use crate::core::primitive::{Instance, ScreenLine};
use crate::core::projection::{clip_to_ndc, is_finite, outcode};
use crate::core::renderer::LineRenderer;
use crate::core::software_context::SharedFrame;
use crate::geometry::vec_math::{Mat4f, Vec3f};
use crate::material_system::color::Color;
use log::trace;

/// Most halvings a single segment goes through.
pub const MAX_LINE_DEPTH: u8 = 20;
/// NDC x/y extent above which a piece is split again.
pub const LINE_SPLIT_XY: f32 = 0.25;
/// NDC z extent above which a piece is split again.
pub const LINE_SPLIT_Z: f32 = 1.0 / 256.0;

/// Model-space line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub from: Vec3f,
    pub to: Vec3f,
    pub color: Color,
}

/// Projects line segments into depth-keyed screen pieces.
pub struct LineProcessor;

impl LineProcessor {
    /// Splits every segment until each piece is short in NDC, then emits the
    /// visible pieces. Pieces touching `w <= 0` are bisected towards the
    /// visible part; pieces entirely behind the eye are dropped.
    pub fn process(
        segments: &[LineSegment],
        mvp: &Mat4f,
        viewport: &Viewport,
        out: &mut Vec<ScreenLine>,
    ) {
        let mut stack: Vec<(Vec3f, Vec3f, u8)> = Vec::new();

        for segment in segments {
            let color = segment.color.premultiplied();
            stack.push((segment.from, segment.to, 0));

            while let Some((a, b, depth)) = stack.pop() {
                // homogeneous endpoints
                let ca = mvp.transform_homogeneous(&a);
                let cb = mvp.transform_homogeneous(&b);
                if !ca.w.is_finite() || !cb.w.is_finite() {
                    continue;
                }

                // behind the eye: drop, or bisect towards the visible end
                let a_behind = ca.w <= 0.0;
                let b_behind = cb.w <= 0.0;
                if a_behind && b_behind {
                    continue;
                }
                if a_behind || b_behind {
                    if depth < MAX_LINE_DEPTH {
                        Self::split(&mut stack, a, b, depth);
                    }
                    continue;
                }

                // perspective divide
                let na = clip_to_ndc(&ca);
                let nb = clip_to_ndc(&cb);
                if !is_finite(&na) || !is_finite(&nb) {
                    continue;
                }
                // both ends outside the same face of the NDC cube
                if outcode(&na) & outcode(&nb) != 0 {
                    continue;
                }

                // long pieces are split so one depth key fits them
                let extent = (na - nb).abs();
                let too_long =
                    extent.x > LINE_SPLIT_XY || extent.y > LINE_SPLIT_XY || extent.z > LINE_SPLIT_Z;
                if too_long && depth < MAX_LINE_DEPTH {
                    Self::split(&mut stack, a, b, depth);
                    continue;
                }

                out.push(ScreenLine {
                    from: viewport.ndc_to_pixel(&na),
                    to: viewport.ndc_to_pixel(&nb),
                    color,
                    depth: (na.z + nb.z) * 0.5,
                });
            }
        }
    }

    fn split(stack: &mut Vec<(Vec3f, Vec3f, u8)>, a: Vec3f, b: Vec3f, depth: u8) {
        let mid = (a + b) * 0.5;
        stack.push((a, mid, depth + 1));
        stack.push((mid, b, depth + 1));
    }
}

/// Line renderer backed by a [`SoftwareContext`](crate::core::software_context::SoftwareContext).
pub struct SoftwareLineRenderer {
    frame: SharedFrame,
    segments: Vec<LineSegment>,
}

impl SoftwareLineRenderer {
    pub(crate) fn new(frame: SharedFrame) -> Self {
        SoftwareLineRenderer {
            frame,
            segments: Vec::new(),
        }
    }
}

impl LineRenderer for SoftwareLineRenderer {
    fn clear(&mut self) {
        self.segments.clear();
    }

    fn add_line(&mut self, from: Vec3f, to: Vec3f, color: Color) {
        self.segments.push(LineSegment { from, to, color });
    }

    fn render(&self, proj: &Mat4f, model_view: &Mat4f) {
        let mut frame = self.frame.borrow_mut();
        let viewport = frame.viewport();
        let mvp = proj * model_view;

        let mut lines = Vec::new();
        LineProcessor::process(&self.segments, &mvp, &viewport, &mut lines);
        trace!(
            "line instance: {} segments -> {} pieces",
            self.segments.len(),
            lines.len()
        );
        frame.submit(Instance::Lines(lines));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn segment(from: Vec3f, to: Vec3f) -> LineSegment {
        LineSegment {
            from,
            to,
            color: Color::rgba(200, 100, 50, 128),
        }
    }

    fn camera() -> Mat4f {
        Mat4f::perspective(FRAC_PI_2, 1.0, 0.1, 100.0)
    }

    #[test]
    fn short_segment_is_one_piece() {
        let mut out = Vec::new();
        let seg = segment(Vec3f::new(-0.1, 0.0, 0.0), Vec3f::new(0.1, 0.05, 0.0));
        LineProcessor::process(&[seg], &Mat4f::identity(), &Viewport::full(100, 100), &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].color, Color::rgb(100, 50, 25));
        assert_eq!(out[0].depth, 0.0);
    }

    #[test]
    fn long_segment_is_split_into_short_pieces() {
        let mut out = Vec::new();
        let seg = segment(Vec3f::new(-1.0, -1.0, 0.0), Vec3f::new(1.0, 1.0, 0.0));
        LineProcessor::process(&[seg], &Mat4f::identity(), &Viewport::full(100, 100), &mut out);
        // 2.0 NDC in x/y halves three times to 0.25
        assert_eq!(out.len(), 8);
        for piece in &out {
            assert!((piece.to.x - piece.from.x).abs() <= 12.5 + 1e-3);
        }
    }

    #[test]
    fn segment_behind_the_eye_is_dropped() {
        let mut out = Vec::new();
        let seg = segment(Vec3f::new(-1.0, 0.0, 1.0), Vec3f::new(1.0, 0.0, 5.0));
        LineProcessor::process(&[seg], &camera(), &Viewport::full(100, 100), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn segment_crossing_the_eye_plane_keeps_the_front_part() {
        let mut out = Vec::new();
        let mvp = camera();
        let seg = segment(Vec3f::new(0.5, 0.0, 1.0), Vec3f::new(0.5, 0.0, -10.0));
        LineProcessor::process(&[seg], &mvp, &Viewport::full(100, 100), &mut out);
        assert!(!out.is_empty());
        for piece in &out {
            assert!(piece.depth.is_finite());
            assert!(piece.depth >= -1.0 - 1e-3);
        }
    }

    #[test]
    fn off_screen_segment_is_culled() {
        let mut out = Vec::new();
        let seg = segment(Vec3f::new(2.0, -0.5, 0.0), Vec3f::new(3.0, 0.5, 0.0));
        LineProcessor::process(&[seg], &Mat4f::identity(), &Viewport::full(100, 100), &mut out);
        assert!(out.is_empty());
    }
}
