use crate::core::canvas::Viewport;
use crate::core::primitive::{Instance, ScreenTriangle};
use crate::core::projection::{clip_to_ndc, is_finite, outcode};
use crate::core::renderer::TriangleRenderer;
use crate::core::software_context::SharedFrame;
use crate::geometry::vec_math::{Mat4f, Vec3f};
use crate::material_system::color::Color;
use crate::material_system::light::Lighting;
use log::trace;

/// Most subdivision levels a single triangle goes through.
pub const MAX_TRIANGLE_LEVEL: u8 = 3;
/// NDC x/y edge extent above which a triangle is subdivided.
pub const TRIANGLE_SPLIT_EXTENT: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleVertex {
    pub position: Vec3f,
    pub normal: Vec3f,
    pub color: Color,
}

type Piece = (Vec3f, Vec3f, Vec3f, u8);

/// Projects, culls, subdivides and flat-shades triangles.
pub struct TriangleProcessor;

impl TriangleProcessor {
    /// Emits the visible front-facing pieces of `triangles`.
    ///
    /// Shading is computed once per input triangle from its view-space face
    /// normal; every subdivided piece inherits that color. Triangles touching
    /// `w <= 0` are subdivided, and pieces still touching it at the last
    /// level are dropped.
    pub fn process(
        vertices: &[TriangleVertex],
        triangles: &[[u32; 3]],
        proj: &Mat4f,
        model_view: &Mat4f,
        viewport: &Viewport,
        lighting: &Lighting,
        out: &mut Vec<ScreenTriangle>,
    ) {
        // view space, shared by every triangle
        let view: Vec<Vec3f> = vertices
            .iter()
            .map(|v| model_view.transform(&v.position))
            .collect();
        let mut stack: Vec<Piece> = Vec::new();

        for &[ia, ib, ic] in triangles {
            let (ia, ib, ic) = (ia as usize, ib as usize, ic as usize);
            let (a, b, c) = (view[ia], view[ib], view[ic]);
            if !is_finite(&a) || !is_finite(&b) || !is_finite(&c) {
                continue;
            }

            // flat shading from the view-space face normal
            let intensity = match (b - a).cross(&(c - a)).try_normalize(1e-12) {
                Some(normal) => lighting.intensity(&normal),
                None => lighting.ambient.clamp(0.0, 1.0),
            };
            let base = Color::average(&[
                vertices[ia].color,
                vertices[ib].color,
                vertices[ic].color,
            ]);
            let color = base.shade(intensity).premultiplied();

            stack.push((a, b, c, 0));
            while let Some((a, b, c, level)) = stack.pop() {
                let clip = [
                    proj.transform_homogeneous(&a),
                    proj.transform_homogeneous(&b),
                    proj.transform_homogeneous(&c),
                ];
                if clip.iter().any(|h| !h.w.is_finite()) {
                    continue;
                }

                // w <= 0 on every corner: nothing visible
                let behind = clip.iter().filter(|h| h.w <= 0.0).count();
                if behind == 3 {
                    continue;
                }
                // straddles the eye plane: split and retry the children
                if behind > 0 {
                    if level < MAX_TRIANGLE_LEVEL {
                        Self::subdivide(&mut stack, a, b, c, level);
                    }
                    continue;
                }

                let ndc = clip.map(|h| clip_to_ndc(&h));
                if !ndc.iter().all(is_finite) {
                    continue;
                }
                // all corners outside one face
                if outcode(&ndc[0]) & outcode(&ndc[1]) & outcode(&ndc[2]) != 0 {
                    continue;
                }
                // back face
                if Self::signed_area(&ndc) < 0.0 {
                    continue;
                }

                if level < MAX_TRIANGLE_LEVEL && Self::too_large(&ndc) {
                    Self::subdivide(&mut stack, a, b, c, level);
                    continue;
                }

                // depth key is the mean NDC z of the piece
                out.push(ScreenTriangle {
                    points: ndc.map(|p| viewport.ndc_to_pixel(&p)),
                    color,
                    depth: (ndc[0].z + ndc[1].z + ndc[2].z) / 3.0,
                });
            }
        }
    }

    /// Twice the signed NDC area; positive when counter-clockwise with +Y up.
    fn signed_area(ndc: &[Vec3f; 3]) -> f32 {
        let [a, b, c] = ndc;
        (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
    }

    fn too_large(ndc: &[Vec3f; 3]) -> bool {
        (0..3).any(|i| {
            let d = ndc[(i + 1) % 3] - ndc[i];
            d.x.abs() > TRIANGLE_SPLIT_EXTENT || d.y.abs() > TRIANGLE_SPLIT_EXTENT
        })
    }

    /// Four children by view-space edge midpoints, all with the parent's
    /// winding.
    fn subdivide(stack: &mut Vec<Piece>, a: Vec3f, b: Vec3f, c: Vec3f, level: u8) {
        let ab = (a + b) * 0.5;
        let bc = (b + c) * 0.5;
        let ca = (c + a) * 0.5;
        let next = level + 1;
        stack.push((a, ab, ca, next));
        stack.push((ab, b, bc, next));
        stack.push((ca, bc, c, next));
        stack.push((ab, bc, ca, next));
    }
}

/// Triangle renderer backed by a [`SoftwareContext`](crate::core::software_context::SoftwareContext).
pub struct SoftwareTriangleRenderer {
    frame: SharedFrame,
    vertices: Vec<TriangleVertex>,
    triangles: Vec<[u32; 3]>,
}

impl SoftwareTriangleRenderer {
    pub(crate) fn new(frame: SharedFrame) -> Self {
        SoftwareTriangleRenderer {
            frame,
            vertices: Vec::new(),
            triangles: Vec::new(),
        }
    }
}

impl TriangleRenderer for SoftwareTriangleRenderer {
    fn clear(&mut self) {
        self.vertices.clear();
        self.triangles.clear();
    }

    fn add_vertex(&mut self, position: Vec3f, normal: Vec3f, color: Color) -> u32 {
        self.vertices.push(TriangleVertex {
            position,
            normal,
            color,
        });
        (self.vertices.len() - 1) as u32
    }

    fn add_triangle(&mut self, a: u32, b: u32, c: u32) {
        let count = self.vertices.len();
        for index in [a, b, c] {
            assert!(
                (index as usize) < count,
                "triangle index {} out of range ({} vertices)",
                index,
                count
            );
        }
        self.triangles.push([a, b, c]);
    }

    fn render(&self, proj: &Mat4f, model_view: &Mat4f) {
        let mut frame = self.frame.borrow_mut();
        let viewport = frame.viewport();
        let lighting = frame.lighting();

        let mut pieces = Vec::new();
        TriangleProcessor::process(
            &self.vertices,
            &self.triangles,
            proj,
            model_view,
            &viewport,
            &lighting,
            &mut pieces,
        );
        trace!(
            "triangle instance: {} triangles -> {} pieces",
            self.triangles.len(),
            pieces.len()
        );
        frame.submit(Instance::Triangles(pieces));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32, y: f32, z: f32) -> TriangleVertex {
        TriangleVertex {
            position: Vec3f::new(x, y, z),
            normal: Vec3f::z(),
            color: Color::rgb(200, 200, 200),
        }
    }

    fn run(vertices: &[TriangleVertex], triangles: &[[u32; 3]], proj: &Mat4f) -> Vec<ScreenTriangle> {
        let mut out = Vec::new();
        TriangleProcessor::process(
            vertices,
            triangles,
            proj,
            &Mat4f::identity(),
            &Viewport::full(100, 100),
            &Lighting::ambient_only(0.5),
            &mut out,
        );
        out
    }

    #[test]
    fn small_front_facing_triangle_is_one_piece() {
        let v = [vertex(0.0, 0.0, 0.0), vertex(0.1, 0.0, 0.0), vertex(0.0, 0.1, 0.0)];
        let out = run(&v, &[[0, 1, 2]], &Mat4f::identity());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].color, Color::rgb(100, 100, 100));
    }

    #[test]
    fn clockwise_triangle_is_culled() {
        let v = [vertex(0.0, 0.0, 0.0), vertex(0.1, 0.0, 0.0), vertex(0.0, 0.1, 0.0)];
        assert!(run(&v, &[[0, 2, 1]], &Mat4f::identity()).is_empty());
    }

    #[test]
    fn large_triangle_subdivides_to_the_level_limit() {
        let v = [vertex(-1.0, -1.0, 0.0), vertex(1.0, -1.0, 0.0), vertex(-1.0, 1.0, 0.0)];
        let out = run(&v, &[[0, 1, 2]], &Mat4f::identity());
        assert_eq!(out.len(), 64);
        let first = out[0].color;
        assert!(out.iter().all(|t| t.color == first));
    }

    #[test]
    fn triangle_outside_one_face_is_culled() {
        let v = [vertex(1.5, 0.0, 0.0), vertex(2.0, 0.0, 0.0), vertex(1.5, 0.5, 0.0)];
        assert!(run(&v, &[[0, 1, 2]], &Mat4f::identity()).is_empty());
    }

    #[test]
    fn triangle_behind_the_eye_is_dropped() {
        let proj = Mat4f::perspective(1.0, 1.0, 0.1, 100.0);
        let v = [vertex(0.0, 0.0, 1.0), vertex(1.0, 0.0, 1.0), vertex(0.0, 1.0, 1.0)];
        assert!(run(&v, &[[0, 1, 2]], &proj).is_empty());
    }

    fn assert_in_front(out: &[ScreenTriangle]) {
        assert!(!out.is_empty());
        for piece in out {
            assert!(piece.points.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
            assert!((-1.0..=1.0).contains(&piece.depth), "depth {}", piece.depth);
        }
    }

    #[test]
    fn one_vertex_behind_keeps_the_front_pieces() {
        let proj = Mat4f::perspective(1.0, 1.0, 0.1, 100.0);
        let v = [vertex(-1.0, -1.0, -2.0), vertex(1.0, -1.0, -2.0), vertex(0.0, 1.0, 1.0)];
        assert_in_front(&run(&v, &[[0, 1, 2]], &proj));
    }

    #[test]
    fn two_vertices_behind_keep_the_front_pieces() {
        let proj = Mat4f::perspective(1.0, 1.0, 0.1, 100.0);
        let v = [vertex(-1.0, -1.0, 1.0), vertex(1.0, -1.0, 1.0), vertex(0.0, 1.0, -2.0)];
        assert_in_front(&run(&v, &[[0, 1, 2]], &proj));
    }

    #[test]
    fn facing_the_light_is_brighter_than_edge_on() {
        let lit = Lighting::new(0.1, 0.9, Vec3f::z());
        let v = [vertex(0.0, 0.0, 0.0), vertex(0.1, 0.0, 0.0), vertex(0.0, 0.1, 0.0)];
        let tilted = [vertex(0.0, 0.0, 0.0), vertex(0.1, 0.0, -0.1), vertex(0.0, 0.1, 0.0)];
        let shade = |verts: &[TriangleVertex]| {
            let mut out = Vec::new();
            TriangleProcessor::process(
                verts,
                &[[0, 1, 2]],
                &Mat4f::identity(),
                &Mat4f::identity(),
                &Viewport::full(100, 100),
                &lit,
                &mut out,
            );
            out[0].color.r
        };
        assert_eq!(shade(&v), 200);
        assert!(shade(&tilted) < 200);
    }
}
