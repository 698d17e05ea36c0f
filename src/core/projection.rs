//! Clip-space helpers shared by the line, triangle and particle paths.

use crate::geometry::vec_math::Vec3f;
use nalgebra::Vector4;

pub const OUT_LEFT: u8 = 0b00_0001;
pub const OUT_RIGHT: u8 = 0b00_0010;
pub const OUT_BOTTOM: u8 = 0b00_0100;
pub const OUT_TOP: u8 = 0b00_1000;
pub const OUT_NEAR: u8 = 0b01_0000;
pub const OUT_FAR: u8 = 0b10_0000;

/// Classifies an NDC point against the unit cube, one bit per face.
///
/// Primitives whose vertices share a bit lie entirely outside that face and
/// can be dropped. The test is conservative: a primitive crossing a corner
/// region may survive although nothing of it is visible.
pub fn outcode(ndc: &Vec3f) -> u8 {
    let mut code = 0;
    if ndc.x < -1.0 {
        code |= OUT_LEFT;
    } else if ndc.x > 1.0 {
        code |= OUT_RIGHT;
    }
    if ndc.y < -1.0 {
        code |= OUT_BOTTOM;
    } else if ndc.y > 1.0 {
        code |= OUT_TOP;
    }
    if ndc.z < -1.0 {
        code |= OUT_NEAR;
    } else if ndc.z > 1.0 {
        code |= OUT_FAR;
    }
    code
}

/// Perspective divide.
pub fn clip_to_ndc(clip: &Vector4<f32>) -> Vec3f {
    Vec3f::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w)
}

pub fn is_finite(v: &Vec3f) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inside_cube_has_no_bits() {
        assert_eq!(outcode(&Vec3f::new(0.0, 0.5, -1.0)), 0);
        assert_eq!(outcode(&Vec3f::new(1.0, -1.0, 1.0)), 0);
    }

    #[test]
    fn each_face_sets_its_bit() {
        assert_eq!(outcode(&Vec3f::new(-2.0, 0.0, 0.0)), OUT_LEFT);
        assert_eq!(outcode(&Vec3f::new(2.0, 3.0, 0.0)), OUT_RIGHT | OUT_TOP);
        assert_eq!(outcode(&Vec3f::new(0.0, -3.0, 5.0)), OUT_BOTTOM | OUT_FAR);
        assert_eq!(outcode(&Vec3f::new(0.0, 0.0, -1.5)), OUT_NEAR);
    }

    #[test]
    fn divide_by_w() {
        let ndc = clip_to_ndc(&Vector4::new(2.0, -4.0, 1.0, 2.0));
        assert_eq!(ndc, Vec3f::new(1.0, -2.0, 0.5));
        assert!(!is_finite(&clip_to_ndc(&Vector4::new(1.0, 0.0, 0.0, 0.0))));
    }
}
