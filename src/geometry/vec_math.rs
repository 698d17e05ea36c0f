use nalgebra::{Matrix4, Point3, Vector3, Vector4};
use std::ops::{Mul, MulAssign};

/// Three-component float vector. Used both for model/view space points and
/// for post-divide NDC points.
pub type Vec3f = Vector3<f32>;

/// Determinant magnitude below which a matrix is treated as singular.
const SINGULAR_EPSILON: f32 = 1e-12;

/// General 4x4 transform.
///
/// Every in-place operation post-multiplies the new transform onto the
/// existing one (`self = self * op`). The operation called last is therefore
/// the first one applied to a point: "move, then rotate, then scale" is built
/// as `m.scale(..).rotate_y(..).translate(..)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4f(pub Matrix4<f32>);

impl Default for Mat4f {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mat4f {
    pub fn identity() -> Self {
        Mat4f(Matrix4::identity())
    }

    /// OpenGL-style perspective projection. `fov_y` is the vertical field of
    /// view in radians. Eye space looks down -Z; NDC z grows with distance.
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Mat4f(Matrix4::new_perspective(aspect, fov_y, near, far))
    }

    /// Perspective projection with the far plane at infinity. Points at any
    /// distance beyond `near` map to NDC z in (-1, 1).
    pub fn infinite_perspective(fov_y: f32, aspect: f32, near: f32) -> Self {
        let f = 1.0 / (fov_y * 0.5).tan();
        #[rustfmt::skip]
        let m = Matrix4::new(
            f / aspect, 0.0,  0.0,  0.0,
            0.0,        f,    0.0,  0.0,
            0.0,        0.0, -1.0, -2.0 * near,
            0.0,        0.0, -1.0,  0.0,
        );
        Mat4f(m)
    }

    /// Right-handed view matrix looking from `eye` towards `target`.
    pub fn look_at(eye: &Vec3f, target: &Vec3f, up: &Vec3f) -> Self {
        Mat4f(Matrix4::look_at_rh(
            &Point3::from(*eye),
            &Point3::from(*target),
            up,
        ))
    }

    pub fn matrix(&self) -> &Matrix4<f32> {
        &self.0
    }

    /// Inverts in place. Returns `false` and leaves the matrix untouched when
    /// it is (numerically) singular.
    pub fn invert(&mut self) -> bool {
        match self.inverse() {
            Some(inverse) => {
                *self = inverse;
                true
            }
            None => false,
        }
    }

    /// Pure variant of [`Mat4f::invert`].
    pub fn inverse(&self) -> Option<Mat4f> {
        let det = self.0.determinant();
        if !det.is_finite() || det.abs() <= SINGULAR_EPSILON {
            return None;
        }
        self.0.try_inverse().map(Mat4f)
    }

    pub fn transpose(&mut self) -> &mut Self {
        self.0.transpose_mut();
        self
    }

    pub fn translate(&mut self, offset: &Vec3f) -> &mut Self {
        self.0 *= Matrix4::new_translation(offset);
        self
    }

    pub fn scale(&mut self, factors: &Vec3f) -> &mut Self {
        self.0 *= Matrix4::new_nonuniform_scaling(factors);
        self
    }

    pub fn scale_uniform(&mut self, factor: f32) -> &mut Self {
        self.0 *= Matrix4::new_scaling(factor);
        self
    }

    pub fn rotate_x(&mut self, angle: f32) -> &mut Self {
        self.0 *= Matrix4::from_axis_angle(&Vector3::x_axis(), angle);
        self
    }

    pub fn rotate_y(&mut self, angle: f32) -> &mut Self {
        self.0 *= Matrix4::from_axis_angle(&Vector3::y_axis(), angle);
        self
    }

    pub fn rotate_z(&mut self, angle: f32) -> &mut Self {
        self.0 *= Matrix4::from_axis_angle(&Vector3::z_axis(), angle);
        self
    }

    /// Homogeneous transform of the point `(v, 1)`.
    pub fn transform_homogeneous(&self, v: &Vec3f) -> Vector4<f32> {
        self.0 * v.push(1.0)
    }

    /// Homogeneous `w` of the transformed point, without the other rows.
    pub fn w_of(&self, v: &Vec3f) -> f32 {
        let row = self.0.row(3);
        row[0] * v.x + row[1] * v.y + row[2] * v.z + row[3]
    }

    /// Point transform including the perspective divide by `w`. A zero `w`
    /// yields non-finite components, which callers treat as "not drawable".
    pub fn transform(&self, v: &Vec3f) -> Vec3f {
        let h = self.transform_homogeneous(v);
        Vec3f::new(h.x / h.w, h.y / h.w, h.z / h.w)
    }
}

impl Mul for Mat4f {
    type Output = Mat4f;

    fn mul(self, rhs: Mat4f) -> Mat4f {
        Mat4f(self.0 * rhs.0)
    }
}

impl Mul<&Mat4f> for &Mat4f {
    type Output = Mat4f;

    fn mul(self, rhs: &Mat4f) -> Mat4f {
        Mat4f(self.0 * rhs.0)
    }
}

impl MulAssign for Mat4f {
    fn mul_assign(&mut self, rhs: Mat4f) {
        self.0 *= rhs.0;
    }
}

impl From<Matrix4<f32>> for Mat4f {
    fn from(m: Matrix4<f32>) -> Self {
        Mat4f(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx_eq(a: &Vec3f, b: &Vec3f) -> bool {
        (a - b).norm() < 1e-4
    }

    fn approx_identity(m: &Mat4f) -> bool {
        (m.0 - Matrix4::identity()).amax() < 1e-4
    }

    #[test]
    fn identity_transform_keeps_points() {
        let samples = [
            Vec3f::new(0.0, 0.0, 0.0),
            Vec3f::new(1.5, -2.0, 3.25),
            Vec3f::new(-100.0, 42.0, 0.001),
        ];
        for v in samples {
            assert_eq!(Mat4f::identity().transform(&v), v);
        }
    }

    #[test]
    fn composition_applies_last_call_first() {
        // move by +x, then rotate a quarter turn about z, then scale by 2
        let mut m = Mat4f::identity();
        m.scale_uniform(2.0)
            .rotate_z(FRAC_PI_2)
            .translate(&Vec3f::new(1.0, 0.0, 0.0));

        let p = m.transform(&Vec3f::zeros());
        assert!(approx_eq(&p, &Vec3f::new(0.0, 2.0, 0.0)), "got {:?}", p);
    }

    #[test]
    fn invert_round_trips_to_identity() {
        let mut m = Mat4f::identity();
        m.translate(&Vec3f::new(3.0, -1.0, 2.0))
            .rotate_x(0.3)
            .rotate_y(1.1)
            .scale(&Vec3f::new(2.0, 0.5, 4.0));
        let original = m;

        assert!(m.invert());
        assert!(approx_identity(&(original * m)));
    }

    #[test]
    fn invert_singular_leaves_matrix_unchanged() {
        let mut m = Mat4f::identity();
        m.scale(&Vec3f::new(1.0, 0.0, 1.0));
        let before = m;

        assert!(!m.invert());
        assert_eq!(m, before);
        assert!(before.inverse().is_none());
    }

    #[test]
    fn perspective_maps_near_and_far_planes() {
        let proj = Mat4f::perspective(FRAC_PI_2, 1.0, 1.0, 10.0);
        let near = proj.transform(&Vec3f::new(0.0, 0.0, -1.0));
        let far = proj.transform(&Vec3f::new(0.0, 0.0, -10.0));
        assert!((near.z + 1.0).abs() < 1e-4);
        assert!((far.z - 1.0).abs() < 1e-4);
        assert!(proj.w_of(&Vec3f::new(0.0, 0.0, 1.0)) < 0.0);
    }

    #[test]
    fn infinite_perspective_keeps_depth_below_one() {
        let proj = Mat4f::infinite_perspective(FRAC_PI_2, 1.0, 0.5);
        let near = proj.transform(&Vec3f::new(0.0, 0.0, -0.5));
        let distant = proj.transform(&Vec3f::new(0.0, 0.0, -1.0e5));
        assert!((near.z + 1.0).abs() < 1e-4);
        assert!(distant.z < 1.0 && distant.z > 0.99);
    }

    #[test]
    fn w_of_matches_homogeneous_row() {
        let mut proj = Mat4f::perspective(1.0, 1.5, 0.1, 50.0);
        proj.translate(&Vec3f::new(0.0, 0.0, -5.0));
        let v = Vec3f::new(0.3, -0.2, 1.0);
        assert!((proj.w_of(&v) - proj.transform_homogeneous(&v).w).abs() < 1e-6);
    }

    #[test]
    fn transpose_swaps_translation_column() {
        let mut m = Mat4f::identity();
        m.translate(&Vec3f::new(1.0, 2.0, 3.0)).transpose();
        assert_eq!(m.0[(3, 0)], 1.0);
        assert_eq!(m.0[(3, 2)], 3.0);
    }
}
