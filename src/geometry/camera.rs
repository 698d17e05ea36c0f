use crate::geometry::vec_math::{Mat4f, Vec3f};
use nalgebra::{Rotation3, Unit};

/// Perspective camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Eye position.
    pub position: Vec3f,
    /// Point the camera looks at.
    pub target: Vec3f,
    pub up: Vec3f,
    /// Vertical field of view, radians.
    pub fov_y: f32,
    /// Viewport width / height.
    pub aspect_ratio: f32,
    pub near: f32,
    /// Far clip distance; `None` puts the far plane at infinity.
    pub far: Option<f32>,
}

impl Camera {
    pub fn new(
        position: Vec3f,
        target: Vec3f,
        up: Vec3f,
        fov_y_degrees: f32,
        aspect_ratio: f32,
        near: f32,
        far: Option<f32>,
    ) -> Self {
        Camera {
            position,
            target,
            up: up.try_normalize(1e-8).unwrap_or_else(Vec3f::y),
            fov_y: fov_y_degrees.to_radians(),
            aspect_ratio,
            near,
            far,
        }
    }

    /// World to view space.
    pub fn view_matrix(&self) -> Mat4f {
        Mat4f::look_at(&self.position, &self.target, &self.up)
    }

    /// View to clip space.
    pub fn projection_matrix(&self) -> Mat4f {
        match self.far {
            Some(far) => Mat4f::perspective(self.fov_y, self.aspect_ratio, self.near, far),
            None => Mat4f::infinite_perspective(self.fov_y, self.aspect_ratio, self.near),
        }
    }

    /// Rotates the eye around the target about `axis`.
    pub fn orbit(&mut self, axis: &Vec3f, angle_rad: f32) {
        let Some(axis) = Unit::try_new(*axis, 1e-8) else {
            return;
        };
        let rotation = Rotation3::from_axis_angle(&axis, angle_rad);
        self.position = self.target + rotation * (self.position - self.target);
    }

    pub fn orbit_y(&mut self, angle_degrees: f32) {
        self.orbit(&Vec3f::y(), angle_degrees.to_radians());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(far: Option<f32>) -> Camera {
        Camera::new(
            Vec3f::new(0.0, 0.0, 5.0),
            Vec3f::zeros(),
            Vec3f::y(),
            60.0,
            1.0,
            0.1,
            far,
        )
    }

    #[test]
    fn target_projects_to_screen_center() {
        for far in [Some(100.0), None] {
            let cam = camera(far);
            let mvp = cam.projection_matrix() * cam.view_matrix();
            let ndc = mvp.transform(&Vec3f::zeros());
            assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
            assert!(ndc.z > -1.0 && ndc.z < 1.0);
        }
    }

    #[test]
    fn points_behind_the_eye_get_negative_w() {
        let cam = camera(Some(100.0));
        let mvp = cam.projection_matrix() * cam.view_matrix();
        assert!(mvp.w_of(&Vec3f::new(0.0, 0.0, 6.0)) < 0.0);
        assert!(mvp.w_of(&Vec3f::new(0.0, 0.0, 4.0)) > 0.0);
    }

    #[test]
    fn orbit_keeps_distance() {
        let mut cam = camera(None);
        cam.orbit_y(90.0);
        assert!((cam.position - Vec3f::new(5.0, 0.0, 0.0)).norm() < 1e-4);
        cam.orbit(&Vec3f::x(), std::f32::consts::FRAC_PI_2);
        assert!((cam.position.norm() - 5.0).abs() < 1e-4);

        let before = cam.position;
        cam.orbit(&Vec3f::zeros(), 1.0);
        assert_eq!(cam.position, before);
    }
}
