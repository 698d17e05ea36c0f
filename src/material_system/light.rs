use crate::geometry::vec_math::Vec3f;

/// Flat-shading light setup: one ambient term plus one directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    /// Intensity applied to every face regardless of orientation.
    pub ambient: f32,
    /// Intensity of the directional term at normal incidence.
    pub diffuse: f32,
    /// Unit direction from the surface towards the light, in view space.
    pub direction: Vec3f,
}

impl Lighting {
    pub fn new(ambient: f32, diffuse: f32, direction: Vec3f) -> Self {
        let direction = direction
            .try_normalize(1e-8)
            .unwrap_or_else(|| Vec3f::new(0.0, 0.0, 1.0));
        Lighting {
            ambient,
            diffuse,
            direction,
        }
    }

    /// Ambient only, no directional contribution.
    pub fn ambient_only(ambient: f32) -> Self {
        Lighting::new(ambient, 0.0, Vec3f::z())
    }

    /// Shading intensity for a unit face normal, clamped to [0, 1].
    pub fn intensity(&self, normal: &Vec3f) -> f32 {
        let lambert = normal.dot(&self.direction).max(0.0);
        (self.ambient + self.diffuse * lambert).clamp(0.0, 1.0)
    }
}

impl Default for Lighting {
    fn default() -> Self {
        Lighting::new(0.3, 0.7, Vec3f::new(0.3, 0.5, 1.0))
    }
}
