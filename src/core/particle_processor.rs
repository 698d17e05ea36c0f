use crate::core::canvas::Viewport;
use crate::core::primitive::{Instance, ScreenParticle};
use crate::core::projection::{clip_to_ndc, is_finite};
use crate::core::renderer::{MAX_PARTICLE_COLORS, ParticleRenderer};
use crate::core::software_context::SharedFrame;
use crate::geometry::vec_math::{Mat4f, Vec3f};
use crate::material_system::color::Color;
use log::trace;
use nalgebra::Point2;

/// Fraction of the particle size used to probe the projected radius.
pub const PARTICLE_PROBE: f32 = 1.0 / 64.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec3f,
    pub size: f32,
    pub alpha: u8,
}

/// Billboard look shared by every particle of a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleStyle {
    pub x_axis: Vec3f,
    pub y_axis: Vec3f,
    pub colors: Vec<Color>,
}

impl Default for ParticleStyle {
    fn default() -> Self {
        ParticleStyle {
            x_axis: Vec3f::x(),
            y_axis: Vec3f::y(),
            colors: vec![Color::WHITE],
        }
    }
}

pub struct ParticleProcessor;

impl ParticleProcessor {
    /// Projects particle centers and derives a screen radius from two short
    /// probes along the billboard axes. The smaller of the two projected
    /// extents wins, so a foreshortened axis shrinks the disk.
    pub fn process(
        particles: &[Particle],
        style: &ParticleStyle,
        mvp: &Mat4f,
        viewport: &Viewport,
        out: &mut Vec<ScreenParticle>,
    ) {
        let ring_count = style.colors.len().clamp(1, MAX_PARTICLE_COLORS);

        for particle in particles {
            let Some((center, depth)) = Self::project(mvp, viewport, &particle.position) else {
                continue;
            };
            // outside the near/far range
            if !(-1.0..=1.0).contains(&depth) {
                continue;
            }

            // project short offsets along both axes and scale back up
            let probe = particle.size * PARTICLE_PROBE;
            let extent = |axis: &Vec3f| {
                Self::project(mvp, viewport, &(particle.position + axis * probe))
                    .map(|(p, _)| (p - center).norm_squared())
            };
            let (Some(dx), Some(dy)) = (extent(&style.x_axis), extent(&style.y_axis)) else {
                continue;
            };
            let radius = dx.min(dy).sqrt() / PARTICLE_PROBE;
            if !radius.is_finite() || !viewport.touches_disk(&center, radius) {
                continue;
            }

            // ring colors inside out, each scaled by the particle alpha
            let mut rings = [Color::TRANSPARENT; MAX_PARTICLE_COLORS];
            for (slot, color) in rings.iter_mut().zip(&style.colors) {
                *slot = color.with_alpha_scaled(particle.alpha).premultiplied();
            }
            if style.colors.is_empty() {
                rings[0] = Color::WHITE.with_alpha_scaled(particle.alpha).premultiplied();
            }

            out.push(ScreenParticle {
                center,
                radius,
                rings,
                ring_count: ring_count as u8,
                depth,
            });
        }
    }

    /// Pixel position and NDC depth, or `None` behind the eye.
    fn project(mvp: &Mat4f, viewport: &Viewport, position: &Vec3f) -> Option<(Point2<f32>, f32)> {
        let clip = mvp.transform_homogeneous(position);
        if !(clip.w > 0.0) {
            return None;
        }
        let ndc = clip_to_ndc(&clip);
        if !is_finite(&ndc) {
            return None;
        }
        Some((viewport.ndc_to_pixel(&ndc), ndc.z))
    }
}

/// Particle renderer backed by a [`SoftwareContext`](crate::core::software_context::SoftwareContext).
pub struct SoftwareParticleRenderer {
    frame: SharedFrame,
    style: ParticleStyle,
    particles: Vec<Particle>,
}

impl SoftwareParticleRenderer {
    pub(crate) fn new(frame: SharedFrame) -> Self {
        SoftwareParticleRenderer {
            frame,
            style: ParticleStyle::default(),
            particles: Vec::new(),
        }
    }
}

impl ParticleRenderer for SoftwareParticleRenderer {
    fn clear(&mut self) {
        self.particles.clear();
    }

    fn set_axes(&mut self, x_axis: Vec3f, y_axis: Vec3f) {
        self.style.x_axis = x_axis;
        self.style.y_axis = y_axis;
    }

    fn set_colors(&mut self, colors: &[Color]) {
        self.style.colors = if colors.is_empty() {
            vec![Color::WHITE]
        } else {
            colors.iter().take(MAX_PARTICLE_COLORS).copied().collect()
        };
    }

    fn add_particle(&mut self, position: Vec3f, size: f32, alpha: u8) {
        self.particles.push(Particle {
            position,
            size,
            alpha,
        });
    }

    fn render(&self, proj: &Mat4f, model_view: &Mat4f) {
        let mut frame = self.frame.borrow_mut();
        let viewport = frame.viewport();
        let mvp = proj * model_view;

        let mut disks = Vec::new();
        ParticleProcessor::process(&self.particles, &self.style, &mvp, &viewport, &mut disks);
        trace!(
            "particle instance: {} particles -> {} disks",
            self.particles.len(),
            disks.len()
        );
        frame.submit(Instance::Particles(disks));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(position: Vec3f, size: f32, style: &ParticleStyle, mvp: &Mat4f) -> Vec<ScreenParticle> {
        let mut out = Vec::new();
        let particle = Particle {
            position,
            size,
            alpha: 255,
        };
        ParticleProcessor::process(&[particle], style, mvp, &Viewport::full(200, 100), &mut out);
        out
    }

    #[test]
    fn radius_follows_the_shorter_axis() {
        // x spans 100 px per NDC unit, y only 50
        let out = one(Vec3f::zeros(), 0.2, &ParticleStyle::default(), &Mat4f::identity());
        assert_eq!(out.len(), 1);
        assert!((out[0].radius - 10.0).abs() < 1e-3);
        assert_eq!(out[0].center, Point2::new(100.0, 50.0));
    }

    #[test]
    fn rings_take_particle_alpha() {
        let style = ParticleStyle {
            colors: vec![Color::rgb(255, 0, 0), Color::rgba(0, 255, 0, 128)],
            ..ParticleStyle::default()
        };
        let mut out = Vec::new();
        let particle = Particle {
            position: Vec3f::zeros(),
            size: 0.5,
            alpha: 128,
        };
        ParticleProcessor::process(&[particle], &style, &Mat4f::identity(), &Viewport::full(100, 100), &mut out);
        assert_eq!(out[0].ring_count, 2);
        assert_eq!(out[0].rings[0], Color::rgb(128, 0, 0));
        assert_eq!(out[0].rings[1], Color::rgb(0, 64, 0));
    }

    #[test]
    fn particles_outside_depth_range_are_dropped() {
        let style = ParticleStyle::default();
        assert!(one(Vec3f::new(0.0, 0.0, 1.5), 0.1, &style, &Mat4f::identity()).is_empty());
        let proj = Mat4f::perspective(1.0, 1.0, 0.1, 100.0);
        assert!(one(Vec3f::new(0.0, 0.0, 1.0), 0.1, &style, &proj).is_empty());
    }

    #[test]
    fn disk_off_viewport_is_dropped_but_overlap_is_kept() {
        let style = ParticleStyle::default();
        assert!(one(Vec3f::new(1.5, 0.0, 0.0), 0.1, &style, &Mat4f::identity()).is_empty());
        assert_eq!(one(Vec3f::new(1.05, 0.0, 0.0), 0.4, &style, &Mat4f::identity()).len(), 1);
    }
}
