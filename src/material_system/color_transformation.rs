use crate::material_system::color::Color;
use nalgebra::{Matrix3x4, Matrix4, Vector4};
use std::ops::Mul;

/// Rec. 601 luma weights.
pub const REC601: [f32; 3] = [0.299, 0.587, 0.114];

/// Affine RGB transform: a 3x4 matrix applied to `(r, g, b, 1)`.
///
/// The implicit fourth row is `(0, 0, 0, 1)`; it is never stored, so every
/// operation here works on the 12 coefficients only. Channel values and the
/// offset column are in 0-255 units. Alpha is never touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorTransformation {
    m: Matrix3x4<f32>,
}

impl Default for ColorTransformation {
    fn default() -> Self {
        Self::identity()
    }
}

impl ColorTransformation {
    pub fn identity() -> Self {
        Self {
            m: Matrix3x4::identity(),
        }
    }

    pub fn matrix(&self) -> &Matrix3x4<f32> {
        &self.m
    }

    /// Uniform brightness change.
    pub fn brightness(factor: f32) -> Self {
        let mut t = Self::identity();
        t.scale(factor);
        t
    }

    /// Maps any input to `target` scaled by the weighted luminance of the
    /// input. `target` channels are taken relative to 255, so a white target
    /// produces plain gray.
    pub fn to_grayscale(target: Color, weights: [f32; 3]) -> Self {
        let tint = [target.r, target.g, target.b];
        let mut m = Matrix3x4::zeros();
        for (row, channel) in tint.iter().enumerate() {
            let k = *channel as f32 / 255.0;
            for (col, w) in weights.iter().enumerate() {
                m[(row, col)] = k * w;
            }
        }
        Self { m }
    }

    /// Linear blend of two transforms: `a * (1 - t) + b * t`.
    pub fn mix(a: &ColorTransformation, b: &ColorTransformation, t: f32) -> Self {
        let mut out = *a;
        out.scale(1.0 - t);
        let mut other = *b;
        other.scale(t);
        out.add(&other);
        out
    }

    /// Multiplies all 12 coefficients by `factor`.
    pub fn scale(&mut self, factor: f32) -> &mut Self {
        self.m *= factor;
        self
    }

    /// Adds the coefficients of `other`.
    pub fn add(&mut self, other: &ColorTransformation) -> &mut Self {
        self.m += other.m;
        self
    }

    /// Unclamped RGB transform in 0-255 units.
    pub fn transform_rgb(&self, rgb: [f32; 3]) -> [f32; 3] {
        let out = self.m * Vector4::new(rgb[0], rgb[1], rgb[2], 1.0);
        [out.x, out.y, out.z]
    }

    pub fn transform(&self, color: Color) -> Color {
        let [r, g, b] =
            self.transform_rgb([color.r as f32, color.g as f32, color.b as f32]);
        let quantize = |v: f32| v.round().clamp(0.0, 255.0) as u8;
        Color::rgba(quantize(r), quantize(g), quantize(b), color.a)
    }

    fn to_homogeneous(self) -> Matrix4<f32> {
        let mut full = Matrix4::identity();
        full.fixed_view_mut::<3, 4>(0, 0).copy_from(&self.m);
        full
    }
}

/// `a * b` applies `a` first, then `b`.
impl Mul for ColorTransformation {
    type Output = ColorTransformation;

    fn mul(self, rhs: ColorTransformation) -> ColorTransformation {
        let composed = rhs.to_homogeneous() * self.to_homogeneous();
        ColorTransformation {
            m: composed.fixed_view::<3, 4>(0, 0).into_owned(),
        }
    }
}

impl std::ops::Add for ColorTransformation {
    type Output = ColorTransformation;

    fn add(mut self, rhs: ColorTransformation) -> ColorTransformation {
        self.m += rhs.m;
        self
    }
}

impl std::ops::AddAssign for ColorTransformation {
    fn add_assign(&mut self, rhs: ColorTransformation) {
        self.m += rhs.m;
    }
}
