use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// RGBA color quad, 0-255 per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Folds alpha into the color channels and returns an opaque color.
    /// The canvas has no blending, so translucency is approximated by
    /// darkening towards black.
    pub fn premultiplied(self) -> Self {
        let scale = |c: u8| ((c as u16 * self.a as u16 + 127) / 255) as u8;
        Color::rgb(scale(self.r), scale(self.g), scale(self.b))
    }

    /// Multiplies RGB by `intensity` (clamped to [0, 1]); alpha is kept.
    pub fn shade(self, intensity: f32) -> Self {
        let i = intensity.clamp(0.0, 1.0);
        let scale = |c: u8| (c as f32 * i).round() as u8;
        Color::rgba(scale(self.r), scale(self.g), scale(self.b), self.a)
    }

    /// Scales alpha by `alpha / 255`.
    pub fn with_alpha_scaled(self, alpha: u8) -> Self {
        let a = ((self.a as u16 * alpha as u16 + 127) / 255) as u8;
        Color::rgba(self.r, self.g, self.b, a)
    }

    /// Channel-wise mean of a set of colors. Empty input gives black.
    pub fn average(colors: &[Color]) -> Color {
        if colors.is_empty() {
            return Color::BLACK;
        }
        let n = colors.len() as u32;
        let sum = colors.iter().fold([0u32; 4], |mut acc, c| {
            acc[0] += c.r as u32;
            acc[1] += c.g as u32;
            acc[2] += c.b as u32;
            acc[3] += c.a as u32;
            acc
        });
        let avg = |s: u32| ((s + n / 2) / n) as u8;
        Color::rgba(avg(sum[0]), avg(sum[1]), avg(sum[2]), avg(sum[3]))
    }

    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Color::rgba(bytes[0], bytes[1], bytes[2], bytes[3])
    }
}

/// Gets a base color for a face.
///
/// Without `colorize` this is a neutral gray; with it, a pseudo-random color
/// seeded by the face index (deterministic for the same index).
pub fn get_face_color(face_index: usize, colorize: bool) -> Color {
    if !colorize {
        return Color::rgb(180, 180, 180);
    }
    let mut rng = StdRng::seed_from_u64(face_index as u64);
    let channel = |rng: &mut StdRng| 80 + (rng.random::<f32>() * 100.0) as u8;
    Color::rgb(channel(&mut rng), channel(&mut rng), channel(&mut rng))
}

/// Parses `"r,g,b"` or `"r,g,b,a"` with 0-255 components.
pub fn parse_color(s: &str) -> Result<Color, String> {
    let parts: Vec<&str> = s.split(',').map(|p| p.trim()).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return Err(format!("expected \"r,g,b\" or \"r,g,b,a\", got '{}'", s));
    }
    let mut channels = [255u8; 4];
    for (slot, part) in channels.iter_mut().zip(&parts) {
        *slot = part
            .parse::<u8>()
            .map_err(|e| format!("invalid color component '{}': {}", part, e))?;
    }
    Ok(Color::from_bytes(channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premultiply_folds_alpha() {
        let c = Color::rgba(200, 100, 50, 128).premultiplied();
        assert_eq!(c, Color::rgb(100, 50, 25));
        assert_eq!(Color::rgb(10, 20, 30).premultiplied(), Color::rgb(10, 20, 30));
    }

    #[test]
    fn average_rounds_per_channel() {
        let c = Color::average(&[Color::rgb(0, 10, 255), Color::rgb(255, 11, 255)]);
        assert_eq!(c, Color::rgb(128, 11, 255));
    }

    #[test]
    fn face_colors_are_deterministic() {
        assert_eq!(get_face_color(17, true), get_face_color(17, true));
        assert_eq!(get_face_color(3, false), Color::rgb(180, 180, 180));
    }

    #[test]
    fn parses_colors() {
        assert_eq!(parse_color("1, 2,3").unwrap(), Color::rgb(1, 2, 3));
        assert_eq!(parse_color("1,2,3,4").unwrap(), Color::rgba(1, 2, 3, 4));
        assert!(parse_color("1,2").is_err());
        assert!(parse_color("1,2,300").is_err());
    }
}
