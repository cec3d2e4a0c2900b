use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Mix, Srgb};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Colour type shared by both renderers
// ---------------------------------------------------------------------------

/// 8-bit sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const GRAY: Rgb = Rgb::new(128, 128, 128);
    pub const LIGHT_GRAY: Rgb = Rgb::new(204, 204, 204);
    pub const BLUE: Rgb = Rgb::new(31, 119, 180);
    pub const RED: Rgb = Rgb::new(214, 39, 40);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn from_srgb(c: Srgb) -> Self {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(q(c.red), q(c.green), q(c.blue))
    }

    fn to_srgb(self) -> Srgb {
        Srgb::new(self.r, self.g, self.b).into_format()
    }

    pub fn to_color32(self) -> Color32 {
        Color32::from_rgb(self.r, self.g, self.b)
    }

    /// The same colour with `alpha` applied (0 transparent, 1 opaque).
    pub fn to_color32_alpha(self, alpha: f32) -> Color32 {
        Color32::from_rgba_unmultiplied(self.r, self.g, self.b, (alpha.clamp(0.0, 1.0) * 255.0) as u8)
    }

    /// Blend over a white background, for backends without transparency.
    pub fn over_white(self, alpha: f32) -> Self {
        Self::from_srgb(Srgb::new(1.0, 1.0, 1.0).mix(self.to_srgb(), alpha.clamp(0.0, 1.0)))
    }
}

// ---------------------------------------------------------------------------
// Colour maps for heat maps and filled contours
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Colormap {
    /// White at 0, black at 1.
    Binary,
    /// Black at 0, white at 1.
    Gray,
    /// Black through blue-grey to white.
    Bone,
}

impl Colormap {
    fn stops(self) -> &'static [(f32, [f32; 3])] {
        match self {
            Colormap::Binary => &[(0.0, [1.0, 1.0, 1.0]), (1.0, [0.0, 0.0, 0.0])],
            Colormap::Gray => &[(0.0, [0.0, 0.0, 0.0]), (1.0, [1.0, 1.0, 1.0])],
            Colormap::Bone => &[
                (0.0, [0.0, 0.0, 0.0]),
                (0.365, [0.319, 0.319, 0.444]),
                (0.746, [0.652, 0.777, 0.778]),
                (1.0, [1.0, 1.0, 1.0]),
            ],
        }
    }

    /// Colour at `t ∈ [0, 1]` (clamped; NaN maps to 0).
    pub fn at(self, t: f64) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) as f32 };
        let stops = self.stops();
        for pair in stops.windows(2) {
            let (t0, c0) = pair[0];
            let (t1, c1) = pair[1];
            if t <= t1 {
                let f = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
                let a = Srgb::new(c0[0], c0[1], c0[2]);
                let b = Srgb::new(c1[0], c1[1], c1[2]);
                return Rgb::from_srgb(a.mix(b, f));
            }
        }
        let [r, g, b] = stops[stops.len() - 1].1;
        Rgb::from_srgb(Srgb::new(r, g, b))
    }
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Rgb::from_srgb(rgb)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colormap_endpoints() {
        assert_eq!(Colormap::Binary.at(0.0), Rgb::WHITE);
        assert_eq!(Colormap::Binary.at(1.0), Rgb::BLACK);
        assert_eq!(Colormap::Binary.at(7.0), Rgb::BLACK);
        assert_eq!(Colormap::Bone.at(0.0), Rgb::BLACK);
        assert_eq!(Colormap::Bone.at(1.0), Rgb::WHITE);
        assert_eq!(Colormap::Gray.at(f64::NAN), Rgb::BLACK);
    }

    #[test]
    fn bone_has_a_blue_tint() {
        let c = Colormap::Bone.at(0.5);
        assert!(c.b > c.r);
    }

    #[test]
    fn palette_is_distinct() {
        let p = generate_palette(6);
        assert_eq!(p.len(), 6);
        for (i, a) in p.iter().enumerate() {
            for b in &p[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn alpha_blend_over_white() {
        assert_eq!(Rgb::BLACK.over_white(0.0), Rgb::WHITE);
        assert_eq!(Rgb::BLACK.over_white(1.0), Rgb::BLACK);
        assert_eq!(Rgb::BLACK.over_white(0.5).r, 128);
    }
}
