//! Equal-area and compromise projections of the sphere onto the plane.
//!
//! Longitude `λ ∈ [-π, π]` and latitude `φ ∈ [-π/2, π/2]` in radians.

use std::f64::consts::{FRAC_PI_2, PI, SQRT_2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Projection {
    Hammer,
    Aitoff,
    Mollweide,
    Lambert,
}

impl Projection {
    pub const ALL: [Projection; 4] = [
        Projection::Hammer,
        Projection::Aitoff,
        Projection::Mollweide,
        Projection::Lambert,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Projection::Hammer => "Hammer",
            Projection::Aitoff => "Aitoff",
            Projection::Mollweide => "Mollweide",
            Projection::Lambert => "Lambert",
        }
    }

    /// Planar coordinates of `(λ, φ)`. `None` where the projection is
    /// singular (the antipode of the Lambert centre).
    pub fn project(self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let (sin_lat, cos_lat) = lat.sin_cos();
        match self {
            Projection::Hammer => {
                let denom = (1.0 + cos_lat * (0.5 * lon).cos()).sqrt();
                Some((
                    2.0 * SQRT_2 * cos_lat * (0.5 * lon).sin() / denom,
                    SQRT_2 * sin_lat / denom,
                ))
            }
            Projection::Aitoff => {
                let alpha = (cos_lat * (0.5 * lon).cos()).clamp(-1.0, 1.0).acos();
                let sinc = if alpha.abs() < 1e-12 { 1.0 } else { alpha.sin() / alpha };
                Some((2.0 * cos_lat * (0.5 * lon).sin() / sinc, sin_lat / sinc))
            }
            Projection::Mollweide => {
                let theta = mollweide_theta(lat);
                Some((2.0 * SQRT_2 / PI * lon * theta.cos(), SQRT_2 * theta.sin()))
            }
            Projection::Lambert => {
                let denom = 1.0 + cos_lat * lon.cos();
                if denom <= 1e-12 {
                    return None;
                }
                let k = (2.0 / denom).sqrt();
                Some((k * cos_lat * lon.sin(), k * sin_lat))
            }
        }
    }

    /// Project a polyline, splitting it where a point is singular.
    pub fn project_path(self, path: &[(f64, f64)]) -> Vec<Vec<(f64, f64)>> {
        let mut pieces = vec![Vec::new()];
        for &(lon, lat) in path {
            match self.project(lon, lat) {
                Some(p) => {
                    if let Some(last) = pieces.last_mut() {
                        last.push(p);
                    }
                }
                None => pieces.push(Vec::new()),
            }
        }
        pieces.retain(|p| p.len() > 1);
        pieces
    }
}

/// Auxiliary angle θ with `2θ + sin 2θ = π sin φ` (Newton iteration).
fn mollweide_theta(lat: f64) -> f64 {
    if (FRAC_PI_2 - lat.abs()).abs() < 1e-12 {
        return lat;
    }
    let target = PI * lat.sin();
    let mut theta = lat;
    for _ in 0..50 {
        let f = 2.0 * theta + (2.0 * theta).sin() - target;
        let df = 2.0 + 2.0 * (2.0 * theta).cos();
        if df.abs() < 1e-15 {
            break;
        }
        let step = f / df;
        theta -= step;
        if step.abs() < 1e-12 {
            break;
        }
    }
    theta
}

/// Points of the small circle of angular `radius` around `(λ0, φ0)`.
pub fn tissot_circle(lon0: f64, lat0: f64, radius: f64, n: usize) -> Vec<(f64, f64)> {
    let (sr, cr) = radius.sin_cos();
    let (s0, c0) = lat0.sin_cos();
    (0..=n)
        .map(|i| {
            let bearing = 2.0 * PI * i as f64 / n as f64;
            let lat = (s0 * cr + c0 * sr * bearing.cos()).clamp(-1.0, 1.0).asin();
            let lon = lon0 + (bearing.sin() * sr * c0).atan2(cr - s0 * lat.sin());
            (lon, lat)
        })
        .collect()
}

/// Meridians every `lon_step` and parallels every `lat_step`, each as a
/// densely sampled `(λ, φ)` polyline.
pub fn graticule(lon_step: f64, lat_step: f64, samples: usize) -> Vec<Vec<(f64, f64)>> {
    let mut lines = Vec::new();
    let n_lon = (PI / lon_step).round() as i64;
    for k in -n_lon..=n_lon {
        let lon = k as f64 * lon_step;
        lines.push(
            (0..=samples)
                .map(|i| (lon, -FRAC_PI_2 + PI * i as f64 / samples as f64))
                .collect(),
        );
    }
    let n_lat = (FRAC_PI_2 / lat_step).round() as i64;
    for k in (-n_lat + 1)..n_lat {
        let lat = k as f64 * lat_step;
        lines.push(
            (0..=samples)
                .map(|i| (-PI + 2.0 * PI * i as f64 / samples as f64, lat))
                .collect(),
        );
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn origin_maps_to_origin() {
        for p in Projection::ALL {
            let (x, y) = p.project(0.0, 0.0).unwrap();
            assert_relative_eq!(x, 0.0, epsilon = 1e-12);
            assert_relative_eq!(y, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn known_extents() {
        let (x, _) = Projection::Hammer.project(PI, 0.0).unwrap();
        assert_relative_eq!(x, 2.0 * SQRT_2, epsilon = 1e-12);
        let (_, y) = Projection::Mollweide.project(0.0, FRAC_PI_2).unwrap();
        assert_relative_eq!(y, SQRT_2, epsilon = 1e-12);
        let (x, _) = Projection::Aitoff.project(PI, 0.0).unwrap();
        assert_relative_eq!(x, PI, epsilon = 1e-9);
        assert!(Projection::Lambert.project(PI, 0.0).is_none());
    }

    #[test]
    fn tissot_points_are_equidistant() {
        let r = 10f64.to_radians();
        for (lon, lat) in tissot_circle(0.5, 0.6, r, 36) {
            let cos_d = 0.6f64.sin() * lat.sin() + 0.6f64.cos() * lat.cos() * (lon - 0.5).cos();
            assert_relative_eq!(cos_d.clamp(-1.0, 1.0).acos(), r, epsilon = 1e-9);
        }
    }

    #[test]
    fn lambert_path_splits_at_antipode() {
        let path: Vec<(f64, f64)> = (0..=20).map(|i| (-PI + PI * i as f64 / 10.0, 0.0)).collect();
        let pieces = Projection::Lambert.project_path(&path);
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].len(), 19);
        assert_eq!(graticule(PI / 6.0, PI / 12.0, 10).len(), 13 + 11);
    }
}
