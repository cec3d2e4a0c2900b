//! Iso-lines of a 2-D surface by marching squares.

use serde::{Deserialize, Serialize};

use crate::data::model::Surface2;

/// A straight piece of a contour line, in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: (f64, f64),
    pub end: (f64, f64),
}

/// Segments of the `level` iso-line. Cells touching a non-finite value
/// are skipped.
pub fn marching_squares(surface: &Surface2, level: f64) -> Vec<Segment> {
    let (ny, nx) = surface.shape();
    let xs = surface.x().points();
    let ys = surface.y().points();
    let mut out = Vec::new();
    if nx < 2 || ny < 2 {
        return out;
    }

    for iy in 0..ny - 1 {
        for ix in 0..nx - 1 {
            // Corners counter-clockwise from bottom-left.
            let corners = [
                (xs[ix], ys[iy], surface.at(ix, iy)),
                (xs[ix + 1], ys[iy], surface.at(ix + 1, iy)),
                (xs[ix + 1], ys[iy + 1], surface.at(ix + 1, iy + 1)),
                (xs[ix], ys[iy + 1], surface.at(ix, iy + 1)),
            ];
            if corners.iter().any(|c| !c.2.is_finite()) {
                continue;
            }
            let mut crossings: Vec<(f64, f64)> = Vec::with_capacity(4);
            for e in 0..4 {
                let (xa, ya, va) = corners[e];
                let (xb, yb, vb) = corners[(e + 1) % 4];
                if (va >= level) != (vb >= level) {
                    let t = (level - va) / (vb - va);
                    crossings.push((xa + t * (xb - xa), ya + t * (yb - ya)));
                }
            }
            match crossings.len() {
                2 => out.push(Segment {
                    start: crossings[0],
                    end: crossings[1],
                }),
                4 => {
                    // Saddle: resolve with the cell-centre value.
                    let centre = corners.iter().map(|c| c.2).sum::<f64>() / 4.0;
                    let first_above = corners[0].2 >= level;
                    let (a, b) = if (centre >= level) == first_above {
                        ((0, 1), (2, 3))
                    } else {
                        ((0, 3), (1, 2))
                    };
                    out.push(Segment {
                        start: crossings[a.0],
                        end: crossings[a.1],
                    });
                    out.push(Segment {
                        start: crossings[b.0],
                        end: crossings[b.1],
                    });
                }
                _ => {}
            }
        }
    }
    out
}

/// Iso-lines for several levels, tagged with their level.
pub fn contour_levels(surface: &Surface2, levels: &[f64]) -> Vec<(f64, Vec<Segment>)> {
    levels
        .iter()
        .map(|&l| (l, marching_squares(surface, l)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Grid;

    #[test]
    fn circle_contour_lies_on_radius() {
        let g = Grid::linspace(-2.0, 2.0, 81).unwrap();
        let s = Surface2::from_fn(&g, &g, |x, y| x * x + y * y);
        let segs = marching_squares(&s, 1.0);
        assert!(segs.len() > 20);
        for seg in &segs {
            for (x, y) in [seg.start, seg.end] {
                let r = (x * x + y * y).sqrt();
                assert!((r - 1.0).abs() < 0.01, "r = {r}");
            }
        }
    }

    #[test]
    fn flat_surface_has_no_contour() {
        let g = Grid::linspace(0.0, 1.0, 5).unwrap();
        let s = Surface2::from_fn(&g, &g, |_, _| 3.0);
        assert!(marching_squares(&s, 1.0).is_empty());
        assert_eq!(contour_levels(&s, &[1.0, 2.0]).len(), 2);
    }
}
