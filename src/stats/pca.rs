//! Principal component analysis through the singular value decomposition.

use nalgebra::DMatrix;

use crate::error::{Error, Result};

/// Rotate 2-D points counter-clockwise by `angle` radians.
pub fn rotate(points: &[[f64; 2]], angle: f64) -> Vec<[f64; 2]> {
    let (s, c) = angle.sin_cos();
    points
        .iter()
        .map(|&[x, y]| [c * x - s * y, s * x + c * y])
        .collect()
}

/// Foot of the perpendicular from `p` onto the line through the origin
/// whose unit normal is `normal`.
pub fn project_onto_line(p: [f64; 2], normal: [f64; 2]) -> [f64; 2] {
    let d = p[0] * normal[0] + p[1] * normal[1];
    [p[0] - d * normal[0], p[1] - d * normal[1]]
}

/// Principal axes of a data set.
#[derive(Debug, Clone, PartialEq)]
pub struct Pca {
    pub mean: Vec<f64>,
    /// Unit eigenvectors, largest variance first.
    pub components: Vec<Vec<f64>>,
    /// Variance along each component.
    pub variances: Vec<f64>,
}

impl Pca {
    /// Fit to `rows` observations of equal dimension.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        let d = rows.first().map_or(0, Vec::len);
        if n < 2 || d == 0 || rows.iter().any(|r| r.len() != d) {
            return Err(Error::Numerical(format!(
                "PCA needs at least two observations of equal dimension (got {n})"
            )));
        }
        let mean: Vec<f64> = (0..d)
            .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n as f64)
            .collect();
        let centred = DMatrix::from_fn(n, d, |i, j| rows[i][j] - mean[j]);
        let svd = centred.svd(false, true);
        let v_t = svd
            .v_t
            .ok_or_else(|| Error::Numerical("SVD did not return V^T".into()))?;

        let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
        order.sort_by(|&a, &b| svd.singular_values[b].total_cmp(&svd.singular_values[a]));
        let components = order
            .iter()
            .map(|&k| v_t.row(k).iter().copied().collect())
            .collect();
        let variances = order
            .iter()
            .map(|&k| svd.singular_values[k].powi(2) / (n - 1) as f64)
            .collect();
        Ok(Self {
            mean,
            components,
            variances,
        })
    }

    /// Coordinates of `row` along the principal components.
    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        self.components
            .iter()
            .map(|c| c.iter().zip(row).zip(&self.mean).map(|((ci, x), m)| ci * (x - m)).sum())
            .collect()
    }
}

/// Block shapes `(rows, cols)` of the thin SVD `X = U Σ Vᵀ` of an
/// `n × d` matrix.
pub fn thin_svd_shapes(n: usize, d: usize) -> [(usize, usize); 4] {
    let k = n.min(d);
    [(n, d), (n, k), (k, k), (k, d)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synth::SeededRng;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn rotation_and_projection() {
        let r = rotate(&[[1.0, 0.0]], PI / 2.0);
        assert_relative_eq!(r[0][0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(r[0][1], 1.0, epsilon = 1e-12);
        assert_eq!(project_onto_line([1.0, 2.0], [0.0, 1.0]), [1.0, 0.0]);
    }

    #[test]
    fn recovers_rotation_angle() {
        let mut rng = SeededRng::new(42);
        let raw: Vec<[f64; 2]> = (0..2000).map(|_| [rng.normal(0.0, 0.25), rng.normal(0.0, 0.08)]).collect();
        let rows: Vec<Vec<f64>> = rotate(&raw, PI / 6.0).iter().map(|p| p.to_vec()).collect();
        let pca = Pca::fit(&rows).unwrap();
        let c = &pca.components[0];
        let angle = c[1].atan2(c[0]).rem_euclid(PI);
        assert_relative_eq!(angle, PI / 6.0, epsilon = 0.02);
        assert!(pca.variances[0] > pca.variances[1]);
        assert_relative_eq!(pca.variances[0].sqrt(), 0.25, epsilon = 0.02);
        assert_eq!(pca.transform(&pca.mean), vec![0.0, 0.0]);
    }

    #[test]
    fn svd_block_shapes() {
        assert_eq!(thin_svd_shapes(4, 8), [(4, 8), (4, 4), (4, 4), (4, 8)]);
        assert_eq!(thin_svd_shapes(8, 4)[1], (8, 4));
    }
}
