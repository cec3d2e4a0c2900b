//! Minimisation and least-squares solvers.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Linear least squares
// ---------------------------------------------------------------------------

/// Vandermonde design matrix with columns `x^0 .. x^degree`.
pub fn vandermonde(x: &[f64], degree: usize) -> DMatrix<f64> {
    DMatrix::from_fn(x.len(), degree + 1, |i, j| x[i].powi(j as i32))
}

/// Minimise `|A β - y|²` through the SVD of `A`.
pub fn lstsq(design: &DMatrix<f64>, y: &[f64]) -> Result<Vec<f64>> {
    if design.nrows() != y.len() {
        return Err(Error::Numerical(format!(
            "design matrix has {} rows but {} observations",
            design.nrows(),
            y.len()
        )));
    }
    let rhs = DVector::from_column_slice(y);
    let svd = design.clone().svd(true, true);
    let beta = svd.solve(&rhs, 1e-12).map_err(|e| Error::Numerical(e.to_string()))?;
    Ok(beta.iter().copied().collect())
}

/// Evaluate the polynomial `Σ β_j x^j`.
pub fn polyval(beta: &[f64], x: f64) -> f64 {
    beta.iter().rev().fold(0.0, |acc, b| acc * x + b)
}

// ---------------------------------------------------------------------------
// Nelder–Mead
// ---------------------------------------------------------------------------

/// Stopping rule for [`fmin`].
#[derive(Debug, Clone, Copy)]
pub struct FminOptions {
    pub xtol: f64,
    pub ftol: f64,
    pub max_iter: usize,
}

impl Default for FminOptions {
    fn default() -> Self {
        Self {
            xtol: 1e-4,
            ftol: 1e-4,
            max_iter: 2000,
        }
    }
}

/// Downhill simplex minimisation of `f` starting from `x0`. Returns the
/// best vertex found.
pub fn fmin<F>(f: F, x0: &[f64], opts: FminOptions) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let n = x0.len();
    if n == 0 {
        return Vec::new();
    }

    // Initial simplex: 5% steps (0.00025 for zero coordinates).
    let mut simplex: Vec<Vec<f64>> = vec![x0.to_vec()];
    for i in 0..n {
        let mut v = x0.to_vec();
        v[i] = if v[i] != 0.0 { v[i] * 1.05 } else { 0.00025 };
        simplex.push(v);
    }
    let mut fvals: Vec<f64> = simplex.iter().map(|v| f(v)).collect();

    for _ in 0..opts.max_iter {
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| fvals[a].total_cmp(&fvals[b]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        fvals = order.iter().map(|&i| fvals[i]).collect();

        let x_spread = simplex[1..]
            .iter()
            .flat_map(|v| v.iter().zip(&simplex[0]).map(|(a, b)| (a - b).abs()))
            .fold(0.0, f64::max);
        let f_spread = fvals[1..].iter().map(|v| (v - fvals[0]).abs()).fold(0.0, f64::max);
        if x_spread <= opts.xtol && f_spread <= opts.ftol {
            break;
        }

        let centroid: Vec<f64> = (0..n)
            .map(|j| simplex[..n].iter().map(|v| v[j]).sum::<f64>() / n as f64)
            .collect();
        let toward = |t: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&simplex[n])
                .map(|(c, w)| c + t * (w - c))
                .collect()
        };

        let xr = toward(-1.0);
        let fr = f(&xr);
        if fr < fvals[0] {
            let xe = toward(-2.0);
            let fe = f(&xe);
            if fe < fr {
                simplex[n] = xe;
                fvals[n] = fe;
            } else {
                simplex[n] = xr;
                fvals[n] = fr;
            }
            continue;
        }
        if fr < fvals[n - 1] {
            simplex[n] = xr;
            fvals[n] = fr;
            continue;
        }
        let (xc, fc) = if fr < fvals[n] {
            let xc = toward(-0.5);
            let fc = f(&xc);
            (xc, fc)
        } else {
            let xc = toward(0.5);
            let fc = f(&xc);
            (xc, fc)
        };
        if fc < fvals[n].min(fr) {
            simplex[n] = xc;
            fvals[n] = fc;
            continue;
        }
        // Shrink towards the best vertex.
        let best = simplex[0].clone();
        for i in 1..=n {
            simplex[i] = simplex[i].iter().zip(&best).map(|(v, b)| b + 0.5 * (v - b)).collect();
            fvals[i] = f(&simplex[i]);
        }
    }

    let best = (0..=n)
        .min_by(|&a, &b| fvals[a].total_cmp(&fvals[b]))
        .unwrap_or(0);
    simplex.swap_remove(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn lstsq_recovers_line() {
        let x: Vec<f64> = (0..10).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 - 0.5 * v).collect();
        let beta = lstsq(&vandermonde(&x, 1), &y).unwrap();
        assert_relative_eq!(beta[0], 3.0, epsilon = 1e-9);
        assert_relative_eq!(beta[1], -0.5, epsilon = 1e-9);
        assert_relative_eq!(polyval(&beta, 4.0), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn lstsq_rejects_bad_shape() {
        assert!(lstsq(&vandermonde(&[1.0, 2.0], 1), &[1.0]).is_err());
    }

    #[test]
    fn fmin_finds_rosenbrock_minimum() {
        let rosen = |p: &[f64]| (1.0 - p[0]).powi(2) + 100.0 * (p[1] - p[0] * p[0]).powi(2);
        let opts = FminOptions {
            xtol: 1e-8,
            ftol: 1e-10,
            max_iter: 10_000,
        };
        let best = fmin(rosen, &[-1.2, 1.0], opts);
        assert_relative_eq!(best[0], 1.0, epsilon = 1e-3);
        assert_relative_eq!(best[1], 1.0, epsilon = 1e-3);
    }
}
