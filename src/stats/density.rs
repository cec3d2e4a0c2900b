//! Histograms and non-parametric density estimates.

use std::f64::consts::PI;

use crate::data::model::{Grid, Sample, Surface2};
use crate::error::{Error, Result};
use crate::stats::contour::{Segment, marching_squares};
use crate::stats::neighbors::PointSet;

// ---------------------------------------------------------------------------
// Histograms
// ---------------------------------------------------------------------------

/// Counts in `edges.len() - 1` bins.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<f64>,
}

impl Histogram {
    /// `bins` equal-width bins over `range`. Values outside are dropped;
    /// the last bin includes its right edge.
    pub fn new(values: &[f64], bins: usize, range: (f64, f64)) -> Result<Self> {
        let (lo, hi) = range;
        if bins == 0 || !(hi > lo) {
            return Err(Error::Numerical(format!(
                "histogram needs bins > 0 and an increasing range, got {bins} over {range:?}"
            )));
        }
        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
        let mut counts = vec![0.0; bins];
        for &v in values {
            if let Some(i) = bin_index(v, lo, hi, bins) {
                counts[i] += 1.0;
            }
        }
        Ok(Self { edges, counts })
    }

    /// Histogram over the data's own range.
    pub fn auto(values: &[f64], bins: usize) -> Result<Self> {
        let (lo, hi) = finite_range(values)
            .ok_or_else(|| Error::Numerical("histogram of no finite values".into()))?;
        Self::new(values, bins, widened((lo, hi)))
    }

    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Normalised so the histogram integrates to one.
    #[must_use]
    pub fn density(&self) -> Self {
        let total = self.total();
        let counts = self
            .counts
            .iter()
            .zip(self.edges.windows(2))
            .map(|(c, w)| if total > 0.0 { c / (total * (w[1] - w[0])) } else { 0.0 })
            .collect();
        Self {
            edges: self.edges.clone(),
            counts,
        }
    }

    /// Running sum of the bins, normalised to end at one.
    #[must_use]
    pub fn cumulative(&self) -> Self {
        let total = self.total();
        let mut acc = 0.0;
        let counts = self
            .counts
            .iter()
            .map(|c| {
                acc += c;
                if total > 0.0 { acc / total } else { 0.0 }
            })
            .collect();
        Self {
            edges: self.edges.clone(),
            counts,
        }
    }
}

fn bin_index(v: f64, lo: f64, hi: f64, bins: usize) -> Option<usize> {
    if !(v >= lo && v <= hi) {
        return None;
    }
    let i = ((v - lo) / (hi - lo) * bins as f64) as usize;
    Some(i.min(bins - 1))
}

pub fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Joint histogram of `(x, y)` as a surface over bin centres.
pub fn histogram2d(
    x: &[f64],
    y: &[f64],
    bins: (usize, usize),
    range: ((f64, f64), (f64, f64)),
) -> Result<Surface2> {
    let (nx, ny) = bins;
    let ((x0, x1), (y0, y1)) = range;
    let hx = Histogram::new(&[], nx, (x0, x1))?;
    let hy = Histogram::new(&[], ny, (y0, y1))?;
    let mut counts = vec![0.0; nx * ny];
    for (&xv, &yv) in x.iter().zip(y) {
        if let (Some(ix), Some(iy)) = (bin_index(xv, x0, x1, nx), bin_index(yv, y0, y1, ny)) {
            counts[iy * nx + ix] += 1.0;
        }
    }
    Ok(Surface2::new(
        Grid::from_points(hx.centers())?,
        Grid::from_points(hy.centers())?,
        counts,
    )?)
}

// ---------------------------------------------------------------------------
// Scatter + contour
// ---------------------------------------------------------------------------

/// A range of identical values becomes one unit wide.
fn widened((lo, hi): (f64, f64)) -> (f64, f64) {
    if hi > lo { (lo, hi) } else { (lo, lo + 1.0) }
}

/// Dense regions summarised as filled contours of the (log) counts; sparse
/// regions kept as individual points.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterContour {
    pub counts: Surface2,
    pub levels: Vec<f64>,
    /// Boundary of the dense region at the threshold level.
    pub outline: Vec<Segment>,
    /// Points in bins below the threshold.
    pub sparse: Sample,
}

pub fn scatter_contour(
    x: &[f64],
    y: &[f64],
    threshold: f64,
    bins: usize,
    n_levels: usize,
    log_counts: bool,
) -> Result<ScatterContour> {
    let rx = finite_range(x).ok_or_else(|| Error::Numerical("no finite x values".into()))?;
    let ry = finite_range(y).ok_or_else(|| Error::Numerical("no finite y values".into()))?;
    let (rx, ry) = (widened(rx), widened(ry));
    let raw = histogram2d(x, y, (bins, bins), (rx, ry))?;

    let (counts, threshold) = if log_counts {
        (raw.map(|c| (1.0 + c).log10()), (1.0 + threshold).log10())
    } else {
        (raw.clone(), threshold)
    };
    let top = counts.max();
    let levels = if top > threshold {
        crate::data::model::linspace(threshold, top, n_levels.max(2))
    } else {
        vec![threshold]
    };
    let outline = marching_squares(&counts, threshold);

    let (mut sx, mut sy) = (Vec::new(), Vec::new());
    for (&xv, &yv) in x.iter().zip(y) {
        let dense = match (bin_index(xv, rx.0, rx.1, bins), bin_index(yv, ry.0, ry.1, bins)) {
            (Some(ix), Some(iy)) => counts.at(ix, iy) >= threshold,
            _ => false,
        };
        if !dense {
            sx.push(xv);
            sy.push(yv);
        }
    }
    log::debug!("scatter_contour: {} of {} points outside the dense region", sx.len(), x.len());
    Ok(ScatterContour {
        counts,
        levels,
        outline,
        sparse: Sample::new(sx, sy)?,
    })
}

// ---------------------------------------------------------------------------
// Kernel and nearest-neighbour densities
// ---------------------------------------------------------------------------

/// Gaussian kernel density estimate with bandwidth `h`, normalised to
/// integrate to one.
pub fn gaussian_kde(points: &PointSet, h: f64, x: &Grid, y: &Grid) -> Result<Surface2> {
    check_2d(points)?;
    let norm = 1.0 / (2.0 * PI * h * h * points.len() as f64);
    let inv = 1.0 / (2.0 * h * h);
    Ok(Surface2::from_fn(x, y, |xv, yv| {
        points
            .iter()
            .map(|p| (-((p[0] - xv).powi(2) + (p[1] - yv).powi(2)) * inv).exp())
            .sum::<f64>()
            * norm
    }))
}

/// Bayesian k-nearest-neighbour density:
/// `k(k+1)/2 / (π Σ_j d_j²) / N` with `d_j` the distance to the j-th
/// neighbour. `Σ_j d_j²` is floored at ε² so grid points on top of `k`
/// duplicates stay finite.
pub fn knn_density(points: &PointSet, k: usize, x: &Grid, y: &Grid) -> Result<Surface2> {
    check_2d(points)?;
    if k == 0 || k > points.len() {
        return Err(Error::Numerical(format!(
            "k = {k} neighbours requested from {} points",
            points.len()
        )));
    }
    let kf = k as f64;
    let n = points.len() as f64;
    Ok(Surface2::from_fn(x, y, |xv, yv| {
        let sum_sq: f64 = points.nearest(&[xv, yv], k).iter().map(|(_, d2)| d2).sum();
        let sum_sq = sum_sq.max(f64::EPSILON * f64::EPSILON);
        0.5 * kf * (kf + 1.0) / (PI * sum_sq) / n
    }))
}

fn check_2d(points: &PointSet) -> Result<()> {
    if points.dim() != 2 || points.is_empty() {
        return Err(Error::Numerical(format!(
            "2-D density needs a non-empty 2-D point set, got {} points in {} dimensions",
            points.len(),
            points.dim()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn histogram_counts_and_edges() {
        let h = Histogram::new(&[0.0, 0.5, 1.0, 1.5, 2.0, 3.0], 2, (0.0, 2.0)).unwrap();
        assert_eq!(h.counts, vec![2.0, 3.0]);
        assert_eq!(h.centers(), vec![0.5, 1.5]);
        let d = h.density();
        assert_relative_eq!(d.counts.iter().sum::<f64>(), 1.0);
        assert_eq!(h.cumulative().counts, vec![0.4, 1.0]);
    }

    #[test]
    fn histogram2d_shape_follows_bins() {
        for (nx, ny) in [(1, 1), (3, 7), (40, 40)] {
            let s = histogram2d(&[0.5], &[0.5], (nx, ny), ((0.0, 1.0), (0.0, 1.0))).unwrap();
            assert_eq!(s.shape(), (ny, nx));
            assert_eq!(s.values().iter().sum::<f64>(), 1.0);
        }
    }

    #[test]
    fn kde_integrates_to_one() {
        let xs = [0.0, 1.0];
        let ys = [0.0, -1.0];
        let pts = PointSet::from_columns(&[&xs, &ys]).unwrap();
        let gx = Grid::linspace(-20.0, 20.0, 201).unwrap();
        let gy = Grid::linspace(-20.0, 20.0, 201).unwrap();
        let kde = gaussian_kde(&pts, 2.0, &gx, &gy).unwrap();
        let cell = gx.step() * gy.step();
        assert_relative_eq!(kde.values().iter().sum::<f64>() * cell, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn knn_density_peaks_in_cluster() {
        let xs: Vec<f64> = (0..50).map(|i| (i % 7) as f64 * 0.1).collect();
        let ys: Vec<f64> = (0..50).map(|i| (i % 5) as f64 * 0.1).collect();
        let pts = PointSet::from_columns(&[&xs, &ys]).unwrap();
        let g = Grid::linspace(-5.0, 5.0, 11).unwrap();
        let dens = knn_density(&pts, 5, &g, &g).unwrap();
        assert_eq!(dens.shape(), (11, 11));
        assert!(dens.at(5, 5) > dens.at(0, 0));
        assert!(knn_density(&pts, 51, &g, &g).is_err());
    }

    #[test]
    fn knn_density_on_duplicates_is_finite() {
        let xs = [1.0, 1.0, 1.0, 4.0];
        let ys = [2.0, 2.0, 2.0, 0.0];
        let pts = PointSet::from_columns(&[&xs, &ys]).unwrap();
        let gx = Grid::linspace(0.0, 4.0, 5).unwrap();
        let gy = Grid::linspace(0.0, 4.0, 5).unwrap();
        let dens = knn_density(&pts, 3, &gx, &gy).unwrap();
        assert!(dens.values().iter().all(|v| v.is_finite() && *v > 0.0));
        assert!(dens.at(1, 2) > dens.at(4, 4));
    }

    #[test]
    fn scatter_contour_splits_dense_and_sparse() {
        let mut x = vec![0.0; 500];
        let mut y = vec![0.0; 500];
        x.extend([5.0, -5.0]);
        y.extend([5.0, -5.0]);
        let sc = scatter_contour(&x, &y, 10.0, 10, 5, true).unwrap();
        assert_eq!(sc.sparse.len(), 2);
        assert_eq!(sc.counts.shape(), (10, 10));
        assert!(sc.levels.len() >= 2);
    }

    #[test]
    fn scatter_contour_accepts_constant_column() {
        let x = vec![3.0; 40];
        let y: Vec<f64> = (0..40).map(|i| i as f64 * 0.1).collect();
        let sc = scatter_contour(&x, &y, 100.0, 8, 5, false).unwrap();
        assert_eq!(sc.counts.shape(), (8, 8));
        assert_eq!(sc.sparse.len(), 40);
        assert_eq!(sc.counts.values().iter().sum::<f64>(), 40.0);
    }
}
