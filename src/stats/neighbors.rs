//! Brute-force nearest-neighbour queries in low dimensions.

use crate::error::{Error, Result};

/// Points in `D` dimensions stored row by row.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    dim: usize,
    coords: Vec<f64>,
}

impl PointSet {
    /// Build from per-dimension columns of equal length.
    pub fn from_columns(columns: &[&[f64]]) -> Result<Self> {
        let dim = columns.len();
        let n = columns.first().map_or(0, |c| c.len());
        if dim == 0 || columns.iter().any(|c| c.len() != n) {
            return Err(Error::Numerical(
                "point set needs at least one column and equal column lengths".into(),
            ));
        }
        let mut coords = Vec::with_capacity(n * dim);
        for i in 0..n {
            coords.extend(columns.iter().map(|c| c[i]));
        }
        Ok(Self { dim, coords })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.coords.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn point(&self, i: usize) -> &[f64] {
        &self.coords[i * self.dim..(i + 1) * self.dim]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.coords.chunks_exact(self.dim)
    }

    fn sq_dist(&self, i: usize, q: &[f64]) -> f64 {
        self.point(i).iter().zip(q).map(|(a, b)| (a - b).powi(2)).sum()
    }

    /// Indices and squared distances of the `k` nearest points to `q`,
    /// nearest first.
    pub fn nearest(&self, q: &[f64], k: usize) -> Vec<(usize, f64)> {
        let mut all: Vec<(usize, f64)> = (0..self.len()).map(|i| (i, self.sq_dist(i, q))).collect();
        let k = k.min(all.len());
        if k == 0 {
            return Vec::new();
        }
        if k < all.len() {
            all.select_nth_unstable_by(k - 1, |a, b| a.1.total_cmp(&b.1));
            all.truncate(k);
        }
        all.sort_by(|a, b| a.1.total_cmp(&b.1));
        all
    }
}

/// k-nearest-neighbour regression: the mean target of the `k` closest
/// training points.
#[derive(Debug, Clone)]
pub struct KNeighborsRegressor {
    k: usize,
    train: PointSet,
    target: Vec<f64>,
}

impl KNeighborsRegressor {
    pub fn fit(train: PointSet, target: Vec<f64>, k: usize) -> Result<Self> {
        if train.len() != target.len() || train.is_empty() || k == 0 {
            return Err(Error::Numerical(format!(
                "k-NN regression with {} points, {} targets and k = {k}",
                train.len(),
                target.len()
            )));
        }
        Ok(Self { k, train, target })
    }

    pub fn predict(&self, queries: &PointSet) -> Result<Vec<f64>> {
        if queries.dim() != self.train.dim() {
            return Err(Error::Numerical(format!(
                "query dimension {} does not match training dimension {}",
                queries.dim(),
                self.train.dim()
            )));
        }
        Ok(queries
            .iter()
            .map(|q| {
                let nn = self.train.nearest(q, self.k);
                nn.iter().map(|(i, _)| self.target[*i]).sum::<f64>() / nn.len() as f64
            })
            .collect())
    }
}

/// Root-mean-square difference between two equally long slices.
pub fn rms(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    (a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>() / n as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_orders_by_distance() {
        let xs = [0.0, 5.0, 1.0, 3.0];
        let ys = [0.0; 4];
        let set = PointSet::from_columns(&[&xs, &ys]).unwrap();
        let nn = set.nearest(&[0.9, 0.0], 2);
        assert_eq!(nn.iter().map(|n| n.0).collect::<Vec<_>>(), vec![2, 0]);
        assert_eq!(set.nearest(&[0.0, 0.0], 10).len(), 4);
    }

    #[test]
    fn one_nn_regression_reproduces_training_targets() {
        let xs = [0.0, 1.0, 2.0];
        let train = PointSet::from_columns(&[&xs]).unwrap();
        let model = KNeighborsRegressor::fit(train.clone(), vec![10.0, 20.0, 30.0], 1).unwrap();
        assert_eq!(model.predict(&train).unwrap(), vec![10.0, 20.0, 30.0]);
        assert_eq!(rms(&[1.0, 3.0], &[1.0, 1.0]), 2f64.sqrt());
    }

    #[test]
    fn ragged_columns_rejected() {
        assert!(PointSet::from_columns(&[&[1.0, 2.0], &[1.0]]).is_err());
    }
}
