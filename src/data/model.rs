use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Shape errors
// ---------------------------------------------------------------------------

/// Raised when arrays that must be aligned disagree in length.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("{what}: expected {expected} values, got {got}")]
    Length {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{what}: grid must contain at least one point")]
    Empty { what: &'static str },
    #[error("unknown column '{0}'")]
    MissingColumn(String),
}

fn check_len(what: &'static str, expected: usize, got: usize) -> Result<(), ShapeError> {
    if expected == got {
        Ok(())
    } else {
        Err(ShapeError::Length { what, expected, got })
    }
}

// ---------------------------------------------------------------------------
// Sample – observations (x, y, optional dy)
// ---------------------------------------------------------------------------

/// An ordered set of observations. Immutable after construction: masking
/// and selection produce new samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    x: Vec<f64>,
    y: Vec<f64>,
    dy: Option<Vec<f64>>,
}

impl Sample {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, ShapeError> {
        check_len("sample y", x.len(), y.len())?;
        Ok(Self { x, y, dy: None })
    }

    pub fn with_errors(x: Vec<f64>, y: Vec<f64>, dy: Vec<f64>) -> Result<Self, ShapeError> {
        check_len("sample y", x.len(), y.len())?;
        check_len("sample dy", x.len(), dy.len())?;
        Ok(Self {
            x,
            y,
            dy: Some(dy),
        })
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn dy(&self) -> Option<&[f64]> {
        self.dy.as_deref()
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Keep the observations whose mask entry is `true`.
    pub fn mask(&self, keep: &[bool]) -> Result<Self, ShapeError> {
        check_len("sample mask", self.len(), keep.len())?;
        let pick = |v: &[f64]| -> Vec<f64> {
            v.iter()
                .zip(keep)
                .filter(|(_, &k)| k)
                .map(|(&v, _)| v)
                .collect()
        };
        Ok(Self {
            x: pick(&self.x),
            y: pick(&self.y),
            dy: self.dy.as_deref().map(pick),
        })
    }

    /// Gather observations by index (used for bootstrap resampling and
    /// sorting by x).
    pub fn select(&self, indices: &[usize]) -> Self {
        let pick = |v: &[f64]| -> Vec<f64> { indices.iter().map(|&i| v[i]).collect() };
        Self {
            x: pick(&self.x),
            y: pick(&self.y),
            dy: self.dy.as_deref().map(pick),
        }
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }
}

// ---------------------------------------------------------------------------
// Grid – evaluation points
// ---------------------------------------------------------------------------

/// A fixed sequence of evaluation points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    points: Vec<f64>,
}

impl Grid {
    pub fn from_points(points: Vec<f64>) -> Result<Self, ShapeError> {
        if points.is_empty() {
            return Err(ShapeError::Empty { what: "grid" });
        }
        Ok(Self { points })
    }

    /// `n` evenly spaced points from `start` to `stop`, both inclusive.
    pub fn linspace(start: f64, stop: f64, n: usize) -> Result<Self, ShapeError> {
        Self::from_points(linspace(start, stop, n))
    }

    /// `n` points spaced evenly in log10, from `10^start` to `10^stop`.
    pub fn logspace(start: f64, stop: f64, n: usize) -> Result<Self, ShapeError> {
        Self::from_points(linspace(start, stop, n).into_iter().map(|e| 10f64.powf(e)).collect())
    }

    /// `start, start + step, ...` strictly below `stop`.
    pub fn arange(start: f64, stop: f64, step: f64) -> Result<Self, ShapeError> {
        Self::from_points(arange(start, stop, step))
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> f64 {
        self.points[0]
    }

    pub fn last(&self) -> f64 {
        self.points[self.points.len() - 1]
    }

    /// Spacing between the first two points (0 for a single point grid).
    pub fn step(&self) -> f64 {
        if self.points.len() < 2 {
            0.0
        } else {
            self.points[1] - self.points[0]
        }
    }

    /// Evaluate `f` at every point, producing an aligned surface.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Surface1 {
        Surface1 {
            grid: self.clone(),
            values: self.points.iter().map(|&x| f(x)).collect(),
        }
    }
}

/// Plain `linspace` for callers that only need the values.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 || stop <= start {
        return Vec::new();
    }
    let n = ((stop - start) / step).ceil() as usize;
    (0..n).map(|i| start + step * i as f64).collect()
}

// ---------------------------------------------------------------------------
// DerivedSurface – values aligned to grids
// ---------------------------------------------------------------------------

/// A 1-D derived quantity aligned to a [`Grid`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface1 {
    grid: Grid,
    values: Vec<f64>,
}

impl Surface1 {
    pub fn new(grid: Grid, values: Vec<f64>) -> Result<Self, ShapeError> {
        check_len("surface", grid.len(), values.len())?;
        Ok(Self { grid, values })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn points(&self) -> Vec<(f64, f64)> {
        self.grid
            .points()
            .iter()
            .copied()
            .zip(self.values.iter().copied())
            .collect()
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// A 2-D derived quantity over (x, y) grids, stored row-major by y:
/// `values[iy * nx + ix]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface2 {
    x: Grid,
    y: Grid,
    values: Vec<f64>,
}

impl Surface2 {
    pub fn new(x: Grid, y: Grid, values: Vec<f64>) -> Result<Self, ShapeError> {
        check_len("2-D surface", x.len() * y.len(), values.len())?;
        Ok(Self { x, y, values })
    }

    /// Evaluate `f(x, y)` over the outer product of the grids.
    pub fn from_fn(x: &Grid, y: &Grid, mut f: impl FnMut(f64, f64) -> f64) -> Self {
        let mut values = Vec::with_capacity(x.len() * y.len());
        for &yv in y.points() {
            for &xv in x.points() {
                values.push(f(xv, yv));
            }
        }
        Self {
            x: x.clone(),
            y: y.clone(),
            values,
        }
    }

    pub fn x(&self) -> &Grid {
        &self.x
    }

    pub fn y(&self) -> &Grid {
        &self.y
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.y.len(), self.x.len())
    }

    pub fn at(&self, ix: usize, iy: usize) -> f64 {
        self.values[iy * self.x.len() + ix]
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            x: self.x.clone(),
            y: self.y.clone(),
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Same grids, new values.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self, ShapeError> {
        Self::new(self.x.clone(), self.y.clone(), values)
    }

    pub fn max(&self) -> f64 {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Grid coordinates of the maximum value.
    pub fn argmax(&self) -> (f64, f64) {
        let mut best = (0, f64::NEG_INFINITY);
        for (i, &v) in self.values.iter().enumerate() {
            if v > best.1 {
                best = (i, v);
            }
        }
        let nx = self.x.len();
        (self.x.points()[best.0 % nx], self.y.points()[best.0 / nx])
    }

    /// Sum along x for every y row.
    pub fn sum_over_x(&self) -> Vec<f64> {
        self.values
            .chunks(self.x.len())
            .map(|row| row.iter().sum())
            .collect()
    }

    /// Sum along y for every x column.
    pub fn sum_over_y(&self) -> Vec<f64> {
        let nx = self.x.len();
        let mut out = vec![0.0; nx];
        for row in self.values.chunks(nx) {
            for (o, v) in out.iter_mut().zip(row) {
                *o += v;
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Table – named numeric columns from an external dataset
// ---------------------------------------------------------------------------

/// A loaded tabular dataset. Every column has the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: BTreeMap<String, Vec<f64>>,
    /// Column names in file order.
    order: Vec<String>,
    rows: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. The first column fixes the row count.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<(), ShapeError> {
        let name = name.into();
        if self.order.is_empty() {
            self.rows = values.len();
        } else {
            check_len("table column", self.rows, values.len())?;
        }
        if !self.columns.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn column(&self, name: &str) -> Result<&[f64], ShapeError> {
        self.columns
            .get(name)
            .map(|v| v.as_slice())
            .ok_or_else(|| ShapeError::MissingColumn(name.to_string()))
    }

    pub fn column_names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// First `n` rows (or all of them if the table is shorter).
    pub fn head(&self, n: usize) -> Self {
        self.slice(0, n.min(self.rows))
    }

    /// Rows `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.rows);
        let start = start.min(end);
        Self {
            columns: self
                .columns
                .iter()
                .map(|(k, v)| (k.clone(), v[start..end].to_vec()))
                .collect(),
            order: self.order.clone(),
            rows: end - start,
        }
    }

    /// Element-wise `a - b` of two columns (colour indices).
    pub fn difference(&self, a: &str, b: &str) -> Result<Vec<f64>, ShapeError> {
        let a = self.column(a)?;
        let b = self.column(b)?;
        Ok(a.iter().zip(b).map(|(a, b)| a - b).collect())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rows × [{}]", self.rows, self.order.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_rejects_mismatched_lengths() {
        let err = Sample::new(vec![1.0, 2.0], vec![1.0]).unwrap_err();
        assert_eq!(
            err,
            ShapeError::Length {
                what: "sample y",
                expected: 2,
                got: 1
            }
        );
        assert!(Sample::with_errors(vec![1.0], vec![1.0], vec![]).is_err());
    }

    #[test]
    fn mask_does_not_touch_original() {
        let s = Sample::with_errors(vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], vec![0.1, 0.2, 0.3])
            .unwrap();
        let m = s.mask(&[true, false, true]).unwrap();
        assert_eq!(m.x(), &[1.0, 3.0]);
        assert_eq!(m.dy().unwrap(), &[0.1, 0.3]);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn grid_shapes_follow_n() {
        for n in [1usize, 2, 7, 70, 1000] {
            let g = Grid::linspace(-1.0, 1.0, n).unwrap();
            assert_eq!(g.len(), n);
            assert_eq!(g.map(|x| x * x).len(), n);

            let s = Surface2::from_fn(&g, &g, |x, y| x + y);
            assert_eq!(s.shape(), (n, n));
            assert_eq!(s.values().len(), n * n);
        }
        assert!(Grid::linspace(0.0, 1.0, 0).is_err());
    }

    #[test]
    fn logspace_endpoints() {
        let g = Grid::logspace(-1.0, 0.0, 5).unwrap();
        assert!((g.first() - 0.1).abs() < 1e-12);
        assert!((g.last() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn surface2_layout_is_row_major_by_y() {
        let x = Grid::from_points(vec![0.0, 1.0, 2.0]).unwrap();
        let y = Grid::from_points(vec![10.0, 20.0]).unwrap();
        let s = Surface2::from_fn(&x, &y, |x, y| x + y);
        assert_eq!(s.at(2, 1), 22.0);
        assert_eq!(s.argmax(), (2.0, 20.0));
        assert_eq!(s.sum_over_x(), vec![33.0, 63.0]);
        assert_eq!(s.sum_over_y(), vec![30.0, 32.0, 34.0]);
        assert!(Surface2::new(x, y, vec![0.0; 5]).is_err());
    }

    #[test]
    fn table_columns_must_align() {
        let mut t = Table::new();
        t.push_column("u", vec![1.0, 2.0]).unwrap();
        t.push_column("g", vec![0.5, 0.5]).unwrap();
        assert!(t.push_column("r", vec![1.0]).is_err());
        assert_eq!(t.difference("u", "g").unwrap(), vec![0.5, 1.5]);
        assert_eq!(t.head(1).len(), 1);
        assert!(matches!(t.column("z"), Err(ShapeError::MissingColumn(_))));
    }
}
