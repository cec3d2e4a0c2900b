//! Backend-independent figure description.
//!
//! Pipelines describe what to draw; [`render`] rasterises it to PNG with
//! plotters and the viewer draws the same description with egui_plot.
//!
//! ```text
//!  Figure (size in inches, rows × cols)
//!    └─ Panel (cell + span, axes, texts)
//!         └─ Layer (line, scatter, heat map, ...)
//! ```

pub mod render;

use crate::color::{Colormap, Rgb};
use crate::data::model::Surface2;
use crate::stats::contour::Segment;

// ---------------------------------------------------------------------------
// Styles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dash {
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub color: Rgb,
    pub width: f64,
    pub dash: Dash,
}

impl LineStyle {
    pub const fn solid(color: Rgb) -> Self {
        Self {
            color,
            width: 1.0,
            dash: Dash::Solid,
        }
    }

    pub const fn dashed(color: Rgb) -> Self {
        Self {
            color,
            width: 1.0,
            dash: Dash::Dashed,
        }
    }

    pub const fn dotted(color: Rgb) -> Self {
        Self {
            color,
            width: 1.0,
            dash: Dash::Dotted,
        }
    }

    #[must_use]
    pub const fn width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }
}

impl Default for LineStyle {
    fn default() -> Self {
        Self::solid(Rgb::BLACK)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Single pixel.
    Pixel,
    Dot,
    Circle,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub color: Rgb,
    pub alpha: f32,
}

impl Fill {
    pub const fn new(color: Rgb, alpha: f32) -> Self {
        Self { color, alpha }
    }
}

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

/// Mapping from surface values to the colour map.
#[derive(Debug, Clone, PartialEq)]
pub enum Norm {
    Linear { vmin: f64, vmax: f64 },
    /// Logarithmic; non-positive values are left blank.
    Log { vmin: f64, vmax: f64 },
    /// Discrete bands between consecutive levels; values outside all bands
    /// are left blank. Band `i` takes colour `i / (bands - 1)`.
    Levels(Vec<f64>),
}

impl Norm {
    /// Position in `[0, 1]` along the colour map, `None` for blank cells.
    pub fn position(&self, v: f64) -> Option<f64> {
        if !v.is_finite() {
            return None;
        }
        match self {
            Norm::Linear { vmin, vmax } => {
                let span = vmax - vmin;
                Some(if span > 0.0 { ((v - vmin) / span).clamp(0.0, 1.0) } else { 0.0 })
            }
            Norm::Log { vmin, vmax } => {
                if v <= 0.0 || *vmin <= 0.0 {
                    return None;
                }
                let (lo, hi) = (vmin.log10(), vmax.log10());
                let span = hi - lo;
                Some(if span > 0.0 { ((v.log10() - lo) / span).clamp(0.0, 1.0) } else { 0.0 })
            }
            Norm::Levels(levels) => {
                let bands = levels.len().checked_sub(1)?;
                let band = levels.windows(2).position(|w| v >= w[0] && v <= w[1])?;
                Some(if bands > 1 { band as f64 / (bands - 1) as f64 } else { 1.0 })
            }
        }
    }

    /// Linear or log range spanning the finite (positive, for log) values
    /// of a surface.
    pub fn auto(values: &[f64], log: bool) -> Self {
        let finite = values.iter().copied().filter(|v| v.is_finite() && (!log || *v > 0.0));
        let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (1.0, 10.0) };
        if log {
            Norm::Log { vmin: lo, vmax: hi }
        } else {
            Norm::Linear { vmin: lo, vmax: hi }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub center: (f64, f64),
    /// Full widths along the ellipse's own axes.
    pub width: f64,
    pub height: f64,
    /// Rotation of the width axis, radians counter-clockwise.
    pub angle: f64,
}

impl Ellipse {
    /// Outline as a closed polygon.
    pub fn outline(&self, n: usize) -> Vec<(f64, f64)> {
        let (s, c) = self.angle.sin_cos();
        (0..=n)
            .map(|i| {
                let t = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
                let (u, v) = (0.5 * self.width * t.cos(), 0.5 * self.height * t.sin());
                (self.center.0 + c * u - s * v, self.center.1 + s * u + c * v)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: (f64, f64),
    pub max: (f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrow {
    pub from: (f64, f64),
    pub to: (f64, f64),
    /// Heads at both ends.
    pub double: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Line {
        points: Vec<(f64, f64)>,
        style: LineStyle,
        label: Option<String>,
    },
    Scatter {
        points: Vec<(f64, f64)>,
        marker: Marker,
        /// Marker diameter in points.
        size: f64,
        color: Rgb,
        label: Option<String>,
    },
    /// Vertical error bars: `y - lower` to `y + upper`.
    ErrorBars {
        points: Vec<(f64, f64)>,
        lower: Vec<f64>,
        upper: Vec<f64>,
        color: Rgb,
        bar_color: Rgb,
        marker: Option<Marker>,
    },
    Histogram {
        edges: Vec<f64>,
        counts: Vec<f64>,
        /// Filled bars when set, outline steps otherwise.
        fill: Option<Fill>,
        style: LineStyle,
        label: Option<String>,
    },
    Heatmap {
        surface: Surface2,
        colormap: Colormap,
        norm: Norm,
        alpha: f32,
        /// Label of the colour bar; no colour bar when `None`.
        colorbar: Option<String>,
    },
    /// Pre-computed contour segments.
    Segments {
        segments: Vec<Segment>,
        style: LineStyle,
    },
    Ellipses {
        ellipses: Vec<Ellipse>,
        fill: Option<Fill>,
        stroke: Option<LineStyle>,
    },
    /// Closed polygons in data coordinates.
    Polygons {
        polygons: Vec<Vec<(f64, f64)>>,
        fill: Option<Fill>,
        stroke: Option<LineStyle>,
    },
    Rects {
        rects: Vec<Rect>,
        fill: Option<Fill>,
        stroke: Option<LineStyle>,
    },
    FillBetween {
        x: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
        fill: Fill,
        label: Option<String>,
    },
    Arrows {
        arrows: Vec<Arrow>,
        style: LineStyle,
    },
}

impl Layer {
    pub fn line(points: Vec<(f64, f64)>, style: LineStyle) -> Self {
        Layer::Line {
            points,
            style,
            label: None,
        }
    }

    pub fn line_xy(x: &[f64], y: &[f64], style: LineStyle) -> Self {
        Self::line(x.iter().copied().zip(y.iter().copied()).collect(), style)
    }

    pub fn scatter(points: Vec<(f64, f64)>, marker: Marker, size: f64, color: Rgb) -> Self {
        Layer::Scatter {
            points,
            marker,
            size,
            color,
            label: None,
        }
    }

    pub fn scatter_xy(x: &[f64], y: &[f64], marker: Marker, size: f64, color: Rgb) -> Self {
        Self::scatter(x.iter().copied().zip(y.iter().copied()).collect(), marker, size, color)
    }

    /// Horizontal line segment across `[x0, x1]` at height `y`.
    pub fn hline(y: f64, x0: f64, x1: f64, style: LineStyle) -> Self {
        Self::line(vec![(x0, y), (x1, y)], style)
    }

    pub fn vline(x: f64, y0: f64, y1: f64, style: LineStyle) -> Self {
        Self::line(vec![(x, y0), (x, y1)], style)
    }

    pub fn step_histogram(edges: Vec<f64>, counts: Vec<f64>, style: LineStyle) -> Self {
        Layer::Histogram {
            edges,
            counts,
            fill: None,
            style,
            label: None,
        }
    }

    pub fn heatmap(surface: Surface2, colormap: Colormap, norm: Norm) -> Self {
        Layer::Heatmap {
            surface,
            colormap,
            norm,
            alpha: 1.0,
            colorbar: None,
        }
    }

    /// Attach a legend label to layers that can carry one.
    #[must_use]
    pub fn labeled(mut self, text: &str) -> Self {
        match &mut self {
            Layer::Line { label, .. }
            | Layer::Scatter { label, .. }
            | Layer::Histogram { label, .. }
            | Layer::FillBetween { label, .. } => *label = Some(text.to_string()),
            _ => {}
        }
        self
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Layer::Line { label, .. }
            | Layer::Scatter { label, .. }
            | Layer::Histogram { label, .. }
            | Layer::FillBetween { label, .. } => label.as_deref(),
            _ => None,
        }
    }

    /// Data extent `(xmin, xmax, ymin, ymax)` over finite values.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut b = Bounds::empty();
        match self {
            Layer::Line { points, .. } | Layer::Scatter { points, .. } => {
                points.iter().for_each(|&p| b.include(p));
            }
            Layer::ErrorBars {
                points,
                lower,
                upper,
                ..
            } => {
                for ((&(x, y), lo), hi) in points.iter().zip(lower).zip(upper) {
                    b.include((x, y - lo));
                    b.include((x, y + hi));
                }
            }
            Layer::Histogram { edges, counts, .. } => {
                for (w, &c) in edges.windows(2).zip(counts) {
                    b.include((w[0], 0.0));
                    b.include((w[1], c));
                }
            }
            Layer::Heatmap { surface, .. } => {
                let ex = cell_edges(surface.x().points());
                let ey = cell_edges(surface.y().points());
                b.include((ex[0], ey[0]));
                b.include((ex[ex.len() - 1], ey[ey.len() - 1]));
            }
            Layer::Segments { segments, .. } => {
                for s in segments {
                    b.include(s.start);
                    b.include(s.end);
                }
            }
            Layer::Ellipses { ellipses, .. } => {
                for e in ellipses {
                    e.outline(16).into_iter().for_each(|p| b.include(p));
                }
            }
            Layer::Polygons { polygons, .. } => {
                polygons.iter().flatten().for_each(|&p| b.include(p));
            }
            Layer::Rects { rects, .. } => {
                for r in rects {
                    b.include(r.min);
                    b.include(r.max);
                }
            }
            Layer::FillBetween { x, lower, upper, .. } => {
                for ((&xv, &lo), &hi) in x.iter().zip(lower).zip(upper) {
                    b.include((xv, lo));
                    b.include((xv, hi));
                }
            }
            Layer::Arrows { arrows, .. } => {
                for a in arrows {
                    b.include(a.from);
                    b.include(a.to);
                }
            }
        }
        b.finite()
    }
}

/// Cell boundaries around grid points: midpoints between neighbours,
/// extended by half a spacing at both ends. Returns `n + 1` edges.
pub fn cell_edges(points: &[f64]) -> Vec<f64> {
    match points {
        [] => vec![0.0],
        [p] => vec![p - 0.5, p + 0.5],
        _ => {
            let n = points.len();
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(points[0] - 0.5 * (points[1] - points[0]));
            edges.extend(points.windows(2).map(|w| 0.5 * (w[0] + w[1])));
            edges.push(points[n - 1] + 0.5 * (points[n - 1] - points[n - 2]));
            edges
        }
    }
}

/// Running bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: (f64, f64),
    pub y: (f64, f64),
}

impl Bounds {
    fn empty() -> Self {
        Self {
            x: (f64::INFINITY, f64::NEG_INFINITY),
            y: (f64::INFINITY, f64::NEG_INFINITY),
        }
    }

    fn include(&mut self, (x, y): (f64, f64)) {
        if x.is_finite() && y.is_finite() {
            self.x = (self.x.0.min(x), self.x.1.max(x));
            self.y = (self.y.0.min(y), self.y.1.max(y));
        }
    }

    fn finite(self) -> Option<Self> {
        (self.x.0 <= self.x.1 && self.y.0 <= self.y.1).then_some(self)
    }

    fn union(self, other: Self) -> Self {
        Self {
            x: (self.x.0.min(other.x.0), self.x.1.max(other.x.1)),
            y: (self.y.0.min(other.y.0), self.y.1.max(other.y.1)),
        }
    }
}

// ---------------------------------------------------------------------------
// Axes and text
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Linear,
    Log,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub label: String,
    pub range: Option<(f64, f64)>,
    pub scale: Scale,
    /// Tick labels drawn.
    pub tick_labels: bool,
}

impl Default for Axis {
    fn default() -> Self {
        Self {
            label: String::new(),
            range: None,
            scale: Scale::Linear,
            tick_labels: true,
        }
    }
}

impl Axis {
    /// Map a data value into the drawing space (log10 for log axes).
    pub fn forward(&self, v: f64) -> Option<f64> {
        match self.scale {
            Scale::Linear => v.is_finite().then_some(v),
            Scale::Log => (v > 0.0 && v.is_finite()).then(|| v.log10()),
        }
    }

    /// Tick label for a position in drawing space. Log axes label whole
    /// decades only.
    pub fn tick_label(&self, v: f64) -> String {
        if !self.tick_labels {
            return String::new();
        }
        match self.scale {
            Scale::Linear => format_tick(v),
            Scale::Log if (v - v.round()).abs() < 1e-6 => format!("10^{}", v.round() as i64),
            Scale::Log => String::new(),
        }
    }
}

/// Compact number formatting for tick labels.
pub fn format_tick(v: f64) -> String {
    if v == 0.0 || !v.is_finite() {
        return if v.is_finite() { "0".to_string() } else { String::new() };
    }
    let a = v.abs();
    if !(1e-3..1e5).contains(&a) {
        return format!("{v:.1e}");
    }
    let s = format!("{v:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// A second y axis on the right: a relabelling of the primary range.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryAxis {
    pub label: String,
    /// Values shown at the bottom and top of the primary range.
    pub range: (f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// `(0, 0)` bottom-left of the panel, `(1, 1)` top-right.
    Axes,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

/// Which edge of the text sits on the anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub text: String,
    pub pos: (f64, f64),
    pub anchor: Anchor,
    pub h_align: HAlign,
    pub v_align: VAlign,
    pub color: Rgb,
    /// Drawn on a white box.
    pub boxed: bool,
    /// Relative to the figure's base font size.
    pub scale: f64,
}

impl Text {
    pub fn axes(text: &str, x: f64, y: f64) -> Self {
        Self {
            text: text.to_string(),
            pos: (x, y),
            anchor: Anchor::Axes,
            h_align: HAlign::Left,
            v_align: VAlign::Top,
            color: Rgb::BLACK,
            boxed: false,
            scale: 1.0,
        }
    }

    pub fn data(text: &str, x: f64, y: f64) -> Self {
        Self {
            anchor: Anchor::Data,
            v_align: VAlign::Center,
            ..Self::axes(text, x, y)
        }
    }

    #[must_use]
    pub fn align(mut self, h: HAlign, v: VAlign) -> Self {
        self.h_align = h;
        self.v_align = v;
        self
    }

    #[must_use]
    pub fn boxed(mut self) -> Self {
        self.boxed = true;
        self
    }

    #[must_use]
    pub fn color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn scaled(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }
}

// ---------------------------------------------------------------------------
// Panels and figures
// ---------------------------------------------------------------------------

/// Grid cell occupied by a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub row_span: usize,
    pub col_span: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub cell: Cell,
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub y2: Option<SecondaryAxis>,
    pub legend: bool,
    /// Axes frame and ticks drawn.
    pub frame: bool,
    pub grid_lines: bool,
    pub layers: Vec<Layer>,
    pub texts: Vec<Text>,
}

impl Panel {
    pub fn new(row: usize, col: usize) -> Self {
        Self {
            cell: Cell {
                row,
                col,
                row_span: 1,
                col_span: 1,
            },
            title: None,
            x: Axis::default(),
            y: Axis::default(),
            y2: None,
            legend: false,
            frame: true,
            grid_lines: false,
            layers: Vec::new(),
            texts: Vec::new(),
        }
    }

    #[must_use]
    pub fn span(mut self, rows: usize, cols: usize) -> Self {
        self.cell.row_span = rows.max(1);
        self.cell.col_span = cols.max(1);
        self
    }

    #[must_use]
    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    #[must_use]
    pub fn xlabel(mut self, label: &str) -> Self {
        self.x.label = label.to_string();
        self
    }

    #[must_use]
    pub fn ylabel(mut self, label: &str) -> Self {
        self.y.label = label.to_string();
        self
    }

    #[must_use]
    pub fn xlim(mut self, lo: f64, hi: f64) -> Self {
        self.x.range = Some((lo, hi));
        self
    }

    #[must_use]
    pub fn ylim(mut self, lo: f64, hi: f64) -> Self {
        self.y.range = Some((lo, hi));
        self
    }

    #[must_use]
    pub fn xlog(mut self) -> Self {
        self.x.scale = Scale::Log;
        self
    }

    #[must_use]
    pub fn ylog(mut self) -> Self {
        self.y.scale = Scale::Log;
        self
    }

    /// Hide the tick labels of the x axis (shared axis in a stack).
    #[must_use]
    pub fn hide_xticks(mut self) -> Self {
        self.x.tick_labels = false;
        self
    }

    #[must_use]
    pub fn hide_yticks(mut self) -> Self {
        self.y.tick_labels = false;
        self
    }

    /// No frame, ticks or labels: a free drawing area.
    #[must_use]
    pub fn frameless(mut self) -> Self {
        self.frame = false;
        self.x.tick_labels = false;
        self.y.tick_labels = false;
        self
    }

    #[must_use]
    pub fn secondary_y(mut self, label: &str, range: (f64, f64)) -> Self {
        self.y2 = Some(SecondaryAxis {
            label: label.to_string(),
            range,
        });
        self
    }

    #[must_use]
    pub fn legend(mut self) -> Self {
        self.legend = true;
        self
    }

    #[must_use]
    pub fn grid(mut self) -> Self {
        self.grid_lines = true;
        self
    }

    #[must_use]
    pub fn layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    #[must_use]
    pub fn layers(mut self, layers: impl IntoIterator<Item = Layer>) -> Self {
        self.layers.extend(layers);
        self
    }

    #[must_use]
    pub fn text(mut self, text: Text) -> Self {
        self.texts.push(text);
        self
    }

    /// A data point in drawing space, `None` if it cannot be shown on
    /// this panel's axes.
    pub fn project(&self, (x, y): (f64, f64)) -> Option<(f64, f64)> {
        Some((self.x.forward(x)?, self.y.forward(y)?))
    }

    /// Project a polyline, breaking it wherever a point cannot be shown.
    pub fn project_runs(&self, points: &[(f64, f64)]) -> Vec<Vec<(f64, f64)>> {
        let mut runs = vec![Vec::new()];
        for &p in points {
            match self.project(p) {
                Some(q) => {
                    if let Some(run) = runs.last_mut() {
                        run.push(q);
                    }
                }
                None => {
                    if runs.last().is_some_and(|r| !r.is_empty()) {
                        runs.push(Vec::new());
                    }
                }
            }
        }
        runs.retain(|r| !r.is_empty());
        runs
    }

    /// Union of the layers' data extents.
    pub fn data_bounds(&self) -> Option<Bounds> {
        self.layers
            .iter()
            .filter_map(Layer::bounds)
            .reduce(Bounds::union)
    }

    /// Axis ranges in drawing space: explicit limits when set, otherwise
    /// the data extent with a 5% margin.
    pub fn view(&self) -> ((f64, f64), (f64, f64)) {
        let data = self.data_bounds();
        let resolve = |axis: &Axis, data: Option<(f64, f64)>| -> (f64, f64) {
            let (lo, hi) = match (axis.range, data) {
                (Some(r), _) => r,
                (None, Some((lo, hi))) => {
                    if axis.scale == Scale::Log {
                        (lo.max(f64::MIN_POSITIVE), hi)
                    } else {
                        let pad = if hi > lo { 0.05 * (hi - lo) } else { 0.5 };
                        (lo - pad, hi + pad)
                    }
                }
                (None, None) => (0.0, 1.0),
            };
            let lo_t = axis.forward(lo).unwrap_or(0.0);
            let hi_t = axis.forward(hi).unwrap_or(lo_t + 1.0);
            if hi_t > lo_t {
                (lo_t, hi_t)
            } else if hi_t < lo_t {
                (hi_t, lo_t)
            } else {
                (lo_t - 0.5, hi_t + 0.5)
            }
        };
        (
            resolve(&self.x, data.map(|b| b.x)),
            resolve(&self.y, data.map(|b| b.y)),
        )
    }
}

/// One rendered figure.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    /// Output stem, unique across the gallery.
    pub id: String,
    /// Width and height in inches.
    pub size: (f64, f64),
    pub title: Option<String>,
    /// Layout grid as `(rows, cols)`.
    pub grid: (usize, usize),
    pub panels: Vec<Panel>,
}

impl Figure {
    pub fn new(id: &str, width: f64, height: f64) -> Self {
        Self {
            id: id.to_string(),
            size: (width, height),
            title: None,
            grid: (1, 1),
            panels: Vec::new(),
        }
    }

    #[must_use]
    pub fn grid(mut self, rows: usize, cols: usize) -> Self {
        self.grid = (rows.max(1), cols.max(1));
        self
    }

    #[must_use]
    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    #[must_use]
    pub fn panel(mut self, panel: Panel) -> Self {
        self.panels.push(panel);
        self
    }

    /// Total number of drawable layers, for logging and tests.
    pub fn layer_count(&self) -> usize {
        self.panels.iter().map(|p| p.layers.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Grid;

    #[test]
    fn levels_norm_bands() {
        let norm = Norm::Levels(vec![0.0, 0.683, 0.955, 0.997]);
        assert_eq!(norm.position(0.5), Some(0.0));
        assert_eq!(norm.position(0.9), Some(0.5));
        assert_eq!(norm.position(0.99), Some(1.0));
        assert_eq!(norm.position(0.999), None);
        assert_eq!(norm.position(f64::NAN), None);
    }

    #[test]
    fn log_norm_blanks_non_positive() {
        let norm = Norm::auto(&[0.0, 1.0, 100.0], true);
        assert_eq!(norm, Norm::Log { vmin: 1.0, vmax: 100.0 });
        assert_eq!(norm.position(0.0), None);
        assert_eq!(norm.position(10.0), Some(0.5));
    }

    #[test]
    fn view_uses_limits_then_data() {
        let p = Panel::new(0, 0).layer(Layer::line(vec![(0.0, 1.0), (10.0, 3.0)], LineStyle::default()));
        let ((x0, x1), (y0, y1)) = p.view();
        assert!((x0 + 0.5).abs() < 1e-12 && (x1 - 10.5).abs() < 1e-12);
        assert!((y0 - 0.9).abs() < 1e-12 && (y1 - 3.1).abs() < 1e-12);

        let p = p.xlim(0.1, 1000.0).xlog();
        let ((x0, x1), _) = p.view();
        assert!((x0 + 1.0).abs() < 1e-12 && (x1 - 3.0).abs() < 1e-12);
    }

    #[test]
    fn heatmap_bounds_cover_cells() {
        let g = Grid::linspace(0.0, 1.0, 3).unwrap();
        let s = Surface2::from_fn(&g, &g, |x, y| x + y);
        let b = Layer::heatmap(s, Colormap::Binary, Norm::Linear { vmin: 0.0, vmax: 2.0 })
            .bounds()
            .unwrap();
        assert_eq!(b.x, (-0.25, 1.25));
    }

    #[test]
    fn runs_break_at_unplottable_points() {
        let p = Panel::new(0, 0).ylog();
        let runs = p.project_runs(&[(0.0, 1.0), (1.0, 10.0), (2.0, 0.0), (3.0, 100.0), (4.0, 1000.0)]);
        assert_eq!(runs, vec![vec![(0.0, 0.0), (1.0, 1.0)], vec![(3.0, 2.0), (4.0, 3.0)]]);
    }

    #[test]
    fn tick_labels() {
        assert_eq!(format_tick(0.25), "0.25");
        assert_eq!(format_tick(-2.0), "-2");
        assert_eq!(format_tick(2.5e6), "2.5e6");
        let log = Axis {
            scale: Scale::Log,
            ..Axis::default()
        };
        assert_eq!(log.tick_label(3.0), "10^3");
        assert_eq!(log.tick_label(2.5), "");
    }

    #[test]
    fn cell_edges_follow_uneven_spacing() {
        assert_eq!(cell_edges(&[1.0, 2.0, 4.0]), vec![0.5, 1.5, 3.0, 5.0]);
        assert_eq!(cell_edges(&[3.0]), vec![2.5, 3.5]);
    }

    #[test]
    fn ellipse_outline_respects_rotation() {
        let e = Ellipse {
            center: (1.0, 1.0),
            width: 4.0,
            height: 2.0,
            angle: std::f64::consts::FRAC_PI_2,
        };
        let pts = e.outline(4);
        assert!((pts[0].0 - 1.0).abs() < 1e-12);
        assert!((pts[0].1 - 3.0).abs() < 1e-12);
    }

    #[test]
    fn labels_only_on_labelable_layers() {
        let l = Layer::hline(0.0, 0.0, 1.0, LineStyle::default()).labeled("filter");
        assert_eq!(l.label(), Some("filter"));
        let a = Layer::Arrows {
            arrows: vec![],
            style: LineStyle::default(),
        }
        .labeled("x");
        assert_eq!(a.label(), None);
    }
}
