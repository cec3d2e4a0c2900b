//! Figure pipelines.
//!
//! Each pipeline is one straight line from a data source through a
//! statistical transform to one or more [`Figure`]s:
//!
//! ```text
//!  Context ─► FigurePipeline::build ─► Vec<Figure> ─► figure::render ─► PNG
//!  (config, datasets, cache)                      └─► ui::plot (viewer)
//! ```

mod ch1;
mod ch10;
mod ch2;
mod ch3;
mod ch4;
mod ch5;
mod ch6;
mod ch7;
mod ch8;
mod survey;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::cache::ResultsCache;
use crate::config::Config;
use crate::data::datasets::{DatasetKey, DatasetStore};
use crate::data::model::{Surface2, Table};
use crate::figure::{render, Ellipse, Figure, Layer, LineStyle};
use crate::stats::contour::contour_levels;
use crate::stats::likelihood::{convert_to_stdev, principal_axes};

// ---------------------------------------------------------------------------
// Pipeline contract
// ---------------------------------------------------------------------------

/// Catalogue entry of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FigureInfo {
    /// Stable identifier, also the output file stem.
    pub id: &'static str,
    /// Grouping shown in the viewer, e.g. "Chapter 10".
    pub chapter: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

/// Shared inputs of every pipeline run.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub datasets: DatasetStore,
    pub cache: ResultsCache,
}

impl Context {
    pub fn new(config: Config) -> Self {
        Self {
            datasets: DatasetStore::new(&config.data_dir),
            cache: ResultsCache::new(&config.cache_dir, config.cache_enabled),
            config,
        }
    }

    pub fn load(&self, key: DatasetKey) -> Result<Table> {
        self.datasets.load(key)
    }
}

pub trait FigurePipeline {
    fn info(&self) -> FigureInfo;

    /// Fetch, transform and lay out. Pure apart from reading datasets and
    /// the results cache.
    fn build(&self, ctx: &Context) -> Result<Vec<Figure>>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Every pipeline, in book order.
pub fn all() -> Vec<Box<dyn FigurePipeline>> {
    let mut out = Vec::new();
    out.extend(ch1::pipelines());
    out.extend(ch2::pipelines());
    out.extend(ch3::pipelines());
    out.extend(ch4::pipelines());
    out.extend(ch5::pipelines());
    out.extend(ch6::pipelines());
    out.extend(ch7::pipelines());
    out.extend(ch8::pipelines());
    out.extend(ch10::pipelines());
    out.extend(survey::pipelines());
    out
}

pub fn find(id: &str) -> Option<Box<dyn FigurePipeline>> {
    all().into_iter().find(|p| p.info().id == id)
}

/// Build a pipeline, with its id attached to any error.
pub fn build(pipeline: &dyn FigurePipeline, ctx: &Context) -> Result<Vec<Figure>> {
    let info = pipeline.info();
    log::info!("Building {}", info.id);
    let figures = pipeline
        .build(ctx)
        .with_context(|| format!("building figure {}", info.id))?;
    log::debug!(
        "{}: {} figure(s), {} layer(s)",
        info.id,
        figures.len(),
        figures.iter().map(Figure::layer_count).sum::<usize>()
    );
    Ok(figures)
}

/// Build a pipeline and write its figures as PNG under the output directory.
pub fn render_pipeline(pipeline: &dyn FigurePipeline, ctx: &Context) -> Result<Vec<PathBuf>> {
    let figures = build(pipeline, ctx)?;
    figures
        .iter()
        .map(|fig| {
            let path = render::output_path(&ctx.config, fig);
            render::save_png(fig, &ctx.config, &path).with_context(|| format!("rendering {}", fig.id))?;
            Ok(path)
        })
        .collect()
}

/// Outcome of rendering the whole gallery.
#[derive(Debug, Default)]
pub struct RenderSummary {
    pub written: Vec<PathBuf>,
    /// `(pipeline id, error chain)` of each failed pipeline.
    pub failed: Vec<(String, String)>,
}

/// Render every pipeline. A failure is logged and the run continues with
/// the next pipeline.
pub fn render_all(ctx: &Context) -> RenderSummary {
    let mut summary = RenderSummary::default();
    for pipeline in all() {
        let id = pipeline.info().id;
        match render_pipeline(pipeline.as_ref(), ctx) {
            Ok(paths) => summary.written.extend(paths),
            Err(e) => {
                log::error!("{id} failed: {e:#}");
                summary.failed.push((id.to_string(), format!("{e:#}")));
            }
        }
    }
    summary
}

// ---------------------------------------------------------------------------
// Small helpers shared by the pipelines
// ---------------------------------------------------------------------------

/// `(x, y)` pairs from two columns.
fn zip_points(x: &[f64], y: &[f64]) -> Vec<(f64, f64)> {
    x.iter().copied().zip(y.iter().copied()).collect()
}

/// Element-wise `f(x)`.
fn map_values(x: &[f64], f: impl Fn(f64) -> f64) -> Vec<f64> {
    x.iter().map(|&v| f(v)).collect()
}

/// Ellipse of a 2×2 covariance `[[vxx, vxy], [vxy, vyy]]` drawn at
/// `scale` standard deviations.
fn covariance_ellipse(center: (f64, f64), v: [[f64; 2]; 2], scale: f64) -> Ellipse {
    let (sx, sy) = (v[0][0].sqrt(), v[1][1].sqrt());
    let rho = if sx > 0.0 && sy > 0.0 { v[0][1] / (sx * sy) } else { 0.0 };
    let (s1, s2, angle) = principal_axes(sx, sy, rho);
    Ellipse {
        center,
        width: 2.0 * scale * s1,
        height: 2.0 * scale * s2,
        angle,
    }
}

/// Enclosed-probability levels of the 1, 2 and 3σ regions.
const SIGMA_LEVELS: [f64; 3] = [0.683, 0.955, 0.997];

/// 1, 2 and 3σ contours of a log-likelihood surface.
fn sigma_contours(log_l: &Surface2, style: LineStyle) -> Result<Layer> {
    let stdev = convert_to_stdev(log_l)?;
    let segments = contour_levels(&stdev, &SIGMA_LEVELS)
        .into_iter()
        .flat_map(|(_, segments)| segments)
        .collect();
    Ok(Layer::Segments { segments, style })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_findable() {
        let pipelines = all();
        let ids: HashSet<&str> = pipelines.iter().map(|p| p.info().id).collect();
        assert_eq!(ids.len(), pipelines.len());
        for id in &ids {
            assert!(find(id).is_some());
        }
        assert!(find("no-such-figure").is_none());
    }

    #[test]
    fn covariance_ellipse_follows_principal_axes() {
        let axis_aligned = covariance_ellipse((1.0, 2.0), [[4.0, 0.0], [0.0, 1.0]], 2.0);
        assert!((axis_aligned.width - 8.0).abs() < 1e-12);
        assert!((axis_aligned.height - 4.0).abs() < 1e-12);
        assert!(axis_aligned.angle.abs() < 1e-12);

        // Equal variances with positive covariance tilt the ellipse by 45°.
        let tilted = covariance_ellipse((0.0, 0.0), [[1.0, 0.5], [0.5, 1.0]], 1.0);
        assert!((tilted.angle - std::f64::consts::FRAC_PI_4).abs() < 1e-9);
        assert!(tilted.width > tilted.height);
    }

    #[test]
    fn catalogue_covers_every_chapter() {
        let chapters: HashSet<&str> = all().iter().map(|p| p.info().chapter).collect();
        for ch in ["Chapter 1", "Chapter 2", "Chapter 3", "Chapter 4", "Chapter 5"] {
            assert!(chapters.contains(ch), "{ch}");
        }
        for ch in ["Chapter 6", "Chapter 7", "Chapter 8", "Chapter 10", "Datasets"] {
            assert!(chapters.contains(ch), "{ch}");
        }
    }
}
