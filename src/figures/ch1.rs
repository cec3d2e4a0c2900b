//! Chapter 1: sky projections and survey scatter plots.

use std::f64::consts::PI;

use anyhow::Result;

use super::{zip_points, Context, FigureInfo, FigurePipeline};
use crate::color::{Colormap, Rgb};
use crate::data::datasets::DatasetKey;
use crate::data::model::linspace;
use crate::figure::{Figure, Fill, Layer, LineStyle, Marker, Norm, Panel};
use crate::stats::density::scatter_contour;
use crate::stats::projection::{graticule, tissot_circle, Projection};

pub(super) fn pipelines() -> Vec<Box<dyn FigurePipeline>> {
    vec![Box::new(Projections), Box::new(S82ScatterContour), Box::new(Dr7Quasar)]
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

struct Projections;

impl FigurePipeline for Projections {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch1-projections",
            chapter: "Chapter 1",
            title: "Sky projections",
            description: "Tissot circles of 10° radius drawn on the Hammer, Aitoff, Mollweide and \
                          Lambert equal-area projections.",
        }
    }

    fn build(&self, _ctx: &Context) -> Result<Vec<Figure>> {
        let lons = linspace(-PI, PI, 13);
        let lats = linspace(-PI / 2.0, PI / 2.0, 7);
        let radius = 10f64.to_radians();
        let circles: Vec<Vec<(f64, f64)>> = lons[1..lons.len() - 1]
            .iter()
            .flat_map(|&lon| lats[1..lats.len() - 1].iter().map(move |&lat| tissot_circle(lon, lat, radius, 48)))
            .collect();
        let grid_lines = graticule(PI / 6.0, PI / 12.0, 120);

        let mut fig = Figure::new("ch1-projections", 5.0, 4.0).grid(2, 2);
        for (i, projection) in Projection::ALL.into_iter().enumerate() {
            let lines = grid_lines
                .iter()
                .flat_map(|line| projection.project_path(line))
                .map(|piece| Layer::line(piece, LineStyle::solid(Rgb::LIGHT_GRAY).width(0.5)));
            let polygons = circles.iter().flat_map(|c| projection.project_path(c)).collect();
            fig = fig.panel(
                Panel::new(i / 2, i % 2)
                    .frameless()
                    .title(&format!("{} projection", projection.name()))
                    .layers(lines)
                    .layer(Layer::Polygons {
                        polygons,
                        fill: Some(Fill::new(Rgb::BLACK, 0.3)),
                        stroke: None,
                    }),
            );
        }
        Ok(vec![fig])
    }
}

// ---------------------------------------------------------------------------
// Stripe 82 standards
// ---------------------------------------------------------------------------

struct S82ScatterContour;

impl FigurePipeline for S82ScatterContour {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch1-s82-scatter-contour",
            chapter: "Chapter 1",
            title: "SDSS Stripe 82 standard stars",
            description: "g−r vs r−i of the Stripe 82 standards: points in sparse regions, filled \
                          contours of the log counts where a 40×40 histogram exceeds 200.",
        }
    }

    fn build(&self, ctx: &Context) -> Result<Vec<Figure>> {
        let data = ctx.load(DatasetKey::S82Standards)?;
        let gr = data.difference("mmu_g", "mmu_r")?;
        let ri = data.difference("mmu_r", "mmu_i")?;
        let sc = scatter_contour(&gr, &ri, 200.0, 40, 10, true)?;

        let panel = Panel::new(0, 0)
            .xlabel("g - r")
            .ylabel("r - i")
            .xlim(-0.6, 2.5)
            .ylim(-0.6, 2.5)
            .layer(Layer::scatter(sc.sparse.points().collect(), Marker::Pixel, 1.0, Rgb::BLACK))
            .layer(Layer::heatmap(sc.counts, Colormap::Bone, Norm::Levels(sc.levels)))
            .layer(Layer::Segments {
                segments: sc.outline,
                style: LineStyle::solid(Rgb::BLACK).width(0.5),
            });
        Ok(vec![Figure::new("ch1-s82-scatter-contour", 5.0, 3.75).panel(panel)])
    }
}

// ---------------------------------------------------------------------------
// DR7 quasars
// ---------------------------------------------------------------------------

struct Dr7Quasar;

impl FigurePipeline for Dr7Quasar {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "ch1-dr7-quasar",
            chapter: "Chapter 1",
            title: "SDSS DR7 quasars",
            description: "r−i colour against redshift for the first 10,000 quasars of the DR7 \
                          catalog; emission lines moving through the bands make the colour wiggle.",
        }
    }

    fn build(&self, ctx: &Context) -> Result<Vec<Figure>> {
        let data = ctx.load(DatasetKey::Dr7Quasar)?.head(10_000);
        let ri = data.difference("mag_r", "mag_i")?;
        let z = data.column("redshift")?;

        let panel = Panel::new(0, 0)
            .xlabel("redshift")
            .ylabel("r - i")
            .xlim(0.0, 5.0)
            .ylim(-0.5, 1.0)
            .layer(Layer::scatter(zip_points(z, &ri), Marker::Dot, 2.0, Rgb::BLACK));
        Ok(vec![Figure::new("ch1-dr7-quasar", 5.0, 3.75).panel(panel)])
    }
}

