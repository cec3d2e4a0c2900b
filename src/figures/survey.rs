//! Dataset showcases: photometric redshifts and colour-colour diagrams
//! from the SkyServer galaxy sample.

use anyhow::{ensure, Result};

use super::{Context, FigureInfo, FigurePipeline};
use crate::color::Rgb;
use crate::data::datasets::DatasetKey;
use crate::data::filter::{filtered_rows, gather};
use crate::figure::{Figure, HAlign, Layer, LineStyle, Marker, Panel, Text, VAlign};
use crate::stats::neighbors::{rms, KNeighborsRegressor, PointSet};

pub(super) fn pipelines() -> Vec<Box<dyn FigurePipeline>> {
    vec![Box::new(PhotozNeighbors), Box::new(GalaxyColors)]
}

// ---------------------------------------------------------------------------
// Photometric redshifts
// ---------------------------------------------------------------------------

struct PhotozNeighbors;

const Z_LIM: (f64, f64) = (-0.1, 2.5);

impl FigurePipeline for PhotozNeighbors {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "photoz-neighbors",
            chapter: "Datasets",
            title: "Photo-z: nearest neighbour regression",
            description: "Redshifts predicted from u-g, g-r, r-i and i-z by the single nearest \
                          neighbour in the first half of the catalog, against the spectroscopic \
                          redshifts of the second half.",
        }
    }

    fn build(&self, ctx: &Context) -> Result<Vec<Figure>> {
        let data = ctx.load(DatasetKey::SkyserverColors)?;
        let n = data.len();
        ensure!(n >= 2, "photo-z needs at least two galaxies, got {n}");

        let colors = [
            data.difference("u", "g")?,
            data.difference("g", "r")?,
            data.difference("r", "i")?,
            data.difference("i", "z")?,
        ];
        let z = data.column("redshift")?;
        let n_train = n / 2;
        let half = |range: std::ops::Range<usize>| -> Result<PointSet> {
            let columns: Vec<&[f64]> = colors.iter().map(|c| &c[range.clone()]).collect();
            Ok(PointSet::from_columns(&columns)?)
        };

        let knn = KNeighborsRegressor::fit(half(0..n_train)?, z[..n_train].to_vec(), 1)?;
        let z_test = &z[n_train..];
        let z_pred = knn.predict(&half(n_train..n)?)?;
        let error = rms(z_test, &z_pred);
        log::info!("photo-z RMS error = {error:.2}");

        let band = |offset: f64| vec![(Z_LIM.0, Z_LIM.0 + offset), (Z_LIM.1, Z_LIM.1 + offset)];
        let dotted = LineStyle::dotted(Rgb::BLACK);
        let panel = Panel::new(0, 0)
            .title("Photo-z: Nearest Neighbor Regression")
            .xlabel("z_spec")
            .ylabel("z_phot")
            .xlim(Z_LIM.0, Z_LIM.1)
            .ylim(Z_LIM.0, Z_LIM.1)
            .layer(Layer::scatter_xy(z_test, &z_pred, Marker::Dot, 2.0, Rgb::BLACK))
            .layer(Layer::line(band(0.0), LineStyle::dashed(Rgb::BLACK)))
            .layer(Layer::line(band(error), dotted))
            .layer(Layer::line(band(-error), dotted))
            .text(
                Text::axes(&format!("RMS error = {error:.2}"), 0.99, 0.02)
                    .align(HAlign::Right, VAlign::Bottom)
                    .boxed()
                    .scaled(1.5),
            );
        Ok(vec![Figure::new("photoz-neighbors", 5.0, 5.0).panel(panel)])
    }
}

// ---------------------------------------------------------------------------
// Colour-colour diagram
// ---------------------------------------------------------------------------

struct GalaxyColors;

impl FigurePipeline for GalaxyColors {
    fn info(&self) -> FigureInfo {
        FigureInfo {
            id: "sdss-galaxy-colors",
            chapter: "Datasets",
            title: "SDSS galaxy colours",
            description: "u-g against g-r for objects imaged in camera columns 4 and 5.",
        }
    }

    fn build(&self, ctx: &Context) -> Result<Vec<Figure>> {
        let data = ctx.load(DatasetKey::SkyserverColors)?;
        let ug = data.difference("u", "g")?;
        let gr = data.difference("g", "r")?;
        let column = |which: f64| -> Result<Vec<(f64, f64)>> {
            let rows = filtered_rows(&data, "camcol", |c| c == which)?;
            Ok(gather(&ug, &rows).into_iter().zip(gather(&gr, &rows)).collect())
        };

        let panel = Panel::new(0, 0)
            .xlabel("u-g")
            .ylabel("g-r")
            .xlim(-0.5, 2.5)
            .ylim(-0.5, 1.5)
            .legend()
            .layer(Layer::scatter(column(4.0)?, Marker::Dot, 3.0, Rgb::BLUE).labeled("camcol 4"))
            .layer(Layer::scatter(column(5.0)?, Marker::Dot, 3.0, Rgb::RED).labeled("camcol 5"));
        Ok(vec![Figure::new("sdss-galaxy-colors", 5.0, 3.75).panel(panel)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::data::sample::{write_all, SampleSizes};

    #[test]
    fn colour_diagram_splits_by_camera_column() {
        let dir = tempfile::tempdir().unwrap();
        write_all(dir.path(), SampleSizes::small(), 1).unwrap();
        let ctx = Context::new(Config {
            data_dir: dir.path().to_path_buf(),
            cache_enabled: false,
            ..Config::default()
        });
        let camcol = ctx.load(DatasetKey::SkyserverColors).unwrap().column("camcol").unwrap().to_vec();
        let figs = GalaxyColors.build(&ctx).unwrap();
        let counts: Vec<usize> = figs[0].panels[0]
            .layers
            .iter()
            .map(|l| match l {
                Layer::Scatter { points, .. } => points.len(),
                _ => 0,
            })
            .collect();
        let expected = |c: f64| camcol.iter().filter(|v| **v == c).count();
        assert_eq!(counts, vec![expected(4.0), expected(5.0)]);
    }
}
