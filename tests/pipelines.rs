//! End-to-end pipeline runs over synthetic datasets in a scratch directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use astrofig::config::Config;
use astrofig::data::sample::{write_all, SampleSizes};
use astrofig::figure::Layer;
use astrofig::figures::{self, Context};
use tempfile::TempDir;

/// A context whose data, cache and output directories live in `dir`.
fn scratch_context(dir: &TempDir) -> Context {
    let data_dir = dir.path().join("data");
    write_all(&data_dir, SampleSizes::small(), 0).unwrap();
    Context::new(Config {
        data_dir,
        cache_dir: dir.path().join("cache"),
        output_dir: dir.path().join("plots"),
        ..Config::default()
    })
}

fn build(ctx: &Context, id: &str) -> Vec<astrofig::figure::Figure> {
    let pipeline = figures::find(id).unwrap_or_else(|| panic!("no pipeline {id}"));
    figures::build(pipeline.as_ref(), ctx).unwrap_or_else(|e| panic!("{id}: {e:#}"))
}

#[test]
fn dataset_pipelines_build_from_synthetic_data() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = scratch_context(&dir);
    for id in [
        "ch1-projections",
        "ch1-s82-scatter-contour",
        "ch1-dr7-quasar",
        "ch6-great-wall",
        "ch8-total-least-squares",
        "ch10-ligo-power-spectrum",
        "ch10-mincomp-procedure",
        "photoz-neighbors",
        "sdss-galaxy-colors",
    ] {
        let figs = build(&ctx, id);
        assert!(!figs.is_empty(), "{id} built no figure");
        for fig in &figs {
            assert!(fig.layer_count() > 0, "{} has no layers", fig.id);
            for panel in &fig.panels {
                assert!(panel.cell.row + panel.cell.row_span <= fig.grid.0, "{} panel outside grid", fig.id);
                assert!(panel.cell.col + panel.cell.col_span <= fig.grid.1, "{} panel outside grid", fig.id);
            }
        }
    }
}

#[test]
fn missing_dataset_names_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = Context::new(Config {
        data_dir: dir.path().join("empty"),
        cache_enabled: false,
        ..Config::default()
    });
    let pipeline = figures::find("ch6-great-wall").unwrap();
    let err = figures::build(pipeline.as_ref(), &ctx).unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("ch6-great-wall"), "{chain}");
    assert!(chain.contains("great_wall"), "{chain}");
}

#[test]
fn seeded_pipelines_are_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = Context::new(Config {
        cache_enabled: false,
        data_dir: dir.path().to_path_buf(),
        ..Config::default()
    });
    for id in [
        "ch3-binomial-distribution",
        "ch3-cauchy-distribution",
        "ch3-norm-distribution",
        "ch3-poisson-distribution",
        "ch3-uniform-distribution",
        "ch3-transform-distribution",
        "ch4-chi2-eval",
        "ch5-likelihood-gaussgauss",
        "ch5-posterior-cauchy",
        "ch7-pca-rotation",
        "ch7-svd-visual",
        "ch8-linreg-inline",
        "ch10-line-wavelet-psd",
        "ch10-convolution-diagram",
        "ch10-fft-aliasing",
        "ch10-powerlaw",
    ] {
        assert_eq!(build(&ctx, id), build(&ctx, id), "{id} differs between runs");
    }
}

#[test]
fn timing_pipelines_build() {
    let ctx = Context::new(Config {
        cache_enabled: false,
        ..Config::default()
    });
    for id in ["ch2-search-scaling", "ch2-sort-scaling"] {
        let figs = build(&ctx, id);
        assert_eq!(figs.len(), 1, "{id}");
        assert!(figs[0].layer_count() > 0, "{id} has no layers");
    }
}

/// Contents and modification time of every cache entry whose name starts
/// with `stem`.
fn cache_entries(dir: &Path, stem: &str) -> BTreeMap<PathBuf, (Vec<u8>, SystemTime)> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(stem) && n.ends_with(".cache"))
        })
        .map(|p| {
            let bytes = std::fs::read(&p).unwrap();
            let modified = std::fs::metadata(&p).unwrap().modified().unwrap();
            (p, (bytes, modified))
        })
        .collect()
}

#[test]
fn cached_pipelines_reuse_their_entry() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("cache");
    let ctx = Context::new(Config {
        data_dir: dir.path().join("data"),
        cache_dir: cache_dir.clone(),
        cache_enabled: true,
        ..Config::default()
    });
    for (id, stem) in [
        ("ch6-xd-example", "xd_toy-"),
        ("ch10-ls-example", "ls_bootstrap-"),
        ("ch10-matchedfilt-chirp", "matchedfilt_chirp-"),
    ] {
        let first = build(&ctx, id);
        let entries = cache_entries(&cache_dir, stem);
        assert_eq!(entries.len(), 1, "{id} wrote {} entries", entries.len());

        let second = build(&ctx, id);
        assert_eq!(first, second, "{id} differs after a cache hit");
        assert_eq!(cache_entries(&cache_dir, stem), entries, "{id} rewrote its entry");
    }
}

#[test]
fn chi2_panels_show_four_models() {
    let ctx = Context::new(Config {
        cache_enabled: false,
        ..Config::default()
    });
    let figs = build(&ctx, "ch4-chi2-eval");
    let panels = &figs[0].panels;
    assert_eq!(panels.len(), 4);
    for panel in panels {
        let bars = panel
            .layers
            .iter()
            .find_map(|l| match l {
                Layer::ErrorBars { points, .. } => Some(points.len()),
                _ => None,
            })
            .unwrap();
        assert_eq!(bars, 50);
    }
}

#[test]
#[ignore = "renders the whole gallery; slow without optimisations"]
fn whole_gallery_renders() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = scratch_context(&dir);
    let summary = figures::render_all(&ctx);
    assert!(summary.failed.is_empty(), "{:?}", summary.failed);
    assert!(summary.written.len() > figures::all().len());
    for path in &summary.written {
        assert!(path.exists(), "{}", path.display());
    }
}
