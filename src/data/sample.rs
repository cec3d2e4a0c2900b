//! Synthetic stand-ins for the external datasets, so every figure can be
//! built offline. The shapes follow the real catalogs (stellar locus,
//! quasar colour wiggles, a filament of galaxies, a noisy strain series
//! with spectral lines) but the values are invented.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::datasets::{DatasetKey, LIGO_SAMPLE_RATE};
use super::model::Table;
use super::synth::SeededRng;

/// How much data to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSizes {
    /// Length of the strain series in seconds.
    pub ligo_seconds: usize,
    /// Rows of each photometric catalog.
    pub catalog_rows: usize,
    pub great_wall_points: usize,
}

impl Default for SampleSizes {
    fn default() -> Self {
        Self {
            ligo_seconds: 64,
            catalog_rows: 20_000,
            great_wall_points: 8_000,
        }
    }
}

impl SampleSizes {
    /// Small enough for tests.
    pub fn small() -> Self {
        Self {
            ligo_seconds: 3,
            catalog_rows: 600,
            great_wall_points: 400,
        }
    }
}

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn table(columns: Vec<(&str, Vec<f64>)>) -> Result<Table> {
    let mut t = Table::new();
    for (name, values) in columns {
        t.push_column(name, values)?;
    }
    Ok(t)
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Log-linear SDSS-like spectrum, 3800–9200 Å at Δlog λ = 1e-4, with
/// Balmer absorption lines on a sloped continuum.
pub fn sdss_spectrum(rng: &mut SeededRng) -> Result<Table> {
    let (lo, hi) = (3800f64.log10(), 9200f64.log10());
    let n = ((hi - lo) / 1e-4) as usize;
    let wavelength: Vec<f64> = (0..n).map(|i| 10f64.powf(lo + 1e-4 * i as f64)).collect();
    let lines = [(4102.0, 6.0, 18.0), (4341.0, 7.0, 22.0), (4862.0, 8.0, 25.0), (6564.0, 9.0, 20.0)];
    let spectrum = wavelength
        .iter()
        .map(|&lam| {
            let continuum = 55.0 + 25.0 * ((lam - 4000.0) / 5000.0).clamp(-0.2, 1.0);
            let absorption: f64 = lines.iter().map(|&(mu, s, a)| gaussian(lam, mu, s, a)).sum();
            continuum - absorption + rng.normal(0.0, 2.0)
        })
        .collect();
    table(vec![("wavelength", wavelength), ("spectrum", spectrum)])
}

/// A curved filament across the survey region plus a uniform field.
pub fn great_wall(rng: &mut SeededRng, n: usize) -> Result<Table> {
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for _ in 0..n {
        let along = -300.0 + 500.0 * rng.random();
        let (px, py) = if rng.random() < 0.65 {
            let centre = -275.0 + 45.0 * (along / 90.0).sin();
            (rng.normal(centre, 8.0), along)
        } else {
            (-375.0 + 200.0 * rng.random(), along)
        };
        x.push(px);
        y.push(py);
    }
    table(vec![("x", x), ("y", y)])
}

/// White noise with a red low-frequency wall and a few narrow lines,
/// scaled to strain amplitudes.
pub fn ligo_strain(rng: &mut SeededRng, seconds: usize) -> Result<Table> {
    let n = seconds.max(1) * LIGO_SAMPLE_RATE as usize;
    let dt = 1.0 / LIGO_SAMPLE_RATE;
    let red = rng.power_law_series(n, dt, 2.0);
    let red_scale = red.iter().map(|v| v * v).sum::<f64>() / n as f64;
    let red_scale = if red_scale > 0.0 { 3e-19 / red_scale.sqrt() } else { 0.0 };
    let lines = [(60.0, 8e-20), (120.0, 4e-20), (331.0, 3e-20), (505.0, 6e-20)];
    let t: Vec<f64> = (0..n).map(|i| i as f64 * dt).collect();
    let h = t
        .iter()
        .zip(&red)
        .map(|(&ti, &r)| {
            let tones: f64 = lines
                .iter()
                .map(|&(f, a)| a * (2.0 * std::f64::consts::PI * f * ti).sin())
                .sum();
            r * red_scale + tones + rng.normal(0.0, 5e-20)
        })
        .collect();
    table(vec![("t", t), ("h", h)])
}

/// Stellar locus in g−r / r−i with a red tail.
pub fn s82_standards(rng: &mut SeededRng, n: usize) -> Result<Table> {
    let (mut g, mut r, mut i) = (Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n));
    for _ in 0..n {
        let s = rng.random().powf(1.5);
        let gr = 0.25 + 1.2 * s + rng.normal(0.0, 0.04);
        let ri = 0.05 + 0.35 * s + 1.6 * (s - 0.75).max(0.0) + rng.normal(0.0, 0.04);
        let mag_r = 14.0 + 7.0 * rng.random();
        g.push(mag_r + gr);
        r.push(mag_r);
        i.push(mag_r - ri);
    }
    table(vec![("mmu_g", g), ("mmu_r", r), ("mmu_i", i)])
}

/// Quasar r−i colour wiggling with redshift as lines cross the bands.
pub fn dr7_quasar(rng: &mut SeededRng, n: usize) -> Result<Table> {
    let (mut mr, mut mi, mut z) = (Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n));
    for _ in 0..n {
        let zq = rng.normal(1.5, 0.8).abs().clamp(0.05, 5.0);
        let ri = 0.15 + 0.15 * (2.0 * std::f64::consts::PI * zq / 1.3).sin() + rng.normal(0.0, 0.08);
        let r = 17.0 + 2.5 * rng.random();
        mr.push(r);
        mi.push(r - ri);
        z.push(zq);
    }
    table(vec![("mag_r", mr), ("mag_i", mi), ("redshift", z)])
}

/// Galaxy colours that redden smoothly with redshift, plus the camera
/// column of each object.
pub fn skyserver_colors(rng: &mut SeededRng, n: usize) -> Result<Table> {
    let mut cols: [Vec<f64>; 7] = Default::default();
    for _ in 0..n {
        let z = 0.02 + 0.6 * rng.random().powi(2);
        let r = 16.0 + 2.0 * rng.random();
        let ug = 1.0 + 2.5 * z + rng.normal(0.0, 0.12);
        let gr = 0.4 + 1.5 * z + rng.normal(0.0, 0.06);
        let ri = 0.3 + 0.8 * z + rng.normal(0.0, 0.05);
        let iz = 0.2 + 0.5 * z + rng.normal(0.0, 0.05);
        let g = r + gr;
        let row = [g + ug, g, r, r - ri, r - ri - iz, z, (1 + rng.randint(6)) as f64];
        for (col, v) in cols.iter_mut().zip(row) {
            col.push(v);
        }
    }
    let [u, g, r, i, zb, z, camcol] = cols;
    table(vec![
        ("u", u),
        ("g", g),
        ("r", r),
        ("i", i),
        ("z", zb),
        ("redshift", z),
        ("camcol", camcol),
    ])
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

pub fn write_csv(path: &Path, table: &Table) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(table.column_names())?;
    let columns = table
        .column_names()
        .iter()
        .map(|name| table.column(name))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for row in 0..table.len() {
        writer.write_record(columns.iter().map(|c| c[row].to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Flat Float64 columns, one record batch.
pub fn write_parquet(path: &Path, table: &Table) -> Result<()> {
    let fields: Vec<Field> = table
        .column_names()
        .iter()
        .map(|name| Field::new(name.as_str(), DataType::Float64, false))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    let arrays = table
        .column_names()
        .iter()
        .map(|name| Ok(Arc::new(Float64Array::from(table.column(name)?.to_vec())) as ArrayRef))
        .collect::<Result<Vec<_>>>()?;
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

/// Write every synthetic dataset into `dir`. The embedded Hogg table is
/// not written. Returns the created files.
pub fn write_all(dir: &Path, sizes: SampleSizes, seed: u64) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut rng = SeededRng::new(seed);
    let mut written = Vec::new();

    let spectrum = DatasetKey::MINCOMP_SPECTRUM;
    let path = dir.join(format!("{}.parquet", spectrum.file_stem()));
    write_parquet(&path, &sdss_spectrum(&mut rng)?)?;
    written.push(path);

    let csv_sets = [
        (DatasetKey::GreatWall, great_wall(&mut rng, sizes.great_wall_points)?),
        (DatasetKey::LigoLarge, ligo_strain(&mut rng, sizes.ligo_seconds)?),
        (DatasetKey::S82Standards, s82_standards(&mut rng, sizes.catalog_rows)?),
        (DatasetKey::Dr7Quasar, dr7_quasar(&mut rng, sizes.catalog_rows)?),
        (DatasetKey::SkyserverColors, skyserver_colors(&mut rng, sizes.catalog_rows)?),
    ];
    for (key, table) in csv_sets {
        let path = dir.join(format!("{}.csv", key.file_stem()));
        write_csv(&path, &table)?;
        log::info!("Wrote {key}: {table}");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::datasets::DatasetStore;

    #[test]
    fn written_datasets_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_all(dir.path(), SampleSizes::small(), 3).unwrap();
        assert_eq!(files.len(), 6);

        let store = DatasetStore::new(dir.path());
        for key in DatasetKey::ALL {
            let table = store.load(key).unwrap();
            assert!(!table.is_empty(), "{key} is empty");
        }
        let ligo = store.load(DatasetKey::LigoLarge).unwrap();
        assert_eq!(ligo.len(), 3 * 4096);
        let spec = store.load(DatasetKey::MINCOMP_SPECTRUM).unwrap();
        let lam = spec.column("wavelength").unwrap();
        assert!(lam[0] >= 3799.0 && lam[lam.len() - 1] < 9200.0);
    }

    #[test]
    fn generators_are_seeded() {
        let a = great_wall(&mut SeededRng::new(1), 50).unwrap();
        let b = great_wall(&mut SeededRng::new(1), 50).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn csv_round_trips_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let t = table(vec![("a", vec![0.1, -2.5e-19]), ("b", vec![3.0, 4.0])]).unwrap();
        write_csv(&path, &t).unwrap();
        let back = crate::data::loader::load_file(&path).unwrap();
        assert_eq!(back, t);
    }
}
