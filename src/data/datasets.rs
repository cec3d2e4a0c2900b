use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::loader;
use super::model::Table;
use crate::error::Error;

/// Table 1 of Hogg, Bovy & Lang (2010), shipped with the crate.
const HOGG2010_CSV: &str = include_str!("../../data/hogg2010.csv");

/// Looked up in this order; the first existing file wins.
pub const EXTENSIONS: [&str; 3] = ["csv", "json", "parquet"];

/// Sampling rate of the LIGO strain series.
pub const LIGO_SAMPLE_RATE: f64 = 4096.0;

// ---------------------------------------------------------------------------
// Dataset keys
// ---------------------------------------------------------------------------

/// A fixed external dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKey {
    /// One SDSS spectrum, identified by plate, MJD and fiber.
    SdssSpectrum { plate: u32, mjd: u32, fiber: u32 },
    /// 2-D positions of galaxies in the SDSS Great Wall.
    GreatWall,
    /// Long LIGO strain time series.
    LigoLarge,
    /// Stripe 82 standard star magnitudes.
    S82Standards,
    /// SDSS DR7 quasar catalog.
    Dr7Quasar,
    /// SkyServer query of galaxy colours and spectroscopic redshifts.
    SkyserverColors,
    /// Points with correlated x/y errors.
    Hogg2010,
}

impl DatasetKey {
    /// The spectrum used by the minimum-component filter figure.
    pub const MINCOMP_SPECTRUM: DatasetKey = DatasetKey::SdssSpectrum {
        plate: 659,
        mjd: 52199,
        fiber: 381,
    };

    pub const ALL: [DatasetKey; 7] = [
        DatasetKey::MINCOMP_SPECTRUM,
        DatasetKey::GreatWall,
        DatasetKey::LigoLarge,
        DatasetKey::S82Standards,
        DatasetKey::Dr7Quasar,
        DatasetKey::SkyserverColors,
        DatasetKey::Hogg2010,
    ];

    /// File name without extension, inside the data directory.
    pub fn file_stem(&self) -> String {
        match self {
            DatasetKey::SdssSpectrum { plate, mjd, fiber } => {
                format!("sdss_spectrum_{plate:04}-{mjd:05}-{fiber:03}")
            }
            DatasetKey::GreatWall => "great_wall".to_string(),
            DatasetKey::LigoLarge => "ligo_large".to_string(),
            DatasetKey::S82Standards => "sdss_s82_standards".to_string(),
            DatasetKey::Dr7Quasar => "dr7_quasar".to_string(),
            DatasetKey::SkyserverColors => "skyserver_colors".to_string(),
            DatasetKey::Hogg2010 => "hogg2010".to_string(),
        }
    }

    /// Columns every file for this dataset must provide.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            DatasetKey::SdssSpectrum { .. } => &["wavelength", "spectrum"],
            DatasetKey::GreatWall => &["x", "y"],
            DatasetKey::LigoLarge => &["t", "h"],
            DatasetKey::S82Standards => &["mmu_g", "mmu_r", "mmu_i"],
            DatasetKey::Dr7Quasar => &["mag_r", "mag_i", "redshift"],
            DatasetKey::SkyserverColors => &["u", "g", "r", "i", "z", "redshift", "camcol"],
            DatasetKey::Hogg2010 => &["x", "y", "sigma_y", "sigma_x", "rho_xy"],
        }
    }

    fn embedded(&self) -> Option<&'static str> {
        match self {
            DatasetKey::Hogg2010 => Some(HOGG2010_CSV),
            _ => None,
        }
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_stem())
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Read-only access to the datasets in one directory.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    dir: PathBuf,
}

impl DatasetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every path the store would try for `key`, in lookup order.
    pub fn candidates(&self, key: DatasetKey) -> Vec<PathBuf> {
        let stem = key.file_stem();
        EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{stem}.{ext}")))
            .collect()
    }

    pub fn locate(&self, key: DatasetKey) -> Option<PathBuf> {
        self.candidates(key).into_iter().find(|p| p.is_file())
    }

    /// Load `key`. A missing file is fatal ([`Error::MissingDataset`]);
    /// there is no retry and no download.
    pub fn load(&self, key: DatasetKey) -> Result<Table> {
        let table = match (self.locate(key), key.embedded()) {
            (Some(path), _) => loader::load_file(&path)?,
            (None, Some(text)) => {
                log::debug!("Using embedded copy of {key}");
                loader::parse_csv_str(text).with_context(|| format!("parsing embedded {key}"))?
            }
            (None, None) => {
                return Err(Error::MissingDataset {
                    name: key.file_stem(),
                    searched: self.candidates(key),
                }
                .into())
            }
        };

        for column in key.columns() {
            table
                .column(column)
                .with_context(|| format!("dataset {key} lacks column '{column}'"))?;
        }
        log::info!("Loaded dataset {key}: {table}");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn spectrum_stem_is_zero_padded() {
        assert_eq!(
            DatasetKey::MINCOMP_SPECTRUM.file_stem(),
            "sdss_spectrum_0659-52199-381"
        );
    }

    #[test]
    fn missing_dataset_names_searched_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());
        let err = store.load(DatasetKey::GreatWall).unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(Error::MissingDataset { name, searched }) => {
                assert_eq!(name, "great_wall");
                assert_eq!(searched.len(), 3);
                assert!(searched[0].ends_with("great_wall.csv"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn csv_preferred_over_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("great_wall.csv"), "x,y\n1,2\n").unwrap();
        fs::write(dir.path().join("great_wall.json"), r#"{"x":[5,6],"y":[7,8]}"#).unwrap();
        let table = DatasetStore::new(dir.path()).load(DatasetKey::GreatWall).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn missing_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("great_wall.csv"), "x,z\n1,2\n").unwrap();
        assert!(DatasetStore::new(dir.path()).load(DatasetKey::GreatWall).is_err());
    }

    #[test]
    fn hogg2010_falls_back_to_embedded_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = DatasetStore::new(dir.path()).load(DatasetKey::Hogg2010).unwrap();
        assert_eq!(table.len(), 20);
        assert_eq!(table.column("x").unwrap()[0], 201.0);
        assert_eq!(table.column("rho_xy").unwrap()[19], -0.56);
    }
}
