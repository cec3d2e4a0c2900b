use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CacheError;
use crate::data::model::ShapeError;

// ---------------------------------------------------------------------------
// Library error type
// ---------------------------------------------------------------------------

/// Failures raised by the data, transform and render stages.
#[derive(Debug, Error)]
pub enum Error {
    /// A named external dataset is not present in the data directory.
    #[error("dataset '{name}' not found; looked for {}", display_paths(.searched))]
    MissingDataset { name: String, searched: Vec<PathBuf> },

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A numerical routine was handed input it cannot work with.
    #[error("numerical error: {0}")]
    Numerical(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
