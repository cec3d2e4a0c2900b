use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Optional configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "astrofig.json";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Shared text settings applied to every figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub font_family: String,
    /// Point size; scaled with `pixels_per_inch` when rasterising.
    pub font_size: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "sans-serif".to_string(),
            font_size: 8.0,
        }
    }
}

/// Run-wide settings. Every field has a default so an empty (or absent)
/// config file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the external datasets.
    pub data_dir: PathBuf,
    /// Directory of the results cache.
    pub cache_dir: PathBuf,
    /// Where rendered figures are written.
    pub output_dir: PathBuf,
    pub cache_enabled: bool,
    /// Raster resolution; figure sizes are declared in inches.
    pub pixels_per_inch: u32,
    pub text: TextStyle,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            cache_dir: PathBuf::from(".astrofig-cache"),
            output_dir: PathBuf::from("plots"),
            cache_enabled: true,
            pixels_per_inch: 100,
            text: TextStyle::default(),
        }
    }
}

impl Config {
    /// `astrofig.json` from the working directory (if present), then
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let path = Path::new(CONFIG_FILE);
        let config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Apply `ASTROFIG_*` environment variables on top of the current values.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `ASTROFIG_DATA_DIR` | `data_dir` |
    /// | `ASTROFIG_CACHE_DIR` | `cache_dir` |
    /// | `ASTROFIG_OUTPUT_DIR` | `output_dir` |
    /// | `ASTROFIG_CACHE_ENABLED` | `cache_enabled` |
    /// | `ASTROFIG_PIXELS_PER_INCH` | `pixels_per_inch` |
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = env::var("ASTROFIG_DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = env::var("ASTROFIG_CACHE_DIR") {
            self.cache_dir = PathBuf::from(val);
        }
        if let Ok(val) = env::var("ASTROFIG_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(val);
        }
        if let Ok(val) = env::var("ASTROFIG_CACHE_ENABLED") {
            match val.parse::<bool>() {
                Ok(b) => self.cache_enabled = b,
                Err(_) => log::warn!("Ignoring ASTROFIG_CACHE_ENABLED={val:?}"),
            }
        }
        if let Ok(val) = env::var("ASTROFIG_PIXELS_PER_INCH") {
            match val.parse::<u32>() {
                Ok(n) if n > 0 => self.pixels_per_inch = n,
                _ => log::warn!("Ignoring ASTROFIG_PIXELS_PER_INCH={val:?}"),
            }
        }
        self
    }

    /// Raster size for a figure declared in inches.
    pub fn pixel_size(&self, inches: (f64, f64)) -> (u32, u32) {
        let ppi = f64::from(self.pixels_per_inch);
        (
            (inches.0 * ppi).round().max(1.0) as u32,
            (inches.1 * ppi).round().max(1.0) as u32,
        )
    }

    /// Font size in pixels at the configured resolution.
    pub fn font_px(&self, points: f64) -> f64 {
        points * f64::from(self.pixels_per_inch) / 72.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        assert_eq!(Config::from_json_str("{}").unwrap(), Config::default());
    }

    #[test]
    fn partial_json_overrides_fields() {
        let c = Config::from_json_str(r#"{"data_dir": "/srv/astro", "text": {"font_size": 10}}"#)
            .unwrap();
        assert_eq!(c.data_dir, PathBuf::from("/srv/astro"));
        assert_eq!(c.text.font_size, 10.0);
        assert_eq!(c.text.font_family, "sans-serif");
        assert!(c.cache_enabled);
    }

    #[test]
    fn pixel_size_scales_with_ppi() {
        let c = Config {
            pixels_per_inch: 200,
            ..Config::default()
        };
        assert_eq!(c.pixel_size((5.0, 3.75)), (1000, 750));
        assert!((c.font_px(9.0) - 25.0).abs() < 1e-12);
    }
}
