//! Write deterministic synthetic stand-ins for the external datasets into
//! the configured data directory, so every figure can be built offline.

use anyhow::{Context, Result};
use astrofig::config::Config;
use astrofig::data::sample::{write_all, SampleSizes};

/// Seed of the synthetic datasets.
const SAMPLE_SEED: u64 = 0;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load().context("loading configuration")?;
    let written = write_all(&config.data_dir, SampleSizes::default(), SAMPLE_SEED)
        .with_context(|| format!("writing sample datasets to {}", config.data_dir.display()))?;

    for path in &written {
        println!("{}", path.display());
    }
    println!("Wrote {} datasets to {}", written.len(), config.data_dir.display());
    Ok(())
}
