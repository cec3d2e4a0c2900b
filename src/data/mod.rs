/// Data Source stage: core types, loading, filtering and synthesis.
///
/// Architecture:
/// ```text
///  seed ──────────────► synth ──────────────┐
///                                           ▼
///  DatasetKey ─► datasets ─► loader ─► Table ─► filter ─► Sample
///   (.csv / .json / .parquet in data_dir)
///                                           │
///                                           ▼
///                                   Grid / Surface1 / Surface2
/// ```
pub mod datasets;
pub mod filter;
pub mod loader;
pub mod model;
pub mod sample;
pub mod synth;
