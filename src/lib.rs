//! Astronomy statistics figures as fetch → transform → visualize pipelines.
//!
//! ```text
//!  data (synth / datasets) ─► stats ─► figure::Figure ─┬─► figure::render (PNG)
//!                                                      └─► viewer (egui_plot)
//! ```
//!
//! [`figures::all`] lists every pipeline; each one builds its figures from a
//! [`figures::Context`] holding the [`config::Config`], the dataset store and
//! the results cache.

pub mod cache;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod figure;
pub mod figures;
pub mod stats;
