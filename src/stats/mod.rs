//! Statistical transforms: pure functions from samples and grids to
//! derived surfaces.
//!
//! ```text
//! Sample ─┬─> distributions / likelihood ─> Surface1 / Surface2
//!         ├─> fourier / periodogram / wavelet / filter
//!         ├─> density / neighbors / contour
//!         └─> mcmc / xd / optimize / resample
//! ```

pub mod contour;
pub mod density;
pub mod distributions;
pub mod filter;
pub mod fourier;
pub mod likelihood;
pub mod mcmc;
pub mod neighbors;
pub mod optimize;
pub mod pca;
pub mod periodogram;
pub mod projection;
pub mod resample;
pub mod scaling;
pub mod wavelet;
pub mod xd;
