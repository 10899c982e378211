//! `mzwavelet` converts a continuous profile-mode mass spectrum into a centroided
//! peak list using a continuous wavelet transform (CWT) with a Mexican Hat kernel.
//!
//! The spectrum is correlated against the wavelet at a single scale, the negative
//! part of the response is clipped away, and each run of positive response is
//! reduced to its apex. Apices whose original intensity rises above a noise level
//! are reported as peaks.
//!
//! Spectra are held in a [`SampleBuffer`], which keeps its samples sorted by m/z.
//! The wavelet table is built once per parameter set as a [`WaveletKernel`] and can
//! be shared between threads, so independent scans can be centroided in parallel.
//!
//! # Usage
//! ```
//! use mzwavelet::{SampleBuffer, WaveletCentroider};
//!
//! let mut samples = SampleBuffer::new();
//! for i in 0..100 {
//!     let d = i as f64 - 50.0;
//!     samples.add(500.0 + i as f64 * 0.01, (1000.0 * (-d * d / 2.0).exp()) as f32);
//! }
//!
//! let centroider = WaveletCentroider::new(10.0, 2, 1.0).unwrap();
//! let peaks = centroider.centroid(&samples).unwrap();
//! assert_eq!(peaks.len(), 1);
//! for peak in peaks.iter() {
//!     println!("{}", peak);
//! }
//! ```
pub mod buffer;
pub mod centroid;
pub mod peak_extraction;
pub mod prelude;
pub mod sample;
pub mod text;
pub mod wavelet;

#[cfg(test)]
mod test_data;

pub use crate::buffer::{SampleBuffer, SampleBufferError};
pub use crate::centroid::{
    centroid, ProcessingMethod, ProfileScan, ProfileSpectrum, WaveletCentroider,
    WaveletCentroiderBuilder, WaveletCentroidingMethod,
};
pub use crate::peak_extraction::{BoundaryPolicy, PeakExtractor};
pub use crate::sample::Sample;
pub use crate::wavelet::{mexican_hat, KernelCache, KernelParams, WaveletError, WaveletKernel};
