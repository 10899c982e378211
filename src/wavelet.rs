//! A discretized Mexican Hat wavelet and the single-scale continuous wavelet
//! transform built on it.
//!
//! The mother wavelet is
//!
//! ```text
//! psi(x) = c * (1 - x^2) * exp(-x^2 / 2),   x = (t - b) / a,   c = 2 / (sqrt(3) * pi^(1/4))
//! ```
//!
//! [`WaveletKernel`] samples `psi` at `n_points` evenly spaced positions across its
//! effective support `[esl, esr]` once, and [`WaveletKernel::transform`] then
//! correlates a signal against that table at an integer scale, translating the
//! wavelet over every sample. The table is immutable once built, so a single
//! kernel can be shared across threads behind an [`Arc`], and [`KernelCache`]
//! hands out one shared kernel per distinct [`KernelParams`].
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cfg_if::cfg_if;
use log::{debug, warn};
use thiserror::Error;

#[cfg(feature = "parallelism")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// `2 / (sqrt(3) * pi^(1/4))`
pub const MEXICAN_HAT_NORM: f64 = 0.8673250705840776;

/// The value substituted for a window width of exactly zero
const TINY: f64 = 1e-200;

pub const DEFAULT_KERNEL_POINTS: usize = 60000;
pub const DEFAULT_SUPPORT_LEFT: i32 = -5;
pub const DEFAULT_SUPPORT_RIGHT: i32 = 5;

/// All the ways building a kernel or running the transform can fail
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum WaveletError {
    #[error("The scale level must be at least 1")]
    ZeroScaleLevel,
    #[error("The wavelet kernel must have at least one point")]
    EmptyKernel,
    #[error("The effective support [{left}, {right}] is empty")]
    InvalidSupport { left: i32, right: i32 },
}

/// Evaluate the real Mexican Hat wavelet at `x` with window width `a` and offset `b`.
///
/// A window of exactly zero is replaced by a tiny positive width. Far outside the
/// support, where `x^2` overflows, the limit value `0.0` is returned.
#[inline]
pub fn mexican_hat(x: f64, a: f64, b: f64) -> f64 {
    let a = if a == 0.0 { TINY } else { a };
    let x = (x - b) / a;
    let x2 = x * x;
    if !x2.is_finite() {
        return 0.0;
    }
    MEXICAN_HAT_NORM * (1.0 - x2) * libm::exp(-x2 / 2.0)
}

/// The resolution, support and window width of a [`WaveletKernel`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KernelParams {
    /// The number of wavelet values to pre-compute
    pub n_points: usize,
    /// The left bound of the effective support, in wavelet units
    pub support_left: i32,
    /// The right bound of the effective support, in wavelet units
    pub support_right: i32,
    /// The window width `a` of the wavelet
    pub window: f64,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self {
            n_points: DEFAULT_KERNEL_POINTS,
            support_left: DEFAULT_SUPPORT_LEFT,
            support_right: DEFAULT_SUPPORT_RIGHT,
            window: 1.0,
        }
    }
}

impl KernelParams {
    pub fn new(n_points: usize, support_left: i32, support_right: i32, window: f64) -> Self {
        Self {
            n_points,
            support_left,
            support_right,
            window,
        }
    }

    /// The default resolution and support with a window width of `window`
    pub fn with_window(window: f64) -> Self {
        Self {
            window,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), WaveletError> {
        if self.n_points == 0 {
            return Err(WaveletError::EmptyKernel);
        }
        if self.support_right <= self.support_left {
            return Err(WaveletError::InvalidSupport {
                left: self.support_left,
                right: self.support_right,
            });
        }
        Ok(())
    }

    fn support_width(&self) -> i64 {
        self.support_right as i64 - self.support_left as i64
    }

    fn key(&self) -> KernelKey {
        KernelKey {
            n_points: self.n_points,
            support_left: self.support_left,
            support_right: self.support_right,
            window_bits: self.window.to_bits(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct KernelKey {
    n_points: usize,
    support_left: i32,
    support_right: i32,
    window_bits: u64,
}

/// A pre-computed table of Mexican Hat wavelet values over its effective support.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveletKernel {
    params: KernelParams,
    values: Vec<f64>,
}

impl WaveletKernel {
    /// Sample the wavelet described by `params`.
    ///
    /// Sample positions are generated by repeatedly adding the step to the left
    /// support bound, so the table is reproducible bit-for-bit.
    pub fn new(params: KernelParams) -> Result<Self, WaveletError> {
        params.validate()?;
        if params.window == 0.0 {
            warn!("A wavelet window of zero was requested, substituting {TINY:e}");
        }
        let step = params.support_width() as f64 / params.n_points as f64;
        let mut values = Vec::with_capacity(params.n_points);
        let mut x = params.support_left as f64;
        for _ in 0..params.n_points {
            values.push(mexican_hat(x, params.window, 0.0));
            x += step;
        }
        debug!(
            "Built a wavelet kernel of {} points over [{}, {}] with window {}",
            params.n_points, params.support_left, params.support_right, params.window
        );
        Ok(Self { params, values })
    }

    pub fn params(&self) -> &KernelParams {
        &self.params
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The number of table entries per wavelet unit, truncated
    fn density(&self) -> i64 {
        self.params.n_points as i64 / self.params.support_width()
    }

    /// Map the offset between a signal index and the translation position to a
    /// table index at `scale_level`, clamped into the table.
    #[inline]
    fn table_index(&self, offset: i64, scale_level: i64, density: i64) -> usize {
        let center = self.params.n_points as i64 / 2;
        let index = center + density * offset / scale_level;
        index.clamp(0, self.params.n_points as i64 - 1) as usize
    }

    /// The wavelet coefficient for translation position `dx`.
    ///
    /// The window of signal indices is clamped to the signal's bounds rather than
    /// zero-padded. Accumulation happens in `f32`, with each product formed in `f64`.
    fn coefficient_at(&self, intensity_array: &[f32], dx: usize, scale_level: u32) -> f32 {
        let n = intensity_array.len() as i64;
        let s = scale_level as i64;
        let dx = dx as i64;
        let density = self.density();
        let start = (s * self.params.support_left as i64 + dx).clamp(0, n - 1);
        let end = (s * self.params.support_right as i64 + dx).clamp(0, n - 1);

        let mut total = 0.0f32;
        for i in start..=end {
            let k = self.table_index(i - dx, s, density);
            total = (total as f64 + intensity_array[i as usize] as f64 * self.values[k]) as f32;
        }
        total = (total as f64 / (scale_level as f64).sqrt()) as f32;
        // Only the positive part of the response counts as peak evidence
        if total.is_nan() || total < 0.0 {
            0.0
        } else {
            total
        }
    }

    /// Compute the wavelet response of `intensity_array` at `scale_level`, writing
    /// one non-negative coefficient per input sample into `response`.
    ///
    /// `response` is resized to match `intensity_array`.
    pub fn transform_into(
        &self,
        intensity_array: &[f32],
        scale_level: u32,
        response: &mut Vec<f32>,
    ) -> Result<(), WaveletError> {
        if scale_level == 0 {
            return Err(WaveletError::ZeroScaleLevel);
        }
        response.clear();
        response.resize(intensity_array.len(), 0.0);
        cfg_if! {
            if #[cfg(feature = "parallelism")] {
                response
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(dx, out)| *out = self.coefficient_at(intensity_array, dx, scale_level));
            } else {
                response
                    .iter_mut()
                    .enumerate()
                    .for_each(|(dx, out)| *out = self.coefficient_at(intensity_array, dx, scale_level));
            }
        }
        Ok(())
    }

    /// Compute the wavelet response of `intensity_array` at `scale_level`.
    ///
    /// See [`WaveletKernel::transform_into`].
    pub fn transform(&self, intensity_array: &[f32], scale_level: u32) -> Result<Vec<f32>, WaveletError> {
        let mut response = Vec::with_capacity(intensity_array.len());
        self.transform_into(intensity_array, scale_level, &mut response)?;
        Ok(response)
    }
}

/// Builds each distinct [`WaveletKernel`] once and shares it afterwards.
///
/// Cloning the cache is cheap and the clones share the same kernels.
#[derive(Debug, Default, Clone)]
pub struct KernelCache {
    kernels: Arc<Mutex<HashMap<KernelKey, Arc<WaveletKernel>>>>,
}

impl KernelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the kernel for `params`, building it on first use
    pub fn get_or_build(&self, params: &KernelParams) -> Result<Arc<WaveletKernel>, WaveletError> {
        let key = params.key();
        let mut kernels = self.kernels.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(kernel) = kernels.get(&key) {
            return Ok(Arc::clone(kernel));
        }
        let kernel = Arc::new(WaveletKernel::new(*params)?);
        kernels.insert(key, Arc::clone(&kernel));
        Ok(kernel)
    }

    pub fn len(&self) -> usize {
        self.kernels.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_data::{gaussian_bump, seeded_rng};
    use rand::Rng;
    use rstest::rstest;

    #[test]
    fn test_mexican_hat_values() {
        assert_eq!(mexican_hat(0.0, 1.0, 0.0), MEXICAN_HAT_NORM);
        assert_eq!(mexican_hat(1.0, 1.0, 0.0), 0.0);
        assert!(mexican_hat(2.0, 1.0, 0.0) < 0.0);
        assert_eq!(mexican_hat(0.5, 1.0, 0.0), mexican_hat(-0.5, 1.0, 0.0));
        assert_eq!(mexican_hat(3.0, 2.0, 1.0), mexican_hat(1.0, 1.0, 0.0));
        assert_eq!(mexican_hat(2.0, 0.0, 0.0), 0.0);
        assert!(!mexican_hat(1e-300, 0.0, 0.0).is_nan());
    }

    #[test]
    fn test_kernel_table() {
        let kernel = WaveletKernel::new(KernelParams::default()).unwrap();
        assert_eq!(kernel.len(), DEFAULT_KERNEL_POINTS);
        let expected_edge = MEXICAN_HAT_NORM * (1.0 - 25.0) * (-12.5f64).exp();
        assert!((kernel.values()[0] - expected_edge).abs() < 1e-12);
        let center = kernel.values()[DEFAULT_KERNEL_POINTS / 2];
        assert!((center - MEXICAN_HAT_NORM).abs() < 1e-9, "{center}");
        let peak = kernel
            .values()
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        assert!((peak - MEXICAN_HAT_NORM).abs() < 1e-9);
    }

    #[rstest]
    #[case(KernelParams::new(0, -5, 5, 1.0), WaveletError::EmptyKernel)]
    #[case(KernelParams::new(100, 5, 5, 1.0), WaveletError::InvalidSupport { left: 5, right: 5 })]
    #[case(KernelParams::new(100, 2, -2, 1.0), WaveletError::InvalidSupport { left: 2, right: -2 })]
    fn test_kernel_params_invalid(#[case] params: KernelParams, #[case] err: WaveletError) {
        assert_eq!(WaveletKernel::new(params), Err(err));
    }

    #[test]
    fn test_zero_scale() {
        let kernel = WaveletKernel::new(KernelParams::default()).unwrap();
        assert_eq!(kernel.transform(&[1.0, 2.0], 0), Err(WaveletError::ZeroScaleLevel));
    }

    #[rstest]
    #[case(1, 1.0)]
    #[case(2, 1.0)]
    #[case(5, 0.5)]
    #[case(3, 0.0)]
    fn test_response_non_negative(#[case] scale: u32, #[case] window: f64) {
        let kernel = WaveletKernel::new(KernelParams::with_window(window)).unwrap();
        let mut rng = seeded_rng(scale as u64 + 17);
        let signal: Vec<f32> = (0..2000).map(|_| rng.gen_range(-500.0f32..500.0)).collect();
        let response = kernel.transform(&signal, scale).unwrap();
        assert_eq!(response.len(), signal.len());
        assert!(response.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_response_shape() {
        let kernel = WaveletKernel::new(KernelParams::default()).unwrap();
        let signal = gaussian_bump(100, 50, 1000.0, 1.0);
        let response = kernel.transform(&signal, 2).unwrap();

        assert!(response[50] > 0.0);
        assert!(response[49] < response[50]);
        assert!(response[51] < response[50]);
        // The negative side lobes are clipped
        assert_eq!(response[46], 0.0);
        assert_eq!(response[54], 0.0);
        // Far from the bump there is no signal at all
        assert_eq!(response[0], 0.0);
        assert_eq!(response[99], 0.0);
    }

    #[test]
    fn test_empty_signal() {
        let kernel = WaveletKernel::new(KernelParams::default()).unwrap();
        assert!(kernel.transform(&[], 2).unwrap().is_empty());
        let single = kernel.transform(&[10.0], 1).unwrap();
        assert!((single[0] - (10.0 * MEXICAN_HAT_NORM) as f32).abs() < 1e-4);
    }

    #[test]
    fn test_one_sided_support_uses_edge_sample() {
        let kernel = WaveletKernel::new(KernelParams::new(1000, 1, 5, 1.0)).unwrap();
        let response = kernel.transform(&[-10.0], 1).unwrap();
        // The table midpoint sits at x = 3, where the wavelet is negative
        let expected = (-10.0 * mexican_hat(3.0, 1.0, 0.0)) as f32;
        assert!(response[0] > 0.0);
        assert!((response[0] - expected).abs() < 1e-4, "{} != {expected}", response[0]);
    }

    #[test]
    fn test_kernel_cache() {
        let cache = KernelCache::new();
        let a = cache.get_or_build(&KernelParams::with_window(1.0)).unwrap();
        let b = cache.clone().get_or_build(&KernelParams::with_window(1.0)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let c = cache.get_or_build(&KernelParams::with_window(2.0)).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
        assert!(cache.get_or_build(&KernelParams::new(0, -5, 5, 1.0)).is_err());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_kernel_shared_across_threads() {
        let kernel = Arc::new(WaveletKernel::new(KernelParams::default()).unwrap());
        let signal = gaussian_bump(300, 150, 500.0, 2.0);
        let expected = kernel.transform(&signal, 3).unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let kernel = Arc::clone(&kernel);
                let signal = signal.clone();
                std::thread::spawn(move || kernel.transform(&signal, 3).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }
}
