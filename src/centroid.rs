//! Centroid a profile spectrum with a single-scale Mexican Hat wavelet transform.
//!
//! [`WaveletCentroider`] bundles the transform parameters with a shared
//! [`WaveletKernel`] and runs the transform followed by [`PeakExtractor`] over
//! one spectrum at a time. [`WaveletCentroidingMethod`] wraps the same work in
//! the [`ProcessingMethod`] interface used by host pipelines, operating on any
//! [`ProfileScan`].
use std::sync::Arc;

use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::buffer::SampleBuffer;
use crate::peak_extraction::{BoundaryPolicy, PeakExtractor};
use crate::wavelet::{KernelCache, KernelParams, WaveletError, WaveletKernel};

/// A long running operation that produces one result.
///
/// Progress is reported as a fraction in `[0, 1]`.
pub trait ProcessingMethod {
    type Output;
    type Error: std::error::Error;

    /// Run the operation to completion, returning a reference to its result
    fn execute(&mut self) -> Result<&Self::Output, Self::Error>;

    /// How much of the work has been done, from `0.0` to `1.0`
    fn finished_fraction(&self) -> f32;

    /// The result of the last successful [`ProcessingMethod::execute`] call
    fn result(&self) -> Option<&Self::Output>;

    /// Ask the operation to stop early. Implementations may ignore this.
    fn cancel(&mut self);

    fn is_finished(&self) -> bool {
        self.finished_fraction() >= 1.0
    }
}

/// A scan whose signal can be read as a [`SampleBuffer`] and which can produce
/// a copy of itself carrying different samples.
pub trait ProfileScan {
    fn samples(&self) -> &SampleBuffer;

    /// Copy all of this scan's metadata into a new scan holding `samples`
    fn with_samples(&self, samples: SampleBuffer) -> Self
    where
        Self: Sized;
}

impl ProfileScan for SampleBuffer {
    fn samples(&self) -> &SampleBuffer {
        self
    }

    fn with_samples(&self, samples: SampleBuffer) -> Self {
        samples
    }
}

/// A minimal spectrum: identifying metadata plus its samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSpectrum {
    pub index: usize,
    pub id: String,
    pub ms_level: u8,
    pub start_time: f64,
    pub samples: SampleBuffer,
}

impl ProfileSpectrum {
    pub fn new(index: usize, id: String, ms_level: u8, start_time: f64, samples: SampleBuffer) -> Self {
        Self {
            index,
            id,
            ms_level,
            start_time,
            samples,
        }
    }
}

impl ProfileScan for ProfileSpectrum {
    fn samples(&self) -> &SampleBuffer {
        &self.samples
    }

    fn with_samples(&self, samples: SampleBuffer) -> Self {
        Self {
            index: self.index,
            id: self.id.clone(),
            ms_level: self.ms_level,
            start_time: self.start_time,
            samples,
        }
    }
}

/// A wavelet centroider for profile spectra
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WaveletCentroider {
    /// Peaks whose apex intensity does not exceed this value are dropped
    pub noise_level: f32,
    /// The dilation of the wavelet, in samples per wavelet unit
    pub scale_level: u32,
    pub boundary_policy: BoundaryPolicy,
    #[cfg_attr(feature = "serde", serde(with = "kernel_serde"))]
    kernel: Arc<WaveletKernel>,
}

#[cfg(feature = "serde")]
mod kernel_serde {
    use std::sync::Arc;

    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    use crate::wavelet::{KernelParams, WaveletKernel};

    pub fn serialize<S: Serializer>(kernel: &Arc<WaveletKernel>, serializer: S) -> Result<S::Ok, S::Error> {
        kernel.params().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Arc<WaveletKernel>, D::Error> {
        let params = KernelParams::deserialize(deserializer)?;
        WaveletKernel::new(params).map(Arc::new).map_err(D::Error::custom)
    }
}

/// A builder for configuring [`WaveletCentroider`]
#[derive(Debug, Clone)]
pub struct WaveletCentroiderBuilder {
    noise_level: f32,
    scale_level: u32,
    boundary_policy: BoundaryPolicy,
    kernel_params: KernelParams,
    kernel_cache: Option<KernelCache>,
}

impl Default for WaveletCentroiderBuilder {
    fn default() -> Self {
        Self {
            noise_level: 0.0,
            scale_level: 1,
            boundary_policy: BoundaryPolicy::default(),
            kernel_params: KernelParams::default(),
            kernel_cache: None,
        }
    }
}

impl WaveletCentroiderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn noise_level(&mut self, noise_level: f32) -> &mut Self {
        self.noise_level = noise_level;
        self
    }

    pub fn scale_level(&mut self, scale_level: u32) -> &mut Self {
        self.scale_level = scale_level;
        self
    }

    pub fn wavelet_window(&mut self, wavelet_window: f64) -> &mut Self {
        self.kernel_params.window = wavelet_window;
        self
    }

    pub fn boundary_policy(&mut self, boundary_policy: BoundaryPolicy) -> &mut Self {
        self.boundary_policy = boundary_policy;
        self
    }

    /// Change the kernel's resolution and effective support
    pub fn kernel_resolution(&mut self, n_points: usize, support_left: i32, support_right: i32) -> &mut Self {
        self.kernel_params.n_points = n_points;
        self.kernel_params.support_left = support_left;
        self.kernel_params.support_right = support_right;
        self
    }

    /// Fetch the kernel from `cache` instead of building a private one
    pub fn kernel_cache(&mut self, cache: KernelCache) -> &mut Self {
        self.kernel_cache = Some(cache);
        self
    }

    pub fn build(&self) -> Result<WaveletCentroider, WaveletError> {
        if self.scale_level == 0 {
            return Err(WaveletError::ZeroScaleLevel);
        }
        let kernel = match &self.kernel_cache {
            Some(cache) => cache.get_or_build(&self.kernel_params)?,
            None => Arc::new(WaveletKernel::new(self.kernel_params)?),
        };
        Ok(WaveletCentroider::with_kernel(
            self.noise_level,
            self.scale_level,
            self.boundary_policy,
            kernel,
        ))
    }
}

impl WaveletCentroider {
    /// Create a centroider with the default kernel resolution and support
    pub fn new(noise_level: f32, scale_level: u32, wavelet_window: f64) -> Result<Self, WaveletError> {
        WaveletCentroiderBuilder::new()
            .noise_level(noise_level)
            .scale_level(scale_level)
            .wavelet_window(wavelet_window)
            .build()
    }

    /// Create a centroider sharing an already built `kernel`
    pub fn with_kernel(
        noise_level: f32,
        scale_level: u32,
        boundary_policy: BoundaryPolicy,
        kernel: Arc<WaveletKernel>,
    ) -> Self {
        Self {
            noise_level,
            scale_level,
            boundary_policy,
            kernel,
        }
    }

    pub fn builder() -> WaveletCentroiderBuilder {
        WaveletCentroiderBuilder::new()
    }

    pub fn kernel(&self) -> &Arc<WaveletKernel> {
        &self.kernel
    }

    pub fn wavelet_window(&self) -> f64 {
        self.kernel.params().window
    }

    pub fn extractor(&self) -> PeakExtractor {
        PeakExtractor::new(self.noise_level, self.boundary_policy)
    }

    /// Compute the clipped wavelet response of `intensity_array`
    pub fn transform(&self, intensity_array: &[f32]) -> Result<Vec<f32>, WaveletError> {
        self.kernel.transform(intensity_array, self.scale_level)
    }

    /// Centroid the signal in `mz_array` and `intensity_array`, adding the picked
    /// samples to `accumulator`.
    ///
    /// Returns the number of peaks added.
    pub fn centroid_into(
        &self,
        mz_array: &[f64],
        intensity_array: &[f32],
        accumulator: &mut SampleBuffer,
    ) -> Result<usize, WaveletError> {
        if intensity_array.is_empty() {
            return Ok(0);
        }
        let response = self.transform(intensity_array)?;
        let count = self
            .extractor()
            .extract(mz_array, intensity_array, &response, accumulator);
        debug!(
            "Centroided {} samples into {count} peaks at scale {}",
            intensity_array.len(),
            self.scale_level
        );
        Ok(count)
    }

    /// Centroid `samples` into a new buffer
    pub fn centroid(&self, samples: &SampleBuffer) -> Result<SampleBuffer, WaveletError> {
        let mut accumulator = SampleBuffer::new();
        self.centroid_into(samples.mz_array(), samples.intensity_array(), &mut accumulator)?;
        Ok(accumulator)
    }
}

/// Centroid one [`ProfileScan`], producing a copy of it that holds the picked peaks.
#[derive(Debug, Clone)]
pub struct WaveletCentroidingMethod<'a, S: ProfileScan> {
    scan: &'a S,
    centroider: WaveletCentroider,
    progress: f32,
    result: Option<S>,
}

impl<'a, S: ProfileScan> WaveletCentroidingMethod<'a, S> {
    pub fn new(scan: &'a S, centroider: WaveletCentroider) -> Self {
        Self {
            scan,
            centroider,
            progress: 0.0,
            result: None,
        }
    }

    /// Build the centroider from the given parameters, fetching its kernel from `cache`
    pub fn from_params(
        scan: &'a S,
        cache: &KernelCache,
        noise_level: f32,
        scale_level: u32,
        wavelet_window: f64,
    ) -> Result<Self, WaveletError> {
        let centroider = WaveletCentroider::builder()
            .noise_level(noise_level)
            .scale_level(scale_level)
            .wavelet_window(wavelet_window)
            .kernel_cache(cache.clone())
            .build()?;
        Ok(Self::new(scan, centroider))
    }

    pub fn centroider(&self) -> &WaveletCentroider {
        &self.centroider
    }

    /// Take ownership of the result, if the method has finished
    pub fn into_result(self) -> Option<S> {
        self.result
    }
}

impl<S: ProfileScan> ProcessingMethod for WaveletCentroidingMethod<'_, S> {
    type Output = S;
    type Error = WaveletError;

    fn execute(&mut self) -> Result<&S, WaveletError> {
        let samples = self.scan.samples();
        let peaks = if samples.is_empty() {
            SampleBuffer::new()
        } else {
            self.centroider.centroid(samples)?
        };
        self.progress = 1.0;
        Ok(&*self.result.insert(self.scan.with_samples(peaks)))
    }

    fn finished_fraction(&self) -> f32 {
        self.progress
    }

    fn result(&self) -> Option<&S> {
        self.result.as_ref()
    }

    /// A single transform is too quick to be worth interrupting, so this does nothing.
    fn cancel(&mut self) {
        debug!("Cancellation requested for wavelet centroiding, ignoring");
    }
}

/// A convenience function that centroids `samples` with the default kernel resolution.
pub fn centroid(
    samples: &SampleBuffer,
    noise_level: f32,
    scale_level: u32,
    wavelet_window: f64,
) -> Result<SampleBuffer, WaveletError> {
    WaveletCentroider::new(noise_level, scale_level, wavelet_window)?.centroid(samples)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::buffer::is_increasing;
    use crate::sample::Sample;
    use crate::test_data::{gaussian_spectrum, multi_peak_spectrum};

    #[test_log::test]
    fn test_single_synthetic_peak() {
        let spectrum = gaussian_spectrum(100, 50, 1000.0, 1.0);
        let peaks = centroid(&spectrum, 10.0, 2, 1.0).unwrap();
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks.get(0), spectrum.get(50));
        assert_eq!(peaks.intensity_array(), &[1000.0]);
    }

    #[test_log::test]
    fn test_noise_suppression() {
        let spectrum = gaussian_spectrum(100, 50, 5.0, 1.0);
        let peaks = centroid(&spectrum, 10.0, 2, 1.0).unwrap();
        assert!(peaks.is_empty());
    }

    #[test_log::test]
    fn test_multiple_peaks() {
        let spectrum = multi_peak_spectrum();
        let centroider = WaveletCentroider::new(10.0, 2, 1.0).unwrap();
        let peaks = centroider.centroid(&spectrum).unwrap();
        let expected: Vec<Sample> = [60, 150, 240]
            .into_iter()
            .map(|i| spectrum.get(i).unwrap())
            .collect();
        let observed: Vec<Sample> = peaks.iter().collect();
        assert_eq!(observed, expected);
        assert!(is_increasing(peaks.mz_array()));

        let mut acc = SampleBuffer::new();
        let count = centroider
            .centroid_into(spectrum.mz_array(), spectrum.intensity_array(), &mut acc)
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(acc, peaks);
    }

    #[test]
    fn test_empty_input() {
        let empty = SampleBuffer::new();
        let cache = KernelCache::new();
        let mut method = WaveletCentroidingMethod::from_params(&empty, &cache, 10.0, 2, 1.0).unwrap();
        assert_eq!(method.finished_fraction(), 0.0);
        assert!(method.result().is_none());
        let result = method.execute().unwrap();
        assert!(result.is_empty());
        assert_eq!(method.finished_fraction(), 1.0);
        assert!(method.is_finished());
    }

    #[test]
    fn test_method_keeps_metadata() {
        let spectrum = ProfileSpectrum::new(
            12,
            "scan=13".to_string(),
            1,
            5.25,
            gaussian_spectrum(100, 50, 1000.0, 1.0),
        );
        let cache = KernelCache::new();
        let mut method = WaveletCentroidingMethod::from_params(&spectrum, &cache, 10.0, 2, 1.0).unwrap();
        method.cancel();
        method.execute().unwrap();
        assert!(method.is_finished());

        let result = method.into_result().unwrap();
        assert_eq!(result.index, 12);
        assert_eq!(result.id, "scan=13");
        assert_eq!(result.ms_level, 1);
        assert_eq!(result.start_time, 5.25);
        assert_eq!(result.samples.len(), 1);
        assert_eq!(spectrum.samples.len(), 100);
    }

    #[test]
    fn test_shared_kernel() {
        let cache = KernelCache::new();
        let a = WaveletCentroider::builder()
            .noise_level(10.0)
            .scale_level(2)
            .kernel_cache(cache.clone())
            .build()
            .unwrap();
        let b = WaveletCentroider::builder()
            .noise_level(50.0)
            .scale_level(3)
            .kernel_cache(cache.clone())
            .build()
            .unwrap();
        assert!(Arc::ptr_eq(a.kernel(), b.kernel()));
        assert_eq!(cache.len(), 1);
        assert_eq!(a.wavelet_window(), 1.0);
    }

    #[test]
    fn test_invalid_configuration() {
        assert_eq!(
            WaveletCentroider::new(10.0, 0, 1.0).unwrap_err(),
            WaveletError::ZeroScaleLevel
        );
        let err = WaveletCentroider::builder()
            .kernel_resolution(100, 3, 3)
            .build()
            .unwrap_err();
        assert_eq!(err, WaveletError::InvalidSupport { left: 3, right: 3 });
    }

    #[test]
    fn test_trailing_peak_policy() {
        let spectrum = gaussian_spectrum(100, 97, 1000.0, 1.0);
        let truncated = WaveletCentroider::new(10.0, 2, 1.0).unwrap();
        assert!(truncated.centroid(&spectrum).unwrap().is_empty());

        let included = WaveletCentroider::builder()
            .noise_level(10.0)
            .scale_level(2)
            .boundary_policy(BoundaryPolicy::IncludeTrailing)
            .build()
            .unwrap();
        let peaks = included.centroid(&spectrum).unwrap();
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks.get(0), spectrum.get(97));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_round_trip() {
        let centroider = WaveletCentroider::new(10.0, 2, 0.5).unwrap();
        let text = serde_json::to_string(&centroider).unwrap();
        let dup: WaveletCentroider = serde_json::from_str(&text).unwrap();
        assert_eq!(dup.noise_level, 10.0);
        assert_eq!(dup.scale_level, 2);
        assert_eq!(dup.kernel().params(), centroider.kernel().params());
    }
}
