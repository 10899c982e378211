//! Synthetic spectra shared by the unit tests.
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::buffer::SampleBuffer;

/// A reproducible random number generator for `seed`
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// `n` samples with ascending m/z starting at 100 and random intensities
pub fn random_samples(n: usize, seed: u64) -> SampleBuffer {
    let mut rng = seeded_rng(seed);
    let mut mz = 100.0;
    let mut buffer = SampleBuffer::with_capacity(n);
    for _ in 0..n {
        mz += rng.gen_range(0.0f64..0.01);
        buffer.add(mz, rng.gen_range(0.0f32..1000.0));
    }
    buffer
}

/// An evenly spaced m/z axis of `n` points starting at `start`
pub fn mz_axis(n: usize, start: f64, step: f64) -> Vec<f64> {
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// A Gaussian bump of height `apex` centered on sample `center`, with a
/// standard deviation of `width` samples, over `n` samples.
pub fn gaussian_bump(n: usize, center: usize, apex: f32, width: f64) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let d = i as f64 - center as f64;
            (apex as f64 * (-(d * d) / (2.0 * width * width)).exp()) as f32
        })
        .collect()
}

/// A profile spectrum with the bump above placed on an m/z axis.
pub fn gaussian_spectrum(n: usize, center: usize, apex: f32, width: f64) -> SampleBuffer {
    let mz = mz_axis(n, 500.0, 0.01);
    let intensity = gaussian_bump(n, center, apex, width);
    SampleBuffer::from_buffers(mz, intensity, n).unwrap()
}

/// Several well separated bumps of different heights
pub fn multi_peak_spectrum() -> SampleBuffer {
    let n = 400;
    let mut intensity = vec![0.0f32; n];
    for (center, apex) in [(60, 800.0), (150, 40.0), (240, 2500.0), (330, 5.0)] {
        for (acc, y) in intensity.iter_mut().zip(gaussian_bump(n, center, apex, 1.5)) {
            *acc += y;
        }
    }
    SampleBuffer::from_buffers(mz_axis(n, 200.0, 0.005), intensity, n).unwrap()
}
