//! Pick peak apices out of a wavelet response.
//!
//! The response is scanned once from left to right. Each maximal run of strictly
//! positive coefficients is one candidate peak, represented by the position of its
//! largest coefficient. The candidate is kept when the *original* signal at that
//! position rises above the noise level.
use log::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::buffer::SampleBuffer;

/// What to do with a run of positive coefficients that reaches the end of the
/// response.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BoundaryPolicy {
    /// Stop scanning as soon as the last index of the response is reached. A run
    /// still open at the end, or one that is closed by the very last coefficient,
    /// is discarded.
    #[default]
    Truncate,
    /// Evaluate the final run like any other run.
    IncludeTrailing,
}

/// Extract apices from a wavelet response
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeakExtractor {
    /// The intensity a candidate's apex must strictly exceed to be reported
    pub noise_level: f32,
    pub boundary_policy: BoundaryPolicy,
}

impl PeakExtractor {
    pub fn new(noise_level: f32, boundary_policy: BoundaryPolicy) -> Self {
        Self {
            noise_level,
            boundary_policy,
        }
    }

    fn emit(
        &self,
        apex: usize,
        mz_array: &[f64],
        intensity_array: &[f32],
        accumulator: &mut SampleBuffer,
    ) -> bool {
        let intensity = intensity_array[apex];
        if intensity > self.noise_level {
            if log::log_enabled!(log::Level::Trace) {
                trace!("Keeping apex {apex} at m/z {} ({intensity})", mz_array[apex]);
            }
            accumulator.add(mz_array[apex], intensity);
            true
        } else {
            false
        }
    }

    /// Find the apices of `response` and add the matching samples from `mz_array`
    /// and `intensity_array` to `accumulator`.
    ///
    /// All three arrays are expected to have the same length. Returns the number of
    /// peaks added.
    pub fn extract(
        &self,
        mz_array: &[f64],
        intensity_array: &[f32],
        response: &[f32],
        accumulator: &mut SampleBuffer,
    ) -> usize {
        debug_assert_eq!(mz_array.len(), intensity_array.len());
        debug_assert_eq!(response.len(), intensity_array.len());
        if response.is_empty() {
            return 0;
        }
        let include_trailing = self.boundary_policy == BoundaryPolicy::IncludeTrailing;
        let stop = response.len() - 1;
        let mut count = 0;
        let mut index = 0;

        while index <= stop {
            while index <= stop && response[index] == 0.0 {
                index += 1;
            }
            let mut apex = index;
            if index >= stop {
                if include_trailing && index == stop && response[stop] > 0.0 {
                    count += self.emit(stop, mz_array, intensity_array, accumulator) as usize;
                }
                break;
            }

            while index <= stop && response[index] > 0.0 {
                if response[index] > response[apex] {
                    apex = index;
                }
                index += 1;
            }
            if index >= stop {
                if include_trailing {
                    count += self.emit(apex, mz_array, intensity_array, accumulator) as usize;
                }
                break;
            }

            count += self.emit(apex, mz_array, intensity_array, accumulator) as usize;
            index += 1;
        }
        count
    }
}
