use std::cmp::Ordering;
use std::fmt;

use mzpeaks::peak::MZPoint;
use mzpeaks::{CentroidPeak, CoordinateLike, IntensityMeasurement, MZ};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
/// A single (m/z, intensity) point of a spectrum.
///
/// A [`Sample`] implements [`CoordinateLike`](https://docs.rs/mzpeaks/latest/mzpeaks/coordinate/trait.CoordinateLike.html)
/// over m/z and [`IntensityMeasurement`], so it can be handed to anything in the
/// `mzpeaks` ecosystem that only needs a position and a height.
///
/// Equality is exact on both fields, and ordering is by m/z first.
pub struct Sample {
    pub mz: f64,
    pub intensity: f32,
}

impl Sample {
    pub fn new(mz: f64, intensity: f32) -> Self {
        Self { mz, intensity }
    }
}

impl CoordinateLike<MZ> for Sample {
    #[inline]
    fn coordinate(&self) -> f64 {
        self.mz
    }
}

impl IntensityMeasurement for Sample {
    #[inline]
    fn intensity(&self) -> f32 {
        self.intensity
    }
}

impl PartialOrd for Sample {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.mz.partial_cmp(&other.mz)? {
            Ordering::Equal => self.intensity.partial_cmp(&other.intensity),
            ord => Some(ord),
        }
    }
}

impl From<(f64, f32)> for Sample {
    fn from((mz, intensity): (f64, f32)) -> Self {
        Self { mz, intensity }
    }
}

impl From<Sample> for (f64, f32) {
    fn from(sample: Sample) -> Self {
        (sample.mz, sample.intensity)
    }
}

impl From<Sample> for MZPoint {
    fn from(sample: Sample) -> Self {
        Self {
            mz: sample.coordinate(),
            intensity: sample.intensity(),
        }
    }
}

impl From<MZPoint> for Sample {
    fn from(value: MZPoint) -> Self {
        Self {
            mz: value.mz,
            intensity: value.intensity,
        }
    }
}

/// Conversion from a [`mzpeaks::CentroidPeak`], dropping its index
impl From<CentroidPeak> for Sample {
    fn from(peak: CentroidPeak) -> Self {
        Self {
            mz: peak.coordinate(),
            intensity: peak.intensity(),
        }
    }
}

impl From<Sample> for CentroidPeak {
    fn from(sample: Sample) -> Self {
        CentroidPeak::new(sample.mz, sample.intensity, 0)
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.mz, self.intensity)
    }
}
