//! An m/z-ordered, growable container of spectrum samples.
//!
//! [`SampleBuffer`] keeps m/z values and intensities in two parallel arrays so
//! that signal processing code can borrow them directly as `&[f64]` and `&[f32]`.
//! The length of the backing arrays is the buffer's *capacity*, while the logical
//! size counts how many of those slots hold valid samples.
//!
//! Every mutating operation keeps the m/z array in non-decreasing order, and
//! any operation that would break that order fails without touching the buffer.
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Bound, RangeBounds, RangeInclusive};

use mzpeaks::{CentroidPeak, MZPeakSetType};
use num_traits::Float;
use thiserror::Error;

use crate::sample::Sample;

const DEFAULT_CAPACITY: usize = 100;

/// All the ways mutating a [`SampleBuffer`] can fail
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SampleBufferError {
    #[error("Placing m/z {mz} at position {index} would break the m/z ordering of the samples")]
    OrderViolation { index: usize, mz: f64 },
    #[error("Position {index} is out of range (buffer size is {size})")]
    IndexOutOfRange { index: usize, size: usize },
    #[error("Requested size {requested} exceeds the buffer capacity {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },
    #[error("The m/z and intensity arrays do not match in length ({mz_len} != {intensity_len})")]
    LengthMismatch { mz_len: usize, intensity_len: usize },
}

/// Check that `values` never decrease, returning the position of the first
/// element that is smaller than its predecessor if they do. A NaN is never in
/// order.
pub fn first_decrease<F: Float>(values: &[F]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .position(|(i, v)| v.is_nan() || (i > 0 && values[i - 1] > *v))
}

/// Check if the values in `values` are monotonically ascending or flat
pub fn is_increasing<F: Float>(values: &[F]) -> bool {
    first_decrease(values).is_none()
}

fn contains_value<T: PartialOrd, R: RangeBounds<T>>(range: &R, value: &T) -> bool {
    let lower = match range.start_bound() {
        Bound::Included(lo) => lo <= value,
        Bound::Excluded(lo) => lo < value,
        Bound::Unbounded => true,
    };
    let upper = match range.end_bound() {
        Bound::Included(hi) => value <= hi,
        Bound::Excluded(hi) => value < hi,
        Bound::Unbounded => true,
    };
    lower && upper
}

/// A growable list of [`Sample`]s kept in ascending m/z order.
///
/// This type is not internally synchronized. Sharing one buffer between
/// threads requires the usual `&mut` discipline or an external lock.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    mz_buffer: Vec<f64>,
    intensity_buffer: Vec<f32>,
    size: usize,
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl SampleBuffer {
    /// Create an empty buffer with room for 100 samples
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` samples
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            mz_buffer: vec![0.0; capacity],
            intensity_buffer: vec![0.0; capacity],
            size: 0,
        }
    }

    /// Create a buffer that takes ownership of `mz_buffer` and `intensity_buffer`,
    /// treating the first `size` entries as valid samples.
    pub fn from_buffers(
        mz_buffer: Vec<f64>,
        intensity_buffer: Vec<f32>,
        size: usize,
    ) -> Result<Self, SampleBufferError> {
        let mut inst = Self::with_capacity(0);
        inst.set_buffers(mz_buffer, intensity_buffer, size)?;
        Ok(inst)
    }

    /// Create a deep copy of `source` whose backing arrays hold `capacity` slots.
    pub fn copy_with_capacity(source: &Self, capacity: usize) -> Result<Self, SampleBufferError> {
        if capacity < source.len() {
            return Err(SampleBufferError::CapacityExceeded {
                requested: source.len(),
                capacity,
            });
        }
        let mut inst = Self::with_capacity(capacity);
        inst.copy_from(source);
        Ok(inst)
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The number of samples the backing arrays can hold without growing
    pub fn capacity(&self) -> usize {
        self.mz_buffer.len()
    }

    /// The m/z values of the valid samples
    pub fn mz_array(&self) -> &[f64] {
        &self.mz_buffer[..self.size]
    }

    /// The intensities of the valid samples
    pub fn intensity_array(&self) -> &[f32] {
        &self.intensity_buffer[..self.size]
    }

    pub fn get(&self, index: usize) -> Option<Sample> {
        if index < self.size {
            Some(Sample::new(self.mz_buffer[index], self.intensity_buffer[index]))
        } else {
            None
        }
    }

    pub fn first(&self) -> Option<Sample> {
        self.get(0)
    }

    pub fn last(&self) -> Option<Sample> {
        self.size.checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> SampleIter<'_> {
        SampleIter {
            buffer: self,
            index: 0,
        }
    }

    /// Forget all samples, keeping the backing storage
    pub fn clear(&mut self) {
        self.size = 0;
    }

    fn check_order_at(&self, index: usize, mz: f64, upper: usize) -> Result<(), SampleBufferError> {
        if mz.is_nan() {
            return Err(SampleBufferError::OrderViolation { index, mz });
        }
        if index > 0 && self.mz_buffer[index - 1] > mz {
            return Err(SampleBufferError::OrderViolation { index, mz });
        }
        if upper < self.size && self.mz_buffer[upper] < mz {
            return Err(SampleBufferError::OrderViolation { index, mz });
        }
        Ok(())
    }

    fn grow_for(&mut self, index: usize) {
        let capacity = self.capacity();
        if index < capacity && self.size < capacity {
            return;
        }
        let new_capacity = (capacity * 2).max(index * 2).max(self.size + 1);
        self.mz_buffer.resize(new_capacity, 0.0);
        self.intensity_buffer.resize(new_capacity, 0.0);
    }

    /// Insert a new sample at its sorted position.
    ///
    /// A sample that sorts at or after the current last one is appended directly.
    /// Otherwise the position is found by a linear scan from the front for the first
    /// sample whose m/z is strictly greater than `mz`, so samples with equal m/z keep
    /// their insertion order. Returns the index the sample was placed at.
    ///
    /// `mz` must not be NaN, since a NaN has no sorted position.
    pub fn add(&mut self, mz: f64, intensity: f32) -> usize {
        debug_assert!(!mz.is_nan(), "Cannot order a NaN m/z");
        let index = match self.mz_array().last() {
            Some(last) if *last > mz => self.mz_array().iter().position(|x| *x > mz).unwrap_or(self.size),
            _ => self.size,
        };
        self.place(index, mz, intensity);
        index
    }

    /// Insert a new sample at `index`, shifting later samples to the right.
    ///
    /// Fails if `index` is past the end of the list or if the new m/z would not fit
    /// between its neighbors.
    pub fn insert(&mut self, index: usize, mz: f64, intensity: f32) -> Result<(), SampleBufferError> {
        if index > self.size {
            return Err(SampleBufferError::IndexOutOfRange {
                index,
                size: self.size,
            });
        }
        self.check_order_at(index, mz, index)?;
        self.place(index, mz, intensity);
        Ok(())
    }

    fn place(&mut self, index: usize, mz: f64, intensity: f32) {
        self.grow_for(index);
        if index < self.size {
            self.mz_buffer.copy_within(index..self.size, index + 1);
            self.intensity_buffer.copy_within(index..self.size, index + 1);
        }
        self.mz_buffer[index] = mz;
        self.intensity_buffer[index] = intensity;
        self.size += 1;
    }

    /// Push a sample that is already known to belong at the end of the list
    pub fn push(&mut self, mz: f64, intensity: f32) -> Result<(), SampleBufferError> {
        self.insert(self.size, mz, intensity)
    }

    /// Remove and return the sample at `index`
    pub fn remove(&mut self, index: usize) -> Result<Sample, SampleBufferError> {
        let current = self.get(index).ok_or(SampleBufferError::IndexOutOfRange {
            index,
            size: self.size,
        })?;
        self.mz_buffer.copy_within(index + 1..self.size, index);
        self.intensity_buffer.copy_within(index + 1..self.size, index);
        self.size -= 1;
        Ok(current)
    }

    /// Replace the sample at `index`, returning the previous one
    pub fn set(&mut self, index: usize, sample: Sample) -> Result<Sample, SampleBufferError> {
        let current = self.get(index).ok_or(SampleBufferError::IndexOutOfRange {
            index,
            size: self.size,
        })?;
        self.check_order_at(index, sample.mz, index + 1)?;
        self.mz_buffer[index] = sample.mz;
        self.intensity_buffer[index] = sample.intensity;
        Ok(current)
    }

    fn validate_size(mz_buffer: &[f64], size: usize) -> Result<(), SampleBufferError> {
        if size > mz_buffer.len() {
            return Err(SampleBufferError::CapacityExceeded {
                requested: size,
                capacity: mz_buffer.len(),
            });
        }
        if let Some(index) = first_decrease(&mz_buffer[..size]) {
            return Err(SampleBufferError::OrderViolation {
                index,
                mz: mz_buffer[index],
            });
        }
        Ok(())
    }

    /// Change the number of valid samples.
    ///
    /// Growing the size exposes whatever the backing arrays hold past the current
    /// end, so the first `size` m/z values must still be in ascending order.
    pub fn set_size(&mut self, size: usize) -> Result<(), SampleBufferError> {
        Self::validate_size(&self.mz_buffer, size)?;
        self.size = size;
        Ok(())
    }

    /// Replace the backing arrays with `mz_buffer` and `intensity_buffer`.
    ///
    /// The vectors are moved into the buffer and the old storage is dropped. They
    /// are validated before the swap, so on error the buffer is left as it was and
    /// the rejected vectors are dropped.
    pub fn set_buffers(
        &mut self,
        mz_buffer: Vec<f64>,
        intensity_buffer: Vec<f32>,
        size: usize,
    ) -> Result<(), SampleBufferError> {
        if mz_buffer.len() != intensity_buffer.len() {
            return Err(SampleBufferError::LengthMismatch {
                mz_len: mz_buffer.len(),
                intensity_len: intensity_buffer.len(),
            });
        }
        Self::validate_size(&mz_buffer, size)?;
        self.mz_buffer = mz_buffer;
        self.intensity_buffer = intensity_buffer;
        self.size = size;
        Ok(())
    }

    /// Give up the backing arrays, truncated to the valid samples
    pub fn into_buffers(mut self) -> (Vec<f64>, Vec<f32>) {
        self.mz_buffer.truncate(self.size);
        self.intensity_buffer.truncate(self.size);
        (self.mz_buffer, self.intensity_buffer)
    }

    /// Overwrite this buffer's contents with a copy of `other`'s samples,
    /// growing the backing arrays if they are too small.
    pub fn copy_from(&mut self, other: &Self) {
        let n = other.len();
        if self.capacity() < n {
            self.mz_buffer.resize(n, 0.0);
            self.intensity_buffer.resize(n, 0.0);
        }
        self.mz_buffer[..n].copy_from_slice(other.mz_array());
        self.intensity_buffer[..n].copy_from_slice(other.intensity_array());
        self.size = n;
    }

    /// Overwrite `other`'s contents with a copy of this buffer's samples
    pub fn copy_to(&self, other: &mut Self) {
        other.copy_from(self)
    }

    /// The m/z interval spanned by the samples.
    ///
    /// This relies on the ordering invariant and only reads the two ends.
    pub fn mz_range(&self) -> Option<RangeInclusive<f64>> {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => Some(first.mz..=last.mz),
            _ => None,
        }
    }

    /// The position of the most intense sample, the earliest one on ties
    pub fn highest_sample_index(&self) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let intensities = self.intensity_array();
        let mut max_index = 0;
        for (i, intensity) in intensities.iter().enumerate().skip(1) {
            if *intensity > intensities[max_index] {
                max_index = i;
            }
        }
        Some(max_index)
    }

    /// The most intense sample, the earliest one on ties
    pub fn highest_sample(&self) -> Option<Sample> {
        self.highest_sample_index().and_then(|i| self.get(i))
    }

    /// The sum of all intensities.
    ///
    /// The sum is accumulated in `f32` in ascending index order, so two buffers
    /// with identical contents always produce bit-identical totals.
    pub fn total_intensity(&self) -> f32 {
        let mut total = 0.0f32;
        for intensity in self.intensity_array() {
            total += *intensity;
        }
        total
    }

    /// Copy the samples whose m/z falls in `mz_range` and whose intensity falls in
    /// `intensity_range` into a new buffer, preserving their order.
    pub fn select_samples<M: RangeBounds<f64>, I: RangeBounds<f32>>(
        &self,
        mz_range: M,
        intensity_range: I,
    ) -> SampleBuffer {
        let mut selected = SampleBuffer::new();
        for sample in self.iter() {
            if contains_value(&mz_range, &sample.mz)
                && contains_value(&intensity_range, &sample.intensity)
            {
                selected.place(selected.size, sample.mz, sample.intensity);
            }
        }
        selected
    }

    /// Convert the samples into an `mzpeaks` peak set, indexed by position
    pub fn to_peak_set(&self) -> MZPeakSetType<CentroidPeak> {
        let peaks: Vec<CentroidPeak> = self
            .iter()
            .enumerate()
            .map(|(i, s)| CentroidPeak::new(s.mz, s.intensity, i as u32))
            .collect();
        MZPeakSetType::new(peaks)
    }
}

/// Capacity does not take part in equality, and values are compared by their
/// bit patterns so that `Eq` and [`Hash`] agree.
impl PartialEq for SampleBuffer {
    fn eq(&self, other: &Self) -> bool {
        if self.size != other.size {
            return false;
        }
        self.mz_array()
            .iter()
            .zip(other.mz_array())
            .all(|(a, b)| a.to_bits() == b.to_bits())
            && self
                .intensity_array()
                .iter()
                .zip(other.intensity_array())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for SampleBuffer {}

impl Hash for SampleBuffer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.size.hash(state);
        for (mz, intensity) in self.mz_array().iter().zip(self.intensity_array()) {
            mz.to_bits().hash(state);
            intensity.to_bits().hash(state);
        }
    }
}

impl fmt::Display for SampleBuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (i, sample) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", sample)?;
        }
        write!(f, "]")
    }
}

/// Iterator over the [`Sample`]s of a [`SampleBuffer`]
pub struct SampleIter<'a> {
    buffer: &'a SampleBuffer,
    index: usize,
}

impl Iterator for SampleIter<'_> {
    type Item = Sample;

    fn next(&mut self) -> Option<Self::Item> {
        let sample = self.buffer.get(self.index)?;
        self.index += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.buffer.len() - self.index;
        (rest, Some(rest))
    }
}

impl ExactSizeIterator for SampleIter<'_> {}

impl<'a> IntoIterator for &'a SampleBuffer {
    type Item = Sample;
    type IntoIter = SampleIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Extend<Sample> for SampleBuffer {
    fn extend<T: IntoIterator<Item = Sample>>(&mut self, iter: T) {
        for sample in iter {
            self.add(sample.mz, sample.intensity);
        }
    }
}

impl FromIterator<Sample> for SampleBuffer {
    fn from_iter<T: IntoIterator<Item = Sample>>(iter: T) -> Self {
        let mut inst = SampleBuffer::new();
        inst.extend(iter);
        inst
    }
}
