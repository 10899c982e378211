pub use crate::buffer::SampleBuffer;
pub use crate::centroid::{ProcessingMethod, ProfileScan};
pub use crate::sample::Sample;
