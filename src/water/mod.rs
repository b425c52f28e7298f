//! Per-pixel water products: spectral indices, thresholding and the
//! seasonal-minus-permanent flood difference.

pub mod classify;
pub mod flood;
pub mod index;

pub use classify::{Comparison, Threshold, classify};
pub use flood::extract_flood;
pub use index::{WaterIndex, add_index, normalized_difference};
