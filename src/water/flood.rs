use crate::raster::{Mask, RasterError};

/// Seasonal water that is not part of the permanent baseline.
///
/// A pixel survives only when `seasonal` is water and `baseline` is
/// defined and not permanent water. A pixel masked in either input stays
/// masked.
pub fn extract_flood(seasonal: &Mask, baseline: &Mask) -> Result<Mask, RasterError> {
    seasonal.zip_with(baseline, |season, permanent| match (season, permanent) {
        (Some(true), Some(false)) => Some(true),
        _ => None,
    })
}
