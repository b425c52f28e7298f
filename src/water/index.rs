use std::fmt::Display;

use crate::raster::{Raster, RasterError};
use crate::sat_bands::{SatBands, Satellites};

// Centre wavelengths (nm) the indices are defined on.
const GREEN_NM: u32 = 560;
const NIR_NM: u32 = 842;
const SWIR1_NM: u32 = 1610;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaterIndex {
    /// Green vs. near-infrared
    Ndwi,
    /// Green vs. shortwave-infrared
    Mndwi,
}

impl WaterIndex {
    pub fn name(&self) -> &'static str {
        match self {
            WaterIndex::Ndwi => "NDWI",
            WaterIndex::Mndwi => "MNDWI",
        }
    }

    /// Sentinel-2 band pair `(a, b)` for `(a - b) / (a + b)`.
    pub fn bands(&self) -> (&'static str, &'static str) {
        let bands = SatBands::new(Satellites::Sentinel2);
        let other = match self {
            WaterIndex::Ndwi => NIR_NM,
            WaterIndex::Mndwi => SWIR1_NM,
        };
        (bands.closest_band(GREEN_NM), bands.closest_band(other))
    }
}

impl Display for WaterIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// `(a - b) / (a + b)` clamped to [-1, 1]; NaN when an input is no-data or
/// the sum is zero.
pub fn normalized_difference(a: f32, b: f32) -> f32 {
    let sum = a + b;
    if a.is_nan() || b.is_nan() || sum == 0.0 {
        return f32::NAN;
    }
    ((a - b) / sum).clamp(-1.0, 1.0)
}

/// Returns `raster` with the index band added, keeping every other band.
pub fn add_index(raster: Raster, index: WaterIndex) -> Result<Raster, RasterError> {
    let (a, b) = index.bands();

    let values: Vec<f32> = raster
        .band(a)?
        .iter()
        .zip(raster.band(b)?)
        .map(|(&a, &b)| normalized_difference(a, b))
        .collect();

    raster.with_band(index.name(), values)
}
