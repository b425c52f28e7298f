use std::fmt;

use crate::raster::Mask;

/// Valid-pixel statistics of a band, NaN excluded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterSummary {
    pub valid: usize,
    pub total: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
}

impl RasterSummary {
    pub fn from_values(values: &[f32]) -> Self {
        let valid_values: Vec<f32> = values.iter().copied().filter(|v| !v.is_nan()).collect();

        let mean = if valid_values.is_empty() {
            f32::NAN
        } else {
            valid_values.iter().sum::<f32>() / valid_values.len() as f32
        };

        Self {
            valid: valid_values.len(),
            total: values.len(),
            min: valid_values.iter().fold(f32::INFINITY, |a, &b| a.min(b)),
            max: valid_values.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b)),
            mean,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.valid == 0
    }
}

impl fmt::Display for RasterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_blank() {
            return write!(f, "no valid pixels (0 / {})", self.total);
        }
        write!(
            f,
            "min {:.2}, max {:.2}, mean {:.2}, valid pixels {} / {} ({:.1}%)",
            self.min,
            self.max,
            self.mean,
            self.valid,
            self.total,
            100.0 * self.valid as f32 / self.total as f32
        )
    }
}

/// Pixel counts of a water mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskSummary {
    pub water: usize,
    pub dry: usize,
    pub no_data: usize,
}

impl MaskSummary {
    pub fn from_mask(mask: &Mask) -> Self {
        let water = mask.count_true();
        let defined = mask.count_defined();

        Self {
            water,
            dry: defined - water,
            no_data: mask.cells().len() - defined,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.water == 0
    }
}

impl fmt::Display for MaskSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.water + self.dry + self.no_data;
        write!(
            f,
            "water pixels {} / {} ({:.1}%)",
            self.water,
            total,
            if total == 0 {
                0.0
            } else {
                100.0 * self.water as f32 / total as f32
            }
        )
    }
}
