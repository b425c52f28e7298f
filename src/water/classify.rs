use crate::raster::{Mask, Raster, RasterError};

/// Which side of the threshold counts as `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    Less,
    GreaterOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub value: f32,
    pub comparison: Comparison,
}

impl Threshold {
    pub fn above(value: f32) -> Self {
        Self {
            value,
            comparison: Comparison::Greater,
        }
    }

    pub fn below(value: f32) -> Self {
        Self {
            value,
            comparison: Comparison::Less,
        }
    }

    pub fn at_least(value: f32) -> Self {
        Self {
            value,
            comparison: Comparison::GreaterOrEqual,
        }
    }

    /// `None` for no-data input; never classified as water.
    pub fn test(&self, v: f32) -> Option<bool> {
        if v.is_nan() {
            return None;
        }
        Some(match self.comparison {
            Comparison::Greater => v > self.value,
            Comparison::Less => v < self.value,
            Comparison::GreaterOrEqual => v >= self.value,
        })
    }
}

pub fn classify(raster: &Raster, band: &str, threshold: Threshold) -> Result<Mask, RasterError> {
    let cells = raster
        .band(band)?
        .iter()
        .map(|&v| threshold.test(v))
        .collect();

    Mask::new(*raster.grid(), cells)
}
