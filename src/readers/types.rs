use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::raster::Grid;

pub trait DataReader {
    fn read_data(&self) -> Result<Data, ReadError>;
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("GeoTIFF error in {path}: {reason}")]
    GeoTiff { path: PathBuf, reason: String },
    #[error("Unsupported file type: {0}")]
    UnknownFileType(PathBuf),
    #[error("Scene {scene} has no band {band}")]
    MissingBand { scene: String, band: String },
    #[error("{path} is {found:?} pixels, analysis grid is {expected:?}")]
    GridMismatch {
        path: PathBuf,
        expected: (u32, u32),
        found: (u32, u32),
    },
}

impl ReadError {
    /// Only I/O failures are worth retrying; decoding and alignment
    /// problems fail the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(self, ReadError::Io { .. })
    }
}

#[derive(Debug)]
pub struct Data {
    pub width: u32,
    pub height: u32,
    pub buffer: Vec<f32>,
}

impl Data {
    /// Hands the buffer over when its dimensions match `grid`.
    pub fn into_band(self, grid: &Grid, path: PathBuf) -> Result<Vec<f32>, ReadError> {
        if (self.width, self.height) != grid.dims() {
            return Err(ReadError::GridMismatch {
                path,
                expected: grid.dims(),
                found: (self.width, self.height),
            });
        }
        Ok(self.buffer)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum FileType {
    GeoTiff,
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let min_value = self
            .buffer
            .iter()
            .copied()
            .filter(|x| !x.is_nan())
            .fold(f32::NAN, f32::min);

        let max_value = self
            .buffer
            .iter()
            .copied()
            .filter(|x| !x.is_nan())
            .fold(f32::NAN, f32::max);

        write!(
            f,
            "Width: {}\nHeight: {}\nBuffer Length: {}\nMin value: {}\nMax value: {}",
            self.width,
            self.height,
            self.buffer.len(),
            min_value,
            max_value,
        )
    }
}
