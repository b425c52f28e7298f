use super::{Data, DataReader, ReadError};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{TiffEncoder, colortype};

/// Reads the first image of a single-band GeoTIFF as `f32`.
pub struct GeoTiffReader {
    pub path: PathBuf,
}

impl GeoTiffReader {
    fn error(&self, reason: String) -> ReadError {
        ReadError::GeoTiff {
            path: self.path.clone(),
            reason,
        }
    }
}

impl DataReader for GeoTiffReader {
    fn read_data(&self) -> Result<Data, ReadError> {
        let file = File::open(&self.path).map_err(|source| ReadError::Io {
            path: self.path.clone(),
            source,
        })?;

        let reader = BufReader::new(file);

        let mut decoder = Decoder::new(reader)
            .map_err(|e| self.error(format!("Failed to decode TIFF: {}", e)))?;

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| self.error(format!("Failed to get dimensions: {}", e)))?;

        let image_data: Vec<f32> = match decoder
            .read_image()
            .map_err(|e| self.error(format!("Failed to read image: {}", e)))?
        {
            DecodingResult::U8(data) => data.iter().map(|&x| x as f32).collect(),
            DecodingResult::U16(data) => data.iter().map(|&x| x as f32).collect(),
            DecodingResult::U32(data) => data.iter().map(|&x| x as f32).collect(),
            DecodingResult::I16(data) => data.iter().map(|&x| x as f32).collect(),
            DecodingResult::I32(data) => data.iter().map(|&x| x as f32).collect(),
            DecodingResult::F32(data) => data,
            DecodingResult::F64(data) => data.iter().map(|&x| x as f32).collect(),
            _ => return Err(self.error("Unsupported pixel format".to_string())),
        };

        if image_data.len() != width as usize * height as usize {
            return Err(self.error(format!(
                "Expected a single band of {}x{} pixels, got {} samples",
                width,
                height,
                image_data.len()
            )));
        }

        Ok(Data {
            width,
            height,
            buffer: image_data,
        })
    }
}

/// Writes an RGBA8 image, four bytes per pixel in row-major order.
pub fn write_rgba(path: &Path, width: u32, height: u32, rgba: &[u8]) -> Result<(), ReadError> {
    let io_error = |source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let tiff_error = |e: tiff::TiffError| ReadError::GeoTiff {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let file = File::create(path).map_err(io_error)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file)).map_err(tiff_error)?;
    encoder
        .write_image::<colortype::RGBA8>(width, height, rgba)
        .map_err(tiff_error)?;

    Ok(())
}

#[cfg(test)]
pub(crate) fn write_f32(path: &Path, width: u32, height: u32, values: &[f32]) {
    let file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(BufWriter::new(file)).unwrap();
    encoder
        .write_image::<colortype::Gray32Float>(width, height, values)
        .unwrap();
}
