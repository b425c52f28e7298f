//! In-memory raster model shared by every stage of the pipeline.
//!
//! All rasters of a session live on one [`Grid`]. Band values are `f32` with
//! NaN standing for no-data; boolean products use [`Mask`], where `None`
//! marks pixels that are masked out.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::region::{Bbox, Region};

#[derive(Debug, Error, PartialEq)]
pub enum RasterError {
    #[error("Band {0} not found")]
    MissingBand(String),
    #[error("Band {name} has {found} values, grid expects {expected}")]
    BandLength {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Grid mismatch: expected {expected:?}, found {found:?}")]
    GridMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
}

/// Pixel grid with a GDAL-style geotransform:
/// `[top_left_x, pixel_width, 0, top_left_y, 0, -pixel_height]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    width: u32,
    height: u32,
    transform: [f64; 6],
}

impl Grid {
    pub fn new(width: u32, height: u32, transform: [f64; 6]) -> Self {
        Self {
            width,
            height,
            transform,
        }
    }

    /// North-up grid covering `bbox` at `pixel_size` degrees.
    pub fn covering(bbox: &Bbox, pixel_size: f64) -> Self {
        let width = ((bbox.width() / pixel_size).ceil() as u32).max(1);
        let height = ((bbox.height() / pixel_size).ceil() as u32).max(1);

        Self {
            width,
            height,
            transform: [bbox.xmin, pixel_size, 0.0, bbox.ymax, 0.0, -pixel_size],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dims(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn transform(&self) -> &[f64; 6] {
        &self.transform
    }

    /// Geographic (lon, lat) of the centre of pixel `index` in row-major order.
    pub fn pixel_center(&self, index: usize) -> (f64, f64) {
        let x = (index % self.width as usize) as f64 + 0.5;
        let y = (index / self.width as usize) as f64 + 0.5;
        let gt = &self.transform;

        (
            gt[0] + x * gt[1] + y * gt[2],
            gt[3] + x * gt[4] + y * gt[5],
        )
    }

    fn ensure_same(&self, other: &Grid) -> Result<(), RasterError> {
        if self != other {
            return Err(RasterError::GridMismatch {
                expected: self.dims(),
                found: other.dims(),
            });
        }
        Ok(())
    }

    // Row-major flags: true where the pixel centre falls inside the region.
    fn inside(&self, region: &Region) -> Vec<bool> {
        (0..self.len())
            .map(|i| {
                let (lon, lat) = self.pixel_center(i);
                region.contains(lon, lat)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub name: String,
    pub data: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    grid: Grid,
    bands: Vec<Band>,
    acquired: Option<NaiveDateTime>,
}

impl Raster {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            bands: Vec::new(),
            acquired: None,
        }
    }

    /// Raster holding `names`, every pixel no-data.
    pub fn blank(grid: Grid, names: &[String]) -> Self {
        let bands = names
            .iter()
            .map(|name| Band {
                name: name.clone(),
                data: vec![f32::NAN; grid.len()],
            })
            .collect();

        Self {
            grid,
            bands,
            acquired: None,
        }
    }

    pub fn with_acquired(mut self, acquired: NaiveDateTime) -> Self {
        self.acquired = Some(acquired);
        self
    }

    /// Adds `name`, replacing a band of the same name.
    pub fn with_band(mut self, name: &str, data: Vec<f32>) -> Result<Self, RasterError> {
        if data.len() != self.grid.len() {
            return Err(RasterError::BandLength {
                name: name.to_string(),
                expected: self.grid.len(),
                found: data.len(),
            });
        }

        match self.bands.iter_mut().find(|b| b.name == name) {
            Some(band) => band.data = data,
            None => self.bands.push(Band {
                name: name.to_string(),
                data,
            }),
        }

        Ok(self)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn acquired(&self) -> Option<NaiveDateTime> {
        self.acquired
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band_names(&self) -> Vec<String> {
        self.bands.iter().map(|b| b.name.clone()).collect()
    }

    pub fn band(&self, name: &str) -> Result<&[f32], RasterError> {
        self.bands
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.data.as_slice())
            .ok_or_else(|| RasterError::MissingBand(name.to_string()))
    }

    pub fn select(&self, names: &[String]) -> Result<Raster, RasterError> {
        let mut bands = Vec::with_capacity(names.len());
        for name in names {
            bands.push(Band {
                name: name.clone(),
                data: self.band(name)?.to_vec(),
            });
        }

        Ok(Raster {
            grid: self.grid,
            bands,
            acquired: self.acquired,
        })
    }

    /// Pixels whose centre lies outside `region` become no-data.
    pub fn clip(mut self, region: &Region) -> Raster {
        let inside = self.grid.inside(region);
        for band in &mut self.bands {
            for (value, keep) in band.data.iter_mut().zip(&inside) {
                if !keep {
                    *value = f32::NAN;
                }
            }
        }
        self
    }
}

/// Boolean raster; `None` is no-data or masked out.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    grid: Grid,
    cells: Vec<Option<bool>>,
}

impl Mask {
    pub fn new(grid: Grid, cells: Vec<Option<bool>>) -> Result<Self, RasterError> {
        if cells.len() != grid.len() {
            return Err(RasterError::BandLength {
                name: "mask".to_string(),
                expected: grid.len(),
                found: cells.len(),
            });
        }
        Ok(Self { grid, cells })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn cells(&self) -> &[Option<bool>] {
        &self.cells
    }

    /// Drops `false` pixels so only `true` ones stay defined.
    pub fn self_mask(mut self) -> Mask {
        for cell in &mut self.cells {
            if *cell == Some(false) {
                *cell = None;
            }
        }
        self
    }

    pub fn clip(mut self, region: &Region) -> Mask {
        let inside = self.grid.inside(region);
        for (cell, keep) in self.cells.iter_mut().zip(inside) {
            if !keep {
                *cell = None;
            }
        }
        self
    }

    /// Pixel-wise combination of two masks on the same grid.
    pub fn zip_with<F>(&self, other: &Mask, f: F) -> Result<Mask, RasterError>
    where
        F: Fn(Option<bool>, Option<bool>) -> Option<bool>,
    {
        self.grid.ensure_same(&other.grid)?;

        let cells = self
            .cells
            .iter()
            .zip(&other.cells)
            .map(|(a, b)| f(*a, *b))
            .collect();

        Ok(Mask {
            grid: self.grid,
            cells,
        })
    }

    pub fn count_true(&self) -> usize {
        self.cells.iter().filter(|c| **c == Some(true)).count()
    }

    pub fn count_defined(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

pub(crate) fn ensure_grid(expected: &Grid, found: &Grid) -> Result<(), RasterError> {
    expected.ensure_same(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_2x2() -> Grid {
        Grid::new(2, 2, [90.0, 0.5, 0.0, 24.0, 0.0, -0.5])
    }

    #[test]
    fn test_grid_covering_bbox() {
        let bbox = Bbox::new(90.0, 91.0, 23.0, 24.0).unwrap();
        let grid = Grid::covering(&bbox, 0.25);

        assert_eq!(grid.dims(), (4, 4));
        assert_eq!(grid.pixel_center(0), (90.125, 23.875));
        assert_eq!(grid.pixel_center(15), (90.875, 23.125));
    }

    #[test]
    fn test_with_band_replaces_and_checks_length() {
        let raster = Raster::new(grid_2x2())
            .with_band("VV", vec![1.0; 4])
            .unwrap()
            .with_band("VV", vec![2.0; 4])
            .unwrap();

        assert_eq!(raster.bands().len(), 1);
        assert_eq!(raster.band("VV").unwrap(), &[2.0; 4]);

        let err = raster.with_band("VH", vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, RasterError::BandLength { found: 3, .. }));
    }

    #[test]
    fn test_select_missing_band() {
        let raster = Raster::blank(grid_2x2(), &["B3".to_string()]);
        assert!(raster.select(&["B3".to_string()]).is_ok());
        assert_eq!(
            raster.select(&["B8".to_string()]).unwrap_err(),
            RasterError::MissingBand("B8".to_string())
        );
    }

    #[test]
    fn test_clip_masks_outside_pixels() {
        // Triangle covering the upper-left half of the grid
        let region = Region::new(&[(90.0, 24.0), (91.0, 24.0), (90.0, 23.0)]).unwrap();

        let raster = Raster::new(grid_2x2())
            .with_band("VV", vec![1.0, 2.0, 3.0, 4.0])
            .unwrap()
            .clip(&region);
        let values = raster.band("VV").unwrap();

        assert_eq!(values[0], 1.0);
        assert!(values[3].is_nan());

        let mask = Mask::new(grid_2x2(), vec![Some(true); 4])
            .unwrap()
            .clip(&region);
        assert_eq!(mask.cells()[0], Some(true));
        assert_eq!(mask.cells()[3], None);
    }

    #[test]
    fn test_self_mask() {
        let mask = Mask::new(grid_2x2(), vec![Some(true), Some(false), None, Some(true)])
            .unwrap()
            .self_mask();

        assert_eq!(mask.cells(), &[Some(true), None, None, Some(true)]);
        assert_eq!(mask.count_true(), 2);
        assert_eq!(mask.count_defined(), 2);
    }

    #[test]
    fn test_zip_with_rejects_other_grids() {
        let a = Mask::new(grid_2x2(), vec![None; 4]).unwrap();
        let b = Mask::new(Grid::new(1, 4, [0.0, 1.0, 0.0, 0.0, 0.0, -1.0]), vec![None; 4]).unwrap();

        assert!(matches!(
            a.zip_with(&b, |x, _| x).unwrap_err(),
            RasterError::GridMismatch { .. }
        ));
    }
}
