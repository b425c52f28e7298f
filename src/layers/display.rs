use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use super::Layer;
use crate::readers::{ReadError, write_rgba};

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("Failed to prepare output directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write layer: {0}")]
    Write(#[from] ReadError),
}

/// Surface showing the current layer set.
pub trait MapDisplay {
    /// Replaces everything on the map with `layers`.
    fn replace(&mut self, layers: Vec<Layer>) -> Result<(), DisplayError>;

    fn layers(&self) -> &[Layer];
}

/// Keeps displayed layers in memory and remembers every layer set shown.
#[derive(Debug, Default)]
pub struct InMemoryMap {
    layers: Vec<Layer>,
    history: Vec<Vec<String>>,
}

impl InMemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of every layer set displayed so far, oldest first.
    pub fn history(&self) -> &[Vec<String>] {
        &self.history
    }
}

impl MapDisplay for InMemoryMap {
    fn replace(&mut self, layers: Vec<Layer>) -> Result<(), DisplayError> {
        self.history
            .push(layers.iter().map(|l| l.name.clone()).collect());
        self.layers = layers;
        Ok(())
    }

    fn layers(&self) -> &[Layer] {
        &self.layers
    }
}

/// Writes the displayed layers as RGBA TIFFs into a directory, removing
/// the files of the layers they replace.
#[derive(Debug)]
pub struct TiffMap {
    dir: PathBuf,
    layers: Vec<Layer>,
    written: Vec<PathBuf>,
}

impl TiffMap {
    pub fn new(dir: &Path) -> Result<Self, DisplayError> {
        fs::create_dir_all(dir).map_err(|source| DisplayError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        Ok(Self {
            dir: dir.to_path_buf(),
            layers: Vec::new(),
            written: Vec::new(),
        })
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl MapDisplay for TiffMap {
    fn replace(&mut self, layers: Vec<Layer>) -> Result<(), DisplayError> {
        for path in self.written.drain(..) {
            if let Err(e) = fs::remove_file(&path) {
                debug!(path = ?path, error = %e, "stale layer file already gone");
            }
        }
        self.layers.clear();

        for layer in &layers {
            let path = self.dir.join(format!("{}.tif", layer.slug()));
            let (width, height) = layer.content.grid().dims();
            write_rgba(&path, width, height, &layer.to_rgba())?;
            info!(layer = %layer.name, path = ?path, "wrote layer");
            self.written.push(path);
        }

        self.layers = layers;
        Ok(())
    }

    fn layers(&self) -> &[Layer] {
        &self.layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{LayerContent, LayerKind};
    use crate::raster::{Grid, Mask};
    use tempfile::tempdir;

    fn layer(kind: LayerKind, year: i32) -> Layer {
        let grid = Grid::new(2, 2, [0.0, 1.0, 0.0, 0.0, 0.0, -1.0]);
        let mask = Mask::new(grid, vec![Some(true), None, None, Some(true)]).unwrap();
        Layer::new(kind, year, LayerContent::Mask(mask))
    }

    #[test]
    fn test_in_memory_replace() {
        let mut map = InMemoryMap::new();
        map.replace(vec![layer(LayerKind::PermanentWater, 2015)]).unwrap();
        map.replace(vec![layer(LayerKind::MonsoonFlood, 2015)]).unwrap();
        map.replace(vec![]).unwrap();

        assert!(map.layers().is_empty());
        assert_eq!(
            map.history(),
            [
                vec!["Permanent Water 2015".to_string()],
                vec!["Monsoon Flood 2015".to_string()],
                vec![],
            ]
        );
    }

    #[test]
    fn test_tiff_map_removes_replaced_files() {
        let dir = tempdir().unwrap();
        let mut map = TiffMap::new(&dir.path().join("layers")).unwrap();

        map.replace(vec![layer(LayerKind::PermanentWater, 2015)]).unwrap();
        let first = map.written()[0].clone();
        assert!(first.ends_with("permanent_water_2015.tif"));
        assert!(first.exists());

        map.replace(vec![layer(LayerKind::NdwiWater, 2016)]).unwrap();
        assert!(!first.exists());
        assert_eq!(map.written().len(), 1);
        assert!(map.written()[0].exists());
        assert_eq!(map.layers()[0].name, "NDWI Water 2016");
    }
}
