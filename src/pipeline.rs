use std::fmt::Display;
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::{self, CatalogError};
use crate::collection::{CollectionError, ImageCollection, seasonal_composite};
use crate::config::{BackscatterPolarity, Config, Season, Thresholds};
use crate::raster::{Grid, Mask, Raster, RasterError, ensure_grid};
use crate::readers::{ReadError, create_reader};
use crate::region::Region;
use crate::sat_bands::{SatBands, Satellites};
use crate::water::{Threshold, WaterIndex, add_index, classify, extract_flood};

pub const OCCURRENCE_BAND: &str = "occurrence";

/// Startup failures; none of these are retried.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Source collection {0} has no scenes")]
    EmptyCollection(String),
    #[error("Failed to read occurrence raster: {0}")]
    Occurrence(#[from] ReadError),
    #[error("Occurrence raster does not fit the analysis grid: {0}")]
    Grid(#[from] RasterError),
}

/// Every product the map can show, computed on the session's analysis grid.
#[derive(Debug)]
pub struct FloodPipeline {
    region: Region,
    grid: Grid,
    season: Season,
    thresholds: Thresholds,
    polarity: BackscatterPolarity,
    polarisation: String,
    radar: ImageCollection,
    optical: ImageCollection,
    occurrence: Raster,
}

impl FloodPipeline {
    /// Scans both catalogs and reads the occurrence raster named by `config`.
    pub fn open(config: &Config) -> Result<Self, SetupError> {
        let sources = config.sources();
        let radar = catalog::scan("radar", &sources.radar, &sources.manifest_pattern)?;
        let optical = catalog::scan("optical", &sources.optical, &sources.manifest_pattern)?;

        let grid = Grid::covering(config.region().bbox(), config.pixel_size());
        let values = create_reader(&sources.occurrence)?
            .read_data()?
            .into_band(&grid, sources.occurrence.clone())?;
        let occurrence = Raster::new(grid).with_band(OCCURRENCE_BAND, values)?;

        Self::new(config, grid, radar, optical, occurrence)
    }

    pub fn new(
        config: &Config,
        grid: Grid,
        radar: ImageCollection,
        optical: ImageCollection,
        occurrence: Raster,
    ) -> Result<Self, SetupError> {
        for collection in [&radar, &optical] {
            if collection.is_empty() {
                return Err(SetupError::EmptyCollection(collection.source().to_string()));
            }
        }
        ensure_grid(&grid, occurrence.grid())?;
        occurrence.band(OCCURRENCE_BAND)?;

        let region = config.region().clone();
        let thresholds = *config.thresholds();
        let polarisation = config.polarisation().to_string();

        let radar = radar
            .filter_bounds(&region)
            .filter(|meta| meta.polarisations.iter().any(|p| *p == polarisation))
            .select(&[polarisation.as_str()]);

        let optical_bands = SatBands::new(Satellites::Sentinel2).names();
        let optical_bands: Vec<&str> = optical_bands.iter().map(String::as_str).collect();
        let optical = optical
            .filter_bounds(&region)
            .filter(|meta| {
                meta.cloud_cover
                    .is_some_and(|c| c < thresholds.max_cloud_cover)
            })
            .select(&optical_bands);

        info!(
            radar_scenes = radar.len(),
            optical_scenes = optical.len(),
            width = grid.width(),
            height = grid.height(),
            "flood pipeline ready"
        );

        Ok(Self {
            region,
            grid,
            season: config.season(),
            thresholds,
            polarity: config.backscatter_polarity(),
            polarisation,
            radar,
            optical,
            occurrence,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn polarisation(&self) -> &str {
        &self.polarisation
    }

    /// Mean seasonal backscatter for `year`, clipped to the region.
    pub fn backscatter_composite(&self, year: i32) -> Result<Raster, CollectionError> {
        seasonal_composite(
            &self.radar,
            year,
            &self.season,
            &self.region,
            &self.grid,
            self.radar.bands(),
            Ok,
        )
    }

    /// Historical occurrence at or above the configured percentage.
    pub fn permanent_water(&self) -> Result<Mask, RasterError> {
        let threshold = Threshold::at_least(self.thresholds.occurrence_percent);
        Ok(classify(&self.occurrence, OCCURRENCE_BAND, threshold)?.clip(&self.region))
    }

    /// Backscatter classified as surface water, non-water masked out.
    pub fn seasonal_water(&self, year: i32) -> Result<Mask, CollectionError> {
        let composite = self.backscatter_composite(year)?;
        let threshold = Threshold {
            value: self.thresholds.backscatter_db,
            comparison: self.polarity.comparison(),
        };

        Ok(classify(&composite, &self.polarisation, threshold)?.self_mask())
    }

    pub fn monsoon_flood(&self, year: i32) -> Result<Mask, CollectionError> {
        let seasonal = self.seasonal_water(year)?;
        let baseline = self.permanent_water()?;
        let flood = extract_flood(&seasonal, &baseline)?;

        debug!(
            year,
            seasonal = seasonal.count_true(),
            flood = flood.count_true(),
            "extracted monsoon flood"
        );

        Ok(flood)
    }

    /// Mean of the per-scene index above the water threshold. Only the two
    /// bands the index is built from are read.
    pub fn index_water(&self, year: i32, index: WaterIndex) -> Result<Mask, CollectionError> {
        let (a, b) = index.bands();
        let optical = self.optical.select(&[a, b]);

        let composite = seasonal_composite(
            &optical,
            year,
            &self.season,
            &self.region,
            &self.grid,
            &[index.name().to_string()],
            |scene| add_index(scene, index),
        )?;

        let threshold = Threshold::above(self.thresholds.water_index);
        Ok(classify(&composite, index.name(), threshold)?.self_mask())
    }
}

impl Display for FloodPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FloodPipeline {{ radar: {}, optical: {}, grid: {}x{} }}",
            self.radar.len(),
            self.optical.len(),
            self.grid.width(),
            self.grid.height()
        )
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::collection::Image;
    use crate::collection::fixtures::{at, grid, meta, radar};

    #[test]
    fn test_permanent_water() {
        let mask = pipeline().permanent_water().unwrap();
        assert_eq!(mask.cells(), &[Some(true), Some(false), None, Some(true)]);
    }

    #[test]
    fn test_monsoon_flood_excludes_permanent_water() {
        let pipeline = pipeline();

        let seasonal = pipeline.seasonal_water(2017).unwrap();
        assert_eq!(seasonal.cells(), &[Some(true), Some(true), None, None]);

        let flood = pipeline.monsoon_flood(2017).unwrap();
        assert_eq!(flood.cells(), &[None, Some(true), None, None]);
    }

    #[test]
    fn test_missing_year_gives_blank_products() {
        let pipeline = pipeline();

        let composite = pipeline.backscatter_composite(2016).unwrap();
        assert!(composite.band("VV").unwrap().iter().all(|v| v.is_nan()));
        assert_eq!(pipeline.monsoon_flood(2016).unwrap().count_defined(), 0);
        assert_eq!(
            pipeline.index_water(2016, WaterIndex::Ndwi).unwrap().count_defined(),
            0
        );
    }

    #[test]
    fn test_index_water_skips_cloudy_scenes() {
        let pipeline = pipeline();

        // Only the clear scene is averaged: NDWI = 0.5, MNDWI = 0.714
        let ndwi = pipeline.index_water(2017, WaterIndex::Ndwi).unwrap();
        assert_eq!(ndwi.count_true(), 4);

        let mndwi = pipeline.index_water(2017, WaterIndex::Mndwi).unwrap();
        assert_eq!(mndwi.count_true(), 4);
    }

    #[test]
    fn test_index_water_reads_only_index_bands() {
        let mut raster = Raster::new(grid());
        for (name, value) in [("B3", 0.75), ("B8", 0.25), ("B11", 0.125)] {
            raster = raster.with_band(name, vec![value; 4]).unwrap();
        }
        let mut meta = meta("s2-partial", at(2017, 7, 1));
        meta.cloud_cover = Some(5.0);
        let optical = ImageCollection::new(
            "optical",
            vec!["B3".to_string(), "B8".to_string(), "B11".to_string()],
            vec![Image::in_memory(meta, raster)],
        );

        let base = pipeline();
        let pipeline = FloodPipeline::new(
            &config(),
            grid(),
            base.radar.clone(),
            optical,
            base.occurrence.clone(),
        )
        .unwrap();

        assert_eq!(pipeline.index_water(2017, WaterIndex::Ndwi).unwrap().count_true(), 4);
        assert_eq!(pipeline.index_water(2017, WaterIndex::Mndwi).unwrap().count_true(), 4);
    }

    #[test]
    fn test_above_polarity_reproduces_source_branch() {
        let json = r#"
        {
            "years": {"min": 2015, "max": 2024},
            "region": [[90.0, 23.0], [91.0, 23.0], [91.0, 24.0], [90.0, 24.0]],
            "pixel_size": 0.5,
            "backscatter_polarity": "above",
            "sources": {"radar": "r", "optical": "o", "occurrence": "c.tif"}
        }
        "#;
        let config: Config = serde_json::from_str(json).unwrap();
        let base = pipeline();
        let pipeline = FloodPipeline::new(
            &config,
            grid(),
            base.radar.clone(),
            base.optical.clone(),
            base.occurrence.clone(),
        )
        .unwrap();

        let seasonal = pipeline.seasonal_water(2017).unwrap();
        assert_eq!(seasonal.cells(), &[None, None, Some(true), Some(true)]);
    }

    #[test]
    fn test_empty_source_collection_fails_setup() {
        let base = pipeline();
        let err = FloodPipeline::new(
            &config(),
            grid(),
            radar(vec![]),
            base.optical.clone(),
            base.occurrence.clone(),
        )
        .unwrap_err();

        assert!(matches!(err, SetupError::EmptyCollection(ref s) if s == "radar"));
    }
}
