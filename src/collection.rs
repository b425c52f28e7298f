//! Image collections and the temporal aggregator.
//!
//! A collection is filtered on scene metadata only; pixels are read when the
//! filtered set is loaded onto the analysis grid and reduced.

use chrono::{Datelike, NaiveDateTime};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::Season;
use crate::raster::{Grid, Raster, RasterError, ensure_grid};
use crate::readers::{DataReader, GeoTiffReader, ReadError};
use crate::region::{Bbox, Region};
use crate::years::{in_season, season_bounds};

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Raster(#[from] RasterError),
}

impl CollectionError {
    pub fn is_transient(&self) -> bool {
        match self {
            CollectionError::Read(e) => e.is_transient(),
            CollectionError::Raster(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageMeta {
    pub id: String,
    pub acquired: NaiveDateTime,
    pub footprint: Bbox,
    pub polarisations: Vec<String>,
    pub cloud_cover: Option<f32>,
}

#[derive(Debug, Clone)]
enum Pixels {
    Memory(Arc<Raster>),
    Files {
        bands: BTreeMap<String, PathBuf>,
        nodata: Option<f32>,
    },
}

#[derive(Debug, Clone)]
pub struct Image {
    meta: ImageMeta,
    pixels: Pixels,
}

impl Image {
    pub fn in_memory(meta: ImageMeta, raster: Raster) -> Self {
        Self {
            meta,
            pixels: Pixels::Memory(Arc::new(raster)),
        }
    }

    pub fn from_files(meta: ImageMeta, bands: BTreeMap<String, PathBuf>, nodata: Option<f32>) -> Self {
        Self {
            meta,
            pixels: Pixels::Files { bands, nodata },
        }
    }

    pub fn meta(&self) -> &ImageMeta {
        &self.meta
    }

    pub fn band_names(&self) -> Vec<String> {
        match &self.pixels {
            Pixels::Memory(raster) => raster.band_names(),
            Pixels::Files { bands, .. } => bands.keys().cloned().collect(),
        }
    }

    /// Reads `bands` onto `grid`.
    pub fn load(&self, grid: &Grid, bands: &[String]) -> Result<Raster, CollectionError> {
        let missing = |band: &String| ReadError::MissingBand {
            scene: self.meta.id.clone(),
            band: band.clone(),
        };

        let raster = match &self.pixels {
            Pixels::Memory(raster) => {
                ensure_grid(grid, raster.grid())?;
                if let Some(band) = bands.iter().find(|b| raster.band(b).is_err()) {
                    return Err(missing(band).into());
                }
                raster.select(bands)?
            }
            Pixels::Files {
                bands: paths,
                nodata,
            } => {
                let mut raster = Raster::new(*grid);
                for band in bands {
                    let path = paths.get(band).ok_or_else(|| missing(band))?;
                    let reader = GeoTiffReader { path: path.clone() };
                    let mut values = reader.read_data()?.into_band(grid, path.clone())?;
                    if let Some(nodata) = nodata {
                        for v in values.iter_mut().filter(|v| **v == *nodata) {
                            *v = f32::NAN;
                        }
                    }
                    raster = raster.with_band(band, values)?;
                }
                raster
            }
        };

        Ok(raster.with_acquired(self.meta.acquired))
    }
}

/// Ordered scenes from a single source.
#[derive(Debug, Clone)]
pub struct ImageCollection {
    source: String,
    bands: Vec<String>,
    images: Vec<Image>,
}

impl ImageCollection {
    /// Scenes are kept in acquisition order.
    pub fn new(source: &str, bands: Vec<String>, mut images: Vec<Image>) -> Self {
        images.sort_by(|a, b| a.meta.acquired.cmp(&b.meta.acquired));
        Self {
            source: source.to_string(),
            bands,
            images,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn bands(&self) -> &[String] {
        &self.bands
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn filter<P>(&self, predicate: P) -> ImageCollection
    where
        P: Fn(&ImageMeta) -> bool,
    {
        ImageCollection {
            source: self.source.clone(),
            bands: self.bands.clone(),
            images: self
                .images
                .iter()
                .filter(|image| predicate(&image.meta))
                .cloned()
                .collect(),
        }
    }

    pub fn filter_calendar_year(&self, year: i32) -> ImageCollection {
        self.filter(|meta| meta.acquired.year() == year)
    }

    pub fn filter_months(&self, season: &Season) -> ImageCollection {
        self.filter(|meta| season.contains_month(meta.acquired.month()))
    }

    pub fn filter_bounds(&self, region: &Region) -> ImageCollection {
        self.filter(|meta| region.intersects_bbox(&meta.footprint))
    }

    pub fn select(&self, bands: &[&str]) -> ImageCollection {
        ImageCollection {
            source: self.source.clone(),
            bands: bands.iter().map(|b| b.to_string()).collect(),
            images: self.images.clone(),
        }
    }

    /// Reads the selected bands of every scene onto `grid`, in order.
    pub fn load(&self, grid: &Grid) -> Result<Vec<Raster>, CollectionError> {
        self.images
            .iter()
            .map(|image| image.load(grid, &self.bands))
            .collect()
    }
}

/// Per-pixel mean over `images` for each of `bands`. No-data samples are
/// skipped; a pixel without any valid sample stays no-data. An empty input
/// yields a blank raster.
pub fn mean(images: &[Raster], grid: &Grid, bands: &[String]) -> Result<Raster, RasterError> {
    let mut composite = Raster::new(*grid);

    for name in bands {
        let mut sums = vec![0f64; grid.len()];
        let mut counts = vec![0u32; grid.len()];

        for image in images {
            ensure_grid(grid, image.grid())?;
            for (i, &v) in image.band(name)?.iter().enumerate() {
                if !v.is_nan() {
                    sums[i] += v as f64;
                    counts[i] += 1;
                }
            }
        }

        let values = sums
            .iter()
            .zip(&counts)
            .map(|(&sum, &count)| {
                if count == 0 {
                    f32::NAN
                } else {
                    (sum / count as f64) as f32
                }
            })
            .collect();

        composite = composite.with_band(name, values)?;
    }

    Ok(composite)
}

/// Builds the seasonal composite of `collection` for `year`.
///
/// Scenes are kept when acquired in `year`, within the `season` months and
/// overlapping `region`. Each loaded scene goes through `map`, the results
/// are averaged into `output_bands` and the composite is clipped to the
/// region. No matching scene gives an all-no-data composite.
pub fn seasonal_composite<F>(
    collection: &ImageCollection,
    year: i32,
    season: &Season,
    region: &Region,
    grid: &Grid,
    output_bands: &[String],
    map: F,
) -> Result<Raster, CollectionError>
where
    F: Fn(Raster) -> Result<Raster, RasterError>,
{
    let filtered = collection
        .filter(|meta| in_season(&meta.acquired, year, season))
        .filter_bounds(region);

    debug!(
        source = collection.source(),
        year,
        window = ?season_bounds(year, season),
        scenes = filtered.len(),
        "filtered seasonal window"
    );

    if filtered.is_empty() {
        return Ok(Raster::blank(*grid, output_bands));
    }

    let images = filtered
        .load(grid)?
        .into_iter()
        .map(map)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(mean(&images, grid, output_bands)?.clip(region))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::NaiveDate;

    pub fn grid() -> Grid {
        Grid::new(2, 2, [90.0, 0.5, 0.0, 24.0, 0.0, -0.5])
    }

    pub fn region() -> Region {
        Region::new(&[(90.0, 23.0), (91.0, 23.0), (91.0, 24.0), (90.0, 24.0)]).unwrap()
    }

    pub fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(4, 30, 0)
            .unwrap()
    }

    pub fn meta(id: &str, acquired: NaiveDateTime) -> ImageMeta {
        ImageMeta {
            id: id.to_string(),
            acquired,
            footprint: Bbox::new(89.5, 91.5, 22.5, 24.5).unwrap(),
            polarisations: vec!["VV".to_string(), "VH".to_string()],
            cloud_cover: None,
        }
    }

    pub fn radar_scene(id: &str, acquired: NaiveDateTime, vv: [f32; 4]) -> Image {
        let raster = Raster::new(grid()).with_band("VV", vv.to_vec()).unwrap();
        Image::in_memory(meta(id, acquired), raster)
    }

    pub fn radar(images: Vec<Image>) -> ImageCollection {
        ImageCollection::new("radar", vec!["VV".to_string()], images)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn vv() -> Vec<String> {
        vec!["VV".to_string()]
    }

    #[test]
    fn test_collection_is_ordered_by_acquisition() {
        let collection = radar(vec![
            radar_scene("late", at(2016, 8, 1), [0.0; 4]),
            radar_scene("early", at(2016, 6, 1), [0.0; 4]),
        ]);

        let ids: Vec<&str> = collection
            .images()
            .iter()
            .map(|i| i.meta().id.as_str())
            .collect();
        assert_eq!(ids, ["early", "late"]);
    }

    #[test]
    fn test_filters() {
        let mut far = radar_scene("far", at(2016, 7, 1), [0.0; 4]);
        far.meta.footprint = Bbox::new(10.0, 11.0, 10.0, 11.0).unwrap();

        let collection = radar(vec![
            radar_scene("may", at(2016, 5, 31), [0.0; 4]),
            radar_scene("june", at(2016, 6, 1), [0.0; 4]),
            radar_scene("sept", at(2016, 9, 30), [0.0; 4]),
            radar_scene("oct", at(2016, 10, 1), [0.0; 4]),
            radar_scene("next-year", at(2017, 7, 1), [0.0; 4]),
            far,
        ]);

        assert_eq!(collection.filter_calendar_year(2016).len(), 5);
        assert_eq!(
            collection
                .filter_calendar_year(2016)
                .filter_months(&Season::monsoon())
                .len(),
            3
        );
        assert_eq!(collection.filter_bounds(&region()).len(), 5);
    }

    #[test]
    fn test_mean_skips_no_data() {
        let a = Raster::new(grid())
            .with_band("VV", vec![-10.0, f32::NAN, f32::NAN, 2.0])
            .unwrap();
        let b = Raster::new(grid())
            .with_band("VV", vec![-20.0, -4.0, f32::NAN, 4.0])
            .unwrap();

        let composite = mean(&[a, b], &grid(), &vv()).unwrap();
        let values = composite.band("VV").unwrap();

        assert_eq!(values[0], -15.0);
        assert_eq!(values[1], -4.0);
        assert!(values[2].is_nan());
        assert_eq!(values[3], 3.0);
    }

    #[test]
    fn test_seasonal_composite() {
        let collection = radar(vec![
            radar_scene("a", at(2016, 6, 10), [-30.0, -10.0, -22.0, -2.0]),
            radar_scene("b", at(2016, 8, 10), [-20.0, -10.0, -18.0, -4.0]),
            // Outside the monsoon window
            radar_scene("c", at(2016, 12, 10), [100.0; 4]),
        ]);

        let composite = seasonal_composite(
            &collection,
            2016,
            &Season::monsoon(),
            &region(),
            &grid(),
            &vv(),
            Ok,
        )
        .unwrap();

        assert_eq!(composite.band("VV").unwrap(), &[-25.0, -10.0, -20.0, -3.0]);
    }

    #[test]
    fn test_empty_window_gives_blank_composite() {
        let collection = radar(vec![radar_scene("a", at(2017, 7, 1), [-30.0; 4])]);

        let composite = seasonal_composite(
            &collection,
            2016,
            &Season::monsoon(),
            &region(),
            &grid(),
            &vv(),
            Ok,
        )
        .unwrap();

        assert!(composite.band("VV").unwrap().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_load_reports_missing_band() {
        let collection = radar(vec![radar_scene("a", at(2016, 7, 1), [0.0; 4])]).select(&["VH"]);

        let err = collection.load(&grid()).unwrap_err();
        assert!(matches!(
            err,
            CollectionError::Read(ReadError::MissingBand { ref band, .. }) if band == "VH"
        ));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_load_from_files_applies_nodata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vv.tif");
        crate::readers::geotiff::write_f32(&path, 2, 2, &[-9999.0, -12.0, -15.0, -9999.0]);

        let image = Image::from_files(
            meta("file", at(2016, 7, 1)),
            BTreeMap::from([("VV".to_string(), path)]),
            Some(-9999.0),
        );
        let raster = image.load(&grid(), &vv()).unwrap();
        let values = raster.band("VV").unwrap();

        assert!(values[0].is_nan());
        assert_eq!(values[1], -12.0);
        assert_eq!(raster.acquired(), Some(at(2016, 7, 1)));
    }
}
