use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::collection::{Image, ImageCollection, ImageMeta};
use crate::region::{Bbox, RegionError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("Invalid manifest pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("Failed to open manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse manifest {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Manifest {path} has an invalid footprint: {source}")]
    Footprint {
        path: PathBuf,
        #[source]
        source: RegionError,
    },
}

/// Sidecar describing one scene: acquisition metadata plus one GeoTIFF
/// per band, with paths relative to the manifest.
#[derive(Debug, Deserialize)]
pub struct SceneManifest {
    pub id: String,
    pub acquired: NaiveDateTime,
    pub footprint: Bbox,
    #[serde(default)]
    pub polarisations: Vec<String>,
    #[serde(default)]
    pub cloud_cover: Option<f32>,
    #[serde(default)]
    pub nodata: Option<f32>,
    pub bands: BTreeMap<String, PathBuf>,
}

impl SceneManifest {
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let file = File::open(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let manifest: SceneManifest =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| CatalogError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        // Re-validate the footprint; deserialization skips Bbox::new
        let fp = &manifest.footprint;
        Bbox::new(fp.xmin, fp.xmax, fp.ymin, fp.ymax).map_err(|source| {
            CatalogError::Footprint {
                path: path.to_path_buf(),
                source,
            }
        })?;

        Ok(manifest)
    }

    fn into_image(self, base: &Path) -> Image {
        let bands = self
            .bands
            .into_iter()
            .map(|(name, rel)| (name, base.join(rel)))
            .collect();

        let meta = ImageMeta {
            id: self.id,
            acquired: self.acquired,
            footprint: self.footprint,
            polarisations: self.polarisations,
            cloud_cover: self.cloud_cover,
        };

        Image::from_files(meta, bands, self.nodata)
    }
}

/// Builds a collection from every manifest under `dir` whose file name
/// matches `pattern`. Subdirectories are searched recursively.
pub fn scan(source: &str, dir: &Path, pattern: &str) -> Result<ImageCollection, CatalogError> {
    if !dir.is_dir() {
        return Err(CatalogError::MissingDirectory(dir.to_path_buf()));
    }

    let matcher = glob::Pattern::new(pattern).map_err(|source| CatalogError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut images = Vec::new();
    let mut band_names = BTreeSet::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable catalog entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if !matcher.matches(&file_name) {
            continue;
        }

        let path = entry.path();
        match SceneManifest::from_file(path) {
            Ok(manifest) => {
                debug!(scene = %manifest.id, path = ?path, "found scene manifest");
                band_names.extend(manifest.bands.keys().cloned());
                let base = path.parent().unwrap_or(dir);
                images.push(manifest.into_image(base));
            }
            Err(e) => warn!(error = %e, "skipping unreadable manifest"),
        }
    }

    info!(source, dir = ?dir, scenes = images.len(), "scanned catalog");

    Ok(ImageCollection::new(
        source,
        band_names.into_iter().collect(),
        images,
    ))
}
