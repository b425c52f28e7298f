use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::region::Region;
use crate::water::classify::Comparison;
use crate::years::YearRange;

pub mod error;
pub use error::ConfigError;

pub mod season;
pub use season::Season;

/// Where the scene catalogs and the occurrence raster live.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Sources {
    pub radar: PathBuf,
    pub optical: PathBuf,
    pub occurrence: PathBuf,
    #[serde(default = "default_manifest_pattern")]
    pub manifest_pattern: String,
}

fn default_manifest_pattern() -> String {
    "*.json".to_string()
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    pub water_index: f32,
    pub backscatter_db: f32,
    pub occurrence_percent: f32,
    pub max_cloud_cover: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            water_index: 0.1,
            backscatter_db: -20.0,
            occurrence_percent: 80.0,
            max_cloud_cover: 20.0,
        }
    }
}

/// Which side of the backscatter threshold counts as surface water.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackscatterPolarity {
    #[serde(rename(deserialize = "below"))]
    #[default]
    Below,
    #[serde(rename(deserialize = "above"))]
    Above,
}

impl BackscatterPolarity {
    pub fn comparison(&self) -> Comparison {
        match self {
            BackscatterPolarity::Below => Comparison::Less,
            BackscatterPolarity::Above => Comparison::Greater,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), doubling each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    years: YearRange,
    region: Region,
    pixel_size: f64,
    season: Season,
    thresholds: Thresholds,
    backscatter_polarity: BackscatterPolarity,
    polarisation: String,
    sources: Sources,
    auto_advance: Duration,
    retry: RetryPolicy,
    output_directory: PathBuf,
}

// Deserializes a Config through a helper struct, validating the year range,
// the region polygon, the season window and the numeric thresholds.
impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ConfigHelper {
            years: YearsHelper,
            region: Vec<(f64, f64)>,
            pixel_size: f64,
            #[serde(default)]
            season: Option<SeasonHelper>,
            #[serde(default)]
            thresholds: Thresholds,
            #[serde(default)]
            backscatter_polarity: BackscatterPolarity,
            #[serde(default = "default_polarisation")]
            polarisation: String,
            sources: Sources,
            #[serde(default = "default_auto_advance_secs")]
            auto_advance_secs: u64,
            #[serde(default)]
            retry: RetryPolicy,
            #[serde(default = "default_output_directory")]
            output_directory: PathBuf,
        }

        #[derive(Deserialize)]
        struct YearsHelper {
            min: i32,
            max: i32,
        }

        #[derive(Deserialize)]
        struct SeasonHelper {
            start_month: u32,
            end_month: u32,
        }

        let helper = ConfigHelper::deserialize(deserializer)?;

        let years = YearRange::new(helper.years.min, helper.years.max)
            .ok_or_else(|| D::Error::custom(ConfigError::YearOrder))?;

        let region = Region::new(&helper.region)
            .map_err(|e| D::Error::custom(ConfigError::from(e)))?;

        if !(helper.pixel_size.is_finite() && helper.pixel_size > 0.0) {
            return Err(D::Error::custom(ConfigError::PixelSize));
        }

        let season = match helper.season {
            Some(s) => Season::new(s.start_month, s.end_month)
                .map_err(|e| D::Error::custom(ConfigError::from(e)))?,
            None => Season::default(),
        };

        let thresholds = helper.thresholds;
        for (name, value) in [
            ("water_index", thresholds.water_index),
            ("backscatter_db", thresholds.backscatter_db),
            ("max_cloud_cover", thresholds.max_cloud_cover),
        ] {
            if !value.is_finite() {
                return Err(D::Error::custom(ConfigError::Threshold(name)));
            }
        }
        if !(0.0..=100.0).contains(&thresholds.occurrence_percent) {
            return Err(D::Error::custom(ConfigError::OccurrencePercent));
        }

        if helper.auto_advance_secs == 0 {
            return Err(D::Error::custom(ConfigError::AutoAdvance));
        }

        if helper.retry.max_attempts == 0 {
            return Err(D::Error::custom(ConfigError::RetryAttempts));
        }

        Ok(Config {
            years,
            region,
            pixel_size: helper.pixel_size,
            season,
            thresholds,
            backscatter_polarity: helper.backscatter_polarity,
            polarisation: helper.polarisation,
            sources: helper.sources,
            auto_advance: Duration::from_secs(helper.auto_advance_secs),
            retry: helper.retry,
            output_directory: helper.output_directory,
        })
    }
}

fn default_polarisation() -> String {
    "VV".to_string()
}

fn default_auto_advance_secs() -> u64 {
    10
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("./out")
}

impl Config {
    pub fn new(years: YearRange, region: Region, pixel_size: f64, sources: Sources) -> Self {
        Self {
            years,
            region,
            pixel_size,
            season: Season::default(),
            thresholds: Thresholds::default(),
            backscatter_polarity: BackscatterPolarity::default(),
            polarisation: default_polarisation(),
            sources,
            auto_advance: Duration::from_secs(default_auto_advance_secs()),
            retry: RetryPolicy::default(),
            output_directory: default_output_directory(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader)?;

        Ok(config)
    }

    pub fn years(&self) -> YearRange {
        self.years
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn pixel_size(&self) -> f64 {
        self.pixel_size
    }

    pub fn season(&self) -> Season {
        self.season
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn backscatter_polarity(&self) -> BackscatterPolarity {
        self.backscatter_polarity
    }

    pub fn polarisation(&self) -> &str {
        &self.polarisation
    }

    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    pub fn auto_advance(&self) -> Duration {
        self.auto_advance
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const MINIMAL: &str = r#"
    {
        "years": {"min": 2015, "max": 2024},
        "region": [[90.0, 23.0], [91.0, 23.0], [91.0, 24.0], [90.0, 24.0]],
        "pixel_size": 0.01,
        "sources": {
            "radar": "data/s1",
            "optical": "data/s2",
            "occurrence": "data/occurrence.tif"
        }
    }
    "#;

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = Config::from_file(file_path).unwrap();

        assert_eq!(config.years(), YearRange::new(2015, 2024).unwrap());
        assert_eq!(config.season(), Season::monsoon());
        assert_eq!(config.thresholds(), &Thresholds::default());
        assert_eq!(config.backscatter_polarity(), BackscatterPolarity::Below);
        assert_eq!(config.polarisation(), "VV");
        assert_eq!(config.auto_advance(), Duration::from_secs(10));
        assert_eq!(config.sources().manifest_pattern, "*.json");
        assert_eq!(config.retry().max_attempts, 3);
    }

    #[test]
    fn test_overrides() {
        let json = r#"
        {
            "years": {"min": 2018, "max": 2020},
            "region": [[90.0, 23.0], [91.0, 23.0], [91.0, 24.0], [90.0, 23.0]],
            "pixel_size": 0.5,
            "season": {"start_month": 5, "end_month": 10},
            "thresholds": {"occurrence_percent": 90.0},
            "backscatter_polarity": "above",
            "sources": {
                "radar": "a", "optical": "b", "occurrence": "c.tif",
                "manifest_pattern": "S1*.json"
            },
            "auto_advance_secs": 3,
            "output_directory": "/tmp/layers"
        }
        "#;

        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.season(), Season::new(5, 10).unwrap());
        assert_eq!(config.thresholds().occurrence_percent, 90.0);
        assert_eq!(config.thresholds().water_index, 0.1);
        assert_eq!(config.backscatter_polarity(), BackscatterPolarity::Above);
        assert_eq!(config.auto_advance(), Duration::from_secs(3));
        assert_eq!(config.output_directory(), Path::new("/tmp/layers"));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let cases = [
            MINIMAL.replace(r#""min": 2015, "max": 2024"#, r#""min": 2024, "max": 2015"#),
            MINIMAL.replace(r#""pixel_size": 0.01"#, r#""pixel_size": 0.0"#),
            MINIMAL.replace(
                r#""region": [[90.0, 23.0], [91.0, 23.0], [91.0, 24.0], [90.0, 24.0]]"#,
                r#""region": [[90.0, 23.0], [91.0, 24.0], [91.0, 23.0], [90.0, 24.0]]"#,
            ),
            MINIMAL.replace(r#""region": [[90.0, 23.0], [91.0, 23.0], [91.0, 24.0], [90.0, 24.0]]"#, r#""region": []"#),
            MINIMAL.replace(
                r#""pixel_size": 0.01"#,
                r#""pixel_size": 0.01, "season": {"start_month": 9, "end_month": 6}"#,
            ),
            MINIMAL.replace(
                r#""pixel_size": 0.01"#,
                r#""pixel_size": 0.01, "thresholds": {"occurrence_percent": 120.0}"#,
            ),
            MINIMAL.replace(r#""pixel_size": 0.01"#, r#""pixel_size": 0.01, "auto_advance_secs": 0"#),
            MINIMAL.replace(
                r#""pixel_size": 0.01"#,
                r#""pixel_size": 0.01, "retry": {"max_attempts": 0}"#,
            ),
        ];

        for case in cases {
            assert!(
                serde_json::from_str::<Config>(&case).is_err(),
                "accepted invalid config: {case}"
            );
        }
    }

    #[test]
    fn test_example_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/config/example_config.json");
        let config = Config::from_file(path).unwrap();

        assert_eq!(config.years().len(), 10);
        assert_eq!(config.polarisation(), "VV");
        assert_eq!(config.region().bbox().width(), 2.5);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/floodscope.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_retry_backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 4,
            initial_backoff_ms: 100,
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
    }
}
