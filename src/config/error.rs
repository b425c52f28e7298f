use thiserror::Error;

use crate::config::season::SeasonParseError;
use crate::region::RegionError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("years.max cannot be earlier than years.min")]
    YearOrder,
    #[error("{0}")]
    Season(#[from] SeasonParseError),
    #[error("Invalid region: {0}")]
    Region(#[from] RegionError),
    #[error("pixel_size must be a positive number")]
    PixelSize,
    #[error("occurrence_percent should be within 0..=100")]
    OccurrencePercent,
    #[error("Threshold {0} must be finite")]
    Threshold(&'static str),
    #[error("auto_advance_secs must be greater than 0")]
    AutoAdvance,
    #[error("retry.max_attempts must be at least 1")]
    RetryAttempts,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}
