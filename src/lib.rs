//! Seasonal flood and permanent water mapping from radar and optical scene
//! catalogs.

pub mod catalog;
pub mod collection;
pub mod config;
pub mod control;
pub mod engine;
pub mod layers;
pub mod pipeline;
pub mod raster;
pub mod readers;
pub mod region;
pub mod sat_bands;
pub mod stats;
pub mod water;
pub mod years;
