//! Layer presentation: the five selectable products, their styles, the
//! legend and the map surface that shows them.

use std::fmt;
use std::str::FromStr;

use crate::raster::{Grid, Mask};
use crate::stats::{MaskSummary, RasterSummary};

pub mod display;
pub mod presenter;
pub mod style;

pub use display::{DisplayError, InMemoryMap, MapDisplay, TiffMap};
pub use presenter::render;
pub use style::{Color, Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    PermanentWater,
    MonsoonFlood,
    NdwiWater,
    MndwiWater,
    SentinelVv,
}

impl LayerKind {
    /// Dropdown order.
    pub const ALL: [LayerKind; 5] = [
        LayerKind::PermanentWater,
        LayerKind::MonsoonFlood,
        LayerKind::NdwiWater,
        LayerKind::MndwiWater,
        LayerKind::SentinelVv,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            LayerKind::PermanentWater => "Permanent Water",
            LayerKind::MonsoonFlood => "Monsoon Flood",
            LayerKind::NdwiWater => "NDWI Water",
            LayerKind::MndwiWater => "MNDWI Water",
            LayerKind::SentinelVv => "Sentinel VV",
        }
    }

    pub fn style(&self) -> Style {
        match self {
            LayerKind::PermanentWater => Style::new(&["blue"], 0.0, 1.0),
            LayerKind::MonsoonFlood => Style::new(&["red"], 0.0, 1.0),
            LayerKind::NdwiWater => Style::new(&["cyan"], 0.0, 1.0),
            LayerKind::MndwiWater => Style::new(&["green"], 0.0, 1.0),
            LayerKind::SentinelVv => Style::new(&["blue", "green", "yellow"], -20.0, 0.0),
        }
    }

    pub fn display_name(&self, year: i32) -> String {
        match self {
            LayerKind::SentinelVv => format!("Sentinel-1 VV {}", year),
            _ => format!("{} {}", self.label(), year),
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownLayer(pub String);

impl fmt::Display for UnknownLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown layer: {}", self.0)
    }
}

impl std::error::Error for UnknownLayer {}

impl FromStr for LayerKind {
    type Err = UnknownLayer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayerKind::ALL
            .into_iter()
            .find(|kind| kind.label() == s)
            .ok_or_else(|| UnknownLayer(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerContent {
    /// Only `Some(true)` pixels are painted.
    Mask(Mask),
    Values { grid: Grid, data: Vec<f32> },
}

impl LayerContent {
    pub fn grid(&self) -> &Grid {
        match self {
            LayerContent::Mask(mask) => mask.grid(),
            LayerContent::Values { grid, .. } => grid,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            LayerContent::Mask(mask) => mask.count_true() == 0,
            LayerContent::Values { data, .. } => data.iter().all(|v| v.is_nan()),
        }
    }

    pub fn summary(&self) -> String {
        match self {
            LayerContent::Mask(mask) => MaskSummary::from_mask(mask).to_string(),
            LayerContent::Values { data, .. } => RasterSummary::from_values(data).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub kind: LayerKind,
    pub year: i32,
    pub style: Style,
    pub content: LayerContent,
}

impl Layer {
    pub fn new(kind: LayerKind, year: i32, content: LayerContent) -> Self {
        Self {
            name: kind.display_name(year),
            kind,
            year,
            style: kind.style(),
            content,
        }
    }

    /// Replaces the display name.
    pub fn named(mut self, name: String) -> Self {
        self.name = name;
        self
    }

    /// Row-major RGBA8 pixels.
    pub fn to_rgba(&self) -> Vec<u8> {
        match &self.content {
            LayerContent::Mask(mask) => mask
                .cells()
                .iter()
                .flat_map(|cell| match cell {
                    Some(true) => self.style.color_for(1.0),
                    _ => style::TRANSPARENT,
                })
                .collect(),
            LayerContent::Values { data, .. } => data
                .iter()
                .flat_map(|&v| self.style.color_for(v))
                .collect(),
        }
    }

    /// File-name friendly form of the display name.
    pub fn slug(&self) -> String {
        self.name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegendEntry {
    pub color: &'static str,
    pub label: &'static str,
}

/// Static legend shown next to the map.
pub fn legend() -> [LegendEntry; 5] {
    [
        LegendEntry {
            color: "red",
            label: "Monsoon Flood",
        },
        LegendEntry {
            color: "blue",
            label: "Permanent Water",
        },
        LegendEntry {
            color: "cyan",
            label: "NDWI Water",
        },
        LegendEntry {
            color: "green",
            label: "MNDWI Water",
        },
        LegendEntry {
            color: "yellow",
            label: "Sentinel VV",
        },
    ]
}
