use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Satellites {
    Sentinel2,
}

/// Optical band names with their centre wavelengths in nm.
#[derive(Debug)]
pub struct SatBands {
    sensor: Satellites,
    bands: &'static [(&'static str, u32)],
}

impl SatBands {
    pub fn new(sensor: Satellites) -> Self {
        let bands: &'static [(&'static str, u32)] = match sensor {
            // Blue, green, red, NIR, SWIR-1 and SWIR-2 (MSI bands 2, 3, 4, 8, 11, 12)
            Satellites::Sentinel2 => &[
                ("B2", 490),
                ("B3", 560),
                ("B4", 665),
                ("B8", 842),
                ("B11", 1610),
                ("B12", 2190),
            ],
        };
        Self { sensor, bands }
    }

    pub fn names(&self) -> Vec<String> {
        self.bands.iter().map(|(name, _)| name.to_string()).collect()
    }

    pub fn wavelengths(&self) -> Vec<u32> {
        self.bands.iter().map(|(_, wl)| *wl).collect()
    }

    /// Band whose centre wavelength is nearest to `target` nm.
    pub fn closest_band(&self, target: u32) -> &'static str {
        self.bands
            .iter()
            .min_by_key(|(_, wl)| wl.abs_diff(target))
            .map(|(name, _)| *name)
            .unwrap_or_default()
    }
}

impl Display for Satellites {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Satellites::Sentinel2 => write!(f, "Sentinel-2"),
        }
    }
}

impl Display for SatBands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Satellite: {}, Wavelengths: {:?}",
            self.sensor,
            self.wavelengths()
        )
    }
}
