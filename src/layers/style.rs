//! Palette styles for displayed layers.

/// RGB color parsed from a CSS name or `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "blue" => Some(Self::rgb(0, 0, 255)),
            "red" => Some(Self::rgb(255, 0, 0)),
            "cyan" => Some(Self::rgb(0, 255, 255)),
            "green" => Some(Self::rgb(0, 128, 0)),
            "yellow" => Some(Self::rgb(255, 255, 0)),
            _ => hex_to_rgb(name).map(|(r, g, b)| Self::rgb(r, g, b)),
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Parse hex color string to RGB
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if !hex.is_ascii() || hex.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

/// Linear palette stretched between `min` and `max`.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub palette: Vec<Color>,
    pub min: f32,
    pub max: f32,
}

pub const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

impl Style {
    pub fn new(palette: &[&str], min: f32, max: f32) -> Self {
        Self {
            palette: palette.iter().filter_map(|c| Color::parse(c)).collect(),
            min,
            max,
        }
    }

    /// RGBA for `value`, clamped into range; no-data is transparent.
    pub fn color_for(&self, value: f32) -> [u8; 4] {
        if value.is_nan() || self.palette.is_empty() {
            return TRANSPARENT;
        }

        let span = self.max - self.min;
        let t = if span > 0.0 {
            ((value - self.min) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let segments = self.palette.len() - 1;
        if segments == 0 {
            let c = self.palette[0];
            return [c.r, c.g, c.b, 255];
        }

        let pos = t * segments as f32;
        let i = (pos.floor() as usize).min(segments - 1);
        let frac = pos - i as f32;
        let (a, b) = (self.palette[i], self.palette[i + 1]);
        let lerp = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * frac).round() as u8;

        [lerp(a.r, b.r), lerp(a.g, b.g), lerp(a.b, b.b), 255]
    }
}
