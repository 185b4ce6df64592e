use crate::foundation::error::{StageError, StageResult};

pub use kurbo::{Affine, Point, Rect, Size, Vec2};

/// Browser-like viewport: logical size plus device pixel density.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    /// Logical width in CSS pixels.
    pub width: f64,
    /// Logical height in CSS pixels.
    pub height: f64,
    /// Physical pixels per logical pixel.
    pub device_pixel_ratio: f64,
}

impl Viewport {
    /// Build a viewport, rejecting non-finite or non-positive dimensions.
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> StageResult<Self> {
        if !width.is_finite() || !height.is_finite() || width < 0.0 || height < 0.0 {
            return Err(StageError::validation(
                "viewport size must be finite and >= 0",
            ));
        }
        if !device_pixel_ratio.is_finite() || device_pixel_ratio <= 0.0 {
            return Err(StageError::validation(
                "device_pixel_ratio must be finite and > 0",
            ));
        }
        Ok(Self {
            width,
            height,
            device_pixel_ratio,
        })
    }

    /// Logical size of the viewport.
    pub fn size(self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Edge length of a square that covers the whole viewport from any point inside it.
    pub fn diagonal(self) -> f64 {
        self.width.hypot(self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            device_pixel_ratio: 1.0,
        }
    }
}

/// Straight (non-premultiplied) opaque sRGB color, serialized as `#rrggbb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb8 {
    /// Pure black.
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// Pure white.
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Build a color from channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` or `#rrggbb` (leading `#` optional).
    pub fn from_hex(s: &str) -> StageResult<Self> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(StageError::validation(format!("color '{s}' is not valid hex")));
        }
        let expanded = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => hex.to_owned(),
            _ => {
                return Err(StageError::validation(format!(
                    "color '{s}' must be #rgb or #rrggbb"
                )));
            }
        };
        let channel = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16)
                .map_err(|_| StageError::validation(format!("color '{s}' is not valid hex")))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Format as lowercase `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Rgb8 {
    type Error = StageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Rgb8> for String {
    fn from(value: Rgb8) -> Self {
        value.to_hex()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
