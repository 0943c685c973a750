pub mod canvas;
pub mod config;
pub mod document;
pub mod error;
pub mod geometry;
pub mod history;
pub mod io;
pub mod paint;
pub mod pixelmap;
pub mod replay;
pub mod tools;

pub use canvas::{Canvas, CanvasEvent, GestureState};
pub use config::{CanvasConfig, ConfigChange, Settings, SharedConfig};
pub use document::Document;
pub use error::{Result, SpryteError};
pub use geometry::Viewport;
pub use history::History;
pub use pixelmap::{Coord, PixelMap};
pub use tools::ToolType;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Straight (non premultiplied) RGBA color with channels in `[0, 1]`.
///
/// Equality is exact per channel. A color whose alpha is exactly zero is
/// "absent": the pixel map never stores it as a committed pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0.0
    }

    pub fn from_rgba8(rgba: [u8; 4]) -> Self {
        Self {
            r: rgba[0] as f64 / 255.0,
            g: rgba[1] as f64 / 255.0,
            b: rgba[2] as f64 / 255.0,
            a: rgba[3] as f64 / 255.0,
        }
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        [
            channel_to_u8(self.r),
            channel_to_u8(self.g),
            channel_to_u8(self.b),
            channel_to_u8(self.a),
        ]
    }

    /// Drops the alpha channel.
    pub fn to_rgb8(&self) -> [u8; 3] {
        let [r, g, b, _] = self.to_rgba8();
        [r, g, b]
    }

    /// Parses `#RRGGBB` or `#RRGGBBAA`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#')?;
        if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
            return None;
        }

        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        let alpha = if hex.len() == 8 { byte(6)? } else { 255 };

        Some(Self::from_rgba8([byte(0)?, byte(2)?, byte(4)?, alpha]))
    }

    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::TRANSPARENT
    }
}

impl FromStr for Color {
    type Err = SpryteError;

    fn from_str(s: &str) -> Result<Self> {
        Color::from_hex(s).ok_or_else(|| SpryteError::InvalidColor(s.to_string()))
    }
}

fn channel_to_u8(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Pointer button that started or continues a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Primary,
    Middle,
    Secondary,
}

impl FromStr for Button {
    type Err = SpryteError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "primary" | "left" => Ok(Button::Primary),
            "middle" => Ok(Button::Middle),
            "secondary" | "right" => Ok(Button::Secondary),
            _ => Err(SpryteError::UnknownButton(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}
