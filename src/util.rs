use anyhow::{anyhow, Context};
use embedded_graphics::pixelcolor::Rgb888;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// 24-bit Red-Green-Blue color. Serializes/deserializes as HTML format
/// (#rrggbb). Parsing also accepts the short `#rgb` form and CSS
/// `rgb(..)`/`rgba(..)` functions, which is what design tools tend to emit.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    fn from_hex(hex: &str) -> anyhow::Result<Self> {
        match hex.len() {
            6 => Ok(u32::from_str_radix(hex, 16)?.into()),
            // Each digit is doubled: #abc == #aabbcc
            3 => {
                let value = u32::from_str_radix(hex, 16)?;
                let expand = |digit: u32| (digit * 0x11) as u8;
                Ok(Self::new(
                    expand((value >> 8) & 0xf),
                    expand((value >> 4) & 0xf),
                    expand(value & 0xf),
                ))
            }
            _ => Err(anyhow!("Expected 3 or 6 hex digits, got `{hex}`")),
        }
    }

    /// Parse the argument list of `rgb(r, g, b)` or `rgba(r, g, b, a)`. Alpha
    /// is dropped, we have nothing to blend against.
    fn from_rgb_function(args: &str) -> anyhow::Result<Self> {
        let channels = args
            .split(',')
            .map(str::trim)
            .take(3)
            .map(|channel| {
                channel.parse::<u8>().with_context(|| {
                    format!("Invalid color channel `{channel}`")
                })
            })
            .collect::<anyhow::Result<Vec<u8>>>()?;
        match channels.as_slice() {
            &[red, green, blue] => Ok(Self::new(red, green, blue)),
            _ => Err(anyhow!("Expected 3 color channels in `{args}`")),
        }
    }
}

// This is lossy, since we throw away the first 8 bits. Hope it wasn't RGBA!
impl From<u32> for Color {
    fn from(value: u32) -> Self {
        // Casting will truncate the 24 most significant bits
        let red = (value >> 16) as u8;
        let green = (value >> 8) as u8;
        let blue = value as u8;
        Self { red, green, blue }
    }
}

impl From<Color> for Rgb888 {
    fn from(color: Color) -> Self {
        Rgb888::new(color.red, color.green, color.blue)
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let rgb_args = s
            .strip_prefix("rgba(")
            .or_else(|| s.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'));

        let color = if let Some(hex) = s.strip_prefix('#') {
            Self::from_hex(hex)
        } else if let Some(args) = rgb_args {
            Self::from_rgb_function(args)
        } else {
            Err(anyhow!("Invalid color string: {}", s))
        };
        color.with_context(|| format!("Error parsing color `{s}`"))
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:0>2x}{:0>2x}{:0>2x}", self.red, self.green, self.blue)
    }
}

// These impls are needed for serde
impl TryFrom<String> for Color {
    type Error = <Color as FromStr>::Err;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Parse a CSS pixel length (`"20px"`). A bare number is read as pixels too.
/// Fractional lengths are rounded, we only draw whole pixels.
pub fn parse_px(value: &str) -> Option<u32> {
    let number = value.trim();
    let number = number.strip_suffix("px").unwrap_or(number).trim();
    let pixels = number.parse::<f64>().ok()?;
    (pixels.is_finite() && pixels >= 0.0).then(|| pixels.round() as u32)
}
