//! Computed style for the widget's text container. Declarations are merged
//! in a fixed order, CSS-object style: a later declaration for the same key
//! replaces the earlier value. The result is then resolved into concrete
//! drawing parameters.

use crate::{
    config::Settings,
    util::{parse_px, Color},
};
use indexmap::IndexMap;
use itertools::Itertools;
use log::warn;
use std::fmt::{self, Display, Formatter};

/// Font stack used until the typography resolver picks a family
pub const FONT_STACK: &str = "Inter, Helvetica, Arial, sans-serif";

/// Ordered style declarations, keyed by camelCase property name
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComputedStyle(IndexMap<String, String>);

impl ComputedStyle {
    /// Merge everything that styles the container. Caller overrides beat
    /// the individually configured properties, but not the forced width or
    /// the typography resolver's output.
    pub fn compute(settings: &Settings) -> Self {
        let mut style = Self::default();
        style.set("fontFamily", FONT_STACK);
        style.set("color", settings.text_color.to_string());
        style.set("lineHeight", format!("{}px", settings.line_height));
        style.set("fontStyle", settings.font_style.as_str());
        style.set("textAlign", "left");

        for (key, value) in &settings.style {
            match value {
                // An explicit null unsets the property
                serde_json::Value::Null => {
                    style.0.shift_remove(key);
                }
                serde_json::Value::String(value) => style.set(key, value),
                value => style.set(key, value.to_string()),
            }
        }

        style.set("width", "100%");
        for (key, value) in typography(settings) {
            style.set(key, value);
        }
        style
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl '_ + Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

impl Display for ComputedStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.iter()
                .format_with("; ", |(key, value), f| f(&format_args!(
                    "{key}: {value}"
                )))
        )
    }
}

/// Font declarations derived from the typography props
fn typography(settings: &Settings) -> [(&'static str, String); 3] {
    [
        ("fontSize", format!("{}px", settings.font_size)),
        ("fontFamily", settings.font_family.clone()),
        ("fontWeight", settings.font_weight.to_string()),
    ]
}

/// Concrete drawing parameters, resolved from a [ComputedStyle]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderStyle {
    pub color: Color,
    pub background: Color,
    /// Distance between baselines, in pixels
    pub line_height: u32,
    pub font: Font,
}

impl RenderStyle {
    /// Interpret the declarations we know how to draw. Values we can't parse
    /// fall back to the configured settings.
    pub fn resolve(style: &ComputedStyle, settings: &Settings) -> Self {
        let color = style
            .get("color")
            .and_then(|value| parse_color("color", value))
            .unwrap_or(settings.text_color);
        let background = style
            .get("backgroundColor")
            .and_then(|value| parse_color("backgroundColor", value))
            .unwrap_or(Color::BLACK);
        let line_height = style
            .get("lineHeight")
            .and_then(parse_px)
            .unwrap_or(settings.line_height);
        let size = style
            .get("fontSize")
            .and_then(parse_px)
            .unwrap_or(settings.font_size);
        let weight = style
            .get("fontWeight")
            .and_then(parse_weight)
            .unwrap_or(settings.font_weight);
        let italic =
            matches!(style.get("fontStyle"), Some("italic" | "oblique"));
        let family = Family::from_stack(style.get("fontFamily").unwrap_or(""));

        Self {
            color,
            background,
            line_height,
            font: Font {
                family,
                size: Font::nearest_size(size),
                bold: weight >= Font::BOLD_WEIGHT,
                italic,
            },
        }
    }
}

fn parse_color(key: &str, value: &str) -> Option<Color> {
    value
        .parse()
        .map_err(|error| warn!("Ignoring {key} `{value}`: {error}"))
        .ok()
}

fn parse_weight(value: &str) -> Option<u16> {
    match value.trim() {
        "normal" => Some(400),
        "bold" => Some(700),
        weight => weight.parse().ok(),
    }
}

/// A font we can actually draw with
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Font {
    pub family: Family,
    /// Pixel size, always one of [Font::SIZES]
    pub size: u32,
    pub bold: bool,
    pub italic: bool,
}

impl Font {
    pub const SIZES: [u32; 6] = [8, 10, 12, 14, 18, 24];
    const BOLD_WEIGHT: u16 = 600;

    /// Snap to the closest size we have glyphs for. Ties go small.
    fn nearest_size(size: u32) -> u32 {
        Self::SIZES
            .into_iter()
            .min_by_key(|available| available.abs_diff(size))
            .unwrap_or(Self::SIZES[0])
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Family {
    Helvetica,
    Times,
    Schoolbook,
    Courier,
}

impl Family {
    /// Pick the first family in a CSS font stack that we can map onto one of
    /// ours. Falls back to sans.
    pub fn from_stack(stack: &str) -> Self {
        stack
            .split(',')
            .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\''))
            .find_map(Self::from_name)
            .unwrap_or(Self::Helvetica)
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "inter" | "helvetica" | "helvetica neue" | "arial" | "roboto"
            | "segoe ui" | "system-ui" | "-apple-system"
            | "blinkmacsystemfont" | "sans-serif" => Some(Self::Helvetica),
            "times" | "times new roman" | "georgia" | "serif" => {
                Some(Self::Times)
            }
            "new century schoolbook" | "century schoolbook" | "century" => {
                Some(Self::Schoolbook)
            }
            "courier" | "courier new" | "menlo" | "monaco" | "consolas"
            | "monospace" => Some(Self::Courier),
            _ => None,
        }
    }
}
