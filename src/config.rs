use crate::util::Color;
use anyhow::{bail, Context};
use indexmap::IndexMap;
use log::info;
use serde::Deserialize;
use std::{
    fmt::{self, Display, Formatter},
    fs::File,
    ops::RangeInclusive,
    path::Path,
};

/// Caller-supplied style overrides, keyed by camelCase CSS property name.
/// Order is preserved, since later declarations win.
pub type StyleOverrides = IndexMap<String, serde_json::Value>;

/// Every default the widget needs, in one place. Passed to the widget when
/// it's mounted.
pub const DEFAULTS: Defaults = Defaults {
    text_color: Color::new(0xe8, 0xe8, 0xe8),
    font_family: "Inter",
    font_size: 16,
    font_weight: 600,
    line_height: 20,
    font_style: FontStyle::Normal,
    // Jakarta, Indonesia
    coordinates: Coordinates {
        latitude: -6.2088,
        longitude: 106.8456,
    },
};

/// Fallback values for any prop the caller leaves out
#[derive(Clone, Debug, PartialEq)]
pub struct Defaults {
    pub text_color: Color,
    pub font_family: &'static str,
    pub font_size: u32,
    pub font_weight: u16,
    pub line_height: u32,
    pub font_style: FontStyle,
    pub coordinates: Coordinates,
}

/// Inbound widget configuration. Every field is optional and falls back to
/// [Defaults] when resolved.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Props {
    pub style: StyleOverrides,
    pub text_color: Option<Color>,
    pub font_family: Option<String>,
    pub font_size: Option<u32>,
    pub font_weight: Option<u16>,
    pub line_height: Option<u32>,
    pub font_style: Option<FontStyle>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Props {
    pub const PATH: &'static str = "./config.json";
    /// Allowed line heights, in pixels
    const LINE_HEIGHT_RANGE: RangeInclusive<u32> = 10..=100;
    /// Allowed font sizes, in pixels
    const FONT_SIZE_RANGE: RangeInclusive<u32> = 1..=512;

    /// Load props from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        info!("Loading config from `{}`", path.display());
        let file = File::open(path).with_context(|| {
            format!("Error opening config file {}", path.display())
        })?;
        let props: Self = serde_json::from_reader(file).with_context(|| {
            format!("Error parsing config file {}", path.display())
        })?;
        props.validate().with_context(|| {
            format!("Invalid config file {}", path.display())
        })?;
        Ok(props)
    }

    /// Enforce the same limits the property panel does
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(line_height) = self.line_height {
            if !Self::LINE_HEIGHT_RANGE.contains(&line_height) {
                bail!(
                    "lineHeight {line_height} out of range {:?}",
                    Self::LINE_HEIGHT_RANGE
                );
            }
        }
        if let Some(font_size) = self.font_size {
            if !Self::FONT_SIZE_RANGE.contains(&font_size) {
                bail!(
                    "fontSize {font_size} out of range {:?}",
                    Self::FONT_SIZE_RANGE
                );
            }
        }
        Ok(())
    }

    /// Fill in every missing field from the defaults
    pub fn resolve(self, defaults: &Defaults) -> Settings {
        Settings {
            style: self.style,
            text_color: self.text_color.unwrap_or(defaults.text_color),
            font_family: self
                .font_family
                .unwrap_or_else(|| defaults.font_family.to_owned()),
            font_size: self.font_size.unwrap_or(defaults.font_size),
            font_weight: self.font_weight.unwrap_or(defaults.font_weight),
            line_height: self.line_height.unwrap_or(defaults.line_height),
            font_style: self.font_style.unwrap_or(defaults.font_style),
            coordinates: Coordinates {
                latitude: self
                    .latitude
                    .unwrap_or(defaults.coordinates.latitude),
                longitude: self
                    .longitude
                    .unwrap_or(defaults.coordinates.longitude),
            },
        }
    }
}

/// Fully resolved configuration for one render cycle
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub style: StyleOverrides,
    pub text_color: Color,
    pub font_family: String,
    pub font_size: u32,
    pub font_weight: u16,
    pub line_height: u32,
    pub font_style: FontStyle,
    pub coordinates: Coordinates,
}

/// Geographic location, in degrees. No range checks, the API gets whatever
/// we're given.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Same-value comparison: `NaN` matches itself and `0.0` doesn't match
    /// `-0.0`. This decides whether a prop change needs a new fetch.
    pub fn same_as(&self, other: &Self) -> bool {
        self.latitude.to_bits() == other.latitude.to_bits()
            && self.longitude.to_bits() == other.longitude.to_bits()
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

impl FontStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Italic => "italic",
            Self::Oblique => "oblique",
        }
    }
}

impl Display for FontStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_resolve_defaults() {
        let settings = Props::default().resolve(&DEFAULTS);
        assert_eq!(settings.text_color.to_string(), "#e8e8e8");
        assert_eq!(settings.font_family, "Inter");
        assert_eq!(settings.font_size, 16);
        assert_eq!(settings.font_weight, 600);
        assert_eq!(settings.line_height, 20);
        assert_eq!(settings.font_style, FontStyle::Normal);
        assert_eq!(settings.coordinates.latitude, -6.2088);
        assert_eq!(settings.coordinates.longitude, 106.8456);
        assert!(settings.style.is_empty());
    }

    #[test]
    fn test_resolve_overrides() {
        let props: Props = serde_json::from_value(json!({
            "textColor": "#ff0000",
            "fontFamily": "Courier",
            "lineHeight": 30,
            "fontStyle": "italic",
            "latitude": 51.5072,
            "style": {"backgroundColor": "#000000", "fontSize": 20},
        }))
        .unwrap();
        let settings = props.resolve(&DEFAULTS);
        assert_eq!(settings.text_color, Color::new(0xff, 0, 0));
        assert_eq!(settings.font_family, "Courier");
        assert_eq!(settings.line_height, 30);
        assert_eq!(settings.font_style, FontStyle::Italic);
        assert_eq!(settings.coordinates.latitude, 51.5072);
        // Untouched fields still come from the defaults
        assert_eq!(settings.coordinates.longitude, 106.8456);
        assert_eq!(settings.font_size, 16);
        assert_eq!(
            settings.style.keys().collect::<Vec<_>>(),
            ["backgroundColor", "fontSize"]
        );
    }

    #[test]
    fn test_validate() {
        let props = Props {
            line_height: Some(9),
            ..Default::default()
        };
        assert!(props.validate().is_err());
        let props = Props {
            line_height: Some(100),
            font_size: Some(0),
            ..Default::default()
        };
        assert!(props.validate().is_err());
        let props = Props {
            line_height: Some(10),
            font_size: Some(24),
            ..Default::default()
        };
        assert!(props.validate().is_ok());
    }

    #[test]
    fn test_invalid_font_style() {
        let result =
            serde_json::from_value::<Props>(json!({"fontStyle": "bold"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"latitude": 40.7128, "longitude": -74.006}}"#)
            .unwrap();
        let props = Props::load(file.path()).unwrap();
        assert_eq!(props.latitude, Some(40.7128));
        assert_eq!(props.longitude, Some(-74.006));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"lineHeight": 500}}"#).unwrap();
        assert!(Props::load(file.path()).is_err());

        assert!(Props::load(Path::new("./does-not-exist.json")).is_err());
    }

    #[test]
    fn test_example_config() {
        let props: Props =
            serde_json::from_str(include_str!("../config.example.json"))
                .unwrap();
        props.validate().unwrap();
        // The example spells out every default
        let settings = props.resolve(&DEFAULTS);
        assert_eq!(
            Settings {
                style: Default::default(),
                ..settings
            },
            Props::default().resolve(&DEFAULTS)
        );
    }

    #[test]
    fn test_same_coordinates() {
        let a = Coordinates {
            latitude: 1.0,
            longitude: 2.0,
        };
        assert!(a.same_as(&a));
        assert!(!a.same_as(&Coordinates {
            latitude: 1.0001,
            ..a
        }));
        let nan = Coordinates {
            latitude: f64::NAN,
            longitude: 0.0,
        };
        assert!(nan.same_as(&nan));
        assert!(!nan.same_as(&Coordinates {
            longitude: -0.0,
            ..nan
        }));
    }
}
