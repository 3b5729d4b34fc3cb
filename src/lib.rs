//! Current weather conditions for a location, fetched from Open-Meteo and
//! rendered as a single line of styled text onto any `embedded-graphics`
//! draw target.

pub mod config;
pub mod display;
pub mod mock_display;
pub mod state;
pub mod style;
pub mod util;
pub mod weather;
pub mod widget;

pub use widget::WeatherWidget;
