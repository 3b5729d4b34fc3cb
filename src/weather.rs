use crate::config::Coordinates;
use anyhow::{bail, Context};
use chrono::{DateTime, Local, NaiveDateTime};
use itertools::Itertools;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

const API_HOST: &str = "https://api.open-meteo.com";
/// Sent with every request, no matter where the coordinates point
const TIMEZONE: &str = "Asia/Jakarta";

/// Build the forecast URL for the current conditions at a location
pub fn forecast_url(coordinates: &Coordinates) -> String {
    format!(
        "{API_HOST}/v1/forecast?latitude={}&longitude={}\
        &current_weather=true&timezone={TIMEZONE}",
        coordinates.latitude, coordinates.longitude
    )
}

/// Sky/precipitation condition, as classified by the provider's WMO weather
/// codes. Only the codes we have a label for get a variant.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Condition {
    ClearSky,
    PartlyCloudy,
    Fog,
    Drizzle,
    Rain,
    Snowfall,
    Thunderstorm,
}

impl Condition {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::ClearSky),
            1..=3 => Some(Self::PartlyCloudy),
            45 | 48 => Some(Self::Fog),
            51 | 53 | 55 => Some(Self::Drizzle),
            61 | 63 | 65 => Some(Self::Rain),
            71 | 73 | 75 => Some(Self::Snowfall),
            95 => Some(Self::Thunderstorm),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ClearSky => "Clear Sky",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::Snowfall => "Snowfall",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

/// Human-readable description of a weather code. Empty for unmapped codes.
pub fn describe(code: i64) -> &'static str {
    Condition::from_code(code).map_or("", Condition::label)
}

/// Format a Celsius reading with exactly one decimal digit, e.g. `23.0°C`
pub fn format_temperature(celsius: f64) -> String {
    // Negative zero prints without its sign
    let celsius = celsius + 0.0;
    // Values like 0.25 sit exactly between two tenths. Those round away from
    // zero; everything else rounds to the nearest tenth.
    let is_tie =
        (celsius * 4.0).fract() == 0.0 && (celsius * 2.0).fract() != 0.0;
    let rounded = if is_tie {
        (celsius * 10.0).round() / 10.0
    } else {
        celsius
    };
    format!("{rounded:.1}°C")
}

/// The latest successful reading, ready for display
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub condition: Option<Condition>,
    pub temperature: f64,
    /// Observation time reported by the API, in the request's timezone
    pub observed_at: Option<NaiveDateTime>,
    pub fetched_at: DateTime<Local>,
}

impl Snapshot {
    /// Interpret a response body. `None` means the body had no current
    /// conditions in it: `current_weather` is missing or empty (`null`,
    /// `false`, `0` or `""`), or the body isn't an object at all.
    pub fn from_body(body: &str) -> anyhow::Result<Option<Self>> {
        let response: Value = serde_json::from_str(body)
            .context("Error parsing forecast as JSON")?;
        let Some(current) = response
            .get("current_weather")
            .filter(|current| is_present(current))
        else {
            return Ok(None);
        };
        let current = CurrentWeather::deserialize(current)
            .context("Error parsing current weather")?;
        if !current.temperature.is_finite() {
            bail!("Invalid temperature {}", current.temperature);
        }
        Ok(Some(Self {
            condition: current.weathercode.and_then(Condition::from_code),
            temperature: current.temperature,
            observed_at: current.time,
            fetched_at: Local::now(),
        }))
    }
}

impl Display for Snapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let temperature = format_temperature(self.temperature);
        let description: Option<&str> = self.condition.map(Condition::label);
        let text = description
            .into_iter()
            .chain([temperature.as_str()])
            .join(", ");
        f.write_str(&text)
    }
}

/// Does a field hold anything? Empty values count as absent.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64() != Some(0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// https://open-meteo.com/en/docs
#[derive(Clone, Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    #[serde(default, deserialize_with = "weather_code")]
    weathercode: Option<i64>,
    #[serde(default, deserialize_with = "local_time")]
    time: Option<NaiveDateTime>,
}

/// Anything that isn't an integral number is treated as an unknown code
fn weather_code<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|code| code.fract() == 0.0)
                .map(|code| code as i64)
        }),
        _ => None,
    })
}

/// The API sends minute precision without seconds (`2024-05-24T17:00`),
/// which chrono's serde impl won't take. Unparseable times are dropped, the
/// time is informational only.
fn local_time<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error> {
    let Value::String(time) = Value::deserialize(deserializer)?
    else {
        return Ok(None);
    };
    Ok(["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&time, format).ok()))
}

/// Transport for forecast requests. Given a URL, return the response body of
/// a successful (2xx) response, or an error for anything else.
pub trait Fetch: Send + Sync + 'static {
    fn get(&self, url: &str) -> anyhow::Result<String>;
}

/// Blocking HTTP transport. No explicit timeout, we rely on the agent's
/// defaults.
pub struct UreqFetcher {
    agent: ureq::Agent,
}

impl Default for UreqFetcher {
    fn default() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .user_agent(concat!(
                    "local-weather/",
                    env!("CARGO_PKG_VERSION")
                ))
                .build(),
        }
    }
}

impl Fetch for UreqFetcher {
    fn get(&self, url: &str) -> anyhow::Result<String> {
        let response = self
            .agent
            .get(url)
            .call()
            .with_context(|| {
                format!("Error fetching forecast from {API_HOST}")
            })?;
        let status = response.status();
        if !(200..300).contains(&status) {
            bail!("Network response was not ok: {status}");
        }
        response
            .into_string()
            .context("Error reading forecast response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const KNOWN_CODES: &[(i64, &str)] = &[
        (0, "Clear Sky"),
        (1, "Partly Cloudy"),
        (2, "Partly Cloudy"),
        (3, "Partly Cloudy"),
        (45, "Fog"),
        (48, "Fog"),
        (51, "Drizzle"),
        (53, "Drizzle"),
        (55, "Drizzle"),
        (61, "Rain"),
        (63, "Rain"),
        (65, "Rain"),
        (71, "Snowfall"),
        (73, "Snowfall"),
        (75, "Snowfall"),
        (95, "Thunderstorm"),
    ];

    #[test]
    fn test_describe_known_codes() {
        for &(code, expected) in KNOWN_CODES {
            assert_eq!(describe(code), expected, "code {code}");
        }
    }

    #[test]
    fn test_describe_unknown_codes() {
        for code in -5..=100 {
            if KNOWN_CODES.iter().all(|&(known, _)| known != code) {
                assert_eq!(describe(code), "", "code {code}");
            }
        }
        assert_eq!(describe(i64::MAX), "");
        assert_eq!(describe(96), "");
        assert_eq!(describe(99), "");
    }

    #[test]
    fn test_format_temperature() {
        assert_eq!(format_temperature(23.0), "23.0°C");
        assert_eq!(format_temperature(23.46), "23.5°C");
        assert_eq!(format_temperature(18.04), "18.0°C");
        assert_eq!(format_temperature(-3.27), "-3.3°C");
        assert_eq!(format_temperature(0.0), "0.0°C");
        assert_eq!(format_temperature(100.99), "101.0°C");
        assert_eq!(format_temperature(-0.0), "0.0°C");
        assert_eq!(format_temperature(-0.04), "-0.0°C");
    }

    #[test]
    fn test_format_temperature_ties() {
        assert_eq!(format_temperature(0.25), "0.3°C");
        assert_eq!(format_temperature(0.75), "0.8°C");
        assert_eq!(format_temperature(-0.25), "-0.3°C");
        // Not an exact tie in binary, it's a hair under 0.15
        assert_eq!(format_temperature(0.15), "0.1°C");
    }

    #[test]
    fn test_forecast_url() {
        let url = forecast_url(&Coordinates {
            latitude: -6.2088,
            longitude: 106.8456,
        });
        assert_eq!(
            url,
            "https://api.open-meteo.com/v1/forecast?latitude=-6.2088\
            &longitude=106.8456&current_weather=true&timezone=Asia/Jakarta"
        );
        let url = forecast_url(&Coordinates {
            latitude: 10.0,
            longitude: -0.5,
        });
        assert!(url.contains("latitude=10&longitude=-0.5&"), "{url}");
    }

    #[test]
    fn test_snapshot_display() {
        let snapshot = Snapshot::from_body(
            r#"{"current_weather": {"weathercode": 61, "temperature": 18.04}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(snapshot.condition, Some(Condition::Rain));
        assert_eq!(snapshot.to_string(), "Rain, 18.0°C");

        let snapshot = Snapshot::from_body(
            r#"{"current_weather": {"weathercode": 2, "temperature": 23}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(snapshot.to_string(), "Partly Cloudy, 23.0°C");
    }

    #[test]
    fn test_snapshot_unknown_code() {
        let snapshot = Snapshot::from_body(
            r#"{"current_weather": {"weathercode": 80, "temperature": 23}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(snapshot.condition, None);
        assert_eq!(snapshot.to_string(), "23.0°C");

        // Missing and non-integral codes are just as unknown
        for body in [
            r#"{"current_weather": {"temperature": 23}}"#,
            r#"{"current_weather": {"weathercode": 1.5, "temperature": 23}}"#,
            r#"{"current_weather": {"weathercode": "rain", "temperature": 23}}"#,
        ] {
            let snapshot = Snapshot::from_body(body).unwrap().unwrap();
            assert_eq!(snapshot.to_string(), "23.0°C", "{body}");
        }

        let snapshot = Snapshot::from_body(
            r#"{"current_weather": {"weathercode": 3.0, "temperature": 23}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(snapshot.to_string(), "Partly Cloudy, 23.0°C");
    }

    #[test]
    fn test_snapshot_not_available() {
        for body in [
            "{}",
            "null",
            r#"{"current_weather": null}"#,
            r#"{"latitude": -6.25, "hourly": {}}"#,
            r#"{"current_weather": false}"#,
            r#"{"current_weather": 0}"#,
            r#"{"current_weather": ""}"#,
            "false",
            "5",
            r#""x""#,
            "[]",
        ] {
            assert_eq!(Snapshot::from_body(body).unwrap(), None, "{body}");
        }
    }

    #[test]
    fn test_snapshot_malformed() {
        for body in [
            "",
            "<html>",
            r#"{"current_weather": {"weathercode": 0}}"#,
            r#"{"current_weather": {"temperature": "hot"}}"#,
            r#"{"current_weather": {"temperature": null}}"#,
            r#"{"current_weather": true}"#,
            r#"{"current_weather": []}"#,
        ] {
            assert!(Snapshot::from_body(body).is_err(), "{body}");
        }
    }

    #[test]
    fn test_snapshot_observed_at() {
        let snapshot = Snapshot::from_body(
            r#"{"current_weather": {
                "time": "2024-05-24T17:00",
                "weathercode": 0,
                "temperature": 31.2,
                "windspeed": 7.9
            }}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            snapshot.observed_at,
            NaiveDate::from_ymd_opt(2024, 5, 24)
                .unwrap()
                .and_hms_opt(17, 0, 0)
        );
        assert_eq!(snapshot.to_string(), "Clear Sky, 31.2°C");

        let snapshot = Snapshot::from_body(
            r#"{"current_weather": {"time": 12, "temperature": 31.2}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(snapshot.observed_at, None);
    }
}
