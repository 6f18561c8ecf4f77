// Field names mirror the OpenWeather JSON.
#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ContentError;

/// Unit system for OpenWeather responses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Kelvin, m/s.
    Standard,
    /// Celsius, m/s.
    #[default]
    Metric,
    /// Fahrenheit, mph.
    Imperial,
}

impl Units {
    /// Query-string value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }
}

impl FromStr for Units {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "metric" => Ok(Self::Metric),
            "imperial" => Ok(Self::Imperial),
            _ => Err(ContentError::invalid(
                "units must be either metric or imperial or standard",
            )),
        }
    }
}

/// Which day a forecast covers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    /// The current local day.
    #[default]
    Today,
    /// The following day.
    Tomorrow,
}

impl ReportType {
    /// `TODAY'S` or `TOMORROW'S`, for message headers.
    pub fn possessive_caps(self) -> &'static str {
        match self {
            Self::Today => "TODAY'S",
            Self::Tomorrow => "TOMORROW'S",
        }
    }

    /// Offset in days from today.
    pub fn day_offset(self) -> u64 {
        match self {
            Self::Today => 0,
            Self::Tomorrow => 1,
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
        })
    }
}

impl FromStr for ReportType {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(Self::Today),
            "tomorrow" => Ok(Self::Tomorrow),
            _ => Err(ContentError::invalid(
                "Type is required and must be 'today' or 'tomorrow'",
            )),
        }
    }
}

/// One entry of the `weather` array.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherCondition {
    /// Condition id.
    pub id: i64,
    /// Group, e.g. `Rain` or `Clouds`.
    pub main: String,
    /// Human-readable description.
    pub description: String,
    /// Icon id.
    pub icon: String,
}

/// One hour of the One Call `hourly` block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hourly {
    /// Unix time, UTC.
    pub dt: i64,
    pub temp: f64,
    pub feels_like: f64,
    pub pressure: i64,
    pub humidity: i64,
    pub dew_point: f64,
    pub uvi: f64,
    pub clouds: i64,
    pub visibility: i64,
    pub wind_speed: f64,
    pub wind_deg: i64,
    pub wind_gust: f64,
    pub weather: Vec<WeatherCondition>,
    /// Probability of precipitation, 0..=1.
    pub pop: f64,
}

/// `/data/3.0/onecall` response. Only the hourly block is requested.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneCall {
    pub lat: f64,
    pub lon: f64,
    /// IANA zone name.
    pub timezone: String,
    /// Seconds east of UTC.
    pub timezone_offset: i32,
    pub hourly: Vec<Hourly>,
}

/// `/data/3.0/onecall/overview` response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Overview {
    pub lat: f64,
    pub lon: f64,
    pub tz: String,
    pub date: String,
    pub units: String,
    /// Free-text summary written by OpenWeather.
    pub weather_overview: String,
}

/// A reading taken in the afternoon.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Afternoon {
    pub afternoon: f64,
}

/// Daily precipitation, mm.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Precipitation {
    pub total: f64,
}

/// Temperatures across the day.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Temperature {
    pub min: f64,
    pub max: f64,
    pub afternoon: f64,
    pub night: f64,
    pub evening: f64,
    pub morning: f64,
}

/// Strongest wind of the day.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindMax {
    pub speed: f64,
    /// Degrees.
    pub direction: f64,
}

/// Wind block of the day summary.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Wind {
    pub max: WindMax,
}

/// `/data/3.0/onecall/day_summary` response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaySummary {
    pub lat: f64,
    pub lon: f64,
    pub tz: String,
    pub date: String,
    pub units: String,
    pub cloud_cover: Afternoon,
    pub humidity: Afternoon,
    pub precipitation: Precipitation,
    pub temperature: Temperature,
    pub pressure: Afternoon,
    pub wind: Wind,
}

/// Error body OpenWeather returns with non-200 responses.
///
/// `code` is a number on some endpoints and a string on others.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiErrorBody {
    pub code: serde_json::Value,
    pub message: String,
    pub parameters: Vec<String>,
}

impl ApiErrorBody {
    pub(crate) fn code_string(&self) -> String {
        match &self.code {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error message: {}, error code: {}, error parameters: [{}]",
            self.message,
            self.code_string(),
            self.parameters.join(" ")
        )
    }
}

/// Everything needed to render one forecast message.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WeatherAggregate {
    /// `%Y-%m-%d` of the forecast day.
    pub date: String,
    pub report_type: ReportType,
    pub latitude: f64,
    pub longitude: f64,
    pub weather_overview: String,
    /// IANA zone name.
    pub timezone: String,
    /// Seconds east of UTC, used to render hourly timestamps.
    pub timezone_offset: i32,
    pub daily: DaySummary,
    /// At most 24 entries.
    pub hourly: Vec<Hourly>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_type_parses_lowercase_only() {
        assert_eq!("today".parse::<ReportType>().unwrap(), ReportType::Today);
        assert_eq!(
            "tomorrow".parse::<ReportType>().unwrap(),
            ReportType::Tomorrow
        );
        assert!("Today".parse::<ReportType>().is_err());
        assert!("".parse::<ReportType>().is_err());
    }

    #[test]
    fn units_reject_unknown() {
        assert_eq!("imperial".parse::<Units>().unwrap(), Units::Imperial);
        let err = "kelvin".parse::<Units>().unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn error_body_accepts_numeric_code() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"cod":401,"code":401,"message":"Invalid API key","parameters":["appid"]}"#,
        )
        .unwrap();
        assert_eq!(
            body.to_string(),
            "error message: Invalid API key, error code: 401, error parameters: [appid]"
        );
    }

    #[test]
    fn day_summary_decodes_nested_fields() {
        let summary: DaySummary = serde_json::from_str(
            r#"{"date":"2025-04-05","temperature":{"min":24.1,"max":31.9},"wind":{"max":{"speed":6.2,"direction":120}},"precipitation":{"total":2.5}}"#,
        )
        .unwrap();
        assert!((summary.temperature.max - 31.9).abs() < f64::EPSILON);
        assert!((summary.wind.max.direction - 120.0).abs() < f64::EPSILON);
        assert!((summary.precipitation.total - 2.5).abs() < f64::EPSILON);
    }
}
