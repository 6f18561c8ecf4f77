use chrono::{Days, NaiveDate};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::types::{
    ApiErrorBody, DaySummary, OneCall, Overview, ReportType, Units, WeatherAggregate,
};
use crate::errors::{ContentError, Result};
use crate::http;

/// Production OpenWeather host.
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Blocks dropped from One Call so only `hourly` comes back.
const HOURLY_ONLY_EXCLUDE: &str = "current,minutely,daily,alerts";

/// Hours of forecast kept in an aggregate.
const HOURLY_WINDOW: usize = 24;

/// OpenWeather One Call 3.0 client.
#[derive(Clone, Debug)]
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    units: Units,
}

impl WeatherClient {
    /// Create a client using metric units.
    pub fn new(api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            client: http::client(),
            base_url: http::base_url(base_url),
            api_key: api_key.into(),
            units: Units::Metric,
        }
    }

    /// Use a different unit system.
    #[must_use]
    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    /// Free-text overview for `date` (`%Y-%m-%d`), or today when `None`.
    pub async fn overview(&self, lat: f64, lon: f64, date: Option<&str>) -> Result<Overview> {
        let mut query = self.base_query(lat, lon)?;
        if let Some(date) = date {
            query.push(("date", date.to_owned()));
        }
        self.get("/data/3.0/onecall/overview", &query).await
    }

    /// Aggregated statistics for `date` (`%Y-%m-%d`).
    pub async fn day_summary(&self, lat: f64, lon: f64, date: &str) -> Result<DaySummary> {
        let mut query = self.base_query(lat, lon)?;
        if date.is_empty() {
            return Err(ContentError::invalid("date is required"));
        }
        query.push(("date", date.to_owned()));
        self.get("/data/3.0/onecall/day_summary", &query).await
    }

    /// One Call with only the hourly block.
    pub async fn hourly(&self, lat: f64, lon: f64) -> Result<OneCall> {
        let mut query = self.base_query(lat, lon)?;
        query.push(("exclude", HOURLY_ONLY_EXCLUDE.to_owned()));
        self.get("/data/3.0/onecall", &query).await
    }

    /// Collect the overview, day summary and next 24 hours for a forecast.
    ///
    /// `today` anchors the date; [`ReportType::Tomorrow`] moves it one day on.
    #[instrument(skip_all, fields(report_type = %report_type, lat, lon))]
    pub async fn fetch_aggregate(
        &self,
        report_type: ReportType,
        lat: f64,
        lon: f64,
        today: NaiveDate,
    ) -> Result<WeatherAggregate> {
        let day = today
            .checked_add_days(Days::new(report_type.day_offset()))
            .unwrap_or(today);
        let date = day.format("%Y-%m-%d").to_string();

        let overview = self.overview(lat, lon, Some(&date)).await?;
        let daily = self.day_summary(lat, lon, &date).await?;
        let mut one_call = self.hourly(lat, lon).await?;
        one_call.hourly.truncate(HOURLY_WINDOW);
        debug!(date = %date, hours = one_call.hourly.len(), "weather data collected");

        Ok(WeatherAggregate {
            date,
            report_type,
            latitude: lat,
            longitude: lon,
            weather_overview: overview.weather_overview,
            timezone: overview.tz,
            timezone_offset: one_call.timezone_offset,
            daily,
            hourly: one_call.hourly,
        })
    }

    fn base_query(&self, lat: f64, lon: f64) -> Result<Vec<(&'static str, String)>> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ContentError::invalid("latitude must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(ContentError::invalid(
                "longitude must be between -180 and 180",
            ));
        }
        if self.api_key.is_empty() {
            return Err(ContentError::invalid("appid or API Key is required"));
        }
        Ok(vec![
            ("lat", format!("{lat:.6}")),
            ("lon", format!("{lon:.6}")),
            ("appid", self.api_key.clone()),
            ("units", self.units.as_str().to_owned()),
        ])
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        let request = self
            .client
            .get(format!("{}{path}", self.base_url))
            .header(ACCEPT, "application/json")
            .query(query);

        http::send_json("openweather", request, |status, body| {
            match serde_json::from_str::<ApiErrorBody>(body) {
                Ok(err) => ContentError::Api {
                    status,
                    message: err.to_string(),
                    code: Some(err.code_string()),
                },
                Err(_) => ContentError::Api {
                    status,
                    message: herald_core::text::truncate_str(body, 200).to_owned(),
                    code: None,
                },
            }
        })
        .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn hourly_json(n: usize) -> serde_json::Value {
        let hours: Vec<_> = (0..n)
            .map(|i| {
                json!({
                    "dt": 1_743_800_400 + i64::try_from(i).unwrap() * 3600,
                    "temp": 27.0,
                    "humidity": 80,
                    "pop": 0.2,
                    "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}]
                })
            })
            .collect();
        json!({"lat": -6.2, "lon": 106.8, "timezone": "Asia/Jakarta", "timezone_offset": 25200, "hourly": hours})
    }

    async fn mount_all(server: &MockServer, date: &str) {
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall/overview"))
            .and(query_param("date", date))
            .and(query_param("units", "metric"))
            .and(query_param("appid", "k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tz": "+07:00", "date": date, "weather_overview": "Warm with showers."
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall/day_summary"))
            .and(query_param("date", date))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "date": date,
                "temperature": {"min": 24.0, "max": 32.0},
                "precipitation": {"total": 3.1}
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .and(query_param("exclude", "current,minutely,daily,alerts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hourly_json(48)))
            .mount(server)
            .await;
    }

    fn april_4() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 4).unwrap()
    }

    #[tokio::test]
    async fn aggregate_for_tomorrow() {
        let server = MockServer::start().await;
        mount_all(&server, "2025-04-05").await;
        let client = WeatherClient::new("k", &server.uri());

        let agg = client
            .fetch_aggregate(ReportType::Tomorrow, -6.2, 106.8, april_4())
            .await
            .unwrap();

        assert_eq!(agg.date, "2025-04-05");
        assert_eq!(agg.report_type, ReportType::Tomorrow);
        assert_eq!(agg.weather_overview, "Warm with showers.");
        assert_eq!(agg.timezone, "+07:00");
        assert_eq!(agg.timezone_offset, 25200);
        assert_eq!(agg.hourly.len(), 24);
        assert!((agg.daily.temperature.max - 32.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn short_hourly_block_is_kept_whole() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hourly_json(5)))
            .mount(&server)
            .await;
        let client = WeatherClient::new("k", &server.uri());
        let one_call = client.hourly(0.0, 0.0).await.unwrap();
        assert_eq!(one_call.hourly.len(), 5);
        assert_eq!(one_call.hourly[0].weather[0].main, "Rain");
    }

    #[tokio::test]
    async fn coordinates_are_validated_before_any_request() {
        let server = MockServer::start().await;
        let client = WeatherClient::new("k", &server.uri());

        let err = client.overview(91.0, 0.0, None).await.unwrap_err();
        assert_eq!(err.to_string(), "latitude must be between -90 and 90");
        let err = client.overview(0.0, -180.5, None).await.unwrap_err();
        assert_eq!(err.to_string(), "longitude must be between -180 and 180");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_key_is_rejected() {
        let client = WeatherClient::new("", "http://127.0.0.1:9");
        let err = client.hourly(0.0, 0.0).await.unwrap_err();
        assert!(err.is_invalid_request());
        assert_eq!(err.to_string(), "appid or API Key is required");
    }

    #[tokio::test]
    async fn error_body_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall/day_summary"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "cod": 401, "message": "Invalid API key", "parameters": []
            })))
            .mount(&server)
            .await;
        let client = WeatherClient::new("bad", &server.uri());

        let err = client.day_summary(1.0, 1.0, "2025-04-04").await.unwrap_err();
        assert_matches!(err, ContentError::Api { status: 401, ref message, .. } if message.contains("Invalid API key"));
    }

    #[tokio::test]
    async fn empty_date_is_rejected() {
        let client = WeatherClient::new("k", "http://127.0.0.1:9");
        let err = client.day_summary(1.0, 1.0, "").await.unwrap_err();
        assert_eq!(err.to_string(), "date is required");
    }
}
