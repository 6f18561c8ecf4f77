//! OpenWeather One Call 3.0 and the daily forecast message.
//!
//! A forecast is assembled from three calls (overview, day summary and the
//! hourly block of One Call) into a [`WeatherAggregate`], then rendered
//! either around an LLM-written report or by [`format_manual`].

mod client;
mod format;
mod prompt;
mod types;

pub use client::{DEFAULT_BASE_URL, WeatherClient};
pub use format::{format_llm, format_manual};
pub use prompt::weather_prompt;
pub use types::{
    Afternoon, ApiErrorBody, DaySummary, Hourly, OneCall, Overview, Precipitation, ReportType,
    Temperature, Units, WeatherAggregate, WeatherCondition, Wind, WindMax,
};
