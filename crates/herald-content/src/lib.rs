//! # herald-content
//!
//! Content providers and the formatters that turn their data into chat
//! message bodies.
//!
//! - [`news`]: NewsAPI top headlines and the headline digest
//! - [`weather`]: OpenWeather One Call 3.0 and the daily forecast message
//! - [`llm`]: chat-completions summarizer behind the [`Summarizer`] trait
//!
//! Everything here is request/response glue. Bodies are fully rendered
//! before they reach the broadcast dispatcher.

#![deny(unsafe_code)]

pub mod errors;
pub mod llm;
pub mod news;
pub mod weather;

mod http;

pub use errors::{ContentError, Result};
pub use llm::{OpenAiClient, OpenAiConfig, Summarizer};
pub use news::{NewsClient, NewsType};
pub use weather::{ReportType, WeatherAggregate, WeatherClient};
