//! NewsAPI top headlines and the headline digest message.

mod client;
mod format;
mod prompt;
mod types;

pub use client::{DEFAULT_BASE_URL, NewsClient};
pub use format::{format_headlines, headline_digest};
pub use prompt::{NewsType, summaries_prompt};
pub(crate) use prompt::formatting_instructions;
pub use types::{Article, ArticleSource, CATEGORIES, NewsResponse, TopHeadlinesRequest};
