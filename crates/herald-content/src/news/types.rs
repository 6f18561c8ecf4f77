use serde::{Deserialize, Serialize};

/// Categories NewsAPI accepts for top headlines.
pub const CATEGORIES: [&str; 7] = [
    "business",
    "entertainment",
    "general",
    "health",
    "science",
    "sports",
    "technology",
];

/// Query for `/v2/top-headlines`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TopHeadlinesRequest {
    /// One of [`CATEGORIES`]; empty for all.
    pub category: String,
    /// Results per page. Outside 1..=100 falls back to 20.
    pub page_size: u32,
    /// Page number, 1-based. Below 1 falls back to 1.
    pub page: u32,
}

impl TopHeadlinesRequest {
    /// The first ten headlines for `category`.
    pub fn top_ten(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            page_size: 10,
            page: 1,
        }
    }

    pub(crate) fn effective_page_size(&self) -> u32 {
        if (1..=100).contains(&self.page_size) {
            self.page_size
        } else {
            20
        }
    }

    pub(crate) fn effective_page(&self) -> u32 {
        self.page.max(1)
    }
}

/// Where an article came from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleSource {
    /// Source id, when NewsAPI knows it.
    pub id: Option<String>,
    /// Display name.
    pub name: String,
}

/// One headline.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Article {
    /// Publisher.
    pub source: ArticleSource,
    /// Byline.
    pub author: Option<String>,
    /// Headline.
    pub title: String,
    /// Short summary.
    pub description: Option<String>,
    /// Link to the full article.
    pub url: String,
    /// Lead image.
    pub url_to_image: Option<String>,
    /// RFC 3339 publication time.
    pub published_at: Option<String>,
    /// Truncated body.
    pub content: Option<String>,
}

/// Response envelope for NewsAPI endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewsResponse {
    /// `"ok"` or `"error"`.
    pub status: String,
    /// Total matches.
    pub total_results: u32,
    /// Headlines on this page.
    pub articles: Vec<Article>,
    /// Error code when `status == "error"`.
    pub code: Option<String>,
    /// Error message when `status == "error"`.
    pub message: Option<String>,
}

impl NewsResponse {
    /// Whether NewsAPI reported success.
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
