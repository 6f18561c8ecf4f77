use std::fmt::Write as _;

use chrono::DateTime;

use super::types::Article;

/// Header plus one block per article. This is also what the LLM analyses.
pub fn headline_digest(category: &str, articles: &[Article]) -> String {
    let mut out = format!("📰 *TOP {} NEWS TODAY* 📰\n\n", category.to_uppercase());

    for (i, article) in articles.iter().enumerate() {
        let _ = writeln!(out, "*{}. {}*", i + 1, article.title);
        let _ = writeln!(out, "📄 *Source:* {}", article.source.name);

        if let Some(author) = non_empty(article.author.as_deref()) {
            let _ = writeln!(out, "✍️ *Author:* {author}");
        }
        if let Some(published) = non_empty(article.published_at.as_deref()) {
            let _ = writeln!(out, "📅 *Published:* {}", format_published(published));
        }
        if let Some(description) = non_empty(article.description.as_deref()) {
            let _ = writeln!(out, "📝 *Summary:* {description}");
        }
        let _ = write!(out, "🔗 *Read more:* {}\n\n", article.url);
    }
    out
}

/// Render the full headline message.
///
/// `summary` is the optional LLM analysis appended before the footer.
pub fn format_headlines(category: &str, articles: &[Article], summary: Option<&str>) -> String {
    let mut out = headline_digest(category, articles);
    if let Some(summary) = summary {
        let _ = write!(out, "🤖 *AI Summaries:*\n{summary}\n\n");
    }
    out.push_str("Powered by NewsAPI");
    out
}

/// `04 Apr 2025, 14:19`, or the raw value when it is not RFC 3339.
fn format_published(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.format("%d %b %Y, %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_owned())
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
