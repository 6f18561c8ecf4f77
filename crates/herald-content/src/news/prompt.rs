use std::fmt;
use std::str::FromStr;

use crate::errors::ContentError;

/// News categories with an LLM analysis template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NewsType {
    /// Markets and corporate news.
    Business,
    /// Technology industry.
    Technology,
    /// Research and discovery.
    Science,
    /// Everything else.
    General,
}

impl NewsType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::Technology => "technology",
            Self::Science => "science",
            Self::General => "general",
        }
    }

    fn analytical_tasks(self) -> &'static str {
        match self {
            Self::Business => {
                "4. Identify economic indicators or market signals\n\
                 5. Note corporate developments or policy changes affecting markets\n\
                 6. Analyze sector-specific performance or challenges"
            }
            Self::Technology => {
                "4. Identify emerging technologies or innovation trends\n\
                 5. Analyze competitive dynamics between tech companies or platforms\n\
                 6. Examine regulatory developments affecting technology"
            }
            Self::Science => {
                "4. Evaluate the significance of research breakthroughs\n\
                 5. Analyze potential applications of scientific developments\n\
                 6. Identify interdisciplinary implications"
            }
            Self::General => {
                "4. Identify cross-domain patterns or interconnections\n\
                 5. Highlight societal impacts across different sectors\n\
                 6. Note emerging broad trends affecting multiple areas"
            }
        }
    }

    fn sections(self) -> &'static str {
        match self {
            Self::Business => "* Market Implications\n* Sectors to Watch\n* Economic Indicators",
            Self::Technology => {
                "* Innovation Highlights\n* Tech Industry Dynamics\n* Digital Transformation Impact"
            }
            Self::Science => {
                "* Research Breakthroughs\n* Practical Applications\n* Scientific Community Developments"
            }
            Self::General => "* Cross-Sector Connections\n* Societal Impact\n* Emerging Trends",
        }
    }
}

impl fmt::Display for NewsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NewsType {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "business" => Ok(Self::Business),
            "technology" => Ok(Self::Technology),
            "science" => Ok(Self::Science),
            "general" => Ok(Self::General),
            _ => Err(ContentError::invalid(format!("invalid news type: {s}"))),
        }
    }
}

const FORMATTING_INSTRUCTIONS: &str = "IMPORTANT FORMATTING INSTRUCTIONS:
- Use WhatsApp formatting standards throughout your response
- For headers and section titles, use *asterisks for bold text*
- For emphasis within paragraphs, use _underscores for italic text_
- For lists, use proper bullet points (•) or numbers followed by periods
- For critical insights or statistics, use both *bold* and _italic_ formatting where appropriate
- When referencing specific news items, use the same formatting style as seen in the provided examples
- Make sure all key points and takeaways are formatted in *bold* for easy visibility
- Format the final takeaways section as \"*Key Takeaways:*\" followed by numbered points";

pub(crate) fn formatting_instructions() -> &'static str {
    FORMATTING_INSTRUCTIONS
}

/// Build the analyst prompt over a rendered headline digest.
pub fn summaries_prompt(news_data: &str, news_type: NewsType) -> String {
    let upper = news_type.as_str().to_uppercase();
    format!(
        "You are an expert analyst specializing in {upper}.

I'll provide you with a set of recent {upper} news headlines and summaries. Your task is to:
1. Analyze these news items and identify key patterns or trends
2. Extract actionable insights relevant to {upper}
3. Highlight potential impacts for stakeholders in this field
{tasks}

Present your analysis in a clear format under the heading \"DAILY {upper} INSIGHTS\" with the following sections:
* Key Trends Identified
{sections}
* Strategic Considerations

Here are the news items to analyze:
{news_data}

End your analysis with 2-3 key takeaways that summarize the most important insights from today's {upper} news.

{FORMATTING_INSTRUCTIONS}
",
        tasks = news_type.analytical_tasks(),
        sections = news_type.sections(),
    )
}
