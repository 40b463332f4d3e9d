//! Article records flowing through one poll cycle.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// An article extracted from the page, before date resolution.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ArticleCandidate {
    /// Trimmed title text
    pub title: String,

    /// Absolute article URL
    pub url: String,

    /// Text (or `datetime` attribute) of the date element, if one was found
    pub raw_date: Option<String>,

    /// Date embedded in the URL path as `/YYYY/MM/DD/`
    pub url_date: Option<NaiveDate>,

    /// Category or tag label, if the listing shows one
    pub category: Option<String>,
}

impl ArticleCandidate {
    /// Stable identifier used for history lookups.
    ///
    /// The URL without its fragment and without a trailing slash on
    /// non-root paths.
    pub fn id(&self) -> String {
        match url::Url::parse(&self.url) {
            Ok(mut parsed) => {
                parsed.set_fragment(None);
                let path = parsed.path().to_string();
                if path.len() > 1 && path.ends_with('/') {
                    parsed.set_path(path.trim_end_matches('/'));
                }
                parsed.to_string()
            }
            Err(_) => self.url.trim().to_string(),
        }
    }
}

/// How a publish date was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateConfidence {
    /// Parsed from a date element on the page
    ConfirmedElement,
    /// Parsed from the article URL
    ConfirmedUrl,
    /// No signal; today was assumed
    AssumedToday,
    /// No signal and assuming was not allowed
    Unknown,
}

impl DateConfidence {
    /// Whether the date came from an actual signal.
    pub fn is_confirmed(self) -> bool {
        matches!(self, Self::ConfirmedElement | Self::ConfirmedUrl)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConfirmedElement => "confirmed-element",
            Self::ConfirmedUrl => "confirmed-url",
            Self::AssumedToday => "assumed-today",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DateConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate with its best-effort publish date.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResolvedArticle {
    #[serde(flatten)]
    pub candidate: ArticleCandidate,

    /// Resolved publish date, `None` when unknown
    pub date: Option<NaiveDate>,

    /// Which strategy produced `date`
    pub confidence: DateConfidence,
}

impl ResolvedArticle {
    pub fn id(&self) -> String {
        self.candidate.id()
    }

    pub fn title(&self) -> &str {
        &self.candidate.title
    }

    pub fn url(&self) -> &str {
        &self.candidate.url
    }

    /// Format the article for display using a template.
    ///
    /// Supported placeholders:
    /// - `{title}`, `{url}`, `{category}`
    /// - `{date}` (ISO date or `unknown`), `{confidence}`
    pub fn format(&self, template: &str) -> String {
        let date = self
            .date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        template
            .replace("{title}", &self.candidate.title)
            .replace("{url}", &self.candidate.url)
            .replace("{category}", self.candidate.category.as_deref().unwrap_or(""))
            .replace("{date}", &date)
            .replace("{confidence}", self.confidence.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(url: &str) -> ArticleCandidate {
        ArticleCandidate {
            title: "Test Title".to_string(),
            url: url.to_string(),
            raw_date: None,
            url_date: None,
            category: Some("Warhammer 40,000".to_string()),
        }
    }

    #[test]
    fn test_id_strips_fragment_and_trailing_slash() {
        assert_eq!(
            candidate("https://example.com/articles/abc/#comments").id(),
            "https://example.com/articles/abc"
        );
        assert_eq!(
            candidate("https://example.com/").id(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_id_keeps_query() {
        assert_eq!(
            candidate("https://example.com/view?id=7").id(),
            "https://example.com/view?id=7"
        );
    }

    #[test]
    fn test_format() {
        let article = ResolvedArticle {
            candidate: candidate("https://example.com/a"),
            date: NaiveDate::from_ymd_opt(2024, 6, 5),
            confidence: DateConfidence::ConfirmedElement,
        };
        assert_eq!(
            article.format("[{category}] {title} ({date}, {confidence})"),
            "[Warhammer 40,000] Test Title (2024-06-05, confirmed-element)"
        );
    }

    #[test]
    fn test_confidence_serializes_kebab_case() {
        let json = serde_json::to_string(&DateConfidence::AssumedToday).unwrap();
        assert_eq!(json, "\"assumed-today\"");
        assert!(DateConfidence::ConfirmedUrl.is_confirmed());
        assert!(!DateConfidence::Unknown.is_confirmed());
    }
}
