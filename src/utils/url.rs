// src/utils/url.rs

//! URL manipulation utilities.

use chrono::NaiveDate;
use url::Url;

/// Resolve a potentially relative link against the page URL.
///
/// Returns `None` for links that never point at an article
/// (empty, in-page anchors, `javascript:` and `mailto:`).
///
/// # Examples
/// ```
/// use newswire::utils::url::resolve_link;
///
/// let base = url::Url::parse("https://example.com/en-gb/").unwrap();
/// assert_eq!(
///     resolve_link(&base, "/articles/abc/"),
///     Some("https://example.com/articles/abc/".to_string())
/// );
/// ```
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let resolved = base.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

/// Extract a `/YYYY/MM/DD/` date from a URL path.
///
/// Only the path is searched; the first run of three segments that forms a
/// real calendar date wins.
///
/// # Examples
/// ```
/// use newswire::utils::url::extract_url_date;
///
/// let date = extract_url_date("https://example.com/2024/06/05/article-name");
/// assert_eq!(date, chrono::NaiveDate::from_ymd_opt(2024, 6, 5));
/// ```
pub fn extract_url_date(url: &str) -> Option<NaiveDate> {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    let segments: Vec<&str> = path.split('/').collect();

    segments.windows(3).find_map(|w| {
        let year = numeric_segment(w[0], 4, 4)?;
        let month = numeric_segment(w[1], 1, 2)?;
        let day = numeric_segment(w[2], 1, 2)?;
        NaiveDate::from_ymd_opt(year as i32, month, day)
    })
}

fn numeric_segment(segment: &str, min_len: usize, max_len: usize) -> Option<u32> {
    let len = segment.len();
    if len < min_len || len > max_len || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/en-gb/").unwrap()
    }

    #[test]
    fn test_resolve_absolute_url() {
        assert_eq!(
            resolve_link(&base(), "https://other.com/page"),
            Some("https://other.com/page".to_string())
        );
    }

    #[test]
    fn test_resolve_absolute_path() {
        assert_eq!(
            resolve_link(&base(), "/root.html"),
            Some("https://example.com/root.html".to_string())
        );
    }

    #[test]
    fn test_resolve_relative_path() {
        assert_eq!(
            resolve_link(&base(), "page.html"),
            Some("https://example.com/en-gb/page.html".to_string())
        );
    }

    #[test]
    fn test_resolve_rejects_non_article_links() {
        assert_eq!(resolve_link(&base(), ""), None);
        assert_eq!(resolve_link(&base(), "#top"), None);
        assert_eq!(resolve_link(&base(), "javascript:void(0)"), None);
        assert_eq!(resolve_link(&base(), "mailto:news@example.com"), None);
    }

    #[test]
    fn test_extract_url_date() {
        assert_eq!(
            extract_url_date("https://example.com/2024/06/05/article-name"),
            NaiveDate::from_ymd_opt(2024, 6, 5)
        );
        assert_eq!(
            extract_url_date("https://example.com/news/2023/3/12/"),
            NaiveDate::from_ymd_opt(2023, 3, 12)
        );
    }

    #[test]
    fn test_extract_url_date_rejects_impossible_dates() {
        assert_eq!(extract_url_date("https://example.com/2024/13/45/x"), None);
        assert_eq!(
            extract_url_date("https://example.com/2024/13/45/2024/02/29/x"),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
    }

    #[test]
    fn test_extract_url_date_ignores_query_and_partial_fragments() {
        assert_eq!(extract_url_date("https://example.com/a?d=/2024/06/05/"), None);
        assert_eq!(extract_url_date("https://example.com/2024/06/article"), None);
        assert_eq!(extract_url_date("https://example.com/2024/06/051/x"), None);
    }
}
