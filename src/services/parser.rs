// src/services/parser.rs

//! Page parser.
//!
//! Turns the homepage HTML into article candidates using the configured
//! CSS selector chains. Structure changes on the site degrade to fewer (or
//! zero) candidates, never to an error.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ArticleCandidate, SelectorConfig};
use crate::utils::normalize_whitespace;
use crate::utils::url::{extract_url_date, resolve_link};

/// Compiled selectors for article extraction.
#[derive(Debug, Clone)]
pub struct ArticleParser {
    containers: Vec<Selector>,
    fallback_containers: Vec<Selector>,
    title: Selector,
    link: Selector,
    date: Selector,
    category: Selector,
    anchor: Selector,
    fallback_link_patterns: Vec<String>,
}

impl ArticleParser {
    /// Compile the selector configuration.
    pub fn new(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            containers: Self::parse_selectors(&config.containers)?,
            fallback_containers: Self::parse_selectors(&config.fallback_containers)?,
            title: Self::parse_selector(&config.title)?,
            link: Self::parse_selector(&config.link)?,
            date: Self::parse_selector(&config.date)?,
            category: Self::parse_selector(&config.category)?,
            anchor: Self::parse_selector("a[href]")?,
            fallback_link_patterns: config.fallback_link_patterns.clone(),
        })
    }

    /// Extract candidates in document order.
    pub fn parse(&self, html: &str, base_url: &Url) -> Vec<ArticleCandidate> {
        if html.trim().is_empty() {
            log::warn!("Empty document from {}", base_url);
            return Vec::new();
        }

        let document = Html::parse_document(html);

        let Some(containers) = self.select_containers(&document) else {
            log::warn!(
                "No article containers matched on {}, scanning bare links",
                base_url
            );
            return self.parse_bare_links(&document, base_url);
        };

        let total = containers.len();
        let candidates: Vec<ArticleCandidate> = containers
            .iter()
            .filter_map(|container| self.parse_container(container, base_url))
            .collect();

        if candidates.len() < total {
            log::debug!(
                "Skipped {} of {} containers without a usable title or link",
                total - candidates.len(),
                total
            );
        }
        candidates
    }

    /// First selector (primary list, then fallback list) with any match wins.
    fn select_containers<'a>(&self, document: &'a Html) -> Option<Vec<ElementRef<'a>>> {
        self.containers
            .iter()
            .chain(self.fallback_containers.iter())
            .map(|sel| document.select(sel).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
    }

    fn parse_container(&self, container: &ElementRef, base_url: &Url) -> Option<ArticleCandidate> {
        let title_elem = container.select(&self.title).next();

        let link_elem = container
            .select(&self.link)
            .next()
            .or_else(|| title_elem.and_then(|t| Self::own_anchor(t, &self.anchor)))
            .or_else(|| Self::own_anchor(*container, &self.anchor));

        let Some(link_elem) = link_elem else {
            log::debug!("Skipping container without link");
            return None;
        };

        let href = link_elem.value().attr("href").unwrap_or("");
        let url = resolve_link(base_url, href)?;

        let title = title_elem
            .map(Self::text_of)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| Self::text_of(link_elem));
        if title.is_empty() {
            log::debug!("Skipping {} without title", url);
            return None;
        }

        let raw_date = container
            .select(&self.date)
            .next()
            .and_then(Self::date_signal);

        let category = container
            .select(&self.category)
            .next()
            .map(Self::text_of)
            .filter(|c| !c.is_empty());

        Some(ArticleCandidate {
            title,
            url_date: extract_url_date(&url),
            url,
            raw_date,
            category,
        })
    }

    /// Last resort: any link whose href looks like an article.
    fn parse_bare_links(&self, document: &Html, base_url: &Url) -> Vec<ArticleCandidate> {
        document
            .select(&self.anchor)
            .filter_map(|link| {
                let href = link.value().attr("href")?;
                if !self
                    .fallback_link_patterns
                    .iter()
                    .any(|pattern| href.contains(pattern.as_str()))
                {
                    return None;
                }

                let title = Self::text_of(link);
                if title.is_empty() {
                    return None;
                }

                let url = resolve_link(base_url, href)?;
                Some(ArticleCandidate {
                    title,
                    url_date: extract_url_date(&url),
                    url,
                    raw_date: None,
                    category: None,
                })
            })
            .collect()
    }

    /// The element itself when it is a link, else its first link.
    fn own_anchor<'a>(elem: ElementRef<'a>, anchor: &Selector) -> Option<ElementRef<'a>> {
        if elem.value().name() == "a" && elem.value().attr("href").is_some() {
            return Some(elem);
        }
        elem.select(anchor).next()
    }

    /// Prefer a machine-readable `datetime` attribute over the visible text.
    fn date_signal(elem: ElementRef) -> Option<String> {
        elem.value()
            .attr("datetime")
            .map(normalize_whitespace)
            .filter(|d| !d.is_empty())
            .or_else(|| Some(Self::text_of(elem)).filter(|d| !d.is_empty()))
    }

    fn text_of(elem: ElementRef) -> String {
        normalize_whitespace(&elem.text().collect::<String>())
    }

    fn parse_selectors(list: &[String]) -> Result<Vec<Selector>> {
        list.iter().map(|s| Self::parse_selector(s)).collect()
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}
