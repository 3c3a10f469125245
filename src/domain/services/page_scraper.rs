use std::time::Duration;

use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

use crate::configuration::ScraperSettings;
use crate::domain::entities::scraped_page::{
    ScrapeFailure, ScrapeOutcome, ScrapedPage, NO_CONTENT_PLACEHOLDER,
};
use crate::helper::error_chain_fmt;

/// Ordered probe list for the page's cover image: a CSS selector and the
/// attribute carrying the image reference. The first probe with a present,
/// non-empty value wins; later entries are not consulted.
const IMAGE_PROBES: &[(&str, &str)] = &[
    (r#"meta[property="og:image"]"#, "content"),
    (r#"meta[name="twitter:image"]"#, "content"),
    (r#"meta[property="og:image:secure_url"]"#, "content"),
    (r#"meta[itemprop="image"]"#, "content"),
    (r#"link[rel="image_src"]"#, "href"),
    (r#"link[rel="icon"]"#, "href"),
];

/// Service producing best-effort structured page data from a URL
///
/// One HTTP client is built at startup and shared; each `scrape` call owns its
/// request/response pair end-to-end, nothing is held across invocations.
pub struct PageScraperService {
    client: reqwest::Client,
}

impl PageScraperService {
    pub fn try_new(settings: &ScraperSettings) -> Result<Self, PageScraperServiceError> {
        let client = reqwest::Client::builder()
            // Some sites serve an empty shell or block outright on unknown agents
            .user_agent(settings.user_agent.clone())
            // Generous budget to tolerate slow or defensive sites
            .timeout(Duration::from_secs(settings.navigation_timeout_seconds))
            .build()?;

        Ok(Self { client })
    }

    /// Scrapes a page into `{title, content, image}` data
    ///
    /// Never fails: every failure path is classified into a `Degraded` outcome
    /// so callers always get a best-effort page summary.
    #[tracing::instrument(name = "Scraping page", skip(self))]
    pub async fn scrape(&self, url: &Url) -> ScrapeOutcome {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(?error, %url, "Navigation failed");
                return ScrapeOutcome::Degraded(classify_navigation_error(&error));
            }
        };

        if let Err(error) = response.error_for_status_ref() {
            warn!(?error, %url, "Page responded with an error status");
            return ScrapeOutcome::Degraded(ScrapeFailure::NavigationFailed(format!(
                "the page responded with status {}",
                response.status()
            )));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(error) => {
                warn!(?error, %url, "Page body could not be read");
                return ScrapeOutcome::Degraded(classify_body_error(&error));
            }
        };

        ScrapeOutcome::Scraped(extract_page(&body, url))
    }
}

/// Classifies a failed navigation by error kind, falling back to message
/// substrings for errors reqwest does not expose a kind for.
fn classify_navigation_error(error: &reqwest::Error) -> ScrapeFailure {
    let message = error_message_chain(error);

    if error.is_timeout() || message.contains("timeout") {
        ScrapeFailure::NavigationTimeout
    } else if message.contains("detached") {
        ScrapeFailure::Blocked
    } else if error.is_connect() || error.is_request() {
        ScrapeFailure::NavigationFailed(message)
    } else {
        ScrapeFailure::Other(message)
    }
}

/// A body-read failure means navigation succeeded but the connection went away
/// under us, unless it was simply the overall timeout expiring.
fn classify_body_error(error: &reqwest::Error) -> ScrapeFailure {
    let message = error_message_chain(error);

    if error.is_timeout() || message.contains("timeout") {
        ScrapeFailure::NavigationTimeout
    } else if message.contains("detached") {
        ScrapeFailure::Blocked
    } else {
        ScrapeFailure::PageClosed
    }
}

/// Lower-cased message including the error's causes, for substring matching
fn error_message_chain(error: &reqwest::Error) -> String {
    use std::error::Error;

    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message.to_lowercase()
}

/// Extracts the structured fields out of a fetched HTML document.
///
/// Each field has isolated failure handling: a page without a title still gets
/// its body text and cover image extracted.
fn extract_page(html: &str, page_url: &Url) -> ScrapedPage {
    let document = Html::parse_document(html);

    let content = extract_body_text(&document);

    ScrapedPage {
        title: extract_title(&document),
        image_url: extract_cover_image(&document, page_url),
        content: if content.is_empty() {
            NO_CONTENT_PLACEHOLDER.to_string()
        } else {
            content
        },
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let title = document.select(&selector).next()?;
    let title = collapse_whitespace(&title.text().collect::<String>());

    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Probes the metadata selectors in order and resolves the first present value
/// to an absolute URL against the page URL.
///
/// The resolved URL is discarded if it is invalid or carries a transient
/// local-reference scheme (`blob:`), which would be unreachable once persisted.
fn extract_cover_image(document: &Html, page_url: &Url) -> Option<Url> {
    let raw = IMAGE_PROBES.iter().find_map(|(selector, attribute)| {
        let selector = Selector::parse(selector).ok()?;
        let value = document.select(&selector).next()?.value().attr(attribute)?;
        let value = value.trim();

        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    })?;

    let resolved = page_url.join(&raw).ok()?;
    if resolved.scheme() == "blob" {
        return None;
    }

    Some(resolved)
}

/// All heading (h1-h3) text nodes in document order, then all paragraph text
/// nodes, trimmed and whitespace-joined.
fn extract_body_text(document: &Html) -> String {
    let mut parts: Vec<String> = Vec::new();

    for group in ["h1, h2, h3", "p"] {
        let Ok(selector) = Selector::parse(group) else {
            continue;
        };

        for element in document.select(&selector) {
            let text = collapse_whitespace(&element.text().collect::<String>());
            if !text.is_empty() {
                parts.push(text);
            }
        }
    }

    parts.join(" ")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(thiserror::Error)]
pub enum PageScraperServiceError {
    #[error("Error while building the scraping HTTP client: {0}")]
    ClientBuildError(#[from] reqwest::Error),
}

impl std::fmt::Debug for PageScraperServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://example.com/articles/42").unwrap()
    }

    #[test]
    fn title_and_body_are_extracted_from_a_regular_page() {
        let html = r#"
            <html>
              <head><title> A   Great
                Article </title></head>
              <body>
                <p>First paragraph.</p>
                <h1>Main heading</h1>
                <p>Second   paragraph.</p>
              </body>
            </html>"#;

        let page = extract_page(html, &page_url());

        assert_eq!(page.title.as_deref(), Some("A Great Article"));
        // Headings come first even when the document interleaves them
        assert_eq!(
            page.content,
            "Main heading First paragraph. Second paragraph."
        );
    }

    #[test]
    fn a_page_without_title_or_text_degrades_per_field() {
        let html = "<html><head></head><body><div>only divs here</div></body></html>";

        let page = extract_page(html, &page_url());

        assert_eq!(page.title, None);
        assert_eq!(page.content, NO_CONTENT_PLACEHOLDER);
        assert_eq!(page.image_url, None);
    }

    #[test]
    fn og_image_wins_over_later_probes() {
        let html = r#"
            <html><head>
              <meta name="twitter:image" content="https://cdn.example.com/twitter.png">
              <meta property="og:image" content="https://cdn.example.com/og.png">
              <link rel="icon" href="/favicon.ico">
            </head><body></body></html>"#;

        let page = extract_page(html, &page_url());

        assert_eq!(
            page.image_url.unwrap().as_str(),
            "https://cdn.example.com/og.png"
        );
    }

    #[test]
    fn favicon_is_used_as_a_last_resort_and_resolved_absolute() {
        let html = r#"<html><head><link rel="icon" href="/favicon.ico"></head></html>"#;

        let page = extract_page(html, &page_url());

        assert_eq!(
            page.image_url.unwrap().as_str(),
            "https://example.com/favicon.ico"
        );
    }

    #[test]
    fn a_blob_image_reference_is_discarded() {
        let html = r#"
            <html><head>
              <meta property="og:image" content="blob:https://example.com/51e9f0ae">
            </head></html>"#;

        let page = extract_page(html, &page_url());

        assert_eq!(page.image_url, None);
    }

    #[test]
    fn the_first_present_probe_is_authoritative_even_when_invalid() {
        // og:image is present but useless; the favicon below it must not be
        // promoted in its place
        let html = r#"
            <html><head>
              <meta property="og:image" content="blob:https://example.com/51e9f0ae">
              <link rel="icon" href="/favicon.ico">
            </head></html>"#;

        let page = extract_page(html, &page_url());

        assert_eq!(page.image_url, None);
    }

    #[test]
    fn a_relative_og_image_is_resolved_against_the_page_url() {
        let html = r#"<html><head><meta property="og:image" content="../img/cover.jpg"></head></html>"#;

        let page = extract_page(html, &page_url());

        assert_eq!(
            page.image_url.unwrap().as_str(),
            "https://example.com/img/cover.jpg"
        );
    }

    #[test]
    fn heading_levels_above_three_are_ignored() {
        let html = r#"
            <html><body>
              <h1>Kept</h1>
              <h4>Dropped</h4>
              <h5>Dropped too</h5>
            </body></html>"#;

        let page = extract_page(html, &page_url());

        assert_eq!(page.content, "Kept");
    }
}
