use url::Url;

/// Fallback title when the page has none or title extraction failed
pub const NO_TITLE_PLACEHOLDER: &str = "No title available";

/// Fallback body when no heading/paragraph text could be extracted
pub const NO_CONTENT_PLACEHOLDER: &str = "No readable content could be extracted from this page.";

/// Best-effort structured data extracted from a page
///
/// Each field is extracted independently: a missing title does not prevent
/// the body text or the cover image from being extracted.
#[derive(Debug, Clone)]
pub struct ScrapedPage {
    pub title: Option<String>,
    pub content: String,
    /// Already resolved to an absolute, non-`blob:` URL, or absent
    pub image_url: Option<Url>,
}

/// Why a scrape produced no page data
///
/// A failed scrape is data, not an error: callers get placeholder title and
/// content for the failure and ingestion continues with degraded values.
/// Keeping the reason as its own variant (rather than baking sentinel strings
/// into a `ScrapedPage`) means callers cannot mistake a failure placeholder
/// for real page content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeFailure {
    /// Navigation did not complete within the timeout budget
    NavigationTimeout,
    /// The site could not be reached (network error, DNS, blocked request)
    NavigationFailed(String),
    /// The connection dropped while the page body was being read
    PageClosed,
    /// The site detached/terminated the session, typical of anti-scraping defenses
    Blocked,
    /// Anything else, with the error text
    Other(String),
}

impl ScrapeFailure {
    pub fn placeholder_title(&self) -> &'static str {
        match self {
            ScrapeFailure::NavigationTimeout | ScrapeFailure::NavigationFailed(_) => {
                "Navigation Failed"
            }
            ScrapeFailure::PageClosed => "Page Closed Unexpectedly",
            ScrapeFailure::Blocked => "Scraping Blocked",
            ScrapeFailure::Other(_) => "Scraping Failed",
        }
    }

    pub fn placeholder_content(&self) -> String {
        match self {
            ScrapeFailure::NavigationTimeout => {
                "Navigation to the page timed out before it could be loaded.".to_string()
            }
            ScrapeFailure::NavigationFailed(reason) => {
                format!("The page could not be reached: {}", reason)
            }
            ScrapeFailure::PageClosed => {
                "The page closed before its content could be read.".to_string()
            }
            ScrapeFailure::Blocked => {
                "The page ended the session before its content could be read, \
                 likely due to anti-scraping measures."
                    .to_string()
            }
            ScrapeFailure::Other(message) => {
                format!("An unexpected error occurred while scraping: {}", message)
            }
        }
    }
}

/// Result of a scrape attempt: real page data or a classified failure
///
/// There is intentionally no `Err` side, scraping never aborts ingestion.
#[derive(Debug, Clone)]
pub enum ScrapeOutcome {
    Scraped(ScrapedPage),
    Degraded(ScrapeFailure),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_and_network_failures_share_the_navigation_sentinel_title() {
        assert_eq!(
            ScrapeFailure::NavigationTimeout.placeholder_title(),
            "Navigation Failed"
        );
        assert_eq!(
            ScrapeFailure::NavigationFailed("dns error".into()).placeholder_title(),
            "Navigation Failed"
        );
    }

    #[test]
    fn each_failure_kind_has_a_descriptive_placeholder() {
        let failure = ScrapeFailure::Other("boom".into());
        assert!(failure.placeholder_content().contains("boom"));

        let failure = ScrapeFailure::NavigationFailed("connection refused".into());
        assert!(failure.placeholder_content().contains("connection refused"));

        assert_eq!(
            ScrapeFailure::PageClosed.placeholder_title(),
            "Page Closed Unexpectedly"
        );
    }
}
