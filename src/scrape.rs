use std::time::Duration;

use chromiumoxide::Page;
use tracing::debug;

use crate::browser::{BrowserError, BrowserSession};
use crate::models::PageExtract;

// ── Constants ────────────────────────────────────────────────────────────────

/// Upper bound on the whole navigate-and-settle phase.
const NAV_TIMEOUT: Duration = Duration::from_secs(30);

/// Budget for the in-page idle poll; shorter than `NAV_TIMEOUT` so the poll
/// reports back before the outer deadline cuts the CDP call off.
const NETWORK_IDLE_BUDGET: Duration = Duration::from_secs(25);

/// The page counts as settled after this long with no meaningful network
/// activity.
const NETWORK_IDLE_MS: u64 = 500;

/// Completed fetches tolerated inside one idle window.
const NETWORK_IDLE_MAX_BUSY: u64 = 2;

/// Sampling interval for the in-page idle check.
const NETWORK_IDLE_POLL_MS: u64 = 100;

/// Extraction routine evaluated inside the loaded document. Selectors are
/// fixed to one page shape; a card missing price, stock, or rating throws,
/// which fails the whole request.
const EXTRACT_SCRIPT: &str = r#"(() => {
    const cards = Array.from(document.querySelectorAll('article.product_pod'));
    const heading = document.querySelector('.page-header h1');
    const book_name = heading ? heading.textContent.trim() : null;

    const books = cards.map((card) => {
        const title = card.querySelector('h3 a').getAttribute('title');
        const price = card.querySelector('.price_color').textContent.trim();
        const stock = card.querySelector('.instock.availability').textContent.trim();
        const rating = card.querySelector('.star-rating').classList[1];
        return { title, price, stock, rating };
    });

    return { book_name, books };
})()"#;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("navigation did not settle within {0:?}")]
    Timeout(Duration),

    #[error("extraction failed: {0}")]
    Extraction(String),
}

impl ScrapeError {
    /// Stable discriminator surfaced in the error response body.
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Browser(_) => "launch",
            ScrapeError::Navigation(_) => "navigation",
            ScrapeError::Timeout(_) => "timeout",
            ScrapeError::Extraction(_) => "extraction",
        }
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Run one full scrape cycle against a fresh browser instance.
pub async fn scrape_page(url: &str) -> Result<PageExtract, ScrapeError> {
    let session = BrowserSession::launch().await?;
    // Tear down on both paths so a failed scrape never strands a browser
    // process.
    let result = scrape_in_session(&session, url).await;
    session.shutdown().await;
    result
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

async fn scrape_in_session(
    session: &BrowserSession,
    url: &str,
) -> Result<PageExtract, ScrapeError> {
    let page = session.new_page().await?;

    tokio::time::timeout(NAV_TIMEOUT, navigate_and_settle(&page, url))
        .await
        .map_err(|_| ScrapeError::Timeout(NAV_TIMEOUT))??;

    let extract = page
        .evaluate(EXTRACT_SCRIPT)
        .await
        .map_err(|e| ScrapeError::Extraction(e.to_string()))?
        .into_value::<PageExtract>()
        .map_err(|e| ScrapeError::Extraction(e.to_string()))?;

    debug!(books = extract.books.len(), "extraction finished");
    Ok(extract)
}

async fn navigate_and_settle(page: &Page, url: &str) -> Result<(), ScrapeError> {
    page.goto(url)
        .await
        .map_err(|e| ScrapeError::Navigation(e.to_string()))?;

    // Best effort; the idle heuristic below gates actual readiness.
    let _ = page.wait_for_navigation().await;

    wait_for_network_idle(page).await
}

/// In-page network-idle heuristic: a window of `NETWORK_IDLE_MS` during which
/// the document is complete and at most `NETWORK_IDLE_MAX_BUSY` new
/// resource-timing entries appeared. Resource timing only records completed
/// fetches, so sustained quiet in the entry log stands in for a ceiling on
/// in-flight connections.
async fn wait_for_network_idle(page: &Page) -> Result<(), ScrapeError> {
    let script = format!(
        r#"(async () => {{
            const budgetMs = {budget_ms};
            const idleMs = {idle_ms};
            const maxBusy = {max_busy};
            const intervalMs = {interval_ms};

            const entries = () => performance.getEntriesByType('resource').length;

            const start = Date.now();
            let windowStart = start;
            let windowBase = entries();

            while (Date.now() - start < budgetMs) {{
                await new Promise((resolve) => setTimeout(resolve, intervalMs));
                const current = entries();
                if (document.readyState !== 'complete' || current - windowBase > maxBusy) {{
                    windowStart = Date.now();
                    windowBase = current;
                }} else if (Date.now() - windowStart >= idleMs) {{
                    return true;
                }}
            }}
            return false;
        }})()"#,
        budget_ms = NETWORK_IDLE_BUDGET.as_millis(),
        idle_ms = NETWORK_IDLE_MS,
        max_busy = NETWORK_IDLE_MAX_BUSY,
        interval_ms = NETWORK_IDLE_POLL_MS,
    );

    let settled = page
        .evaluate(script)
        .await
        .map_err(|e| ScrapeError::Navigation(e.to_string()))?
        .into_value::<bool>()
        .map_err(|e| ScrapeError::Navigation(e.to_string()))?;

    if !settled {
        return Err(ScrapeError::Timeout(NAV_TIMEOUT));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(
            ScrapeError::Browser(BrowserError::Launch("boom".into())).kind(),
            "launch"
        );
        assert_eq!(ScrapeError::Navigation("refused".into()).kind(), "navigation");
        assert_eq!(ScrapeError::Timeout(NAV_TIMEOUT).kind(), "timeout");
        assert_eq!(ScrapeError::Extraction("bad card".into()).kind(), "extraction");
    }

    #[test]
    fn extraction_script_targets_the_fixed_page_shape() {
        for selector in [
            "article.product_pod",
            ".page-header h1",
            ".price_color",
            ".instock.availability",
            ".star-rating",
        ] {
            assert!(EXTRACT_SCRIPT.contains(selector), "missing {selector}");
        }
    }
}
