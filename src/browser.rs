//! Headless Chromium lifecycle for a single scrape.
//!
//! Every request gets its own browser process; the session is created at the
//! start of the pipeline and shut down on every exit path.

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("browser configuration failed: {0}")]
    Config(String),

    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("page creation failed: {0}")]
    Page(String),
}

/// A launched browser plus the task draining its CDP event stream.
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// Launch a fresh headless Chromium instance. The executable is located
    /// by chromiumoxide's standard detection; a missing binary surfaces here.
    pub async fn launch() -> Result<Self, BrowserError> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .build()
            .map_err(BrowserError::Config)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The websocket handler must be polled for the browser to make
        // progress; it ends when the browser process goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        debug!("browser session launched");
        Ok(Self {
            browser,
            handler_task,
        })
    }

    pub async fn new_page(&self) -> Result<Page, BrowserError> {
        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Page(e.to_string()))
    }

    /// Close the browser and stop the event task. Callers run this on both
    /// the success and failure paths so a failed scrape never strands a
    /// Chromium process.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("browser close failed: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        debug!("browser session closed");
    }
}
