//! Page loading: navigate, let the page render, wait for its part data.

use std::time::{Duration, Instant};

use chromiumoxide::cdp::browser_protocol::emulation::{
    SetLocaleOverrideParams, SetTimezoneOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, NavigateParams,
};
use chromiumoxide::Page;
use scraper::Html;
use tracing::{debug, info, warn};

use super::{languages_script, BrowserEngineType, BrowserSession, STEALTH_SCRIPTS, WEBDRIVER_ON_NEW_DOCUMENT};
use crate::error::{Result, ScrapeError};
use crate::scrapers::locator::LocatorChain;

const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";
const SCROLL_TO_TOP: &str = "window.scrollTo(0, 0);";

fn browser_error(url: &str, e: impl std::fmt::Display) -> ScrapeError {
    ScrapeError::Navigation {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

/// Wait for the document to be ready, with timeout.
async fn wait_for_page_ready(page: &Page, timeout_secs: u64) {
    match tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        page.evaluate(WAIT_FOR_READY_SCRIPT.to_string()),
    )
    .await
    {
        Ok(Ok(result)) => {
            let state: String = result
                .into_value()
                .unwrap_or_else(|_| "unknown".to_string());
            debug!("Page ready state: {}", state);
        }
        Ok(Err(e)) => debug!("Could not check ready state: {}", e),
        Err(_) => warn!("Timeout waiting for page ready state"),
    }
}

/// Scroll to the bottom and back so lazy sections render.
async fn scroll_page(page: &Page, pause: Duration) {
    for script in [SCROLL_TO_BOTTOM, SCROLL_TO_TOP] {
        if let Err(e) = page.evaluate(script.to_string()).await {
            debug!("Scroll skipped: {}", e);
        }
        tokio::time::sleep(pause).await;
    }
}

/// Re-read the DOM until `ready` resolves or the timeout passes. The last
/// snapshot is returned either way; a miss is left to the locator chains.
async fn wait_for_chain(
    page: &Page,
    url: &str,
    ready: &LocatorChain,
    timeout: Duration,
    poll: Duration,
) -> Result<String> {
    let started = Instant::now();
    loop {
        let content = page.content().await.map_err(|e| browser_error(url, e))?;
        let resolved = ready.is_empty() || ready.resolves(&Html::parse_document(&content));
        if resolved {
            debug!("Ready locators resolved after {:?}", started.elapsed());
            return Ok(content);
        }
        if started.elapsed() >= timeout {
            warn!(
                "Ready locators did not resolve within {}s on {}",
                timeout.as_secs(),
                url
            );
            return Ok(content);
        }
        tokio::time::sleep(poll).await;
    }
}

impl BrowserSession {
    /// Load `url` in a fresh tab and return its rendered HTML.
    /// The tab is closed whether or not loading succeeds.
    pub(super) async fn load_page(&mut self, url: &str, ready: &LocatorChain) -> Result<String> {
        self.start().await?;
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| ScrapeError::Browser("browser session is not running".to_string()))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Browser(format!("Failed to open tab: {}", e)))?;

        let result = self.render(&page, url, ready).await;

        let _ = page.close().await;
        result
    }

    async fn render(&self, page: &Page, url: &str, ready: &LocatorChain) -> Result<String> {
        self.prepare(page, url).await?;
        self.navigate(page, url).await?;

        wait_for_page_ready(page, self.config.timeout).await;
        tokio::time::sleep(Duration::from_millis(self.page.settle_delay_ms)).await;

        if self.config.engine == BrowserEngineType::Stealth {
            self.apply_stealth(page).await;
        }

        if self.page.scroll {
            scroll_page(page, Duration::from_millis(self.page.scroll_pause_ms)).await;
        }

        let content = wait_for_chain(
            page,
            url,
            ready,
            Duration::from_secs(self.page.locate_timeout_secs),
            Duration::from_millis(self.page.poll_interval_ms.max(50)),
        )
        .await?;

        if let Some(reason) = self.page.page_problem(&content) {
            warn!("Unusable page at {}: {}", url, reason);
            return Err(ScrapeError::ErrorPage {
                url: url.to_string(),
                reason,
            });
        }
        Ok(content)
    }

    /// Session-level overrides applied to the tab before navigation.
    async fn prepare(&self, page: &Page, url: &str) -> Result<()> {
        let mut user_agent = SetUserAgentOverrideParams::new(self.config.user_agent.clone());
        user_agent.accept_language = Some(self.config.accept_language.clone());
        page.execute(user_agent)
            .await
            .map_err(|e| browser_error(url, e))?;

        let locale = SetLocaleOverrideParams::builder()
            .locale(self.config.locale.clone())
            .build();
        if let Err(e) = page.execute(locale).await {
            debug!("Locale override skipped: {}", e);
        }

        if let Some(ref tz) = self.config.timezone {
            if let Err(e) = page.execute(SetTimezoneOverrideParams::new(tz.clone())).await {
                warn!("Timezone override {} failed: {}", tz, e);
            }
        }

        if self.config.engine == BrowserEngineType::Stealth {
            for source in [
                WEBDRIVER_ON_NEW_DOCUMENT.to_string(),
                languages_script(&self.config.locale),
            ] {
                if let Err(e) = page
                    .execute(AddScriptToEvaluateOnNewDocumentParams::new(source))
                    .await
                {
                    debug!("New-document script skipped: {}", e);
                }
            }
        }
        Ok(())
    }

    /// Navigate to a URL with timeout handling.
    async fn navigate(&self, page: &Page, url: &str) -> Result<()> {
        info!("Navigating to {}", url);
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| browser_error(url, format!("Invalid URL: {}", e)))?;

        let nav_timeout = Duration::from_secs(self.config.timeout);
        let response = tokio::time::timeout(nav_timeout, page.execute(nav_params))
            .await
            .map_err(|_| ScrapeError::Timeout {
                what: format!("navigation to {}", url),
                secs: self.config.timeout,
            })?
            .map_err(|e| browser_error(url, e))?;

        if let Some(ref error) = response.result.error_text {
            return Err(browser_error(url, error));
        }
        Ok(())
    }

    /// Best-effort stealth evasion in the loaded page.
    async fn apply_stealth(&self, page: &Page) {
        debug!("Applying stealth scripts");
        for script in STEALTH_SCRIPTS {
            if let Err(e) = page.evaluate(script.to_string()).await {
                debug!("Stealth script injection skipped: {}", e);
            }
        }
    }
}
