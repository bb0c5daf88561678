//! Browser session for JavaScript-rendered catalog pages.
//!
//! Uses chromiumoxide (CDP). The session is launched (or attached to a remote
//! DevTools endpoint) once, with options fixed for its lifetime, and released
//! through [`PageSource::close`] on every exit path of a run.

mod config;
#[cfg(feature = "browser")]
mod fetch;
mod stealth;

pub use config::{
    default_headless, default_timeout, BrowserEngineConfig, BrowserEngineType, PageLoadConfig,
    DEFAULT_USER_AGENT,
};
pub use stealth::{languages_script, STEALTH_SCRIPTS, WEBDRIVER_ON_NEW_DOCUMENT};

#[cfg(feature = "browser")]
pub use session::BrowserSession;
#[cfg(not(feature = "browser"))]
pub use stub::BrowserSession;

#[cfg(feature = "browser")]
mod session {
    use std::path::PathBuf;
    use std::time::Duration;

    use async_trait::async_trait;
    use chromiumoxide::{Browser, BrowserConfig};
    use futures::StreamExt;
    use tokio::task::JoinHandle;
    use tracing::{debug, info};

    use super::{BrowserEngineConfig, PageLoadConfig};
    use crate::error::{Result, ScrapeError};
    use crate::scrapers::locator::LocatorChain;
    use crate::scrapers::source::PageSource;

    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &[&str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    const CHROME_COMMANDS: &[&str] = &[
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ];

    /// A live browser session.
    pub struct BrowserSession {
        pub(super) config: BrowserEngineConfig,
        pub(super) page: PageLoadConfig,
        pub(super) browser: Option<Browser>,
        handler: Option<JoinHandle<()>>,
        remote: bool,
    }

    impl BrowserSession {
        pub fn new(config: BrowserEngineConfig, page: PageLoadConfig) -> Self {
            Self {
                config,
                page,
                browser: None,
                handler: None,
                remote: false,
            }
        }

        /// Create and start a session.
        pub async fn launch(config: BrowserEngineConfig, page: PageLoadConfig) -> Result<Self> {
            let mut session = Self::new(config, page);
            session.start().await?;
            Ok(session)
        }

        /// Find a Chrome executable: configured path, well-known locations,
        /// then `PATH`.
        fn find_chrome(&self) -> Result<PathBuf> {
            if let Some(ref path) = self.config.chrome_path {
                if path.exists() {
                    return Ok(path.clone());
                }
                return Err(ScrapeError::SessionInit(format!(
                    "Configured Chrome not found: {}",
                    path.display()
                )));
            }

            for path in CHROME_PATHS {
                let p = std::path::Path::new(path);
                if p.exists() {
                    info!("Found Chrome at: {}", path);
                    return Ok(p.to_path_buf());
                }
            }

            for cmd in CHROME_COMMANDS {
                if let Ok(path) = which::which(cmd) {
                    info!("Found Chrome in PATH: {}", path.display());
                    return Ok(path);
                }
            }

            Err(ScrapeError::SessionInit(
                "Chrome/Chromium not found. Install it or set browser.chrome_path / PARTSCOUT_CHROME"
                    .to_string(),
            ))
        }

        /// Launch or connect to the browser if not already running.
        pub async fn start(&mut self) -> Result<()> {
            if self.browser.is_some() {
                return Ok(());
            }

            if let Some(remote_url) = self.config.remote_url.clone() {
                return self.connect_remote(&remote_url).await;
            }

            info!(
                "Launching browser (headless={}, {}x{}, locale={})",
                self.config.headless,
                self.config.window_width,
                self.config.window_height,
                self.config.locale
            );

            let chrome_path = self.find_chrome()?;
            let mut builder = BrowserConfig::builder()
                .chrome_executable(chrome_path)
                .window_size(self.config.window_width, self.config.window_height)
                .request_timeout(Duration::from_secs(self.config.timeout));

            // with_head means NOT headless
            if !self.config.headless {
                builder = builder.with_head();
            }

            if let Some(ref proxy) = self.config.proxy {
                builder = builder.arg(format!("--proxy-server={}", proxy));
            }

            builder = builder
                .arg(format!(
                    "--window-size={},{}",
                    self.config.window_width, self.config.window_height
                ))
                .arg(format!("--lang={}", self.config.locale))
                .arg("--disable-blink-features=AutomationControlled")
                .arg("--disable-infobars")
                .arg("--disable-dev-shm-usage")
                .arg("--no-first-run")
                .arg("--no-default-browser-check")
                .arg("--disable-background-networking")
                .arg("--disable-sync")
                .arg("--disable-translate")
                .arg("--no-sandbox")
                .arg("--disable-gpu");

            for arg in &self.config.chrome_args {
                builder = builder.arg(arg);
            }

            let config = builder.build().map_err(|e| {
                ScrapeError::SessionInit(format!("Failed to build browser config: {}", e))
            })?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| ScrapeError::SessionInit(format!("Failed to launch browser: {}", e)))?;

            self.handler = Some(tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            }));
            self.browser = Some(browser);
            self.remote = false;

            Ok(())
        }

        /// Connect to a remote Chrome instance.
        async fn connect_remote(&mut self, url: &str) -> Result<()> {
            info!("Connecting to remote browser at {}", url);

            let init = |what: &str, e: &dyn std::fmt::Display| {
                ScrapeError::SessionInit(format!("{}: {}", what, e))
            };

            // Get WebSocket URL from the /json/version endpoint
            let http_url = url
                .replace("ws://", "http://")
                .replace("wss://", "https://");
            let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

            let resp: serde_json::Value = reqwest::Client::new()
                .get(&version_url)
                .timeout(Duration::from_secs(self.config.timeout))
                .send()
                .await
                .map_err(|e| init("Failed to connect to remote browser", &e))?
                .json()
                .await
                .map_err(|e| init("Failed to parse browser version info", &e))?;

            let ws_url = resp
                .get("webSocketDebuggerUrl")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    ScrapeError::SessionInit("No webSocketDebuggerUrl in response".to_string())
                })?;

            info!("Connecting to WebSocket: {}", ws_url);

            let (browser, mut handler) = Browser::connect(ws_url)
                .await
                .map_err(|e| init("Failed to connect to remote browser", &e))?;

            self.handler = Some(tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            }));
            self.browser = Some(browser);
            self.remote = true;

            Ok(())
        }

        /// Close the browser (a remote one is only disconnected).
        pub async fn shutdown(&mut self) {
            if let Some(mut browser) = self.browser.take() {
                if !self.remote {
                    if let Err(e) = browser.close().await {
                        debug!("Browser close failed: {}", e);
                    }
                    let _ = browser.wait().await;
                }
                info!("Browser session closed");
            }
            if let Some(handler) = self.handler.take() {
                handler.abort();
            }
        }
    }

    #[async_trait(?Send)]
    impl PageSource for BrowserSession {
        async fn fetch(&mut self, url: &str, ready: &LocatorChain) -> Result<String> {
            self.load_page(url, ready).await
        }

        async fn reset(&mut self) -> Result<()> {
            self.shutdown().await;
            self.start().await
        }

        async fn close(&mut self) {
            self.shutdown().await;
        }
    }
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
mod stub {
    use async_trait::async_trait;

    use super::{BrowserEngineConfig, PageLoadConfig};
    use crate::error::{Result, ScrapeError};
    use crate::scrapers::locator::LocatorChain;
    use crate::scrapers::source::PageSource;

    const NOT_COMPILED: &str =
        "Browser support not compiled. Rebuild with: cargo build --features browser";

    pub struct BrowserSession;

    impl BrowserSession {
        pub fn new(_config: BrowserEngineConfig, _page: PageLoadConfig) -> Self {
            Self
        }

        pub async fn launch(_config: BrowserEngineConfig, _page: PageLoadConfig) -> Result<Self> {
            Err(ScrapeError::SessionInit(NOT_COMPILED.to_string()))
        }

        pub async fn start(&mut self) -> Result<()> {
            Err(ScrapeError::SessionInit(NOT_COMPILED.to_string()))
        }

        pub async fn shutdown(&mut self) {}
    }

    #[async_trait(?Send)]
    impl PageSource for BrowserSession {
        async fn fetch(&mut self, _url: &str, _ready: &LocatorChain) -> Result<String> {
            Err(ScrapeError::SessionInit(NOT_COMPILED.to_string()))
        }

        async fn reset(&mut self) -> Result<()> {
            self.start().await
        }
    }
}
