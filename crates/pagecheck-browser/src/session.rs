//! Chrome/Chromium session over the DevTools protocol.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{MediaFeature, SetEmulatedMediaParams};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, NavigateParams};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use pagecheck_core::config::BrowserConfig;
use pagecheck_core::error::{PagecheckError, Result};
use pagecheck_core::locator::{Candidate, Locator};
use pagecheck_core::scenario::ColorScheme;

use crate::driver::PageDriver;

/// Executable names probed on `PATH` when no `chrome_path` is configured.
const CHROME_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// A launched browser with a single page.
pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl ChromiumSession {
    /// Launch the browser and open `about:blank`.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut builder = CdpConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                ..Viewport::default()
            })
            .request_timeout(config.navigation_timeout());

        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder.build().map_err(PagecheckError::Launch)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| PagecheckError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler stopped");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(PagecheckError::Launch(format!("Failed to open page: {e}")));
            }
        };

        info!(
            headless = config.headless,
            width = config.viewport_width,
            height = config.viewport_height,
            "Browser launched"
        );

        Ok(Self {
            browser: Some(browser),
            page,
            handler,
            navigation_timeout: config.navigation_timeout(),
        })
    }
}

/// Issue the navigation and wait for the load. A browser-reported failure
/// (e.g. `net::ERR_CONNECTION_REFUSED`) is an error, not an error page.
async fn navigate(page: &Page, url: &str) -> Result<()> {
    let response = page
        .execute(NavigateParams::new(url))
        .await
        .map_err(|e| navigation_error(url, e))?;

    if let Some(error_text) = response.result.error_text.clone() {
        return Err(PagecheckError::Navigation {
            url: url.to_string(),
            reason: error_text,
        });
    }

    page.wait_for_navigation()
        .await
        .map_err(|e| navigation_error(url, e))?;
    Ok(())
}

fn navigation_error(url: &str, e: impl std::fmt::Display) -> PagecheckError {
    PagecheckError::Navigation {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl PageDriver for ChromiumSession {
    async fn emulate_color_scheme(&mut self, scheme: ColorScheme) -> Result<()> {
        let params = SetEmulatedMediaParams::builder()
            .features(vec![MediaFeature::new("prefers-color-scheme", scheme.as_str())])
            .build();
        self.page
            .execute(params)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to emulate color scheme: {e}"))?;
        debug!(scheme = scheme.as_str(), "Color scheme emulated");
        Ok(())
    }

    async fn goto(&mut self, url: &str) -> Result<()> {
        match tokio::time::timeout(self.navigation_timeout, navigate(&self.page, url)).await {
            Ok(result) => result,
            Err(_) => Err(PagecheckError::Navigation {
                url: url.to_string(),
                reason: format!(
                    "timed out after {}ms",
                    self.navigation_timeout.as_millis()
                ),
            }),
        }
    }

    async fn query(&mut self, locator: &Locator) -> Result<Vec<Candidate>> {
        let result = self
            .page
            .evaluate(locator.query_script())
            .await
            .map_err(|e| anyhow::anyhow!("Locator query failed for {locator}: {e}"))?;
        let candidates: Vec<Candidate> = result.into_value()?;
        Ok(candidates)
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| PagecheckError::Screenshot(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "Browser close failed");
            }
            match browser.wait().await {
                Ok(status) => debug!(?status, "Browser closed"),
                Err(e) => debug!(error = %e, "Browser process wait failed"),
            }
        }
        self.handler.abort();
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Resolve the browser executable: configured path first, then `PATH`.
pub fn find_chrome(config: &BrowserConfig) -> Option<PathBuf> {
    if let Some(path) = &config.chrome_path {
        let path = PathBuf::from(path);
        return path.exists().then_some(path);
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .flat_map(|dir| CHROME_CANDIDATES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}
