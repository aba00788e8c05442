use async_trait::async_trait;

use pagecheck_core::error::Result;
use pagecheck_core::locator::{Candidate, Locator};
use pagecheck_core::scenario::ColorScheme;

/// A single browser page a scenario runs against.
#[async_trait]
pub trait PageDriver: Send {
    /// Emulate `prefers-color-scheme` for subsequent navigations.
    async fn emulate_color_scheme(&mut self, scheme: ColorScheme) -> Result<()>;

    /// Navigate and wait for the page to load.
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Report every element carrying the locator's role. Name filtering is
    /// left to [`Locator::resolve`].
    async fn query(&mut self, locator: &Locator) -> Result<Vec<Candidate>>;

    /// Capture the viewport as PNG bytes.
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    /// Tear down the page and its browser.
    async fn close(&mut self) -> Result<()>;
}
