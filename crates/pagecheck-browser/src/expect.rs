//! Visibility assertions with auto-waiting.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use pagecheck_core::error::{PagecheckError, Result};
use pagecheck_core::locator::Locator;

use crate::driver::PageDriver;

/// Poll back-off; the last interval repeats until the deadline.
const POLL_INTERVALS_MS: [u64; 4] = [100, 250, 500, 1000];

pub const DEFAULT_EXPECT_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Wait until `locator` resolves to exactly one visible element.
///
/// Elements hidden from the accessibility tree never count. No match or a
/// match without a visible box keeps polling until `timeout`; more than one
/// match fails immediately.
pub async fn expect_visible<D>(driver: &mut D, locator: &Locator, timeout: Duration) -> Result<()>
where
    D: PageDriver + ?Sized,
{
    let start = Instant::now();
    let mut intervals = POLL_INTERVALS_MS
        .iter()
        .copied()
        .chain(std::iter::repeat(POLL_INTERVALS_MS[POLL_INTERVALS_MS.len() - 1]));

    loop {
        let matches = locator.resolve(driver.query(locator).await?);
        let last_state = match matches.as_slice() {
            [only] if only.visible => {
                debug!(locator = %locator, elapsed_ms = start.elapsed().as_millis() as u64, "Element visible");
                return Ok(());
            }
            [_] => "element is not visible".to_string(),
            [] => "no matching element".to_string(),
            many => {
                return Err(PagecheckError::StrictMode {
                    locator: locator.to_string(),
                    count: many.len(),
                });
            }
        };

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(PagecheckError::Timeout {
                locator: locator.to_string(),
                timeout_ms: timeout.as_millis() as u64,
                last_state,
            });
        }

        let next = Duration::from_millis(intervals.next().unwrap_or(1000));
        tokio::time::sleep(next.min(timeout - elapsed)).await;
    }
}
