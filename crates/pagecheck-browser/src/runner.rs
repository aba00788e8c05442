//! Scenario runner.
//!
//! Executes a scenario's steps in order against a [`PageDriver`], stops at
//! the first failure and always closes the driver.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use pagecheck_core::config::BrowserConfig;
use pagecheck_core::error::{PagecheckError, Result};
use pagecheck_core::report::{RunReport, StepOutcome, StepStatus};
use pagecheck_core::scenario::{Scenario, Step};

use crate::driver::PageDriver;
use crate::expect::{DEFAULT_EXPECT_TIMEOUT, expect_visible};
use crate::session::ChromiumSession;

/// Per-run settings that are not part of the scenario itself.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Screenshot paths are resolved against this directory.
    pub output_dir: PathBuf,
    pub expect_timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            expect_timeout: DEFAULT_EXPECT_TIMEOUT,
        }
    }
}

/// Run `scenario` against `driver`. Failures are recorded in the report;
/// the driver is closed in every case.
pub async fn run_scenario<D>(driver: &mut D, scenario: &Scenario, options: &RunOptions) -> RunReport
where
    D: PageDriver + ?Sized,
{
    let mut report = RunReport::new(&scenario.name, &scenario.url);
    info!(scenario = %scenario.name, url = %scenario.url, "Running scenario");

    if let Some(scheme) = scenario.color_scheme {
        if let Err(e) = driver.emulate_color_scheme(scheme).await {
            report.error = Some(e.to_string());
        }
    }

    let mut failed = report.error.is_some();
    for step in &scenario.steps {
        let label = step.label(&scenario.url);
        if failed {
            report.record(StepOutcome {
                kind: step.kind().to_string(),
                label,
                status: StepStatus::Skipped,
                elapsed_ms: 0,
                error: None,
            });
            continue;
        }

        let started = Instant::now();
        let result = run_step(driver, scenario, step, options, &mut report).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                info!(scenario = %scenario.name, step = %label, elapsed_ms, "Step passed");
                report.record(StepOutcome {
                    kind: step.kind().to_string(),
                    label,
                    status: StepStatus::Passed,
                    elapsed_ms,
                    error: None,
                });
            }
            Err(e) => {
                warn!(scenario = %scenario.name, step = %label, elapsed_ms, error = %e, "Step failed");
                failed = true;
                report.error = Some(e.to_string());
                report.record(StepOutcome {
                    kind: step.kind().to_string(),
                    label,
                    status: StepStatus::Failed,
                    elapsed_ms,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    if let Err(e) = driver.close().await {
        warn!(scenario = %scenario.name, error = %e, "Failed to close browser");
    }

    info!(scenario = %scenario.name, passed = report.passed(), "{}", report.summary());
    report
}

async fn run_step<D>(
    driver: &mut D,
    scenario: &Scenario,
    step: &Step,
    options: &RunOptions,
    report: &mut RunReport,
) -> Result<()>
where
    D: PageDriver + ?Sized,
{
    match step {
        Step::Goto => driver.goto(&scenario.url).await,
        Step::ExpectVisible { locator } => {
            expect_visible(driver, locator, options.expect_timeout).await
        }
        Step::Screenshot { path } => {
            let target = options.output_dir.join(path);
            let bytes = driver.screenshot().await?;
            write_screenshot(&target, &bytes).await?;
            report.add_screenshot(&target);
            Ok(())
        }
    }
}

async fn write_screenshot(path: &Path, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(PagecheckError::Screenshot(format!(
            "Browser returned an empty image for {}",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    info!(path = %path.display(), bytes = bytes.len(), "Screenshot saved");
    Ok(())
}

/// Launch a Chromium session, run `scenario` on it, and return the report.
///
/// A launch failure is returned as an error; everything after that is
/// recorded in the report.
pub async fn run_with_chromium(
    config: &BrowserConfig,
    scenario: &Scenario,
    options: &RunOptions,
) -> Result<RunReport> {
    scenario.validate()?;
    let mut session = ChromiumSession::launch(config).await?;
    Ok(run_scenario(&mut session, scenario, options).await)
}
