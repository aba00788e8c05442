//! CDP browser automation for pagecheck.
//!
//! [`ChromiumSession`] drives Chrome/Chromium over the DevTools protocol and
//! implements [`PageDriver`], the seam the scenario runner works against.
//! Requires Chrome/Chromium installed.

pub mod driver;
pub mod expect;
pub mod runner;
pub mod session;

pub use driver::PageDriver;
pub use runner::{RunOptions, run_scenario, run_with_chromium};
pub use session::ChromiumSession;
