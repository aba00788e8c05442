//! Core config, errors, locators and scenario model for pagecheck.

pub mod config;
pub mod error;
pub mod locator;
pub mod report;
pub mod scenario;
