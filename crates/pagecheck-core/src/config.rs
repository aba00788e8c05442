//! Configuration loading and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scenario::{DEFAULT_BASE_URL, Scenario};

/// Top-level pagecheck configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expect: Option<ExpectConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    /// Extra scenarios; a scenario named like a built-in replaces it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenarios: Vec<Scenario>,
}

/// Browser automation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Path to Chrome/Chromium binary (auto-detected if omitted).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<String>,

    /// Run in headless mode (default: true).
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Keep the Chrome sandbox enabled (default: true). Containers
    /// running as root usually need this off.
    #[serde(default = "default_true")]
    pub sandbox: bool,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Navigation timeout in ms (default: 30000).
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            sandbox: true,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            navigation_timeout_ms: default_navigation_timeout(),
        }
    }
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

fn default_true() -> bool {
    true
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    720
}

fn default_navigation_timeout() -> u64 {
    30_000
}

/// The application under test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectConfig {
    /// Visibility assertion timeout in ms (default: 5000).
    #[serde(default = "default_expect_timeout")]
    pub timeout_ms: u64,
}

fn default_expect_timeout() -> u64 {
    5_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory screenshot paths are resolved against (default: ".").
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

fn default_output_dir() -> String {
    ".".into()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Emit JSON log lines instead of plain text.
    #[serde(default)]
    pub json: bool,
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").expect("static regex");
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    })
    .into_owned()
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(crate::error::PagecheckError::Io)?;

        let substituted = substitute_env_vars(&raw);

        let config: Config = json5::from_str(&substituted)
            .map_err(|e| crate::error::PagecheckError::Config(e.to_string()))?;

        tracing::debug!(
            path = %path.display(),
            scenarios = config.scenarios.len(),
            "Config loaded"
        );
        Ok(config)
    }

    /// Default config file path.
    pub fn config_path() -> PathBuf {
        data_dir().join("config.json")
    }

    pub fn browser(&self) -> BrowserConfig {
        self.browser.clone().unwrap_or_default()
    }

    pub fn base_url(&self) -> String {
        self.target
            .as_ref()
            .map(|t| t.base_url.clone())
            .unwrap_or_else(default_base_url)
    }

    pub fn expect_timeout(&self) -> Duration {
        Duration::from_millis(
            self.expect
                .as_ref()
                .map(|e| e.timeout_ms)
                .unwrap_or_else(default_expect_timeout),
        )
    }

    /// Resolve the output directory, expanding `~`.
    pub fn output_dir(&self) -> PathBuf {
        let dir = self
            .output
            .as_ref()
            .map(|o| o.dir.clone())
            .unwrap_or_else(default_output_dir);
        let expanded = shellexpand::tilde(&dir);
        PathBuf::from(expanded.as_ref())
    }

    /// Validate the config. Returns (warnings, errors).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if let Err(e) = url::Url::parse(&self.base_url()) {
            errors.push(format!("Target base URL '{}' is invalid: {e}", self.base_url()));
        }

        if let Some(browser) = &self.browser {
            if let Some(path) = &browser.chrome_path {
                if !Path::new(path).exists() {
                    errors.push(format!("Chrome executable not found: {path}"));
                }
            }
            if browser.viewport_width == 0 || browser.viewport_height == 0 {
                errors.push("Viewport dimensions cannot be 0".to_string());
            }
            if browser.navigation_timeout_ms == 0 {
                errors.push("Navigation timeout cannot be 0".to_string());
            }
            if !browser.headless {
                warnings.push("Browser runs headed; a display is required".to_string());
            }
        }

        if self.expect.as_ref().is_some_and(|e| e.timeout_ms == 0) {
            errors.push("Expect timeout cannot be 0".to_string());
        }

        for scenario in &self.scenarios {
            if let Err(e) = scenario.validate() {
                errors.push(e.to_string());
            }
        }

        (warnings, errors)
    }
}

/// Resolve the data directory (`~/.pagecheck`).
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pagecheck")
}
