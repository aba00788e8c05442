use thiserror::Error;

#[derive(Debug, Error)]
pub enum PagecheckError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Browser launch error: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timed out after {timeout_ms}ms waiting for {locator} to be visible ({last_state})")]
    Timeout {
        locator: String,
        timeout_ms: u64,
        last_state: String,
    },

    #[error("Strict mode violation: {locator} resolved to {count} elements")]
    StrictMode { locator: String, count: usize },

    #[error("Screenshot error: {0}")]
    Screenshot(String),

    #[error("Scenario error: {0}")]
    Scenario(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PagecheckError>;
