//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    /// A check decided the system under test misbehaved
    #[error("{0}")]
    Failure(String),

    #[error("Unexpected status from {url}: HTTP {status}")]
    UnexpectedStatus { url: String, status: u16, body: String },

    #[error("Missing fields in {entity}: {fields:?}")]
    MissingFields { entity: String, fields: Vec<String> },

    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Browser not started; run the browser setup unit first")]
    BrowserNotStarted,

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Unit panicked: {0}")]
    Panicked(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    pub fn failure(message: impl Into<String>) -> Self {
        E2eError::Failure(message.into())
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
