//! Runtime configuration

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_LOG_FILE: &str = "practice-tutor.log";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid backend URL {url:?}: {reason}")]
    InvalidBackendUrl { url: String, reason: String },
    #[error("Invalid value for {name}: {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Settings for one tutoring session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorConfig {
    /// Root URL of the grading, chat and question endpoints
    pub backend_url: String,
    /// Limit for one-shot requests (grading, question fetch)
    pub request_timeout: Duration,
    /// Connect limit for streams; an open stream has no overall deadline
    pub connect_timeout: Duration,
    /// Load questions from this JSON file instead of the backend
    pub questions_file: Option<PathBuf>,
    pub log_file: PathBuf,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            questions_file: None,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl TutorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from a variable lookup, falling back to defaults
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = var("PRACTICE_TUTOR_BACKEND") {
            config.backend_url = url;
        }
        if let Some(secs) = var("PRACTICE_TUTOR_TIMEOUT_SECS") {
            config.request_timeout =
                Duration::from_secs(parse_secs("PRACTICE_TUTOR_TIMEOUT_SECS", secs)?);
        }
        if let Some(secs) = var("PRACTICE_TUTOR_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout =
                Duration::from_secs(parse_secs("PRACTICE_TUTOR_CONNECT_TIMEOUT_SECS", secs)?);
        }
        config.questions_file = var("PRACTICE_TUTOR_QUESTIONS").map(PathBuf::from);
        if let Some(path) = var("PRACTICE_TUTOR_LOG") {
            config.log_file = PathBuf::from(path);
        }
        config.validate()?;
        Ok(config)
    }

    /// Point at a different backend
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Result<Self, ConfigError> {
        self.backend_url = url.into();
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBackendUrl {
            url: self.backend_url.clone(),
            reason,
        };
        let url = reqwest::Url::parse(&self.backend_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        Ok(())
    }
}

fn parse_secs(name: &'static str, value: String) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidNumber { name, value }),
    }
}
