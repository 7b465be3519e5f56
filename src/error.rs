use crate::schema::Platform;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigCheckError {
    #[error("Compilation error: {0}")]
    Compilation(String),

    #[error("Execution failed on {platform} for {unit}: {message}")]
    Execution {
        platform: Platform,
        unit: String,
        message: String,
    },

    #[error("Malformed result: {0}")]
    MalformedResult(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigCheckError {
    pub fn execution(
        platform: Platform,
        unit: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        MigCheckError::Execution {
            platform,
            unit: unit.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MigCheckError>;
