use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatchyError {
    #[error("Not within a GCP environment: {0}")]
    NotInCloudEnvironment(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Metadata server error: {0}")]
    Metadata(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Object store error: {0}")]
    ObjectStore(String),

    #[error("{service} API error (HTTP {status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{operation} returned non-OK status code: {status}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for PatchyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PatchyError::Network(format!("request timed out: {}", e))
        } else {
            PatchyError::Network(e.to_string())
        }
    }
}
