use thiserror::Error;

/// Why an enhanced lookup degraded. These never reach generation callers
/// (the composing source logs them and falls back) but they are observable
/// for diagnostics.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("enhancement endpoint is not configured")]
    NotConfigured,

    #[error("enhancement request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("enhancement returned status {0}")]
    Status(u16),

    #[error("enhancement returned a malformed response: {0}")]
    Malformed(String),

    #[error("enhancement value '{value}' is not in table {table}")]
    ConstraintViolation { value: String, table: String },
}
