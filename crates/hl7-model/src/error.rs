use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid field path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid condition '{condition}': {reason}")]
    InvalidCondition { condition: String, reason: String },

    #[error("invalid PHI category '{0}'")]
    InvalidPhiCategory(String),

    #[error("invalid data type kind '{0}'")]
    InvalidDataTypeKind(String),
}
