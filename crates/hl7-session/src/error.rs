use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to {operation} session store {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session store {path} is not valid JSON")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("session store {path} has unsupported schema version {found}")]
    UnsupportedVersion { path: PathBuf, found: u32 },

    #[error("no session is current")]
    NoCurrentSession,

    #[error("no session named '{0}'")]
    UnknownSession(String),

    #[error("a session named '{0}' already exists")]
    NameTaken(String),

    /// Template import is all-or-nothing: the first violating lock rejects
    /// the whole template and no session state is created.
    #[error("template '{name}' rejected: {reason}")]
    ImportValidation { name: String, reason: String },
}
