#![deny(unsafe_code)]

use std::path::PathBuf;

/// Any failure while loading the definition corpus. A load that produces
/// one of these exposes no registry at all; partial registries are never
/// observable.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse CSV {path}: {message}")]
    Csv { path: PathBuf, message: String },

    #[error("invalid manifest: {message}")]
    InvalidManifest { message: String },

    #[error("missing required role in manifest: {role}")]
    MissingRole { role: String },

    #[error("duplicate role in manifest: {role}")]
    DuplicateRole { role: String },

    #[error("invalid sha256 for {path}: {message}")]
    InvalidSha256 { path: PathBuf, message: String },

    #[error("invalid manifest path {path}: {message}")]
    InvalidPath { path: PathBuf, message: String },

    #[error("missing file listed in manifest: {path}")]
    MissingFile { path: PathBuf },

    #[error("unexpected file present under standards directory: {path}")]
    UnexpectedFile { path: PathBuf },

    #[error("sha256 mismatch for {path} (expected {expected}, got {actual})")]
    Sha256Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("invalid {kind} record in {path}: {message}")]
    InvalidRecord {
        kind: &'static str,
        path: PathBuf,
        message: String,
    },

    #[error("duplicate {kind} definition: {key}")]
    Duplicate { kind: &'static str, key: String },

    #[error("{from} references unknown {kind} '{to}'")]
    DanglingReference {
        from: String,
        kind: &'static str,
        to: String,
    },

    #[error("invalid cardinality for {path}: {message}")]
    InvalidCardinality { path: String, message: String },

    #[error("composite data type cycle: {chain}")]
    CompositeCycle { chain: String },
}

impl DefinitionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
