#![deny(unsafe_code)]

pub mod error;
pub mod hash;
pub mod load;
pub mod manifest;
pub mod registry;
pub mod vendor;

pub use crate::error::DefinitionError;
pub use crate::registry::{Registry, RegistrySummary};

use std::path::PathBuf;

/// Environment variable overriding the standards directory.
pub const STANDARDS_ENV_VAR: &str = "HL7_STANDARDS_DIR";

const DEFAULT_STANDARD: &str = "hl7v2";
const DEFAULT_VERSION: &str = "v2_5_1";

/// Default standards root: `HL7_STANDARDS_DIR` when set, otherwise the
/// `standards/` directory shipped with the workspace.
pub fn default_standards_root() -> PathBuf {
    if let Ok(root) = std::env::var(STANDARDS_ENV_VAR) {
        return PathBuf::from(root);
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../standards")
}

/// Load the registry for the default standard and version.
pub fn load_default_registry() -> Result<Registry, DefinitionError> {
    let dir = default_standards_root()
        .join(DEFAULT_STANDARD)
        .join(DEFAULT_VERSION);
    Registry::load(&dir)
}
