#![deny(unsafe_code)]

//! Vendor overlay loading. Each overlay is one TOML file under `vendors/`
//! describing one integration partner's stricter dialect.

use std::path::Path;

use serde::Deserialize;

use hl7_model::{FieldPath, VendorConstraint, VendorOverlay};

use crate::error::DefinitionError;

#[derive(Debug, Deserialize)]
struct OverlayFile {
    id: String,
    name: String,
    #[serde(default)]
    constraints: Vec<ConstraintRecord>,
}

#[derive(Debug, Deserialize)]
struct ConstraintRecord {
    message_type: String,
    path: String,
    #[serde(default)]
    usage: Option<String>,
    #[serde(default)]
    fixed: Option<String>,
    #[serde(default)]
    allowed: Option<Vec<String>>,
}

pub(crate) fn parse_overlay(path: &Path) -> Result<VendorOverlay, DefinitionError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| DefinitionError::io(path, e))?;
    let raw: OverlayFile = toml::from_str(&contents).map_err(|e| DefinitionError::Toml {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut constraints = Vec::with_capacity(raw.constraints.len());
    for record in raw.constraints {
        let field_path: FieldPath = record.path.parse().map_err(|e| {
            DefinitionError::InvalidRecord {
                kind: "vendor constraint",
                path: path.to_path_buf(),
                message: format!("{}: {e}", record.path),
            }
        })?;
        if let Some(usage) = &record.usage {
            if usage != "Required" {
                return Err(DefinitionError::InvalidRecord {
                    kind: "vendor constraint",
                    path: path.to_path_buf(),
                    message: format!(
                        "{field_path}: overlays may only tighten usage to Required, got '{usage}'"
                    ),
                });
            }
        }
        if record.usage.is_none() && record.fixed.is_none() && record.allowed.is_none() {
            return Err(DefinitionError::InvalidRecord {
                kind: "vendor constraint",
                path: path.to_path_buf(),
                message: format!("{field_path}: constraint has no effect"),
            });
        }
        if let Some(allowed) = &record.allowed {
            if allowed.is_empty() {
                return Err(DefinitionError::InvalidRecord {
                    kind: "vendor constraint",
                    path: path.to_path_buf(),
                    message: format!("{field_path}: allowed set is empty"),
                });
            }
        }
        constraints.push(VendorConstraint {
            message_type: record.message_type,
            path: field_path,
            usage: record.usage,
            fixed: record.fixed,
            allowed: record.allowed,
        });
    }

    Ok(VendorOverlay {
        id: raw.id,
        name: raw.name,
        constraints,
    })
}
