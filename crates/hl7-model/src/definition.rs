use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::error::ModelError;
use crate::path::FieldPath;

/// Whether a field must, may, or conditionally appears in a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Usage {
    Required,
    Optional,
    Conditional(Condition),
}

impl Usage {
    pub fn is_required(&self) -> bool {
        matches!(self, Usage::Required)
    }
}

/// Category of identifying data a PHI-bearing field carries. Drives the
/// de-identification identity map so replacements stay consistent per
/// category within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhiCategory {
    Name,
    Address,
    Identifier,
    Contact,
    BirthDate,
    FreeText,
}

impl FromStr for PhiCategory {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "name" => Ok(PhiCategory::Name),
            "address" => Ok(PhiCategory::Address),
            "identifier" => Ok(PhiCategory::Identifier),
            "contact" => Ok(PhiCategory::Contact),
            "birth_date" => Ok(PhiCategory::BirthDate),
            "free_text" => Ok(PhiCategory::FreeText),
            other => Err(ModelError::InvalidPhiCategory(other.to_string())),
        }
    }
}

impl fmt::Display for PhiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PhiCategory::Name => "name",
            PhiCategory::Address => "address",
            PhiCategory::Identifier => "identifier",
            PhiCategory::Contact => "contact",
            PhiCategory::BirthDate => "birth_date",
            PhiCategory::FreeText => "free_text",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDefinition {
    pub code: String,
    pub name: String,
    pub notes: Option<String>,
    /// Ordered by position; `fields[0]` is `SEG.1`.
    pub fields: Vec<FieldDefinition>,
}

impl SegmentDefinition {
    /// Field definition at a 1-based position.
    pub fn field(&self, position: u16) -> Option<&FieldDefinition> {
        if position == 0 {
            return None;
        }
        self.fields.get(usize::from(position) - 1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub path: FieldPath,
    pub name: String,
    pub data_type: String,
    pub usage: Usage,
    /// Minimum and maximum repetitions. Invariants enforced at load:
    /// `min <= max` and Required implies `min >= 1`.
    pub min: u16,
    pub max: u16,
    pub table: Option<String>,
    pub phi: Option<PhiCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDefinition {
    pub path: FieldPath,
    pub name: String,
    pub data_type: String,
    pub required: bool,
    pub table: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDefinition {
    pub id: String,
    pub name: String,
    /// Ordered `(code, display)` entries; codes are unique within a table.
    pub values: Vec<(String, String)>,
}

impl TableDefinition {
    pub fn contains(&self, code: &str) -> bool {
        self.values.iter().any(|(candidate, _)| candidate == code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(code, _)| code.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataTypeKind {
    Text,
    Numeric,
    SequenceId,
    Date,
    Time,
    DateTime,
    Coded,
    Composite,
}

impl FromStr for DataTypeKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "text" => Ok(DataTypeKind::Text),
            "numeric" => Ok(DataTypeKind::Numeric),
            "sequence_id" => Ok(DataTypeKind::SequenceId),
            "date" => Ok(DataTypeKind::Date),
            "time" => Ok(DataTypeKind::Time),
            "datetime" => Ok(DataTypeKind::DateTime),
            "coded" => Ok(DataTypeKind::Coded),
            "composite" => Ok(DataTypeKind::Composite),
            other => Err(ModelError::InvalidDataTypeKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTypeDefinition {
    pub name: String,
    pub kind: DataTypeKind,
    pub description: Option<String>,
    /// Ordered component type references; empty unless `kind` is Composite.
    pub components: Vec<DataTypeComponent>,
}

impl DataTypeDefinition {
    pub fn is_composite(&self) -> bool {
        self.kind == DataTypeKind::Composite
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTypeComponent {
    pub position: u16,
    pub name: String,
    pub data_type: String,
    pub required: bool,
    pub table: Option<String>,
}

/// One entry in a message structure: a segment with its group cardinality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentEntry {
    pub segment: String,
    pub min: u16,
    pub max: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageStructure {
    /// `ADT^A01`-style message type.
    pub message_type: String,
    pub entries: Vec<SegmentEntry>,
}

/// A vendor dialect: additive field-level refinements for one integration
/// partner. Overlays tighten usage, pin values, or restrict valid sets;
/// they never relax the base definition or change a data type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorOverlay {
    pub id: String,
    pub name: String,
    pub constraints: Vec<VendorConstraint>,
}

impl VendorOverlay {
    /// Constraints applying to a message type, including `*` wildcards.
    pub fn constraints_for(&self, message_type: &str) -> impl Iterator<Item = &VendorConstraint> {
        self.constraints
            .iter()
            .filter(move |c| c.message_type == "*" || c.message_type == message_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorConstraint {
    pub message_type: String,
    pub path: FieldPath,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default)]
    pub fixed: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_field_lookup_is_one_based() {
        let segment = SegmentDefinition {
            code: "PID".to_string(),
            name: "Patient Identification".to_string(),
            notes: None,
            fields: vec![FieldDefinition {
                path: FieldPath::field("PID", 1),
                name: "Set ID".to_string(),
                data_type: "SI".to_string(),
                usage: Usage::Optional,
                min: 0,
                max: 1,
                table: None,
                phi: None,
            }],
        };
        assert!(segment.field(0).is_none());
        assert_eq!(segment.field(1).map(|f| f.name.as_str()), Some("Set ID"));
        assert!(segment.field(2).is_none());
    }

    #[test]
    fn overlay_wildcard_applies_to_all_types() {
        let overlay = VendorOverlay {
            id: "meridian".to_string(),
            name: "Meridian".to_string(),
            constraints: vec![
                VendorConstraint {
                    message_type: "*".to_string(),
                    path: FieldPath::field("MSH", 11),
                    usage: None,
                    fixed: Some("P".to_string()),
                    allowed: None,
                },
                VendorConstraint {
                    message_type: "ADT^A01".to_string(),
                    path: FieldPath::field("PID", 18),
                    usage: Some("Required".to_string()),
                    fixed: None,
                    allowed: None,
                },
            ],
        };
        assert_eq!(overlay.constraints_for("ORU^R01").count(), 1);
        assert_eq!(overlay.constraints_for("ADT^A01").count(), 2);
    }
}
