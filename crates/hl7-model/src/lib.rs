pub mod condition;
pub mod definition;
pub mod delta;
pub mod error;
pub mod message;
pub mod path;
pub mod report;

pub use condition::Condition;
pub use definition::{
    ComponentDefinition, DataTypeComponent, DataTypeDefinition, DataTypeKind, FieldDefinition,
    MessageStructure, PhiCategory, SegmentDefinition, SegmentEntry, TableDefinition, Usage,
    VendorConstraint, VendorOverlay,
};
pub use delta::{DeltaKind, FieldDelta};
pub use error::ModelError;
pub use message::{FieldInstance, Message, Repetition, SegmentInstance, Separators};
pub use path::FieldPath;
pub use report::{Finding, FindingKind, Severity, ValidationReport};
