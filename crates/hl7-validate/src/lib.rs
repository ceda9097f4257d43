//! Message validation.
//!
//! Every anomaly in a message becomes a [`Finding`]; validation itself
//! never fails on malformed content. Severity rules:
//!
//! - missing required segment/field, repetition overflow, a code outside
//!   its table, a value failing its data-type grammar: **Error**
//! - unexpected segment for the message type, unusually short free text:
//!   **Warning**
//!
//! Vendor overlays run after the base pass and can only add findings,
//! never suppress one.

pub mod value;
mod vendor;

use tracing::debug;

use hl7_model::{
    FieldDefinition, FieldInstance, Finding, FindingKind, Message, Repetition, SegmentInstance,
    Usage, ValidationReport,
};
use hl7_standards::Registry;

pub use value::{ValueIssue, check_leaf, check_locked_value};

#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    #[error("unknown message type '{0}'")]
    UnknownMessageType(String),

    #[error("unknown vendor '{0}'")]
    UnknownVendor(String),
}

/// Free-text values shorter than this draw a warning.
const SHORT_TEXT_LEN: usize = 2;

pub struct Validator<'a> {
    registry: &'a Registry,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    pub fn validate(
        &self,
        message: &Message,
        message_type: &str,
        vendor: Option<&str>,
    ) -> Result<ValidationReport, ValidateError> {
        let structure = self
            .registry
            .structure(message_type)
            .ok_or_else(|| ValidateError::UnknownMessageType(message_type.to_string()))?;
        let overlay = match vendor {
            Some(id) => Some(
                self.registry
                    .vendor(id)
                    .ok_or_else(|| ValidateError::UnknownVendor(id.to_string()))?,
            ),
            None => None,
        };

        let mut report = ValidationReport::new(message_type);
        report.vendor = vendor.map(ToString::to_string);

        // Structure pass: segment presence and group cardinality.
        for entry in &structure.entries {
            let count = message.segments_with_code(&entry.segment).count() as u16;
            if count < entry.min {
                report.findings.push(Finding::error(
                    entry.segment.clone(),
                    FindingKind::MissingRequiredSegment,
                    format!("required segment {} is missing", entry.segment),
                ));
            } else if count > entry.max {
                report.findings.push(Finding::error(
                    entry.segment.clone(),
                    FindingKind::ExceedsMaxSegments,
                    format!(
                        "segment {} appears {count} times (max {})",
                        entry.segment, entry.max
                    ),
                ));
            }
        }
        for segment in &message.segments {
            if !structure.entries.iter().any(|e| e.segment == segment.code) {
                report.findings.push(Finding::warning(
                    segment.code.clone(),
                    FindingKind::UnexpectedSegment,
                    format!(
                        "segment {} is not part of {message_type}",
                        segment.code
                    ),
                ));
            }
        }

        // Field pass, per segment instance.
        for (segment, occurrence, total) in occurrences(message) {
            let Some(definition) = self.registry.segment(&segment.code) else {
                continue;
            };
            for field in &definition.fields {
                self.check_field(message, segment, field, occurrence, total, &mut report);
            }
        }

        if let Some(overlay) = overlay {
            vendor::apply(self.registry, overlay, message, message_type, &mut report);
        }

        debug!(
            message_type,
            errors = report.error_count(),
            warnings = report.warning_count(),
            "validated message"
        );
        Ok(report)
    }

    fn check_field(
        &self,
        message: &Message,
        segment: &SegmentInstance,
        field: &FieldDefinition,
        occurrence: usize,
        total: usize,
        report: &mut ValidationReport,
    ) {
        let label = field_label(&segment.code, occurrence, total, field.path.field);
        let instance = segment.field(field.path.field);
        let present = instance.is_some_and(FieldInstance::is_present);

        if !present {
            let required = match &field.usage {
                Usage::Required => true,
                Usage::Optional => false,
                Usage::Conditional(condition) => {
                    // A condition naming a sibling field reads this segment
                    // instance; anything else reads the whole message.
                    condition.holds(|path| {
                        if path.segment == segment.code {
                            segment
                                .field(path.field)
                                .and_then(FieldInstance::first)
                                .and_then(|rep| rep.component(path.component.unwrap_or(1)))
                                .map(ToString::to_string)
                        } else {
                            message.first_value(path)
                        }
                    })
                }
            };
            if required {
                report.findings.push(Finding::error(
                    label,
                    FindingKind::MissingRequired,
                    format!("required field {} ({}) is missing", field.path, field.name),
                ));
            }
            return;
        }

        let Some(instance) = instance else {
            return;
        };
        if instance.repetitions.len() > usize::from(field.max) {
            report.findings.push(Finding::error(
                label.clone(),
                FindingKind::ExceedsMaxRepetitions,
                format!(
                    "{} repeats {} times (max {})",
                    field.path,
                    instance.repetitions.len(),
                    field.max
                ),
            ));
        }

        let multiple = instance.repetitions.len() > 1;
        for (index, repetition) in instance.repetitions.iter().enumerate() {
            let rep_label = if multiple {
                format!("{label}[{}]", index + 1)
            } else {
                label.clone()
            };
            self.check_repetition(field, repetition, &rep_label, report);
        }
    }

    fn check_repetition(
        &self,
        field: &FieldDefinition,
        repetition: &Repetition,
        label: &str,
        report: &mut ValidationReport,
    ) {
        let Some(data_type) = self.registry.data_type(&field.data_type) else {
            return;
        };

        if !data_type.is_composite() {
            let value = repetition.component(1).unwrap_or_default();
            let table = self.registry.slot_table(field, None);
            self.check_leaf_value(data_type.kind, table, value, label, report);
            if repetition.components.len() > 1 {
                report.findings.push(Finding::error(
                    label.to_string(),
                    FindingKind::TypeMismatch,
                    format!(
                        "{} is {} but carries {} components",
                        field.path,
                        data_type.name,
                        repetition.components.len()
                    ),
                ));
            }
            self.check_text_length(&data_type.name, value, label, report);
            return;
        }

        let components = self.registry.components(&field.path);
        if repetition.components.len() > components.len() {
            report.findings.push(Finding::error(
                label.to_string(),
                FindingKind::TypeMismatch,
                format!(
                    "{} carries {} components but {} defines {}",
                    field.path,
                    repetition.components.len(),
                    data_type.name,
                    components.len()
                ),
            ));
        }

        for definition in components {
            let Some(position) = definition.path.component else {
                continue;
            };
            let value = repetition.component(position).unwrap_or_default();
            let component_label = format!("{label}.{position}");
            if value.is_empty() {
                if definition.required {
                    report.findings.push(Finding::error(
                        component_label,
                        FindingKind::MissingRequired,
                        format!(
                            "required component {} ({}) is missing",
                            definition.path, definition.name
                        ),
                    ));
                }
                continue;
            }
            let Some(component_type) = self.registry.data_type(&definition.data_type) else {
                continue;
            };
            // Nested composites (an HD inside a CX) hold subcomponents;
            // only their presence is checked here.
            if component_type.is_composite() {
                continue;
            }
            let table = self.registry.slot_table(field, Some(position));
            self.check_leaf_value(component_type.kind, table, value, &component_label, report);
        }
    }

    fn check_leaf_value(
        &self,
        kind: hl7_model::DataTypeKind,
        table: Option<&hl7_model::TableDefinition>,
        value: &str,
        label: &str,
        report: &mut ValidationReport,
    ) {
        if let Some(issue) = check_leaf(kind, table, value) {
            let kind = match issue {
                ValueIssue::NotInTable { .. } => FindingKind::InvalidCode,
                ValueIssue::TypeMismatch { .. } => FindingKind::TypeMismatch,
            };
            report
                .findings
                .push(Finding::error(label.to_string(), kind, issue.describe(value)));
        }
    }

    /// Unusually short free text is worth a warning, never an error. Only
    /// the free-text types qualify; short ST values (set ids, flags) are
    /// normal.
    fn check_text_length(
        &self,
        type_name: &str,
        value: &str,
        label: &str,
        report: &mut ValidationReport,
    ) {
        if matches!(type_name, "TX" | "FT")
            && !value.is_empty()
            && value.trim().len() < SHORT_TEXT_LEN
        {
            report.findings.push(Finding::warning(
                label.to_string(),
                FindingKind::ShortText,
                format!("text value '{value}' is unusually short"),
            ));
        }
    }
}

/// Segment instances with their occurrence index and the total count for
/// their code, for stable finding labels.
fn occurrences(message: &Message) -> Vec<(&SegmentInstance, usize, usize)> {
    let mut seen: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    let mut out = Vec::with_capacity(message.segments.len());
    for segment in &message.segments {
        let index = *seen
            .entry(segment.code.as_str())
            .and_modify(|count| *count += 1)
            .or_insert(0);
        out.push((segment, index, 0));
    }
    for entry in &mut out {
        entry.2 = seen[entry.0.code.as_str()] + 1;
    }
    out
}

pub(crate) fn field_label(code: &str, occurrence: usize, total: usize, field: u16) -> String {
    if total > 1 {
        format!("{code}[{}].{field}", occurrence + 1)
    } else {
        format!("{code}.{field}")
    }
}
