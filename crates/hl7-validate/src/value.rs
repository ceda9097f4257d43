//! Single-value checks shared by the full validator and session template
//! import: data-type grammar and table membership.

use std::sync::LazyLock;

use regex::Regex;

use hl7_model::{DataTypeKind, FieldPath, TableDefinition};
use hl7_standards::Registry;

pub static NUMERIC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+(\.\d+)?$").expect("numeric regex"));

static SEQUENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,4}$").expect("sequence regex"));

static CODED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]{1,20}$").expect("coded regex"));

/// Why a single value fails its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueIssue {
    TypeMismatch { expected: &'static str },
    NotInTable { table: String },
}

impl ValueIssue {
    pub fn describe(&self, value: &str) -> String {
        match self {
            ValueIssue::TypeMismatch { expected } => {
                format!("'{value}' does not parse as {expected}")
            }
            ValueIssue::NotInTable { table } => {
                format!("'{value}' is not a code in table {table}")
            }
        }
    }
}

/// Check one leaf value against a primitive data-type grammar and an
/// optional table. Composite kinds are not leaf-checked here (their
/// components are checked individually).
pub fn check_leaf(
    kind: DataTypeKind,
    table: Option<&TableDefinition>,
    value: &str,
) -> Option<ValueIssue> {
    if value.is_empty() {
        return None;
    }
    if let Some(table) = table {
        if !table.contains(value) {
            return Some(ValueIssue::NotInTable {
                table: table.id.clone(),
            });
        }
        return None;
    }
    match kind {
        DataTypeKind::Text | DataTypeKind::Composite => None,
        DataTypeKind::Numeric => (!NUMERIC_REGEX.is_match(value))
            .then_some(ValueIssue::TypeMismatch { expected: "NM" }),
        DataTypeKind::SequenceId => (!SEQUENCE_REGEX.is_match(value))
            .then_some(ValueIssue::TypeMismatch { expected: "SI" }),
        DataTypeKind::Coded => (!CODED_REGEX.is_match(value))
            .then_some(ValueIssue::TypeMismatch { expected: "coded value" }),
        DataTypeKind::Date => (!valid_date(value))
            .then_some(ValueIssue::TypeMismatch { expected: "DT (YYYYMMDD)" }),
        DataTypeKind::Time => (!valid_time(value))
            .then_some(ValueIssue::TypeMismatch { expected: "TM (HHMMSS)" }),
        DataTypeKind::DateTime => (!valid_datetime(value)).then_some(ValueIssue::TypeMismatch {
            expected: "DTM (YYYYMMDD[HHMM[SS]])",
        }),
    }
}

/// Calendar-checked `YYYYMMDD`.
fn valid_date(value: &str) -> bool {
    value.len() == 8 && chrono::NaiveDate::parse_from_str(value, "%Y%m%d").is_ok()
}

/// `HHMM` or `HHMMSS`.
fn valid_time(value: &str) -> bool {
    match value.len() {
        4 => chrono::NaiveTime::parse_from_str(value, "%H%M").is_ok(),
        6 => chrono::NaiveTime::parse_from_str(value, "%H%M%S").is_ok(),
        _ => false,
    }
}

/// Timestamps accept day, minute, or second precision; generation always
/// emits the full second-precision form.
fn valid_datetime(value: &str) -> bool {
    match value.len() {
        8 => valid_date(value),
        12 => valid_date(&value[..8]) && valid_time(&value[8..]),
        14 => valid_date(&value[..8]) && valid_time(&value[8..]),
        _ => false,
    }
}

/// Validate a locked value for a field or component path, the way template
/// import needs it: field-level values are split into components on `^`,
/// and each populated component is checked against its own slot.
pub fn check_locked_value(
    registry: &Registry,
    path: &FieldPath,
    raw: &str,
) -> Result<(), String> {
    let field = registry
        .field(&path.parent_field())
        .ok_or_else(|| format!("unknown field path {path}"))?;
    let field_type = registry
        .data_type(&field.data_type)
        .ok_or_else(|| format!("unknown data type for {path}"))?;

    if let Some(component) = path.component {
        let definition = registry
            .component(path)
            .ok_or_else(|| format!("unknown component path {path}"))?;
        let kind = registry
            .data_type(&definition.data_type)
            .map(|t| t.kind)
            .ok_or_else(|| format!("unknown data type for {path}"))?;
        let table = registry.slot_table(field, Some(component));
        if let Some(issue) = check_leaf(kind, table, raw) {
            return Err(format!("{path}: {}", issue.describe(raw)));
        }
        return Ok(());
    }

    if !field_type.is_composite() {
        let table = registry.slot_table(field, None);
        if let Some(issue) = check_leaf(field_type.kind, table, raw) {
            return Err(format!("{path}: {}", issue.describe(raw)));
        }
        return Ok(());
    }

    let components = registry.components(path);
    let values: Vec<&str> = raw.split('^').collect();
    if values.len() > components.len() {
        return Err(format!(
            "{path}: {} components given but {} are defined",
            values.len(),
            components.len()
        ));
    }
    for (definition, value) in components.iter().zip(values) {
        if value.is_empty() {
            continue;
        }
        let kind = registry
            .data_type(&definition.data_type)
            .map(|t| t.kind)
            .ok_or_else(|| format!("unknown data type for {}", definition.path))?;
        let component = definition.path.component.unwrap_or(1);
        let table = registry.slot_table(field, Some(component));
        if let Some(issue) = check_leaf(kind, table, value) {
            return Err(format!("{}: {}", definition.path, issue.describe(value)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar_checks_by_kind() {
        assert!(check_leaf(DataTypeKind::Numeric, None, "12.5").is_none());
        assert!(check_leaf(DataTypeKind::Numeric, None, "12,5").is_some());
        assert!(check_leaf(DataTypeKind::Date, None, "20240229").is_none());
        assert!(check_leaf(DataTypeKind::Date, None, "20230229").is_some());
        assert!(check_leaf(DataTypeKind::DateTime, None, "20240102030405").is_none());
        assert!(check_leaf(DataTypeKind::DateTime, None, "202401020304056").is_some());
        assert!(check_leaf(DataTypeKind::Time, None, "235959").is_none());
        assert!(check_leaf(DataTypeKind::Time, None, "245959").is_some());
        assert!(check_leaf(DataTypeKind::Text, None, "anything at all").is_none());
    }

    #[test]
    fn empty_values_never_fail_grammar() {
        assert!(check_leaf(DataTypeKind::Numeric, None, "").is_none());
        assert!(check_leaf(DataTypeKind::Date, None, "").is_none());
    }
}
