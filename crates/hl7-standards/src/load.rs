#![deny(unsafe_code)]

//! CSV parsing for the definition corpus. Each loader turns one or two CSV
//! files into model records and enforces the record-local invariants
//! (contiguous positions, unique keys, cardinality bounds). Cross-reference
//! checks happen in [`crate::registry`].

use std::collections::BTreeMap;
use std::path::Path;

use csv::ReaderBuilder;

use hl7_model::{
    Condition, DataTypeComponent, DataTypeDefinition, DataTypeKind, FieldDefinition, FieldPath,
    MessageStructure, SegmentDefinition, SegmentEntry, TableDefinition, Usage,
};

use crate::error::DefinitionError;

pub(crate) fn read_csv_rows(path: &Path) -> Result<Vec<BTreeMap<String, String>>, DefinitionError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| DefinitionError::Csv {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    let headers = reader
        .headers()
        .map_err(|e| DefinitionError::Csv {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DefinitionError::Csv {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut row = BTreeMap::new();
        for (idx, value) in record.iter().enumerate() {
            let key = headers
                .get(idx)
                .unwrap_or("")
                .trim_matches('\u{feff}')
                .to_string();
            row.insert(key, value.trim().to_string());
        }
        rows.push(row);
    }
    Ok(rows)
}

fn get(row: &BTreeMap<String, String>, key: &str) -> String {
    row.get(key).cloned().unwrap_or_default()
}

fn get_opt(row: &BTreeMap<String, String>, key: &str) -> Option<String> {
    row.get(key).filter(|v| !v.is_empty()).cloned()
}

fn invalid(
    kind: &'static str,
    path: &Path,
    message: impl Into<String>,
) -> DefinitionError {
    DefinitionError::InvalidRecord {
        kind,
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn parse_position(
    raw: &str,
    kind: &'static str,
    path: &Path,
) -> Result<u16, DefinitionError> {
    let position: u16 = raw
        .parse()
        .map_err(|_| invalid(kind, path, format!("position '{raw}' is not a number")))?;
    if position == 0 {
        return Err(invalid(kind, path, "positions are 1-based"));
    }
    Ok(position)
}

/// Load segment definitions from `segments.csv` + `fields.csv`. Field
/// positions must be contiguous from 1 so fields stay addressable by
/// 1-based index.
pub(crate) fn parse_segments(
    segments_path: &Path,
    fields_path: &Path,
) -> Result<Vec<SegmentDefinition>, DefinitionError> {
    let mut segments: Vec<SegmentDefinition> = Vec::new();
    for row in read_csv_rows(segments_path)? {
        let code = get(&row, "code").to_ascii_uppercase();
        if code.is_empty() {
            continue;
        }
        if segments.iter().any(|s| s.code == code) {
            return Err(DefinitionError::Duplicate {
                kind: "segment",
                key: code,
            });
        }
        segments.push(SegmentDefinition {
            code,
            name: get(&row, "name"),
            notes: get_opt(&row, "notes"),
            fields: Vec::new(),
        });
    }

    let mut fields_by_segment: BTreeMap<String, Vec<(u16, FieldDefinition)>> = BTreeMap::new();
    for row in read_csv_rows(fields_path)? {
        let segment = get(&row, "segment").to_ascii_uppercase();
        if segment.is_empty() {
            continue;
        }
        let position = parse_position(&get(&row, "position"), "field", fields_path)?;
        let path = FieldPath::field(&segment, position);

        let min: u16 = get(&row, "min").parse().map_err(|_| {
            invalid("field", fields_path, format!("{path}: min must be a number"))
        })?;
        let max: u16 = get(&row, "max").parse().map_err(|_| {
            invalid("field", fields_path, format!("{path}: max must be a number"))
        })?;
        if min > max {
            return Err(DefinitionError::InvalidCardinality {
                path: path.to_string(),
                message: format!("min {min} exceeds max {max}"),
            });
        }
        if max == 0 {
            return Err(DefinitionError::InvalidCardinality {
                path: path.to_string(),
                message: "max must be at least 1".to_string(),
            });
        }

        let condition = get_opt(&row, "condition");
        let usage = match get(&row, "usage").as_str() {
            "R" => {
                if min == 0 {
                    return Err(DefinitionError::InvalidCardinality {
                        path: path.to_string(),
                        message: "required field must have min >= 1".to_string(),
                    });
                }
                Usage::Required
            }
            "O" => Usage::Optional,
            "C" => {
                let raw = condition.clone().ok_or_else(|| {
                    invalid(
                        "field",
                        fields_path,
                        format!("{path}: conditional field needs a condition"),
                    )
                })?;
                let parsed: Condition = raw.parse().map_err(|e| {
                    invalid("field", fields_path, format!("{path}: {e}"))
                })?;
                Usage::Conditional(parsed)
            }
            other => {
                return Err(invalid(
                    "field",
                    fields_path,
                    format!("{path}: unknown usage '{other}'"),
                ));
            }
        };
        if !matches!(usage, Usage::Conditional(_)) && condition.is_some() {
            return Err(invalid(
                "field",
                fields_path,
                format!("{path}: condition given for non-conditional field"),
            ));
        }

        let phi = match get_opt(&row, "phi") {
            Some(raw) => Some(raw.parse().map_err(|e| {
                invalid("field", fields_path, format!("{path}: {e}"))
            })?),
            None => None,
        };

        let definition = FieldDefinition {
            path: path.clone(),
            name: get(&row, "name"),
            data_type: get(&row, "data_type").to_ascii_uppercase(),
            usage,
            min,
            max,
            table: get_opt(&row, "table"),
            phi,
        };
        fields_by_segment
            .entry(segment)
            .or_default()
            .push((position, definition));
    }

    for segment in &mut segments {
        let Some(mut fields) = fields_by_segment.remove(&segment.code) else {
            return Err(invalid(
                "segment",
                segments_path,
                format!("segment {} has no fields", segment.code),
            ));
        };
        fields.sort_by_key(|(position, _)| *position);
        for (index, (position, _)) in fields.iter().enumerate() {
            let expected = index as u16 + 1;
            if *position != expected {
                return Err(invalid(
                    "field",
                    fields_path,
                    format!(
                        "segment {} positions must be contiguous: expected {expected}, found {position}",
                        segment.code
                    ),
                ));
            }
        }
        segment.fields = fields.into_iter().map(|(_, field)| field).collect();
    }

    if let Some(orphan) = fields_by_segment.keys().next() {
        return Err(DefinitionError::DanglingReference {
            from: format!("fields for {orphan}"),
            kind: "segment",
            to: orphan.clone(),
        });
    }

    Ok(segments)
}

pub(crate) fn parse_data_types(
    types_path: &Path,
    components_path: &Path,
) -> Result<Vec<DataTypeDefinition>, DefinitionError> {
    let mut types: Vec<DataTypeDefinition> = Vec::new();
    for row in read_csv_rows(types_path)? {
        let name = get(&row, "name").to_ascii_uppercase();
        if name.is_empty() {
            continue;
        }
        if types.iter().any(|t| t.name == name) {
            return Err(DefinitionError::Duplicate {
                kind: "data type",
                key: name,
            });
        }
        let kind: DataTypeKind = get(&row, "kind")
            .parse()
            .map_err(|e| invalid("data type", types_path, format!("{name}: {e}")))?;
        types.push(DataTypeDefinition {
            name,
            kind,
            description: get_opt(&row, "description"),
            components: Vec::new(),
        });
    }

    let mut components: BTreeMap<String, Vec<DataTypeComponent>> = BTreeMap::new();
    for row in read_csv_rows(components_path)? {
        let data_type = get(&row, "data_type").to_ascii_uppercase();
        if data_type.is_empty() {
            continue;
        }
        let position = parse_position(&get(&row, "position"), "component", components_path)?;
        let required = match get(&row, "required").as_str() {
            "Y" => true,
            "N" => false,
            other => {
                return Err(invalid(
                    "component",
                    components_path,
                    format!("{data_type}.{position}: required must be Y or N, got '{other}'"),
                ));
            }
        };
        components.entry(data_type).or_default().push(DataTypeComponent {
            position,
            name: get(&row, "name"),
            data_type: get(&row, "component_type").to_ascii_uppercase(),
            required,
            table: get_opt(&row, "table"),
        });
    }

    for definition in &mut types {
        let own = components.remove(&definition.name).unwrap_or_default();
        match (definition.is_composite(), own.is_empty()) {
            (true, true) => {
                return Err(invalid(
                    "data type",
                    types_path,
                    format!("composite {} has no components", definition.name),
                ));
            }
            (false, false) => {
                return Err(invalid(
                    "data type",
                    types_path,
                    format!("primitive {} must not have components", definition.name),
                ));
            }
            _ => {}
        }
        let mut own = own;
        own.sort_by_key(|c| c.position);
        for (index, component) in own.iter().enumerate() {
            let expected = index as u16 + 1;
            if component.position != expected {
                return Err(invalid(
                    "component",
                    components_path,
                    format!(
                        "{} component positions must be contiguous: expected {expected}, found {}",
                        definition.name, component.position
                    ),
                ));
            }
        }
        definition.components = own;
    }

    if let Some(orphan) = components.keys().next() {
        return Err(DefinitionError::DanglingReference {
            from: format!("components for {orphan}"),
            kind: "data type",
            to: orphan.clone(),
        });
    }

    Ok(types)
}

pub(crate) fn parse_tables(
    tables_path: &Path,
    values_path: &Path,
) -> Result<Vec<TableDefinition>, DefinitionError> {
    let mut tables: Vec<TableDefinition> = Vec::new();
    for row in read_csv_rows(tables_path)? {
        let id = get(&row, "id");
        if id.is_empty() {
            continue;
        }
        if tables.iter().any(|t| t.id == id) {
            return Err(DefinitionError::Duplicate {
                kind: "table",
                key: id,
            });
        }
        tables.push(TableDefinition {
            id,
            name: get(&row, "name"),
            values: Vec::new(),
        });
    }

    let mut values: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
    for row in read_csv_rows(values_path)? {
        let table = get(&row, "table");
        let code = get(&row, "code");
        if table.is_empty() || code.is_empty() {
            continue;
        }
        let entries = values.entry(table.clone()).or_default();
        if entries.iter().any(|(existing, _)| *existing == code) {
            return Err(DefinitionError::Duplicate {
                kind: "table value",
                key: format!("{table}/{code}"),
            });
        }
        entries.push((code, get(&row, "display")));
    }

    for table in &mut tables {
        let Some(entries) = values.remove(&table.id) else {
            return Err(invalid(
                "table",
                tables_path,
                format!("table {} has no values", table.id),
            ));
        };
        table.values = entries;
    }

    if let Some(orphan) = values.keys().next() {
        return Err(DefinitionError::DanglingReference {
            from: format!("values for table {orphan}"),
            kind: "table",
            to: orphan.clone(),
        });
    }

    Ok(tables)
}

pub(crate) fn parse_structures(
    path: &Path,
) -> Result<Vec<MessageStructure>, DefinitionError> {
    let mut grouped: BTreeMap<String, Vec<(u16, SegmentEntry)>> = BTreeMap::new();
    for row in read_csv_rows(path)? {
        let message_type = get(&row, "message_type");
        if message_type.is_empty() {
            continue;
        }
        let position = parse_position(&get(&row, "position"), "structure", path)?;
        let min: u16 = get(&row, "min").parse().map_err(|_| {
            invalid("structure", path, format!("{message_type}: min must be a number"))
        })?;
        let max: u16 = get(&row, "max").parse().map_err(|_| {
            invalid("structure", path, format!("{message_type}: max must be a number"))
        })?;
        if min > max || max == 0 {
            return Err(DefinitionError::InvalidCardinality {
                path: format!("{message_type} entry {position}"),
                message: format!("invalid segment cardinality {min}..{max}"),
            });
        }
        grouped.entry(message_type).or_default().push((
            position,
            SegmentEntry {
                segment: get(&row, "segment").to_ascii_uppercase(),
                min,
                max,
            },
        ));
    }

    let mut structures = Vec::new();
    for (message_type, mut entries) in grouped {
        entries.sort_by_key(|(position, _)| *position);
        for (index, (position, _)) in entries.iter().enumerate() {
            let expected = index as u16 + 1;
            if *position != expected {
                return Err(invalid(
                    "structure",
                    path,
                    format!(
                        "{message_type} positions must be contiguous: expected {expected}, found {position}"
                    ),
                ));
            }
        }
        let entries: Vec<SegmentEntry> = entries.into_iter().map(|(_, entry)| entry).collect();
        match entries.first() {
            Some(first) if first.segment == "MSH" && first.min == 1 && first.max == 1 => {}
            _ => {
                return Err(invalid(
                    "structure",
                    path,
                    format!("{message_type} must start with exactly one MSH"),
                ));
            }
        }
        structures.push(MessageStructure {
            message_type,
            entries,
        });
    }

    Ok(structures)
}
