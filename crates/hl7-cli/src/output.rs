//! Table and report rendering for the terminal.

use comfy_table::{ContentArrangement, Table, presets};

use hl7_model::{DeltaKind, FieldDelta, Severity, ValidationReport};
use hl7_session::Session;
use hl7_standards::{Registry, RegistrySummary};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(presets::UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

pub fn render_report(report: &ValidationReport) -> String {
    let mut out = String::new();
    if report.findings.is_empty() {
        out.push_str(&format!(
            "{}: no findings, message is valid\n",
            report.message_type
        ));
        return out;
    }

    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec!["Severity", "Location", "Kind", "Detail"]);
    for finding in &report.findings {
        let severity = match finding.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        table.add_row(vec![
            severity.to_string(),
            finding.path.clone(),
            format!("{:?}", finding.kind),
            finding.message.clone(),
        ]);
    }
    out.push_str(&table.to_string());
    out.push('\n');
    out.push_str(&format!(
        "{} error(s), {} warning(s)\n",
        report.error_count(),
        report.warning_count()
    ));
    out
}

pub fn render_deltas(deltas: &[FieldDelta], include_unchanged: bool) -> String {
    let mut lines = Vec::new();
    for delta in deltas {
        match &delta.kind {
            DeltaKind::Unchanged => {
                if include_unchanged {
                    lines.push(format!("  {}: unchanged", delta.path));
                }
            }
            DeltaKind::Changed { old, new } => {
                lines.push(format!("~ {}: '{}' -> '{}'", delta.path, old, new));
            }
            DeltaKind::AddedInB { value } => {
                lines.push(format!("+ {}: '{}'", delta.path, value));
            }
            DeltaKind::RemovedFromB { value } => {
                lines.push(format!("- {}: '{}'", delta.path, value));
            }
        }
    }
    if lines.is_empty() {
        lines.push("messages are identical".to_string());
    }
    lines.join("\n") + "\n"
}

pub fn session_table(sessions: &[Session], current: Option<&str>) -> Table {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec!["", "Name", "Kind", "Locks", "Last activity"]);
    for session in sessions {
        let marker = if current == Some(session.name.as_str()) {
            "*"
        } else {
            ""
        };
        let kind = if session.is_temporary() {
            "temporary"
        } else {
            "permanent"
        };
        table.add_row(vec![
            marker.to_string(),
            session.name.clone(),
            kind.to_string(),
            session.locks.len().to_string(),
            session.last_activity.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table
}

pub fn segment_table(registry: &Registry) -> Table {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec!["Segment", "Name", "Fields"]);
    for code in registry.segment_codes() {
        if let Some(segment) = registry.segment(code) {
            table.add_row(vec![
                segment.code.clone(),
                segment.name.clone(),
                segment.fields.len().to_string(),
            ]);
        }
    }
    table
}

pub fn summary_table(summary: &RegistrySummary) -> Table {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.add_row(vec!["Standard".to_string(), summary.standard.clone()]);
    table.add_row(vec!["Version".to_string(), summary.version.clone()]);
    table.add_row(vec![
        "Directory".to_string(),
        summary.standards_dir.display().to_string(),
    ]);
    table.add_row(vec!["Files".to_string(), summary.file_count.to_string()]);
    table.add_row(vec![
        "Segments".to_string(),
        summary.segment_count.to_string(),
    ]);
    table.add_row(vec!["Fields".to_string(), summary.field_count.to_string()]);
    table.add_row(vec![
        "Data types".to_string(),
        summary.data_type_count.to_string(),
    ]);
    table.add_row(vec!["Tables".to_string(), summary.table_count.to_string()]);
    table.add_row(vec![
        "Message types".to_string(),
        summary.structure_count.to_string(),
    ]);
    table.add_row(vec![
        "Vendor overlays".to_string(),
        summary.vendor_count.to_string(),
    ]);
    table
}
