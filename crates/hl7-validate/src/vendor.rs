//! Vendor overlay pass. Overlays are additive refinements: each unmet
//! constraint becomes a `vendor-violation` finding on top of whatever the
//! base pass already reported.

use hl7_model::{Finding, FindingKind, Message, ValidationReport, VendorOverlay};
use hl7_standards::Registry;

use crate::field_label;

pub(crate) fn apply(
    registry: &Registry,
    overlay: &VendorOverlay,
    message: &Message,
    message_type: &str,
    report: &mut ValidationReport,
) {
    for constraint in overlay.constraints_for(message_type) {
        let path = &constraint.path;
        if registry.field(&path.parent_field()).is_none() {
            continue;
        }

        let instances: Vec<_> = message.segments_with_code(&path.segment).collect();
        let total = instances.len();

        if instances.is_empty() {
            if constraint.usage.is_some() {
                report.findings.push(Finding::error(
                    path.to_string(),
                    FindingKind::VendorViolation,
                    format!(
                        "{} requires {} but segment {} is absent",
                        overlay.id, path, path.segment
                    ),
                ));
            }
            continue;
        }

        for (occurrence, segment) in instances.iter().enumerate() {
            let label = field_label(&segment.code, occurrence, total, path.field);
            let value = segment
                .field(path.field)
                .and_then(|f| f.first())
                .and_then(|rep| rep.component(path.component.unwrap_or(1)));

            match value {
                None => {
                    if constraint.usage.is_some() {
                        report.findings.push(Finding::error(
                            label,
                            FindingKind::VendorViolation,
                            format!("{} requires {} to be populated", overlay.id, path),
                        ));
                    }
                }
                Some(value) => {
                    if let Some(fixed) = &constraint.fixed {
                        if value != fixed {
                            report.findings.push(Finding::error(
                                label.clone(),
                                FindingKind::VendorViolation,
                                format!(
                                    "{} fixes {} to '{}' but found '{}'",
                                    overlay.id, path, fixed, value
                                ),
                            ));
                        }
                    }
                    if let Some(allowed) = &constraint.allowed {
                        if !allowed.iter().any(|candidate| candidate == value) {
                            report.findings.push(Finding::error(
                                label,
                                FindingKind::VendorViolation,
                                format!(
                                    "{} restricts {} to [{}] but found '{}'",
                                    overlay.id,
                                    path,
                                    allowed.join(", "),
                                    value
                                ),
                            ));
                        }
                    }
                }
            }
        }
    }
}
