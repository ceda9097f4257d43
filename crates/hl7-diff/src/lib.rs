//! Structural message comparison.
//!
//! [`DiffEngine::diff`] walks both messages in *definition* order
//! (registry segment order, then field position, then repetition index),
//! never insertion order, so the produced deltas are stable and comparable
//! across runs. Segment instances pair up by (code, occurrence index);
//! repetition-count differences surface as one added/removed entry per
//! extra repetition rather than a single changed-count entry.

use hl7_model::{DeltaKind, FieldDelta, FieldInstance, Message, SegmentInstance};
use hl7_standards::Registry;

pub struct DiffEngine<'a> {
    registry: &'a Registry,
}

impl<'a> DiffEngine<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    pub fn diff(&self, a: &Message, b: &Message) -> Vec<FieldDelta> {
        let mut deltas = Vec::new();

        for code in self.traversal_order(a, b) {
            let a_instances: Vec<&SegmentInstance> = a.segments_with_code(&code).collect();
            let b_instances: Vec<&SegmentInstance> = b.segments_with_code(&code).collect();
            let total = a_instances.len().max(b_instances.len());

            for occurrence in 0..total {
                let label = segment_label(&code, occurrence, total);
                let field_count = self.field_count(&code, a_instances.get(occurrence).copied(), b_instances.get(occurrence).copied());
                for position in 1..=field_count {
                    diff_field(
                        &label,
                        position,
                        a_instances.get(occurrence).and_then(|s| s.field(position)),
                        b_instances.get(occurrence).and_then(|s| s.field(position)),
                        &mut deltas,
                    );
                }
            }
        }

        deltas
    }

    /// Registry segment order first; unknown codes afterwards in first
    /// appearance order.
    fn traversal_order(&self, a: &Message, b: &Message) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        for code in self.registry.segment_codes() {
            if a.segments_with_code(code).next().is_some()
                || b.segments_with_code(code).next().is_some()
            {
                order.push(code.clone());
            }
        }
        for segment in a.segments.iter().chain(b.segments.iter()) {
            if self.registry.segment(&segment.code).is_none()
                && !order.contains(&segment.code)
            {
                order.push(segment.code.clone());
            }
        }
        order
    }

    fn field_count(
        &self,
        code: &str,
        a: Option<&SegmentInstance>,
        b: Option<&SegmentInstance>,
    ) -> u16 {
        let defined = self
            .registry
            .segment(code)
            .map(|definition| definition.fields.len())
            .unwrap_or(0);
        let present = a
            .map(|s| s.fields.len())
            .unwrap_or(0)
            .max(b.map(|s| s.fields.len()).unwrap_or(0));
        defined.max(present) as u16
    }
}

fn diff_field(
    segment_label: &str,
    position: u16,
    a: Option<&FieldInstance>,
    b: Option<&FieldInstance>,
    deltas: &mut Vec<FieldDelta>,
) {
    let empty: &[hl7_model::Repetition] = &[];
    let a_reps = a.map_or(empty, |f| f.repetitions.as_slice());
    let b_reps = b.map_or(empty, |f| f.repetitions.as_slice());
    let total = a_reps.len().max(b_reps.len());

    for index in 0..total {
        let a_value = a_reps.get(index).map(hl7_model::Repetition::flatten);
        let b_value = b_reps.get(index).map(hl7_model::Repetition::flatten);
        let a_value = a_value.filter(|v| !v.is_empty());
        let b_value = b_value.filter(|v| !v.is_empty());

        let kind = match (a_value, b_value) {
            (None, None) => continue,
            (Some(old), Some(new)) if old == new => DeltaKind::Unchanged,
            (Some(old), Some(new)) => DeltaKind::Changed { old, new },
            (None, Some(value)) => DeltaKind::AddedInB { value },
            (Some(value), None) => DeltaKind::RemovedFromB { value },
        };
        let path = if total > 1 {
            format!("{segment_label}.{position}[{}]", index + 1)
        } else {
            format!("{segment_label}.{position}")
        };
        deltas.push(FieldDelta { path, kind });
    }
}

fn segment_label(code: &str, occurrence: usize, total: usize) -> String {
    if total > 1 {
        format!("{code}[{}]", occurrence + 1)
    } else {
        code.to_string()
    }
}
