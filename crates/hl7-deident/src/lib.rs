//! De-identification.
//!
//! [`Deidentifier::deidentify`] walks a message in definition order and
//! replaces every PHI-flagged slot through the fallback provider. A
//! per-run identity map keyed by `(PHI category, original value)`
//! guarantees that one original value maps to one replacement everywhere
//! in the run (a patient's MRN appearing in two segments stays
//! referentially consistent) while a different run seed yields different
//! replacements. Non-PHI fields are never touched, so the operation is
//! idempotent outside the flagged slots.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::NaiveDateTime;
use tracing::debug;

use hl7_datagen::{FallbackSource, FieldSlot, GenContext, ValueSource};
use hl7_model::{FieldDefinition, Message, PhiCategory, SegmentInstance};
use hl7_standards::Registry;

pub struct Deidentifier<'a> {
    registry: &'a Registry,
    source: FallbackSource,
}

impl<'a> Deidentifier<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            source: FallbackSource::new(),
        }
    }

    /// Produce a de-identified copy. `seed` scopes the identity map to this
    /// run; `now` anchors replacement dates.
    pub fn deidentify(&self, message: &Message, seed: u64, now: NaiveDateTime) -> Message {
        let message_type = message.message_type().unwrap_or_default();
        let ctx = GenContext::new(message_type, String::new(), seed, now);
        let mut identity: HashMap<(PhiCategory, String), String> = HashMap::new();

        let mut output = message.clone();
        let mut replaced = 0usize;
        for segment in &mut output.segments {
            replaced += self.rewrite_segment(segment, &ctx, &mut identity);
        }
        debug!(replaced, distinct = identity.len(), "de-identified message");
        output
    }

    fn rewrite_segment(
        &self,
        segment: &mut SegmentInstance,
        ctx: &GenContext,
        identity: &mut HashMap<(PhiCategory, String), String>,
    ) -> usize {
        // Unknown segments carry no definitions, so nothing is rewritten;
        // the validator is where they get flagged.
        let Some(definition) = self.registry.segment(&segment.code) else {
            return 0;
        };

        let mut replaced = 0usize;
        for field in &definition.fields {
            let Some(category) = field.phi else {
                continue;
            };
            let Some(instance) = segment.fields.get_mut(usize::from(field.path.field) - 1) else {
                continue;
            };
            for repetition in &mut instance.repetitions {
                for (index, value) in repetition.components.iter_mut().enumerate() {
                    if value.is_empty() {
                        continue;
                    }
                    let position = index as u16 + 1;
                    if let Some(replacement) =
                        self.replace(field, position, category, value, ctx, identity)
                    {
                        *value = replacement;
                        replaced += 1;
                    }
                }
            }
        }
        replaced
    }

    /// Replacement for one component value, memoized per
    /// `(category, original)` so repeated originals stay consistent.
    fn replace(
        &self,
        field: &FieldDefinition,
        position: u16,
        category: PhiCategory,
        original: &str,
        ctx: &GenContext,
        identity: &mut HashMap<(PhiCategory, String), String>,
    ) -> Option<String> {
        let key = (category, original.to_string());
        if let Some(existing) = identity.get(&key) {
            return Some(existing.clone());
        }

        let field_type = self.registry.data_type(&field.data_type)?;
        let (path, name, data_type, table) = if field_type.is_composite() {
            let component = self
                .registry
                .component(&hl7_model::FieldPath::component(
                    &field.path.segment,
                    field.path.field,
                    position,
                ))?;
            let component_type = self.registry.data_type(&component.data_type)?;
            // Nested composites under a PHI field (an assigning authority
            // inside a patient identifier) are structural and stay as-is.
            if component_type.is_composite() {
                return None;
            }
            let table = self.registry.slot_table(field, Some(position));
            (&component.path, component.name.as_str(), component_type, table)
        } else {
            if position > 1 {
                return None;
            }
            let table = self.registry.slot_table(field, None);
            (&field.path, field.name.as_str(), field_type, table)
        };

        let slot = FieldSlot {
            path,
            name,
            data_type,
            table,
            phi: Some(category),
            // Salt the draw with the original value so distinct originals
            // land on distinct replacements within the run.
            segment_occurrence: value_salt(original),
            repetition: 0,
        };
        let replacement = self
            .source
            .provide(&slot, ctx)
            .map(hl7_datagen::Value::into_string)
            .ok()?;
        identity.insert(key, replacement.clone());
        Some(replacement)
    }
}

fn value_salt(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
