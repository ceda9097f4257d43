//! Message assembly.
//!
//! [`Assembler::assemble`] walks the message structure for a type, decides
//! presence and repetition counts per field, and fills every slot from the
//! session locks or the [`ValueSource`]. Composite values are built
//! bottom-up: leaf components first, nested composites collapsed to their
//! required leaves. Given the same registry, seed, locks, and clock anchor
//! the result is identical, so a session that locks every exercised path
//! replays exactly.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rand::Rng;
use rand::rngs::StdRng;
use tracing::debug;

use hl7_datagen::{AgeBand, FieldSlot, GenContext, ProviderError, ValueSource};
use hl7_model::{
    ComponentDefinition, FieldDefinition, FieldInstance, FieldPath, Message, Repetition,
    SegmentInstance, Separators, Usage,
};
use hl7_standards::Registry;

/// Repetition index reserved for structural draws (presence, counts) so
/// they never collide with value draws.
const STRUCTURAL_SALT: u64 = u64::MAX;

/// Probability that a populated message carries a given optional field.
const OPTIONAL_FIELD_PROBABILITY: f64 = 0.6;

/// Probability that an optional component of a composite is filled.
const OPTIONAL_COMPONENT_PROBABILITY: f64 = 0.35;

#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("unknown message type '{0}'")]
    UnknownMessageType(String),

    #[error("registry is missing segment '{0}'")]
    MissingSegment(String),

    #[error("registry is missing data type '{0}'")]
    MissingDataType(String),

    #[error("value provider failed for {path}: {source}")]
    Provider {
        path: String,
        #[source]
        source: ProviderError,
    },
}

/// Everything an assembly run needs besides the message type. The seed and
/// clock anchor are explicit so callers control determinism; locks come
/// from the active session, already resolved to a flat map.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub facility: String,
    pub age_band: AgeBand,
    pub seed: u64,
    pub now: NaiveDateTime,
    pub locks: BTreeMap<FieldPath, String>,
}

impl AssembleOptions {
    pub fn new(facility: impl Into<String>, seed: u64, now: NaiveDateTime) -> Self {
        Self {
            facility: facility.into(),
            age_band: AgeBand::default(),
            seed,
            now,
            locks: BTreeMap::new(),
        }
    }

    pub fn with_locks(mut self, locks: BTreeMap<FieldPath, String>) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_age_band(mut self, age_band: AgeBand) -> Self {
        self.age_band = age_band;
        self
    }
}

pub struct Assembler<'a> {
    registry: &'a Registry,
    source: &'a dyn ValueSource,
}

impl<'a> Assembler<'a> {
    pub fn new(registry: &'a Registry, source: &'a dyn ValueSource) -> Self {
        Self { registry, source }
    }

    pub fn assemble(
        &self,
        message_type: &str,
        options: &AssembleOptions,
    ) -> Result<Message, AssembleError> {
        let structure = self
            .registry
            .structure(message_type)
            .ok_or_else(|| AssembleError::UnknownMessageType(message_type.to_string()))?;

        let mut ctx = GenContext::new(message_type, options.facility.clone(), options.seed, options.now)
            .with_age_band(options.age_band);
        self.preassign_administrative_sex(structure, &mut ctx, options);
        let mut message = Message::new();

        for entry in &structure.entries {
            let count = if entry.min == entry.max {
                entry.min
            } else {
                let mut rng = segment_count_rng(&ctx, &entry.segment);
                rng.gen_range(entry.min..=entry.max)
            };
            for occurrence in 0..count {
                let segment =
                    self.assemble_segment(&entry.segment, u64::from(occurrence), &mut ctx, options)?;
                message.segments.push(segment);
            }
        }

        debug!(message_type, segments = message.segments.len(), "assembled message");
        Ok(message)
    }

    /// Patient name components precede the administrative sex field in PID,
    /// but their samples depend on it. Drawing the sex before the walk lets
    /// name slots read a consistent value from the context.
    fn preassign_administrative_sex(
        &self,
        structure: &hl7_model::MessageStructure,
        ctx: &mut GenContext,
        options: &AssembleOptions,
    ) {
        if !structure.entries.iter().any(|e| e.segment == "PID") {
            return;
        }
        let path = FieldPath::field("PID", 8);
        if let Some(locked) = options.locks.get(&path) {
            let first = locked.split('^').next().unwrap_or_default().to_string();
            ctx.assign(path, first);
            return;
        }
        let Some(field) = self.registry.field(&path) else {
            return;
        };
        let Some(table) = self.registry.slot_table(field, None) else {
            return;
        };
        let mut rng = ctx.rng_for(&path, 0, 0);
        let codes: Vec<&str> = table.codes().collect();
        let code = codes[rng.gen_range(0..codes.len())].to_string();
        ctx.assign(path, code);
    }

    fn assemble_segment(
        &self,
        code: &str,
        occurrence: u64,
        ctx: &mut GenContext,
        options: &AssembleOptions,
    ) -> Result<SegmentInstance, AssembleError> {
        let definition = self
            .registry
            .segment(code)
            .ok_or_else(|| AssembleError::MissingSegment(code.to_string()))?;

        let mut instance = SegmentInstance::new(code);
        for field in &definition.fields {
            let built = self.assemble_field(field, occurrence, ctx, options)?;
            if let Some(field_instance) = built {
                if let Some(first) = field_instance.first() {
                    if let Some(component) = first.component(1) {
                        ctx.assign(field.path.clone(), component);
                    }
                }
                instance.set_field(field.path.field, field_instance);
            }
        }
        Ok(instance)
    }

    fn assemble_field(
        &self,
        field: &FieldDefinition,
        occurrence: u64,
        ctx: &mut GenContext,
        options: &AssembleOptions,
    ) -> Result<Option<FieldInstance>, AssembleError> {
        if field.path.segment == "MSH" {
            if let Some(value) = self.header_value(field, ctx, options) {
                return Ok(Some(value));
            }
        }

        let locked = self.lock_for(field, options);

        if let Some(LockKind::Field(value)) = &locked {
            let components = value.split('^').map(ToString::to_string).collect();
            return Ok(Some(FieldInstance {
                repetitions: vec![Repetition::composite(components)],
            }));
        }

        // Set ID fields number segment occurrences; they are structural
        // and always placed, never sampled.
        if field.data_type == "SI" && field.name.starts_with("Set ID") {
            return Ok(Some(FieldInstance::single((occurrence + 1).to_string())));
        }

        let present = locked.is_some()
            || match &field.usage {
                Usage::Required => true,
                Usage::Optional => {
                    let mut rng = ctx.rng_for(&field.path, occurrence, STRUCTURAL_SALT);
                    rng.gen_bool(OPTIONAL_FIELD_PROBABILITY)
                }
                Usage::Conditional(condition) => {
                    condition.holds(|path| ctx.assigned(path).map(ToString::to_string))
                }
            };
        if !present {
            return Ok(None);
        }

        // Administrative sex was drawn up front so earlier name fields could
        // read it; place the planned value rather than sampling again.
        if field.path == FieldPath::field("PID", 8) {
            if let Some(value) = ctx.assigned(&field.path) {
                return Ok(Some(FieldInstance::single(value.to_string())));
            }
        }

        let repetitions = if field.max == 1 {
            1
        } else {
            let mut rng = ctx.rng_for(&field.path, occurrence, STRUCTURAL_SALT - 1);
            rng.gen_range(field.min.max(1)..=field.max)
        };

        let mut built = Vec::with_capacity(usize::from(repetitions));
        for repetition in 0..u64::from(repetitions) {
            built.push(self.build_repetition(field, occurrence, repetition, ctx, options)?);
        }
        Ok(Some(FieldInstance { repetitions: built }))
    }

    /// MSH fields the codec or assembly context owns outright. Everything
    /// else in MSH goes through the provider like any other field.
    fn header_value(
        &self,
        field: &FieldDefinition,
        ctx: &GenContext,
        options: &AssembleOptions,
    ) -> Option<FieldInstance> {
        let separators = Separators::default();
        match field.path.field {
            1 => Some(FieldInstance::single(separators.field.to_string())),
            2 => Some(FieldInstance::single(separators.encoding_characters())),
            4 => Some(FieldInstance::single(options.facility.clone())),
            7 => Some(FieldInstance::single(
                options.now.format("%Y%m%d%H%M%S").to_string(),
            )),
            9 => {
                let (code, trigger) = ctx.message_type.split_once('^')?;
                Some(FieldInstance {
                    repetitions: vec![Repetition::composite(vec![
                        code.to_string(),
                        trigger.to_string(),
                        ctx.message_type.replace('^', "_"),
                    ])],
                })
            }
            10 => {
                let mut rng = ctx.rng_for(&field.path, 0, 0);
                Some(FieldInstance::single(format!(
                    "MSG{:08}",
                    rng.gen_range(0..100_000_000u32)
                )))
            }
            11 => Some(FieldInstance::single("T")),
            12 => Some(FieldInstance::single(self.registry.version())),
            _ => None,
        }
    }

    fn build_repetition(
        &self,
        field: &FieldDefinition,
        occurrence: u64,
        repetition: u64,
        ctx: &GenContext,
        options: &AssembleOptions,
    ) -> Result<Repetition, AssembleError> {
        let data_type = self
            .registry
            .data_type(&field.data_type)
            .ok_or_else(|| AssembleError::MissingDataType(field.data_type.clone()))?;

        if !data_type.is_composite() {
            let slot = FieldSlot {
                path: &field.path,
                name: &field.name,
                data_type,
                table: self.registry.slot_table(field, None),
                phi: field.phi,
                segment_occurrence: occurrence,
                repetition,
            };
            let value = self.provide(&slot, ctx)?;
            return Ok(Repetition::single(value));
        }

        let components = self.registry.components(&field.path);
        let mut values = Vec::with_capacity(components.len());
        for component in components {
            let Some(position) = component.path.component else {
                continue;
            };
            let locked = options.locks.get(&component.path).cloned();
            let fill = locked.is_some() || component.required || {
                let mut rng = ctx.rng_for(&component.path, occurrence, STRUCTURAL_SALT);
                rng.gen_bool(OPTIONAL_COMPONENT_PROBABILITY)
            };
            if !fill {
                values.push(String::new());
                continue;
            }
            if let Some(value) = locked {
                values.push(value);
                continue;
            }
            values.push(self.build_component(
                field, component, position, occurrence, repetition, ctx,
            )?);
        }
        while values.last().is_some_and(String::is_empty) {
            values.pop();
        }
        Ok(Repetition::composite(values))
    }

    /// Build one component value, collapsing nested composites (an HD
    /// inside a CX) to their required leaves joined as subcomponents.
    fn build_component(
        &self,
        field: &FieldDefinition,
        component: &ComponentDefinition,
        position: u16,
        occurrence: u64,
        repetition: u64,
        ctx: &GenContext,
    ) -> Result<String, AssembleError> {
        let data_type = self
            .registry
            .data_type(&component.data_type)
            .ok_or_else(|| AssembleError::MissingDataType(component.data_type.clone()))?;

        if !data_type.is_composite() {
            let slot = FieldSlot {
                path: &component.path,
                name: &component.name,
                data_type,
                table: self.registry.slot_table(field, Some(position)),
                phi: field.phi,
                segment_occurrence: occurrence,
                repetition,
            };
            return self.provide(&slot, ctx);
        }

        let mut parts = Vec::new();
        for nested in &data_type.components {
            if !nested.required {
                continue;
            }
            let nested_type = self
                .registry
                .data_type(&nested.data_type)
                .ok_or_else(|| AssembleError::MissingDataType(nested.data_type.clone()))?;
            let table = nested.table.as_deref().and_then(|id| self.registry.table(id));
            let slot = FieldSlot {
                path: &component.path,
                name: &nested.name,
                data_type: nested_type,
                table,
                phi: field.phi,
                segment_occurrence: occurrence,
                repetition,
            };
            parts.push(self.provide(&slot, ctx)?);
        }
        Ok(parts.join("&"))
    }

    fn provide(&self, slot: &FieldSlot<'_>, ctx: &GenContext) -> Result<String, AssembleError> {
        self.source
            .provide(slot, ctx)
            .map(hl7_datagen::Value::into_string)
            .map_err(|source| AssembleError::Provider {
                path: slot.path.to_string(),
                source,
            })
    }

    fn lock_for(&self, field: &FieldDefinition, options: &AssembleOptions) -> Option<LockKind> {
        if let Some(value) = options.locks.get(&field.path) {
            return Some(LockKind::Field(value.clone()));
        }
        // A lock on any component also forces the field present.
        let has_component_lock = options
            .locks
            .keys()
            .any(|path| path.component.is_some() && path.parent_field() == field.path);
        has_component_lock.then_some(LockKind::Component)
    }
}

enum LockKind {
    Field(String),
    Component,
}

/// Segment-count draws are keyed by segment code alone so the structure
/// stays stable while field contents vary.
fn segment_count_rng(ctx: &GenContext, segment: &str) -> StdRng {
    ctx.rng_for(&FieldPath::field(segment, 1), STRUCTURAL_SALT, STRUCTURAL_SALT)
}
