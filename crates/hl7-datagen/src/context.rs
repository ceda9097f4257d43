use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::NaiveDateTime;
use rand::SeedableRng;
use rand::rngs::StdRng;

use hl7_model::{DataTypeDefinition, FieldPath, PhiCategory, TableDefinition};

/// A produced slot value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value(pub String);

impl Value {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Leaf view of the slot being filled: a primitive field, or one component
/// of a composite field. Composite fields are never passed to a provider
/// directly; the assembler builds them bottom-up from their leaves.
#[derive(Debug, Clone, Copy)]
pub struct FieldSlot<'a> {
    pub path: &'a FieldPath,
    pub name: &'a str,
    pub data_type: &'a DataTypeDefinition,
    pub table: Option<&'a TableDefinition>,
    pub phi: Option<PhiCategory>,
    /// Index of the owning segment instance among same-code segments (or a
    /// value-derived salt during de-identification). Slots of one segment
    /// instance share it, so sibling fields can correlate their samples.
    pub segment_occurrence: u64,
    /// Repetition index within the field, disambiguating repeated draws.
    pub repetition: u64,
}

/// Coarse patient age band; bounds the synthesized date of birth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgeBand {
    Neonate,
    Pediatric,
    #[default]
    Adult,
    Geriatric,
}

impl AgeBand {
    /// Inclusive age range in years.
    pub fn years(self) -> (u32, u32) {
        match self {
            AgeBand::Neonate => (0, 1),
            AgeBand::Pediatric => (1, 17),
            AgeBand::Adult => (18, 64),
            AgeBand::Geriatric => (65, 94),
        }
    }
}

/// Generation context shared by every slot of one assembly or
/// de-identification run.
///
/// `assigned` records first-component values already placed in the message,
/// in definition order, so later slots can stay consistent with earlier
/// siblings (a patient's administrative sex drives name selection).
#[derive(Debug, Clone)]
pub struct GenContext {
    pub message_type: String,
    pub facility: String,
    pub age_band: AgeBand,
    pub seed: u64,
    /// Wall-clock anchor for synthesized dates; fixed by the caller so the
    /// provider itself stays pure.
    pub now: NaiveDateTime,
    assigned: BTreeMap<FieldPath, String>,
}

impl GenContext {
    pub fn new(
        message_type: impl Into<String>,
        facility: impl Into<String>,
        seed: u64,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            message_type: message_type.into(),
            facility: facility.into(),
            age_band: AgeBand::default(),
            seed,
            now,
            assigned: BTreeMap::new(),
        }
    }

    pub fn with_age_band(mut self, age_band: AgeBand) -> Self {
        self.age_band = age_band;
        self
    }

    /// Record a placed value so later slots can read it.
    pub fn assign(&mut self, path: FieldPath, value: impl Into<String>) {
        self.assigned.insert(path, value.into());
    }

    pub fn assigned(&self, path: &FieldPath) -> Option<&str> {
        self.assigned.get(path).map(String::as_str)
    }

    /// Deterministic RNG for one slot: the same (seed, path, segment
    /// occurrence, repetition) always draws the same sample.
    pub fn rng_for(&self, path: &FieldPath, segment_occurrence: u64, repetition: u64) -> StdRng {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        path.segment.hash(&mut hasher);
        path.field.hash(&mut hasher);
        path.component.hash(&mut hasher);
        segment_occurrence.hash(&mut hasher);
        repetition.hash(&mut hasher);
        StdRng::seed_from_u64(hasher.finish())
    }

    /// RNG keyed by the parent field only (component index and repetition
    /// dropped), shared by all components of one composite value. Lets
    /// paired components (a code and its display text) draw from the same
    /// dataset row.
    pub fn rng_for_parent(&self, path: &FieldPath, segment_occurrence: u64) -> StdRng {
        self.rng_for(&path.parent_field(), segment_occurrence, 0)
    }
}
