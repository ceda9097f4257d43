use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};

use hl7_assemble::{AssembleOptions, Assembler};
use hl7_datagen::FallbackSource;
use hl7_model::{FieldPath, Message};
use hl7_standards::load_default_registry;

fn anchor() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 15)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap()
}

fn assemble(message_type: &str, seed: u64, locks: BTreeMap<FieldPath, String>) -> Message {
    let registry = load_default_registry().expect("registry");
    let source = FallbackSource::new();
    let assembler = Assembler::new(&registry, &source);
    let options = AssembleOptions::new("DEMO_HOSPITAL", seed, anchor()).with_locks(locks);
    assembler
        .assemble(message_type, &options)
        .expect("assemble message")
}

#[test]
fn adt_a01_has_required_identification_fields() {
    let message = assemble("ADT^A01", 11, BTreeMap::new());

    assert_eq!(message.segments[0].code, "MSH");
    let registry = load_default_registry().expect("registry");

    // Identifier, name, date of birth, administrative sex all present.
    assert!(message.first_value(&FieldPath::field("PID", 3)).is_some());
    assert!(message.first_value(&FieldPath::field("PID", 5)).is_some());
    assert!(message.first_value(&FieldPath::field("PID", 7)).is_some());
    let sex = message
        .first_value(&FieldPath::field("PID", 8))
        .expect("administrative sex");
    let table = registry.table("0001").expect("table 0001");
    assert!(table.contains(&sex));

    // Header fields owned by the assembly context.
    assert_eq!(
        message.first_value(&FieldPath::field("MSH", 4)),
        Some("DEMO_HOSPITAL".to_string())
    );
    assert_eq!(
        message.first_value(&FieldPath::field("MSH", 12)),
        Some("2.5.1".to_string())
    );
    assert_eq!(message.message_type(), Some("ADT^A01".to_string()));
}

#[test]
fn assembly_is_deterministic_for_a_seed() {
    let first = assemble("ORU^R01", 99, BTreeMap::new());
    let second = assemble("ORU^R01", 99, BTreeMap::new());
    assert_eq!(first, second);

    let different = assemble("ORU^R01", 100, BTreeMap::new());
    assert_ne!(first, different);
}

#[test]
fn locked_field_is_used_verbatim_across_generations() {
    let mut locks = BTreeMap::new();
    locks.insert(FieldPath::field("PID", 3), "TEST-001".to_string());

    for seed in [1, 2, 3] {
        let message = assemble("ADT^A01", seed, locks.clone());
        assert_eq!(
            message.first_value(&FieldPath::field("PID", 3)),
            Some("TEST-001".to_string())
        );
    }
}

#[test]
fn locked_component_forces_field_presence() {
    // PID.11 is optional; a component lock must still force it into the
    // message with the locked city in place.
    let mut locks = BTreeMap::new();
    locks.insert(FieldPath::component("PID", 11, 3), "Springfield".to_string());

    let message = assemble("ADT^A01", 4, locks);
    assert_eq!(
        message.first_value(&FieldPath::component("PID", 11, 3)),
        Some("Springfield".to_string())
    );
}

#[test]
fn set_id_fields_number_segment_occurrences() {
    let message = assemble("ORU^R01", 404, BTreeMap::new());
    let set_ids: Vec<String> = message
        .segments_with_code("OBX")
        .filter_map(|segment| {
            segment
                .field(1)
                .and_then(|f| f.first())
                .and_then(|rep| rep.component(1))
                .map(ToString::to_string)
        })
        .collect();
    let expected: Vec<String> = (1..=set_ids.len()).map(|n| n.to_string()).collect();
    assert_eq!(set_ids, expected);
}

#[test]
fn units_follow_numeric_value_types() {
    // Across a spread of seeds, every OBX with a non-numeric value type
    // must omit units, and numeric ones must carry them.
    for seed in 0..40u64 {
        let message = assemble("ORU^R01", seed, BTreeMap::new());
        for segment in message.segments_with_code("OBX") {
            let value_type = segment
                .field(2)
                .and_then(|f| f.first())
                .and_then(|rep| rep.component(1))
                .unwrap_or_default()
                .to_string();
            let has_units = segment.field(6).is_some_and(|f| f.is_present());
            if matches!(value_type.as_str(), "NM" | "SN") {
                assert!(has_units, "seed {seed}: numeric OBX missing units");
            } else {
                assert!(!has_units, "seed {seed}: non-numeric OBX carries units");
            }
        }
    }
}

#[test]
fn repeated_generation_respects_structure_cardinality() {
    let registry = load_default_registry().expect("registry");
    let structure = registry.structure("ORU^R01").expect("structure");
    let obx = structure
        .entries
        .iter()
        .find(|e| e.segment == "OBX")
        .expect("OBX entry");

    for seed in 0..20u64 {
        let message = assemble("ORU^R01", seed, BTreeMap::new());
        let count = message.segments_with_code("OBX").count() as u16;
        assert!(count >= obx.min && count <= obx.max);
        assert_eq!(message.segments_with_code("MSH").count(), 1);
        assert_eq!(message.segments_with_code("PID").count(), 1);
    }
}

#[test]
fn unknown_message_type_is_rejected() {
    let registry = load_default_registry().expect("registry");
    let source = FallbackSource::new();
    let assembler = Assembler::new(&registry, &source);
    let options = AssembleOptions::new("DEMO_HOSPITAL", 1, anchor());
    assert!(assembler.assemble("SIU^S12", &options).is_err());
}
