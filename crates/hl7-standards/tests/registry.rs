use hl7_model::{DataTypeKind, FieldPath, Usage};
use hl7_standards::load_default_registry;

#[test]
fn loads_shipped_standards() {
    let registry = load_default_registry().expect("load registry");
    let summary = registry.summary();
    assert_eq!(summary.standard, "hl7v2");
    assert_eq!(summary.version, "2.5.1");
    assert!(summary.segment_count >= 10);
    assert!(summary.table_count >= 30);
    assert!(summary.vendor_count >= 2);

    let pid = registry.segment("PID").expect("PID segment");
    assert_eq!(pid.fields.len(), 19);

    let sex = registry.field(&FieldPath::field("PID", 8)).expect("PID.8");
    assert_eq!(sex.usage, Usage::Required);
    assert_eq!(sex.table.as_deref(), Some("0001"));

    let table = registry
        .slot_table(sex, None)
        .expect("administrative sex table");
    assert!(table.contains("F"));
    assert!(table.contains("M"));
    assert!(!table.contains("Q"));
}

#[test]
fn component_index_covers_nested_composites() {
    let registry = load_default_registry().expect("load registry");

    let identifier = registry
        .field(&FieldPath::field("PID", 3))
        .expect("PID.3 definition");
    assert_eq!(identifier.data_type, "CX");
    assert_eq!(identifier.max, 3);

    let components = registry.components(&FieldPath::field("PID", 3));
    assert_eq!(components.len(), 5);
    assert_eq!(components[3].data_type, "HD");

    let authority = registry
        .component(&FieldPath::component("PID", 3, 4))
        .expect("CX assigning authority component");
    assert_eq!(authority.name, "Assigning Authority");
    assert!(
        registry
            .data_type(&authority.data_type)
            .is_some_and(|t| t.kind == DataTypeKind::Composite)
    );
}

#[test]
fn structures_and_vendors_resolve() {
    let registry = load_default_registry().expect("load registry");

    let adt = registry.structure("ADT^A01").expect("ADT^A01 structure");
    assert_eq!(adt.entries[0].segment, "MSH");
    assert!(adt.entries.iter().any(|e| e.segment == "PID"));

    assert!(registry.structure("SIU^S12").is_none());

    let vendor = registry.vendor("meridian").expect("meridian overlay");
    let adt_constraints: Vec<_> = vendor.constraints_for("ADT^A01").collect();
    assert!(adt_constraints.len() >= 2);
    // The wildcard MSH.11 constraint applies to every message type.
    assert!(
        vendor
            .constraints_for("ORU^R01")
            .any(|c| c.path == FieldPath::field("MSH", 11))
    );
}

#[test]
fn coded_fields_reference_tables_with_unique_codes() {
    let registry = load_default_registry().expect("load registry");
    let table = registry.table("0001").expect("table 0001");
    let mut codes: Vec<&str> = table.codes().collect();
    let total = codes.len();
    codes.sort_unstable();
    codes.dedup();
    assert_eq!(codes.len(), total, "codes must be unique within a table");
}
