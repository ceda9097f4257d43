use hl7_diff::DiffEngine;
use hl7_model::{DeltaKind, FieldDelta};
use hl7_parse::parse;
use hl7_standards::load_default_registry;

const BASE: &str = "MSH|^~\\&|REG|DEMO_HOSPITAL|||20240102030405||ADT^A01|MSG00001|T|2.5.1\r\
                    EVN||20240102030405\r\
                    PID|1||555123||Rivera^Ana||19850201000000|F\r\
                    PV1|1|O\r";

#[test]
fn identical_messages_yield_only_unchanged_entries() {
    let registry = load_default_registry().expect("registry");
    let message = parse(BASE).expect("parse");
    let deltas = DiffEngine::new(&registry).diff(&message, &message);

    assert!(!deltas.is_empty());
    assert!(deltas.iter().all(FieldDelta::is_unchanged));
}

#[test]
fn changed_values_are_reported_with_old_and_new() {
    let registry = load_default_registry().expect("registry");
    let a = parse(BASE).expect("parse a");
    let b = parse(&BASE.replace("Rivera^Ana", "Rivera^Maria")).expect("parse b");

    let deltas = DiffEngine::new(&registry).diff(&a, &b);
    let change = deltas
        .iter()
        .find(|d| !d.is_unchanged())
        .expect("one changed entry");
    assert_eq!(change.path, "PID.5");
    assert_eq!(
        change.kind,
        DeltaKind::Changed {
            old: "Rivera^Ana".to_string(),
            new: "Rivera^Maria".to_string(),
        }
    );
    assert_eq!(deltas.iter().filter(|d| !d.is_unchanged()).count(), 1);
}

#[test]
fn extra_repetitions_surface_individually() {
    let registry = load_default_registry().expect("registry");
    let a = parse(BASE).expect("parse a");
    let b = parse(&BASE.replace("|555123|", "|555123~777888|")).expect("parse b");

    let deltas = DiffEngine::new(&registry).diff(&a, &b);
    let added: Vec<&FieldDelta> = deltas
        .iter()
        .filter(|d| matches!(d.kind, DeltaKind::AddedInB { .. }))
        .collect();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].path, "PID.3[2]");
    assert_eq!(
        added[0].kind,
        DeltaKind::AddedInB {
            value: "777888".to_string()
        }
    );

    // The shared first repetition is unchanged, not re-reported.
    assert!(
        deltas
            .iter()
            .any(|d| d.path == "PID.3[1]" && d.is_unchanged())
    );
}

#[test]
fn segment_missing_from_b_is_removed_field_by_field() {
    let registry = load_default_registry().expect("registry");
    let a = parse(BASE).expect("parse a");
    let without_pv1 = BASE.replace("PV1|1|O\r", "");
    let b = parse(&without_pv1).expect("parse b");

    let deltas = DiffEngine::new(&registry).diff(&a, &b);
    let removed: Vec<&FieldDelta> = deltas
        .iter()
        .filter(|d| matches!(d.kind, DeltaKind::RemovedFromB { .. }))
        .collect();
    assert_eq!(removed.len(), 2, "PV1.1 and PV1.2 are both removed");
    assert!(removed.iter().all(|d| d.path.starts_with("PV1.")));
}

#[test]
fn traversal_follows_definition_order_not_insertion_order() {
    let registry = load_default_registry().expect("registry");
    let a = parse(BASE).expect("parse a");
    let b = parse(BASE).expect("parse b");

    let deltas = DiffEngine::new(&registry).diff(&a, &b);
    let first_pid = deltas.iter().position(|d| d.path.starts_with("PID"));
    let first_msh = deltas.iter().position(|d| d.path.starts_with("MSH"));
    let first_evn = deltas.iter().position(|d| d.path.starts_with("EVN"));
    assert!(first_msh < first_evn);
    assert!(first_evn < first_pid);
}

#[test]
fn rendered_diff_listing_is_stable() {
    let registry = load_default_registry().expect("registry");
    let a = parse(BASE).expect("parse a");
    let modified = BASE
        .replace("Rivera^Ana", "Okafor^Imani")
        .replace("|F\r", "|U\r");
    let b = parse(&modified).expect("parse b");

    let deltas = DiffEngine::new(&registry).diff(&a, &b);
    let lines: Vec<String> = deltas
        .iter()
        .filter(|d| !d.is_unchanged())
        .map(|d| match &d.kind {
            DeltaKind::Unchanged => unreachable!("filtered above"),
            DeltaKind::Changed { old, new } => {
                format!("{}: '{}' -> '{}'", d.path, old, new)
            }
            DeltaKind::AddedInB { value } => format!("{}: added '{}'", d.path, value),
            DeltaKind::RemovedFromB { value } => format!("{}: removed '{}'", d.path, value),
        })
        .collect();
    let rendered = lines.join("\n");

    insta::assert_snapshot!(rendered, @r"
    PID.5: 'Rivera^Ana' -> 'Okafor^Imani'
    PID.8: 'F' -> 'U'
    ");
}
