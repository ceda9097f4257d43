use chrono::NaiveDate;

use hl7_assemble::{AssembleOptions, Assembler};
use hl7_datagen::FallbackSource;
use hl7_model::{FindingKind, Severity};
use hl7_parse::parse;
use hl7_standards::load_default_registry;
use hl7_validate::Validator;

fn assemble_and_validate(message_type: &str, seed: u64) -> hl7_model::ValidationReport {
    let registry = load_default_registry().expect("registry");
    let source = FallbackSource::new();
    let assembler = Assembler::new(&registry, &source);
    let now = NaiveDate::from_ymd_opt(2024, 6, 15)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap();
    let options = AssembleOptions::new("DEMO_HOSPITAL", seed, now);
    let message = assembler
        .assemble(message_type, &options)
        .expect("assemble");
    Validator::new(&registry)
        .validate(&message, message_type, None)
        .expect("validate")
}

#[test]
fn generated_messages_validate_clean() {
    // Generation and validation agree on the same definitions: no error
    // findings for any supported type across a seed spread.
    let registry = load_default_registry().expect("registry");
    for message_type in registry.message_types() {
        for seed in 0..25u64 {
            let report = assemble_and_validate(message_type, seed);
            assert_eq!(
                report.error_count(),
                0,
                "{message_type} seed {seed}: {:?}",
                report.findings
            );
        }
    }
}

#[test]
fn missing_required_field_is_an_error() {
    let registry = load_default_registry().expect("registry");
    // PID lacks the required date of birth (PID.7) and sex (PID.8).
    let raw = "MSH|^~\\&|REG|DEMO_HOSPITAL|||20240102030405||ADT^A01|MSG00001|T|2.5.1\r\
               EVN||20240102030405\r\
               PID|1||12345||Rivera^Ana\r\
               PV1|1|I||E\r";
    let message = parse(raw).expect("parse");
    let report = Validator::new(&registry)
        .validate(&message, "ADT^A01", None)
        .expect("validate");

    assert!(report.has_errors());
    assert!(
        report
            .findings
            .iter()
            .any(|f| f.kind == FindingKind::MissingRequired && f.path == "PID.7")
    );
    assert!(
        report
            .findings
            .iter()
            .any(|f| f.kind == FindingKind::MissingRequired && f.path == "PID.8")
    );
}

#[test]
fn invalid_code_and_type_mismatch_are_reported() {
    let registry = load_default_registry().expect("registry");
    // PID.8 'Q' is not in table 0001; PID.7 does not parse as a timestamp.
    let raw = "MSH|^~\\&|REG|DEMO_HOSPITAL|||20240102030405||ADT^A01|MSG00001|T|2.5.1\r\
               EVN||20240102030405\r\
               PID|1||12345||Rivera^Ana||notadate|Q\r\
               PV1|1|O\r";
    let message = parse(raw).expect("parse");
    let report = Validator::new(&registry)
        .validate(&message, "ADT^A01", None)
        .expect("validate");

    assert!(
        report
            .findings
            .iter()
            .any(|f| f.kind == FindingKind::InvalidCode && f.path == "PID.8")
    );
    assert!(
        report
            .findings
            .iter()
            .any(|f| f.kind == FindingKind::TypeMismatch && f.path.starts_with("PID.7"))
    );
}

#[test]
fn repetition_overflow_is_an_error() {
    let registry = load_default_registry().expect("registry");
    // PID.3 allows at most three repetitions; this message carries four.
    let raw = "MSH|^~\\&|REG|DEMO_HOSPITAL|||20240102030405||ADT^A01|MSG00001|T|2.5.1\r\
               EVN||20240102030405\r\
               PID|1||11111~22222~33333~44444||Rivera^Ana||19850201000000|F\r\
               PV1|1|O\r";
    let message = parse(raw).expect("parse");
    let report = Validator::new(&registry)
        .validate(&message, "ADT^A01", None)
        .expect("validate");

    assert!(
        report
            .findings
            .iter()
            .any(|f| f.kind == FindingKind::ExceedsMaxRepetitions && f.path == "PID.3")
    );
}

#[test]
fn missing_required_segment_and_unexpected_segment() {
    let registry = load_default_registry().expect("registry");
    // No EVN (required for ADT^A01); NTE is not part of the structure.
    let raw = "MSH|^~\\&|REG|DEMO_HOSPITAL|||20240102030405||ADT^A01|MSG00001|T|2.5.1\r\
               PID|1||12345||Rivera^Ana||19850201000000|F\r\
               PV1|1|O\r\
               NTE|1||free text note\r";
    let message = parse(raw).expect("parse");
    let report = Validator::new(&registry)
        .validate(&message, "ADT^A01", None)
        .expect("validate");

    assert!(
        report
            .findings
            .iter()
            .any(|f| f.kind == FindingKind::MissingRequiredSegment && f.path == "EVN")
    );
    let unexpected = report
        .findings
        .iter()
        .find(|f| f.kind == FindingKind::UnexpectedSegment)
        .expect("unexpected segment finding");
    assert_eq!(unexpected.severity, Severity::Warning);
}

#[test]
fn vendor_overlay_adds_but_never_removes_findings() {
    let registry = load_default_registry().expect("registry");
    // Valid for the base standard, but MSH.11 'T' violates meridian's
    // pinned 'P' and PID.18 is absent despite the overlay requiring it.
    let raw = "MSH|^~\\&|REG|DEMO_HOSPITAL|||20240102030405||ADT^A01|MSG00001|T|2.5.1\r\
               EVN||20240102030405\r\
               PID|1||12345||Rivera^Ana||19850201000000|F\r\
               PV1|1|O\r";
    let message = parse(raw).expect("parse");
    let validator = Validator::new(&registry);

    let base = validator
        .validate(&message, "ADT^A01", None)
        .expect("validate base");
    assert_eq!(base.error_count(), 0);

    let vendored = validator
        .validate(&message, "ADT^A01", Some("meridian"))
        .expect("validate with vendor");
    assert!(vendored.error_count() >= 2);
    assert!(
        vendored
            .findings
            .iter()
            .all(|f| f.kind != FindingKind::VendorViolation || f.severity == Severity::Error)
    );
    // Every base finding survives the overlay pass.
    assert!(vendored.findings.len() >= base.findings.len());
}

#[test]
fn unknown_vendor_is_rejected() {
    let registry = load_default_registry().expect("registry");
    let raw = "MSH|^~\\&|REG|DEMO_HOSPITAL|||20240102030405||ADT^A01|MSG00001|T|2.5.1\r";
    let message = parse(raw).expect("parse");
    assert!(
        Validator::new(&registry)
            .validate(&message, "ADT^A01", Some("nonexistent"))
            .is_err()
    );
}
