//! Property test: generation and validation agree for arbitrary seeds.

use chrono::NaiveDate;
use proptest::prelude::*;

use hl7_assemble::{AssembleOptions, Assembler};
use hl7_datagen::FallbackSource;
use hl7_standards::load_default_registry;
use hl7_validate::Validator;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn any_seed_produces_a_valid_message(seed in any::<u64>(), type_index in 0usize..5) {
        let registry = load_default_registry().expect("registry");
        let message_types = registry.message_types();
        let message_type = message_types[type_index % message_types.len()];

        let source = FallbackSource::new();
        let assembler = Assembler::new(&registry, &source);
        let now = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let options = AssembleOptions::new("DEMO_HOSPITAL", seed, now);
        let message = assembler.assemble(message_type, &options).expect("assemble");

        let report = Validator::new(&registry)
            .validate(&message, message_type, None)
            .expect("validate");
        prop_assert_eq!(report.error_count(), 0, "{}: {:?}", message_type, report.findings);
    }
}
