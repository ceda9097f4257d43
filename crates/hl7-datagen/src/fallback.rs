use chrono::Duration;
use rand::Rng;
use rand::rngs::StdRng;

use hl7_model::{DataTypeKind, FieldPath, PhiCategory};

use crate::ValueSource;
use crate::context::{FieldSlot, GenContext, Value};
use crate::datasets as data;
use crate::error::ProviderError;

/// Deterministic sampling from the curated datasets. Always succeeds, and
/// always returns a code from the referenced table when the slot has one.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackSource;

impl FallbackSource {
    pub fn new() -> Self {
        Self
    }
}

impl ValueSource for FallbackSource {
    fn provide(&self, slot: &FieldSlot<'_>, ctx: &GenContext) -> Result<Value, ProviderError> {
        Ok(Value(sample(slot, ctx)))
    }
}

fn sample(slot: &FieldSlot<'_>, ctx: &GenContext) -> String {
    if let Some(value) = vocabulary_value(slot, ctx) {
        return value;
    }

    let mut rng = ctx.rng_for(slot.path, slot.segment_occurrence, slot.repetition);

    if let Some(table) = slot.table {
        let codes: Vec<&str> = table.codes().collect();
        return codes[rng.gen_range(0..codes.len())].to_string();
    }

    match slot.data_type.kind {
        DataTypeKind::Text => text_value(slot, ctx, &mut rng),
        DataTypeKind::Numeric => numeric_value(slot, &mut rng),
        DataTypeKind::SequenceId => rng.gen_range(1..9u8).to_string(),
        DataTypeKind::Date => date_value(slot, ctx, &mut rng),
        DataTypeKind::Time => format!(
            "{:02}{:02}{:02}",
            rng.gen_range(0..24),
            rng.gen_range(0..60),
            rng.gen_range(0..60)
        ),
        DataTypeKind::DateTime => {
            if slot.phi == Some(PhiCategory::BirthDate) {
                // Birth timestamps carry a zero time; the date respects the
                // requested age band.
                format!("{}000000", birth_date(ctx, &mut rng))
            } else {
                datetime_value(ctx, &mut rng)
            }
        }
        DataTypeKind::Coded => coded_value(slot, &mut rng),
        // Composite slots are decomposed by the caller; a composite landing
        // here still gets a usable leaf token.
        DataTypeKind::Composite => token(&mut rng),
    }
}

/// Clinical vocabulary slots where a code and its display text must come
/// from the same dataset row. The row is drawn from an RNG keyed by the
/// anchor field and segment occurrence only, so every component of one
/// coded element agrees.
fn vocabulary_value(slot: &FieldSlot<'_>, ctx: &GenContext) -> Option<String> {
    let path = slot.path;
    let (rows, system, anchor): (&[(&str, &str)], &str, u16) =
        match (path.segment.as_str(), path.field) {
            ("OBR", 4) | ("OBX", 3) => (data::LOINC, "LN", path.field),
            ("DG1", 3) => (data::ICD10, "I10", 3),
            ("AL1", 3) => (data::ALLERGENS, "L", 3),
            ("OBX", 6) => (data::UNITS, "L", 6),
            ("DG1", 4) => {
                // Free-text description mirroring the coded diagnosis.
                let mut rng =
                    ctx.rng_for(&FieldPath::field("DG1", 3), slot.segment_occurrence, 0);
                let (_, text) = data::pick(&mut rng, data::ICD10);
                return Some(text.to_string());
            }
            _ => return None,
        };

    let mut rng = ctx.rng_for(
        &FieldPath::field(&path.segment, anchor),
        slot.segment_occurrence,
        0,
    );
    let (code, text) = data::pick(&mut rng, rows);
    match path.component {
        Some(1) | None => Some(code.to_string()),
        Some(2) => Some(text.to_string()),
        Some(3) => Some(system.to_string()),
        _ => None,
    }
}

fn text_value(slot: &FieldSlot<'_>, ctx: &GenContext, rng: &mut StdRng) -> String {
    match slot.phi {
        Some(PhiCategory::Name) => name_part(slot, ctx, rng),
        Some(PhiCategory::Address) => address_part(slot, ctx, rng),
        Some(PhiCategory::Contact) => contact_part(slot, rng),
        Some(PhiCategory::Identifier) => identifier_part(slot, rng),
        Some(PhiCategory::FreeText) => observation_text(slot, ctx, rng),
        Some(PhiCategory::BirthDate) | None => generic_text(slot, rng),
    }
}

/// Free-text observation values follow the value type already placed at
/// OBX-2, so a numeric observation really carries a number.
fn observation_text(slot: &FieldSlot<'_>, ctx: &GenContext, rng: &mut StdRng) -> String {
    if slot.path.segment == "OBX" && slot.path.field == 5 {
        match ctx.assigned(&FieldPath::field("OBX", 2)) {
            Some("NM" | "SN") => return numeric_value(slot, rng),
            Some("DT") => return date_value(slot, ctx, rng),
            Some("TM") => {
                return format!(
                    "{:02}{:02}{:02}",
                    rng.gen_range(0..24),
                    rng.gen_range(0..60),
                    rng.gen_range(0..60)
                );
            }
            Some("TS") => return datetime_value(ctx, rng),
            _ => {}
        }
    }
    data::pick(rng, data::NOTE_PHRASES).to_string()
}

fn name_part(slot: &FieldSlot<'_>, ctx: &GenContext, rng: &mut StdRng) -> String {
    let name = slot.name;
    if name.contains("ID Number") {
        return digits(rng, 6);
    }
    if name.contains("Family") {
        return data::pick(rng, data::FAMILY).to_string();
    }
    if name.contains("Given") {
        return given_name(ctx, rng);
    }
    if name.contains("Prefix") {
        return data::pick(rng, data::NAME_PREFIXES).to_string();
    }
    if name.contains("Suffix") {
        return data::pick(rng, data::NAME_SUFFIXES).to_string();
    }
    data::pick(rng, data::FAMILY).to_string()
}

/// Given names follow the administrative sex already placed at PID.8, when
/// one is there to follow.
fn given_name(ctx: &GenContext, rng: &mut StdRng) -> String {
    match ctx.assigned(&FieldPath::field("PID", 8)) {
        Some("F") => data::pick(rng, data::GIVEN_FEMALE).to_string(),
        Some("M") => data::pick(rng, data::GIVEN_MALE).to_string(),
        _ => {
            if rng.gen_bool(0.5) {
                data::pick(rng, data::GIVEN_FEMALE).to_string()
            } else {
                data::pick(rng, data::GIVEN_MALE).to_string()
            }
        }
    }
}

fn address_part(slot: &FieldSlot<'_>, ctx: &GenContext, rng: &mut StdRng) -> String {
    let name = slot.name;
    if name.contains("Street") {
        return format!("{} {}", rng.gen_range(100..9900), data::pick(rng, data::STREETS));
    }
    if name.contains("Other") {
        return format!("Apt {}", rng.gen_range(1..40));
    }
    if name.contains("Country") {
        return "USA".to_string();
    }
    // City, state, and zip stay coherent by drawing the same row from an
    // RNG keyed to the parent field.
    let mut parent_rng = ctx.rng_for_parent(slot.path, slot.segment_occurrence);
    let (city, state, zip) = data::pick(&mut parent_rng, data::CITIES);
    if name.contains("State") {
        return state.to_string();
    }
    if name.contains("Zip") || name.contains("Postal") {
        return zip.to_string();
    }
    city.to_string()
}

fn contact_part(slot: &FieldSlot<'_>, rng: &mut StdRng) -> String {
    if slot.name.contains("Email") {
        let given = data::pick(rng, data::GIVEN_FEMALE).to_ascii_lowercase();
        let family = data::pick(rng, data::FAMILY).to_ascii_lowercase();
        return format!("{given}.{family}@example.net");
    }
    format!(
        "({}){}-{:04}",
        data::pick(rng, data::AREA_CODES),
        rng.gen_range(200..999),
        rng.gen_range(0..10000)
    )
}

fn identifier_part(slot: &FieldSlot<'_>, rng: &mut StdRng) -> String {
    if slot.name.contains("SSN") {
        // The 900-999 area range is never issued, keeping synthetic SSNs
        // unmistakably synthetic.
        return format!(
            "{}-{:02}-{:04}",
            rng.gen_range(900..1000),
            rng.gen_range(1..99),
            rng.gen_range(1..10000)
        );
    }
    digits(rng, 8)
}

fn generic_text(slot: &FieldSlot<'_>, rng: &mut StdRng) -> String {
    let name = slot.name;
    if name.contains("Namespace") {
        return data::pick(rng, data::APPLICATIONS).to_string();
    }
    if name.contains("Universal ID") {
        return format!(
            "2.16.840.1.113883.{}.{}",
            rng.gen_range(1..20),
            rng.gen_range(1..9999)
        );
    }
    if name.contains("Entity Identifier") {
        return format!("ORD{}", digits(rng, 6));
    }
    if name.contains("References Range") {
        let low = rng.gen_range(1..80);
        return format!("{}-{}", low, low + rng.gen_range(5..40));
    }
    if name.contains("Sub-ID") || name.contains("Quantity") {
        return "1".to_string();
    }
    token(rng)
}

/// Coded slots without a table reference still get plausible tokens for
/// the locations the datasets know about.
fn coded_value(slot: &FieldSlot<'_>, rng: &mut StdRng) -> String {
    let name = slot.name;
    if name.contains("Point of Care") {
        return data::pick(rng, data::CARE_UNITS).to_string();
    }
    if name.contains("Room") {
        return rng.gen_range(100..600u16).to_string();
    }
    if name.contains("Bed") {
        return if rng.gen_bool(0.5) { "A" } else { "B" }.to_string();
    }
    if name.contains("Namespace") {
        return data::pick(rng, data::APPLICATIONS).to_string();
    }
    if name.contains("Precision") {
        return data::pick(rng, &["D", "M", "S"]).to_string();
    }
    if name.contains("Degree") {
        return data::pick(rng, &["MD", "DO", "NP", "PA", "RN"]).to_string();
    }
    token(rng)
}

fn numeric_value(slot: &FieldSlot<'_>, rng: &mut StdRng) -> String {
    if slot.name.contains("Probability") {
        return format!("0.{:02}", rng.gen_range(1..100));
    }
    if rng.gen_bool(0.5) {
        rng.gen_range(1..400u16).to_string()
    } else {
        format!("{}.{}", rng.gen_range(1..400u16), rng.gen_range(0..10u8))
    }
}

fn date_value(slot: &FieldSlot<'_>, ctx: &GenContext, rng: &mut StdRng) -> String {
    if slot.phi == Some(PhiCategory::BirthDate) {
        return birth_date(ctx, rng);
    }
    let date = ctx.now.date() - Duration::days(rng.gen_range(0..365));
    date.format("%Y%m%d").to_string()
}

fn birth_date(ctx: &GenContext, rng: &mut StdRng) -> String {
    let (min_years, max_years) = ctx.age_band.years();
    let age_days = rng.gen_range(i64::from(min_years) * 365..=i64::from(max_years) * 365 + 364);
    let date = ctx.now.date() - Duration::days(age_days);
    date.format("%Y%m%d").to_string()
}

/// Timestamps are canonical to the second: `YYYYMMDDHHMMSS`.
fn datetime_value(ctx: &GenContext, rng: &mut StdRng) -> String {
    let moment = ctx.now - Duration::minutes(rng.gen_range(0..72 * 60));
    moment.format("%Y%m%d%H%M%S").to_string()
}

fn token(rng: &mut StdRng) -> String {
    (0..3)
        .map(|_| char::from(b'A' + rng.gen_range(0..26u8)))
        .collect()
}

fn digits(rng: &mut StdRng, count: usize) -> String {
    let mut out = String::with_capacity(count);
    out.push(char::from(b'1' + rng.gen_range(0..9u8)));
    for _ in 1..count {
        out.push(char::from(b'0' + rng.gen_range(0..10u8)));
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use hl7_model::FieldPath;
    use hl7_standards::load_default_registry;

    use super::*;

    fn test_ctx() -> GenContext {
        let now = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        GenContext::new("ADT^A01", "DEMO_HOSPITAL", 42, now)
    }

    #[test]
    fn coded_slots_draw_from_the_referenced_table() {
        let registry = load_default_registry().expect("registry");
        let field = registry.field(&FieldPath::field("PID", 8)).expect("PID.8");
        let table = registry.slot_table(field, None).expect("table 0001");
        let slot = FieldSlot {
            path: &field.path,
            name: &field.name,
            data_type: registry.data_type(&field.data_type).expect("IS"),
            table: Some(table),
            phi: None,
            segment_occurrence: 0,
            repetition: 0,
        };
        let ctx = test_ctx();
        let value = FallbackSource::new()
            .provide(&slot, &ctx)
            .expect("fallback never fails");
        assert!(table.contains(value.as_str()));
    }

    #[test]
    fn sampling_is_deterministic_per_seed() {
        let registry = load_default_registry().expect("registry");
        let path = FieldPath::component("PID", 5, 1);
        let data_type = registry.data_type("ST").expect("ST");
        let slot = FieldSlot {
            path: &path,
            name: "Family Name",
            data_type,
            table: None,
            phi: Some(PhiCategory::Name),
            segment_occurrence: 0,
            repetition: 0,
        };
        let ctx = test_ctx();
        let source = FallbackSource::new();
        let first = source.provide(&slot, &ctx).unwrap();
        let second = source.provide(&slot, &ctx).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn given_names_follow_administrative_sex() {
        let registry = load_default_registry().expect("registry");
        let path = FieldPath::component("PID", 5, 2);
        let data_type = registry.data_type("ST").expect("ST");
        let slot = FieldSlot {
            path: &path,
            name: "Given Name",
            data_type,
            table: None,
            phi: Some(PhiCategory::Name),
            segment_occurrence: 0,
            repetition: 0,
        };
        let mut ctx = test_ctx();
        ctx.assign(FieldPath::field("PID", 8), "F");
        let value = FallbackSource::new().provide(&slot, &ctx).unwrap();
        assert!(data::GIVEN_FEMALE.contains(&value.as_str()));
    }

    #[test]
    fn timestamps_are_canonical_to_the_second() {
        let registry = load_default_registry().expect("registry");
        let path = FieldPath::component("MSH", 7, 1);
        let slot = FieldSlot {
            path: &path,
            name: "Time",
            data_type: registry.data_type("DTM").expect("DTM"),
            table: None,
            phi: None,
            segment_occurrence: 0,
            repetition: 0,
        };
        let value = FallbackSource::new().provide(&slot, &test_ctx()).unwrap();
        assert_eq!(value.as_str().len(), 14);
        assert!(value.as_str().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn coded_element_code_and_text_agree() {
        let registry = load_default_registry().expect("registry");
        let ctx = test_ctx();
        let code_path = FieldPath::component("DG1", 3, 1);
        let text_path = FieldPath::component("DG1", 3, 2);
        let st = registry.data_type("ST").expect("ST");
        let code = FallbackSource::new()
            .provide(
                &FieldSlot {
                    path: &code_path,
                    name: "Identifier",
                    data_type: st,
                    table: None,
                    phi: None,
                    segment_occurrence: 1,
                    repetition: 0,
                },
                &ctx,
            )
            .unwrap();
        let text = FallbackSource::new()
            .provide(
                &FieldSlot {
                    path: &text_path,
                    name: "Text",
                    data_type: st,
                    table: None,
                    phi: None,
                    segment_occurrence: 1,
                    repetition: 0,
                },
                &ctx,
            )
            .unwrap();
        let row = data::ICD10
            .iter()
            .find(|(code_entry, _)| *code_entry == code.as_str())
            .expect("code from dataset");
        assert_eq!(row.1, text.as_str());
    }
}
