//! Curated fallback datasets. Small, deliberately synthetic-looking
//! subsets of the public vocabularies (LOINC, ICD-10, common demographics)
//! so generated messages read plausibly without ever containing real
//! patient data.

pub(crate) const GIVEN_FEMALE: &[&str] = &[
    "Ana", "Beatrice", "Camila", "Dana", "Elena", "Fatima", "Grace", "Hannah", "Imani", "Julia",
    "Keiko", "Lena", "Maria", "Nadia", "Olivia", "Priya", "Quinn", "Rosa", "Sofia", "Talia",
    "Uma", "Vera", "Wanda", "Yuki",
];

pub(crate) const GIVEN_MALE: &[&str] = &[
    "Aaron", "Bruno", "Carlos", "Derek", "Elias", "Felix", "Gavin", "Hector", "Ivan", "Jamal",
    "Kenji", "Liam", "Marcus", "Nolan", "Omar", "Pavel", "Quincy", "Rafael", "Samuel", "Tomas",
    "Ulric", "Victor", "Wesley", "Yusuf",
];

pub(crate) const FAMILY: &[&str] = &[
    "Abbott", "Barnes", "Castillo", "Donovan", "Eriksen", "Fletcher", "Grimaldi", "Hoffman",
    "Ibarra", "Jensen", "Kowalski", "Lindqvist", "Moreau", "Nakamura", "Okafor", "Petrov",
    "Quintana", "Rivera", "Sandoval", "Takahashi", "Ueda", "Vargas", "Whitfield", "Ximenes",
    "Yamada", "Zielinski", "Ashworth", "Beaumont", "Calloway", "Delacroix", "Ellington",
    "Fairbanks", "Galloway", "Hawthorne", "Iverson", "Jablonski", "Kensington", "Lockwood",
    "Montgomery", "Northcutt",
];

pub(crate) const NAME_PREFIXES: &[&str] = &["Mr", "Ms", "Mx", "Dr"];

pub(crate) const NAME_SUFFIXES: &[&str] = &["Jr", "Sr", "II", "III"];

pub(crate) const STREETS: &[&str] = &[
    "Maple Avenue", "Oak Street", "Cedar Lane", "Birch Road", "Elm Drive", "Willow Way",
    "Chestnut Boulevard", "Spruce Court", "Juniper Terrace", "Magnolia Place", "Sycamore Street",
    "Poplar Avenue", "Hickory Lane", "Dogwood Drive", "Alder Road", "Hawthorn Way",
    "Laurel Street", "Linden Avenue", "Aspen Circle", "Redwood Drive",
];

/// (city, state, zip) triples kept together so addresses stay coherent.
pub(crate) const CITIES: &[(&str, &str, &str)] = &[
    ("Springfield", "IL", "62701"),
    ("Riverton", "WY", "82501"),
    ("Fairview", "OR", "97024"),
    ("Georgetown", "TX", "78626"),
    ("Clinton", "IA", "52732"),
    ("Madison", "WI", "53703"),
    ("Franklin", "TN", "37064"),
    ("Greenville", "SC", "29601"),
    ("Bristol", "CT", "06010"),
    ("Salem", "MA", "01970"),
    ("Arlington", "VA", "22201"),
    ("Ashland", "KY", "41101"),
    ("Dover", "DE", "19901"),
    ("Hudson", "OH", "44236"),
    ("Auburn", "WA", "98001"),
    ("Burlington", "VT", "05401"),
    ("Camden", "ME", "04843"),
    ("Decatur", "GA", "30030"),
    ("Elkhart", "IN", "46514"),
    ("Fremont", "NE", "68025"),
];

pub(crate) const AREA_CODES: &[&str] = &[
    "217", "307", "503", "512", "563", "608", "615", "864", "860", "978", "703", "606",
];

/// Sending/receiving application namespaces.
pub(crate) const APPLICATIONS: &[&str] = &[
    "REG", "ADT", "LAB", "LIS", "RIS", "EMR", "PHARM", "SCHED", "BILLING", "ORDERS",
];

/// Care unit codes for patient locations.
pub(crate) const CARE_UNITS: &[&str] = &[
    "2N", "3E", "4W", "ICU", "CCU", "ED", "PACU", "NICU", "MEDSURG", "ONC",
];

/// (code, display) pairs from the LOINC subset, used for observation and
/// service identifiers.
pub(crate) const LOINC: &[(&str, &str)] = &[
    ("718-7", "Hemoglobin [Mass/volume] in Blood"),
    ("4544-3", "Hematocrit [Volume Fraction] of Blood"),
    ("6690-2", "Leukocytes [#/volume] in Blood"),
    ("777-3", "Platelets [#/volume] in Blood"),
    ("2345-7", "Glucose [Mass/volume] in Serum or Plasma"),
    ("2160-0", "Creatinine [Mass/volume] in Serum or Plasma"),
    ("3094-0", "Urea nitrogen [Mass/volume] in Serum or Plasma"),
    ("2951-2", "Sodium [Moles/volume] in Serum or Plasma"),
    ("2823-3", "Potassium [Moles/volume] in Serum or Plasma"),
    ("2075-0", "Chloride [Moles/volume] in Serum or Plasma"),
    ("1975-2", "Bilirubin.total [Mass/volume] in Serum or Plasma"),
    ("1742-6", "Alanine aminotransferase [Enzymatic activity/volume]"),
    ("8867-4", "Heart rate"),
    ("8480-6", "Systolic blood pressure"),
    ("8462-4", "Diastolic blood pressure"),
];

/// (code, display) pairs from the ICD-10 subset, used for diagnoses.
pub(crate) const ICD10: &[(&str, &str)] = &[
    ("E11.9", "Type 2 diabetes mellitus without complications"),
    ("I10", "Essential (primary) hypertension"),
    ("J45.909", "Unspecified asthma, uncomplicated"),
    ("E78.5", "Hyperlipidemia, unspecified"),
    ("M54.50", "Low back pain, unspecified"),
    ("K21.9", "Gastro-esophageal reflux disease without esophagitis"),
    ("F41.1", "Generalized anxiety disorder"),
    ("N39.0", "Urinary tract infection, site not specified"),
    ("J06.9", "Acute upper respiratory infection, unspecified"),
    ("R07.9", "Chest pain, unspecified"),
    ("R51.9", "Headache, unspecified"),
    ("D64.9", "Anemia, unspecified"),
    ("E03.9", "Hypothyroidism, unspecified"),
    ("I48.91", "Unspecified atrial fibrillation"),
    ("G47.00", "Insomnia, unspecified"),
];

/// (code, display) allergen pairs, used for AL1 allergen identifiers.
pub(crate) const ALLERGENS: &[(&str, &str)] = &[
    ("PCN", "Penicillin"),
    ("SULFA", "Sulfonamide antibiotics"),
    ("ASA", "Aspirin"),
    ("NSAID", "Nonsteroidal anti-inflammatory drugs"),
    ("LATEX", "Natural rubber latex"),
    ("PNUT", "Peanut"),
    ("SHELL", "Shellfish"),
    ("EGG", "Egg protein"),
    ("MILK", "Cow's milk protein"),
    ("POLLEN", "Seasonal pollen"),
];

/// Units paired with numeric observations.
pub(crate) const UNITS: &[(&str, &str)] = &[
    ("g/dL", "grams per deciliter"),
    ("mg/dL", "milligrams per deciliter"),
    ("mmol/L", "millimoles per liter"),
    ("10*9/L", "billion per liter"),
    ("%", "percent"),
    ("mm[Hg]", "millimeters of mercury"),
    ("/min", "per minute"),
];

/// Free-text clinical note phrases.
pub(crate) const NOTE_PHRASES: &[&str] = &[
    "Patient resting comfortably, no acute distress.",
    "Tolerating oral intake without difficulty.",
    "Ambulating independently in hallway.",
    "Reports mild intermittent discomfort, controlled with medication.",
    "Vital signs stable over the preceding shift.",
    "Follow-up laboratory work ordered for the morning.",
    "No adverse reaction observed following administration.",
    "Discharge planning discussed with patient and family.",
    "Wound site clean, dry, and intact.",
    "Breath sounds clear bilaterally on auscultation.",
    "Continues on current care plan without change.",
    "Education provided regarding medication schedule.",
];

pub(crate) fn pick<'a, T: Copy>(rng: &mut impl rand::Rng, items: &'a [T]) -> T {
    items[rng.gen_range(0..items.len())]
}
