//! Friendly session names: `adjective_animal_year`.

use rand::Rng;
use std::collections::BTreeSet;

const ADJECTIVES: &[&str] = &[
    "amber", "bold", "brisk", "calm", "clever", "coral", "crisp", "daring", "deft", "eager",
    "fleet", "gentle", "glad", "golden", "hardy", "humble", "ivory", "jolly", "keen", "lively",
    "lucid", "mellow", "merry", "nimble", "noble", "olive", "patient", "placid", "proud", "quick",
    "quiet", "rustic", "silver", "spry", "steady", "sturdy", "sunny", "swift", "tidy", "vivid",
];

const ANIMALS: &[&str] = &[
    "badger", "bison", "crane", "dolphin", "falcon", "ferret", "finch", "gazelle", "gecko",
    "heron", "ibex", "jackal", "kestrel", "lemur", "lynx", "macaw", "marmot", "marten", "mole",
    "narwhal", "ocelot", "osprey", "otter", "owl", "panda", "pelican", "plover", "puffin",
    "quail", "raven", "robin", "seal", "shrew", "stoat", "swan", "tapir", "toucan", "vole",
    "wombat", "wren",
];

const MAX_ATTEMPTS: usize = 16;

/// Generate a name not present in `existing`. Bounded random attempts
/// first; when the combination space is exhausted (or unlucky), fall back
/// to a numeric suffix, which always terminates uniquely.
pub(crate) fn generate(existing: &BTreeSet<String>, year: i32, rng: &mut impl Rng) -> String {
    for _ in 0..MAX_ATTEMPTS {
        let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
        let animal = ANIMALS[rng.gen_range(0..ANIMALS.len())];
        let candidate = format!("{adjective}_{animal}_{year}");
        if !existing.contains(&candidate) {
            return candidate;
        }
    }

    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let animal = ANIMALS[rng.gen_range(0..ANIMALS.len())];
    let base = format!("{adjective}_{animal}_{year}");
    let mut suffix = 2u32;
    loop {
        let candidate = format!("{base}_{suffix}");
        if !existing.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn generates_adjective_animal_year() {
        let mut rng = StdRng::seed_from_u64(1);
        let name = generate(&BTreeSet::new(), 2024, &mut rng);
        let parts: Vec<&str> = name.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert!(ADJECTIVES.contains(&parts[0]));
        assert!(ANIMALS.contains(&parts[1]));
        assert_eq!(parts[2], "2024");
    }

    #[test]
    fn exhausted_combination_space_falls_back_to_suffix() {
        // Saturate every adjective/animal combination for the year, plus a
        // generous batch of suffixed names, and ask for more: every result
        // must still be unique.
        let mut existing = BTreeSet::new();
        for adjective in ADJECTIVES {
            for animal in ANIMALS {
                existing.insert(format!("{adjective}_{animal}_2024"));
            }
        }
        assert!(existing.len() >= 1600);

        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..10_000 {
            let name = generate(&existing, 2024, &mut rng);
            assert!(
                existing.insert(name.clone()),
                "generated duplicate name {name}"
            );
        }
    }
}
