use hl7_model::Separators;

/// Escape delimiter characters occurring inside a component value.
pub(crate) fn escape(value: &str, separators: &Separators) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        let code = if c == separators.field {
            Some('F')
        } else if c == separators.component {
            Some('S')
        } else if c == separators.repetition {
            Some('R')
        } else if c == separators.subcomponent {
            Some('T')
        } else if c == separators.escape {
            Some('E')
        } else {
            None
        };
        match code {
            Some(code) => {
                out.push(separators.escape);
                out.push(code);
                out.push(separators.escape);
            }
            None => out.push(c),
        }
    }
    out
}

/// Resolve `\F\ \S\ \R\ \T\ \E\` sequences back to literal characters.
/// Unrecognized sequences are kept verbatim rather than rejected; the
/// validator, not the codec, decides what to do with odd content.
pub(crate) fn unescape(value: &str, separators: &Separators) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c != separators.escape {
            out.push(c);
            continue;
        }
        let mut sequence = String::new();
        let mut terminated = false;
        for inner in chars.by_ref() {
            if inner == separators.escape {
                terminated = true;
                break;
            }
            sequence.push(inner);
        }
        let resolved = match sequence.as_str() {
            "F" => Some(separators.field),
            "S" => Some(separators.component),
            "R" => Some(separators.repetition),
            "T" => Some(separators.subcomponent),
            "E" => Some(separators.escape),
            _ => None,
        };
        match (resolved, terminated) {
            (Some(literal), true) => out.push(literal),
            _ => {
                out.push(separators.escape);
                out.push_str(&sequence);
                if terminated {
                    out.push(separators.escape);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_and_unescape_are_inverse() {
        let separators = Separators::default();
        let original = "a|b^c~d&e\\f";
        let escaped = escape(original, &separators);
        assert_eq!(escaped, "a\\F\\b\\S\\c\\R\\d\\T\\e\\E\\f");
        assert_eq!(unescape(&escaped, &separators), original);
    }

    #[test]
    fn unknown_sequences_survive() {
        let separators = Separators::default();
        assert_eq!(unescape("\\H\\bold\\N\\", &separators), "\\H\\bold\\N\\");
        assert_eq!(unescape("tail\\", &separators), "tail\\");
    }
}
