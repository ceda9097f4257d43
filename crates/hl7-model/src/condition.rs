use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::path::FieldPath;

/// Trigger predicate for `Conditional` usage fields.
///
/// The grammar is intentionally minimal: a single equality or membership
/// test against another field's value:
///
/// ```text
/// condition := path "==" token
///            | path "in" "[" token ("," token)* "]"
/// ```
///
/// Tokens are bare code literals (`E`, `NM`, `2.5.1`); the referenced value
/// is the first component of the first repetition at `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Condition {
    pub path: FieldPath,
    pub predicate: Predicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Equals(String),
    In(Vec<String>),
}

impl Condition {
    /// Evaluate against a value lookup. A missing referenced value never
    /// satisfies the predicate.
    pub fn holds<F>(&self, lookup: F) -> bool
    where
        F: FnOnce(&FieldPath) -> Option<String>,
    {
        let Some(value) = lookup(&self.path) else {
            return false;
        };
        match &self.predicate {
            Predicate::Equals(expected) => value == *expected,
            Predicate::In(allowed) => allowed.iter().any(|candidate| *candidate == value),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.predicate {
            Predicate::Equals(value) => write!(f, "{} == {}", self.path, value),
            Predicate::In(values) => write!(f, "{} in [{}]", self.path, values.join(", ")),
        }
    }
}

impl FromStr for Condition {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ModelError::InvalidCondition {
            condition: s.to_string(),
            reason: reason.to_string(),
        };

        let text = s.trim();
        if let Some((path_raw, value_raw)) = text.split_once("==") {
            let path: FieldPath = path_raw
                .trim()
                .parse()
                .map_err(|_| invalid("left side must be a field path"))?;
            let value = value_raw.trim();
            if value.is_empty() {
                return Err(invalid("missing comparison value"));
            }
            return Ok(Condition {
                path,
                predicate: Predicate::Equals(value.to_string()),
            });
        }

        if let Some((path_raw, rest)) = text.split_once(" in ") {
            let path: FieldPath = path_raw
                .trim()
                .parse()
                .map_err(|_| invalid("left side must be a field path"))?;
            let rest = rest.trim();
            let inner = rest
                .strip_prefix('[')
                .and_then(|r| r.strip_suffix(']'))
                .ok_or_else(|| invalid("membership list must be bracketed"))?;
            let values: Vec<String> = inner
                .split(',')
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty())
                .collect();
            if values.is_empty() {
                return Err(invalid("membership list is empty"));
            }
            return Ok(Condition {
                path,
                predicate: Predicate::In(values),
            });
        }

        Err(invalid("expected '==' or 'in [..]'"))
    }
}

impl TryFrom<String> for Condition {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Condition> for String {
    fn from(value: Condition) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_equality() {
        let condition: Condition = "PV1.2 == E".parse().expect("condition");
        assert_eq!(condition.path, FieldPath::field("PV1", 2));
        assert!(condition.holds(|_| Some("E".to_string())));
        assert!(!condition.holds(|_| Some("I".to_string())));
        assert!(!condition.holds(|_| None));
    }

    #[test]
    fn parses_membership() {
        let condition: Condition = "OBX.2 in [NM, SN]".parse().expect("condition");
        assert!(condition.holds(|_| Some("SN".to_string())));
        assert!(!condition.holds(|_| Some("ST".to_string())));
        assert_eq!(condition.to_string(), "OBX.2 in [NM, SN]");
    }

    #[test]
    fn rejects_malformed_conditions() {
        assert!("PV1.2".parse::<Condition>().is_err());
        assert!("PV1.2 in NM, SN".parse::<Condition>().is_err());
        assert!("PV1.2 in []".parse::<Condition>().is_err());
        assert!("nonsense == X".parse::<Condition>().is_err());
    }
}
