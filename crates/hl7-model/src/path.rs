use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Dotted address of a field or component slot: `PID.3` or `PID.3.1`.
///
/// Field and component positions are 1-based, matching how HL7 segment
/// tables number them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    pub segment: String,
    pub field: u16,
    pub component: Option<u16>,
}

impl FieldPath {
    pub fn field(segment: &str, field: u16) -> Self {
        Self {
            segment: segment.to_ascii_uppercase(),
            field,
            component: None,
        }
    }

    pub fn component(segment: &str, field: u16, component: u16) -> Self {
        Self {
            segment: segment.to_ascii_uppercase(),
            field,
            component: Some(component),
        }
    }

    /// The field-level prefix of this path (drops any component index).
    pub fn parent_field(&self) -> FieldPath {
        FieldPath {
            segment: self.segment.clone(),
            field: self.field,
            component: None,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.component {
            Some(component) => write!(f, "{}.{}.{}", self.segment, self.field, component),
            None => write!(f, "{}.{}", self.segment, self.field),
        }
    }
}

impl FromStr for FieldPath {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ModelError::InvalidPath {
            path: s.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = s.trim().split('.');
        let segment = parts.next().unwrap_or_default();
        if segment.len() != 3 || !segment.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("segment code must be 3 alphanumeric characters"));
        }

        let field: u16 = parts
            .next()
            .ok_or_else(|| invalid("missing field position"))?
            .parse()
            .map_err(|_| invalid("field position must be a number"))?;
        if field == 0 {
            return Err(invalid("field position is 1-based"));
        }

        let component = match parts.next() {
            Some(raw) => {
                let component: u16 = raw
                    .parse()
                    .map_err(|_| invalid("component position must be a number"))?;
                if component == 0 {
                    return Err(invalid("component position is 1-based"));
                }
                Some(component)
            }
            None => None,
        };

        if parts.next().is_some() {
            return Err(invalid("too many path segments"));
        }

        Ok(FieldPath {
            segment: segment.to_ascii_uppercase(),
            field,
            component,
        })
    }
}

impl TryFrom<String> for FieldPath {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldPath> for String {
    fn from(value: FieldPath) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_field_and_component_paths() {
        let field: FieldPath = "PID.3".parse().expect("field path");
        assert_eq!(field, FieldPath::field("PID", 3));

        let component: FieldPath = "pid.5.1".parse().expect("component path");
        assert_eq!(component, FieldPath::component("PID", 5, 1));
        assert_eq!(component.to_string(), "PID.5.1");
        assert_eq!(component.parent_field(), FieldPath::field("PID", 5));
    }

    #[test]
    fn rejects_malformed_paths() {
        assert!("PID".parse::<FieldPath>().is_err());
        assert!("PID.0".parse::<FieldPath>().is_err());
        assert!("PID.3.0".parse::<FieldPath>().is_err());
        assert!("PID.3.1.2".parse::<FieldPath>().is_err());
        assert!("PATIENT.3".parse::<FieldPath>().is_err());
    }
}
