use serde::{Deserialize, Serialize};

use crate::path::FieldPath;

/// ER7 delimiter set, parsed from MSH-1/MSH-2 or defaulted for built
/// messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Separators {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
        }
    }
}

impl Separators {
    /// The MSH-2 encoding characters string.
    pub fn encoding_characters(&self) -> String {
        [
            self.component,
            self.repetition,
            self.escape,
            self.subcomponent,
        ]
        .iter()
        .collect()
    }
}

/// One repetition of a field: an ordered list of component values. A
/// single-component value is a one-element list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repetition {
    pub components: Vec<String>,
}

impl Repetition {
    pub fn single(value: impl Into<String>) -> Self {
        Self {
            components: vec![value.into()],
        }
    }

    pub fn composite(components: Vec<String>) -> Self {
        Self { components }
    }

    /// Component value at a 1-based position, if present and non-empty.
    pub fn component(&self, position: u16) -> Option<&str> {
        if position == 0 {
            return None;
        }
        self.components
            .get(usize::from(position) - 1)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.components.iter().all(String::is_empty)
    }

    /// Canonical single-string rendering used for comparisons and display;
    /// trailing empty components are dropped.
    pub fn flatten(&self) -> String {
        let mut components: &[String] = &self.components;
        while let Some(last) = components.last() {
            if last.is_empty() {
                components = &components[..components.len() - 1];
            } else {
                break;
            }
        }
        components.join("^")
    }
}

/// A field slot within a segment instance; zero repetitions means the field
/// is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInstance {
    pub repetitions: Vec<Repetition>,
}

impl FieldInstance {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn single(value: impl Into<String>) -> Self {
        Self {
            repetitions: vec![Repetition::single(value)],
        }
    }

    pub fn is_present(&self) -> bool {
        self.repetitions.iter().any(|rep| !rep.is_empty())
    }

    pub fn first(&self) -> Option<&Repetition> {
        self.repetitions.iter().find(|rep| !rep.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentInstance {
    pub code: String,
    /// Ordered by position; `fields[0]` is `SEG.1`. May be shorter than the
    /// segment definition when trailing fields are absent.
    pub fields: Vec<FieldInstance>,
}

impl SegmentInstance {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into().to_ascii_uppercase(),
            fields: Vec::new(),
        }
    }

    /// Field instance at a 1-based position.
    pub fn field(&self, position: u16) -> Option<&FieldInstance> {
        if position == 0 {
            return None;
        }
        self.fields.get(usize::from(position) - 1)
    }

    /// Set the field at a 1-based position, growing with absent fields as
    /// needed.
    pub fn set_field(&mut self, position: u16, field: FieldInstance) {
        if position == 0 {
            return;
        }
        let index = usize::from(position) - 1;
        if self.fields.len() <= index {
            self.fields.resize_with(index + 1, FieldInstance::absent);
        }
        self.fields[index] = field;
    }
}

/// A parsed or assembled message: an ordered sequence of segment instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub separators: Separators,
    pub segments: Vec<SegmentInstance>,
}

impl Message {
    pub fn new() -> Self {
        Self {
            separators: Separators::default(),
            segments: Vec::new(),
        }
    }

    pub fn segments_with_code<'a>(
        &'a self,
        code: &'a str,
    ) -> impl Iterator<Item = &'a SegmentInstance> {
        self.segments.iter().filter(move |s| s.code == code)
    }

    /// First non-empty value at a path: first matching segment instance,
    /// first repetition, addressed component (or first when the path stops
    /// at the field).
    pub fn first_value(&self, path: &FieldPath) -> Option<String> {
        let segment = self.segments_with_code(&path.segment).next()?;
        let field = segment.field(path.field)?;
        let repetition = field.first()?;
        let component = path.component.unwrap_or(1);
        repetition.component(component).map(ToString::to_string)
    }

    /// The message type from MSH-9 (`CODE^TRIGGER`), when present.
    pub fn message_type(&self) -> Option<String> {
        let msh = self.segments_with_code("MSH").next()?;
        let field = msh.field(9)?;
        let rep = field.first()?;
        let code = rep.component(1)?;
        match rep.component(2) {
            Some(trigger) => Some(format!("{code}^{trigger}")),
            None => Some(code.to_string()),
        }
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}
