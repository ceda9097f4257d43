use serde::Serialize;

/// Outcome for one field-path slot when comparing two messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeltaKind {
    Unchanged,
    Changed { old: String, new: String },
    AddedInB { value: String },
    RemovedFromB { value: String },
}

/// One comparison entry. Paths carry segment occurrence and repetition
/// indexes (`PID[1].3[2]`) so repeated segments and repetitions line up
/// stably across runs.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDelta {
    pub path: String,
    #[serde(flatten)]
    pub kind: DeltaKind,
}

impl FieldDelta {
    pub fn is_unchanged(&self) -> bool {
        self.kind == DeltaKind::Unchanged
    }
}
