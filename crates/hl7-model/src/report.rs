use serde::Serialize;

/// Finding severity. A message is acceptable when it has zero
/// error-severity findings; warnings never block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

/// What a finding is about. Validation never throws; each anomaly in the
/// message becomes one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    MissingRequiredSegment,
    UnexpectedSegment,
    ExceedsMaxSegments,
    MissingRequired,
    ExceedsMaxRepetitions,
    InvalidCode,
    TypeMismatch,
    ShortText,
    VendorViolation,
}

#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    /// Rendered location, e.g. `PID.8` or `OBX[2].5`.
    pub path: String,
    pub severity: Severity,
    pub kind: FindingKind,
    pub message: String,
}

impl Finding {
    pub fn error(path: impl Into<String>, kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            severity: Severity::Error,
            kind,
            message: message.into(),
        }
    }

    pub fn warning(path: impl Into<String>, kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            severity: Severity::Warning,
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub message_type: String,
    pub vendor: Option<String>,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn new(message_type: &str) -> Self {
        Self {
            message_type: message_type.to_string(),
            vendor: None,
            findings: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
            .count()
    }
}
