use crate::lower::LowerError;
use crate::sexpr::ParseError;
use crate::source_location::SourceSpan;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DiagnosticKind {
    TypeMismatch,
    ArityError,
    BoundsError,
    StructuralError,
    RedundancyWarning,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::RedundancyWarning => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DiagnosticKind::TypeMismatch => "TypeMismatch",
            DiagnosticKind::ArityError => "ArityError",
            DiagnosticKind::BoundsError => "BoundsError",
            DiagnosticKind::StructuralError => "StructuralError",
            DiagnosticKind::RedundancyWarning => "RedundancyWarning",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// The part of a call a problem is reported on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Anchor {
    Call,
    Receiver,
    /// Index into the call arguments, the receiver not included.
    Argument(usize),
}

/// A violation found by one of the algebras, before it is tied to source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Problem {
    pub kind: DiagnosticKind,
    pub anchor: Anchor,
    pub message: String,
}

#[derive(Clone, Debug, Default)]
pub struct Problems {
    items: Vec<Problem>,
}

impl Problems {
    pub fn new() -> Problems {
        Problems { items: Vec::new() }
    }

    pub fn report(&mut self, kind: DiagnosticKind, anchor: Anchor, message: impl Into<String>) {
        self.items.push(Problem {
            kind,
            anchor,
            message: message.into(),
        });
    }

    pub fn type_mismatch(&mut self, anchor: Anchor, message: impl Into<String>) {
        self.report(DiagnosticKind::TypeMismatch, anchor, message);
    }

    pub fn arity(&mut self, anchor: Anchor, message: impl Into<String>) {
        self.report(DiagnosticKind::ArityError, anchor, message);
    }

    pub fn bounds(&mut self, anchor: Anchor, message: impl Into<String>) {
        self.report(DiagnosticKind::BoundsError, anchor, message);
    }

    pub fn structural(&mut self, anchor: Anchor, message: impl Into<String>) {
        self.report(DiagnosticKind::StructuralError, anchor, message);
    }

    pub fn redundant(&mut self, anchor: Anchor, message: impl Into<String>) {
        self.report(DiagnosticKind::RedundancyWarning, anchor, message);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Problem> {
        self.items.iter()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.items.iter().map(|p| p.message.as_str()).collect()
    }

    pub fn into_vec(self) -> Vec<Problem> {
        self.items
    }
}

/// A problem attached to the source span it was found at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub span: SourceSpan,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, span: SourceSpan, message: String) -> Diagnostic {
        Diagnostic {
            kind,
            severity: kind.severity(),
            span,
            message,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}[{}]: {}",
            self.span.start, self.severity, self.kind, self.message
        )
    }
}

/// Failure to turn fixture text into a unit. Analysis itself never fails.
#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("syntax error: {0}")]
    Parse(#[from] ParseError),
    #[error("invalid unit: {0}")]
    Lower(#[from] LowerError),
}
