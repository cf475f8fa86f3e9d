use crate::error::Diagnostic;
use crate::flow::Analysis;
use crate::source_location::SourceLocation;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BindingLine {
    pub location: SourceLocation,
    pub name: String,
    pub descr: String,
}

/// What a unit's analysis shows to a reader: the value every binding receives and the
/// diagnostics, both in source order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Report {
    pub bindings: Vec<BindingLine>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn new(analysis: &Analysis) -> Report {
        let bindings = analysis
            .bindings
            .iter()
            .map(|binding| BindingLine {
                location: binding.span.start,
                name: binding.name.to_string(),
                descr: binding.value.to_string(),
            })
            .collect();

        Report {
            bindings,
            diagnostics: analysis.diagnostics.clone(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == crate::error::Severity::Error)
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for binding in &self.bindings {
            writeln!(f, "{} {} = {}", binding.location, binding.name, binding.descr)?;
        }

        for diagnostic in &self.diagnostics {
            writeln!(f, "{}", diagnostic)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use crate::flow::Binding;
    use crate::source_location::SourceSpan;
    use crate::value::Value;

    fn report() -> Report {
        let at = |line, col| SourceSpan::single(SourceLocation::new(line, col));

        let analysis = Analysis {
            bindings: vec![Binding {
                span: at(1, 6),
                name: "mh".into(),
                value: Value::Unknown,
            }],
            diagnostics: vec![Diagnostic::new(
                DiagnosticKind::RedundancyWarning,
                at(2, 1),
                "Call to 'asFixedArity' is redundant".to_string(),
            )],
            ..Analysis::default()
        };

        Report::new(&analysis)
    }

    #[test]
    fn text() {
        let report = report();
        assert!(!report.has_errors());
        assert_eq!(
            report.to_string(),
            "1:6 mh = ⊤\n2:1 warning[RedundancyWarning]: Call to 'asFixedArity' is redundant\n"
        );
    }

    #[test]
    fn ron() {
        let text = report().to_ron().unwrap();
        assert!(text.contains("name: \"mh\""));
        assert!(text.contains("kind: RedundancyWarning"));
        assert!(text.contains("severity: Warning"));
    }
}
