use crate::config::Options;
use crate::error::FrontendError;
use crate::flow::{analyze, Analysis};
use crate::hierarchy::{KnownHierarchy, TypeHierarchy};
use crate::lower::lower;
use crate::report::Report;
use crate::sexpr::parse;
use tracing::info;

/// Drives fixture text through reading, lowering and analysis.
pub struct Context {
    hierarchy: Box<dyn TypeHierarchy>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::with_hierarchy(KnownHierarchy::new())
    }

    pub fn with_hierarchy(hierarchy: impl TypeHierarchy + 'static) -> Self {
        Context {
            hierarchy: Box::new(hierarchy),
        }
    }

    pub fn analyze(&self, source: &str, options: &Options) -> Result<Analysis, FrontendError> {
        let forms = parse(source)?;
        let unit = lower(&forms)?;

        info!(statements = unit.body.statements.len(), "analyzing unit");

        Ok(analyze(&unit, options, self.hierarchy.as_ref()))
    }

    pub fn report(&self, source: &str, options: &Options) -> Result<Report, FrontendError> {
        let analysis = self.analyze(source, options)?;
        Ok(Report::new(&analysis))
    }
}
