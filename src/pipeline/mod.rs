//! Batch driver: one analysis invocation per input path.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;

use crate::analyzer::{audit_module, AnalysisResult, StaticInferencer};
use crate::config::TracerConfig;
use crate::error::{Error, Result};
use crate::parser::Parser;
use crate::report::Report;
use crate::tracer::RuntimeTracer;
use crate::utils::module_name;

/// Which analyzers run on every unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Analyses {
    /// Static inferencer (`Variable_Annotator` rows).
    pub infer: bool,
    /// Missing-annotation audit (`AST` rows).
    pub audit: bool,
    /// Dynamic tracer (`RightTyper` and `Conditional` rows).
    pub trace: bool,
}

impl Analyses {
    /// Every analyzer.
    pub fn all() -> Self {
        Self { infer: true, audit: true, trace: true }
    }
}

/// Output of one batch.
#[derive(Debug, Default, Serialize)]
pub struct BatchResult {
    /// Rows, signatures and failures.
    #[serde(flatten)]
    pub report: Report,
    /// Audit summaries, one per audited unit.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub audits: Vec<AnalysisResult>,
}

/// Runs the selected analyzers over a list of paths.
pub struct Pipeline {
    analyses: Analyses,
    tracer: RuntimeTracer,
}

impl Pipeline {
    /// Creates a driver.
    pub fn new(analyses: Analyses, config: TracerConfig) -> Self {
        Self { analyses, tracer: RuntimeTracer::new(config) }
    }

    /// Analyzes every path in order. Problems with one path are recorded as
    /// failures and never stop the batch.
    pub fn run(&self, paths: &[PathBuf]) -> BatchResult {
        let mut result = BatchResult::default();
        for path in paths {
            if let Err(e) = self.analyze_unit(path, &mut result) {
                warn!("skipping {}: {}", path.display(), e);
                result.report.fail(path, e);
            }
        }
        info!(
            "{} row(s) from {} path(s), {} failure(s)",
            result.report.rows.len(),
            paths.len(),
            result.report.failures.len()
        );
        result
    }

    fn analyze_unit(&self, path: &Path, result: &mut BatchResult) -> Result<()> {
        if !path.is_file() {
            return Err(Error::argument_error(format!("path does not exist: {}", path.display())));
        }
        let module = Parser::new()?.parse_file(path)?;
        let unit = module_name(path);
        info!("analyzing {}", unit);

        if self.analyses.infer {
            result.report.extend(StaticInferencer::infer(unit.as_str(), &module).rows());
        }
        if self.analyses.audit {
            let audit = audit_module(path, &module);
            result.report.extend(audit.rows.iter().cloned());
            result.audits.push(audit);
        }
        if self.analyses.trace {
            match self.tracer.run(path) {
                Ok(outcome) => {
                    result.report.extend(outcome.rows());
                    result.report.signatures.extend(outcome.paired_text());
                },
                Err(e) if e.is_unit_scoped() => {
                    warn!("trace of {} discarded: {}", unit, e);
                    result.report.fail(path, e);
                },
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
