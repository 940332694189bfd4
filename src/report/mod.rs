//! Row schema handed to the report consolidation stage.
//!
//! Every analyzer flattens its findings into [`Row`]s. Rows for the same
//! symbol produced by different analyzers are kept side by side; nothing
//! here deduplicates.

use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;

use serde::Serialize;

/// Placeholder for columns a row does not use.
pub const EMPTY: &str = "-";

/// Which strategy produced a row. The tags are consumed verbatim downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum AnalyzerKind {
    /// Dynamic tracer signatures.
    #[serde(rename = "RightTyper")]
    RightTyper,
    /// Static inferencer symbols and returns.
    #[serde(rename = "Variable_Annotator")]
    VariableAnnotator,
    /// Missing-annotation audit.
    #[serde(rename = "AST")]
    Ast,
    /// Module globals observed after a traced run.
    #[serde(rename = "Conditional")]
    Conditional,
}

impl AnalyzerKind {
    /// The exact tag written into the `analyzer-kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzerKind::RightTyper => "RightTyper",
            AnalyzerKind::VariableAnnotator => "Variable_Annotator",
            AnalyzerKind::Ast => "AST",
            AnalyzerKind::Conditional => "Conditional",
        }
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One report row: `(module, function, return type, argument, argument
/// type, analyzer kind, variable, variable type)`, with [`EMPTY`] for unused
/// columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    /// Source file name.
    pub module: String,
    /// Function name, scope label, or `-`.
    pub function: String,
    /// Return type or `-`.
    pub return_type: String,
    /// Argument name or `-`.
    pub argument: String,
    /// Argument type or `-`.
    pub argument_type: String,
    /// Producing analyzer.
    pub kind: AnalyzerKind,
    /// Variable name or `-`.
    pub variable: String,
    /// Variable type or `-`.
    pub variable_type: String,
}

impl Row {
    fn blank(module: &str, kind: AnalyzerKind) -> Self {
        Self {
            module: module.to_string(),
            function: EMPTY.to_string(),
            return_type: EMPTY.to_string(),
            argument: EMPTY.to_string(),
            argument_type: EMPTY.to_string(),
            kind,
            variable: EMPTY.to_string(),
            variable_type: EMPTY.to_string(),
        }
    }

    /// A function return row.
    pub fn function_return(
        module: &str,
        kind: AnalyzerKind,
        function: &str,
        return_type: impl fmt::Display,
    ) -> Self {
        Self {
            function: function.to_string(),
            return_type: return_type.to_string(),
            ..Self::blank(module, kind)
        }
    }

    /// A function argument row.
    pub fn argument(
        module: &str,
        kind: AnalyzerKind,
        function: &str,
        argument: &str,
        argument_type: impl fmt::Display,
    ) -> Self {
        Self {
            function: function.to_string(),
            argument: argument.to_string(),
            argument_type: argument_type.to_string(),
            ..Self::blank(module, kind)
        }
    }

    /// A variable row; `scope` is a function name, `global`, or `-`.
    pub fn variable(
        module: &str,
        kind: AnalyzerKind,
        scope: &str,
        variable: &str,
        variable_type: impl fmt::Display,
    ) -> Self {
        Self {
            function: scope.to_string(),
            variable: variable.to_string(),
            variable_type: variable_type.to_string(),
            ..Self::blank(module, kind)
        }
    }

    /// Columns in schema order.
    pub fn columns(&self) -> [&str; 8] {
        [
            self.module.as_str(),
            self.function.as_str(),
            self.return_type.as_str(),
            self.argument.as_str(),
            self.argument_type.as_str(),
            self.kind.as_str(),
            self.variable.as_str(),
            self.variable_type.as_str(),
        ]
    }
}

/// A unit that contributed no rows, and why.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    /// Input path.
    pub path: PathBuf,
    /// Human-readable reason.
    pub reason: String,
}

/// Everything one batch run produced.
#[derive(Debug, Default, Serialize)]
pub struct Report {
    /// Rows from every analyzer, in production order.
    pub rows: Vec<Row>,
    /// Paired declared/inferred signature text from the tracer.
    pub signatures: Vec<String>,
    /// Units that were skipped or whose trace was discarded.
    pub failures: Vec<Failure>,
}

impl Report {
    /// Appends rows without deduplication.
    pub fn extend(&mut self, rows: impl IntoIterator<Item = Row>) {
        self.rows.extend(rows);
    }

    /// Records a unit-scoped failure.
    pub fn fail(&mut self, path: impl Into<PathBuf>, reason: impl fmt::Display) {
        self.failures.push(Failure { path: path.into(), reason: reason.to_string() });
    }

    /// Writes the rows as a numbered, tab-separated table.
    pub fn write_table<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(
            out,
            "SL_No\tModule\tFunction\tFunction_Return_Type\tFunction_Arguments\tFunction_Argument_Type\tAnnotator_Type\tVariable_Name\tVariable_Type"
        )?;
        for (i, row) in self.rows.iter().enumerate() {
            writeln!(out, "{}\t{}", i + 1, row.columns().join("\t"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_are_exact() {
        assert_eq!(AnalyzerKind::RightTyper.as_str(), "RightTyper");
        assert_eq!(AnalyzerKind::VariableAnnotator.as_str(), "Variable_Annotator");
        assert_eq!(AnalyzerKind::Ast.as_str(), "AST");
        assert_eq!(AnalyzerKind::Conditional.as_str(), "Conditional");
        assert_eq!(
            serde_json::to_string(&AnalyzerKind::VariableAnnotator).unwrap(),
            "\"Variable_Annotator\""
        );
    }

    #[test]
    fn test_rows_for_same_symbol_are_kept() {
        let mut report = Report::default();
        report.extend([
            Row::argument("m.py", AnalyzerKind::RightTyper, "f", "x", "int"),
            Row::argument("m.py", AnalyzerKind::Ast, "f", "x", "Missing Type Hint"),
        ]);
        assert_eq!(report.rows.len(), 2);
    }

    #[test]
    fn test_write_table() {
        let mut report = Report::default();
        report.extend([Row::variable("m.py", AnalyzerKind::VariableAnnotator, "global", "x", "int")]);
        let mut buf = Vec::new();
        report.write_table(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.lines().nth(1).unwrap().starts_with("1\tm.py\tglobal\t-\t-\t-\tVariable_Annotator\tx\tint"));
    }
}
