//! Missing-annotation audit.

use std::path::Path;

use serde::Serialize;

use crate::parser::ast::{FunctionDef, Module, ParamKind, Stmt};
use crate::report::{AnalyzerKind, Row, EMPTY};
use crate::utils::module_name;

/// Cell text for a parameter without an annotation.
pub const MISSING_PARAM: &str = "Missing Type Hint";

/// Cell text for a function without a return annotation.
pub const MISSING_RETURN: &str = "Missing Return Type Hint";

/// Simple diagnostic record produced by the audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// File path of the diagnostic.
    pub path: String,
    /// 0-based line number where the issue was found.
    pub line: usize,
    /// 0-based column number where the issue was found.
    pub column: usize,
    /// Human-readable message.
    pub message: String,
    /// Severity string (e.g., "warning", "error").
    pub severity: String,
}

/// Per-file audit summary.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    /// Input path of the analyzed file.
    pub path: String,
    /// Number of Python function definitions, methods and nested ones included.
    pub function_count: usize,
    /// Number of Python class definitions.
    pub class_count: usize,
    /// Collected diagnostics for this file.
    pub diagnostics: Vec<Diagnostic>,
    /// `AST` rows for the report.
    #[serde(skip)]
    pub rows: Vec<Row>,
}

/// Flags every positional parameter and every function lacking an annotation.
pub fn audit_module(path: &Path, module: &Module) -> AnalysisResult {
    let display = path.to_string_lossy().to_string();
    let unit = module_name(path);
    let functions = module.all_functions();

    let mut diagnostics = Vec::new();
    let mut rows = Vec::new();
    for def in &functions {
        audit_function(def, &display, &unit, &mut diagnostics, &mut rows);
    }

    AnalysisResult {
        path: display,
        function_count: functions.len(),
        class_count: count_classes(&module.body),
        diagnostics,
        rows,
    }
}

fn audit_function(
    def: &FunctionDef,
    path: &str,
    unit: &str,
    diagnostics: &mut Vec<Diagnostic>,
    rows: &mut Vec<Row>,
) {
    let warning = |line, column, message: String| Diagnostic {
        path: path.to_string(),
        line,
        column,
        message,
        severity: "warning".to_string(),
    };

    let missing = def.params.iter().filter(|p| {
        p.annotation.is_none() && matches!(p.kind, ParamKind::Positional | ParamKind::Defaulted)
    });
    for param in missing {
        diagnostics.push(warning(
            param.position.line,
            param.position.column,
            format!("Missing type annotation for parameter '{}' of '{}'", param.name, def.name),
        ));
        rows.push(Row::argument(unit, AnalyzerKind::Ast, &def.name, &param.name, MISSING_PARAM));
    }

    if def.returns.is_none() {
        diagnostics.push(warning(
            def.position.line,
            def.position.column,
            format!("Missing return type annotation for '{}'", def.name),
        ));
        rows.push(Row::variable(
            unit,
            AnalyzerKind::Ast,
            EMPTY,
            &format!("{} (return)", def.name),
            MISSING_RETURN,
        ));
    }
}

fn count_classes(body: &[Stmt]) -> usize {
    body.iter()
        .map(|stmt| match stmt {
            Stmt::ClassDef { body, .. } => 1 + count_classes(body),
            Stmt::FunctionDef(def) => count_classes(&def.body),
            other => other.blocks().into_iter().map(count_classes).sum(),
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn audit(source: &str) -> AnalysisResult {
        let module = Parser::new().unwrap().parse_module(source).unwrap();
        audit_module(Path::new("pkg/sample.py"), &module)
    }

    #[test]
    fn test_counts() {
        let result = audit("class A:\n    def m(self) -> None:\n        pass\n\ndef f(x: int) -> int:\n    return x\n");
        assert_eq!(result.function_count, 2);
        assert_eq!(result.class_count, 1);
        // `self` is still an unannotated positional parameter.
        assert_eq!(result.diagnostics.len(), 1);
    }

    #[test]
    fn test_missing_annotations() {
        let result = audit("def f(a, b: int, c=1, *args, d, **kw):\n    pass\n");
        let rows: Vec<_> = result.rows.iter().map(|r| r.columns()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], ["sample.py", "f", "-", "a", MISSING_PARAM, "AST", "-", "-"]);
        assert_eq!(rows[1], ["sample.py", "f", "-", "c", MISSING_PARAM, "AST", "-", "-"]);
        assert_eq!(rows[2], ["sample.py", "-", "-", "-", "-", "AST", "f (return)", MISSING_RETURN]);
        assert!(result.diagnostics.iter().all(|d| d.severity == "warning"));
        assert_eq!(result.diagnostics[0].line, 0);
    }

    #[test]
    fn test_fully_annotated_is_clean() {
        let result = audit("def f(a: int) -> str:\n    return str(a)\n");
        assert!(result.diagnostics.is_empty());
        assert!(result.rows.is_empty());
    }
}
