//! Static analysis for type inference.
//!
//! [`StaticInferencer`] walks one lowered source unit depth-first, keeps a
//! flat symbol table keyed by `(unit, scope, name)`, and resolves function
//! return types intra-unit so later calls can reuse them.

pub mod audit;
pub mod scope;
pub mod usage;

use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;
use serde::Serialize;

use crate::parser::ast::{Expr, FunctionDef, Module, ParamKind, Stmt, Target};
use crate::report::{AnalyzerKind, Row};
use crate::types::Type;

use self::scope::{ScopeId, ScopeState, ScopeTree};
use self::usage::{usage_signals, UsageSignal};

pub use self::audit::{audit_module, AnalysisResult, Diagnostic};

/// Identity of a recorded name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Symbol {
    /// Source unit the name lives in.
    pub unit: String,
    /// `global` or a top-level function name.
    pub scope: String,
    /// Bound name.
    pub name: String,
}

impl Symbol {
    /// Creates a symbol.
    pub fn new(unit: impl Into<String>, scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self { unit: unit.into(), scope: scope.into(), name: name.into() }
    }
}

/// Symbol to descriptor mapping for one unit; read-only once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    entries: BTreeMap<Symbol, Type>,
}

impl SymbolTable {
    /// Descriptor recorded for `symbol`.
    pub fn get(&self, symbol: &Symbol) -> Option<&Type> {
        self.entries.get(symbol)
    }

    /// Descriptor recorded for `name` in `scope`.
    pub fn lookup(&self, unit: &str, scope: &str, name: &str) -> Option<&Type> {
        self.get(&Symbol::new(unit, scope, name))
    }

    /// Entries in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Type)> {
        self.entries.iter()
    }

    /// Number of recorded symbols.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of statically analyzing one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticReport {
    /// Unit label (file name).
    pub unit: String,
    /// Every recorded symbol.
    pub symbols: SymbolTable,
    /// Chosen return descriptor per function name.
    pub returns: BTreeMap<String, Type>,
}

impl StaticReport {
    /// Report rows: one per symbol, then one per function return.
    pub fn rows(&self) -> Vec<Row> {
        let kind = AnalyzerKind::VariableAnnotator;
        let symbols = self
            .symbols
            .iter()
            .map(|(sym, ty)| Row::variable(&self.unit, kind, &sym.scope, &sym.name, ty));
        let returns =
            self.returns.iter().map(|(name, ty)| Row::function_return(&self.unit, kind, name, ty));
        symbols.chain(returns).collect()
    }
}

/// Per-function state kept while its subtree is visited.
#[derive(Debug, Default)]
struct FunctionFrame {
    returns: Vec<Type>,
    /// Parameters resolved on exit from another name's final type.
    deferred: Vec<(Symbol, Symbol)>,
}

/// Positional parameter names of a visited function, for call-argument
/// resolution.
#[derive(Debug, Clone)]
struct KnownFunction {
    scope: String,
    params: Vec<String>,
}

/// Scope-aware single-pass type inferencer over one source unit.
#[derive(Debug)]
pub struct StaticInferencer {
    unit: String,
    scopes: ScopeTree,
    current: ScopeId,
    symbols: BTreeMap<Symbol, Type>,
    annotated: HashSet<Symbol>,
    returns: BTreeMap<String, Type>,
    functions: HashMap<String, KnownFunction>,
    frames: Vec<FunctionFrame>,
}

impl StaticInferencer {
    /// Creates an inferencer for the unit labelled `unit`.
    pub fn new(unit: impl Into<String>) -> Self {
        let scopes = ScopeTree::new();
        let current = scopes.root();
        Self {
            unit: unit.into(),
            scopes,
            current,
            symbols: BTreeMap::new(),
            annotated: HashSet::new(),
            returns: BTreeMap::new(),
            functions: HashMap::new(),
            frames: Vec::new(),
        }
    }

    /// Analyzes `module` and returns its symbol table and return types.
    pub fn infer(unit: impl Into<String>, module: &Module) -> StaticReport {
        let mut inferencer = Self::new(unit);
        inferencer.visit_block(&module.body);
        debug_assert_eq!(inferencer.state(), ScopeState::AtModuleScope);
        inferencer.finish()
    }

    /// Current recording state.
    pub fn state(&self) -> ScopeState {
        self.scopes.state(self.current)
    }

    fn finish(self) -> StaticReport {
        StaticReport {
            unit: self.unit,
            symbols: SymbolTable { entries: self.symbols },
            returns: self.returns,
        }
    }

    fn symbol(&self, name: &str) -> Symbol {
        Symbol::new(self.unit.as_str(), self.scopes.label(self.current), name)
    }

    fn bind(&mut self, name: &str, ty: Type) {
        let symbol = self.symbol(name);
        if self.annotated.contains(&symbol) {
            debug!("{}: keeping annotated type for {}", self.unit, name);
            return;
        }
        debug!("{}: {}::{} -> {}", self.unit, symbol.scope, name, ty);
        self.symbols.insert(symbol, ty);
    }

    fn bind_annotated(&mut self, name: &str, ty: Type) {
        let symbol = self.symbol(name);
        debug!("{}: {}::{} annotated as {}", self.unit, symbol.scope, name, ty);
        self.annotated.insert(symbol.clone());
        self.symbols.insert(symbol, ty);
    }

    fn bind_target(&mut self, target: &Target, ty: &Type) {
        match target {
            Target::Name(name) => self.bind(name, ty.clone()),
            Target::Tuple(_) | Target::Starred(_) => {
                for name in target.names() {
                    self.bind(name, Type::Unknown);
                }
            },
            Target::Other => {},
        }
    }

    /// Recorded type of `name`, searching outwards from the current scope.
    fn lookup(&self, name: &str) -> Option<&Type> {
        self.scopes
            .lookup_chain(self.current)
            .into_iter()
            .find_map(|scope| self.symbols.get(&Symbol::new(self.unit.as_str(), scope, name)))
    }

    fn visit_block(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::FunctionDef(def) => self.visit_function(def),
            Stmt::ClassDef { body, .. } => self.visit_block(body),
            Stmt::Assign { targets, value } => {
                let ty = self.infer_expr(value);
                for target in targets {
                    self.bind_target(target, &ty);
                }
            },
            Stmt::AnnAssign { target, annotation, .. } => {
                if let Target::Name(name) = target {
                    self.bind_annotated(name, Type::from_annotation(annotation));
                }
            },
            Stmt::For { target, iter, body, orelse } => {
                self.bind_loop_target(target, iter);
                self.visit_block(body);
                self.visit_block(orelse);
            },
            Stmt::Return(value) => {
                let ty = match value {
                    Some(expr) => self.infer_expr(expr),
                    None => Type::primitive("None"),
                };
                if let Some(frame) = self.frames.last_mut() {
                    frame.returns.push(ty);
                }
            },
            Stmt::While { .. } | Stmt::If { .. } | Stmt::With { .. } | Stmt::Try { .. } => {
                for block in stmt.blocks() {
                    self.visit_block(block);
                }
            },
            Stmt::AugAssign { .. } | Stmt::Expr(_) | Stmt::Other => {},
        }
    }

    fn visit_function(&mut self, def: &FunctionDef) {
        let parent = self.current;
        self.current = self.scopes.push_function(parent, &def.name);
        self.frames.push(FunctionFrame::default());
        debug!("{}: entering {:?}", self.unit, self.state());

        for param in &def.params {
            match &param.annotation {
                Some(annotation) => {
                    self.bind_annotated(&param.name, Type::from_annotation(annotation))
                },
                None => self.infer_parameter(def, &param.name),
            }
        }
        self.functions.insert(
            def.name.clone(),
            KnownFunction {
                scope: self.scopes.label(self.current).to_string(),
                params: def
                    .params
                    .iter()
                    .filter(|p| matches!(p.kind, ParamKind::Positional | ParamKind::Defaulted))
                    .map(|p| p.name.clone())
                    .collect(),
            },
        );

        self.visit_block(&def.body);

        let frame = self.frames.pop().unwrap_or_default();
        for (param, source) in frame.deferred {
            let ty = self.symbols.get(&source).cloned().unwrap_or(Type::Unknown);
            if !self.annotated.contains(&param) {
                self.symbols.insert(param, ty);
            }
        }
        let chosen = match &def.returns {
            Some(annotation) => Some(Type::from_annotation(annotation)),
            None => choose_return(&frame.returns),
        };
        if let Some(ty) = chosen {
            debug!("{}: {} returns {}", self.unit, def.name, ty);
            self.returns.insert(def.name.clone(), ty);
        }

        self.current = parent;
    }

    /// Applies the usage heuristics to an unannotated parameter; the first
    /// signal that resolves wins.
    fn infer_parameter(&mut self, def: &FunctionDef, name: &str) {
        for signal in usage_signals(&def.body, name) {
            match signal {
                UsageSignal::Reassigned(value) => {
                    let ty = self.infer_expr(value);
                    self.bind(name, ty);
                    return;
                },
                UsageSignal::CopiedTo(other) => {
                    let param = self.symbol(name);
                    let source = self.symbol(other);
                    self.bind(name, Type::Unknown);
                    if let Some(frame) = self.frames.last_mut() {
                        frame.deferred.push((param, source));
                    }
                    return;
                },
                UsageSignal::CallArgument { callee, position } => {
                    if let Some(ty) = self.resolve_argument(callee, position) {
                        self.bind(name, ty);
                        return;
                    }
                },
            }
        }
        self.bind(name, Type::NoUsageSignal);
    }

    /// Type of parameter `position` of an already visited function.
    fn resolve_argument(&self, callee: &str, position: usize) -> Option<Type> {
        let known = self.functions.get(callee)?;
        let param = known.params.get(position)?;
        let ty = self.symbols.get(&Symbol::new(self.unit.as_str(), known.scope.as_str(), param))?;
        match ty {
            Type::Unknown | Type::NoUsageSignal => None,
            other => Some(other.clone()),
        }
    }

    fn bind_loop_target(&mut self, target: &Target, iter: &Expr) {
        if let Some((index, item, iterable)) = enumerate_shape(target, iter) {
            self.bind(index, Type::primitive("int"));
            let item_ty = match iterable {
                Expr::Name(name) => self.lookup(name).and_then(Type::element),
                _ => None,
            };
            self.bind(item, item_ty.unwrap_or(Type::Unknown));
            return;
        }
        for name in target.names() {
            self.bind(name, Type::Unknown);
        }
    }

    /// Resolves an expression; anything unclassifiable is `Unknown`.
    pub fn infer_expr(&self, expr: &Expr) -> Type {
        match expr {
            Expr::Literal(_) | Expr::List(_) | Expr::Tuple(_) | Expr::Set(_) | Expr::Dict(_) => {
                Type::from_literal(expr)
            },
            Expr::ListComp => Type::list(Type::Unknown),
            Expr::SetComp => Type::set(Type::Unknown),
            Expr::DictComp => Type::dict(Type::Unknown, Type::Unknown),
            Expr::Call { func, .. } => self.infer_call(func),
            // No numeric promotion: `a + b` is typed as `a`.
            Expr::BinOp { left, .. } => self.infer_expr(left),
            Expr::UnaryOp(operand) => self.infer_expr(operand),
            Expr::Test => Type::primitive("bool"),
            Expr::Lambda { arity, body } => Type::Function {
                params: vec![Type::Unknown; *arity],
                returns: Box::new(self.infer_expr(body)),
            },
            Expr::Name(_)
            | Expr::Attribute { .. }
            | Expr::Subscript { .. }
            | Expr::Generator
            | Expr::Starred(_)
            | Expr::Other => Type::Unknown,
        }
    }

    fn infer_call(&self, func: &Expr) -> Type {
        let Some(name) = func.callee_name() else {
            return Type::CallResult;
        };
        if let Some(ty) = self.returns.get(name) {
            return ty.clone();
        }
        match name {
            "int" | "float" | "str" | "bool" | "bytes" => Type::primitive(name),
            "input" => Type::primitive("str"),
            "list" => Type::list(Type::Unknown),
            "set" => Type::set(Type::Unknown),
            "tuple" => Type::Tuple(Vec::new()),
            "dict" => Type::dict(Type::Unknown, Type::Unknown),
            _ => Type::CallResult,
        }
    }
}

/// Matches `for index, item in enumerate(iterable)` exactly.
fn enumerate_shape<'a>(target: &'a Target, iter: &'a Expr) -> Option<(&'a str, &'a str, &'a Expr)> {
    let Target::Tuple(items) = target else {
        return None;
    };
    let [Target::Name(index), Target::Name(item)] = items.as_slice() else {
        return None;
    };
    let Expr::Call { func, args, .. } = iter else {
        return None;
    };
    if !func.is_name("enumerate") {
        return None;
    }
    Some((index.as_str(), item.as_str(), args.first()?))
}

/// Picks the first container or function descriptor, else the first
/// non-`Unknown` one, else the first seen.
fn choose_return(candidates: &[Type]) -> Option<Type> {
    candidates
        .iter()
        .find(|ty| ty.is_container() || ty.is_function())
        .or_else(|| candidates.iter().find(|ty| **ty != Type::Unknown))
        .or_else(|| candidates.first())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn analyze(source: &str) -> StaticReport {
        let module = Parser::new().unwrap().parse_module(source).unwrap();
        StaticInferencer::infer("sample.py", &module)
    }

    fn ty(report: &StaticReport, scope: &str, name: &str) -> String {
        report
            .symbols
            .lookup("sample.py", scope, name)
            .unwrap_or_else(|| panic!("{}::{} not recorded", scope, name))
            .to_string()
    }

    #[test]
    fn test_literal_assignments() {
        let report = analyze("a = 1\nb = [1, 2, 3]\nc = []\nd = {'k': 1.5}\ne = a + 2\n");
        assert_eq!(ty(&report, "global", "a"), "int");
        assert_eq!(ty(&report, "global", "b"), "list[int]");
        assert_eq!(ty(&report, "global", "c"), "list[Unknown]");
        assert_eq!(ty(&report, "global", "d"), "dict[str, float]");
        assert_eq!(ty(&report, "global", "e"), "Unknown");
    }

    #[test]
    fn test_binary_operation_uses_left_operand() {
        let report = analyze("x = 1 + 2.5\ny = 'a' * 3\n");
        assert_eq!(ty(&report, "global", "x"), "int");
        assert_eq!(ty(&report, "global", "y"), "str");
    }

    #[test]
    fn test_tuple_unpacking_is_unknown() {
        let report = analyze("a, b = 1, 2\n[c, *d] = [1, 2, 3]\n");
        for name in ["a", "b", "c", "d"] {
            assert_eq!(ty(&report, "global", name), "Unknown");
        }
    }

    #[test]
    fn test_annotation_overrides_inference() {
        let report = analyze("x: float = 1\nx = 'text'\n");
        assert_eq!(ty(&report, "global", "x"), "float");
    }

    #[test]
    fn test_enumerate_loop() {
        let source = "\
items = [1, 2]
for i, x in enumerate(items):
    pass
for j, y in enumerate(get()):
    pass
for k in items:
    pass
for p, q in pairs:
    pass
";
        let report = analyze(source);
        assert_eq!(ty(&report, "global", "i"), "int");
        assert_eq!(ty(&report, "global", "x"), "int");
        assert_eq!(ty(&report, "global", "j"), "int");
        assert_eq!(ty(&report, "global", "y"), "Unknown");
        assert_eq!(ty(&report, "global", "k"), "Unknown");
        assert_eq!(ty(&report, "global", "p"), "Unknown");
        assert_eq!(ty(&report, "global", "q"), "Unknown");
    }

    #[test]
    fn test_enumerate_item_sees_module_symbol_from_function() {
        let source = "\
names = ['a', 'b']
def show():
    for i, name in enumerate(names):
        print(i, name)
";
        let report = analyze(source);
        assert_eq!(ty(&report, "show", "i"), "int");
        assert_eq!(ty(&report, "show", "name"), "str");
    }

    #[test]
    fn test_enumerate_over_annotated_parameter() {
        let source = "\
def report(names: list[str], tag: Optional[int]):
    for i, name in enumerate(names):
        print(i, name)
";
        let report = analyze(source);
        assert_eq!(ty(&report, "report", "names"), "list[str]");
        assert_eq!(ty(&report, "report", "tag"), "Union[None, int]");
        assert_eq!(ty(&report, "report", "i"), "int");
        assert_eq!(ty(&report, "report", "name"), "str");
    }

    #[test]
    fn test_parameter_heuristics() {
        let source = "\
def takes_int(n: int):
    return n

def reassigned(a):
    a = 'fallback'
    return a

def copied(b):
    c = b
    c: list = []

def passed(d):
    takes_int(d)

def unused(e):
    return 1
";
        let report = analyze(source);
        assert_eq!(ty(&report, "takes_int", "n"), "int");
        assert_eq!(ty(&report, "reassigned", "a"), "str");
        assert_eq!(ty(&report, "copied", "b"), "list[Unknown]");
        assert_eq!(ty(&report, "passed", "d"), "int");
        assert_eq!(ty(&report, "unused", "e"), "function_param");
    }

    #[test]
    fn test_unresolved_call_argument_falls_through() {
        let source = "def f(x):\n    print(x)\n    x = 2\n";
        let report = analyze(source);
        assert_eq!(ty(&report, "f", "x"), "int");
    }

    #[test]
    fn test_return_prefers_container_over_unknown() {
        let source = "\
def build(flag):
    if flag:
        return helper.value
    return {'a': 1}

result = build(True)
";
        let report = analyze(source);
        assert_eq!(report.returns["build"], Type::dict(Type::primitive("str"), Type::primitive("int")));
        assert_eq!(ty(&report, "global", "result"), "dict[str, int]");
    }

    #[test]
    fn test_call_resolution_order() {
        let source = "\
a = int('3')
b = list()
c = unknown_fn()
d = later()
def later():
    return 1.0
e = later()
";
        let report = analyze(source);
        assert_eq!(ty(&report, "global", "a"), "int");
        assert_eq!(ty(&report, "global", "b"), "list[Unknown]");
        assert_eq!(ty(&report, "global", "c"), "function_call");
        assert_eq!(ty(&report, "global", "d"), "function_call");
        assert_eq!(ty(&report, "global", "e"), "float");
    }

    #[test]
    fn test_nested_function_collapses_into_outer_scope() {
        let source = "\
def outer():
    x = 1
    def inner():
        y = 'a'
        return y
    return inner
z = 2
";
        let report = analyze(source);
        assert_eq!(ty(&report, "outer", "x"), "int");
        assert_eq!(ty(&report, "outer", "y"), "str");
        assert_eq!(ty(&report, "global", "z"), "int");
        assert!(report.symbols.lookup("sample.py", "inner", "y").is_none());
        assert_eq!(report.returns["inner"], Type::Unknown);
    }

    #[test]
    fn test_class_body_collapses_into_module() {
        let report = analyze("class Config:\n    retries = 3\n    def load(self):\n        path = 'x'\n");
        assert_eq!(ty(&report, "global", "retries"), "int");
        assert_eq!(ty(&report, "load", "path"), "str");
    }

    #[test]
    fn test_deterministic_tables() {
        let source = "a = [1, 'x']\ndef f(p, q):\n    r = q\n    return (p, q)\n";
        assert_eq!(analyze(source), analyze(source));
    }

    #[test]
    fn test_rows() {
        let report = analyze("x = 1\ndef f():\n    return 'a'\n");
        let rows = report.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].columns(), ["sample.py", "global", "-", "-", "-", "Variable_Annotator", "x", "int"]);
        assert_eq!(rows[1].columns(), ["sample.py", "f", "str", "-", "-", "Variable_Annotator", "-", "-"]);
    }
}
