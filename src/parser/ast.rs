//! Closed syntax representation produced by lowering the tree-sitter CST.
//!
//! Only the shapes the inferencers distinguish get their own variant;
//! everything else lowers to an `Other` variant so that every rule table
//! can match exhaustively.

use serde::Serialize;

/// 0-based row/column of a node in its source unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Position {
    /// 0-based line number.
    pub line: usize,
    /// 0-based column number.
    pub column: usize,
}

/// A parsed source unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    /// Top-level statements in source order.
    pub body: Vec<Stmt>,
}

impl Module {
    /// Function definitions appearing directly at module level, in source order.
    pub fn top_level_functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.body.iter().filter_map(|stmt| match stmt {
            Stmt::FunctionDef(def) => Some(def),
            _ => None,
        })
    }

    /// Every function definition in the unit, including methods and nested
    /// functions, in pre-order.
    pub fn all_functions(&self) -> Vec<&FunctionDef> {
        let mut out = Vec::new();
        collect_functions(&self.body, &mut out);
        out
    }
}

fn collect_functions<'a>(body: &'a [Stmt], out: &mut Vec<&'a FunctionDef>) {
    for stmt in body {
        match stmt {
            Stmt::FunctionDef(def) => {
                out.push(def);
                collect_functions(&def.body, out);
            },
            Stmt::ClassDef { body, .. } => collect_functions(body, out),
            _ => {
                for block in stmt.blocks() {
                    collect_functions(block, out);
                }
            },
        }
    }
}

/// A type annotation: the lowered expression plus its verbatim text.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Lowered annotation expression.
    pub expr: Expr,
    /// Source text exactly as written.
    pub text: String,
}

/// How a parameter binds its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Plain positional parameter without a default.
    Positional,
    /// Positional parameter with a default value.
    Defaulted,
    /// `*args`.
    VarArgs,
    /// Parameter after `*` or `*args`.
    KeywordOnly,
    /// `**kwargs`.
    VarKeywords,
}

/// A declared function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name without any `*` prefix.
    pub name: String,
    /// Binding kind.
    pub kind: ParamKind,
    /// Explicit annotation, if any.
    pub annotation: Option<Annotation>,
    /// Verbatim source text of the whole parameter.
    pub text: String,
    /// Location of the parameter.
    pub position: Position,
}

/// A `def` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    /// Function name.
    pub name: String,
    /// Declared parameters in order.
    pub params: Vec<Param>,
    /// Return annotation, if any.
    pub returns: Option<Annotation>,
    /// Function body.
    pub body: Vec<Stmt>,
    /// Verbatim parameter list including parentheses, e.g. `(a, b=2)`.
    pub params_text: String,
    /// Location of the `def` keyword.
    pub position: Position,
}

impl FunctionDef {
    /// The declared signature as written: `name(a, b=2) -> int`.
    pub fn declared_signature(&self) -> String {
        match &self.returns {
            Some(ret) => format!("{}{} -> {}", self.name, self.params_text, ret.text),
            None => format!("{}{}", self.name, self.params_text),
        }
    }
}

/// Assignment or loop target.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A bare name.
    Name(String),
    /// Tuple or list unpacking.
    Tuple(Vec<Target>),
    /// `*rest` inside an unpacking target.
    Starred(Box<Target>),
    /// Attribute or subscript target; never bound as a symbol.
    Other,
}

impl Target {
    /// All names bound by this target, in order.
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Target::Name(name) => out.push(name),
            Target::Tuple(items) => items.iter().for_each(|t| t.collect_names(out)),
            Target::Starred(inner) => inner.collect_names(out),
            Target::Other => {},
        }
    }
}

/// Statements.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `def`.
    FunctionDef(FunctionDef),
    /// `class`; its body shares the enclosing scope.
    ClassDef {
        /// Class name.
        name: String,
        /// Class body.
        body: Vec<Stmt>,
    },
    /// `a = b = value`.
    Assign {
        /// Targets left to right.
        targets: Vec<Target>,
        /// Right-hand side.
        value: Expr,
    },
    /// `name: T` or `name: T = value`.
    AnnAssign {
        /// Annotated target.
        target: Target,
        /// Declared type.
        annotation: Annotation,
        /// Optional right-hand side.
        value: Option<Expr>,
    },
    /// `target op= value`.
    AugAssign {
        /// Target.
        target: Target,
        /// Right-hand side.
        value: Expr,
    },
    /// `for target in iter`.
    For {
        /// Loop target.
        target: Target,
        /// Iterated expression.
        iter: Expr,
        /// Loop body.
        body: Vec<Stmt>,
        /// `else` block.
        orelse: Vec<Stmt>,
    },
    /// `while test`.
    While {
        /// Condition.
        test: Expr,
        /// Loop body.
        body: Vec<Stmt>,
        /// `else` block.
        orelse: Vec<Stmt>,
    },
    /// `if`/`elif`/`else`; `elif` chains nest in `orelse`.
    If {
        /// Condition.
        test: Expr,
        /// Taken branch.
        body: Vec<Stmt>,
        /// Remaining branches.
        orelse: Vec<Stmt>,
    },
    /// `with items: body`.
    With {
        /// Context expressions.
        items: Vec<Expr>,
        /// Body.
        body: Vec<Stmt>,
    },
    /// `try` with all its handler, `else` and `finally` blocks.
    Try {
        /// Guarded body.
        body: Vec<Stmt>,
        /// Except handler bodies.
        handlers: Vec<Vec<Stmt>>,
        /// `else` block.
        orelse: Vec<Stmt>,
        /// `finally` block.
        finalbody: Vec<Stmt>,
    },
    /// `return` with an optional value.
    Return(Option<Expr>),
    /// Expression statement.
    Expr(Expr),
    /// Anything without an inference rule (imports, `pass`, `match`, ...).
    Other,
}

impl Stmt {
    /// Nested statement blocks of compound statements, excluding function
    /// and class bodies.
    pub fn blocks(&self) -> Vec<&[Stmt]> {
        match self {
            Stmt::For { body, orelse, .. }
            | Stmt::While { body, orelse, .. }
            | Stmt::If { body, orelse, .. } => vec![body.as_slice(), orelse.as_slice()],
            Stmt::With { body, .. } => vec![body.as_slice()],
            Stmt::Try { body, handlers, orelse, finalbody } => {
                let mut out = vec![body.as_slice()];
                out.extend(handlers.iter().map(Vec::as_slice));
                out.push(orelse.as_slice());
                out.push(finalbody.as_slice());
                out
            },
            Stmt::FunctionDef(_)
            | Stmt::ClassDef { .. }
            | Stmt::Assign { .. }
            | Stmt::AnnAssign { .. }
            | Stmt::AugAssign { .. }
            | Stmt::Return(_)
            | Stmt::Expr(_)
            | Stmt::Other => Vec::new(),
        }
    }
}

/// Scalar literal kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    /// Integer literal.
    Int,
    /// Float literal.
    Float,
    /// Imaginary literal such as `2j`.
    Complex,
    /// String or f-string literal.
    Str,
    /// `b"..."` literal.
    Bytes,
    /// `True` / `False`.
    Bool,
    /// `None`.
    None,
}

/// Expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A scalar literal.
    Literal(Literal),
    /// A bare identifier.
    Name(String),
    /// `[a, b]`.
    List(Vec<Expr>),
    /// `(a, b)`.
    Tuple(Vec<Expr>),
    /// `{a, b}`.
    Set(Vec<Expr>),
    /// `{k: v}`; `**splat` entries are dropped.
    Dict(Vec<(Expr, Expr)>),
    /// `[x for ...]`.
    ListComp,
    /// `{x for ...}`.
    SetComp,
    /// `{k: v for ...}`.
    DictComp,
    /// `(x for ...)`.
    Generator,
    /// `func(args, key=value)`.
    Call {
        /// Callee.
        func: Box<Expr>,
        /// Positional arguments, starred ones included.
        args: Vec<Expr>,
        /// Keyword arguments.
        keywords: Vec<(String, Expr)>,
    },
    /// `value.attr`.
    Attribute {
        /// Object expression.
        value: Box<Expr>,
        /// Attribute name.
        attr: String,
    },
    /// `value[index, ...]`.
    Subscript {
        /// Subscripted expression.
        value: Box<Expr>,
        /// Index expressions.
        index: Vec<Expr>,
    },
    /// `left op right` for arithmetic and bitwise operators.
    BinOp {
        /// Left operand.
        left: Box<Expr>,
        /// Operator text.
        op: String,
        /// Right operand.
        right: Box<Expr>,
    },
    /// `-x`, `+x`, `~x`.
    UnaryOp(Box<Expr>),
    /// Comparison chain or `not x`.
    Test,
    /// `lambda a, b: body`.
    Lambda {
        /// Number of declared parameters.
        arity: usize,
        /// Body expression.
        body: Box<Expr>,
    },
    /// `*value` in a call or display.
    Starred(Box<Expr>),
    /// Any other expression shape.
    Other,
}

impl Expr {
    /// The called name of a call target: `f` for `f(...)`, `m` for `x.m(...)`.
    pub fn callee_name(&self) -> Option<&str> {
        match self {
            Expr::Name(name) => Some(name),
            Expr::Attribute { attr, .. } => Some(attr),
            _ => None,
        }
    }

    /// Whether this is the bare identifier `name`.
    pub fn is_name(&self, name: &str) -> bool {
        matches!(self, Expr::Name(n) if n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_names() {
        let target = Target::Tuple(vec![
            Target::Name("a".into()),
            Target::Starred(Box::new(Target::Name("rest".into()))),
            Target::Other,
        ]);
        assert_eq!(target.names(), vec!["a", "rest"]);
    }

    #[test]
    fn test_callee_name() {
        let attr = Expr::Attribute { value: Box::new(Expr::Name("x".into())), attr: "m".into() };
        assert_eq!(attr.callee_name(), Some("m"));
        assert_eq!(Expr::Other.callee_name(), None);
    }
}
