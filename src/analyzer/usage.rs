//! Usage heuristics for unannotated parameters.

use crate::parser::ast::{Expr, Stmt, Target};

/// One way a parameter is used inside its own function body.
#[derive(Debug, Clone, PartialEq)]
pub enum UsageSignal<'a> {
    /// `param = value`.
    Reassigned(&'a Expr),
    /// `other = param`.
    CopiedTo(&'a str),
    /// `callee(..., param, ...)` with `param` at `position`.
    CallArgument {
        /// Called name.
        callee: &'a str,
        /// 0-based positional index of the argument.
        position: usize,
    },
}

/// Every usage signal for `param` in `body`, in source order.
///
/// Nested function and class bodies are included; they share the
/// enclosing function's scope.
pub fn usage_signals<'a>(body: &'a [Stmt], param: &str) -> Vec<UsageSignal<'a>> {
    let mut out = Vec::new();
    for stmt in body {
        walk_stmt(stmt, param, &mut out);
    }
    out
}

fn walk_block<'a>(body: &'a [Stmt], param: &str, out: &mut Vec<UsageSignal<'a>>) {
    for stmt in body {
        walk_stmt(stmt, param, out);
    }
}

fn walk_stmt<'a>(stmt: &'a Stmt, param: &str, out: &mut Vec<UsageSignal<'a>>) {
    match stmt {
        Stmt::Assign { targets, value } => {
            if targets.iter().any(|t| matches!(t, Target::Name(n) if n == param)) {
                out.push(UsageSignal::Reassigned(value));
            } else if value.is_name(param) {
                if let Some(Target::Name(other)) = targets.first() {
                    out.push(UsageSignal::CopiedTo(other));
                }
            }
            walk_expr(value, param, out);
        },
        Stmt::AnnAssign { target, value, .. } => {
            if let (Target::Name(other), Some(value)) = (target, value) {
                if value.is_name(param) && other != param {
                    out.push(UsageSignal::CopiedTo(other));
                }
            }
            if let Some(value) = value {
                walk_expr(value, param, out);
            }
        },
        Stmt::AugAssign { value, .. } => walk_expr(value, param, out),
        Stmt::For { iter, body, orelse, .. } => {
            walk_expr(iter, param, out);
            walk_block(body, param, out);
            walk_block(orelse, param, out);
        },
        Stmt::While { test, body, orelse } | Stmt::If { test, body, orelse } => {
            walk_expr(test, param, out);
            walk_block(body, param, out);
            walk_block(orelse, param, out);
        },
        Stmt::With { items, body } => {
            items.iter().for_each(|item| walk_expr(item, param, out));
            walk_block(body, param, out);
        },
        Stmt::Try { .. } => {
            for block in stmt.blocks() {
                walk_block(block, param, out);
            }
        },
        Stmt::FunctionDef(def) => walk_block(&def.body, param, out),
        Stmt::ClassDef { body, .. } => walk_block(body, param, out),
        Stmt::Return(Some(value)) | Stmt::Expr(value) => walk_expr(value, param, out),
        Stmt::Return(None) | Stmt::Other => {},
    }
}

fn walk_expr<'a>(expr: &'a Expr, param: &str, out: &mut Vec<UsageSignal<'a>>) {
    match expr {
        Expr::Call { func, args, keywords } => {
            walk_expr(func, param, out);
            let callee = func.callee_name();
            for (position, arg) in args.iter().enumerate() {
                match callee {
                    Some(callee) if arg.is_name(param) => {
                        out.push(UsageSignal::CallArgument { callee, position })
                    },
                    _ => walk_expr(arg, param, out),
                }
            }
            keywords.iter().for_each(|(_, value)| walk_expr(value, param, out));
        },
        Expr::List(items) | Expr::Tuple(items) | Expr::Set(items) => {
            items.iter().for_each(|item| walk_expr(item, param, out))
        },
        Expr::Dict(entries) => entries.iter().for_each(|(k, v)| {
            walk_expr(k, param, out);
            walk_expr(v, param, out);
        }),
        Expr::Attribute { value, .. } => walk_expr(value, param, out),
        Expr::Subscript { value, index } => {
            walk_expr(value, param, out);
            index.iter().for_each(|i| walk_expr(i, param, out));
        },
        Expr::BinOp { left, right, .. } => {
            walk_expr(left, param, out);
            walk_expr(right, param, out);
        },
        Expr::UnaryOp(inner) | Expr::Starred(inner) => walk_expr(inner, param, out),
        Expr::Lambda { body, .. } => walk_expr(body, param, out),
        Expr::Literal(_)
        | Expr::Name(_)
        | Expr::ListComp
        | Expr::SetComp
        | Expr::DictComp
        | Expr::Generator
        | Expr::Test
        | Expr::Other => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn body(source: &str) -> Vec<Stmt> {
        let module = Parser::new().unwrap().parse_module(source).unwrap();
        let body = module.top_level_functions().next().unwrap().body.clone();
        body
    }

    #[test]
    fn test_signals_in_source_order() {
        let body = body("def f(p):\n    log(p)\n    q = p\n    p = 3\n");
        let signals = usage_signals(&body, "p");
        assert_eq!(signals.len(), 3);
        assert_eq!(signals[0], UsageSignal::CallArgument { callee: "log", position: 0 });
        assert_eq!(signals[1], UsageSignal::CopiedTo("q"));
        assert!(matches!(signals[2], UsageSignal::Reassigned(_)));
    }

    #[test]
    fn test_nested_call_argument_position() {
        let body = body("def f(p):\n    return g(1, h(p))\n");
        assert_eq!(
            usage_signals(&body, "p"),
            vec![UsageSignal::CallArgument { callee: "h", position: 0 }]
        );
    }

    #[test]
    fn test_no_usage() {
        let body = body("def f(p):\n    return 1\n");
        assert!(usage_signals(&body, "p").is_empty());
    }
}
