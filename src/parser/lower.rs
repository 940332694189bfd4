//! Lowering from the tree-sitter concrete syntax tree into [`ast`](super::ast).

use tree_sitter::{Node, Tree};

use super::ast::{
    Annotation, Expr, FunctionDef, Literal, Module, Param, ParamKind, Position, Stmt, Target,
};

/// Lowers a parsed tree into the closed syntax representation.
pub fn lower(tree: &Tree, source: &str) -> Module {
    let lowerer = Lowerer { source: source.as_bytes() };
    Module { body: lowerer.statements(tree.root_node()) }
}

struct Lowerer<'s> {
    source: &'s [u8],
}

impl<'s> Lowerer<'s> {
    fn text(&self, node: Node) -> String {
        node.utf8_text(self.source).unwrap_or_default().to_string()
    }

    fn field_text(&self, node: Node, field: &str) -> String {
        node.child_by_field_name(field).map(|n| self.text(n)).unwrap_or_default()
    }

    /// Named children with comments stripped.
    fn named<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor).filter(|n| n.kind() != "comment").collect()
    }

    fn statements(&self, node: Node) -> Vec<Stmt> {
        self.named(node).into_iter().map(|child| self.stmt(child)).collect()
    }

    fn block(&self, node: Option<Node>) -> Vec<Stmt> {
        node.map(|n| self.statements(n)).unwrap_or_default()
    }

    /// Body of an `else_clause`, `finally_clause` or `except_clause`.
    fn clause_body(&self, clause: Option<Node>) -> Vec<Stmt> {
        let Some(clause) = clause else {
            return Vec::new();
        };
        if let Some(body) = clause.child_by_field_name("body") {
            return self.statements(body);
        }
        self.named(clause)
            .into_iter()
            .find(|n| n.kind() == "block")
            .map(|b| self.statements(b))
            .unwrap_or_default()
    }

    fn stmt(&self, node: Node) -> Stmt {
        match node.kind() {
            "function_definition" => Stmt::FunctionDef(self.function(node)),
            "decorated_definition" => node
                .child_by_field_name("definition")
                .map(|def| self.stmt(def))
                .unwrap_or(Stmt::Other),
            "class_definition" => Stmt::ClassDef {
                name: self.field_text(node, "name"),
                body: self.block(node.child_by_field_name("body")),
            },
            "expression_statement" => self.expression_statement(node),
            "return_statement" => {
                Stmt::Return(self.named(node).first().map(|value| self.expr(*value)))
            },
            "for_statement" => Stmt::For {
                target: node.child_by_field_name("left").map_or(Target::Other, |n| self.target(n)),
                iter: self.opt_expr(node.child_by_field_name("right")),
                body: self.block(node.child_by_field_name("body")),
                orelse: self.clause_body(node.child_by_field_name("alternative")),
            },
            "while_statement" => Stmt::While {
                test: self.opt_expr(node.child_by_field_name("condition")),
                body: self.block(node.child_by_field_name("body")),
                orelse: self.clause_body(node.child_by_field_name("alternative")),
            },
            "if_statement" => self.if_statement(node),
            "with_statement" => {
                let items = self
                    .named(node)
                    .into_iter()
                    .filter(|n| n.kind() == "with_clause")
                    .flat_map(|clause| self.named(clause))
                    .map(|item| self.opt_expr(item.child_by_field_name("value")))
                    .collect();
                Stmt::With { items, body: self.block(node.child_by_field_name("body")) }
            },
            "try_statement" => {
                let mut handlers = Vec::new();
                let mut orelse = Vec::new();
                let mut finalbody = Vec::new();
                for child in self.named(node) {
                    match child.kind() {
                        "except_clause" | "except_group_clause" => {
                            handlers.push(self.clause_body(Some(child)))
                        },
                        "else_clause" => orelse = self.clause_body(Some(child)),
                        "finally_clause" => finalbody = self.clause_body(Some(child)),
                        _ => {},
                    }
                }
                Stmt::Try {
                    body: self.block(node.child_by_field_name("body")),
                    handlers,
                    orelse,
                    finalbody,
                }
            },
            _ => Stmt::Other,
        }
    }

    fn if_statement(&self, node: Node) -> Stmt {
        let alternatives: Vec<Node> = {
            let mut cursor = node.walk();
            node.children_by_field_name("alternative", &mut cursor).collect()
        };
        let mut orelse = Vec::new();
        for alt in alternatives.into_iter().rev() {
            match alt.kind() {
                "elif_clause" => {
                    orelse = vec![Stmt::If {
                        test: self.opt_expr(alt.child_by_field_name("condition")),
                        body: self.block(alt.child_by_field_name("consequence")),
                        orelse,
                    }];
                },
                _ => orelse = self.clause_body(Some(alt)),
            }
        }
        Stmt::If {
            test: self.opt_expr(node.child_by_field_name("condition")),
            body: self.block(node.child_by_field_name("consequence")),
            orelse,
        }
    }

    fn expression_statement(&self, node: Node) -> Stmt {
        let Some(inner) = self.named(node).into_iter().next() else {
            return Stmt::Other;
        };
        match inner.kind() {
            "assignment" => self.assignment(inner),
            "augmented_assignment" => Stmt::AugAssign {
                target: inner.child_by_field_name("left").map_or(Target::Other, |n| self.target(n)),
                value: self.opt_expr(inner.child_by_field_name("right")),
            },
            _ => Stmt::Expr(self.expr(inner)),
        }
    }

    /// `a = b = value` arrives as right-nested assignment nodes.
    fn assignment(&self, node: Node) -> Stmt {
        let mut targets = Vec::new();
        let mut current = node;
        loop {
            let target =
                current.child_by_field_name("left").map_or(Target::Other, |n| self.target(n));
            if let Some(annotation) = current.child_by_field_name("type") {
                return Stmt::AnnAssign {
                    target,
                    annotation: self.annotation(annotation),
                    value: current.child_by_field_name("right").map(|n| self.expr(n)),
                };
            }
            targets.push(target);
            match current.child_by_field_name("right") {
                Some(right) if right.kind() == "assignment" => current = right,
                Some(right) => return Stmt::Assign { targets, value: self.expr(right) },
                None => return Stmt::Other,
            }
        }
    }

    fn target(&self, node: Node) -> Target {
        match node.kind() {
            "identifier" => Target::Name(self.text(node)),
            "pattern_list" | "tuple_pattern" | "list_pattern" | "tuple" | "list"
            | "expression_list" => {
                Target::Tuple(self.named(node).into_iter().map(|n| self.target(n)).collect())
            },
            "list_splat_pattern" | "list_splat" => self
                .named(node)
                .first()
                .map_or(Target::Other, |inner| Target::Starred(Box::new(self.target(*inner)))),
            "parenthesized_expression" => {
                self.named(node).first().map_or(Target::Other, |inner| self.target(*inner))
            },
            _ => Target::Other,
        }
    }

    fn annotation(&self, node: Node) -> Annotation {
        Annotation { expr: self.expr(node), text: self.text(node) }
    }

    fn position(node: Node) -> Position {
        let point = node.start_position();
        Position { line: point.row, column: point.column }
    }

    fn function(&self, node: Node) -> FunctionDef {
        let params_node = node.child_by_field_name("parameters");
        FunctionDef {
            name: self.field_text(node, "name"),
            params: params_node.map(|n| self.parameters(n)).unwrap_or_default(),
            returns: node.child_by_field_name("return_type").map(|n| self.annotation(n)),
            body: self.block(node.child_by_field_name("body")),
            params_text: params_node.map(|n| self.text(n)).unwrap_or_else(|| "()".to_string()),
            position: Self::position(node),
        }
    }

    fn parameters(&self, node: Node) -> Vec<Param> {
        let mut params = Vec::new();
        let mut keyword_only = false;
        for child in self.named(node) {
            let positional = if keyword_only { ParamKind::KeywordOnly } else { ParamKind::Positional };
            let defaulted = if keyword_only { ParamKind::KeywordOnly } else { ParamKind::Defaulted };
            let (name_node, kind, annotation) = match child.kind() {
                "identifier" => (Some(child), positional, None),
                "default_parameter" => (child.child_by_field_name("name"), defaulted, None),
                "typed_default_parameter" => (
                    child.child_by_field_name("name"),
                    defaulted,
                    child.child_by_field_name("type"),
                ),
                "typed_parameter" => {
                    let inner = self.named(child).into_iter().next();
                    let kind = match inner.map(|n| n.kind()) {
                        Some("list_splat_pattern") => ParamKind::VarArgs,
                        Some("dictionary_splat_pattern") => ParamKind::VarKeywords,
                        _ => positional,
                    };
                    (inner, kind, child.child_by_field_name("type"))
                },
                "list_splat_pattern" => (Some(child), ParamKind::VarArgs, None),
                "dictionary_splat_pattern" => (Some(child), ParamKind::VarKeywords, None),
                "keyword_separator" => {
                    keyword_only = true;
                    continue;
                },
                _ => continue,
            };
            if kind == ParamKind::VarArgs {
                keyword_only = true;
            }
            let Some(name_node) = name_node else {
                continue;
            };
            params.push(Param {
                name: self.text(name_node).trim_start_matches('*').to_string(),
                kind,
                annotation: annotation.map(|n| self.annotation(n)),
                text: self.text(child),
                position: Self::position(child),
            });
        }
        params
    }

    fn opt_expr(&self, node: Option<Node>) -> Expr {
        node.map_or(Expr::Other, |n| self.expr(n))
    }

    fn exprs(&self, node: Node) -> Vec<Expr> {
        self.named(node).into_iter().map(|n| self.expr(n)).collect()
    }

    fn number(&self, node: Node, plain: Literal) -> Expr {
        let text = self.text(node);
        if text.ends_with('j') || text.ends_with('J') {
            Expr::Literal(Literal::Complex)
        } else {
            Expr::Literal(plain)
        }
    }

    fn string(&self, node: Node) -> Expr {
        let text = self.text(node);
        let is_bytes = text
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .any(|c| c == 'b' || c == 'B');
        Expr::Literal(if is_bytes { Literal::Bytes } else { Literal::Str })
    }

    fn expr(&self, node: Node) -> Expr {
        match node.kind() {
            "identifier" => Expr::Name(self.text(node)),
            "integer" => self.number(node, Literal::Int),
            "float" => self.number(node, Literal::Float),
            "string" | "concatenated_string" => self.string(node),
            "true" | "false" => Expr::Literal(Literal::Bool),
            "none" => Expr::Literal(Literal::None),
            "list" => Expr::List(self.exprs(node)),
            "set" => Expr::Set(self.exprs(node)),
            "tuple" | "expression_list" => Expr::Tuple(self.exprs(node)),
            "dictionary" => Expr::Dict(
                self.named(node)
                    .into_iter()
                    .filter(|n| n.kind() == "pair")
                    .map(|pair| {
                        (
                            self.opt_expr(pair.child_by_field_name("key")),
                            self.opt_expr(pair.child_by_field_name("value")),
                        )
                    })
                    .collect(),
            ),
            "list_comprehension" => Expr::ListComp,
            "set_comprehension" => Expr::SetComp,
            "dictionary_comprehension" => Expr::DictComp,
            "generator_expression" => Expr::Generator,
            "parenthesized_expression" | "type" => {
                self.named(node).first().map_or(Expr::Other, |inner| self.expr(*inner))
            },
            "call" => self.call(node),
            "attribute" => Expr::Attribute {
                value: Box::new(self.opt_expr(node.child_by_field_name("object"))),
                attr: self.field_text(node, "attribute"),
            },
            "subscript" => {
                let index = {
                    let mut cursor = node.walk();
                    node.children_by_field_name("subscript", &mut cursor)
                        .map(|n| self.expr(n))
                        .collect()
                };
                Expr::Subscript {
                    value: Box::new(self.opt_expr(node.child_by_field_name("value"))),
                    index,
                }
            },
            // Annotation grammar: `list[int]`, `A | B`, `typing.Any`.
            "generic_type" => {
                let children = self.named(node);
                let value = children
                    .iter()
                    .find(|n| n.kind() == "identifier")
                    .map_or(Expr::Other, |n| self.expr(*n));
                let index = children
                    .iter()
                    .find(|n| n.kind() == "type_parameter")
                    .map(|params| self.exprs(*params))
                    .unwrap_or_default();
                Expr::Subscript { value: Box::new(value), index }
            },
            "union_type" => {
                let mut parts = self.named(node).into_iter().map(|n| self.expr(n));
                Expr::BinOp {
                    left: Box::new(parts.next().unwrap_or(Expr::Other)),
                    op: "|".to_string(),
                    right: Box::new(parts.next().unwrap_or(Expr::Other)),
                }
            },
            "member_type" => {
                let children = self.named(node);
                Expr::Attribute {
                    value: Box::new(children.first().map_or(Expr::Other, |n| self.expr(*n))),
                    attr: children.last().map(|n| self.text(*n)).unwrap_or_default(),
                }
            },
            "binary_operator" => Expr::BinOp {
                left: Box::new(self.opt_expr(node.child_by_field_name("left"))),
                op: self.field_text(node, "operator"),
                right: Box::new(self.opt_expr(node.child_by_field_name("right"))),
            },
            "unary_operator" => {
                Expr::UnaryOp(Box::new(self.opt_expr(node.child_by_field_name("argument"))))
            },
            "comparison_operator" | "not_operator" => Expr::Test,
            "lambda" => Expr::Lambda {
                arity: node
                    .child_by_field_name("parameters")
                    .map(|params| self.parameters(params).len())
                    .unwrap_or(0),
                body: Box::new(self.opt_expr(node.child_by_field_name("body"))),
            },
            "list_splat" => {
                Expr::Starred(Box::new(self.named(node).first().map_or(Expr::Other, |n| self.expr(*n))))
            },
            _ => Expr::Other,
        }
    }

    fn call(&self, node: Node) -> Expr {
        let func = Box::new(self.opt_expr(node.child_by_field_name("function")));
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        if let Some(arguments) = node.child_by_field_name("arguments") {
            if arguments.kind() == "generator_expression" {
                args.push(Expr::Generator);
            } else {
                for arg in self.named(arguments) {
                    match arg.kind() {
                        "keyword_argument" => keywords.push((
                            self.field_text(arg, "name"),
                            self.opt_expr(arg.child_by_field_name("value")),
                        )),
                        "dictionary_splat" => {},
                        _ => args.push(self.expr(arg)),
                    }
                }
            }
        }
        Expr::Call { func, args, keywords }
    }
}
