//! Type descriptors shared by the static and dynamic inferencers.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parser::ast::{Annotation, Expr, Literal};

mod value;

pub use value::RuntimeValue;

/// An inferred or declared type.
///
/// The derived ordering is the deterministic key used to order union members.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Type {
    /// Expression too complex to classify.
    Unknown,

    /// Parameter whose body gives no usage signal; needs a human decision.
    NoUsageSignal,

    /// Result of calling something the inferencer cannot resolve.
    CallResult,

    /// A runtime value that is invocable.
    Callable,

    /// Scalar or nominal type identified by name (`int`, `str`, `None`, `Foo`).
    Primitive(String),

    /// Homogeneous list.
    List(Box<Type>),

    /// Unordered collection of unique elements.
    Set(Box<Type>),

    /// Fixed-size heterogeneous sequence.
    Tuple(Vec<Type>),

    /// Dictionary with key and value types.
    Dict(Box<Type>, Box<Type>),

    /// Function type with parameter and return types.
    Function {
        /// Parameter types.
        params: Vec<Type>,
        /// Return type.
        returns: Box<Type>,
    },

    /// One of several observed types; always two or more distinct,
    /// non-union members in key order.
    Union(Vec<Type>),
}

impl Type {
    /// Shorthand for [`Type::Primitive`].
    pub fn primitive(name: impl Into<String>) -> Self {
        Type::Primitive(name.into())
    }

    /// `list[element]`.
    pub fn list(element: Type) -> Self {
        Type::List(Box::new(element))
    }

    /// `set[element]`.
    pub fn set(element: Type) -> Self {
        Type::Set(Box::new(element))
    }

    /// `dict[key, value]`.
    pub fn dict(key: Type, value: Type) -> Self {
        Type::Dict(Box::new(key), Box::new(value))
    }

    /// Whether this is a container descriptor.
    pub fn is_container(&self) -> bool {
        matches!(self, Type::List(_) | Type::Set(_) | Type::Tuple(_) | Type::Dict(_, _))
    }

    /// Whether this is a function signature descriptor.
    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function { .. })
    }

    /// The type produced by iterating over a value of this container type.
    /// Dictionaries iterate over their keys.
    pub fn element(&self) -> Option<Type> {
        match self {
            Type::List(inner) | Type::Set(inner) => Some((**inner).clone()),
            Type::Dict(key, _) => Some((**key).clone()),
            Type::Tuple(items) => Some(Type::merge(items.iter().cloned()).unwrap_or(Type::Unknown)),
            _ => None,
        }
    }

    /// Merges descriptors into one.
    ///
    /// Structurally equal inputs collapse, nested unions flatten, and two or
    /// more distinct results form a [`Type::Union`] in key order. Returns
    /// `None` only when given no descriptors.
    pub fn merge<I>(types: I) -> Option<Type>
    where
        I: IntoIterator<Item = Type>,
    {
        let mut unique = BTreeSet::new();
        for ty in types {
            match ty {
                Type::Union(members) => unique.extend(members),
                other => {
                    unique.insert(other);
                },
            }
        }

        match unique.len() {
            0 => None,
            1 => unique.into_iter().next(),
            _ => Some(Type::Union(unique.into_iter().collect())),
        }
    }

    /// Maps a literal expression to its descriptor.
    ///
    /// Scalars map to their primitive name and displays recurse into their
    /// elements. Shapes with no literal meaning yield [`Type::Unknown`].
    pub fn from_literal(expr: &Expr) -> Type {
        match expr {
            Expr::Literal(lit) => Type::primitive(literal_name(*lit)),
            Expr::List(items) => Type::list(Self::merge_literals(items)),
            Expr::Set(items) => Type::set(Self::merge_literals(items)),
            Expr::Tuple(items) => Type::Tuple(items.iter().map(Type::from_literal).collect()),
            Expr::Dict(entries) => Type::dict(
                Self::merge_literals(entries.iter().map(|(k, _)| k)),
                Self::merge_literals(entries.iter().map(|(_, v)| v)),
            ),
            _ => Type::Unknown,
        }
    }

    fn merge_literals<'a, I>(items: I) -> Type
    where
        I: IntoIterator<Item = &'a Expr>,
    {
        Type::merge(items.into_iter().map(Type::from_literal)).unwrap_or(Type::Unknown)
    }

    /// Maps a concrete runtime value to its exact descriptor.
    pub fn from_value(value: &RuntimeValue) -> Type {
        value.to_type()
    }

    /// Parses an annotation on a best-effort basis.
    ///
    /// Shapes that are not recognised are kept verbatim as a primitive named
    /// by the annotation text.
    pub fn from_annotation(annotation: &Annotation) -> Type {
        annotation_type(&annotation.expr).unwrap_or_else(|| Type::primitive(annotation.text.trim()))
    }
}

fn literal_name(lit: Literal) -> &'static str {
    match lit {
        Literal::Int => "int",
        Literal::Float => "float",
        Literal::Complex => "complex",
        Literal::Str => "str",
        Literal::Bytes => "bytes",
        Literal::Bool => "bool",
        Literal::None => "None",
    }
}

fn annotation_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Name(name) => Some(name),
        Expr::Attribute { attr, .. } => Some(attr),
        _ => None,
    }
}

fn annotation_type(expr: &Expr) -> Option<Type> {
    match expr {
        Expr::Literal(Literal::None) => Some(Type::primitive("None")),
        Expr::Name(_) | Expr::Attribute { .. } => {
            let name = annotation_name(expr)?;
            Some(match name {
                "list" | "List" => Type::list(Type::Unknown),
                "set" | "Set" => Type::set(Type::Unknown),
                "dict" | "Dict" => Type::dict(Type::Unknown, Type::Unknown),
                "tuple" | "Tuple" => Type::Tuple(Vec::new()),
                "Callable" => Type::Callable,
                other => Type::primitive(other),
            })
        },
        Expr::BinOp { left, op, right } if op == "|" => {
            Type::merge([annotation_type(left)?, annotation_type(right)?])
        },
        Expr::Subscript { value, index } => {
            let args: Vec<Type> =
                index.iter().map(|e| annotation_type(e)).collect::<Option<_>>()?;
            let first = || args.first().cloned().unwrap_or(Type::Unknown);
            match annotation_name(value)? {
                "list" | "List" | "Sequence" => Some(Type::list(first())),
                "set" | "Set" | "frozenset" | "FrozenSet" => Some(Type::set(first())),
                "dict" | "Dict" | "Mapping" => Some(Type::dict(
                    first(),
                    args.get(1).cloned().unwrap_or(Type::Unknown),
                )),
                "tuple" | "Tuple" => Some(Type::Tuple(args.clone())),
                "Optional" => Type::merge([first(), Type::primitive("None")]),
                "Union" => Type::merge(args.clone()),
                _ => None,
            }
        },
        _ => None,
    }
}

fn join(types: &[Type]) -> String {
    types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Unknown => write!(f, "Unknown"),
            Type::NoUsageSignal => write!(f, "function_param"),
            Type::CallResult => write!(f, "function_call"),
            Type::Callable => write!(f, "callable"),
            Type::Primitive(name) => write!(f, "{}", name),
            Type::List(inner) => write!(f, "list[{}]", inner),
            Type::Set(inner) => write!(f, "set[{}]", inner),
            Type::Tuple(items) if items.is_empty() => write!(f, "tuple[()]"),
            Type::Tuple(items) => write!(f, "tuple[{}]", join(items)),
            Type::Dict(k, v) => write!(f, "dict[{}, {}]", k, v),
            Type::Function { params, returns } => {
                write!(f, "Callable[[{}], {}]", join(params), returns)
            },
            Type::Union(types) => write!(f, "Union[{}]", join(types)),
        }
    }
}

impl Default for Type {
    fn default() -> Self {
        Self::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn int() -> Type {
        Type::primitive("int")
    }

    fn str_() -> Type {
        Type::primitive("str")
    }

    fn rhs(source: &str) -> Expr {
        let module = Parser::new().unwrap().parse_module(source).unwrap();
        match module.body.into_iter().next() {
            Some(crate::parser::ast::Stmt::Assign { value, .. }) => value,
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    fn samples() -> Vec<Type> {
        vec![
            Type::Unknown,
            int(),
            str_(),
            Type::list(int()),
            Type::dict(str_(), Type::list(Type::Unknown)),
            Type::merge([int(), str_()]).unwrap(),
            Type::Function { params: vec![int()], returns: Box::new(str_()) },
        ]
    }

    #[test]
    fn test_type_display() {
        assert_eq!(int().to_string(), "int");
        assert_eq!(Type::list(int()).to_string(), "list[int]");
        assert_eq!(Type::dict(str_(), int()).to_string(), "dict[str, int]");
        assert_eq!(
            Type::Function { params: vec![int(), str_()], returns: Box::new(Type::primitive("bool")) }
                .to_string(),
            "Callable[[int, str], bool]"
        );
        assert_eq!(Type::merge([str_(), int()]).unwrap().to_string(), "Union[int, str]");
    }

    #[test]
    fn test_merge_idempotent() {
        for ty in samples() {
            assert_eq!(Type::merge([ty.clone(), ty.clone()]), Some(ty));
        }
    }

    #[test]
    fn test_merge_commutative_and_associative() {
        let all = samples();
        for a in &all {
            for b in &all {
                assert_eq!(
                    Type::merge([a.clone(), b.clone()]),
                    Type::merge([b.clone(), a.clone()])
                );
                for c in &all {
                    let left = Type::merge([Type::merge([a.clone(), b.clone()]).unwrap(), c.clone()]);
                    let right = Type::merge([a.clone(), Type::merge([b.clone(), c.clone()]).unwrap()]);
                    assert_eq!(left, right);
                }
            }
        }
    }

    #[test]
    fn test_merge_flattens_unions() {
        let nested = Type::merge([
            Type::merge([int(), str_()]).unwrap(),
            Type::merge([Type::primitive("float"), int()]).unwrap(),
        ])
        .unwrap();
        match nested {
            Type::Union(members) => {
                assert_eq!(members.len(), 3);
                assert!(members.iter().all(|m| !matches!(m, Type::Union(_))));
            },
            other => panic!("expected union, got {}", other),
        }
    }

    #[test]
    fn test_merge_empty_is_none() {
        assert_eq!(Type::merge(Vec::new()), None);
    }

    #[rstest]
    #[case("x = [1, 2, 3]", "list[int]")]
    #[case("x = []", "list[Unknown]")]
    #[case("x = [1, 'a']", "list[Union[int, str]]")]
    #[case("x = {'a': 1, 'b': 2.0}", "dict[str, Union[float, int]]")]
    #[case("x = {}", "dict[Unknown, Unknown]")]
    #[case("x = (1, 'a')", "tuple[int, str]")]
    #[case("x = {1, 2}", "set[int]")]
    #[case("x = None", "None")]
    #[case("x = foo.bar", "Unknown")]
    fn test_from_literal(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(Type::from_literal(&rhs(source)).to_string(), expected);
    }

    #[test]
    fn test_empty_list_distinct_from_concrete() {
        let empty = Type::from_literal(&rhs("x = []"));
        assert_eq!(empty, Type::list(Type::Unknown));
        assert_ne!(empty, Type::list(int()));
    }

    #[rstest]
    #[case("x: int = 1", "int")]
    #[case("x: List[int] = []", "list[int]")]
    #[case("x: dict[str, list[int]] = {}", "dict[str, list[int]]")]
    #[case("x: Optional[str] = None", "Union[None, str]")]
    #[case("x: Dict[str, int] = {}", "dict[str, int]")]
    #[case("x: tuple[int, str] = (1, 'a')", "tuple[int, str]")]
    #[case("x: int | None = None", "Union[None, int]")]
    #[case("x: typing.Any = 1", "Any")]
    #[case("x: 'Forward' = 1", "'Forward'")]
    fn test_from_annotation(#[case] source: &str, #[case] expected: &str) {
        let module = Parser::new().unwrap().parse_module(source).unwrap();
        let annotation = match &module.body[0] {
            crate::parser::ast::Stmt::AnnAssign { annotation, .. } => annotation,
            other => panic!("expected annotated assignment, got {:?}", other),
        };
        assert_eq!(Type::from_annotation(annotation).to_string(), expected);
    }
}
