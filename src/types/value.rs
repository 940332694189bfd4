//! Runtime values as captured by the tracing harness.

use serde::{Deserialize, Serialize};

use super::Type;

/// Structural description of one captured runtime value.
///
/// The harness serializes every captured argument, return value and module
/// global into this shape; containers carry their (possibly truncated)
/// elements so element types can be recovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RuntimeValue {
    /// `None`.
    None,
    /// `bool`.
    Bool,
    /// `int`.
    Int,
    /// `float`.
    Float,
    /// `complex`.
    Complex,
    /// `str`.
    Str,
    /// `bytes` or `bytearray`.
    Bytes,
    /// `list`.
    List {
        /// Captured elements.
        items: Vec<RuntimeValue>,
    },
    /// `tuple`.
    Tuple {
        /// Captured elements.
        items: Vec<RuntimeValue>,
    },
    /// `set` or `frozenset`.
    Set {
        /// Captured elements.
        items: Vec<RuntimeValue>,
    },
    /// `dict`.
    Dict {
        /// Captured key/value pairs.
        entries: Vec<(RuntimeValue, RuntimeValue)>,
    },
    /// Functions, classes and other invocable objects.
    Callable,
    /// Element of a container cut off by the depth cap.
    Unknown,
    /// Any other object, identified by its class name.
    Object {
        /// `type(value).__name__`.
        #[serde(rename = "type")]
        type_name: String,
    },
}

impl RuntimeValue {
    /// Exact descriptor for this value. Empty containers get an
    /// [`Type::Unknown`] element placeholder.
    pub fn to_type(&self) -> Type {
        match self {
            RuntimeValue::None => Type::primitive("None"),
            RuntimeValue::Bool => Type::primitive("bool"),
            RuntimeValue::Int => Type::primitive("int"),
            RuntimeValue::Float => Type::primitive("float"),
            RuntimeValue::Complex => Type::primitive("complex"),
            RuntimeValue::Str => Type::primitive("str"),
            RuntimeValue::Bytes => Type::primitive("bytes"),
            RuntimeValue::List { items } => Type::list(merge_values(items)),
            RuntimeValue::Set { items } => Type::set(merge_values(items)),
            RuntimeValue::Tuple { items } => Type::Tuple(items.iter().map(Self::to_type).collect()),
            RuntimeValue::Dict { entries } => Type::dict(
                merge_values(entries.iter().map(|(k, _)| k)),
                merge_values(entries.iter().map(|(_, v)| v)),
            ),
            RuntimeValue::Callable => Type::Callable,
            RuntimeValue::Unknown => Type::Unknown,
            RuntimeValue::Object { type_name } => Type::primitive(type_name.as_str()),
        }
    }
}

fn merge_values<'a, I>(values: I) -> Type
where
    I: IntoIterator<Item = &'a RuntimeValue>,
{
    Type::merge(values.into_iter().map(RuntimeValue::to_type)).unwrap_or(Type::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_harness_values() {
        let json = r#"{"kind": "dict", "entries": [[{"kind": "str"}, {"kind": "list", "items": [{"kind": "int"}, {"kind": "float"}]}]]}"#;
        let value: RuntimeValue = serde_json::from_str(json).unwrap();
        assert_eq!(value.to_type().to_string(), "dict[str, list[Union[float, int]]]");
    }

    #[test]
    fn test_empty_containers_have_unknown_elements() {
        assert_eq!(RuntimeValue::List { items: vec![] }.to_type(), Type::list(Type::Unknown));
        assert_eq!(
            RuntimeValue::Dict { entries: vec![] }.to_type(),
            Type::dict(Type::Unknown, Type::Unknown)
        );
    }

    #[test]
    fn test_truncated_container_keeps_its_kind() {
        let json = r#"{"kind": "list", "items": [{"kind": "list", "items": [{"kind": "unknown"}]}]}"#;
        let value: RuntimeValue = serde_json::from_str(json).unwrap();
        assert_eq!(value.to_type(), Type::list(Type::list(Type::Unknown)));

        let json = r#"{"kind": "dict", "entries": [[{"kind": "unknown"}, {"kind": "unknown"}]]}"#;
        let dict: RuntimeValue = serde_json::from_str(json).unwrap();
        assert_eq!(dict.to_type().to_string(), "dict[Unknown, Unknown]");
    }

    #[test]
    fn test_callable_and_objects() {
        assert_eq!(Type::from_value(&RuntimeValue::Callable), Type::Callable);
        let obj: RuntimeValue = serde_json::from_str(r#"{"kind": "object", "type": "Path"}"#).unwrap();
        assert_eq!(obj.to_type(), Type::primitive("Path"));
    }
}
