//! Signature reconstruction from observation sets.

use crate::parser::ast::{FunctionDef, ParamKind};
use crate::report::{AnalyzerKind, Row};
use crate::types::{RuntimeValue, Type};

use super::session::ObservationSet;

/// Return text used when no return value was observed.
pub const NO_RETURN_OBSERVED: &str = "Any";

/// One parameter of a reconstructed signature.
#[derive(Debug, Clone, PartialEq)]
pub enum SignatureParam {
    /// A plain positional parameter with its merged observed type.
    Inferred {
        /// Parameter name.
        name: String,
        /// Merge of every observed argument at this position.
        ty: Type,
    },
    /// A parameter reproduced exactly as declared.
    Verbatim(String),
}

/// Declared signature paired with the one inferred from observations.
#[derive(Debug, Clone, PartialEq)]
pub struct InferredSignature {
    /// Function name.
    pub function: String,
    /// Declared signature text, e.g. `f(a, b=2) -> int`.
    pub declared: String,
    /// Parameters in declared order.
    pub params: Vec<SignatureParam>,
    /// Merge of every observed return value.
    pub returns: Option<Type>,
}

impl InferredSignature {
    /// Merges the observations of `def` into a signature.
    ///
    /// Only plain positional parameters are inferred; positions beyond the
    /// shortest captured call are kept as declared.
    pub fn reconstruct(def: &FunctionDef, observations: &ObservationSet) -> Self {
        let observed = observations.arguments.iter().map(Vec::len).min().unwrap_or(0);

        let params = def
            .params
            .iter()
            .enumerate()
            .map(|(position, param)| {
                let merged = (param.kind == ParamKind::Positional && position < observed)
                    .then(|| merge_values(observations.arguments.iter().map(|args| &args[position])))
                    .flatten();
                match merged {
                    Some(ty) => SignatureParam::Inferred { name: param.name.clone(), ty },
                    None => SignatureParam::Verbatim(param.text.clone()),
                }
            })
            .collect();

        Self {
            function: def.name.clone(),
            declared: def.declared_signature(),
            params,
            returns: merge_values(observations.returns.iter()),
        }
    }

    /// Inferred return text.
    pub fn return_text(&self) -> String {
        self.returns.as_ref().map_or_else(|| NO_RETURN_OBSERVED.to_string(), Type::to_string)
    }

    /// The declared line prefixed with `- ` and the inferred line prefixed
    /// with `+ `.
    pub fn paired_text(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|param| match param {
                SignatureParam::Inferred { name, ty } => format!("{}: {}", name, ty),
                SignatureParam::Verbatim(text) => text.clone(),
            })
            .collect();
        format!(
            "- def {}:\n+ def {}({}) -> {}:",
            self.declared,
            self.function,
            params.join(", "),
            self.return_text()
        )
    }

    /// `RightTyper` rows: one per inferred parameter, then the return.
    pub fn rows(&self, module: &str) -> Vec<Row> {
        let kind = AnalyzerKind::RightTyper;
        let mut rows: Vec<Row> = self
            .params
            .iter()
            .filter_map(|param| match param {
                SignatureParam::Inferred { name, ty } => {
                    Some(Row::argument(module, kind, &self.function, name, ty))
                },
                SignatureParam::Verbatim(_) => None,
            })
            .collect();
        rows.push(Row::function_return(module, kind, &self.function, self.return_text()));
        rows
    }
}

fn merge_values<'a>(values: impl Iterator<Item = &'a RuntimeValue>) -> Option<Type> {
    Type::merge(values.map(Type::from_value))
}
