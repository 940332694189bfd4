//! retrotype: hybrid static and runtime type inference for Python.
//!
//! The static inferencer walks a parsed unit and records a type for every
//! bound name; the runtime tracer executes the unit in an isolated
//! interpreter and reconstructs function signatures from observed values.
//! Both emit rows in one shared report schema.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod analyzer;
pub mod config;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod tracer;
pub mod types;
pub mod utils;

/// Re-exports commonly used types and traits.
pub mod prelude {
    pub use crate::analyzer::{StaticInferencer, StaticReport};
    pub use crate::config::TracerConfig;
    pub use crate::error::{Error, Result};
    pub use crate::pipeline::{Analyses, BatchResult, Pipeline};
    pub use crate::report::{AnalyzerKind, Report, Row};
    pub use crate::tracer::RuntimeTracer;
    pub use crate::types::Type;
}
