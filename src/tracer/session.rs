//! Per-invocation observation context and event replay.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::RuntimeValue;

/// One line of the harness event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TraceEvent {
    /// A function was entered with these positional parameter values.
    Call {
        /// Source file of the callee.
        file: PathBuf,
        /// Callee name.
        function: String,
        /// Bound positional parameter values in declared order.
        args: Vec<RuntimeValue>,
    },
    /// A function returned (`None` when it returned nothing).
    Return {
        /// Source file of the callee.
        file: PathBuf,
        /// Callee name.
        function: String,
        /// Returned value.
        value: RuntimeValue,
    },
    /// The target ran to completion; its module globals at exit.
    Finished {
        /// `(name, value)` pairs of the target's module namespace.
        #[serde(default)]
        globals: Vec<(String, RuntimeValue)>,
    },
    /// The target raised; the trace is incomplete.
    Raised {
        /// Exception type and message.
        error: String,
    },
}

/// Receiver of function-entered and function-returned events.
pub trait ExecutionHook {
    /// Called when `function` in `file` is entered.
    fn on_enter(&mut self, file: &Path, function: &str, args: Vec<RuntimeValue>);

    /// Called when `function` in `file` returns.
    fn on_return(&mut self, file: &Path, function: &str, value: RuntimeValue);
}

/// Feeds a harness event stream into `hook`.
///
/// Returns the module globals reported on completion. A `raised` event or a
/// stream that ends without a completion event is an incomplete trace.
pub fn replay<R, H>(reader: R, hook: &mut H) -> Result<Vec<(String, RuntimeValue)>>
where
    R: BufRead,
    H: ExecutionHook + ?Sized,
{
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TraceEvent>(&line)? {
            TraceEvent::Call { file, function, args } => hook.on_enter(&file, &function, args),
            TraceEvent::Return { file, function, value } => hook.on_return(&file, &function, value),
            TraceEvent::Finished { globals } => return Ok(globals),
            TraceEvent::Raised { error } => return Err(Error::trace_error(error)),
        }
    }
    Err(Error::trace_error("target exited without reporting completion"))
}

/// Admits only source files under one directory tree.
#[derive(Debug)]
pub struct SourceFilter {
    root: PathBuf,
    cache: HashMap<PathBuf, bool>,
}

impl SourceFilter {
    /// Filter for files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Self { root, cache: HashMap::new() }
    }

    /// Whether events from `file` should be recorded.
    pub fn admits(&mut self, file: &Path) -> bool {
        if let Some(&admitted) = self.cache.get(file) {
            return admitted;
        }
        let resolved = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
        let admitted = resolved.starts_with(&self.root);
        if !admitted {
            debug!("ignoring events from {}", file.display());
        }
        self.cache.insert(file.to_path_buf(), admitted);
        admitted
    }
}

/// Observations for one `(file, function)` key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationSet {
    /// One positional argument tuple per observed call.
    pub arguments: Vec<Vec<RuntimeValue>>,
    /// One value per observed return.
    pub returns: Vec<RuntimeValue>,
}

/// Identity of an observed function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObservationKey {
    /// Canonical source file.
    pub file: PathBuf,
    /// Function name.
    pub function: String,
}

/// Context of one traced invocation: every observation it accepted, in
/// first-observation order.
#[derive(Debug)]
pub struct TraceSession {
    filter: SourceFilter,
    order: Vec<ObservationKey>,
    observations: HashMap<ObservationKey, ObservationSet>,
}

impl TraceSession {
    /// Creates an empty session recording only what `filter` admits.
    pub fn new(filter: SourceFilter) -> Self {
        Self { filter, order: Vec::new(), observations: HashMap::new() }
    }

    fn entry(&mut self, file: &Path, function: &str) -> Option<&mut ObservationSet> {
        if function.starts_with('<') || !self.filter.admits(file) {
            return None;
        }
        let file = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
        let key = ObservationKey { file, function: function.to_string() };
        if !self.observations.contains_key(&key) {
            self.order.push(key.clone());
        }
        Some(self.observations.entry(key).or_default())
    }

    /// Observation sets in first-observation order.
    pub fn observations(&self) -> impl Iterator<Item = (&ObservationKey, &ObservationSet)> {
        self.order.iter().filter_map(|key| self.observations.get(key).map(|set| (key, set)))
    }

    /// Number of observed functions.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing was observed.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl ExecutionHook for TraceSession {
    fn on_enter(&mut self, file: &Path, function: &str, args: Vec<RuntimeValue>) {
        match self.entry(file, function) {
            Some(set) => set.arguments.push(args),
            None => debug!("dropping call of {} outside the traced tree", function),
        }
    }

    fn on_return(&mut self, file: &Path, function: &str, value: RuntimeValue) {
        match self.entry(file, function) {
            Some(set) => set.returns.push(value),
            None => debug!("dropping return of {} outside the traced tree", function),
        }
    }
}
