//! Runtime type tracing for dynamic type information collection.
//!
//! The target runs in a child interpreter under an embedded profiling
//! harness. The harness streams call, return and completion events into a
//! temporary file, which is replayed into a [`TraceSession`] once the child
//! exits. Nothing the target does runs in this process.

mod session;
mod signature;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, info, warn};
use tempfile::NamedTempFile;
use wait_timeout::ChildExt;

use crate::config::TracerConfig;
use crate::error::{Error, Result};
use crate::parser::ast::{FunctionDef, Module};
use crate::parser::Parser;
use crate::report::{AnalyzerKind, Row};
use crate::types::Type;
use crate::utils::module_name;

pub use session::{
    replay, ExecutionHook, ObservationKey, ObservationSet, SourceFilter, TraceEvent, TraceSession,
};
pub use signature::{InferredSignature, SignatureParam, NO_RETURN_OBSERVED};

const HARNESS: &str = include_str!("harness.py");

/// Scope label used for rows describing module globals.
const GLOBALS_SCOPE: &str = crate::analyzer::scope::GLOBAL_SCOPE;

/// Inferred signature of one observed function, with the file it lives in.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedSignature {
    /// Report label of the defining file.
    pub module: String,
    /// Reconstructed signature.
    pub signature: InferredSignature,
}

/// Everything one completed trace produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceOutcome {
    /// Report label of the traced file.
    pub module: String,
    /// Signatures in first-observation order.
    pub signatures: Vec<ObservedSignature>,
    /// Module globals of the target at exit.
    pub globals: Vec<(String, Type)>,
}

impl TraceOutcome {
    /// `RightTyper` rows for every signature followed by `Conditional` rows
    /// for every global.
    pub fn rows(&self) -> Vec<Row> {
        let signatures = self.signatures.iter().flat_map(|s| s.signature.rows(&s.module));
        let globals = self.globals.iter().map(|(name, ty)| {
            Row::variable(&self.module, AnalyzerKind::Conditional, GLOBALS_SCOPE, name, ty)
        });
        signatures.chain(globals).collect()
    }

    /// Paired declared/inferred text per signature.
    pub fn paired_text(&self) -> Vec<String> {
        self.signatures.iter().map(|s| s.signature.paired_text()).collect()
    }
}

/// Runs targets in an isolated interpreter and reconstructs signatures.
pub struct RuntimeTracer {
    config: TracerConfig,
}

impl RuntimeTracer {
    /// Creates a tracer with the given settings.
    pub fn new(config: TracerConfig) -> Self {
        Self { config }
    }

    /// Traces one Python file.
    ///
    /// A target that raises, exits non-zero or times out yields
    /// [`Error::Trace`]; its observations are discarded.
    pub fn run<P: AsRef<Path>>(&self, path: P) -> Result<TraceOutcome> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {:?}", path),
            )));
        }
        if path.extension().and_then(|e| e.to_str()) != Some("py") {
            return Err(Error::argument_error(format!("not a Python file: {:?}", path)));
        }

        let target = path.canonicalize()?;
        let root = target.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
        info!("tracing {}", target.display());

        let events = self.execute(&target)?;
        let mut session = TraceSession::new(SourceFilter::new(root));
        let globals = replay(BufReader::new(File::open(events.path())?), &mut session)?;
        debug!("{} function(s) observed in {}", session.len(), target.display());

        Ok(TraceOutcome {
            module: module_name(&target),
            signatures: reconstruct_all(&session),
            globals: globals.iter().map(|(name, value)| (name.clone(), value.to_type())).collect(),
        })
    }

    /// Runs the harness on `target`; returns the event file.
    fn execute(&self, target: &Path) -> Result<NamedTempFile> {
        let mut harness =
            tempfile::Builder::new().prefix("retrotype_harness").suffix(".py").tempfile()?;
        harness.write_all(HARNESS.as_bytes())?;
        let events =
            tempfile::Builder::new().prefix("retrotype_events").suffix(".jsonl").tempfile()?;
        let stderr = NamedTempFile::new()?;

        let mut child = Command::new(&self.config.python)
            .arg(harness.path())
            .arg(events.path())
            .arg(target)
            .arg(self.config.max_observations.to_string())
            .arg(self.config.max_items.to_string())
            .arg(self.config.max_depth.to_string())
            .current_dir(target.parent().unwrap_or_else(|| Path::new(".")))
            // Interactive targets read our stdin; their output must not mix
            // into the report on stdout.
            .stdin(Stdio::inherit())
            .stdout(Stdio::from(std::io::stderr()))
            .stderr(Stdio::from(stderr.reopen()?))
            .spawn()
            .map_err(|e| {
                Error::Io(std::io::Error::other(format!(
                    "Failed to spawn {}: {}",
                    self.config.python, e
                )))
            })?;

        let status = match self.config.timeout {
            Some(limit) => match child.wait_timeout(limit)? {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    warn!("{} timed out after {:?}", target.display(), limit);
                    return Err(Error::trace_error(format!("timed out after {:?}", limit)));
                },
            },
            None => child.wait()?,
        };

        if !status.success() {
            let mut detail = String::new();
            stderr.reopen()?.read_to_string(&mut detail)?;
            if let Some(last) = detail.lines().rev().find(|l| !l.trim().is_empty()) {
                debug!("{} exited with {}: {}", target.display(), status, last);
            }
        }
        Ok(events)
    }
}

/// Builds signatures for observed functions defined at module level.
fn reconstruct_all(session: &TraceSession) -> Vec<ObservedSignature> {
    let mut modules: HashMap<PathBuf, Option<Module>> = HashMap::new();
    let mut out = Vec::new();

    for (key, observations) in session.observations() {
        let module = modules.entry(key.file.clone()).or_insert_with(|| load_module(&key.file));
        let Some(module) = module.as_ref() else {
            continue;
        };
        // A later definition shadows an earlier one at runtime.
        let def: Option<&FunctionDef> =
            module.top_level_functions().filter(|def| def.name == key.function).last();
        match def {
            Some(def) => out.push(ObservedSignature {
                module: module_name(&key.file),
                signature: InferredSignature::reconstruct(def, observations),
            }),
            None => debug!("{} is not a module-level function; skipped", key.function),
        }
    }
    out
}

fn load_module(path: &Path) -> Option<Module> {
    match Parser::new().and_then(|mut parser| parser.parse_file(path)) {
        Ok(module) => Some(module),
        Err(e) => {
            warn!("cannot reconstruct signatures from {}: {}", path.display(), e);
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn python_available() -> bool {
        Command::new(TracerConfig::from_env().python)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn tracer() -> RuntimeTracer {
        RuntimeTracer::new(TracerConfig::from_env().with_timeout_secs(30))
    }

    #[test]
    fn test_rejects_missing_and_non_python_files() {
        let dir = tempdir().unwrap();
        assert!(matches!(tracer().run(dir.path().join("missing.py")), Err(Error::Io(_))));
        let text = dir.path().join("notes.txt");
        fs::write(&text, "x").unwrap();
        assert!(matches!(tracer().run(&text), Err(Error::Argument(_))));
    }

    #[test]
    fn test_trace_infers_signatures_and_globals() {
        if !python_available() {
            eprintln!("python interpreter not found; skipping");
            return;
        }
        let dir = tempdir().unwrap();
        let target = dir.path().join("calc.py");
        fs::write(
            &target,
            "\
import json

def double(n):
    return n * 2

def echo(value, suffix=''):
    return value

class Box:
    def get(self):
        return 1

LIMIT = double(5) + double(7)
echo(5)
echo('a')
Box().get()
PAYLOAD = json.dumps({'a': 1})
",
        )
        .unwrap();

        let outcome = tracer().run(&target).unwrap();
        assert_eq!(outcome.module, "calc.py");
        assert_eq!(
            outcome.paired_text(),
            vec![
                "- def double(n):\n+ def double(n: int) -> int:".to_string(),
                "- def echo(value, suffix=''):\n+ def echo(value: Union[int, str], suffix='') -> Union[int, str]:"
                    .to_string(),
            ]
        );
        assert!(outcome.globals.contains(&("LIMIT".to_string(), Type::primitive("int"))));
        assert!(outcome.globals.contains(&("PAYLOAD".to_string(), Type::primitive("str"))));
        assert!(!outcome.globals.iter().any(|(name, _)| name == "json"));

        let rows = outcome.rows();
        assert!(rows.iter().any(|r| r.kind == AnalyzerKind::Conditional && r.variable == "LIMIT"));
        assert_eq!(rows.iter().filter(|r| r.kind == AnalyzerKind::RightTyper).count(), 4);
    }

    fn trace_source(config: TracerConfig, source: &str) -> TraceOutcome {
        let dir = tempdir().unwrap();
        let target = dir.path().join("capped.py");
        fs::write(&target, source).unwrap();
        RuntimeTracer::new(config).run(&target).unwrap()
    }

    #[test]
    fn test_depth_cap_keeps_container_kind() {
        if !python_available() {
            eprintln!("python interpreter not found; skipping");
            return;
        }
        let config = TracerConfig { max_depth: 2, ..tracer().config };
        let outcome = trace_source(config, "def f(x):\n    return 0\n\nf([[[[1]]]])\n");
        assert_eq!(
            outcome.paired_text(),
            vec!["- def f(x):\n+ def f(x: list[list[list[Unknown]]]) -> int:".to_string()]
        );
    }

    #[test]
    fn test_item_cap_limits_described_elements() {
        if !python_available() {
            eprintln!("python interpreter not found; skipping");
            return;
        }
        let config = TracerConfig { max_items: 2, ..tracer().config };
        let source = "def f(x):\n    return x\n\nf([1, 2, 'three'])\nDATA = {'a': 1, 'b': 2, 3: None}\n";
        let outcome = trace_source(config, source);
        assert_eq!(
            outcome.paired_text(),
            vec!["- def f(x):\n+ def f(x: list[int]) -> list[int]:".to_string()]
        );
        assert!(outcome.globals.contains(&(
            "DATA".to_string(),
            Type::dict(Type::primitive("str"), Type::primitive("int"))
        )));
    }

    #[test]
    fn test_observation_cap_ignores_later_calls() {
        if !python_available() {
            eprintln!("python interpreter not found; skipping");
            return;
        }
        let config = TracerConfig { max_observations: 1, ..tracer().config };
        let outcome = trace_source(config, "def f(x):\n    return x\n\nf(1)\nf('a')\nf(None)\n");
        assert_eq!(
            outcome.paired_text(),
            vec!["- def f(x):\n+ def f(x: int) -> int:".to_string()]
        );
    }

    #[test]
    fn test_raising_target_discards_trace() {
        if !python_available() {
            eprintln!("python interpreter not found; skipping");
            return;
        }
        let dir = tempdir().unwrap();
        let target = dir.path().join("boom.py");
        fs::write(&target, "def f(x):\n    return 1 / x\n\nf(1)\nf(0)\n").unwrap();

        match tracer().run(&target) {
            Err(Error::Trace(reason)) => assert!(reason.contains("ZeroDivisionError")),
            other => panic!("expected incomplete trace, got {:?}", other),
        }
    }

    #[test]
    fn test_timeout_kills_target() {
        if !python_available() {
            eprintln!("python interpreter not found; skipping");
            return;
        }
        let dir = tempdir().unwrap();
        let target = dir.path().join("spin.py");
        fs::write(&target, "while True:\n    pass\n").unwrap();

        let tracer = RuntimeTracer::new(TracerConfig::from_env().with_timeout_secs(1));
        assert!(matches!(tracer.run(&target), Err(Error::Trace(_))));
    }
}
