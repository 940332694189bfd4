//! Tracer configuration.

use std::env;
use std::time::Duration;

/// Environment variable naming the interpreter used for traced runs.
pub const PYTHON_ENV: &str = "RETROTYPE_PYTHON";

/// Default wall-clock limit for one traced run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for one dynamic tracing invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerConfig {
    /// Interpreter executable.
    pub python: String,
    /// Kill the traced run after this long; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Calls recorded per function before further calls are ignored.
    pub max_observations: usize,
    /// Elements described per container value.
    pub max_items: usize,
    /// Nesting depth described per value.
    pub max_depth: usize,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
            max_observations: 1000,
            max_items: 20,
            max_depth: 4,
        }
    }
}

impl TracerConfig {
    /// Defaults with the interpreter taken from `RETROTYPE_PYTHON`, then
    /// `PYTHON`.
    pub fn from_env() -> Self {
        let python = [PYTHON_ENV, "PYTHON"]
            .iter()
            .filter_map(|key| env::var(key).ok())
            .find(|value| !value.trim().is_empty());
        let mut config = Self::default();
        if let Some(python) = python {
            config.python = python;
        }
        config
    }

    /// Sets the timeout in seconds; `0` disables it.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }

    /// Overrides the interpreter.
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }
}
