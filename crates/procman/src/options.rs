//! Run options supplied by the caller for each spawn.
//!
//! A [`RunOptions`] value is immutable for the duration of a spawn: it is
//! handed to the spawning service, attached to the registry entry, and echoed
//! verbatim as the `extra` field on every event forwarded for that process.
//! Unknown caller-supplied fields round-trip through a flattened map so the
//! echo is exact.
//!
//! # Example
//!
//! ```rust
//! use procman::options::RunOptions;
//!
//! let options = RunOptions::builder("echo hi")
//!     .run_type("shell")
//!     .cwd("/tmp")
//!     .build();
//! assert_eq!(options.run_type, "shell");
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Default run type when the caller does not supply one.
pub const DEFAULT_RUN_TYPE: &str = "run";

/// Caller-supplied parameters for a single spawn.
///
/// `run_type` (wire name `type`) namespaces the outgoing event names: a
/// process spawned with `type: "shell"` emits `shell-start`, `shell-data`,
/// and `shell-exit` events. Everything beyond the known fields is preserved
/// in `rest` and passes through the core untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    /// The command line to execute.
    pub line: String,

    /// Label distinguishing run kinds; namespaces outgoing event names.
    #[serde(rename = "type", default = "default_run_type")]
    pub run_type: String,

    /// Working directory for the spawned process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Executable search path override (`PATH`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Explicit argv; when present it takes precedence over shell
    /// interpretation of `line`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argv: Option<Vec<String>>,

    /// Extra environment variables for the spawned process.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,

    /// Any other caller-supplied fields, preserved verbatim for the `extra`
    /// echo on outgoing events.
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

fn default_run_type() -> String {
    DEFAULT_RUN_TYPE.to_string()
}

impl RunOptions {
    /// Create options for a plain command line with the default run type.
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            run_type: default_run_type(),
            cwd: None,
            path: None,
            argv: None,
            env: HashMap::new(),
            rest: serde_json::Map::new(),
        }
    }

    /// Start building options for the given command line.
    pub fn builder(line: impl Into<String>) -> RunOptionsBuilder {
        RunOptionsBuilder {
            options: Self::new(line),
        }
    }
}

/// Builder for [`RunOptions`].
#[derive(Debug, Clone)]
pub struct RunOptionsBuilder {
    options: RunOptions,
}

impl RunOptionsBuilder {
    /// Set the run type label (e.g. `"shell"`).
    pub fn run_type(mut self, run_type: impl Into<String>) -> Self {
        self.options.run_type = run_type.into();
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.options.cwd = Some(cwd.into());
        self
    }

    /// Set the executable search path override.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.options.path = Some(path.into());
        self
    }

    /// Set an explicit argv, bypassing shell interpretation of `line`.
    pub fn argv(mut self, argv: Vec<String>) -> Self {
        self.options.argv = Some(argv);
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.env.insert(key.into(), value.into());
        self
    }

    /// Attach an opaque caller field, preserved in the `extra` echo.
    pub fn field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.rest.insert(key.into(), value);
        self
    }

    /// Finish building.
    pub fn build(self) -> RunOptions {
        self.options
    }
}
