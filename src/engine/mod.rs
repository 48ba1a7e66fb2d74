//! Automation engine boundary
//!
//! The engine is the external process that actually drives a browser and
//! reports pass/fail. This module defines how the orchestrator talks to it:
//!
//! - [`AutomationEngine`] - core trait for running a compiled script
//! - [`RobotEngine`] - production engine, invoked as a subprocess
//! - [`MockEngine`] - test engine with configurable outcomes
//!
//! Use [`create_engine`] to instantiate by name: `mock` builds the test
//! engine, anything else is treated as the engine command to spawn.

mod mock;
mod robot;

pub use mock::MockEngine;
pub use robot::RobotEngine;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FlowError;

/// Where one engine invocation writes its artifacts
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    /// Artifact stem, `output_{YYYYMMDD_HHMMSS}`
    pub output_stem: String,
}

impl RunOptions {
    pub fn new(output_dir: impl Into<PathBuf>, output_stem: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            output_stem: output_stem.into(),
        }
    }

    /// Machine-parsable structured output
    pub fn output_file(&self) -> PathBuf {
        self.output_dir.join(format!("{}.xml", self.output_stem))
    }

    /// Human-facing log/report (the engine writes both to one file here)
    pub fn log_file(&self) -> PathBuf {
        self.output_dir.join(format!("{}.html", self.output_stem))
    }

    /// Raw debug transcript
    pub fn debug_file(&self) -> PathBuf {
        self.output_dir.join(format!("{}_debug.txt", self.output_stem))
    }
}

/// Raw outcome of one engine invocation, before normalization
#[derive(Debug, Clone)]
pub struct EngineRun {
    pub return_code: i32,
    /// The engine's own statistics document, in whichever shape this engine
    /// version reports (see [`crate::result::normalize_statistics`])
    pub stats: Option<Value>,
}

/// Core trait the orchestrator runs scripts through
#[async_trait]
pub trait AutomationEngine: Send + Sync {
    /// Engine name for logs and events
    fn name(&self) -> &str;

    /// Run a compiled script. A non-zero engine exit is a normal
    /// [`EngineRun`]; `Err` means the invocation itself failed (spawn
    /// failure, forced termination).
    async fn run(&self, script: &Path, options: &RunOptions) -> Result<EngineRun, FlowError>;

    /// Forcibly kill the running engine process, if any. Advisory no-op for
    /// engines without a process boundary.
    fn terminate(&self) {}
}

/// Create an engine by name. `mock` builds [`MockEngine`]; any other name is
/// the command to spawn.
pub fn create_engine(name: &str) -> Arc<dyn AutomationEngine> {
    if name.eq_ignore_ascii_case("mock") {
        Arc::new(MockEngine::new())
    } else {
        Arc::new(RobotEngine::new(name))
    }
}
