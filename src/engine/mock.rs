//! Mock engine for testing
//!
//! Returns configurable outcomes without spawning a process. Essential for
//! orchestrator and scheduler tests in CI.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use super::{AutomationEngine, EngineRun, RunOptions};
use crate::error::FlowError;

/// One recorded invocation, for assertions
#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub script: PathBuf,
    pub output_stem: String,
}

/// Mock engine with a configurable outcome
pub struct MockEngine {
    return_code: i32,
    stats: Option<Value>,
    launch_error: Option<String>,
    runs: Arc<Mutex<Vec<RecordedRun>>>,
}

impl MockEngine {
    /// Engine that "passes" (return code 0, no native statistics — the
    /// orchestrator's return-code fallback kicks in)
    pub fn new() -> Self {
        Self {
            return_code: 0,
            stats: None,
            launch_error: None,
            runs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_return_code(mut self, code: i32) -> Self {
        self.return_code = code;
        self
    }

    /// Report a native statistics document
    pub fn with_stats(mut self, stats: Value) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Fail the invocation itself (launch failure)
    pub fn failing(mut self, error: impl Into<String>) -> Self {
        self.launch_error = Some(error.into());
        self
    }

    /// All invocations made so far
    pub fn runs(&self) -> Vec<RecordedRun> {
        self.runs.lock().unwrap().clone()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AutomationEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(&self, script: &Path, options: &RunOptions) -> Result<EngineRun, FlowError> {
        self.runs.lock().unwrap().push(RecordedRun {
            script: script.to_path_buf(),
            output_stem: options.output_stem.clone(),
        });

        if let Some(error) = &self.launch_error {
            return Err(FlowError::Engine(error.clone()));
        }

        Ok(EngineRun {
            return_code: self.return_code,
            stats: self.stats.clone(),
        })
    }
}
