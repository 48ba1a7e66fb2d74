//! Production engine: Robot Framework CLI subprocess

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use tokio::sync::Notify;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use super::{AutomationEngine, EngineRun, RunOptions};
use crate::error::FlowError;

/// Bounded wait for the availability probe
const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Suite-level stat line, current engine releases:
/// `<stat pass="3" fail="1" ...>`
static STAT_ATTRS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<stat[^>]*\bpass="(\d+)"[^>]*\bfail="(\d+)""#).unwrap());

/// Element-style totals written by older engine releases
static TOTAL_ELEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"<total>(\d+)</total>").unwrap());
static PASS_ELEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"<pass>(\d+)</pass>").unwrap());
static FAIL_ELEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"<fail>(\d+)</fail>").unwrap());

/// Robot Framework-style engine invoked as a subprocess.
///
/// The engine's exit code is the number of failed cases (0 = all passed),
/// so a non-zero exit is a normal run outcome, not an invocation error.
pub struct RobotEngine {
    command: String,
    kill: Arc<Notify>,
}

impl RobotEngine {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            kill: Arc::new(Notify::new()),
        }
    }

    /// Check the engine CLI responds to `--version` within a bounded wait.
    pub fn check_available(&self) -> bool {
        let child = std::process::Command::new(&self.command)
            .arg("--version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn();

        match child {
            Ok(mut child) => match child.wait_timeout(VERSION_PROBE_TIMEOUT) {
                Ok(Some(_)) => true,
                Ok(None) => {
                    // Probe hung; don't leave the process behind
                    let _ = child.kill();
                    false
                }
                Err(_) => false,
            },
            Err(_) => false,
        }
    }
}

#[async_trait]
impl AutomationEngine for RobotEngine {
    fn name(&self) -> &str {
        &self.command
    }

    async fn run(&self, script: &Path, options: &RunOptions) -> Result<EngineRun, FlowError> {
        let mut child = tokio::process::Command::new(&self.command)
            .arg("--outputdir")
            .arg(&options.output_dir)
            .arg("--output")
            .arg(format!("{}.xml", options.output_stem))
            .arg("--log")
            .arg(format!("{}.html", options.output_stem))
            .arg("--report")
            .arg(format!("{}.html", options.output_stem))
            .arg("--debugfile")
            .arg(format!("{}_debug.txt", options.output_stem))
            .arg(script)
            .spawn()
            .map_err(|e| FlowError::Engine(format!("failed to launch '{}': {e}", self.command)))?;

        debug!(engine = %self.command, script = %script.display(), "engine started");

        let status = tokio::select! {
            status = child.wait() => {
                status.map_err(|e| FlowError::Engine(format!("engine wait failed: {e}")))?
            }
            _ = self.kill.notified() => {
                // The engine's run loop is not interruptible mid-directive;
                // the process boundary is the only stop we can guarantee.
                let _ = child.kill().await;
                return Err(FlowError::Engine("engine terminated by request".into()));
            }
        };

        let return_code = status.code().unwrap_or(-1);
        let stats = extract_statistics(&options.output_file());
        if stats.is_none() {
            warn!(output = %options.output_file().display(), "no statistics extracted from engine output");
        }

        Ok(EngineRun { return_code, stats })
    }

    fn terminate(&self) {
        self.kill.notify_waiters();
    }
}

/// Probe the engine's output XML for aggregate statistics.
///
/// Returns the statistics document in the shape the engine wrote it: the
/// nested object for current releases, the flat-total form for older ones,
/// or `None` when neither probe matches (the orchestrator then synthesizes
/// from the return code).
fn extract_statistics(output_file: &Path) -> Option<serde_json::Value> {
    let contents = std::fs::read_to_string(output_file).ok()?;

    if let Some(caps) = STAT_ATTRS.captures(&contents) {
        let passed: u32 = caps[1].parse().ok()?;
        let failed: u32 = caps[2].parse().ok()?;
        return Some(json!({
            "statistics": { "total": passed + failed, "passed": passed, "failed": failed }
        }));
    }

    if let Some(caps) = TOTAL_ELEM.captures(&contents) {
        let total: u32 = caps[1].parse().ok()?;
        let passed = PASS_ELEM
            .captures(&contents)
            .and_then(|c| c[1].parse::<u32>().ok())
            .unwrap_or(0);
        let failed = FAIL_ELEM
            .captures(&contents)
            .and_then(|c| c[1].parse::<u32>().ok())
            .unwrap_or(0);
        return Some(json!({ "statistics": total, "passed": passed, "failed": failed }));
    }

    None
}
