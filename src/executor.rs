//! Execution orchestrator
//!
//! Runs the validate → compile → engine → normalize pipeline for one flow.
//! Validation failures surface synchronously (fail fast, before any side
//! effect); engine-time failures are absorbed into a failed
//! [`ExecutionResult`] and never raised past this boundary.
//!
//! Cancellation is two-tier: [`FlowExecutor::request_stop`] is cooperative
//! and only honored between pipeline stages (the emission points);
//! [`FlowExecutor::terminate`] kills the engine process outright. Nothing
//! guarantees a graceful mid-script abort, and artifacts written up to the
//! kill point may be incomplete.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use crate::compiler::{output_stem, Compiler};
use crate::engine::{AutomationEngine, RunOptions};
use crate::error::FlowError;
use crate::flow::Flow;
use crate::parser;
use crate::result::{normalize_statistics, ArtifactPaths, ExecutionResult};
use crate::status::{StatusChannel, StatusKind};
use crate::validate;

/// Orchestrates compilation and engine execution of flows
pub struct FlowExecutor {
    engine: Arc<dyn AutomationEngine>,
    compiler: Compiler,
    output_dir: PathBuf,
    status: StatusChannel,
    stop: Arc<AtomicBool>,
}

impl FlowExecutor {
    pub fn new(
        engine: Arc<dyn AutomationEngine>,
        output_dir: impl Into<PathBuf>,
        resource_path: impl Into<PathBuf>,
    ) -> Self {
        let output_dir = output_dir.into();
        Self {
            engine,
            compiler: Compiler::new(output_dir.clone(), resource_path),
            output_dir,
            status: StatusChannel::new(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The executor's status channel (subscribe or attach callbacks)
    pub fn status(&self) -> &StatusChannel {
        &self.status
    }

    /// Cooperative stop: honored at the next emission point, not mid-run
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Forcibly kill the running engine process
    pub fn terminate(&self) {
        self.engine.terminate();
    }

    /// Parse a flow file, then execute it
    pub async fn execute_from_file(
        &self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<ExecutionResult, FlowError> {
        let path = path.as_ref();
        self.status
            .emit(StatusKind::Info, format!("Loading flow file: {}", path.display()));
        let flow = parser::parse_from_file(path)?;
        self.execute(&flow).await
    }

    /// Execute one flow. `Err` only for validation failure; everything after
    /// the engine takes over lands in the returned result.
    #[instrument(skip(self, flow), fields(flow = %flow.flow_name))]
    pub async fn execute(&self, flow: &Flow) -> Result<ExecutionResult, FlowError> {
        validate::validate(flow)?;

        if self.stopped("before script generation") {
            return Ok(ExecutionResult::failed("execution stopped by request"));
        }

        // Compile and write the script
        let script = self.compiler.compile(flow, &self.status);
        std::fs::create_dir_all(&self.output_dir)?;
        std::fs::write(&script.path, &script.text)?;
        self.status.emit(
            StatusKind::Info,
            format!("Generated test script: {}", script.path.display()),
        );

        if self.stopped("before engine start") {
            return Ok(ExecutionResult::failed("execution stopped by request"));
        }

        self.status
            .emit(StatusKind::Info, "Starting flow execution...");

        let options = RunOptions::new(self.output_dir.clone(), output_stem());
        let started = Instant::now();

        let run = match self.engine.run(&script.path, &options).await {
            Ok(run) => run,
            Err(e) => {
                self.status
                    .emit(StatusKind::Error, format!("Execution error: {e}"));
                let mut result = ExecutionResult::failed(e.to_string());
                result.artifacts.script = Some(script.path.clone());
                return Ok(result);
            }
        };

        let execution_time_seconds = round2(started.elapsed().as_secs_f64());
        let statistics = normalize_statistics(run.stats.as_ref(), run.return_code);
        let success = run.return_code == 0;

        if success {
            self.status.emit(
                StatusKind::Success,
                format!("Execution succeeded in {execution_time_seconds:.2}s"),
            );
        } else {
            self.status.emit(
                StatusKind::Error,
                format!("Execution failed with return code {}", run.return_code),
            );
        }
        info!(
            return_code = run.return_code,
            seconds = execution_time_seconds,
            "flow execution finished"
        );

        Ok(ExecutionResult {
            success,
            return_code: run.return_code,
            execution_time_seconds,
            statistics,
            artifacts: ArtifactPaths {
                script: Some(script.path),
                log: Some(options.log_file()),
                report: Some(options.log_file()),
                debug: Some(options.debug_file()),
                raw_output: Some(options.output_file()),
            },
            message: None,
            error: if success {
                None
            } else {
                Some(format!("engine returned {}", run.return_code))
            },
        })
    }

    fn stopped(&self, stage: &str) -> bool {
        if self.stop.load(Ordering::SeqCst) {
            self.status.emit(
                StatusKind::Error,
                format!("Execution stopped by request {stage}"),
            );
            return true;
        }
        false
    }
}

fn round2(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(0.005), 0.01);
    }
}
