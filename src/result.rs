//! Execution result schema and statistics normalization

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Aggregate pass/fail statistics for one execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
}

/// Paths to the artifacts one execution produced (where available)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactPaths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<PathBuf>,
}

/// Normalized outcome of one orchestrator invocation. Never mutated after
/// return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub return_code: i32,
    pub execution_time_seconds: f64,
    pub statistics: Statistics,
    #[serde(default)]
    pub artifacts: ArtifactPaths,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Failed result for an error that prevented (or aborted) the engine run
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            return_code: -1,
            execution_time_seconds: 0.0,
            statistics: Statistics::default(),
            artifacts: ArtifactPaths::default(),
            message: None,
            error: Some(error.into()),
        }
    }
}

/// Normalize the engine's statistics document into [`Statistics`].
///
/// Engines differ across versions in how they report aggregates. Probed in
/// order:
/// 1. nested object: `statistics: { total, passed, failed }`
/// 2. flat scalar total plus separately-available counts:
///    `statistics: <n>` with top-level `passed` / `failed`
/// 3. synthesized single-case statistic from the process return code
///
/// Never fails; the chain bottoms out at the return-code synthesis.
pub fn normalize_statistics(stats: Option<&Value>, return_code: i32) -> Statistics {
    if let Some(doc) = stats {
        let block = doc.get("statistics").unwrap_or(doc);

        if let Some(nested) = read_nested(block) {
            return nested;
        }
        if let Some(flat) = read_flat(block, doc) {
            return flat;
        }
    }

    // Neither known shape: synthesize from the return code
    let passed = u32::from(return_code == 0);
    Statistics {
        total: 1,
        passed,
        failed: 1 - passed,
    }
}

fn read_nested(block: &Value) -> Option<Statistics> {
    Some(Statistics {
        total: as_u32(block.get("total")?)?,
        passed: as_u32(block.get("passed")?)?,
        failed: as_u32(block.get("failed")?)?,
    })
}

fn read_flat(block: &Value, doc: &Value) -> Option<Statistics> {
    let total = as_u32(block)?;
    let passed = doc.get("passed").and_then(as_u32).unwrap_or(0);
    let failed = doc.get("failed").and_then(as_u32).unwrap_or(0);
    Some(Statistics {
        total,
        passed,
        failed,
    })
}

fn as_u32(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}
