//! Error types with fix suggestions

use std::path::PathBuf;

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Validation failures, applied in order, first failure wins.
///
/// Step indices are 0-based and refer to declaration order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("'steps' must be a sequence")]
    StepsNotASequence,

    #[error("step {step}: unknown action '{action}'")]
    UnknownAction { step: usize, action: String },

    #[error("step {step}: action '{action}' is missing required param '{param}'")]
    MissingActionParam {
        step: usize,
        action: String,
        param: String,
    },
}

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("flow file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("unsupported flow file format '{extension}' (expected .json, .yaml or .yml)")]
    UnsupportedFormat { extension: String },

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("engine error: {0}")]
    Engine(String),

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FixSuggestion for ValidationError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField { .. } => {
                Some("Add the field to the flow file (flow_name and steps are required)")
            }
            ValidationError::StepsNotASequence => Some("Declare steps as a YAML/JSON list"),
            ValidationError::UnknownAction { .. } => {
                Some("Check the action name against the supported action list")
            }
            ValidationError::MissingActionParam { .. } => {
                Some("Add the missing param to the step definition")
            }
        }
    }
}

impl FixSuggestion for FlowError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            FlowError::FileNotFound(_) => Some("Check the path, or run `flowpilot flow list`"),
            FlowError::UnsupportedFormat { .. } => {
                Some("Rename the file to .json, .yaml or .yml")
            }
            FlowError::JsonParse(_) => Some("Check JSON syntax (try jq . <file>)"),
            FlowError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            FlowError::Validation(e) => e.fix_suggestion(),
            FlowError::Engine(_) => {
                Some("Check the automation engine is installed and on PATH (FLOWPILOT_ENGINE)")
            }
            FlowError::Scheduler(_) => Some("Check the trigger kind and params"),
            FlowError::Io(_) => Some("Check file path and permissions"),
        }
    }
}
