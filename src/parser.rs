//! Flow file parsing and saving
//!
//! Flows live in `.json` or `.yaml`/`.yml` files. Parsing always validates:
//! a `Flow` returned from here is ready for the compiler.

use std::fs;
use std::path::Path;

use chrono::Local;
use serde_json::Value;
use tracing::debug;

use crate::error::{FlowError, ValidationError};
use crate::flow::Flow;
use crate::validate;

/// Parse and validate a flow file, dispatching on the file extension.
pub fn parse_from_file(path: impl AsRef<Path>) -> Result<Flow, FlowError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(FlowError::FileNotFound(path.to_path_buf()));
    }

    let contents = fs::read_to_string(path)?;
    let value: Value = match extension_of(path)?.as_str() {
        "json" => serde_json::from_str(&contents)?,
        // serde_yaml deserializes into serde_json::Value directly
        "yaml" | "yml" => serde_yaml::from_str(&contents)?,
        _ => unreachable!("extension_of only admits supported extensions"),
    };

    debug!(path = %path.display(), "parsed flow file");
    parse_from_value(value)
}

/// Parse and validate a flow from an already-loaded JSON value.
///
/// Structural presence of `flow_name` and `steps` is checked here, before
/// typed deserialization, so the caller gets a `ValidationError` naming the
/// field rather than a serde message.
pub fn parse_from_value(value: Value) -> Result<Flow, FlowError> {
    let doc = match &value {
        Value::Object(map) if !map.is_empty() => map,
        _ => {
            return Err(ValidationError::MissingField {
                field: "flow_name".into(),
            }
            .into())
        }
    };

    for field in ["flow_name", "steps"] {
        if !doc.contains_key(field) {
            return Err(ValidationError::MissingField {
                field: field.into(),
            }
            .into());
        }
    }
    if !doc["steps"].is_array() {
        return Err(ValidationError::StepsNotASequence.into());
    }

    let flow: Flow = serde_json::from_value(value)?;
    validate::validate(&flow)?;
    Ok(flow)
}

/// Save a flow, JSON or YAML by extension. Creates parent directories.
///
/// Stamps `updated_at`, and `created_at` when absent.
pub fn save_to_file(path: impl AsRef<Path>, flow: &mut Flow) -> Result<(), FlowError> {
    let path = path.as_ref();
    let ext = extension_of(path)?;

    let now = Local::now().to_rfc3339();
    if flow.created_at.is_none() {
        flow.created_at = Some(now.clone());
    }
    flow.updated_at = Some(now);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let contents = match ext.as_str() {
        "json" => serde_json::to_string_pretty(flow)?,
        "yaml" | "yml" => serde_yaml::to_string(flow)?,
        _ => unreachable!("extension_of only admits supported extensions"),
    };

    fs::write(path, contents)?;
    debug!(path = %path.display(), "saved flow file");
    Ok(())
}

fn extension_of(path: &Path) -> Result<String, FlowError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "json" | "yaml" | "yml" => Ok(ext),
        _ => Err(FlowError::UnsupportedFormat { extension: ext }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_flow_name_is_validation_error() {
        let err = parse_from_value(json!({ "steps": [] })).unwrap_err();
        assert!(matches!(
            err,
            FlowError::Validation(ValidationError::MissingField { ref field }) if field == "flow_name"
        ));
    }

    #[test]
    fn missing_steps_is_validation_error() {
        let err = parse_from_value(json!({ "flow_name": "Demo" })).unwrap_err();
        assert!(matches!(
            err,
            FlowError::Validation(ValidationError::MissingField { ref field }) if field == "steps"
        ));
    }

    #[test]
    fn steps_must_be_a_sequence() {
        let err = parse_from_value(json!({ "flow_name": "Demo", "steps": "nope" })).unwrap_err();
        assert!(matches!(
            err,
            FlowError::Validation(ValidationError::StepsNotASequence)
        ));
    }

    #[test]
    fn parse_rejects_invalid_step() {
        let err = parse_from_value(json!({
            "flow_name": "Demo",
            "steps": [{ "action": "click" }]
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            FlowError::Validation(ValidationError::MissingActionParam { step: 0, .. })
        ));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.toml");
        std::fs::write(&path, "x = 1").unwrap();
        assert!(matches!(
            parse_from_file(&path),
            Err(FlowError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        assert!(matches!(
            parse_from_file("does/not/exist.json"),
            Err(FlowError::FileNotFound(_))
        ));
    }

    #[test]
    fn save_then_parse_round_trips_semantic_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.yaml");

        let mut flow = parse_from_value(json!({
            "flow_name": "Demo",
            "description": "round trip",
            "browser": "firefox",
            "steps": [
                { "action": "open_browser", "url": "https://example.com" },
                { "action": "wait", "seconds": 2 }
            ],
            "created_at": "2024-01-01T00:00:00+00:00"
        }))
        .unwrap();

        save_to_file(&path, &mut flow).unwrap();
        let reloaded = parse_from_file(&path).unwrap();

        assert_eq!(reloaded.flow_name, "Demo");
        assert_eq!(reloaded.description, "round trip");
        assert_eq!(reloaded.browser, crate::flow::Browser::Firefox);
        assert_eq!(reloaded.steps.len(), 2);
        // created_at preserved when present, updated_at stamped
        assert_eq!(reloaded.created_at.as_deref(), Some("2024-01-01T00:00:00+00:00"));
        assert!(reloaded.updated_at.is_some());
    }

    #[test]
    fn save_populates_created_at_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.json");

        let mut flow = Flow::empty("Fresh");
        save_to_file(&path, &mut flow).unwrap();
        assert!(flow.created_at.is_some());

        let reloaded = parse_from_file(&path).unwrap();
        assert_eq!(reloaded.created_at, flow.created_at);
    }
}
