//! Flow model structures
//!
//! A `Flow` is a named, ordered list of browser-automation steps. Steps are
//! kept in their raw tagged form (`action` + flat param map) so a parsed
//! file round-trips untouched; the typed view lives in [`crate::action`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Browser the flow runs against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
    Edge,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Edge => "edge",
        }
    }
}

/// Flow parsed from JSON or YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    pub flow_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub browser: Browser,
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Flow {
    /// Empty flow with defaults, ready for the editor surface
    pub fn empty(flow_name: &str) -> Self {
        Self {
            flow_name: flow_name.to_string(),
            description: String::new(),
            browser: Browser::default(),
            steps: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// One automation step in its raw form: an action tag plus whatever params
/// the file declared. Unknown params survive a parse/save round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub action: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Step {
    pub fn new(action: &str) -> Self {
        Self {
            action: action.to_string(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Param as a display string. Numbers and bools stringify (a YAML author
    /// writing `seconds: 2` means the text "2" at the directive level).
    pub fn param_str(&self, key: &str) -> Option<String> {
        match self.params.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn has_param(&self, key: &str) -> bool {
        !self.params.get(key).map_or(true, Value::is_null)
    }
}
