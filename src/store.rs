//! Flow file management
//!
//! CRUD over the flows directory: saving with sanitized names, listing with
//! summaries, duplication, import/export. All flows pass through the parser
//! (and therefore validation) on the way in and out.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;
use walkdir::WalkDir;

use crate::error::FlowError;
use crate::flow::{Browser, Flow};
use crate::parser;

/// Characters dropped when deriving a file stem from a flow name
static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9 _-]").unwrap());

const FLOW_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Listing entry for one stored flow
#[derive(Debug, Clone)]
pub struct FlowSummary {
    pub file_name: String,
    pub file_path: PathBuf,
    pub flow_name: String,
    pub description: String,
    pub browser: Browser,
    pub steps_count: usize,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub modified_time: DateTime<Local>,
}

/// Detailed view of one stored flow
#[derive(Debug, Clone)]
pub struct FlowInfo {
    pub summary: FlowSummary,
    pub flow: Flow,
    pub file_size: u64,
}

/// Flows-directory manager
#[derive(Debug, Clone)]
pub struct FlowStore {
    flows_dir: PathBuf,
}

impl FlowStore {
    pub fn new(flows_dir: impl Into<PathBuf>) -> Self {
        Self {
            flows_dir: flows_dir.into(),
        }
    }

    pub fn flows_dir(&self) -> &Path {
        &self.flows_dir
    }

    /// Fresh flow with stamped timestamps, not yet saved
    pub fn create_flow(&self, flow_name: &str, description: &str, browser: Browser) -> Flow {
        let now = Local::now().to_rfc3339();
        Flow {
            description: description.to_string(),
            browser,
            created_at: Some(now.clone()),
            updated_at: Some(now),
            ..Flow::empty(flow_name)
        }
    }

    /// Validate and save a flow into the store. Without an explicit file
    /// name, one is derived from the sanitized flow name (`.json`).
    pub fn save_flow(&self, flow: &mut Flow, file_name: Option<&str>) -> Result<PathBuf, FlowError> {
        crate::validate::validate(flow)?;

        let mut name = match file_name {
            Some(name) => name.to_string(),
            None => format!("{}.json", safe_stem(&flow.flow_name)),
        };
        if !FLOW_EXTENSIONS
            .iter()
            .any(|ext| name.to_ascii_lowercase().ends_with(&format!(".{ext}")))
        {
            name.push_str(".json");
        }

        let path = self.flows_dir.join(name);
        parser::save_to_file(&path, flow)?;
        Ok(path)
    }

    /// Load by file name (relative to the store) or absolute path
    pub fn load_flow(&self, file_name: &str) -> Result<Flow, FlowError> {
        parser::parse_from_file(self.resolve(file_name))
    }

    /// Delete a stored flow. `false` when the file does not exist.
    pub fn delete_flow(&self, file_name: &str) -> bool {
        let path = self.resolve(file_name);
        if !path.exists() {
            return false;
        }
        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %path.display(), "failed to delete flow: {e}");
                false
            }
        }
    }

    /// All readable flows in the store, newest modification first.
    /// Unreadable or invalid files are skipped with a warning.
    pub fn list_flows(&self) -> Vec<FlowSummary> {
        let mut summaries: Vec<FlowSummary> = WalkDir::new(&self.flows_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|ext| FLOW_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .filter_map(|entry| match self.summarize(entry.path()) {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!(path = %entry.path().display(), "skipping unreadable flow: {e}");
                    None
                }
            })
            .collect();

        summaries.sort_by(|a, b| b.modified_time.cmp(&a.modified_time));
        summaries
    }

    /// Detailed information for one stored flow
    pub fn flow_info(&self, file_name: &str) -> Result<FlowInfo, FlowError> {
        let path = self.resolve(file_name);
        let summary = self.summarize(&path)?;
        let flow = parser::parse_from_file(&path)?;
        let file_size = fs::metadata(&path)?.len();
        Ok(FlowInfo {
            summary,
            flow,
            file_size,
        })
    }

    /// Copy a flow under a new name (default `<name> - copy`), with fresh
    /// timestamps
    pub fn duplicate_flow(
        &self,
        file_name: &str,
        new_name: Option<&str>,
    ) -> Result<PathBuf, FlowError> {
        let mut flow = self.load_flow(file_name)?;
        flow.flow_name = match new_name {
            Some(name) => name.to_string(),
            None => format!("{} - copy", flow.flow_name),
        };
        flow.created_at = None;
        flow.updated_at = None;
        self.save_flow(&mut flow, None)
    }

    /// Copy a stored flow out of the store verbatim
    pub fn export_flow(&self, file_name: &str, export_path: &Path) -> Result<(), FlowError> {
        let source = self.resolve(file_name);
        if !source.exists() {
            return Err(FlowError::FileNotFound(source));
        }
        fs::copy(&source, export_path)?;
        Ok(())
    }

    /// Bring an external flow file into the store (re-validated, re-saved)
    pub fn import_flow(
        &self,
        import_path: &Path,
        new_name: Option<&str>,
    ) -> Result<PathBuf, FlowError> {
        let mut flow = parser::parse_from_file(import_path)?;
        if let Some(name) = new_name {
            flow.flow_name = name.to_string();
        }
        self.save_flow(&mut flow, None)
    }

    fn resolve(&self, file_name: &str) -> PathBuf {
        let path = Path::new(file_name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.flows_dir.join(file_name)
        }
    }

    fn summarize(&self, path: &Path) -> Result<FlowSummary, FlowError> {
        let flow = parser::parse_from_file(path)?;
        let metadata = fs::metadata(path)?;
        let modified_time = metadata
            .modified()
            .map(DateTime::<Local>::from)
            .unwrap_or_else(|_| Local::now());

        Ok(FlowSummary {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_path: path.to_path_buf(),
            flow_name: flow.flow_name.clone(),
            description: flow.description.clone(),
            browser: flow.browser,
            steps_count: flow.steps.len(),
            created_at: flow.created_at.clone(),
            updated_at: flow.updated_at.clone(),
            modified_time,
        })
    }
}

/// Sanitize a flow name into a file stem: drop anything outside
/// alphanumerics, space, dash, underscore, then join spaces with `_`
fn safe_stem(flow_name: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(flow_name, "");
    let stem = cleaned.trim().replace(' ', "_");
    if stem.is_empty() {
        "unnamed_flow".to_string()
    } else {
        stem
    }
}
