//! Flow validation
//!
//! Structural and per-action checks, applied in declaration order with the
//! first failure winning. Steps are validated independently; no cross-step
//! rules (execution order is exactly declaration order).

use crate::error::ValidationError;
use crate::flow::{Flow, Step};

/// The closed action set, in documentation order
pub const SUPPORTED_ACTIONS: &[&str] = &[
    "open_browser",
    "close_browser",
    "click",
    "input_text",
    "get_text",
    "get_element_text",
    "get_attribute",
    "wait",
    "wait_until_element_visible",
    "screenshot",
    "scroll_to_element",
    "select_from_list",
    "execute_javascript",
    "search",
];

/// Required params per action. Actions without an entry (`close_browser`,
/// `execute_javascript`) accept any param set here; the compiler degrades
/// gracefully if one of them is still unmappable.
fn required_params(action: &str) -> &'static [&'static str] {
    match action {
        "open_browser" => &["url"],
        "click" => &["locator"],
        "input_text" => &["locator", "text"],
        "get_text" => &["locator"],
        "get_element_text" => &["locator"],
        "get_attribute" => &["locator", "attribute"],
        "wait" => &["seconds"],
        "wait_until_element_visible" => &["locator"],
        "screenshot" => &["filename"],
        "scroll_to_element" => &["locator"],
        "select_from_list" => &["locator", "value"],
        "search" => &["search_box_locator", "search_text", "search_button_locator"],
        _ => &[],
    }
}

/// Validate a flow. First failure wins.
pub fn validate(flow: &Flow) -> Result<(), ValidationError> {
    for (idx, step) in flow.steps.iter().enumerate() {
        validate_step(step, idx)?;
    }
    Ok(())
}

fn validate_step(step: &Step, idx: usize) -> Result<(), ValidationError> {
    if !SUPPORTED_ACTIONS.contains(&step.action.as_str()) {
        return Err(ValidationError::UnknownAction {
            step: idx,
            action: step.action.clone(),
        });
    }

    for param in required_params(&step.action) {
        if !step.has_param(param) {
            return Err(ValidationError::MissingActionParam {
                step: idx,
                action: step.action.clone(),
                param: (*param).to_string(),
            });
        }
    }

    Ok(())
}
