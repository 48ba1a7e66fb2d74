//! Typed action set
//!
//! The closed set of supported step actions. [`Action::from_step`] lowers a
//! raw [`Step`] into a typed variant so script emission is an exhaustive
//! match — adding an action without a directive template is a compile error.

use crate::flow::Step;

/// Default timeout handed to the visibility wait when a step omits one
pub const DEFAULT_VISIBILITY_TIMEOUT: &str = "10s";

/// Why a raw step could not be lowered into a typed action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LowerError {
    UnknownAction { action: String },
    MissingParam { action: String, param: String },
}

/// One supported automation action with its required params
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    OpenBrowser {
        url: String,
    },
    CloseBrowser,
    Click {
        locator: String,
    },
    InputText {
        locator: String,
        text: String,
    },
    /// Covers both the `get_text` and `get_element_text` tags
    GetText {
        locator: String,
    },
    GetAttribute {
        locator: String,
        attribute: String,
    },
    Wait {
        seconds: String,
    },
    WaitUntilElementVisible {
        locator: String,
        timeout: String,
    },
    Screenshot {
        filename: String,
    },
    ScrollToElement {
        locator: String,
    },
    SelectFromList {
        locator: String,
        value: String,
    },
    ExecuteJavascript {
        script: String,
    },
    Search {
        search_box_locator: String,
        search_text: String,
        search_button_locator: String,
    },
}

impl Action {
    /// Lower a raw step into a typed action.
    ///
    /// Stricter than [`crate::validate`]: the validator's required-param
    /// table has no entry for `execute_javascript`, so a step missing its
    /// `script` can reach the compiler and takes the degradation path there.
    pub fn from_step(step: &Step) -> Result<Self, LowerError> {
        let want = |param: &str| -> Result<String, LowerError> {
            step.param_str(param).ok_or_else(|| LowerError::MissingParam {
                action: step.action.clone(),
                param: param.to_string(),
            })
        };

        let action = match step.action.as_str() {
            "open_browser" => Action::OpenBrowser { url: want("url")? },
            "close_browser" => Action::CloseBrowser,
            "click" => Action::Click {
                locator: want("locator")?,
            },
            "input_text" => Action::InputText {
                locator: want("locator")?,
                text: want("text")?,
            },
            "get_text" | "get_element_text" => Action::GetText {
                locator: want("locator")?,
            },
            "get_attribute" => Action::GetAttribute {
                locator: want("locator")?,
                attribute: want("attribute")?,
            },
            "wait" => Action::Wait {
                seconds: want("seconds")?,
            },
            "wait_until_element_visible" => Action::WaitUntilElementVisible {
                locator: want("locator")?,
                timeout: step
                    .param_str("timeout")
                    .unwrap_or_else(|| DEFAULT_VISIBILITY_TIMEOUT.to_string()),
            },
            "screenshot" => Action::Screenshot {
                filename: want("filename")?,
            },
            "scroll_to_element" => Action::ScrollToElement {
                locator: want("locator")?,
            },
            "select_from_list" => Action::SelectFromList {
                locator: want("locator")?,
                value: want("value")?,
            },
            "execute_javascript" => Action::ExecuteJavascript {
                script: want("script")?,
            },
            "search" => Action::Search {
                search_box_locator: want("search_box_locator")?,
                search_text: want("search_text")?,
                search_button_locator: want("search_button_locator")?,
            },
            other => {
                return Err(LowerError::UnknownAction {
                    action: other.to_string(),
                })
            }
        };

        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowers_click() {
        let step = Step::new("click").with_param("locator", "id=go");
        assert_eq!(
            Action::from_step(&step).unwrap(),
            Action::Click {
                locator: "id=go".into()
            }
        );
    }

    #[test]
    fn get_element_text_maps_to_get_text() {
        let step = Step::new("get_element_text").with_param("locator", "id=msg");
        assert!(matches!(
            Action::from_step(&step).unwrap(),
            Action::GetText { .. }
        ));
    }

    #[test]
    fn visibility_wait_defaults_timeout() {
        let step = Step::new("wait_until_element_visible").with_param("locator", "id=x");
        assert_eq!(
            Action::from_step(&step).unwrap(),
            Action::WaitUntilElementVisible {
                locator: "id=x".into(),
                timeout: "10s".into()
            }
        );
    }

    #[test]
    fn unknown_action_is_rejected() {
        let step = Step::new("teleport");
        assert_eq!(
            Action::from_step(&step),
            Err(LowerError::UnknownAction {
                action: "teleport".into()
            })
        );
    }

    #[test]
    fn execute_javascript_requires_script_at_lowering() {
        let step = Step::new("execute_javascript");
        assert_eq!(
            Action::from_step(&step),
            Err(LowerError::MissingParam {
                action: "execute_javascript".into(),
                param: "script".into()
            })
        );
    }
}
