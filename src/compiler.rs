//! Step → script compilation
//!
//! Translates a validated flow into the textual test suite the automation
//! engine runs. One directive per step, in declaration order. The compiler
//! never mutates its input and is not the validation boundary: a step it
//! cannot map (possible for actions the validator's param table does not
//! cover) becomes a `Log` diagnostic directive plus a warning event.
//!
//! Script destinations are named `flow_{YYYYMMDD_HHMMSS}.robot` from the
//! local wall clock at second resolution. Two compilations within the same
//! second collide and the later write wins; known limitation, kept.

use std::path::PathBuf;

use chrono::Local;
use tracing::warn;

use crate::action::{Action, LowerError};
use crate::flow::Flow;
use crate::status::{StatusChannel, StatusKind};

/// A compiled script and where it should be written
#[derive(Debug, Clone)]
pub struct CompiledScript {
    pub text: String,
    pub path: PathBuf,
}

/// Flow → engine-script compiler
#[derive(Debug, Clone)]
pub struct Compiler {
    output_dir: PathBuf,
    resource_path: PathBuf,
}

impl Compiler {
    pub fn new(output_dir: impl Into<PathBuf>, resource_path: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            resource_path: resource_path.into(),
        }
    }

    /// Compile a flow into script text and a timestamped destination path.
    pub fn compile(&self, flow: &Flow, status: &StatusChannel) -> CompiledScript {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self.output_dir.join(format!("flow_{timestamp}.robot"));

        CompiledScript {
            text: self.build_script(flow, status),
            path,
        }
    }

    fn build_script(&self, flow: &Flow, status: &StatusChannel) -> String {
        // The engine prefers forward slashes in resource references,
        // including on Windows
        let resource = self.resource_path.display().to_string().replace('\\', "/");

        let mut lines = vec![
            "*** Settings ***".to_string(),
            format!("Documentation     {}", flow.flow_name),
            "Library           SeleniumLibrary".to_string(),
            format!("Resource          {resource}"),
            "Suite Teardown    Close All Browsers".to_string(),
            String::new(),
            "*** Variables ***".to_string(),
            format!("${{BROWSER}}        {}", flow.browser.as_str()),
            String::new(),
            "*** Test Cases ***".to_string(),
            flow.flow_name.clone(),
            "    [Documentation]    Automated flow execution".to_string(),
        ];

        // 1-based step numbering drives the ${result_N} capture variables
        for (idx, step) in flow.steps.iter().enumerate() {
            let num = idx + 1;
            let directive = match Action::from_step(step) {
                Ok(action) => directive_for(&action, num),
                Err(err) => {
                    let diagnostic = degrade(&err, num);
                    let detail = match &err {
                        LowerError::UnknownAction { action } => {
                            format!("step {num}: action '{action}' is not implemented")
                        }
                        LowerError::MissingParam { action, param } => {
                            format!("step {num}: action '{action}' is missing param '{param}'")
                        }
                    };
                    warn!(step = num, "unmappable step: {detail}");
                    status.emit(StatusKind::Warning, detail);
                    diagnostic
                }
            };
            lines.push(format!("    {directive}"));
        }

        lines.join("\n")
    }
}

/// Exhaustive per-action directive templates. Text, locators and script
/// bodies pass through verbatim; expansion is the engine's responsibility.
fn directive_for(action: &Action, num: usize) -> String {
    match action {
        Action::OpenBrowser { url } => {
            format!("Open Flow Browser    {url}    ${{BROWSER}}")
        }
        Action::CloseBrowser => "Close Browser".to_string(),
        Action::Click { locator } => format!("Safe Click Element    {locator}"),
        Action::InputText { locator, text } => {
            format!("Smart Input Text    {locator}    {text}")
        }
        Action::GetText { locator } => {
            format!("${{result_{num}}}=    Extract Element Text    {locator}")
        }
        Action::GetAttribute { locator, attribute } => {
            format!("${{result_{num}}}=    Extract Element Attribute    {locator}    {attribute}")
        }
        Action::Wait { seconds } => format!("Sleep    {seconds}s"),
        Action::WaitUntilElementVisible { locator, timeout } => {
            format!("Wait Until Element Is Visible    {locator}    {timeout}")
        }
        Action::Screenshot { filename } => format!("Capture Flow Screenshot    {filename}"),
        Action::ScrollToElement { locator } => {
            format!("Scroll To Target Element    {locator}")
        }
        Action::SelectFromList { locator, value } => {
            format!("Select From Dropdown    {locator}    {value}")
        }
        Action::ExecuteJavascript { script } => {
            format!("${{result_{num}}}=    Execute Javascript And Get Result    {script}")
        }
        Action::Search {
            search_box_locator,
            search_text,
            search_button_locator,
        } => {
            format!("Perform Search    {search_box_locator}    {search_text}    {search_button_locator}")
        }
    }
}

/// Diagnostic no-op directive for a step the compiler could not map
fn degrade(err: &LowerError, num: usize) -> String {
    match err {
        LowerError::UnknownAction { action } => {
            format!("Log    Unimplemented action: {action}")
        }
        LowerError::MissingParam { param, .. } => {
            format!("Log    Step {num} misconfigured: missing param {param}")
        }
    }
}

/// Timestamped artifact stem for one engine invocation
/// (`output_{YYYYMMDD_HHMMSS}`); same second-resolution collision caveat as
/// script naming.
pub fn output_stem() -> String {
    format!("output_{}", Local::now().format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::Step;

    fn compiler() -> Compiler {
        Compiler::new("logs", "resources/keywords.robot")
    }

    fn demo_flow() -> Flow {
        Flow {
            steps: vec![
                Step::new("open_browser").with_param("url", "https://example.com"),
                Step::new("click").with_param("locator", "id=go"),
                Step::new("wait").with_param("seconds", 2),
            ],
            ..Flow::empty("Demo")
        }
    }

    fn directive_lines(text: &str) -> Vec<&str> {
        text.lines()
            .skip_while(|l| *l != "*** Test Cases ***")
            .skip(3) // section header, test name, [Documentation]
            .map(|l| l.trim())
            .collect()
    }

    #[test]
    fn one_directive_per_step_in_order() {
        let status = StatusChannel::new();
        let script = compiler().compile(&demo_flow(), &status);

        let directives = directive_lines(&script.text);
        assert_eq!(
            directives,
            vec![
                "Open Flow Browser    https://example.com    ${BROWSER}",
                "Safe Click Element    id=go",
                "Sleep    2s",
            ]
        );
        assert!(status.events().is_empty());
    }

    #[test]
    fn header_declares_engine_integration() {
        let status = StatusChannel::new();
        let script = compiler().compile(&demo_flow(), &status);

        assert!(script.text.contains("Library           SeleniumLibrary"));
        assert!(script.text.contains("Resource          resources/keywords.robot"));
        assert!(script.text.contains("Suite Teardown    Close All Browsers"));
        assert!(script.text.contains("${BROWSER}        chrome"));
    }

    #[test]
    fn destination_is_timestamped_robot_file() {
        let status = StatusChannel::new();
        let script = compiler().compile(&demo_flow(), &status);

        let name = script.path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("flow_"));
        assert!(name.ends_with(".robot"));
        // flow_YYYYMMDD_HHMMSS.robot
        assert_eq!(name.len(), "flow_00000000_000000.robot".len());
    }

    #[test]
    fn capture_variables_use_one_based_position() {
        let flow = Flow {
            steps: vec![
                Step::new("open_browser").with_param("url", "https://example.com"),
                Step::new("get_text").with_param("locator", "id=msg"),
                Step::new("get_attribute")
                    .with_param("locator", "id=link")
                    .with_param("attribute", "href"),
            ],
            ..Flow::empty("Capture")
        };

        let status = StatusChannel::new();
        let script = compiler().compile(&flow, &status);
        assert!(script
            .text
            .contains("${result_2}=    Extract Element Text    id=msg"));
        assert!(script
            .text
            .contains("${result_3}=    Extract Element Attribute    id=link    href"));
    }

    #[test]
    fn visibility_wait_uses_explicit_timeout() {
        let flow = Flow {
            steps: vec![Step::new("wait_until_element_visible")
                .with_param("locator", "id=x")
                .with_param("timeout", "30s")],
            ..Flow::empty("Waits")
        };
        let status = StatusChannel::new();
        let script = compiler().compile(&flow, &status);
        assert!(script
            .text
            .contains("Wait Until Element Is Visible    id=x    30s"));
    }

    #[test]
    fn unmappable_step_degrades_to_log_directive_with_warning() {
        // execute_javascript has no validator entry, so a script-less step
        // legitimately reaches the compiler
        let flow = Flow {
            steps: vec![Step::new("execute_javascript")],
            ..Flow::empty("Degrade")
        };

        let status = StatusChannel::new();
        let script = compiler().compile(&flow, &status);

        assert!(script
            .text
            .contains("Log    Step 1 misconfigured: missing param script"));
        let warnings = status.filter_kind(StatusKind::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("script"));
    }
}
