//! Workspace initialization
//!
//! Creates the flows/logs/resources directory structure, the shared keyword
//! resource the compiled scripts reference, and a sample flow.

use anyhow::Result;
use std::fs;
use std::path::Path;

/// Initialize a flowpilot workspace at `path`
pub fn init_workspace(path: &Path) -> Result<InitResult> {
    let flows_dir = path.join("flows");
    let logs_dir = path.join("logs");
    let resources_dir = path.join("resources");

    let resource_file = resources_dir.join("keywords.robot");
    if resource_file.exists() {
        anyhow::bail!("workspace already initialized (resources/keywords.robot exists)");
    }

    fs::create_dir_all(&flows_dir)?;
    fs::create_dir_all(&logs_dir)?;
    fs::create_dir_all(&resources_dir)?;

    fs::write(&resource_file, KEYWORDS_TEMPLATE)?;

    let sample_flow = flows_dir.join("sample_flow.json");
    fs::write(&sample_flow, SAMPLE_FLOW_TEMPLATE)?;

    Ok(InitResult {
        workspace_dir: path.display().to_string(),
        files_created: vec![
            "flows/".to_string(),
            "logs/".to_string(),
            "resources/keywords.robot".to_string(),
            "flows/sample_flow.json".to_string(),
        ],
    })
}

/// Result of workspace initialization
pub struct InitResult {
    pub workspace_dir: String,
    pub files_created: Vec<String>,
}

/// Shared keywords every compiled script imports. Wraps the raw driver
/// keywords with waits and retries so generated scripts stay one line per
/// step.
const KEYWORDS_TEMPLATE: &str = r#"*** Settings ***
Library           SeleniumLibrary

*** Keywords ***
Open Flow Browser
    [Arguments]    ${url}    ${browser}
    Open Browser    ${url}    ${browser}
    Maximize Browser Window
    Set Selenium Implicit Wait    5s

Safe Click Element
    [Arguments]    ${locator}
    Wait Until Element Is Visible    ${locator}    10s
    Wait Until Element Is Enabled    ${locator}    10s
    Click Element    ${locator}

Smart Input Text
    [Arguments]    ${locator}    ${text}
    Wait Until Element Is Visible    ${locator}    10s
    Clear Element Text    ${locator}
    Input Text    ${locator}    ${text}

Extract Element Text
    [Arguments]    ${locator}
    Wait Until Element Is Visible    ${locator}    10s
    ${text}=    Get Text    ${locator}
    RETURN    ${text}

Extract Element Attribute
    [Arguments]    ${locator}    ${attribute}
    Wait Until Element Is Visible    ${locator}    10s
    ${value}=    Get Element Attribute    ${locator}    ${attribute}
    RETURN    ${value}

Capture Flow Screenshot
    [Arguments]    ${filename}
    Capture Page Screenshot    ${filename}

Scroll To Target Element
    [Arguments]    ${locator}
    Wait Until Page Contains Element    ${locator}    10s
    Scroll Element Into View    ${locator}

Select From Dropdown
    [Arguments]    ${locator}    ${value}
    Wait Until Element Is Visible    ${locator}    10s
    Select From List By Label    ${locator}    ${value}

Execute Javascript And Get Result
    [Arguments]    ${script}
    ${result}=    Execute Javascript    ${script}
    RETURN    ${result}

Perform Search
    [Arguments]    ${search_box}    ${search_text}    ${search_button}
    Smart Input Text    ${search_box}    ${search_text}
    Safe Click Element    ${search_button}
"#;

const SAMPLE_FLOW_TEMPLATE: &str = r#"{
  "flow_name": "Sample Flow",
  "description": "Opens a page, runs a search, captures the result",
  "browser": "chrome",
  "steps": [
    { "action": "open_browser", "url": "https://example.com" },
    { "action": "wait_until_element_visible", "locator": "tag=h1" },
    { "action": "get_text", "locator": "tag=h1" },
    { "action": "screenshot", "filename": "sample.png" },
    { "action": "close_browser" }
  ]
}
"#;
