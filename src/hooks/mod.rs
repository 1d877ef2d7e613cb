//! Hook input from the coding assistant.
//!
//! The assistant runs the hook once per tool call and writes a JSON event
//! to stdin. Only `PostToolUse` events for file-editing tools lead to a
//! validation; everything else is ignored.

mod post_tool_use;

pub use post_tool_use::{edited_file, EDIT_TOOLS};

use crate::error::Result;
use serde::Deserialize;

/// Input provided to hooks by the assistant.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct HookInput {
    /// The hook event, e.g. `PostToolUse`.
    #[serde(default)]
    pub hook_event_name: Option<String>,
    /// The tool that ran.
    #[serde(default)]
    pub tool_name: Option<String>,
    /// The tool's arguments.
    #[serde(default)]
    pub tool_input: Option<ToolInput>,
    /// The session's working directory.
    #[serde(default)]
    pub cwd: Option<String>,
}

/// Tool arguments relevant to validation.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ToolInput {
    /// The file written or edited (`Edit`, `MultiEdit`, `Write`).
    #[serde(default)]
    pub file_path: Option<String>,
    /// The notebook edited (`NotebookEdit`).
    #[serde(default)]
    pub notebook_path: Option<String>,
}

/// Parse hook input from JSON. Empty input yields the default, which is ignored.
///
/// # Errors
///
/// Returns an error if the JSON is invalid.
pub fn parse_hook_input(json: &str) -> Result<HookInput> {
    if json.trim().is_empty() {
        return Ok(HookInput::default());
    }
    Ok(serde_json::from_str(json)?)
}
