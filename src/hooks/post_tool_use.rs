//! `PostToolUse` events for file edits.

use super::HookInput;
use std::path::{Path, PathBuf};

/// Tools whose completion triggers a validation.
pub const EDIT_TOOLS: &[&str] = &["Edit", "MultiEdit", "Write", "NotebookEdit"];

/// The file an edit event touched, or None if the event is not an edit.
///
/// Relative paths are resolved against the event's `cwd`, falling back to
/// `default_cwd`. A missing event name is accepted, since older assistants
/// omit it.
pub fn edited_file(input: &HookInput, default_cwd: &Path) -> Option<PathBuf> {
    if input.hook_event_name.as_deref().is_some_and(|name| name != "PostToolUse") {
        return None;
    }
    let tool = input.tool_name.as_deref()?;
    if !EDIT_TOOLS.contains(&tool) {
        return None;
    }

    let tool_input = input.tool_input.as_ref()?;
    let raw = if tool == "NotebookEdit" {
        tool_input.notebook_path.as_deref().or(tool_input.file_path.as_deref())
    } else {
        tool_input.file_path.as_deref()
    };
    let raw = raw.filter(|p| !p.trim().is_empty())?;

    let path = Path::new(raw);
    if path.is_absolute() {
        return Some(path.to_path_buf());
    }
    let cwd = input.cwd.as_deref().map_or_else(|| default_cwd.to_path_buf(), PathBuf::from);
    Some(cwd.join(path))
}
