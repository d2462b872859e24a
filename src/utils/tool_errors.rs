use crate::errors::ToolError;
use crate::utils::suggest::suggest;

/// A manager was asked for a tool it does not serve. Only reachable through
/// a wiring mistake, so it is reported as internal.
pub fn unhandled_tool_error(manager: &str, tool: &str, known_tools: &[&str]) -> ToolError {
    let suggestions = suggest(tool, known_tools, 3);
    let mut err = ToolError::internal(format!("{} manager does not handle tool {}", manager, tool))
        .with_details(serde_json::json!({
            "known_tools": known_tools,
            "did_you_mean": suggestions,
        }));
    if !suggestions.is_empty() {
        err = err.with_hint(format!("Did you mean: {}?", suggestions.join(", ")));
    }
    err
}
