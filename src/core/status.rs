use crate::api::StatusEvent;

pub const STATUS_SENDING: &str = "Sending request";
pub const STATUS_DONE: &str = "Done";
pub const STATUS_NO_RESPONSE: &str = "No response";
pub const STATUS_FAILED: &str = "Failed";

/// Progress indicator text for a pipeline status event.
pub fn progress_text(event: &StatusEvent) -> String {
    match event.stage.as_str() {
        "route" => "Deciding tool usage".to_string(),
        "llm" => "Generating answer".to_string(),
        "rag" if event.used => format!("RAG search complete (hits {})", event.hits),
        "rag" => "RAG skipped".to_string(),
        "mcp" if event.invoked => {
            let ops = if event.ops.is_empty() {
                "none".to_string()
            } else {
                event.ops.join(", ")
            };
            format!("MCP analysis ({ops})")
        }
        "mcp" => "MCP skipped".to_string(),
        _ => "Processing".to_string(),
    }
}
