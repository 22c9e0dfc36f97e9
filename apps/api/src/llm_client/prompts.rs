// Shared prompt fragments.
// Each service that drives an agent defines its own prompts.rs alongside it.
// This file contains cross-cutting fragments.

/// Instruction appended to every agent system prompt that delivers its result through a tool.
/// Replace `{tool_name}` before sending.
pub const TOOL_DELIVERY_INSTRUCTION: &str = "\
    DELIVERY: When the JSON object is complete, call the `{tool_name}` tool exactly once, \
    passing the whole JSON object as the `content` argument. \
    If the tool reports an error, fix the JSON and call it again. \
    Do NOT wrap the JSON in markdown code fences. \
    Do NOT include any text outside the JSON object in `content`.";

/// Fills the delivery instruction for a specific tool.
pub fn tool_delivery_instruction(tool_name: &str) -> String {
    TOOL_DELIVERY_INSTRUCTION.replace("{tool_name}", tool_name)
}
