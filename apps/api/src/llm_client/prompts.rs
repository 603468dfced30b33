// Shared prompt constants.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction appended to every prompt that reads client narratives.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    CRITICAL: Use ONLY facts stated in the client narrative. \
    Do NOT infer, estimate or invent amounts, coverages or decisions. \
    When the narrative does not state something, say it is unknown.";
