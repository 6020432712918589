// Shared prompt fragments.
// Each module that talks to the text capability defines its own prompts.rs alongside it.
// This file contains cross-cutting fragments only.

/// Appended to every prompt whose answer is parsed as JSON.
pub const JSON_ONLY_INSTRUCTION: &str = "Return ONLY a valid JSON object. \
    Do NOT include any text outside the JSON object. \
    Do NOT include explanations or apologies.";
