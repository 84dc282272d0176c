// Shared prompt fragments. Each AI feature keeps its own templates in `ai::prompts`.

/// Appended to every system prompt; the API is called in `json_object` mode.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with a single valid JSON object. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Builds a system prompt from a persona line plus the JSON-only instruction.
pub fn system_prompt(persona: &str) -> String {
    format!("{persona} {JSON_ONLY_INSTRUCTION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_appends_json_rule() {
        let prompt = system_prompt("You are an HR expert.");
        assert!(prompt.starts_with("You are an HR expert."));
        assert!(prompt.ends_with("markdown code fences."));
    }
}
