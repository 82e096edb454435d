//! The fixed system directive sent with every streaming exchange.

// Persona text loaded at compile time
pub const ASSISTANT_PROMPT: &str = include_str!("prompts/assistant.txt");

/// Build the per-exchange system directive: the fixed persona template
/// augmented with the user's display name. Not configurable per call.
#[must_use]
pub fn system_directive(display_name: &str) -> String {
    format!(
        "{} The user's name is \"{display_name}\".",
        ASSISTANT_PROMPT.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_embeds_the_display_name() {
        let directive = system_directive("Lan");
        assert!(directive.contains("StudyWithMe AI"));
        assert!(directive.ends_with("The user's name is \"Lan\"."));
    }
}
