//! Model context bound to a runtime slot
//!
//! The system prompt of the slot's agent plus optional extra instructions
//! (the board snapshot). A slot holds exactly one binding at a time.

use serde::{Deserialize, Serialize};

/// System prompt and instructions sent with every turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelContext {
    /// Agent system prompt
    pub system: String,
    /// Additional instructions appended after the system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl ModelContext {
    /// Create a context from a system prompt
    #[must_use]
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            instructions: None,
        }
    }

    /// Attach additional instructions
    #[must_use]
    pub fn with_instructions(mut self, instructions: Option<String>) -> Self {
        self.instructions = instructions;
        self
    }

    /// Final system text, `None` when both parts are blank
    #[must_use]
    pub fn compose(&self) -> Option<String> {
        let parts: Vec<&str> = [Some(self.system.as_str()), self.instructions.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose() {
        assert_eq!(ModelContext::default().compose(), None);
        assert_eq!(
            ModelContext::new("You are a clinic assistant.").compose().as_deref(),
            Some("You are a clinic assistant.")
        );

        let ctx = ModelContext::new("  ").with_instructions(Some("Board: 2 cards".into()));
        assert_eq!(ctx.compose().as_deref(), Some("Board: 2 cards"));

        let ctx = ModelContext::new("System").with_instructions(Some("Board".into()));
        assert_eq!(ctx.compose().as_deref(), Some("System\n\nBoard"));
    }
}
