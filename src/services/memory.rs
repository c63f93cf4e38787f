// src/services/memory.rs
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self { role, text: text.into() }
    }
}

/// Append-only log of one conversation's turns, oldest first.
///
/// Grows without bound for as long as its owner lives; nothing is evicted
/// or summarized.
#[derive(Clone, Debug, Default)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a turn at the end. Returns the new number of turns.
    pub fn append(&mut self, role: Role, text: impl Into<String>) -> usize {
        self.turns.push(Turn::new(role, text));
        self.turns.len()
    }

    /// Owned copy of every turn; later appends are not visible through it.
    pub fn history(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let turn = Turn::new(Role::Assistant, "ok");
        assert_eq!(
            serde_json::to_string(&turn).unwrap(),
            r#"{"role":"assistant","text":"ok"}"#
        );
    }
}
