//! Client-held conversation state and its replay form.

use crate::shared::{Role, Turn};

/// Ordered, append-only list of turns for one session. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    turns: Vec<Turn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session with the widget's greeting (an assistant turn, dropped on replay).
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::assistant(greeting)],
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Turns in the form sent to the model gateway.
    pub fn replay(&self) -> Vec<Turn> {
        replay_history(&self.turns)
    }
}

/// Drops leading assistant turns so the replayed history starts with a user turn (or is empty).
pub fn replay_history(turns: &[Turn]) -> Vec<Turn> {
    turns
        .iter()
        .skip_while(|t| t.role == Role::Assistant)
        .cloned()
        .collect()
}
