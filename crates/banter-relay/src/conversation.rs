//! Append-only conversation history with pluggable growth control.

use banter_openai::ChatMessage;

/// Bounds the history as turns accumulate.
///
/// Applied after every append, so the policy sees the history at its
/// largest and decides what to drop.
pub trait GrowthPolicy: Send {
    fn apply(&self, turns: &mut Vec<ChatMessage>);
}

/// Keep every turn for the lifetime of the connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl GrowthPolicy for Unbounded {
    fn apply(&self, _turns: &mut Vec<ChatMessage>) {}
}

/// Keep only the most recent turns, dropping from the front.
#[derive(Debug, Clone, Copy)]
pub struct KeepRecent(pub usize);

impl GrowthPolicy for KeepRecent {
    fn apply(&self, turns: &mut Vec<ChatMessage>) {
        if turns.len() > self.0 {
            let excess = turns.len() - self.0;
            turns.drain(..excess);
        }
    }
}

/// Conversation history sent upstream in full on every turn.
pub struct Conversation {
    turns: Vec<ChatMessage>,
    policy: Box<dyn GrowthPolicy>,
}

impl Conversation {
    /// Empty history that grows without bound.
    pub fn new() -> Self {
        Self::with_policy(Unbounded)
    }

    /// Empty history bounded by the given policy.
    pub fn with_policy(policy: impl GrowthPolicy + 'static) -> Self {
        Self {
            turns: Vec::new(),
            policy: Box::new(policy),
        }
    }

    /// Append the client's question for this turn.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::user(content));
    }

    /// Append the assembled assistant answer for this turn.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::assistant(content));
    }

    fn push(&mut self, message: ChatMessage) {
        self.turns.push(message);
        self.policy.apply(&mut self.turns);
    }

    /// Retained turns, oldest first.
    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
