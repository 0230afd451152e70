//! Conversation-level records: one [`ConversationMessage`] per turn, and the
//! snapshots/updates the query interface returns.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::trajectory::Trajectory;

/// One full conversational turn: the user's prompt and, once processing
/// completes, exactly one of the agent's answer or an error.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationMessage {
    pub id: Uuid,
    pub user_message: String,
    pub user_timestamp: DateTime<Utc>,
    pub agent_message: Option<String>,
    pub agent_timestamp: Option<DateTime<Utc>>,
    pub tools_used: Vec<String>,
    pub processing_time_ms: Option<i64>,
    pub error: Option<String>,
}

impl ConversationMessage {
    pub fn new(user_message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_message,
            user_timestamp: Utc::now(),
            agent_message: None,
            agent_timestamp: None,
            tools_used: Vec::new(),
            processing_time_ms: None,
            error: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.agent_message.is_some() || self.error.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub(crate) fn complete_with_answer(&mut self, answer: String, tools_used: Vec<String>) {
        let now = Utc::now();
        self.processing_time_ms = Some((now - self.user_timestamp).num_milliseconds());
        self.agent_message = Some(answer);
        self.agent_timestamp = Some(now);
        self.tools_used = tools_used;
    }

    pub(crate) fn complete_with_error(&mut self, error: String) {
        let now = Utc::now();
        self.processing_time_ms = Some((now - self.user_timestamp).num_milliseconds());
        self.error = Some(error);
        self.agent_timestamp = Some(now);
    }
}

/// The workflow's full in-memory state.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub messages: Vec<ConversationMessage>,
    pub current_message_id: Option<Uuid>,
    pub is_processing: bool,
    pub chat_ended: bool,
    pub current_trajectory: Option<Trajectory>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            current_message_id: None,
            is_processing: false,
            chat_ended: false,
            current_trajectory: None,
        }
    }

    pub fn snapshot(&self) -> ConversationStateSnapshot {
        ConversationStateSnapshot {
            messages: self.messages.clone(),
            is_processing: self.is_processing,
            current_message_id: self.current_message_id,
            chat_ended: self.chat_ended,
        }
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Returned by [`crate::workflow::ConversationHandle::full_state`].
#[derive(Debug, Clone, Serialize)]
pub struct ConversationStateSnapshot {
    pub messages: Vec<ConversationMessage>,
    pub is_processing: bool,
    pub current_message_id: Option<Uuid>,
    pub chat_ended: bool,
}

/// Returned by [`crate::workflow::ConversationHandle::incremental_updates`].
#[derive(Debug, Clone, Serialize)]
pub struct ConversationUpdate {
    pub new_messages: Vec<ConversationMessage>,
    pub updated_messages: Vec<ConversationMessage>,
    pub is_processing: bool,
    pub current_message_id: Option<Uuid>,
    pub last_seen_message_id: Option<Uuid>,
}

/// Computes a [`ConversationUpdate`] from `state` as of now: messages after
/// `last_seen_message_id` are new, and the located message itself is
/// reported again under `updated_messages` once it completes. An unknown or
/// absent `last_seen_message_id` is treated as "nothing seen yet", so the
/// full history comes back as `new_messages`.
pub fn incremental_updates(state: &ConversationState, last_seen_message_id: Option<Uuid>) -> ConversationUpdate {
    let last_seen_message_id_out = state.messages.last().map(|m| m.id);

    let position = last_seen_message_id.and_then(|id| state.messages.iter().position(|m| m.id == id));

    let (new_messages, updated_messages) = match position {
        None => (state.messages.clone(), Vec::new()),
        Some(idx) => {
            let new_messages = state.messages[idx + 1..].to_vec();
            let located = &state.messages[idx];
            let updated_messages = if located.is_complete() { vec![located.clone()] } else { Vec::new() };
            (new_messages, updated_messages)
        }
    };

    ConversationUpdate {
        new_messages,
        updated_messages,
        is_processing: state.is_processing,
        current_message_id: state.current_message_id,
        last_seen_message_id: last_seen_message_id_out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_completion_is_mutually_exclusive() {
        let mut msg = ConversationMessage::new("hi".to_string());
        assert!(!msg.is_complete());
        msg.complete_with_answer("hello".to_string(), vec![]);
        assert!(msg.is_complete());
        assert!(!msg.is_error());
    }

    #[test]
    fn incremental_updates_null_returns_full_history() {
        let mut state = ConversationState::new();
        state.messages.push(ConversationMessage::new("a".to_string()));
        state.messages.push(ConversationMessage::new("b".to_string()));

        let update = incremental_updates(&state, None);
        assert_eq!(update.new_messages.len(), 2);
        assert!(update.updated_messages.is_empty());
        assert_eq!(update.last_seen_message_id, Some(state.messages[1].id));
    }

    #[test]
    fn incremental_updates_after_seen_id_returns_tail_and_completion() {
        let mut state = ConversationState::new();
        let mut first = ConversationMessage::new("a".to_string());
        first.complete_with_answer("done".to_string(), vec![]);
        let seen_id = first.id;
        state.messages.push(first);
        state.messages.push(ConversationMessage::new("b".to_string()));

        let update = incremental_updates(&state, Some(seen_id));
        assert_eq!(update.new_messages.len(), 1);
        assert_eq!(update.updated_messages.len(), 1);
        assert_eq!(update.updated_messages[0].id, seen_id);
    }

    #[test]
    fn incremental_updates_unknown_id_treated_as_null() {
        let mut state = ConversationState::new();
        state.messages.push(ConversationMessage::new("a".to_string()));
        let update = incremental_updates(&state, Some(Uuid::new_v4()));
        assert_eq!(update.new_messages.len(), 1);
        assert!(update.updated_messages.is_empty());
    }

    #[test]
    fn repeated_poll_with_latest_seen_id_returns_nothing_new() {
        let mut state = ConversationState::new();
        state.messages.push(ConversationMessage::new("a".to_string()));
        let first = incremental_updates(&state, None);
        let second = incremental_updates(&state, first.last_seen_message_id);
        assert!(second.new_messages.is_empty());
    }
}
