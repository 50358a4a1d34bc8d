use std::collections::VecDeque;

use dashmap::DashMap;
use ultron_agents::{ChatMessage, ChatRole};
use ultron_common::ChannelId;

/// Who produced a stored conversation turn. The system prompt is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRole {
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEntry {
    pub role: EntryRole,
    pub content: String,
    pub tool_name: Option<String>,
}

impl ConversationEntry {
    pub fn new(role: EntryRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_name: None,
        }
    }

    /// Render as a completion message.
    ///
    /// A stored tool turn has no call id to pair with, so it is replayed as
    /// assistant-side context text.
    pub fn to_chat_message(&self) -> ChatMessage {
        match self.role {
            EntryRole::User => ChatMessage::text(ChatRole::User, self.content.clone()),
            EntryRole::Assistant => ChatMessage::text(ChatRole::Assistant, self.content.clone()),
            EntryRole::Tool => ChatMessage::text(
                ChatRole::Assistant,
                format!(
                    "[{} result] {}",
                    self.tool_name.as_deref().unwrap_or("tool"),
                    self.content
                ),
            ),
        }
    }
}

/// Per-channel sliding window of recent conversation turns.
pub struct ConversationStore {
    max_messages: usize,
    channels: DashMap<ChannelId, VecDeque<ConversationEntry>>,
}

impl ConversationStore {
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages: max_messages.max(1),
            channels: DashMap::new(),
        }
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Snapshot of the channel's window, oldest first. Creates the window if needed.
    pub fn get_history(&self, channel_id: &ChannelId) -> Vec<ConversationEntry> {
        self.channels
            .entry(channel_id.clone())
            .or_default()
            .iter()
            .cloned()
            .collect()
    }

    /// Push a turn, evicting the oldest one when the window overflows.
    pub fn append(&self, channel_id: &ChannelId, role: EntryRole, content: impl Into<String>) {
        let mut window = self.channels.entry(channel_id.clone()).or_default();
        window.push_back(ConversationEntry::new(role, content));
        if window.len() > self.max_messages {
            window.pop_front();
        }
    }

    pub fn len(&self, channel_id: &ChannelId) -> usize {
        self.channels.get(channel_id).map_or(0, |w| w.len())
    }

    pub fn is_empty(&self, channel_id: &ChannelId) -> bool {
        self.len(channel_id) == 0
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
