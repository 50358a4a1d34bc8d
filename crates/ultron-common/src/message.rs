use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, UserId};

/// A chat message delivered by a channel adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub author_name: String,
    pub author_is_bot: bool,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    pub fn text(
        id: impl Into<String>,
        channel_id: ChannelId,
        author_id: UserId,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            channel_id,
            author_id,
            author_name: String::new(),
            author_is_bot: false,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Mark the author as a bot account.
    pub fn from_bot(mut self) -> Self {
        self.author_is_bot = true;
        self
    }
}
