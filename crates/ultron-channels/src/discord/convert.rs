use chrono::Utc;
use serenity::all as serenity_model;
use ultron_common::{ChannelId, InboundMessage, UserId};

/// Discord rejects messages longer than this many characters.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Convert a serenity Discord message into an [`InboundMessage`].
pub fn discord_message_to_inbound(msg: &serenity_model::Message) -> InboundMessage {
    InboundMessage {
        id: msg.id.to_string(),
        channel_id: ChannelId::from_string(msg.channel_id.to_string()),
        author_id: UserId::from_string(msg.author.id.to_string()),
        author_name: msg.author.name.clone(),
        author_is_bot: msg.author.bot,
        content: msg.content.clone(),
        timestamp: Utc::now(),
    }
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Prefers breaking at the last newline, then the last space, inside each
/// window; falls back to a hard cut.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.chars().count() > max_chars {
        let window_end = remaining
            .char_indices()
            .nth(max_chars)
            .map_or(remaining.len(), |(idx, _)| idx);
        let window = &remaining[..window_end];

        let separator = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&idx| idx > 0);

        match separator {
            // Both separators are one byte; only the separator is dropped so
            // indentation on the next line survives.
            Some(idx) => {
                chunks.push(remaining[..idx].to_string());
                remaining = &remaining[idx + 1..];
            }
            None => {
                chunks.push(remaining[..window_end].to_string());
                remaining = &remaining[window_end..];
            }
        }
    }

    if !remaining.is_empty() || chunks.is_empty() {
        chunks.push(remaining.to_string());
    }

    chunks
}
