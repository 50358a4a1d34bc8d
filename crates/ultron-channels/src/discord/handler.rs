use std::sync::{Arc, RwLock};

use serenity::all::{self as serenity_model, Context, EventHandler, Message as SerenityMessage, Ready};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::traits::{ChannelEvent, ChannelStatus};

use super::convert;

/// Serenity event handler that bridges Discord events into `ChannelEvent`s.
pub struct DiscordHandler {
    /// Broadcast sender for emitting channel events to subscribers.
    event_tx: broadcast::Sender<ChannelEvent>,

    /// Connection status shared with the owning `DiscordChannel`.
    status: Arc<RwLock<ChannelStatus>>,
}

impl DiscordHandler {
    pub fn new(event_tx: broadcast::Sender<ChannelEvent>, status: Arc<RwLock<ChannelStatus>>) -> Self {
        Self { event_tx, status }
    }

    fn emit(&self, event: ChannelEvent) {
        if let ChannelEvent::StatusChanged(status) = &event {
            set_status(&self.status, status.clone());
        }
        if let Err(e) = self.event_tx.send(event) {
            warn!("no subscribers for channel event: {e}");
        }
    }
}

pub(super) fn set_status(cell: &RwLock<ChannelStatus>, status: ChannelStatus) {
    let mut guard = match cell.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = status;
}

#[serenity::async_trait]
impl EventHandler for DiscordHandler {
    /// Fired when the bot successfully connects and is ready.
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            "Discord bot connected as {} (guilds: {})",
            ready.user.tag(),
            ready.guilds.len()
        );
        self.emit(ChannelEvent::StatusChanged(ChannelStatus::Connected));
    }

    /// Fired when the bot resumes a previously interrupted gateway connection.
    async fn resume(&self, _ctx: Context, _: serenity_model::ResumedEvent) {
        info!("Discord gateway connection resumed");
        self.emit(ChannelEvent::StatusChanged(ChannelStatus::Connected));
    }

    /// Fired when a message is received in any channel the bot can see.
    ///
    /// Bot-authored messages are forwarded too; the orchestrator decides
    /// what to ignore.
    async fn message(&self, _ctx: Context, msg: SerenityMessage) {
        tracing::debug!(
            message_id = %msg.id,
            author = %msg.author.name,
            channel = %msg.channel_id,
            "received discord message"
        );

        self.emit(ChannelEvent::MessageReceived(
            convert::discord_message_to_inbound(&msg),
        ));
    }
}
