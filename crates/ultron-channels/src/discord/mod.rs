//! Discord adapter built on serenity.

pub mod config;
pub mod convert;
pub mod handler;

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serenity::all::{ChannelId as DiscordChannelId, CreateMessage, Http, MessageId, ShardManager};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};
use ultron_common::{ChannelId, Error, InboundMessage, Result};

use crate::traits::{ChannelEvent, ChannelLifecycle, ChannelSender, ChannelStatus};

pub use config::DiscordConfig;
use convert::{DISCORD_MESSAGE_LIMIT, split_message};
use handler::{DiscordHandler, set_status};

const EVENT_BUFFER: usize = 256;

/// A Discord bot connection.
pub struct DiscordChannel {
    config: DiscordConfig,
    event_tx: broadcast::Sender<ChannelEvent>,
    status: Arc<RwLock<ChannelStatus>>,
    http: Option<Arc<Http>>,
    shard_manager: Option<Arc<ShardManager>>,
    client_task: Option<JoinHandle<()>>,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            config,
            event_tx,
            status: Arc::new(RwLock::new(ChannelStatus::Disconnected)),
            http: None,
            shard_manager: None,
            client_task: None,
        }
    }
}

#[async_trait]
impl ChannelLifecycle for DiscordChannel {
    async fn connect(&mut self) -> Result<()> {
        set_status(&self.status, ChannelStatus::Connecting);

        let handler = DiscordHandler::new(self.event_tx.clone(), self.status.clone());
        let mut client = serenity::Client::builder(&self.config.bot_token, self.config.intents)
            .event_handler(handler)
            .await
            .map_err(|e| Error::Channel(format!("failed to build discord client: {e}")))?;

        self.http = Some(client.http.clone());
        self.shard_manager = Some(client.shard_manager.clone());

        let event_tx = self.event_tx.clone();
        let status = self.status.clone();
        self.client_task = Some(tokio::spawn(async move {
            // Returns on login failure or when the shards shut down.
            if let Err(e) = client.start().await {
                error!("discord gateway stopped: {e}");
                let failed = ChannelStatus::Error(e.to_string());
                set_status(&status, failed.clone());
                let _ = event_tx.send(ChannelEvent::StatusChanged(failed));
            }
        }));

        info!("discord client started");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(shard_manager) = self.shard_manager.take() {
            shard_manager.shutdown_all().await;
        }
        if let Some(task) = self.client_task.take() {
            let _ = task.await;
        }
        self.http = None;
        set_status(&self.status, ChannelStatus::Disconnected);
        Ok(())
    }

    fn status(&self) -> ChannelStatus {
        match self.status.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.event_tx.subscribe()
    }

    fn create_sender(&self) -> Result<Arc<dyn ChannelSender>> {
        let http = self
            .http
            .clone()
            .ok_or_else(|| Error::Channel("discord is not connected".into()))?;
        Ok(Arc::new(DiscordSender { http }))
    }
}

/// Send-only handle backed by serenity's REST client.
pub struct DiscordSender {
    http: Arc<Http>,
}

fn parse_channel_id(channel_id: &ChannelId) -> Result<DiscordChannelId> {
    channel_id
        .as_str()
        .parse::<u64>()
        .ok()
        .filter(|&id| id != 0)
        .map(DiscordChannelId::new)
        .ok_or_else(|| Error::Channel(format!("invalid discord channel id: {channel_id}")))
}

#[async_trait]
impl ChannelSender for DiscordSender {
    async fn send_typing(&self, channel_id: &ChannelId) -> Result<()> {
        parse_channel_id(channel_id)?
            .broadcast_typing(&*self.http)
            .await
            .map_err(|e| Error::Channel(format!("failed to send typing indicator: {e}")))
    }

    async fn reply(&self, message: &InboundMessage, text: &str) -> Result<()> {
        let channel = parse_channel_id(&message.channel_id)?;
        let reference = message
            .id
            .parse::<u64>()
            .ok()
            .filter(|&id| id != 0)
            .map(MessageId::new);

        for (index, chunk) in split_message(text, DISCORD_MESSAGE_LIMIT)
            .into_iter()
            .enumerate()
        {
            let mut builder = CreateMessage::new().content(chunk);
            if let (0, Some(message_id)) = (index, reference) {
                builder = builder.reference_message((channel, message_id));
            }
            channel
                .send_message(&*self.http, builder)
                .await
                .map_err(|e| Error::Channel(format!("failed to send discord message: {e}")))?;
        }

        Ok(())
    }
}
