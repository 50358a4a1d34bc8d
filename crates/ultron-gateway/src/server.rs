use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use ultron_agents::{LlmProvider, OpenAiProvider, ToolRegistry};
use ultron_channels::{
    ChannelEvent, ChannelLifecycle, ChannelSender, ChannelStatus, DiscordChannel, DiscordConfig,
};
use ultron_common::{Error, InboundMessage, Result};
use ultron_config::AppConfig;

use crate::cooldown::CooldownTracker;
use crate::history::ConversationStore;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};

/// Wires configuration, the completion provider, the tool registry and the
/// Discord connection together and runs the event loop.
pub struct BotServer {
    config: AppConfig,
}

impl BotServer {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    fn provider(&self) -> OpenAiProvider {
        OpenAiProvider::new(
            self.config.llm.api_key.clone(),
            Some(self.config.llm.base_url.clone()),
        )
    }

    /// Whether the completion endpoint is reachable and accepts the API key.
    pub async fn check_credentials(&self) -> Result<bool> {
        self.provider().health_check().await
    }

    pub fn build_orchestrator(&self) -> Orchestrator {
        Orchestrator::new(
            OrchestratorConfig::from_app_config(&self.config),
            Arc::new(self.provider()),
            ToolRegistry::with_defaults(self.config.tools.price_api_base_url.clone()),
            ConversationStore::new(self.config.bot.context_messages),
            CooldownTracker::new(Duration::from_secs(self.config.bot.cooldown_seconds)),
        )
    }

    /// Connect to Discord and serve messages until Ctrl-C or a fatal
    /// connection error.
    pub async fn run(self) -> Result<()> {
        let orchestrator = Arc::new(self.build_orchestrator());

        let mut channel = DiscordChannel::new(DiscordConfig::new(
            self.config.discord.bot_token.clone(),
        )?);
        let mut events = channel.subscribe();
        channel.connect().await?;
        let sender = channel.create_sender()?;

        info!(
            prefix = %self.config.bot.command_prefix,
            model = %self.config.llm.model,
            context_messages = self.config.bot.context_messages,
            cooldown_seconds = self.config.bot.cooldown_seconds,
            "ultron is starting"
        );

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(ChannelEvent::MessageReceived(message)) => {
                        spawn_handler(orchestrator.clone(), sender.clone(), message);
                    }
                    Ok(ChannelEvent::StatusChanged(ChannelStatus::Error(reason))) => {
                        error!("discord connection failed: {reason}");
                        return Err(Error::Channel(format!("discord connection failed: {reason}")));
                    }
                    Ok(ChannelEvent::StatusChanged(status)) => {
                        debug!(?status, "discord status changed");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("event loop lagged, dropped {skipped} channel events");
                    }
                    Err(RecvError::Closed) => {
                        return Err(Error::Channel("discord event stream closed".into()));
                    }
                },
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    channel.disconnect().await?;
                    return Ok(());
                }
            }
        }
    }
}

/// Handle `message` on its own task so slow completions never block the
/// event loop. A panicking handler is logged and the loop carries on.
pub fn spawn_handler(
    orchestrator: Arc<Orchestrator>,
    sender: Arc<dyn ChannelSender>,
    message: InboundMessage,
) -> tokio::task::JoinHandle<()> {
    let message_id = message.id.clone();
    let task = tokio::spawn(async move {
        orchestrator.handle_message(&message, sender.as_ref()).await;
    });

    tokio::spawn(async move {
        if let Err(e) = task.await {
            if e.is_panic() {
                error!(message_id = %message_id, "message handler panicked: {e}");
            } else {
                warn!(message_id = %message_id, "message handler cancelled: {e}");
            }
        }
    })
}
