//! Per-message request orchestration.
//!
//! One inbound message moves through filtering, a completion call, at most
//! one tool round-trip, and the reply. Failures after filtering are turned
//! into a short notice for the user; the user's turn stays in history and
//! no cooldown is recorded, so they can retry right away.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};
use ultron_agents::{
    ChatMessage, ChatRole, ContentBlock, LlmProvider, LlmRequest, LlmResponse, MessagePart,
    SamplingParams, ToolDefinition, ToolRegistry, extract_text,
};
use ultron_channels::ChannelSender;
use ultron_common::{ChannelId, Error, InboundMessage, Result};
use ultron_config::AppConfig;

use crate::cooldown::CooldownTracker;
use crate::history::{ConversationStore, EntryRole};

pub const AUTHENTICATION_NOTICE: &str =
    "⚠️ Authentication error. Please check the bot configuration.";
pub const RATE_LIMIT_NOTICE: &str = "⚠️ Rate limit reached. Please try again in a moment.";
pub const NETWORK_NOTICE: &str = "⚠️ Network error. Please try again later.";
pub const GENERIC_NOTICE: &str =
    "⚠️ Sorry, I encountered an error processing your message. Please try again.";

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Required message prefix; empty accepts every message.
    pub command_prefix: String,
    pub model: String,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub sampling: SamplingParams,
}

impl OrchestratorConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            command_prefix: config.bot.command_prefix.clone(),
            model: config.llm.model.clone(),
            max_tokens: config.llm.max_tokens,
            system_prompt: config.bot.system_prompt.clone(),
            sampling: SamplingParams::default(),
        }
    }
}

/// Why a message was dropped without a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    BotAuthor,
    MissingPrefix,
    EmptyContent,
    Cooldown,
}

/// Terminal state of one handled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ignored(IgnoreReason),
    Replied(String),
    Failed { notice: &'static str },
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    provider: Arc<dyn LlmProvider>,
    tools: ToolRegistry,
    history: ConversationStore,
    cooldowns: CooldownTracker,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        provider: Arc<dyn LlmProvider>,
        tools: ToolRegistry,
        history: ConversationStore,
        cooldowns: CooldownTracker,
    ) -> Self {
        Self {
            config,
            provider,
            tools,
            history,
            cooldowns,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn history(&self) -> &ConversationStore {
        &self.history
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    /// Decide whether `message` gets an answer, returning the prompt text.
    pub fn accept(&self, message: &InboundMessage) -> std::result::Result<String, IgnoreReason> {
        if message.author_is_bot {
            return Err(IgnoreReason::BotAuthor);
        }

        let content = if self.config.command_prefix.is_empty() {
            message.content.as_str()
        } else {
            message
                .content
                .strip_prefix(self.config.command_prefix.as_str())
                .ok_or(IgnoreReason::MissingPrefix)?
                .trim()
        };

        if content.is_empty() {
            return Err(IgnoreReason::EmptyContent);
        }

        // Silent on purpose: answering throttled users would amplify spam.
        if self.cooldowns.is_on_cooldown(&message.author_id) {
            return Err(IgnoreReason::Cooldown);
        }

        Ok(content.to_string())
    }

    /// Run one inbound message to completion. Never returns an error.
    #[instrument(
        skip_all,
        fields(message_id = %message.id, channel = %message.channel_id, author = %message.author_id)
    )]
    pub async fn handle_message(
        &self,
        message: &InboundMessage,
        sender: &dyn ChannelSender,
    ) -> Outcome {
        let content = match self.accept(message) {
            Ok(content) => content,
            Err(reason) => {
                debug!(?reason, "ignoring message");
                return Outcome::Ignored(reason);
            }
        };

        match self.respond(message, content, sender).await {
            Ok(reply) => Outcome::Replied(reply),
            Err(e) => {
                match &e {
                    Error::Authentication(_) => {
                        error!("invalid OpenAI API key, check OPENAI_API_KEY: {e}")
                    }
                    _ => error!("error processing message: {e}"),
                }

                let notice = failure_notice(&e);
                if let Err(send_err) = sender.reply(message, notice).await {
                    warn!("failed to deliver error notice: {send_err}");
                }
                Outcome::Failed { notice }
            }
        }
    }

    async fn respond(
        &self,
        message: &InboundMessage,
        content: String,
        sender: &dyn ChannelSender,
    ) -> Result<String> {
        if let Err(e) = sender.send_typing(&message.channel_id).await {
            warn!("failed to send typing indicator: {e}");
        }

        self.history
            .append(&message.channel_id, EntryRole::User, content);

        let messages = self.build_messages(&message.channel_id);
        let reply = self.complete_with_tools(messages).await?;

        self.history
            .append(&message.channel_id, EntryRole::Assistant, reply.clone());
        sender.reply(message, &reply).await?;
        self.cooldowns.set_cooldown(&message.author_id);

        info!(reply_len = reply.len(), "replied");
        Ok(reply)
    }

    /// The channel window as completion messages. The system prompt travels
    /// separately in [`LlmRequest::system`] and is rendered first.
    fn build_messages(&self, channel_id: &ChannelId) -> Vec<ChatMessage> {
        self.history
            .get_history(channel_id)
            .iter()
            .map(|entry| entry.to_chat_message())
            .collect()
    }

    fn request(&self, messages: Vec<ChatMessage>, tools: Vec<ToolDefinition>) -> LlmRequest {
        LlmRequest {
            model: self.config.model.clone(),
            messages,
            system: Some(self.config.system_prompt.clone()),
            max_tokens: Some(self.config.max_tokens),
            sampling: self.config.sampling,
            tools,
        }
    }

    /// Complete with tools on offer; if the model asks for any, run them and
    /// complete once more without tools so the answer is prose.
    async fn complete_with_tools(&self, mut messages: Vec<ChatMessage>) -> Result<String> {
        let response = self
            .provider
            .complete(&self.request(messages.clone(), self.tools.definitions()))
            .await?;

        if !response.has_tool_calls() {
            return final_text(&response);
        }

        messages.push(ChatMessage {
            role: ChatRole::Assistant,
            content: MessagePart::Parts(response.content.clone()),
        });

        for (id, name, input) in response.tool_calls() {
            info!(tool = name, "dispatching tool call");
            let result = self.tools.dispatch(name, input).await?;
            messages.push(ChatMessage {
                role: ChatRole::Tool,
                content: MessagePart::Parts(vec![ContentBlock::ToolResult {
                    tool_use_id: id.to_string(),
                    content: result.to_string(),
                }]),
            });
        }

        let response = self
            .provider
            .complete(&self.request(messages, Vec::new()))
            .await?;
        final_text(&response)
    }
}

fn final_text(response: &LlmResponse) -> Result<String> {
    let text = extract_text(&response.content);
    if text.trim().is_empty() {
        return Err(Error::Agent("completion returned no text".to_string()));
    }
    Ok(text)
}

/// User-facing notice for a failed message.
pub fn failure_notice(err: &Error) -> &'static str {
    match err {
        Error::Authentication(_) => AUTHENTICATION_NOTICE,
        Error::RateLimited(_) => RATE_LIMIT_NOTICE,
        Error::Network(_) => NETWORK_NOTICE,
        _ => GENERIC_NOTICE,
    }
}
