use serde::Serialize;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_CONTEXT_MESSAGES: usize = 10;
pub const DEFAULT_COOLDOWN_SECONDS: u64 = 3;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_PRICE_API_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Ultron, a helpful and friendly AI assistant in a \
     Discord server. Be concise, engaging, and helpful in your responses.";

/// Fully resolved runtime configuration.
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub llm: LlmConfig,
    pub bot: BotConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscordConfig {
    #[serde(skip_serializing)]
    pub bot_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LlmConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

/// Conversation behaviour of the bot.
#[derive(Debug, Clone, Serialize)]
pub struct BotConfig {
    /// Required message prefix. Empty means every message is answered.
    pub command_prefix: String,
    pub system_prompt: String,
    /// Size of the per-channel sliding window.
    pub context_messages: usize,
    pub cooldown_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolsConfig {
    pub price_api_base_url: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            command_prefix: String::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            context_messages: DEFAULT_CONTEXT_MESSAGES,
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            price_api_base_url: DEFAULT_PRICE_API_BASE_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// JSON view of the configuration with secrets left out.
    pub fn redacted_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
