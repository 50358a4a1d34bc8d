use serenity::all::GatewayIntents;
use ultron_common::{Error, Result};

/// Connection settings for the Discord gateway.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Bot token for authenticating with Discord.
    pub bot_token: String,

    /// Gateway intents to request from Discord.
    pub intents: GatewayIntents,
}

impl DiscordConfig {
    pub fn new(bot_token: impl Into<String>) -> Result<Self> {
        let bot_token = bot_token.into();
        if bot_token.trim().is_empty() {
            return Err(Error::Config("discord bot_token is required".into()));
        }

        // Guild text messages with their content; the bot does not handle DMs.
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        Ok(Self { bot_token, intents })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_token_builds_config() {
        let config = DiscordConfig::new("my-secret-token").expect("should build");
        assert_eq!(config.bot_token, "my-secret-token");
        assert!(config.intents.contains(GatewayIntents::MESSAGE_CONTENT));
        assert!(config.intents.contains(GatewayIntents::GUILD_MESSAGES));
        assert!(!config.intents.contains(GatewayIntents::DIRECT_MESSAGES));
    }

    #[test]
    fn empty_bot_token_fails() {
        let err = DiscordConfig::new("   ").expect_err("should fail with empty token");
        assert!(err.to_string().contains("bot_token"));
    }
}
