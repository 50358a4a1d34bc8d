use std::path::Path;
use std::str::FromStr;

use tracing::warn;
use ultron_common::{Error, Result};

use crate::model::{
    AppConfig, BotConfig, DEFAULT_CONTEXT_MESSAGES, DEFAULT_COOLDOWN_SECONDS, DEFAULT_MAX_TOKENS,
    DEFAULT_MODEL, DEFAULT_OPENAI_BASE_URL, DEFAULT_PRICE_API_BASE_URL, DEFAULT_SYSTEM_PROMPT,
    DiscordConfig, LlmConfig, ToolsConfig,
};

/// Builds an [`AppConfig`] from environment-style key/value pairs.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from the process environment, after applying a `.env` file in the
    /// working directory if one exists.
    pub fn from_env() -> Result<AppConfig> {
        match dotenvy::dotenv() {
            Err(e) if !e.not_found() => {
                return Err(Error::Config(format!("failed to read .env: {e}")));
            }
            _ => {}
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from the process environment after applying the given dotenv file.
    pub fn from_env_file(path: &Path) -> Result<AppConfig> {
        dotenvy::from_path(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve every setting through `lookup`.
    ///
    /// Empty values count as unset, except `COMMAND_PREFIX` where empty is
    /// the meaningful "answer everything" setting.
    pub fn from_lookup<F>(lookup: F) -> Result<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("BOT_TOKEN")
            .ok_or_else(|| Error::Config("BOT_TOKEN is required".into()))?;
        let api_key = get("OPENAI_API_KEY")
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is required".into()))?;

        let defaults = BotConfig::default();

        Ok(AppConfig {
            discord: DiscordConfig { bot_token },
            llm: LlmConfig {
                api_key,
                base_url: get("OPENAI_BASE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                max_tokens: positive_or_default(&get, "MAX_TOKENS", DEFAULT_MAX_TOKENS),
            },
            bot: BotConfig {
                command_prefix: lookup("COMMAND_PREFIX").unwrap_or(defaults.command_prefix),
                system_prompt: get("SYSTEM_PROMPT")
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
                context_messages: positive_or_default(
                    &get,
                    "CONTEXT_MESSAGES",
                    DEFAULT_CONTEXT_MESSAGES,
                ),
                cooldown_seconds: parse_or_default(&get, "COOLDOWN_SECONDS", DEFAULT_COOLDOWN_SECONDS),
            },
            tools: ToolsConfig {
                price_api_base_url: get("PRICE_API_BASE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_PRICE_API_BASE_URL.to_string()),
            },
        })
    }
}

fn parse_or_default<T, F>(get: &F, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("ignoring invalid {key}={raw:?}, using default {default}");
            default
        }),
    }
}

/// Like [`parse_or_default`], but zero also falls back to the default.
fn positive_or_default<T, F>(get: &F, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display + PartialEq + Default,
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or_default(get, key, default);
    if value == T::default() {
        warn!("{key} must be positive, using default {default}");
        default
    } else {
        value
    }
}
