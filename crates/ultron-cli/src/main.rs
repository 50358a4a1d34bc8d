//! Ultron CLI entry point.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use ultron_config::{AppConfig, ConfigLoader};
use ultron_gateway::BotServer;

#[derive(Parser)]
#[command(name = "ultron")]
#[command(about = "A Discord chat bot that answers with an LLM")]
#[command(version)]
struct Cli {
    /// Load settings from this dotenv file instead of ./.env
    #[arg(long, global = true, env = "ULTRON_ENV_FILE")]
    env_file: Option<PathBuf>,

    /// Log output format
    #[arg(
        long,
        global = true,
        env = "ULTRON_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Text
    )]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and start answering messages (default)
    Run,
    /// Validate configuration, print the effective non-secret settings and
    /// verify the OpenAI API key
    CheckConfig,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Route panics through tracing so they land in the same log stream.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("panic: {info}");
        default_hook(info);
    }));
}

fn load_config(env_file: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    match env_file {
        Some(path) => ConfigLoader::from_env_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => ConfigLoader::from_env().context("failed to load configuration"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_format);
    install_panic_hook();

    let config = load_config(cli.env_file.as_ref())?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::CheckConfig => {
            let rendered = serde_json::to_string_pretty(&config.redacted_json())
                .context("failed to render configuration")?;
            println!("{rendered}");

            let base_url = config.llm.base_url.clone();
            let accepted = BotServer::new(config)
                .check_credentials()
                .await
                .context("failed to check OpenAI credentials")?;
            if !accepted {
                anyhow::bail!("OpenAI API key was rejected or {base_url} is unreachable");
            }
            println!("OpenAI API key accepted by {base_url}");
        }
        Commands::Run => {
            tracing::info!("starting ultron");
            BotServer::new(config)
                .run()
                .await
                .context("bot stopped with an error")?;
        }
    }

    Ok(())
}
