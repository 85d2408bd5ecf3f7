mod chat_commands;
mod config_commands;

use std::path::{Path, PathBuf};

use {
    clap::{Parser, Subcommand},
    tally_config::TallyConfig,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "tally", about = "Tally: record and query finances by chatting")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of the discovered one.
    #[arg(long, global = true, env = "TALLY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the router from the terminal (default).
    Chat {
        /// Conversation address to use for this session.
        #[arg(long, default_value = "console")]
        address: String,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so they never interleave with chat replies.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Explicit file when given, discovery otherwise. Env overrides apply to both.
fn load_config(path: Option<&Path>) -> anyhow::Result<TallyConfig> {
    match path {
        Some(path) => {
            let mut config = tally_config::load_config(path)?;
            tally_config::apply_env_overrides(&mut config);
            Ok(config)
        },
        None => Ok(tally_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "tally starting");

    match cli.command {
        None => {
            let config = load_config(cli.config.as_deref())?;
            chat_commands::run(&config, "console").await
        },
        Some(Commands::Chat { ref address }) => {
            let config = load_config(cli.config.as_deref())?;
            chat_commands::run(&config, address).await
        },
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
    }
}
