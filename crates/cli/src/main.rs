mod config_commands;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    courier_config::validate,
    courier_telegram::{BotTransportFactory, TelegramMonitor},
};

#[derive(Parser)]
#[command(name = "courier", about = "Courier, Telegram channel relay")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Config file (skips discovery in ./ and ~/.config/courier/).
    #[arg(long, short, global = true, env = "COURIER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP control plane (default when no subcommand is provided).
    Serve,
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

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

async fn serve(cli: Cli) -> anyhow::Result<()> {
    let mut config =
        courier_config::load(cli.config.as_deref()).context("failed to load configuration")?;

    let report = validate(&config);
    for d in &report.diagnostics {
        warn!(severity = %d.severity, path = d.path, "{}", d.message);
    }
    if report.has_errors() {
        anyhow::bail!("invalid configuration, run `courier config check` for details");
    }

    // CLI args override config values
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let factory = Arc::new(
        BotTransportFactory::new(&config.telegram)
            .context("telegram configuration is not usable with the bot api transport")?,
    );
    let monitor = Arc::new(TelegramMonitor::new(config.telegram, factory));
    courier_gateway::server::start_gateway(&config.server, monitor).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let mut cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "courier starting");

    match cli.command.take() {
        // Default: serve when no subcommand is provided
        None | Some(Commands::Serve) => serve(cli).await,
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
    }
}
