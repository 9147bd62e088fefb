mod config_commands;
mod run_command;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "drivelink", about = "Drivelink: Google Drive files, relayed into WhatsApp")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching the standard locations.
    #[arg(long, global = true, env = "DRIVELINK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect the configured accounts and serve download requests
    /// (default when no subcommand is provided).
    Run,
    /// Validate the configuration file and report errors/warnings.
    Validate,
    /// Print the Drive file ID that would be taken from a link.
    Extract { link: String },
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

/// `--config` wins; otherwise the first file found in the standard locations.
fn config_path(cli: &Cli) -> Option<PathBuf> {
    cli.config.clone().or_else(drivelink_config::find_config_file)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    match &cli.command {
        None | Some(Commands::Run) => {
            info!(version = env!("CARGO_PKG_VERSION"), "drivelink starting");
            let config = drivelink_config::load_or_default(config_path(&cli).as_deref())?;
            run_command::run(config).await
        },
        Some(Commands::Validate) => config_commands::check(config_path(&cli).as_deref()),
        Some(Commands::Extract { link }) => match drivelink_drive::extract_id(link) {
            Some(id) => {
                println!("{id}");
                Ok(())
            },
            None => anyhow::bail!("no Drive file ID found in {link:?}"),
        },
    }
}
