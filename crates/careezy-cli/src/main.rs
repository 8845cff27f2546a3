use std::path::PathBuf;

use anyhow::Context;
use careezy_config::{AppConfig, ConfigLoader};
use careezy_gateway::GatewayServer;
use careezy_gateway::bootstrap::build_state;
use careezy_security::RedactingWriter;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Careezy - resume help, internship search and an AI career coach
#[derive(Parser)]
#[command(name = "careezy", version, about, long_about = None)]
struct Cli {
    /// Path to the YAML config file (default: ~/.careezy/config.yml)
    #[arg(short, long, global = true, env = "CAREEZY_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Address to bind (overrides gateway.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides gateway.port and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Load and validate the configuration, then exit
    CheckConfig,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(RedactingWriter::stderr());

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.with_target(false).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // .env is read before the config so its values take part in env overrides.
    let dotenv = dotenvy::dotenv();
    init_tracing(cli.log_format);
    match dotenv {
        Ok(path) => debug!("loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("failed to read .env: {e}"),
    }

    let mut config =
        ConfigLoader::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }

            let state = build_state(config).context("failed to initialize services")?;
            info!("starting careezy v{}", env!("CARGO_PKG_VERSION"));
            GatewayServer::new(state)
                .run()
                .await
                .context("gateway server failed")?;
        }
        Commands::CheckConfig => {
            config.validate().context("configuration is invalid")?;
            print_summary(&config);
        }
    }

    Ok(())
}

fn print_summary(config: &AppConfig) {
    let enabled = |on: bool| if on { "enabled" } else { "disabled" };
    let db_path = config
        .database
        .path
        .clone()
        .unwrap_or_else(ConfigLoader::default_database_path);

    println!("configuration OK");
    println!("  listen:        {}:{}", config.gateway.host, config.gateway.port);
    println!("  frontend:      {}", config.gateway.frontend_url);
    println!("  database:      {}", db_path.display());
    println!(
        "  llm:           {} ({})",
        config.llm.provider,
        config.llm.model_or_default()
    );
    println!(
        "  coach:         window {} messages, summary every {}",
        config.coach.history_limit, config.coach.summary_interval
    );
    println!(
        "  job search:    {}",
        enabled(config.job_search.credentials().is_some())
    );
    println!("  billing:       {}", enabled(config.billing.api_key().is_some()));
}
