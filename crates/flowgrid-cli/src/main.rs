use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "flowgrid",
    about = "Flowgrid: multi-tenant flow and log storage engine",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Engine configuration file. Defaults apply when absent.
    #[arg(short, long, global = true, default_value = "flowgrid.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the read pattern, write alias, template and bootstrap index
    /// of every data type for one cluster
    Indices {
        #[command(flatten)]
        target: Target,
    },
    /// List aggregated flows
    Flows {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        window: Window,
    },
    /// List raw log documents
    Logs {
        #[arg(value_enum)]
        kind: LogKind,
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        window: Window,
    },
    /// Write raw log documents from a JSON array file
    Ingest {
        #[arg(value_enum)]
        kind: LogKind,
        #[command(flatten)]
        target: Target,
        /// File holding a JSON array of documents
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Args)]
pub struct Target {
    /// Managed cluster name
    #[arg(long)]
    pub cluster: String,
    /// Tenant id (multi-tenant deployments only)
    #[arg(long, default_value = "")]
    pub tenant: String,
}

#[derive(Args)]
pub struct Window {
    /// Look back this many minutes from now
    #[arg(short, long, default_value_t = 15)]
    pub minutes: i64,
    /// Page size; the configured default when not set
    #[arg(short, long)]
    pub page_size: Option<usize>,
    /// Follow the cursor to the last page
    #[arg(long)]
    pub all: bool,
    /// Resume from a cursor printed by a previous page (JSON object)
    #[arg(long)]
    pub after_key: Option<String>,
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogKind {
    Flows,
    Dns,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("flowgrid=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(&cli.config)?;

    match cli.command {
        Commands::Indices { target } => commands::indices::print(&config, &target),
        Commands::Flows { target, window } => commands::flows::list(&config, &target, &window).await,
        Commands::Logs { kind, target, window } => {
            commands::logs::list(&config, kind, &target, &window).await
        }
        Commands::Ingest { kind, target, file } => {
            commands::ingest::ingest(&config, kind, &target, &file).await
        }
    }
}
