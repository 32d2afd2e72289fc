//! Launchpad: deploy website projects to managed or self-hosted targets.
//!
//! # Usage
//!
//! ```text
//! launchpad config init --api-url <url> --live-url <url> [--token <t>]
//! launchpad config show [--json]
//! launchpad hosting list [--json]
//! launchpad hosting browse <hosting-id> [path]
//! launchpad domain check <domain>
//! launchpad deploy <project> (--managed | --hosting <id>) [--domain <d>] [--root <path>] [--no-watch]
//! launchpad watch <project>
//! ```

mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    config::ConfigCommand, deploy::DeployArgs, domain::DomainCommand, hosting::HostingCommand,
    watch::WatchArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "launchpad",
    version,
    about = "Deploy website projects and follow their build pipeline",
    long_about = None,
)]
struct Cli {
    /// Log debug output to stderr (overrides RUST_LOG).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage the local settings file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Inspect saved hosting credentials.
    Hosting {
        #[command(subcommand)]
        command: HostingCommand,
    },

    /// Domain name utilities.
    Domain {
        #[command(subcommand)]
        command: DomainCommand,
    },

    /// Configure and start a deployment, then follow its status.
    Deploy(DeployArgs),

    /// Follow live deployment status for a project.
    Watch(WatchArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Config { command } => commands::config::run(command),
        Commands::Hosting { command } => commands::hosting::run(command).await,
        Commands::Domain { command } => commands::domain::run(command).await,
        Commands::Deploy(args) => args.run().await,
        Commands::Watch(args) => args.run().await,
    }
}
