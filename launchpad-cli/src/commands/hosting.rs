//! `launchpad hosting list` and `launchpad hosting browse`

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use launchpad_backend::Backend;
use launchpad_core::{HealthStatus, HostingCredential, HostingId};

use super::Session;

#[derive(Subcommand, Debug)]
pub enum HostingCommand {
    /// List saved hosting credentials.
    List {
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// List subdirectories on a hosting target.
    Browse {
        hosting: String,

        /// Directory to list; the target's root when omitted.
        #[arg(default_value = "")]
        path: String,
    },
}

#[derive(Tabled)]
struct CredentialRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "type")]
    kind: String,
    #[tabled(rename = "host")]
    host: String,
    #[tabled(rename = "health")]
    health: String,
}

impl From<&HostingCredential> for CredentialRow {
    fn from(c: &HostingCredential) -> Self {
        let health = match c.health {
            HealthStatus::Success => c.health.to_string().green().to_string(),
            HealthStatus::Failed => c.health.to_string().red().to_string(),
        };
        Self {
            id: c.id.to_string(),
            name: c.display_name(),
            kind: c.connection_type().to_string(),
            host: c
                .connection
                .endpoint()
                .map(|e| format!("{}:{}", e.host, e.port))
                .unwrap_or_else(|| "-".to_string()),
            health,
        }
    }
}

pub async fn run(cmd: HostingCommand) -> Result<ExitCode> {
    let session = Session::load()?;
    match cmd {
        HostingCommand::List { json } => list(&session, json).await,
        HostingCommand::Browse { hosting, path } => browse(&session, &hosting, &path).await,
    }
}

async fn list(session: &Session, json: bool) -> Result<ExitCode> {
    let credentials = session
        .backend
        .list_hosting_credentials(&session.token)
        .await
        .context("failed to list hosting credentials")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&credentials)?);
        return Ok(ExitCode::SUCCESS);
    }
    if credentials.is_empty() {
        println!("No hosting credentials saved.");
        return Ok(ExitCode::SUCCESS);
    }
    let rows: Vec<CredentialRow> = credentials.iter().map(CredentialRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(ExitCode::SUCCESS)
}

async fn browse(session: &Session, hosting: &str, path: &str) -> Result<ExitCode> {
    let nodes = session
        .backend
        .browse_directory(&session.token, &HostingId::from(hosting), path)
        .await
        .with_context(|| format!("failed to browse '{path}' on hosting {hosting}"))?;

    let shown = if path.is_empty() { "/" } else { path };
    println!("{}", shown.bold());
    if nodes.is_empty() {
        println!("  (no subdirectories)");
    }
    for node in &nodes {
        println!("  {}/  {}", node.name, node.full_path.bright_black());
    }
    Ok(ExitCode::SUCCESS)
}
