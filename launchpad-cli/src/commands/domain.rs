//! `launchpad domain check <domain>`

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use launchpad_backend::Backend;
use launchpad_core::DomainName;

use super::Session;

#[derive(Subcommand, Debug)]
pub enum DomainCommand {
    /// Check whether a domain can be used. Exits 1 when it is taken.
    Check { domain: String },
}

pub async fn run(cmd: DomainCommand) -> Result<ExitCode> {
    match cmd {
        DomainCommand::Check { domain } => check(&domain).await,
    }
}

async fn check(raw: &str) -> Result<ExitCode> {
    let domain = DomainName::parse(raw).context("please enter a domain name")?;
    let session = Session::load()?;
    let reply = session
        .backend
        .check_domain_availability(&session.token, &domain)
        .await
        .with_context(|| format!("availability check failed for {domain}"))?;

    match reply.available {
        Some(true) => {
            println!("{} {domain} is available", "✓".green().bold());
            Ok(ExitCode::SUCCESS)
        }
        Some(false) => {
            let reason = reply
                .reason
                .unwrap_or_else(|| "domain is not available".to_string());
            println!("{} {domain}: {reason}", "✗".red().bold());
            Ok(ExitCode::from(1))
        }
        None => anyhow::bail!("unexpected availability response for {domain}"),
    }
}
