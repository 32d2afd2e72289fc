//! `launchpad config init` and `launchpad config show`

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use launchpad_core::settings::{self, TOKEN_ENV};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write ~/.launchpad/config.yaml, replacing any existing file.
    Init(InitArgs),

    /// Print the active settings. The token is never shown.
    Show {
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Base URL of the backend REST API (e.g. https://api.example.com/api).
    #[arg(long)]
    pub api_url: String,

    /// Websocket URL of the live status channel.
    #[arg(long)]
    pub live_url: String,

    /// API token to store. LAUNCHPAD_TOKEN overrides it at run time.
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(Serialize)]
struct SettingsView<'a> {
    path: String,
    api_url: &'a str,
    live_url: &'a str,
    token: &'static str,
    request_timeout_secs: u64,
    default_web_root: &'a str,
}

pub fn run(cmd: ConfigCommand) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Init(args) => init(args),
        ConfigCommand::Show { json } => show(json),
    }
}

fn init(args: InitArgs) -> Result<ExitCode> {
    let saved = settings::init(&args.api_url, &args.live_url, args.token)
        .context("failed to write settings")?;
    let path = settings::settings_path()?;
    println!("✓ Settings written to {}", path.display());
    println!("  API:  {}", saved.api_url);
    println!("  Live: {}", saved.live_url);
    if saved.token.is_none() {
        println!("  No token stored; set {TOKEN_ENV} before deploying.");
    }
    Ok(ExitCode::SUCCESS)
}

fn show(json: bool) -> Result<ExitCode> {
    let loaded =
        settings::load().context("failed to load settings; run `launchpad config init` first")?;
    let token = if std::env::var(TOKEN_ENV).is_ok_and(|t| !t.trim().is_empty()) {
        "environment"
    } else if loaded.token.is_some() {
        "stored"
    } else {
        "missing"
    };
    let view = SettingsView {
        path: settings::settings_path()?.display().to_string(),
        api_url: &loaded.api_url,
        live_url: &loaded.live_url,
        token,
        request_timeout_secs: loaded.request_timeout_secs,
        default_web_root: &loaded.default_web_root,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(ExitCode::SUCCESS);
    }
    println!("Settings: {}", view.path);
    println!("  api_url:          {}", view.api_url);
    println!("  live_url:         {}", view.live_url);
    println!("  token:            {}", view.token);
    println!("  request timeout:  {}s", view.request_timeout_secs);
    println!("  default web root: {}", view.default_web_root);
    Ok(ExitCode::SUCCESS)
}
