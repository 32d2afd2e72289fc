//! `launchpad deploy <project> (--managed | --hosting <id>) ...`
//!
//! Drives the wizard non-interactively: pick the target, fill in the form,
//! deploy, then print every status change until the pipeline finishes.

use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tokio::sync::broadcast::error::RecvError;

use launchpad_core::{DeploymentStatus, HostingId, ProjectId};
use launchpad_wizard::{StepKind, Transition, Wizard, WizardError};

use super::{status_label, Session};

/// Arguments for `launchpad deploy`.
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Project to deploy.
    pub project: String,

    /// Deploy to platform-managed hosting (requires --domain).
    #[arg(long, conflicts_with = "hosting", required_unless_present = "hosting")]
    pub managed: bool,

    /// Deploy to one of your saved hosting credentials.
    #[arg(long, value_name = "ID")]
    pub hosting: Option<String>,

    /// Domain to serve the site on. Leading `www.` is dropped.
    #[arg(long)]
    pub domain: Option<String>,

    /// Directory on the target to upload into.
    #[arg(long, value_name = "PATH")]
    pub root: Option<String>,

    /// Return once the build has been requested instead of following it.
    #[arg(long)]
    pub no_watch: bool,
}

/// Require an applied transition; anything else aborts the command.
fn applied(what: &str, result: Result<Transition, WizardError>) -> Result<()> {
    match result {
        Ok(Transition::Applied) => Ok(()),
        Ok(Transition::Ignored) => bail!("{what}: another operation was still in progress"),
        Err(err) => {
            tracing::debug!(error = %err, "{what} failed");
            bail!("{what}: {}", err.user_message())
        }
    }
}

impl DeployArgs {
    pub async fn run(self) -> Result<ExitCode> {
        let session = Session::load()?;
        let live = session.live().await?;
        let wizard = Wizard::new(
            session.wizard_context(live.clone()),
            ProjectId::from(self.project.clone()),
        );

        let outcome = self.drive(&wizard).await;
        wizard.close().await;
        live.close().await;
        outcome
    }

    async fn drive(&self, wizard: &Wizard) -> Result<ExitCode> {
        applied("open", wizard.open().await)?;
        if let Some(hint) = wizard.snapshot().resume {
            println!(
                "Previous deployment: {} at {} on hosting {}",
                hint.config.domain_name, hint.config.root_path, hint.hosting_id
            );
        }

        if self.managed {
            let domain = self
                .domain
                .as_deref()
                .context("--domain is required with --managed")?;
            applied("choose managed hosting", wizard.choose_managed().await)?;
            applied("connect domain", wizard.submit_domain(domain).await)?;
        } else {
            let hosting = self
                .hosting
                .as_deref()
                .context("pass --managed or --hosting <id>")?;
            applied("list hosting", wizard.choose_own_hosting().await)?;
            let selected = wizard.select_hosting(&HostingId::from(hosting)).await;
            // A failed root listing leaves the target selected.
            if wizard.snapshot().kind() == StepKind::Configure {
                if let Err(err) = selected {
                    eprintln!("{} {}", "warning:".yellow(), err.user_message());
                }
            } else {
                applied("select hosting", selected)?;
            }
            if let Some(domain) = &self.domain {
                wizard.set_domain(domain)?;
            }
        }
        if let Some(root) = &self.root {
            wizard.set_root_path(root)?;
        }

        let mut updates = wizard.status_updates();
        applied("deploy", wizard.deploy().await)?;
        if let Some(form) = wizard.snapshot().form() {
            println!(
                "{} {} → {} (deployment {})",
                "Deploying".bold(),
                form.domain,
                form.root_path,
                form.deployment_id
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default()
            );
        }

        if self.no_watch {
            wizard.wait_dispatched().await;
            return dispatch_outcome(wizard);
        }

        let dispatched = wizard.wait_dispatched();
        tokio::pin!(dispatched);
        let mut dispatch_done = false;
        let last = loop {
            tokio::select! {
                _ = &mut dispatched, if !dispatch_done => {
                    dispatch_done = true;
                    if wizard.snapshot().kind() != StepKind::Monitoring {
                        return dispatch_outcome(wizard);
                    }
                }
                update = updates.recv() => match update {
                    Ok(status) => {
                        println!("  {}", status_label(status));
                        if status.is_terminal() {
                            break status;
                        }
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break DeploymentStatus::Unknown,
                },
                _ = tokio::signal::ctrl_c() => {
                    println!("Stopped watching; the deployment continues on the server.");
                    return Ok(ExitCode::SUCCESS);
                }
            }
        };

        if last.is_failure() {
            eprintln!("{} deployment finished with {}", "✗".red().bold(), status_label(last));
            return Ok(ExitCode::from(1));
        }
        println!("{} deployment finished", "✓".green().bold());
        Ok(ExitCode::SUCCESS)
    }
}

/// Exit status once the build request has been sent.
fn dispatch_outcome(wizard: &Wizard) -> Result<ExitCode> {
    let snapshot = wizard.snapshot();
    if snapshot.kind() == StepKind::Monitoring {
        println!("{} build requested", "✓".green().bold());
        return Ok(ExitCode::SUCCESS);
    }
    let message = snapshot
        .notice
        .map(|n| n.message)
        .unwrap_or_else(|| "the build could not be started".to_string());
    bail!("deploy: {message}")
}
