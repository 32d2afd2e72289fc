//! `launchpad watch <project>`

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use tokio::sync::mpsc;

use launchpad_core::ProjectId;
use launchpad_wizard::Subscription;

use super::{status_label, Session};

/// Arguments for `launchpad watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Project whose deployment status to follow.
    pub project: String,
}

impl WatchArgs {
    pub async fn run(self) -> Result<ExitCode> {
        let session = Session::load()?;
        let live = session.live().await?;
        let project = ProjectId::from(self.project);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = Subscription::start(live.clone(), project.clone(), move |event| {
            let terminal = event.status.is_terminal();
            tx.send(event).is_ok() && !terminal
        });
        subscription
            .join()
            .await
            .with_context(|| format!("cannot subscribe to project {project}"))?;
        println!("Watching {project} (Ctrl-C to stop)");

        let mut code = ExitCode::SUCCESS;
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => {
                        println!(
                            "  {}  {}",
                            event.received_at.format("%H:%M:%S"),
                            status_label(event.status)
                        );
                        if event.status.is_failure() {
                            code = ExitCode::from(1);
                        }
                    }
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        subscription.release().await;
        live.close().await;
        Ok(code)
    }
}
