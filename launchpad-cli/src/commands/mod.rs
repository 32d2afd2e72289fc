pub mod config;
pub mod deploy;
pub mod domain;
pub mod hosting;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};

use launchpad_backend::HttpBackend;
use launchpad_core::settings::{self, TOKEN_ENV};
use launchpad_core::{AuthToken, DeploymentStatus, Settings};
use launchpad_live::{LiveChannel, WsChannel};
use launchpad_wizard::WizardContext;

/// Loaded settings plus the clients built from them.
pub struct Session {
    pub settings: Settings,
    pub token: AuthToken,
    pub backend: Arc<HttpBackend>,
}

impl Session {
    pub fn load() -> Result<Self> {
        let settings =
            settings::load().context("failed to load settings; run `launchpad config init` first")?;
        let token = settings.resolve_token().with_context(|| {
            format!("no API token; set {TOKEN_ENV} or pass --token to `launchpad config init`")
        })?;
        let backend = HttpBackend::from_settings(&settings)
            .with_context(|| format!("invalid api_url '{}'", settings.api_url))?;
        Ok(Self {
            settings,
            token,
            backend: Arc::new(backend),
        })
    }

    pub async fn live(&self) -> Result<Arc<WsChannel>> {
        let channel = WsChannel::connect(&self.settings.live_url, Some(&self.token))
            .await
            .with_context(|| format!("cannot connect to live channel at {}", self.settings.live_url))?;
        Ok(Arc::new(channel))
    }

    pub fn wizard_context(&self, live: Arc<dyn LiveChannel>) -> WizardContext {
        WizardContext::new(self.backend.clone(), live, self.token.clone())
            .with_default_root_path(self.settings.default_root_path())
    }
}

pub fn status_label(status: DeploymentStatus) -> ColoredString {
    let word = status.as_str();
    match status {
        DeploymentStatus::Success => word.green().bold(),
        DeploymentStatus::BuildFailed | DeploymentStatus::UploadFailed => word.red().bold(),
        DeploymentStatus::Building | DeploymentStatus::Uploading => word.yellow(),
        DeploymentStatus::Pending | DeploymentStatus::Unknown => word.bright_black(),
    }
}
