use std::sync::Arc;

use launchpad_backend::Backend;
use launchpad_core::settings::DEFAULT_WEB_ROOT;
use launchpad_core::AuthToken;
use launchpad_live::LiveChannel;

/// Everything the orchestrator and its collaborators reach out to.
///
/// The token is passed explicitly to every backend call instead of being read
/// from ambient session storage.
#[derive(Clone)]
pub struct WizardContext {
    pub backend: Arc<dyn Backend>,
    pub live: Arc<dyn LiveChannel>,
    pub token: AuthToken,
    /// Root path for targets that cannot be browsed.
    pub default_root_path: String,
}

impl WizardContext {
    pub fn new(backend: Arc<dyn Backend>, live: Arc<dyn LiveChannel>, token: AuthToken) -> Self {
        Self {
            backend,
            live,
            token,
            default_root_path: format!("/{DEFAULT_WEB_ROOT}"),
        }
    }

    pub fn with_default_root_path(mut self, path: impl Into<String>) -> Self {
        self.default_root_path = path.into();
        self
    }
}

impl std::fmt::Debug for WizardContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardContext")
            .field("token", &self.token)
            .field("default_root_path", &self.default_root_path)
            .finish_non_exhaustive()
    }
}
