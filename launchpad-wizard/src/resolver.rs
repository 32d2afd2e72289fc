//! Lookups the orchestrator makes before it can link or deploy.

use std::sync::Arc;

use launchpad_backend::Backend;
use launchpad_core::{
    AuthToken, ConnectionType, DeploymentConfig, DomainName, HostingCredential, HostingId,
    ManagedAssignment, ProjectId,
};

use crate::context::WizardContext;
use crate::error::WizardError;

// ---------------------------------------------------------------------------
// Credential directory
// ---------------------------------------------------------------------------

/// The user's saved hosting credentials.
pub struct CredentialDirectory {
    backend: Arc<dyn Backend>,
    token: AuthToken,
}

impl CredentialDirectory {
    pub fn new(ctx: &WizardContext) -> Self {
        Self {
            backend: ctx.backend.clone(),
            token: ctx.token.clone(),
        }
    }

    pub async fn list(&self) -> Result<Vec<HostingCredential>, WizardError> {
        let credentials = self.backend.list_hosting_credentials(&self.token).await?;
        tracing::debug!(count = credentials.len(), "listed hosting credentials");
        Ok(credentials)
    }
}

/// The platform credential a managed deployment is linked through.
pub fn managed_credential(credentials: &[HostingCredential]) -> Option<&HostingCredential> {
    credentials
        .iter()
        .find(|c| c.connection_type() == ConnectionType::Managed)
}

/// The credential shown for a managed deployment: the first `managed`
/// credential, otherwise the first `vps` one. Display only.
pub fn managed_display_credential(credentials: &[HostingCredential]) -> Option<&HostingCredential> {
    credentials
        .iter()
        .find(|c| c.connection_type() == ConnectionType::Managed)
        .or_else(|| {
            credentials
                .iter()
                .find(|c| c.connection_type() == ConnectionType::Vps)
        })
}

// ---------------------------------------------------------------------------
// Deployment config resolver
// ---------------------------------------------------------------------------

/// Finds the existing deployment record for a (project, hosting) pair.
pub struct ConfigResolver {
    backend: Arc<dyn Backend>,
    token: AuthToken,
}

impl ConfigResolver {
    pub fn new(ctx: &WizardContext) -> Self {
        Self {
            backend: ctx.backend.clone(),
            token: ctx.token.clone(),
        }
    }

    /// `Ok(None)` when no record exists; only transport failures are errors.
    pub async fn resolve(
        &self,
        project: &ProjectId,
        hosting: Option<&HostingId>,
    ) -> Result<Option<DeploymentConfig>, WizardError> {
        let config = self
            .backend
            .get_deployment_config(&self.token, project, hosting)
            .await?;
        tracing::debug!(
            project = %project,
            hosting = hosting.map(|h| h.0.as_str()).unwrap_or("managed"),
            found = config.is_some(),
            "resolved deployment config"
        );
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Managed hosting resolver
// ---------------------------------------------------------------------------

pub struct ManagedHostingResolver {
    backend: Arc<dyn Backend>,
    token: AuthToken,
}

impl ManagedHostingResolver {
    pub fn new(ctx: &WizardContext) -> Self {
        Self {
            backend: ctx.backend.clone(),
            token: ctx.token.clone(),
        }
    }

    /// Domain and root already assigned to the project, if any.
    pub async fn assigned(&self, project: &ProjectId) -> Result<Option<ManagedAssignment>, WizardError> {
        Ok(self
            .backend
            .get_managed_hosting_details(&self.token, project)
            .await?)
    }

    /// Attach `domain` to the project. Availability must already be checked.
    pub async fn connect(
        &self,
        project: &ProjectId,
        domain: &DomainName,
    ) -> Result<ManagedAssignment, WizardError> {
        let assignment = self
            .backend
            .connect_managed_domain(&self.token, project, domain)
            .await?;
        tracing::info!(project = %project, domain = %domain, root = %assignment.root_path, "managed domain connected");
        Ok(assignment)
    }
}
