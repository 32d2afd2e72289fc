//! The [`Backend`] trait and the reply types it returns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use launchpad_core::{
    AuthToken, DeploymentConfig, DeploymentId, DirectoryNode, DomainName, HostingCredential,
    HostingId, ManagedAssignment, ProjectId,
};

use crate::error::BackendError;

/// Reply of the link call. The id is optional because some backends create
/// the record without echoing it back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkOutcome {
    pub deployment_id: Option<DeploymentId>,
}

/// Raw availability reply. Interpretation (available / taken / malformed)
/// belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AvailabilityReply {
    pub available: Option<bool>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sitemap {
    #[serde(default)]
    pub slugs: Vec<String>,
    #[serde(default)]
    pub sitemap: String,
}

/// Backend operations consumed by the deployment orchestrator.
///
/// Every method takes the caller's token explicitly. Lookups whose "not
/// found" is a normal outcome return `Ok(None)`; only transport and auth
/// failures are errors.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_hosting_credentials(
        &self,
        token: &AuthToken,
    ) -> Result<Vec<HostingCredential>, BackendError>;

    /// Subdirectories of `path` on the hosting target; `""` is the root.
    async fn browse_directory(
        &self,
        token: &AuthToken,
        hosting: &HostingId,
        path: &str,
    ) -> Result<Vec<DirectoryNode>, BackendError>;

    async fn link_project_to_hosting(
        &self,
        token: &AuthToken,
        hosting: &HostingId,
        project: &ProjectId,
        domain: &DomainName,
        root_path: &str,
    ) -> Result<LinkOutcome, BackendError>;

    /// `hosting = None` looks up the managed-hosting record.
    async fn get_deployment_config(
        &self,
        token: &AuthToken,
        project: &ProjectId,
        hosting: Option<&HostingId>,
    ) -> Result<Option<DeploymentConfig>, BackendError>;

    async fn get_current_hosting(
        &self,
        token: &AuthToken,
        project: &ProjectId,
    ) -> Result<Option<HostingId>, BackendError>;

    async fn set_current_hosting(
        &self,
        token: &AuthToken,
        project: &ProjectId,
        hosting: &HostingId,
    ) -> Result<(), BackendError>;

    async fn check_domain_availability(
        &self,
        token: &AuthToken,
        domain: &DomainName,
    ) -> Result<AvailabilityReply, BackendError>;

    async fn connect_managed_domain(
        &self,
        token: &AuthToken,
        project: &ProjectId,
        domain: &DomainName,
    ) -> Result<ManagedAssignment, BackendError>;

    async fn get_managed_hosting_details(
        &self,
        token: &AuthToken,
        project: &ProjectId,
    ) -> Result<Option<ManagedAssignment>, BackendError>;

    /// Fire-and-forget: the pipeline outcome arrives on the live channel.
    async fn trigger_build_and_upload(
        &self,
        token: &AuthToken,
        deployment: &DeploymentId,
        project: &ProjectId,
    ) -> Result<(), BackendError>;

    async fn update_project_domain(
        &self,
        token: &AuthToken,
        domain: &DomainName,
        project: &ProjectId,
    ) -> Result<(), BackendError>;

    async fn generate_sitemap(
        &self,
        token: &AuthToken,
        project: &ProjectId,
    ) -> Result<Sitemap, BackendError>;
}
