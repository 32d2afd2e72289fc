//! Launchpad core library: domain types, settings persistence, errors.
//!
//! Public API surface:
//! - [`types`]: identifiers, hosting credentials, deployment records and statuses
//! - [`error`]: [`CoreError`]
//! - [`settings`]: load / save / init of `~/.launchpad/config.yaml`

pub mod error;
pub mod settings;
pub mod types;

pub use error::CoreError;
pub use settings::Settings;
pub use types::{
    normalize_domain, AuthToken, ConnectionConfig, ConnectionType, DeploymentConfig,
    DeploymentId, DeploymentStatus, DirectoryNode, DomainName, Endpoint, FtpConfig, HealthStatus,
    HostingCredential, HostingId, ManagedAssignment, ProjectId, StatusEvent,
};
