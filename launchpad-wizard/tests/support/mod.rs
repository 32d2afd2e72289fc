//! In-memory backend and fixtures shared by the wizard integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use launchpad_backend::{AvailabilityReply, Backend, BackendError, LinkOutcome, Sitemap};
use launchpad_core::{
    AuthToken, ConnectionConfig, DeploymentConfig, DeploymentId, DirectoryNode, DomainName,
    Endpoint, FtpConfig, HealthStatus, HostingCredential, HostingId, ManagedAssignment, ProjectId,
};
use launchpad_live::LocalHub;
use launchpad_wizard::{Wizard, WizardContext};

pub const PROJECT: &str = "proj-1";

/// A backend call as the fake saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListCredentials,
    Browse { hosting: String, path: String },
    Link { hosting: String, domain: String, root_path: String },
    GetConfig { hosting: Option<String> },
    GetCurrentHosting,
    SetCurrentHosting(String),
    CheckDomain(String),
    ConnectManaged(String),
    ManagedDetails,
    Trigger(String),
    UpdateDomain(String),
    Sitemap,
}

/// What the fake answers with. Edit through [`FakeBackend::configure`].
#[derive(Default)]
pub struct FakeState {
    pub credentials: Vec<HostingCredential>,
    /// Listings keyed by path; unknown paths list empty.
    pub listings: HashMap<String, Vec<DirectoryNode>>,
    /// Deployment configs keyed by hosting id; `None` is the managed record.
    pub configs: HashMap<Option<String>, DeploymentConfig>,
    pub current_hosting: Option<HostingId>,
    /// Taken domains and the reason the server gives.
    pub taken: HashMap<String, String>,
    pub managed: Option<ManagedAssignment>,
    pub connect_root: String,
    /// Echoed by the link call.
    pub link_deployment: Option<DeploymentId>,
    /// Stored under the linked hosting once the link call returns.
    pub config_after_link: Option<DeploymentConfig>,
    /// Operation name to (HTTP status, server message).
    pub failures: HashMap<&'static str, (u16, Option<String>)>,
}

pub struct FakeBackend {
    state: Mutex<FakeState>,
    calls: Mutex<Vec<Call>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                connect_root: "/sites/managed".to_string(),
                ..FakeState::default()
            }),
            calls: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn configure(&self, edit: impl FnOnce(&mut FakeState)) {
        edit(&mut self.state.lock());
    }

    pub fn fail(&self, op: &'static str, status: u16, message: Option<&str>) {
        self.state
            .lock()
            .failures
            .insert(op, (status, message.map(str::to_owned)));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| matches(c)).count()
    }

    /// Hold calls keyed `key` (e.g. `browse:/a`, `trigger`) until
    /// [`open`](Self::open) is called for them.
    pub fn hold(&self, key: &str) {
        self.gates
            .lock()
            .insert(key.to_string(), Arc::new(Semaphore::new(0)));
    }

    /// Let one held call through.
    pub fn open(&self, key: &str) {
        if let Some(gate) = self.gates.lock().get(key) {
            gate.add_permits(1);
        }
    }

    async fn enter(&self, call: Call, key: String) {
        self.calls.lock().push(call);
        let gate = self.gates.lock().get(&key).cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    fn check(&self, op: &'static str) -> Result<(), BackendError> {
        match self.state.lock().failures.get(op) {
            Some((status, message)) => Err(BackendError::Status {
                endpoint: op.to_string(),
                status: *status,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn list_hosting_credentials(
        &self,
        _token: &AuthToken,
    ) -> Result<Vec<HostingCredential>, BackendError> {
        self.enter(Call::ListCredentials, "credentials".into()).await;
        self.check("credentials")?;
        Ok(self.state.lock().credentials.clone())
    }

    async fn browse_directory(
        &self,
        _token: &AuthToken,
        hosting: &HostingId,
        path: &str,
    ) -> Result<Vec<DirectoryNode>, BackendError> {
        self.enter(
            Call::Browse {
                hosting: hosting.to_string(),
                path: path.to_string(),
            },
            format!("browse:{path}"),
        )
        .await;
        self.check("browse")?;
        Ok(self
            .state
            .lock()
            .listings
            .get(path)
            .cloned()
            .unwrap_or_default())
    }

    async fn link_project_to_hosting(
        &self,
        _token: &AuthToken,
        hosting: &HostingId,
        project: &ProjectId,
        domain: &DomainName,
        root_path: &str,
    ) -> Result<LinkOutcome, BackendError> {
        self.enter(
            Call::Link {
                hosting: hosting.to_string(),
                domain: domain.to_string(),
                root_path: root_path.to_string(),
            },
            "link".into(),
        )
        .await;
        self.check("link")?;
        let mut state = self.state.lock();
        if let Some(mut config) = state.config_after_link.take() {
            config.project_id = project.clone();
            config.hosting_id = Some(hosting.clone());
            state.configs.insert(Some(hosting.to_string()), config);
        }
        Ok(LinkOutcome {
            deployment_id: state.link_deployment.clone(),
        })
    }

    async fn get_deployment_config(
        &self,
        _token: &AuthToken,
        _project: &ProjectId,
        hosting: Option<&HostingId>,
    ) -> Result<Option<DeploymentConfig>, BackendError> {
        let key = hosting.map(ToString::to_string);
        self.enter(Call::GetConfig { hosting: key.clone() }, "config".into())
            .await;
        self.check("config")?;
        Ok(self.state.lock().configs.get(&key).cloned())
    }

    async fn get_current_hosting(
        &self,
        _token: &AuthToken,
        _project: &ProjectId,
    ) -> Result<Option<HostingId>, BackendError> {
        self.enter(Call::GetCurrentHosting, "current".into()).await;
        self.check("current")?;
        Ok(self.state.lock().current_hosting.clone())
    }

    async fn set_current_hosting(
        &self,
        _token: &AuthToken,
        _project: &ProjectId,
        hosting: &HostingId,
    ) -> Result<(), BackendError> {
        self.enter(Call::SetCurrentHosting(hosting.to_string()), "set_current".into())
            .await;
        self.check("set_current")?;
        self.state.lock().current_hosting = Some(hosting.clone());
        Ok(())
    }

    async fn check_domain_availability(
        &self,
        _token: &AuthToken,
        domain: &DomainName,
    ) -> Result<AvailabilityReply, BackendError> {
        self.enter(Call::CheckDomain(domain.to_string()), "availability".into())
            .await;
        self.check("availability")?;
        let reply = match self.state.lock().taken.get(domain.as_str()) {
            Some(reason) => AvailabilityReply {
                available: Some(false),
                reason: Some(reason.clone()),
            },
            None => AvailabilityReply {
                available: Some(true),
                reason: None,
            },
        };
        Ok(reply)
    }

    async fn connect_managed_domain(
        &self,
        _token: &AuthToken,
        _project: &ProjectId,
        domain: &DomainName,
    ) -> Result<ManagedAssignment, BackendError> {
        self.enter(Call::ConnectManaged(domain.to_string()), "connect".into())
            .await;
        self.check("connect")?;
        let mut state = self.state.lock();
        let assignment = ManagedAssignment {
            domain: domain.to_string(),
            root_path: state.connect_root.clone(),
        };
        state.managed = Some(assignment.clone());
        Ok(assignment)
    }

    async fn get_managed_hosting_details(
        &self,
        _token: &AuthToken,
        _project: &ProjectId,
    ) -> Result<Option<ManagedAssignment>, BackendError> {
        self.enter(Call::ManagedDetails, "managed".into()).await;
        self.check("managed")?;
        Ok(self.state.lock().managed.clone())
    }

    async fn trigger_build_and_upload(
        &self,
        _token: &AuthToken,
        deployment: &DeploymentId,
        _project: &ProjectId,
    ) -> Result<(), BackendError> {
        self.enter(Call::Trigger(deployment.to_string()), "trigger".into())
            .await;
        self.check("trigger")
    }

    async fn update_project_domain(
        &self,
        _token: &AuthToken,
        domain: &DomainName,
        _project: &ProjectId,
    ) -> Result<(), BackendError> {
        self.enter(Call::UpdateDomain(domain.to_string()), "update_domain".into())
            .await;
        self.check("update_domain")
    }

    async fn generate_sitemap(
        &self,
        _token: &AuthToken,
        _project: &ProjectId,
    ) -> Result<Sitemap, BackendError> {
        self.enter(Call::Sitemap, "sitemap".into()).await;
        self.check("sitemap")?;
        Ok(Sitemap {
            slugs: vec!["index".to_string()],
            sitemap: "<urlset/>".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub hub: Arc<LocalHub>,
    pub wizard: Wizard,
}

impl Harness {
    pub fn project(&self) -> ProjectId {
        ProjectId::from(PROJECT)
    }
}

pub fn harness() -> Harness {
    let backend = Arc::new(FakeBackend::new());
    let hub = Arc::new(LocalHub::new());
    let ctx = WizardContext::new(backend.clone(), hub.clone(), AuthToken::new("test-token"));
    let wizard = Wizard::new(ctx, ProjectId::from(PROJECT));
    Harness {
        backend,
        hub,
        wizard,
    }
}

/// Poll `cond` until it holds; panics after about two seconds.
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn endpoint(host: &str) -> Endpoint {
    Endpoint {
        host: host.to_string(),
        port: 22,
        username: "deploy".to_string(),
    }
}

fn credential(id: &str, connection: ConnectionConfig) -> HostingCredential {
    HostingCredential {
        id: HostingId::from(id),
        label: Some(format!("{id} label")),
        connection,
        health: HealthStatus::Success,
    }
}

pub fn ssh(id: &str) -> HostingCredential {
    credential(id, ConnectionConfig::Ssh(endpoint("ssh.example.test")))
}

pub fn vps(id: &str) -> HostingCredential {
    credential(id, ConnectionConfig::Vps(endpoint("vps.example.test")))
}

pub fn managed(id: &str) -> HostingCredential {
    credential(id, ConnectionConfig::Managed)
}

pub fn cpanel(id: &str) -> HostingCredential {
    credential(id, ConnectionConfig::Cpanel(endpoint("cpanel.example.test")))
}

pub fn ftp(id: &str) -> HostingCredential {
    credential(
        id,
        ConnectionConfig::Ftp(FtpConfig {
            endpoint: Endpoint {
                host: "ftp.example.test".to_string(),
                port: 21,
                username: "deploy".to_string(),
            },
            secure: false,
        }),
    )
}

pub fn node(name: &str, full_path: &str) -> DirectoryNode {
    DirectoryNode {
        name: name.to_string(),
        full_path: full_path.to_string(),
    }
}

pub fn config(hosting: Option<&str>, domain: &str, root: &str, deployment: &str) -> DeploymentConfig {
    DeploymentConfig {
        project_id: ProjectId::from(PROJECT),
        hosting_id: hosting.map(HostingId::from),
        domain_name: DomainName::parse(domain).expect("fixture domain"),
        root_path: root.to_string(),
        deployment_id: DeploymentId::from(deployment),
    }
}
